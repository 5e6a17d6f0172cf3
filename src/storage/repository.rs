use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::application::AppError;
use crate::domain::{
    Cents, Customer, CustomerId, Film, FilmId, FilmType, RentalError, RentalRecord,
};

use super::{CustomerRegistry, FilmCatalog, MIGRATION_001_INITIAL, RentalLedger};

const RENTAL_COLUMNS: &str = "request_id, film_id, customer_id, date_of_rent, up_front_days, charge, currency, date_of_return, surcharge";

/// SQLite-backed store for films, customers and the rental ledger.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn row_to_film(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Film> {
        let id_str: String = row.get("id");
        let film_type_str: String = row.get("film_type");

        Ok(Film {
            id: Uuid::parse_str(&id_str).context("Invalid film ID")?,
            title: row.get("title"),
            film_type: FilmType::from_str(&film_type_str)
                .ok_or_else(|| anyhow!("Invalid film type: {}", film_type_str))?,
            items_total: row.get("items_total"),
            available_items: row.get("available_items"),
        })
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<RentalRecord> {
        let request_id: String = row.get("request_id");
        let film_id: String = row.get("film_id");
        let customer_id: String = row.get("customer_id");
        let date_of_rent: String = row.get("date_of_rent");
        let date_of_return: Option<String> = row.get("date_of_return");

        Ok(RentalRecord {
            request_id: Uuid::parse_str(&request_id).context("Invalid request ID")?,
            film_id: Uuid::parse_str(&film_id).context("Invalid film ID")?,
            customer_id: Uuid::parse_str(&customer_id).context("Invalid customer ID")?,
            date_of_rent: parse_date(&date_of_rent).context("Invalid date_of_rent")?,
            up_front_days: row.get("up_front_days"),
            charge: row.get("charge"),
            currency: row.get("currency"),
            date_of_return: date_of_return
                .map(|s| parse_date(&s))
                .transpose()
                .context("Invalid date_of_return")?,
            surcharge: row.get("surcharge"),
        })
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Customer> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Customer {
            id: Uuid::parse_str(&id_str).context("Invalid customer ID")?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

fn parse_date(s: &str) -> chrono::ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl FilmCatalog for SqliteStore {
    async fn save_film(&self, film: &Film) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO films (id, title, film_type, items_total, available_items)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                film_type = excluded.film_type,
                items_total = excluded.items_total,
                available_items = excluded.available_items
            "#,
        )
        .bind(film.id.to_string())
        .bind(&film.title)
        .bind(film.film_type.as_str())
        .bind(film.items_total)
        .bind(film.available_items)
        .execute(&self.pool)
        .await
        .context("Failed to save film")?;
        Ok(())
    }

    async fn find_film(&self, film_id: FilmId) -> Result<Film, AppError> {
        let row = sqlx::query(
            "SELECT id, title, film_type, items_total, available_items FROM films WHERE id = ?",
        )
        .bind(film_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch film")?;

        match row {
            Some(row) => Ok(Self::row_to_film(&row)?),
            None => Err(RentalError::FilmNotFound(film_id).into()),
        }
    }

    async fn list_films(&self) -> Result<Vec<Film>, AppError> {
        let rows = sqlx::query(
            "SELECT id, title, film_type, items_total, available_items FROM films ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list films")?;

        Ok(rows
            .iter()
            .map(Self::row_to_film)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn mark_as_rented(&self, film_id: FilmId) -> Result<(), AppError> {
        // Guarded decrement: the check and the write are one statement
        let result = sqlx::query(
            "UPDATE films SET available_items = available_items - 1 WHERE id = ? AND available_items > 0",
        )
        .bind(film_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to mark film as rented")?;

        if result.rows_affected() == 0 {
            self.find_film(film_id).await?;
            return Err(RentalError::Unavailable(film_id).into());
        }
        debug!(%film_id, "film marked as rented");
        Ok(())
    }

    async fn mark_as_returned(&self, film_id: FilmId) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE films SET available_items = available_items + 1 WHERE id = ? AND available_items < items_total",
        )
        .bind(film_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to mark film as returned")?;

        if result.rows_affected() == 0 {
            let film = self.find_film(film_id).await?;
            return Err(RentalError::InvariantViolation(format!(
                "film {} would exceed its {} items",
                film_id, film.items_total
            ))
            .into());
        }
        debug!(%film_id, "film marked as returned");
        Ok(())
    }
}

#[async_trait]
impl RentalLedger for SqliteStore {
    async fn append(&self, record: &RentalRecord) -> Result<(), AppError> {
        let duplicate = RentalError::DuplicateRental {
            customer_id: record.customer_id,
            film_id: record.film_id,
        };

        match self
            .find_open_record(record.customer_id, record.film_id)
            .await
        {
            Ok(_) => return Err(duplicate.into()),
            Err(AppError::Rental(RentalError::OpenRecordNotFound { .. })) => {}
            Err(e) => return Err(e),
        }

        let result = sqlx::query(
            r#"
            INSERT INTO rentals (request_id, film_id, customer_id, date_of_rent, up_front_days, charge, currency, date_of_return, surcharge)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.request_id.to_string())
        .bind(record.film_id.to_string())
        .bind(record.customer_id.to_string())
        .bind(record.date_of_rent.to_string())
        .bind(record.up_front_days)
        .bind(record.charge)
        .bind(&record.currency)
        .bind(record.date_of_return.map(|d| d.to_string()))
        .bind(record.surcharge)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // Lost a race on the open-pair index
            Err(e) if is_unique_violation(&e) => Err(duplicate.into()),
            Err(e) => Err(anyhow::Error::new(e)
                .context("Failed to append rental record")
                .into()),
        }
    }

    async fn find_open_record(
        &self,
        customer_id: CustomerId,
        film_id: FilmId,
    ) -> Result<RentalRecord, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM rentals WHERE customer_id = ? AND film_id = ? AND date_of_return IS NULL",
            RENTAL_COLUMNS
        ))
        .bind(customer_id.to_string())
        .bind(film_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch open rental")?;

        match row {
            Some(row) => Ok(Self::row_to_record(&row)?),
            None => Err(RentalError::OpenRecordNotFound {
                customer_id,
                film_id,
            }
            .into()),
        }
    }

    async fn close_record(
        &self,
        customer_id: CustomerId,
        film_id: FilmId,
        surcharge: Cents,
        return_date: NaiveDate,
    ) -> Result<RentalRecord, AppError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE rentals
            SET date_of_return = ?, surcharge = ?
            WHERE customer_id = ? AND film_id = ? AND date_of_return IS NULL
            RETURNING {}
            "#,
            RENTAL_COLUMNS
        ))
        .bind(return_date.to_string())
        .bind(surcharge)
        .bind(customer_id.to_string())
        .bind(film_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to close rental")?;

        match row {
            Some(row) => Ok(Self::row_to_record(&row)?),
            None => Err(RentalError::OpenRecordNotFound {
                customer_id,
                film_id,
            }
            .into()),
        }
    }

    async fn list_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<RentalRecord>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM rentals WHERE customer_id = ? ORDER BY sequence",
            RENTAL_COLUMNS
        ))
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list rentals for customer")?;

        Ok(rows
            .iter()
            .map(Self::row_to_record)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn list_all(&self) -> Result<Vec<RentalRecord>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM rentals ORDER BY sequence",
            RENTAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list rentals")?;

        Ok(rows
            .iter()
            .map(Self::row_to_record)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }
}

#[async_trait]
impl CustomerRegistry for SqliteStore {
    async fn create_customer(&self) -> Result<Customer, AppError> {
        let customer = Customer::new();
        sqlx::query("INSERT INTO customers (id, created_at) VALUES (?, ?)")
            .bind(customer.id.to_string())
            .bind(customer.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to save customer")?;
        Ok(customer)
    }

    async fn find_customer(&self, customer_id: CustomerId) -> Result<Customer, AppError> {
        let row = sqlx::query("SELECT id, created_at FROM customers WHERE id = ?")
            .bind(customer_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch customer")?;

        match row {
            Some(row) => Ok(Self::row_to_customer(&row)?),
            None => Err(AppError::CustomerNotFound(customer_id)),
        }
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let rows = sqlx::query("SELECT id, created_at FROM customers ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list customers")?;

        Ok(rows
            .iter()
            .map(Self::row_to_customer)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }
}
