use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::{
    Cents, Customer, CustomerId, ErrorKind, Film, FilmId, FilmType, PriceList, RentalError,
    RentalRecord, RequestId, calculate_rent_charge, calculate_rent_surcharge, outstanding_units,
};
use crate::storage::{CustomerRegistry, FilmCatalog, MemoryStore, RentalLedger, SqliteStore};

use super::AppError;
use super::locks::PairLocks;

/// Application service for renting and returning films.
/// This is the primary interface for any client (CLI, API, etc.).
pub struct RentalService {
    catalog: Arc<dyn FilmCatalog>,
    ledger: Arc<dyn RentalLedger>,
    customers: Arc<dyn CustomerRegistry>,
    prices: PriceList,
    locks: PairLocks,
}

/// One film requested in a rent call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentItem {
    pub film_id: FilmId,
    pub up_front_days: i64,
}

/// One film handed back in a return call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub film_id: FilmId,
}

/// A line item that was rented and charged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentedFilm {
    pub film_id: FilmId,
    pub request_id: RequestId,
    pub up_front_days: i64,
    pub charge: Cents,
    pub currency: String,
}

/// A line item that was returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedFilm {
    pub film_id: FilmId,
    pub request_id: RequestId,
    pub date_of_return: NaiveDate,
    pub surcharge: Cents,
    pub currency: String,
}

/// Per-item result of a batch call. Items are independent: a failure never
/// undoes or blocks its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome<T> {
    Completed(T),
    Failed {
        film_id: FilmId,
        error: ErrorKind,
        message: String,
    },
}

pub type RentOutcome = ItemOutcome<RentedFilm>;
pub type ReturnOutcome = ItemOutcome<ReturnedFilm>;

impl<T> ItemOutcome<T> {
    fn failed(film_id: FilmId, err: &RentalError) -> Self {
        ItemOutcome::Failed {
            film_id,
            error: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            ItemOutcome::Completed(value) => Some(value),
            ItemOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            ItemOutcome::Completed(_) => None,
            ItemOutcome::Failed { error, .. } => Some(*error),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ItemOutcome::Completed(_))
    }
}

/// A film whose counters disagree with the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryIssue {
    pub film_id: FilmId,
    pub title: String,
    pub items_total: i64,
    pub available_items: i64,
    pub outstanding: i64,
}

/// Result of cross-checking the catalog against the ledger
#[derive(Debug, Clone, Default, Serialize)]
pub struct InventoryCheck {
    pub films_checked: usize,
    pub open_rentals: usize,
    pub issues: Vec<InventoryIssue>,
}

impl InventoryCheck {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl RentalService {
    /// Create a service over the given repositories.
    pub fn new(
        catalog: Arc<dyn FilmCatalog>,
        ledger: Arc<dyn RentalLedger>,
        customers: Arc<dyn CustomerRegistry>,
        prices: PriceList,
    ) -> Self {
        Self {
            catalog,
            ledger,
            customers,
            prices,
            locks: PairLocks::new(),
        }
    }

    /// Create a service backed by a single in-memory store.
    pub fn in_memory(prices: PriceList) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store.clone(), store, prices)
    }

    fn with_sqlite(store: SqliteStore, prices: PriceList) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, prices)
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, prices: PriceList) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let store = SqliteStore::init(&db_url).await?;
        Ok(Self::with_sqlite(store, prices))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, prices: PriceList) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let store = SqliteStore::connect(&db_url).await?;
        Ok(Self::with_sqlite(store, prices))
    }

    pub fn price_list(&self) -> &PriceList {
        &self.prices
    }

    // ========================
    // Catalog and customers
    // ========================

    /// Add a film with all of its items available.
    pub async fn add_film(
        &self,
        title: &str,
        film_type: FilmType,
        items_total: i64,
    ) -> Result<Film, AppError> {
        let film = Film::new(title, film_type, items_total)?;
        self.catalog.save_film(&film).await?;
        info!(film_id = %film.id, title = %film.title, items_total, "film added");
        Ok(film)
    }

    pub async fn find_film(&self, film_id: FilmId) -> Result<Film, AppError> {
        self.catalog.find_film(film_id).await
    }

    /// Every film with its current stock.
    pub async fn get_inventory(&self) -> Result<Vec<Film>, AppError> {
        self.catalog.list_films().await
    }

    pub async fn add_customer(&self) -> Result<Customer, AppError> {
        let customer = self.customers.create_customer().await?;
        info!(customer_id = %customer.id, "customer registered");
        Ok(customer)
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        self.customers.list_customers().await
    }

    /// A customer's rental history in the order it happened.
    pub async fn get_customer_ledger(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<RentalRecord>, AppError> {
        self.customers.find_customer(customer_id).await?;
        self.ledger.list_by_customer(customer_id).await
    }

    /// The raw store-wide ledger.
    pub async fn get_store_ledger(&self) -> Result<Vec<RentalRecord>, AppError> {
        self.ledger.list_all().await
    }

    // ========================
    // Rent
    // ========================

    /// Rent films dated today.
    pub async fn rent_films(
        &self,
        customer_id: CustomerId,
        items: &[RentItem],
    ) -> Result<Vec<RentOutcome>, AppError> {
        self.rent_films_on(customer_id, items, today()).await
    }

    /// Rent each item independently. Items already committed stay committed
    /// whatever happens to later ones; only errors outside the rental
    /// taxonomy abort the call.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn rent_films_on(
        &self,
        customer_id: CustomerId,
        items: &[RentItem],
        date_of_rent: NaiveDate,
    ) -> Result<Vec<RentOutcome>, AppError> {
        self.customers.find_customer(customer_id).await?;

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let outcome = match self.rent_one(customer_id, item, date_of_rent).await {
                Ok(rented) => {
                    info!(
                        film_id = %rented.film_id,
                        request_id = %rented.request_id,
                        charge = rented.charge,
                        "film rented"
                    );
                    ItemOutcome::Completed(rented)
                }
                Err(AppError::Rental(err)) => {
                    warn!(film_id = %item.film_id, error = %err, "rent rejected");
                    ItemOutcome::failed(item.film_id, &err)
                }
                Err(err) => return Err(err),
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn rent_one(
        &self,
        customer_id: CustomerId,
        item: &RentItem,
        date_of_rent: NaiveDate,
    ) -> Result<RentedFilm, AppError> {
        if item.up_front_days <= 0 {
            return Err(RentalError::InvalidUpFrontDays(item.up_front_days).into());
        }

        let _pair = self.locks.acquire(customer_id, item.film_id).await;

        let film = self.catalog.find_film(item.film_id).await?;
        match self.ledger.find_open_record(customer_id, film.id).await {
            Ok(_) => {
                return Err(RentalError::DuplicateRental {
                    customer_id,
                    film_id: film.id,
                }
                .into());
            }
            Err(AppError::Rental(RentalError::OpenRecordNotFound { .. })) => {}
            Err(err) => return Err(err),
        }

        let (charge, currency) = calculate_rent_charge(&self.prices, &film, item.up_front_days)?;
        let record = RentalRecord::open(
            customer_id,
            film.id,
            date_of_rent,
            item.up_front_days,
            charge,
            currency,
        )?;

        self.catalog.mark_as_rented(film.id).await?;
        if let Err(err) = self.ledger.append(&record).await {
            // Put the unit back so the item is neither rented nor recorded
            if let Err(undo) = self.catalog.mark_as_returned(film.id).await {
                error!(film_id = %film.id, error = %undo, "failed to restore stock after rejected append");
            }
            return Err(err);
        }

        Ok(RentedFilm {
            film_id: film.id,
            request_id: record.request_id,
            up_front_days: record.up_front_days,
            charge: record.charge,
            currency: record.currency,
        })
    }

    // ========================
    // Return
    // ========================

    /// Return films dated today.
    pub async fn return_films(
        &self,
        customer_id: CustomerId,
        items: &[ReturnItem],
    ) -> Result<Vec<ReturnOutcome>, AppError> {
        self.return_films_on(customer_id, items, today()).await
    }

    /// Return each item independently, charging a surcharge for late items.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn return_films_on(
        &self,
        customer_id: CustomerId,
        items: &[ReturnItem],
        return_date: NaiveDate,
    ) -> Result<Vec<ReturnOutcome>, AppError> {
        self.customers.find_customer(customer_id).await?;

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let outcome = match self.return_one(customer_id, item, return_date).await {
                Ok(returned) => {
                    info!(
                        film_id = %returned.film_id,
                        request_id = %returned.request_id,
                        surcharge = returned.surcharge,
                        "film returned"
                    );
                    ItemOutcome::Completed(returned)
                }
                Err(AppError::Rental(err)) => {
                    warn!(film_id = %item.film_id, error = %err, "return rejected");
                    ItemOutcome::failed(item.film_id, &err)
                }
                Err(err) => return Err(err),
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn return_one(
        &self,
        customer_id: CustomerId,
        item: &ReturnItem,
        return_date: NaiveDate,
    ) -> Result<ReturnedFilm, AppError> {
        let _pair = self.locks.acquire(customer_id, item.film_id).await;

        let record = self
            .ledger
            .find_open_record(customer_id, item.film_id)
            .await?;
        let film = self.catalog.find_film(item.film_id).await?;
        let (surcharge, currency) =
            calculate_rent_surcharge(&self.prices, &film, &record, return_date)?;

        self.catalog.mark_as_returned(film.id).await?;
        let closed = match self
            .ledger
            .close_record(customer_id, film.id, surcharge, return_date)
            .await
        {
            Ok(closed) => closed,
            Err(err) => {
                if let Err(undo) = self.catalog.mark_as_rented(film.id).await {
                    error!(film_id = %film.id, error = %undo, "failed to restore stock after rejected close");
                }
                return Err(err);
            }
        };

        Ok(ReturnedFilm {
            film_id: film.id,
            request_id: closed.request_id,
            date_of_return: return_date,
            surcharge,
            currency,
        })
    }

    // ========================
    // Consistency
    // ========================

    /// Cross-check every film's counters against the open rentals in the ledger.
    pub async fn check_inventory(&self) -> Result<InventoryCheck, AppError> {
        let films = self.catalog.list_films().await?;
        let records = self.ledger.list_all().await?;

        let mut check = InventoryCheck {
            films_checked: films.len(),
            open_rentals: records.iter().filter(|r| r.is_open()).count(),
            issues: Vec::new(),
        };

        for film in films {
            let outstanding = outstanding_units(&records, film.id);
            let in_bounds = (0..=film.items_total).contains(&film.available_items);
            if !in_bounds || film.available_items + outstanding != film.items_total {
                check.issues.push(InventoryIssue {
                    film_id: film.id,
                    title: film.title,
                    items_total: film.items_total,
                    available_items: film.available_items,
                    outstanding,
                });
            }
        }

        Ok(check)
    }
}
