use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::application::AppError;
use crate::domain::{
    Cents, Customer, CustomerId, Film, FilmId, RentalError, RentalRecord, find_open,
};

use super::{CustomerRegistry, FilmCatalog, RentalLedger};

/// In-process store implementing every repository contract.
/// Each collection sits behind its own mutex, held only for the
/// duration of a single operation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    films: Mutex<Vec<Film>>,
    records: Mutex<Vec<RentalRecord>>,
    customers: Mutex<Vec<Customer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn film_mut(films: &mut [Film], film_id: FilmId) -> Result<&mut Film, RentalError> {
    films
        .iter_mut()
        .find(|f| f.id == film_id)
        .ok_or(RentalError::FilmNotFound(film_id))
}

#[async_trait]
impl FilmCatalog for MemoryStore {
    async fn save_film(&self, film: &Film) -> Result<(), AppError> {
        let mut films = lock(&self.films);
        match films.iter_mut().find(|f| f.id == film.id) {
            Some(existing) => *existing = film.clone(),
            None => films.push(film.clone()),
        }
        Ok(())
    }

    async fn find_film(&self, film_id: FilmId) -> Result<Film, AppError> {
        let films = lock(&self.films);
        films
            .iter()
            .find(|f| f.id == film_id)
            .cloned()
            .ok_or_else(|| RentalError::FilmNotFound(film_id).into())
    }

    async fn list_films(&self) -> Result<Vec<Film>, AppError> {
        Ok(lock(&self.films).clone())
    }

    async fn mark_as_rented(&self, film_id: FilmId) -> Result<(), AppError> {
        let mut films = lock(&self.films);
        let film = film_mut(&mut films, film_id)?;
        film.mark_as_rented()?;
        debug!(%film_id, available = film.available_items, "film marked as rented");
        Ok(())
    }

    async fn mark_as_returned(&self, film_id: FilmId) -> Result<(), AppError> {
        let mut films = lock(&self.films);
        let film = film_mut(&mut films, film_id)?;
        film.mark_as_returned()?;
        debug!(%film_id, available = film.available_items, "film marked as returned");
        Ok(())
    }
}

#[async_trait]
impl RentalLedger for MemoryStore {
    async fn append(&self, record: &RentalRecord) -> Result<(), AppError> {
        let mut records = lock(&self.records);

        if find_open(&records, record.customer_id, record.film_id).is_some() {
            return Err(RentalError::DuplicateRental {
                customer_id: record.customer_id,
                film_id: record.film_id,
            }
            .into());
        }
        if records.iter().any(|r| r.request_id == record.request_id) {
            return Err(RentalError::InvariantViolation(format!(
                "request id {} is already in the ledger",
                record.request_id
            ))
            .into());
        }

        records.push(record.clone());
        Ok(())
    }

    async fn find_open_record(
        &self,
        customer_id: CustomerId,
        film_id: FilmId,
    ) -> Result<RentalRecord, AppError> {
        let records = lock(&self.records);
        find_open(&records, customer_id, film_id)
            .cloned()
            .ok_or_else(|| {
                RentalError::OpenRecordNotFound {
                    customer_id,
                    film_id,
                }
                .into()
            })
    }

    async fn close_record(
        &self,
        customer_id: CustomerId,
        film_id: FilmId,
        surcharge: Cents,
        return_date: NaiveDate,
    ) -> Result<RentalRecord, AppError> {
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.is_open() && r.matches(customer_id, film_id))
            .ok_or(RentalError::OpenRecordNotFound {
                customer_id,
                film_id,
            })?;

        record.close(return_date, surcharge)?;
        Ok(record.clone())
    }

    async fn list_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<RentalRecord>, AppError> {
        let records = lock(&self.records);
        Ok(records
            .iter()
            .filter(|r| r.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<RentalRecord>, AppError> {
        Ok(lock(&self.records).clone())
    }
}

#[async_trait]
impl CustomerRegistry for MemoryStore {
    async fn create_customer(&self) -> Result<Customer, AppError> {
        let customer = Customer::new();
        lock(&self.customers).push(customer.clone());
        Ok(customer)
    }

    async fn find_customer(&self, customer_id: CustomerId) -> Result<Customer, AppError> {
        lock(&self.customers)
            .iter()
            .find(|c| c.id == customer_id)
            .cloned()
            .ok_or(AppError::CustomerNotFound(customer_id))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(lock(&self.customers).clone())
    }
}
