//! Repository contracts the rental service depends on.
//!
//! Backends report rental-taxonomy failures as `AppError::Rental` and
//! everything else (I/O, corrupt rows) as `AppError::Database`.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::application::AppError;
use crate::domain::{Cents, Customer, CustomerId, Film, FilmId, RentalRecord};

/// Films and their shelf stock.
#[async_trait]
pub trait FilmCatalog: Send + Sync {
    /// Insert a film, or replace the stored one with the same id
    async fn save_film(&self, film: &Film) -> Result<(), AppError>;

    /// Fails with `FilmNotFound` for unknown ids
    async fn find_film(&self, film_id: FilmId) -> Result<Film, AppError>;

    /// All films in insertion order
    async fn list_films(&self) -> Result<Vec<Film>, AppError>;

    /// Atomically take one item off the shelf; `Unavailable` at zero stock
    async fn mark_as_rented(&self, film_id: FilmId) -> Result<(), AppError>;

    /// Atomically put one item back; `InvariantViolation` if the shelf is full
    async fn mark_as_returned(&self, film_id: FilmId) -> Result<(), AppError>;
}

/// Append-only record of rentals.
#[async_trait]
pub trait RentalLedger: Send + Sync {
    /// Fails with `DuplicateRental` if the pair already has an open record
    async fn append(&self, record: &RentalRecord) -> Result<(), AppError>;

    /// Fails with `OpenRecordNotFound` if the pair has nothing outstanding
    async fn find_open_record(
        &self,
        customer_id: CustomerId,
        film_id: FilmId,
    ) -> Result<RentalRecord, AppError>;

    /// Close the pair's open record and return it in its closed state
    async fn close_record(
        &self,
        customer_id: CustomerId,
        film_id: FilmId,
        surcharge: Cents,
        return_date: NaiveDate,
    ) -> Result<RentalRecord, AppError>;

    /// A customer's records in insertion order
    async fn list_by_customer(&self, customer_id: CustomerId)
    -> Result<Vec<RentalRecord>, AppError>;

    /// Every record in insertion order
    async fn list_all(&self) -> Result<Vec<RentalRecord>, AppError>;
}

#[async_trait]
pub trait CustomerRegistry: Send + Sync {
    /// Register a customer under a freshly generated id
    async fn create_customer(&self) -> Result<Customer, AppError>;

    async fn find_customer(&self, customer_id: CustomerId) -> Result<Customer, AppError>;

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError>;
}
