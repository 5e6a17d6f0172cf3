use thiserror::Error;

use crate::domain::{CustomerId, RentalError};

#[derive(Error, Debug)]
pub enum AppError {
    /// A line-item failure from the rental taxonomy
    #[error(transparent)]
    Rental(#[from] RentalError),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// The rental error behind this failure, if it is one the service
    /// reports per line item instead of propagating.
    pub fn as_rental(&self) -> Option<&RentalError> {
        match self {
            AppError::Rental(e) => Some(e),
            _ => None,
        }
    }
}
