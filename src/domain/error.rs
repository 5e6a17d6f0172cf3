use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CustomerId, FilmId, RequestId};

/// Business-level failures of a single rent or return line item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RentalError {
    #[error("Film not found: {0}")]
    FilmNotFound(FilmId),

    #[error("No open rental of film {film_id} for customer {customer_id}")]
    OpenRecordNotFound {
        customer_id: CustomerId,
        film_id: FilmId,
    },

    #[error("Film {0} has no available items")]
    Unavailable(FilmId),

    #[error("Customer {customer_id} already has film {film_id} rented")]
    DuplicateRental {
        customer_id: CustomerId,
        film_id: FilmId,
    },

    #[error("Rental {0} has already been returned")]
    AlreadyReturned(RequestId),

    #[error("Up-front days must be positive, got {0}")]
    InvalidUpFrontDays(i64),

    #[error("Amount for film {0} exceeds the representable range")]
    AmountOverflow(FilmId),

    #[error("Invalid film: {0}")]
    InvalidFilm(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

/// Error tag reported per line item to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Unavailable,
    DuplicateRental,
    AlreadyReturned,
    InvariantViolation,
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::DuplicateRental => "duplicate_rental",
            ErrorKind::AlreadyReturned => "already_returned",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::InvalidInput => "invalid_input",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl RentalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RentalError::FilmNotFound(_) | RentalError::OpenRecordNotFound { .. } => {
                ErrorKind::NotFound
            }
            RentalError::Unavailable(_) => ErrorKind::Unavailable,
            RentalError::DuplicateRental { .. } => ErrorKind::DuplicateRental,
            RentalError::AlreadyReturned(_) => ErrorKind::AlreadyReturned,
            RentalError::InvalidUpFrontDays(_)
            | RentalError::AmountOverflow(_)
            | RentalError::InvalidFilm(_) => ErrorKind::InvalidInput,
            RentalError::InvariantViolation(_) => ErrorKind::InvariantViolation,
        }
    }
}
