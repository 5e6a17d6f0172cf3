use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RentalError;

pub type FilmId = Uuid;
pub type CustomerId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilmType {
    /// Priced at the premium rate for every day
    NewRelease,
    /// Basic rate covers the first 3 days
    Regular,
    /// Basic rate covers the first 5 days
    Old,
}

impl FilmType {
    pub const ALL: [FilmType; 3] = [FilmType::NewRelease, FilmType::Regular, FilmType::Old];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilmType::NewRelease => "new_release",
            FilmType::Regular => "regular",
            FilmType::Old => "old",
        }
    }

    /// Parses both the storage form ("new_release") and the shelf label ("New release").
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "new_release" | "new" => Some(FilmType::NewRelease),
            "regular" => Some(FilmType::Regular),
            "old" => Some(FilmType::Old),
            _ => None,
        }
    }
}

impl std::fmt::Display for FilmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A title in the catalog together with its physical stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Film {
    pub id: FilmId,
    pub title: String,
    pub film_type: FilmType,
    pub items_total: i64,
    /// Always within `0..=items_total`
    pub available_items: i64,
}

impl Film {
    /// Create a film with all of its items on the shelf.
    pub fn new(
        title: impl Into<String>,
        film_type: FilmType,
        items_total: i64,
    ) -> Result<Self, RentalError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(RentalError::InvalidFilm(
                "title must not be empty".to_string(),
            ));
        }
        if items_total < 0 {
            return Err(RentalError::InvalidFilm(format!(
                "items_total must not be negative, got {}",
                items_total
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            film_type,
            items_total,
            available_items: items_total,
        })
    }

    pub fn is_available(&self) -> bool {
        self.available_items > 0
    }

    /// Take one item off the shelf.
    pub fn mark_as_rented(&mut self) -> Result<(), RentalError> {
        if self.available_items <= 0 {
            return Err(RentalError::Unavailable(self.id));
        }
        self.available_items -= 1;
        Ok(())
    }

    /// Put one item back on the shelf.
    pub fn mark_as_returned(&mut self) -> Result<(), RentalError> {
        if self.available_items >= self.items_total {
            return Err(RentalError::InvariantViolation(format!(
                "film {} would exceed its {} items",
                self.id, self.items_total
            )));
        }
        self.available_items += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}

impl Default for Customer {
    fn default() -> Self {
        Self::new()
    }
}
