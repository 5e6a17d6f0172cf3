// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use rental_store::application::{RentItem, RentalService, ReturnItem};
use rental_store::domain::{Film, FilmType, PriceList};
use tempfile::TempDir;

/// Price list whose basic price makes a 3-day regular rental cost 11.00 SEK
pub fn scenario_prices() -> PriceList {
    PriceList::new(4000, 1100, "SEK")
}

/// Helper to create a test service with a temporary database
pub async fn sqlite_service(prices: PriceList) -> Result<(RentalService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = RentalService::init(db_path.to_str().unwrap(), prices).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into a NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn rent(film: &Film, up_front_days: i64) -> RentItem {
    RentItem {
        film_id: film.id,
        up_front_days,
    }
}

pub fn give_back(film: &Film) -> ReturnItem {
    ReturnItem { film_id: film.id }
}

/// Test fixture: the store's shelf
pub struct StandardFilms {
    pub matrix: Film,
    pub spider_man: Film,
    pub spider_man_2: Film,
    pub out_of_africa: Film,
}

impl StandardFilms {
    pub async fn create(service: &RentalService) -> Result<Self> {
        Ok(Self {
            matrix: service
                .add_film("Matrix 11", FilmType::NewRelease, 50)
                .await?,
            spider_man: service.add_film("Spider Man", FilmType::Regular, 50).await?,
            spider_man_2: service
                .add_film("Spider Man 2", FilmType::Regular, 50)
                .await?,
            out_of_africa: service.add_film("Out of Africa", FilmType::Old, 50).await?,
        })
    }
}
