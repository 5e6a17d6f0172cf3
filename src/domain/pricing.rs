use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Cents, Film, FilmType, RentalError, RentalRecord};

/// Days covered by a single basic price for regular films.
pub const REGULAR_INCLUDED_DAYS: i64 = 3;
/// Days covered by a single basic price for old films.
pub const OLD_INCLUDED_DAYS: i64 = 5;

/// The store's pricing policy, in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    pub premium_price: Cents,
    pub basic_price: Cents,
    pub currency: String,
}

impl PriceList {
    pub fn new(premium_price: Cents, basic_price: Cents, currency: impl Into<String>) -> Self {
        Self {
            premium_price,
            basic_price,
            currency: currency.into(),
        }
    }

    /// Price charged per overdue day.
    pub fn late_fee(&self, film_type: FilmType) -> Cents {
        match film_type {
            FilmType::NewRelease => self.premium_price,
            FilmType::Regular | FilmType::Old => self.basic_price,
        }
    }
}

impl Default for PriceList {
    fn default() -> Self {
        Self::new(4000, 3000, "SEK")
    }
}

/// Up-front charge for renting `film` for `up_front_days`.
///
/// New releases cost the premium price per day. Regular and old films cost
/// the basic price for an included window, plus the basic price for each day
/// beyond it. Non-positive day counts cost nothing. Fails with
/// `AmountOverflow` when the charge does not fit in `Cents`.
pub fn calculate_rent_charge(
    prices: &PriceList,
    film: &Film,
    up_front_days: i64,
) -> Result<(Cents, String), RentalError> {
    let days = up_front_days.max(0);
    let amount = match film.film_type {
        FilmType::NewRelease => prices.premium_price.checked_mul(days),
        FilmType::Regular => tiered(prices.basic_price, days, REGULAR_INCLUDED_DAYS),
        FilmType::Old => tiered(prices.basic_price, days, OLD_INCLUDED_DAYS),
    }
    .ok_or(RentalError::AmountOverflow(film.id))?;
    Ok((amount, prices.currency.clone()))
}

fn tiered(basic_price: Cents, days: i64, included_days: i64) -> Option<Cents> {
    if days == 0 {
        return Some(0);
    }
    basic_price
        .checked_mul((days - included_days).max(0))?
        .checked_add(basic_price)
}

/// Late surcharge for returning `record` on `return_date`.
/// Zero within the prepaid window; early returns are never credited.
pub fn calculate_rent_surcharge(
    prices: &PriceList,
    film: &Film,
    record: &RentalRecord,
    return_date: NaiveDate,
) -> Result<(Cents, String), RentalError> {
    let overdue = record.overdue_days(return_date);
    let amount = overdue
        .checked_mul(prices.late_fee(film.film_type))
        .ok_or(RentalError::AmountOverflow(film.id))?;
    Ok((amount, prices.currency.clone()))
}
