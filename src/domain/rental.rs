use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId, FilmId, RentalError};

pub type RequestId = Uuid;

/// One rented item in the ledger.
/// Created open on rent, closed exactly once on return, never touched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalRecord {
    pub request_id: RequestId,
    pub film_id: FilmId,
    pub customer_id: CustomerId,
    pub date_of_rent: NaiveDate,
    /// Days paid for at rent time
    pub up_front_days: i64,
    pub charge: Cents,
    pub currency: String,
    pub date_of_return: Option<NaiveDate>,
    pub surcharge: Option<Cents>,
}

impl RentalRecord {
    /// Open a new record. `up_front_days` must be positive.
    pub fn open(
        customer_id: CustomerId,
        film_id: FilmId,
        date_of_rent: NaiveDate,
        up_front_days: i64,
        charge: Cents,
        currency: impl Into<String>,
    ) -> Result<Self, RentalError> {
        if up_front_days <= 0 {
            return Err(RentalError::InvalidUpFrontDays(up_front_days));
        }

        Ok(Self {
            request_id: Uuid::new_v4(),
            film_id,
            customer_id,
            date_of_rent,
            up_front_days,
            charge,
            currency: currency.into(),
            date_of_return: None,
            surcharge: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.date_of_return.is_none()
    }

    /// Days held beyond the prepaid window, zero when returned in time.
    pub fn overdue_days(&self, return_date: NaiveDate) -> i64 {
        let held = (return_date - self.date_of_rent).num_days();
        (held - self.up_front_days).max(0)
    }

    /// Close the record. A record can only be closed once.
    pub fn close(&mut self, return_date: NaiveDate, surcharge: Cents) -> Result<(), RentalError> {
        if !self.is_open() {
            return Err(RentalError::AlreadyReturned(self.request_id));
        }
        self.date_of_return = Some(return_date);
        self.surcharge = Some(surcharge);
        Ok(())
    }

    pub fn matches(&self, customer_id: CustomerId, film_id: FilmId) -> bool {
        self.customer_id == customer_id && self.film_id == film_id
    }
}

/// Find the open record for a (customer, film) pair.
pub fn find_open(
    records: &[RentalRecord],
    customer_id: CustomerId,
    film_id: FilmId,
) -> Option<&RentalRecord> {
    records
        .iter()
        .find(|r| r.is_open() && r.matches(customer_id, film_id))
}

/// Number of units of a film currently out with customers.
pub fn outstanding_units(records: &[RentalRecord], film_id: FilmId) -> i64 {
    records
        .iter()
        .filter(|r| r.is_open() && r.film_id == film_id)
        .count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_record(up_front_days: i64) -> RentalRecord {
        RentalRecord::open(
            Uuid::new_v4(),
            Uuid::new_v4(),
            date("2024-03-01"),
            up_front_days,
            3000,
            "SEK",
        )
        .unwrap()
    }

    #[test]
    fn test_open_record() {
        let record = make_record(3);
        assert!(record.is_open());
        assert_eq!(record.surcharge, None);
        assert_eq!(record.date_of_return, None);
    }

    #[test]
    fn test_open_requires_positive_days() {
        let result = RentalRecord::open(
            Uuid::new_v4(),
            Uuid::new_v4(),
            date("2024-03-01"),
            0,
            0,
            "SEK",
        );
        assert_eq!(result, Err(RentalError::InvalidUpFrontDays(0)));
    }

    #[test]
    fn test_overdue_days() {
        let record = make_record(3);
        assert_eq!(record.overdue_days(date("2024-03-01")), 0);
        assert_eq!(record.overdue_days(date("2024-03-04")), 0);
        assert_eq!(record.overdue_days(date("2024-03-05")), 1);
        assert_eq!(record.overdue_days(date("2024-03-11")), 7);
    }

    #[test]
    fn test_close_only_once() {
        let mut record = make_record(1);

        record.close(date("2024-03-04"), 6000).unwrap();
        assert!(!record.is_open());
        assert_eq!(record.surcharge, Some(6000));

        assert_eq!(
            record.close(date("2024-03-05"), 0),
            Err(RentalError::AlreadyReturned(record.request_id))
        );
        assert_eq!(record.date_of_return, Some(date("2024-03-04")));
    }

    #[test]
    fn test_find_open_skips_closed_records() {
        let mut closed = make_record(1);
        let (customer, film) = (closed.customer_id, closed.film_id);
        closed.close(date("2024-03-02"), 0).unwrap();

        let mut reopened = make_record(2);
        reopened.customer_id = customer;
        reopened.film_id = film;

        let records = vec![closed, reopened.clone()];
        assert_eq!(find_open(&records, customer, film), Some(&reopened));
        assert_eq!(outstanding_units(&records, film), 1);
        assert_eq!(find_open(&records, Uuid::new_v4(), film), None);
    }
}
