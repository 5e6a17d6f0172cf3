use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::RentalService;
use crate::domain::{Customer, Film, PriceList, RentalRecord, format_cents};

/// Store snapshot for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub price_list: PriceList,
    pub films: Vec<Film>,
    pub customers: Vec<Customer>,
    pub rentals: Vec<RentalRecord>,
}

/// Exporter for dumping the ledger and inventory
pub struct Exporter<'a> {
    service: &'a RentalService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a RentalService) -> Self {
        Self { service }
    }

    /// Export the raw rental ledger to CSV. Open rentals leave the return
    /// columns empty.
    pub async fn export_ledger_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let records = self.service.get_store_ledger().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "request_id",
            "customer_id",
            "film_id",
            "date_of_rent",
            "up_front_days",
            "charge",
            "currency",
            "date_of_return",
            "surcharge",
        ])?;

        for record in &records {
            csv_writer.write_record(&[
                record.request_id.to_string(),
                record.customer_id.to_string(),
                record.film_id.to_string(),
                record.date_of_rent.to_string(),
                record.up_front_days.to_string(),
                format_cents(record.charge),
                record.currency.clone(),
                record
                    .date_of_return
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                record.surcharge.map(format_cents).unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(records.len())
    }

    /// Export the film inventory to CSV
    pub async fn export_inventory_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let films = self.service.get_inventory().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "title", "type", "items_total", "available_items"])?;
        for film in &films {
            csv_writer.write_record(&[
                film.id.to_string(),
                film.title.clone(),
                film.film_type.as_str().to_string(),
                film.items_total.to_string(),
                film.available_items.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(films.len())
    }

    /// Collect everything into a snapshot
    pub async fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(StoreSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            price_list: self.service.price_list().clone(),
            films: self.service.get_inventory().await?,
            customers: self.service.list_customers().await?,
            rentals: self.service.get_store_ledger().await?,
        })
    }

    /// Export the raw rental ledger as a pretty JSON array
    pub async fn export_ledger_json<W: Write>(&self, writer: W) -> Result<usize> {
        let records = self.service.get_store_ledger().await?;
        serde_json::to_writer_pretty(writer, &records)?;
        Ok(records.len())
    }

    /// Export the film inventory as a pretty JSON array
    pub async fn export_inventory_json<W: Write>(&self, writer: W) -> Result<usize> {
        let films = self.service.get_inventory().await?;
        serde_json::to_writer_pretty(writer, &films)?;
        Ok(films.len())
    }

    /// Export the full snapshot as pretty JSON
    pub async fn export_json<W: Write>(&self, writer: W) -> Result<usize> {
        let snapshot = self.snapshot().await?;
        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(snapshot.rentals.len())
    }
}
