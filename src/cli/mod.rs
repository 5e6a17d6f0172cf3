use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{ItemOutcome, RentItem, RentalService, ReturnItem};
use crate::domain::{FilmType, PriceList, RentalRecord, format_cents, parse_cents};
use crate::io::Exporter;

/// Up-front days used when a rent item omits them
const DEFAULT_UP_FRONT_DAYS: i64 = 1;

/// Rental Store - film rental and return desk
#[derive(Parser)]
#[command(name = "rental-store")]
#[command(about = "Rent and return films, tracking stock and the customer ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "RENTAL_STORE_DB", default_value = "rental_store.db")]
    pub database: String,

    /// Premium price (per day for new releases)
    #[arg(long, env = "RENTAL_STORE_PREMIUM_PRICE", default_value = "40.00", global = true)]
    pub premium_price: String,

    /// Basic price (regular and old films)
    #[arg(long, env = "RENTAL_STORE_BASIC_PRICE", default_value = "30.00", global = true)]
    pub basic_price: String,

    /// Currency code for all prices
    #[arg(long, env = "RENTAL_STORE_CURRENCY", default_value = "SEK", global = true)]
    pub currency: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Film catalog commands
    #[command(subcommand)]
    Film(FilmCommands),

    /// Customer commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Rent one or more films
    Rent {
        /// Customer ID
        #[arg(long)]
        customer: String,

        /// Films to rent as FILM_ID[:DAYS] (days default to 1)
        #[arg(required = true)]
        items: Vec<String>,

        /// Rental date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Return one or more films
    Return {
        /// Customer ID
        #[arg(long)]
        customer: String,

        /// Film IDs to return
        #[arg(required = true)]
        films: Vec<String>,

        /// Return date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the rental ledger for a customer or the whole store
    Ledger {
        /// Customer ID (omit for the whole store)
        #[arg(long)]
        customer: Option<String>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active price list
    Prices,

    /// Cross-check stock counters against open rentals
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: ledger, inventory, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (default: csv for ledger/inventory, json for full)
        #[arg(short, long)]
        format: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FilmCommands {
    /// Add a film to the catalog
    Add {
        /// Film title
        title: String,

        /// Film type: new_release, regular, old
        #[arg(short = 't', long = "type")]
        film_type: String,

        /// Number of physical items
        #[arg(short, long, default_value = "1")]
        items: i64,
    },

    /// List films with their stock
    List,
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer
    Add,

    /// List customers
    List,
}

impl Cli {
    /// Build the price list from the command-line / environment settings.
    pub fn price_list(&self) -> Result<PriceList> {
        let premium = parse_cents(&self.premium_price)
            .with_context(|| format!("Invalid premium price '{}'", self.premium_price))?;
        let basic = parse_cents(&self.basic_price)
            .with_context(|| format!("Invalid basic price '{}'", self.basic_price))?;
        let currency = self.currency.trim().to_uppercase();
        if currency.is_empty() {
            bail!("Currency must not be empty");
        }
        Ok(PriceList::new(premium, basic, currency))
    }

    pub async fn run(self) -> Result<()> {
        let prices = self.price_list()?;

        match self.command {
            Commands::Init => {
                RentalService::init(&self.database, prices).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Film(film_cmd) => {
                let service = RentalService::connect(&self.database, prices).await?;
                run_film_command(&service, film_cmd).await?;
            }

            Commands::Customer(customer_cmd) => {
                let service = RentalService::connect(&self.database, prices).await?;
                run_customer_command(&service, customer_cmd).await?;
            }

            Commands::Rent {
                customer,
                items,
                date,
                json,
            } => {
                let service = RentalService::connect(&self.database, prices).await?;
                let customer_id = parse_id(&customer, "customer")?;
                let items = items
                    .iter()
                    .map(|raw| parse_rent_item(raw))
                    .collect::<Result<Vec<_>>>()?;

                let outcomes = match date {
                    Some(date) => {
                        service
                            .rent_films_on(customer_id, &items, parse_date(&date)?)
                            .await?
                    }
                    None => service.rent_films(customer_id, &items).await?,
                };

                if json {
                    println!("{}", serde_json::to_string_pretty(&outcomes)?);
                } else {
                    let mut total = 0;
                    for outcome in &outcomes {
                        match outcome {
                            ItemOutcome::Completed(rented) => {
                                total = rented.charge.saturating_add(total);
                                println!(
                                    "Rented {} for {} day(s): {} {} ({})",
                                    rented.film_id,
                                    rented.up_front_days,
                                    format_cents(rented.charge),
                                    rented.currency,
                                    rented.request_id
                                );
                            }
                            ItemOutcome::Failed {
                                film_id,
                                error,
                                message,
                            } => println!("Failed {}: {} ({})", film_id, error, message),
                        }
                    }
                    println!(
                        "Total charge: {} {}",
                        format_cents(total),
                        service.price_list().currency
                    );
                }
            }

            Commands::Return {
                customer,
                films,
                date,
                json,
            } => {
                let service = RentalService::connect(&self.database, prices).await?;
                let customer_id = parse_id(&customer, "customer")?;
                let items = films
                    .iter()
                    .map(|raw| {
                        Ok(ReturnItem {
                            film_id: parse_id(raw, "film")?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let outcomes = match date {
                    Some(date) => {
                        service
                            .return_films_on(customer_id, &items, parse_date(&date)?)
                            .await?
                    }
                    None => service.return_films(customer_id, &items).await?,
                };

                if json {
                    println!("{}", serde_json::to_string_pretty(&outcomes)?);
                } else {
                    let mut total = 0;
                    for outcome in &outcomes {
                        match outcome {
                            ItemOutcome::Completed(returned) => {
                                total = returned.surcharge.saturating_add(total);
                                println!(
                                    "Returned {}: surcharge {} {}",
                                    returned.film_id,
                                    format_cents(returned.surcharge),
                                    returned.currency
                                );
                            }
                            ItemOutcome::Failed {
                                film_id,
                                error,
                                message,
                            } => println!("Failed {}: {} ({})", film_id, error, message),
                        }
                    }
                    println!(
                        "Total surcharge: {} {}",
                        format_cents(total),
                        service.price_list().currency
                    );
                }
            }

            Commands::Ledger { customer, json } => {
                let service = RentalService::connect(&self.database, prices).await?;
                let records = match customer {
                    Some(raw) => {
                        service
                            .get_customer_ledger(parse_id(&raw, "customer")?)
                            .await?
                    }
                    None => service.get_store_ledger().await?,
                };

                if json {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                } else {
                    print_ledger(&records);
                }
            }

            Commands::Prices => {
                println!("Premium price: {} {}", format_cents(prices.premium_price), prices.currency);
                println!("Basic price:   {} {}", format_cents(prices.basic_price), prices.currency);
                println!();
                println!("{:<12} {:<40} {:>10}", "TYPE", "UP-FRONT", "LATE/DAY");
                println!("{}", "-".repeat(64));
                for film_type in FilmType::ALL {
                    let rule = match film_type {
                        FilmType::NewRelease => "premium per day".to_string(),
                        FilmType::Regular => "basic for 3 days, then basic per day".to_string(),
                        FilmType::Old => "basic for 5 days, then basic per day".to_string(),
                    };
                    println!(
                        "{:<12} {:<40} {:>10}",
                        film_type.as_str(),
                        rule,
                        format_cents(prices.late_fee(film_type))
                    );
                }
            }

            Commands::Check => {
                let service = RentalService::connect(&self.database, prices).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                output,
                format,
            } => {
                let service = RentalService::connect(&self.database, prices).await?;
                run_export_command(&service, &export_type, output.as_deref(), format.as_deref())
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_film_command(service: &RentalService, cmd: FilmCommands) -> Result<()> {
    match cmd {
        FilmCommands::Add {
            title,
            film_type,
            items,
        } => {
            let film_type = FilmType::from_str(&film_type).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid film type '{}'. Use: new_release, regular, old",
                    film_type
                )
            })?;
            let film = service.add_film(&title, film_type, items).await?;
            println!(
                "Added film: {} ({}, {} item(s)) [{}]",
                film.title, film.film_type, film.items_total, film.id
            );
        }

        FilmCommands::List => {
            let films = service.get_inventory().await?;
            if films.is_empty() {
                println!("No films found.");
            } else {
                println!(
                    "{:<36}  {:<24} {:<12} {:>9} {:>6}",
                    "ID", "TITLE", "TYPE", "AVAILABLE", "TOTAL"
                );
                println!("{}", "-".repeat(92));
                for film in films {
                    println!(
                        "{:<36}  {:<24} {:<12} {:>9} {:>6}",
                        film.id,
                        truncate(&film.title, 24),
                        film.film_type.as_str(),
                        film.available_items,
                        film.items_total
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_customer_command(service: &RentalService, cmd: CustomerCommands) -> Result<()> {
    match cmd {
        CustomerCommands::Add => {
            let customer = service.add_customer().await?;
            println!("Registered customer: {}", customer.id);
        }

        CustomerCommands::List => {
            let customers = service.list_customers().await?;
            if customers.is_empty() {
                println!("No customers found.");
            } else {
                println!("{:<36}  {:<20}", "ID", "REGISTERED");
                println!("{}", "-".repeat(58));
                for customer in customers {
                    println!(
                        "{:<36}  {:<20}",
                        customer.id,
                        customer.created_at.format("%Y-%m-%d %H:%M").to_string()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_check_command(service: &RentalService) -> Result<()> {
    println!("Checking inventory against the ledger...\n");

    let check = service.check_inventory().await?;
    println!("Films:        {}", check.films_checked);
    println!("Open rentals: {}", check.open_rentals);
    println!();

    if check.is_consistent() {
        println!("Inventory is consistent.");
    } else {
        println!("Issues found:");
        for issue in &check.issues {
            println!(
                "  - {} ({}): {} available + {} rented != {} total",
                issue.title, issue.film_id, issue.available_items, issue.outstanding, issue.items_total
            );
        }
        bail!("Inventory check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &RentalService,
    export_type: &str,
    output: Option<&str>,
    format: Option<&str>,
) -> Result<()> {
    let format = format.unwrap_or(if export_type == "full" { "json" } else { "csv" });

    let writer: Box<dyn std::io::Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    let exporter = Exporter::new(service);
    let count = match (export_type, format) {
        ("ledger", "csv") => exporter.export_ledger_csv(writer).await?,
        ("inventory", "csv") => exporter.export_inventory_csv(writer).await?,
        ("ledger", "json") => exporter.export_ledger_json(writer).await?,
        ("inventory", "json") => exporter.export_inventory_json(writer).await?,
        ("full", "json") => exporter.export_json(writer).await?,
        ("ledger" | "inventory" | "full", other) => bail!("Unsupported format '{}'", other),
        (other, _) => bail!(
            "Unknown export type '{}'. Use: ledger, inventory, full",
            other
        ),
    };

    if let Some(path) = output {
        eprintln!("Exported {} record(s) to {}", count, path);
    }
    Ok(())
}

fn print_ledger(records: &[RentalRecord]) {
    if records.is_empty() {
        println!("No rentals found.");
        return;
    }

    println!(
        "{:<36}  {:<36}  {:<10} {:>4} {:>10} {:<10} {:>10}",
        "CUSTOMER", "FILM", "RENTED", "DAYS", "CHARGE", "RETURNED", "SURCHARGE"
    );
    println!("{}", "-".repeat(126));
    for record in records {
        println!(
            "{:<36}  {:<36}  {:<10} {:>4} {:>10} {:<10} {:>10}",
            record.customer_id,
            record.film_id,
            record.date_of_rent,
            record.up_front_days,
            format_cents(record.charge),
            record
                .date_of_return
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record
                .surcharge
                .map(format_cents)
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .with_context(|| format!("Invalid {} ID '{}' (expected UUID)", what, raw))
}

/// Parse "FILM_ID" or "FILM_ID:DAYS".
fn parse_rent_item(raw: &str) -> Result<RentItem> {
    let (id, days) = match raw.split_once(':') {
        Some((id, days)) => {
            let days: i64 = days
                .trim()
                .parse()
                .with_context(|| format!("Invalid up-front days in '{}'", raw))?;
            (id, days)
        }
        None => (raw, DEFAULT_UP_FRONT_DAYS),
    };

    Ok(RentItem {
        film_id: parse_id(id, "film")?,
        up_front_days: days,
    })
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
