mod common;

use anyhow::Result;
use chrono::Days;
use rental_store::application::{AppError, RentalService};
use rental_store::domain::{ErrorKind, FilmType, PriceList};
use uuid::Uuid;

use common::{StandardFilms, give_back, parse_date, rent, scenario_prices, sqlite_service};

// Each scenario runs against both backends.

async fn rent_and_return_same_day(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;
    let customer = service.add_customer().await?;
    let today = parse_date("2024-04-02");

    let outcomes = service
        .rent_films_on(customer.id, &[rent(&films.spider_man, 3)], today)
        .await?;
    assert_eq!(outcomes.len(), 1);
    let rented = outcomes[0].completed().expect("rent should succeed");
    assert_eq!(rented.charge, 1100);
    assert_eq!(rented.currency, "SEK");

    let film = service.find_film(films.spider_man.id).await?;
    assert_eq!(film.available_items, 49);

    let ledger = service.get_customer_ledger(customer.id).await?;
    assert_eq!(ledger.len(), 1);
    assert!(ledger[0].is_open());
    assert_eq!(ledger[0].request_id, rented.request_id);
    assert_eq!(ledger[0].date_of_rent, today);
    assert_eq!(ledger[0].up_front_days, 3);

    let outcomes = service
        .return_films_on(customer.id, &[give_back(&films.spider_man)], today)
        .await?;
    let returned = outcomes[0].completed().expect("return should succeed");
    assert_eq!(returned.surcharge, 0);
    assert_eq!(returned.request_id, rented.request_id);

    let film = service.find_film(films.spider_man.id).await?;
    assert_eq!(film.available_items, 50);

    let ledger = service.get_customer_ledger(customer.id).await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].date_of_return, Some(today));
    assert_eq!(ledger[0].surcharge, Some(0));

    Ok(())
}

async fn duplicate_rent_is_rejected(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;
    let customer = service.add_customer().await?;
    let today = parse_date("2024-04-02");

    let first = service
        .rent_films_on(customer.id, &[rent(&films.spider_man, 3)], today)
        .await?;
    assert!(first[0].is_completed());

    let second = service
        .rent_films_on(customer.id, &[rent(&films.spider_man, 1)], today)
        .await?;
    assert_eq!(second[0].error(), Some(ErrorKind::DuplicateRental));

    let film = service.find_film(films.spider_man.id).await?;
    assert_eq!(film.available_items, 49);

    let ledger = service.get_customer_ledger(customer.id).await?;
    assert_eq!(ledger.len(), 1);
    assert!(ledger[0].is_open());
    assert_eq!(ledger[0].up_front_days, 3);

    // Another customer can still rent the same title
    let other = service.add_customer().await?;
    let outcomes = service
        .rent_films_on(other.id, &[rent(&films.spider_man, 1)], today)
        .await?;
    assert!(outcomes[0].is_completed());

    Ok(())
}

async fn batch_with_out_of_stock_item(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;
    let scarce = service.add_film("Last Copy", FilmType::Regular, 1).await?;
    let first_customer = service.add_customer().await?;
    let customer = service.add_customer().await?;
    let today = parse_date("2024-04-02");

    service
        .rent_films_on(first_customer.id, &[rent(&scarce, 1)], today)
        .await?;

    let outcomes = service
        .rent_films_on(
            customer.id,
            &[rent(&films.matrix, 2), rent(&scarce, 2)],
            today,
        )
        .await?;

    assert_eq!(outcomes.len(), 2);
    let rented = outcomes[0].completed().expect("first item should succeed");
    assert_eq!(rented.film_id, films.matrix.id);
    assert_eq!(rented.charge, 8000);
    assert_eq!(outcomes[1].error(), Some(ErrorKind::Unavailable));

    assert_eq!(service.find_film(films.matrix.id).await?.available_items, 49);
    assert_eq!(service.find_film(scarce.id).await?.available_items, 0);

    let ledger = service.get_customer_ledger(customer.id).await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].film_id, films.matrix.id);

    Ok(())
}

async fn second_return_is_not_found(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;
    let customer = service.add_customer().await?;
    let today = parse_date("2024-04-02");

    service
        .rent_films_on(customer.id, &[rent(&films.out_of_africa, 5)], today)
        .await?;
    service
        .return_films_on(customer.id, &[give_back(&films.out_of_africa)], today)
        .await?;

    let again = service
        .return_films_on(customer.id, &[give_back(&films.out_of_africa)], today)
        .await?;
    assert_eq!(again[0].error(), Some(ErrorKind::NotFound));
    assert_eq!(
        service.find_film(films.out_of_africa.id).await?.available_items,
        50
    );

    // Never-rented film in the same batch as a valid return
    service
        .rent_films_on(customer.id, &[rent(&films.matrix, 1)], today)
        .await?;
    let outcomes = service
        .return_films_on(
            customer.id,
            &[give_back(&films.spider_man_2), give_back(&films.matrix)],
            today,
        )
        .await?;
    assert_eq!(outcomes[0].error(), Some(ErrorKind::NotFound));
    assert!(outcomes[1].is_completed());

    Ok(())
}

async fn late_return_is_surcharged(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;
    let customer = service.add_customer().await?;
    let rented_on = parse_date("2024-04-02");

    service
        .rent_films_on(
            customer.id,
            &[
                rent(&films.matrix, 1),
                rent(&films.spider_man, 5),
                rent(&films.out_of_africa, 7),
            ],
            rented_on,
        )
        .await?;

    let returned_on = rented_on.checked_add_days(Days::new(7)).unwrap();
    let outcomes = service
        .return_films_on(
            customer.id,
            &[
                give_back(&films.matrix),
                give_back(&films.spider_man),
                give_back(&films.out_of_africa),
            ],
            returned_on,
        )
        .await?;

    let surcharges: Vec<i64> = outcomes
        .iter()
        .map(|o| o.completed().expect("return should succeed").surcharge)
        .collect();
    // 6 days late at premium, 2 days late at basic, on time
    assert_eq!(surcharges, vec![6 * 4000, 2 * 1100, 0]);

    let ledger = service.get_customer_ledger(customer.id).await?;
    assert!(ledger.iter().all(|r| r.date_of_return == Some(returned_on)));
    assert_eq!(ledger[0].surcharge, Some(24000));

    Ok(())
}

async fn early_return_is_not_refunded(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;
    let customer = service.add_customer().await?;
    let rented_on = parse_date("2024-04-02");

    let outcomes = service
        .rent_films_on(customer.id, &[rent(&films.matrix, 5)], rented_on)
        .await?;
    assert_eq!(outcomes[0].completed().unwrap().charge, 20000);

    let outcomes = service
        .return_films_on(
            customer.id,
            &[give_back(&films.matrix)],
            rented_on.checked_add_days(Days::new(1)).unwrap(),
        )
        .await?;
    assert_eq!(outcomes[0].completed().unwrap().surcharge, 0);

    let ledger = service.get_customer_ledger(customer.id).await?;
    assert_eq!(ledger[0].charge, 20000);

    Ok(())
}

async fn unknown_film_and_customer(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;
    let customer = service.add_customer().await?;
    let today = parse_date("2024-04-02");

    let outcomes = service
        .rent_films_on(
            customer.id,
            &[
                rental_store::application::RentItem {
                    film_id: Uuid::new_v4(),
                    up_front_days: 1,
                },
                rent(&films.spider_man, 1),
            ],
            today,
        )
        .await?;
    assert_eq!(outcomes[0].error(), Some(ErrorKind::NotFound));
    assert!(outcomes[1].is_completed());

    let result = service.get_customer_ledger(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::CustomerNotFound(_))));

    let result = service
        .return_films_on(Uuid::new_v4(), &[give_back(&films.spider_man)], today)
        .await;
    assert!(matches!(result, Err(AppError::CustomerNotFound(_))));

    Ok(())
}

async fn rent_again_after_return(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;
    let customer = service.add_customer().await?;
    let today = parse_date("2024-04-02");

    for _ in 0..3 {
        let rented = service
            .rent_films_on(customer.id, &[rent(&films.spider_man_2, 2)], today)
            .await?;
        assert!(rented[0].is_completed());
        let returned = service
            .return_films_on(customer.id, &[give_back(&films.spider_man_2)], today)
            .await?;
        assert!(returned[0].is_completed());
    }

    let ledger = service.get_customer_ledger(customer.id).await?;
    assert_eq!(ledger.len(), 3);
    assert!(ledger.iter().all(|r| !r.is_open()));
    assert_eq!(service.get_store_ledger().await?.len(), 3);
    assert!(service.check_inventory().await?.is_consistent());

    Ok(())
}

async fn inventory_lists_all_films(service: &RentalService) -> Result<()> {
    let films = StandardFilms::create(service).await?;

    let inventory = service.get_inventory().await?;
    let titles: Vec<&str> = inventory.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Matrix 11", "Spider Man", "Spider Man 2", "Out of Africa"]
    );
    assert!(
        inventory
            .iter()
            .all(|f| f.available_items == f.items_total)
    );
    assert_eq!(inventory[0], films.matrix);

    Ok(())
}

macro_rules! on_both_backends {
    ($($scenario:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $scenario() -> anyhow::Result<()> {
                    let service = super::RentalService::in_memory(super::scenario_prices());
                    super::$scenario(&service).await
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test]
                async fn $scenario() -> anyhow::Result<()> {
                    let (service, _temp) = super::sqlite_service(super::scenario_prices()).await?;
                    super::$scenario(&service).await
                }
            )*
        }
    };
}

on_both_backends!(
    rent_and_return_same_day,
    duplicate_rent_is_rejected,
    batch_with_out_of_stock_item,
    second_return_is_not_found,
    late_return_is_surcharged,
    early_return_is_not_refunded,
    unknown_film_and_customer,
    rent_again_after_return,
    inventory_lists_all_films,
);

#[tokio::test]
async fn test_default_price_list() -> Result<()> {
    let service = RentalService::in_memory(PriceList::default());
    let films = StandardFilms::create(&service).await?;
    let customer = service.add_customer().await?;

    let outcomes = service
        .rent_films(
            customer.id,
            &[
                rent(&films.matrix, 1),
                rent(&films.spider_man, 5),
                rent(&films.spider_man_2, 2),
                rent(&films.out_of_africa, 7),
            ],
        )
        .await?;

    let charges: Vec<i64> = outcomes
        .iter()
        .map(|o| o.completed().unwrap().charge)
        .collect();
    assert_eq!(charges, vec![4000, 9000, 3000, 9000]);

    Ok(())
}
