//! Ledger properties checked end to end against the in-memory store.
//!
//! These exercise the coordinator, the history service and the audit
//! together, the way a routing layer would call them.

use std::sync::Arc;

use gaswatch::domain::ports::{
    LedgerCommand, PriceLedgerRepository, RetractPriceRequest, StationPricesQuery,
};
use gaswatch::domain::{
    ActivityKind, ActivityLogEntry, CorrelationId, ErrorCode, FuelType, PaymentMethod, Price,
    PriceBranch, PriceEntry, StationId, UserId,
};
use rstest::rstest;

mod support;

use support::{
    Ledger, STATION_ID, favorite_request, minutes_after_epoch, retract_request, submit_request,
};

/// Build a log of `len` entries mixing price updates and favorite toggles.
///
/// Price reports land at increasing minutes; favorites use the clock.
async fn mixed_log(ledger: &Ledger, user: &str, len: usize) {
    for index in 0..len {
        match index % 4 {
            1 => {
                ledger
                    .commands
                    .add_favorite(favorite_request(user, &format!("ChIJ-fav-{index}")))
                    .await
                    .expect("add favorite");
            }
            3 => {
                ledger
                    .commands
                    .remove_favorite(favorite_request(user, &format!("ChIJ-fav-{}", index - 2)))
                    .await
                    .expect("remove favorite");
            }
            _ => {
                let minute = i64::try_from(index).expect("small index");
                ledger
                    .commands
                    .submit_price(submit_request(
                        user,
                        "regular",
                        "cash",
                        &format!("3.{index:02}"),
                        minutes_after_epoch(minute),
                    ))
                    .await
                    .expect("submit price");
            }
        }
    }
}

async fn full_history(
    ledger: &Ledger,
    user: &str,
    filter: Option<&str>,
    sort: Option<&str>,
) -> Vec<ActivityLogEntry> {
    ledger
        .history_of(user, filter, sort, 1, 100)
        .await
        .expect("history loads")
        .history
        .into_items()
}

#[rstest]
#[tokio::test]
async fn submitted_price_is_logged_once_under_its_correlation_id() {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;

    let response = ledger
        .commands
        .submit_price(submit_request(&user, "premium", "credit", "4.19", minutes_after_epoch(0)))
        .await
        .expect("submit succeeds");

    let logged = full_history(&ledger, &user, Some("price"), None).await;
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].correlation_id(), Some(response.correlation_id));

    let latest = ledger
        .stations
        .latest_price(STATION_ID, "premium", "credit")
        .await
        .expect("station exists")
        .expect("branch has an entry");
    assert_eq!(latest.correlation_id, response.correlation_id);
}

#[rstest]
#[tokio::test]
async fn retracting_twice_is_a_quiet_no_op() {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    let response = ledger
        .commands
        .submit_price(submit_request(&user, "diesel", "cash", "4.59", minutes_after_epoch(0)))
        .await
        .expect("submit succeeds");
    let correlation_id = response.correlation_id.to_string();

    let first = ledger
        .commands
        .retract_price(retract_request(&user, "diesel", "cash", &correlation_id))
        .await
        .expect("first retraction succeeds");
    let second = ledger
        .commands
        .retract_price(retract_request(&user, "diesel", "cash", &correlation_id))
        .await
        .expect("second retraction succeeds");

    assert_eq!((first.prices_removed, first.log_entries_removed), (1, 1));
    assert_eq!((second.prices_removed, second.log_entries_removed), (0, 0));
}

/// Which part of the retraction key a caller gets wrong.
#[derive(Debug, Clone, Copy)]
enum KeyMismatch {
    FuelType,
    PaymentMethod,
    Station,
    Reporter,
}

#[rstest]
#[case::fuel_type(KeyMismatch::FuelType)]
#[case::payment_method(KeyMismatch::PaymentMethod)]
#[case::station(KeyMismatch::Station)]
#[case::reporter(KeyMismatch::Reporter)]
#[tokio::test]
async fn retraction_with_a_mismatched_key_changes_neither_side(#[case] mismatch: KeyMismatch) {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    let stranger = ledger.register("mallory").await;
    let response = ledger
        .commands
        .submit_price(submit_request(&user, "regular", "cash", "3.49", minutes_after_epoch(0)))
        .await
        .expect("submit succeeds");
    let correlation_id = response.correlation_id.to_string();

    let request = match mismatch {
        KeyMismatch::FuelType => retract_request(&user, "premium", "cash", &correlation_id),
        KeyMismatch::PaymentMethod => retract_request(&user, "regular", "credit", &correlation_id),
        KeyMismatch::Station => RetractPriceRequest {
            station_id: "ChIJ-some-other-station".to_owned(),
            ..retract_request(&user, "regular", "cash", &correlation_id)
        },
        KeyMismatch::Reporter => retract_request(&stranger, "regular", "cash", &correlation_id),
    };
    let retraction = ledger
        .commands
        .retract_price(request)
        .await
        .expect("retraction succeeds");

    assert_eq!(
        (retraction.prices_removed, retraction.log_entries_removed),
        (0, 0)
    );
    let latest = ledger
        .stations
        .latest_price(STATION_ID, "regular", "cash")
        .await
        .expect("latest price read");
    assert_eq!(
        latest.map(|entry| entry.correlation_id),
        Some(response.correlation_id)
    );
    let logged = full_history(&ledger, &user, Some("price"), None).await;
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].correlation_id(), Some(response.correlation_id));
    assert!(ledger.audit.audit().await.expect("audit runs").is_consistent());
}

#[rstest]
#[tokio::test]
async fn user_ids_match_whatever_uuid_spelling_the_caller_sends() {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    let shouted = user.to_uppercase();
    let bare = user.replace('-', "");

    let response = ledger
        .commands
        .submit_price(submit_request(&shouted, "diesel", "credit", "4.19", minutes_after_epoch(0)))
        .await
        .expect("uppercase reporter id is known");
    let history = ledger
        .history_of(&bare, Some("price"), None, 1, 10)
        .await
        .expect("simple-hex id finds the same user");
    assert_eq!(history.history.total_count(), 1);

    let retraction = ledger
        .commands
        .retract_price(retract_request(
            &format!("urn:uuid:{user}"),
            "diesel",
            "credit",
            &response.correlation_id.to_string(),
        ))
        .await
        .expect("retraction succeeds");
    assert_eq!(
        (retraction.prices_removed, retraction.log_entries_removed),
        (1, 1)
    );
}

#[rstest]
#[case(1)]
#[case(4)]
#[case(7)]
#[case(23)]
#[case(40)]
#[tokio::test]
async fn pages_partition_the_filtered_log(#[case] page_size: u32) {
    const LEN: usize = 23;
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    mixed_log(&ledger, &user, LEN).await;
    let everything = full_history(&ledger, &user, None, None).await;

    let first = ledger
        .history_of(&user, None, None, 1, page_size)
        .await
        .expect("first page loads")
        .history;
    let pages = first.total_pages();
    assert_eq!(first.total_count(), 23);
    assert_eq!(pages, 23_u64.div_ceil(u64::from(page_size)));

    let mut stitched = Vec::new();
    let mut last_len = 0;
    for page in 1..=u32::try_from(pages).expect("few pages") {
        let items = ledger
            .history_of(&user, None, None, page, page_size)
            .await
            .expect("page loads")
            .history
            .into_items();
        last_len = items.len();
        stitched.extend(items);
    }

    assert_eq!(stitched, everything);
    let size = usize::try_from(page_size).expect("small page size");
    let expected_last = if LEN % size == 0 { size } else { LEN % size };
    assert_eq!(last_len, expected_last.min(LEN));
}

#[rstest]
#[tokio::test]
async fn price_and_favorite_filters_split_the_log() {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    mixed_log(&ledger, &user, 18).await;

    let everything = full_history(&ledger, &user, None, Some("asc")).await;
    let prices = full_history(&ledger, &user, Some("price"), Some("asc")).await;
    let favorites = full_history(&ledger, &user, Some("favorites"), Some("asc")).await;

    assert!(prices.iter().all(|entry| entry.kind() == ActivityKind::PriceUpdate));
    assert!(favorites.iter().all(|entry| entry.kind().is_favorite()));
    assert_eq!(prices.len() + favorites.len(), everything.len());
    for entry in &everything {
        let in_prices = prices.contains(entry);
        let in_favorites = favorites.contains(entry);
        assert!(in_prices != in_favorites, "{entry:?} must be in exactly one side");
    }
}

#[rstest]
#[case(None)]
#[case(Some("price"))]
#[case(Some("favorites"))]
#[tokio::test]
async fn descending_is_the_exact_reverse_of_ascending(#[case] filter: Option<&str>) {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    mixed_log(&ledger, &user, 15).await;

    let ascending = full_history(&ledger, &user, filter, Some("asc")).await;
    let mut descending = full_history(&ledger, &user, filter, Some("desc")).await;
    descending.reverse();

    assert_eq!(ascending, descending);
}

#[rstest]
#[tokio::test]
async fn first_descending_page_holds_the_ten_newest_of_twenty_five() {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    for minute in 0..25 {
        ledger
            .commands
            .submit_price(submit_request(
                &user,
                "midgrade",
                "credit",
                &format!("3.{minute:02}"),
                minutes_after_epoch(minute),
            ))
            .await
            .expect("submit succeeds");
    }

    let page = ledger
        .history_of(&user, None, Some("desc"), 1, 10)
        .await
        .expect("history loads")
        .history;

    assert_eq!(page.total_count(), 25);
    let times: Vec<_> = page.items().iter().map(|entry| entry.occurred_at).collect();
    let expected: Vec<_> = (15..25).rev().map(minutes_after_epoch).collect();
    assert_eq!(times, expected);
}

#[rstest]
#[tokio::test]
async fn history_of_a_silent_user_is_empty_not_an_error() {
    let ledger = Ledger::new();
    let user = ledger.register("quiet").await;

    let response = ledger
        .history_of(&user, None, None, 1, 10)
        .await
        .expect("history loads");

    assert_eq!(response.username.to_string(), "quiet");
    assert_eq!(response.history.total_count(), 0);
    assert!(response.history.items().is_empty());
}

#[rstest]
#[tokio::test]
async fn history_of_an_unknown_user_is_user_not_found() {
    let ledger = Ledger::new();

    let error = ledger
        .history_of(&UserId::random().to_string(), None, None, 1, 10)
        .await
        .expect_err("unknown user");

    assert_eq!(error.code(), ErrorCode::UserNotFound);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_to_one_branch_all_land() {
    let ledger = Arc::new(Ledger::new());
    let user = ledger.register("ines").await;

    let tasks: Vec<_> = (0..16_i64)
        .map(|minute| {
            let ledger = Arc::clone(&ledger);
            let user = user.clone();
            tokio::spawn(async move {
                ledger
                    .commands
                    .submit_price(submit_request(
                        &user,
                        "regular",
                        "credit",
                        "3.79",
                        minutes_after_epoch(minute),
                    ))
                    .await
            })
        })
        .collect();
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.expect("task joins").expect("submit succeeds").correlation_id);
    }

    let station = ledger
        .stations
        .get_station(STATION_ID)
        .await
        .expect("station read")
        .station()
        .cloned()
        .expect("station exists");
    let branch = PriceBranch::new(FuelType::Regular, PaymentMethod::Credit);
    let stored: Vec<CorrelationId> = station
        .branch(branch)
        .expect("branch exists")
        .iter()
        .map(|entry| entry.correlation_id)
        .collect();
    assert_eq!(stored.len(), 16);
    assert!(ids.iter().all(|id| stored.contains(id)));
}

#[rstest]
#[tokio::test]
async fn audit_finds_and_repairs_a_price_without_a_log_entry() {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    ledger
        .commands
        .submit_price(submit_request(&user, "regular", "cash", "3.49", minutes_after_epoch(0)))
        .await
        .expect("paired submission");
    let orphan = PriceEntry {
        price: Price::new("9.99").expect("valid price"),
        reported_by: UserId::new(&user).expect("valid id"),
        reported_at: minutes_after_epoch(1),
        recorded_at: minutes_after_epoch(1),
        correlation_id: CorrelationId::random(),
    };
    let station_id = StationId::new(STATION_ID).expect("valid id");
    let branch = PriceBranch::new(FuelType::Regular, PaymentMethod::Cash);
    ledger
        .store
        .append_price(&station_id, branch, &orphan)
        .await
        .expect("direct append");

    let report = ledger.audit.audit().await.expect("audit runs");
    assert_eq!(report.orphaned_prices.len(), 1);
    assert_eq!(report.orphaned_prices[0].correlation_id, orphan.correlation_id);
    assert!(report.orphaned_log_entries.is_empty());

    let summary = ledger.audit.repair(&report).await.expect("repair runs");
    assert_eq!(summary.prices_retracted, 1);
    let rerun = ledger.audit.repair(&report).await.expect("repair reruns");
    assert_eq!(rerun.prices_retracted, 0);
    assert!(ledger.audit.audit().await.expect("audit reruns").is_consistent());
}

#[rstest]
#[tokio::test]
async fn audit_leaves_a_price_inside_the_grace_period_alone() {
    let ledger = Ledger::new();
    let user = ledger.register("ines").await;
    // Stands in for a submission whose log write has not landed yet.
    let in_flight = PriceEntry {
        price: Price::new("3.59").expect("valid price"),
        reported_by: UserId::new(&user).expect("valid id"),
        reported_at: minutes_after_epoch(0),
        recorded_at: minutes_after_epoch(10_000),
        correlation_id: CorrelationId::random(),
    };
    let station_id = StationId::new(STATION_ID).expect("valid id");
    let branch = PriceBranch::new(FuelType::Premium, PaymentMethod::Credit);
    ledger
        .store
        .append_price(&station_id, branch, &in_flight)
        .await
        .expect("direct append");

    let report = ledger.audit.audit().await.expect("audit runs");
    assert!(report.recorded_before < in_flight.recorded_at);
    assert!(report.is_consistent());

    let summary = ledger.audit.repair(&report).await.expect("repair runs");
    assert_eq!(summary.prices_retracted, 0);
    let latest = ledger
        .stations
        .latest_price(STATION_ID, "premium", "credit")
        .await
        .expect("latest price read");
    assert_eq!(
        latest.map(|entry| entry.correlation_id),
        Some(in_flight.correlation_id)
    );
}
