//! Shared helpers for the ledger integration and behaviour suites.
//!
//! Integration tests compile as separate crates, so not every helper is used
//! by every suite.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use gaswatch::domain::ports::{
    ActivityHistoryQuery, ActivityHistoryRequest, ActivityHistoryResponse, FavoriteRequest,
    RetractPriceRequest, SubmitPriceRequest,
};
use gaswatch::domain::{
    ActivityHistoryService, Error, HistoryPaging, LedgerAuditService, LedgerCoordinator,
    StationPricesService, UserAccount, UserId, Username,
};
use gaswatch::outbound::memory::InMemoryLedgerStore;
use mockable::Clock;

pub const STATION_ID: &str = "ChIJN1t_tDeuEmsRUsoyG83frY4";
pub const STATION_NAME: &str = "Harbour Fuel";
pub const STATION_ADDRESS: &str = "12 Quay Rd";

/// Fixed instant every suite measures time from.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// `epoch()` plus `minutes`.
pub fn minutes_after_epoch(minutes: i64) -> DateTime<Utc> {
    epoch() + Duration::minutes(minutes)
}

/// Clock that moves forward one minute per reading.
#[derive(Debug, Default)]
pub struct SteppingClock {
    ticks: AtomicI64,
}

impl SteppingClock {
    /// Start after `minutes`, so clock readings never collide with
    /// hand-picked report times below that mark.
    pub fn starting_at(minutes: i64) -> Self {
        Self {
            ticks: AtomicI64::new(minutes),
        }
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        minutes_after_epoch(self.ticks.fetch_add(1, Ordering::SeqCst))
    }
}

type Store = InMemoryLedgerStore;

/// Every ledger service wired to one shared in-memory store.
pub struct Ledger {
    pub store: Arc<Store>,
    pub commands: LedgerCoordinator<Store, Store>,
    pub history: ActivityHistoryService<Store>,
    pub stations: StationPricesService<Store>,
    pub audit: LedgerAuditService<Store, Store>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_clock(SteppingClock::starting_at(10_000))
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let clock: Arc<dyn Clock> = Arc::new(clock);
        Self {
            commands: LedgerCoordinator::new(store.clone(), store.clone(), clock.clone()),
            history: ActivityHistoryService::new(store.clone(), HistoryPaging::default()),
            stations: StationPricesService::new(store.clone()),
            audit: LedgerAuditService::new(store.clone(), store.clone(), clock),
            store,
        }
    }

    /// Register a user and return their id as a request would carry it.
    pub async fn register(&self, username: &str) -> String {
        let id = UserId::random();
        self.store
            .insert_user(UserAccount::new(
                id.clone(),
                Username::new(username).expect("valid username"),
            ))
            .await;
        id.to_string()
    }

    pub async fn history_of(
        &self,
        user_id: &str,
        filter: Option<&str>,
        sort: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<ActivityHistoryResponse, Error> {
        self.history
            .history(ActivityHistoryRequest {
                user_id: user_id.to_owned(),
                filter: filter.map(str::to_owned),
                sort: sort.map(str::to_owned),
                page: Some(page),
                page_size: Some(page_size),
            })
            .await
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

pub fn submit_request(
    reporter_id: &str,
    fuel_type: &str,
    payment_method: &str,
    price: &str,
    reported_at: DateTime<Utc>,
) -> SubmitPriceRequest {
    SubmitPriceRequest {
        station_id: STATION_ID.to_owned(),
        station_name: STATION_NAME.to_owned(),
        station_address: STATION_ADDRESS.to_owned(),
        fuel_type: fuel_type.to_owned(),
        payment_method: payment_method.to_owned(),
        price: price.to_owned(),
        reporter_id: reporter_id.to_owned(),
        reported_at,
    }
}

pub fn retract_request(
    reporter_id: &str,
    fuel_type: &str,
    payment_method: &str,
    correlation_id: &str,
) -> RetractPriceRequest {
    RetractPriceRequest {
        station_id: STATION_ID.to_owned(),
        fuel_type: fuel_type.to_owned(),
        payment_method: payment_method.to_owned(),
        correlation_id: correlation_id.to_owned(),
        reporter_id: reporter_id.to_owned(),
    }
}

pub fn favorite_request(user_id: &str, station_id: &str) -> FavoriteRequest {
    FavoriteRequest {
        user_id: user_id.to_owned(),
        station_id: station_id.to_owned(),
        station_name: STATION_NAME.to_owned(),
        station_address: STATION_ADDRESS.to_owned(),
    }
}
