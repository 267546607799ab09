//! Station identity and the per-station price ledger.
//!
//! A station's prices live under a branch keyed by fuel type and payment
//! method. Both halves of the key are closed enums, so no caller supplied
//! string ever becomes a storage location.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::correlation::CorrelationId;
use super::user::UserId;

/// Maximum accepted length of an external place identifier.
pub const STATION_ID_MAX: usize = 255;

/// Validation errors raised while building station values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationValidationError {
    EmptyId,
    IdHasSurroundingWhitespace,
    IdTooLong { max: usize },
    IdHasControlCharacters,
    UnknownFuelType { value: String },
    UnknownPaymentMethod { value: String },
    EmptyPrice,
}

impl fmt::Display for StationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "station id must not be empty"),
            Self::IdHasSurroundingWhitespace => {
                write!(f, "station id must not start or end with whitespace")
            }
            Self::IdTooLong { max } => write!(f, "station id must be at most {max} characters"),
            Self::IdHasControlCharacters => {
                write!(f, "station id must not contain control characters")
            }
            Self::UnknownFuelType { value } => write!(
                f,
                "unknown fuel type `{value}`; expected regular, midgrade, premium or diesel"
            ),
            Self::UnknownPaymentMethod { value } => write!(
                f,
                "unknown payment method `{value}`; expected cash or credit"
            ),
            Self::EmptyPrice => write!(f, "price must not be empty"),
        }
    }
}

impl std::error::Error for StationValidationError {}

impl StationValidationError {
    /// Name of the request field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyId
            | Self::IdHasSurroundingWhitespace
            | Self::IdTooLong { .. }
            | Self::IdHasControlCharacters => "stationId",
            Self::UnknownFuelType { .. } => "fuelType",
            Self::UnknownPaymentMethod { .. } => "paymentMethod",
            Self::EmptyPrice => "price",
        }
    }
}

/// External place identifier of a station.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Validate and construct a [`StationId`].
    ///
    /// # Examples
    /// ```
    /// use gaswatch::domain::StationId;
    ///
    /// assert!(StationId::new("ChIJN1t_tDeuEmsRUsoyG83frY4").is_ok());
    /// assert!(StationId::new(" padded ").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, StationValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(StationValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(StationValidationError::IdHasSurroundingWhitespace);
        }
        if id.chars().count() > STATION_ID_MAX {
            return Err(StationValidationError::IdTooLong {
                max: STATION_ID_MAX,
            });
        }
        if id.chars().any(char::is_control) {
            return Err(StationValidationError::IdHasControlCharacters);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for StationId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StationId> for String {
    fn from(value: StationId) -> Self {
        value.0
    }
}

impl TryFrom<String> for StationId {
    type Error = StationValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Fuel grades a price can be reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Regular,
    Midgrade,
    Premium,
    Diesel,
}

impl FuelType {
    /// Every fuel type in display order.
    pub const ALL: [Self; 4] = [Self::Regular, Self::Midgrade, Self::Premium, Self::Diesel];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Midgrade => "midgrade",
            Self::Premium => "premium",
            Self::Diesel => "diesel",
        }
    }
}

impl FromStr for FuelType {
    type Err = StationValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|fuel| fuel.as_str() == value)
            .ok_or_else(|| StationValidationError::UnknownFuelType {
                value: value.to_owned(),
            })
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer pays at the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Credit,
}

impl PaymentMethod {
    /// Every payment method in display order.
    pub const ALL: [Self; 2] = [Self::Cash, Self::Credit];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Credit => "credit",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = StationValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == value)
            .ok_or_else(|| StationValidationError::UnknownPaymentMethod {
                value: value.to_owned(),
            })
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a price history within a station: `fuelType.paymentMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBranch {
    pub fuel_type: FuelType,
    pub payment_method: PaymentMethod,
}

impl PriceBranch {
    pub const fn new(fuel_type: FuelType, payment_method: PaymentMethod) -> Self {
        Self {
            fuel_type,
            payment_method,
        }
    }

    /// Parse both halves of the key from request strings.
    ///
    /// Rejects anything outside the known enums before it can reach storage.
    pub fn parse(fuel_type: &str, payment_method: &str) -> Result<Self, StationValidationError> {
        Ok(Self::new(fuel_type.parse()?, payment_method.parse()?))
    }

    /// Canonical dotted record path, e.g. `regular.cash`.
    pub fn path(&self) -> String {
        format!("{}.{}", self.fuel_type, self.payment_method)
    }
}

impl fmt::Display for PriceBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.fuel_type, self.payment_method)
    }
}

/// Reported price text. Stored verbatim; only blank values are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(String);

impl Price {
    pub fn new(value: impl Into<String>) -> Result<Self, StationValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(StationValidationError::EmptyPrice);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for Price {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Price> for String {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl TryFrom<String> for Price {
    type Error = StationValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Display metadata for a station, copied into favorites and log entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDetails {
    pub id: StationId,
    pub name: String,
    pub address: String,
}

impl StationDetails {
    pub fn new(id: StationId, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            address: address.into(),
        }
    }
}

/// One immutable price observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub price: Price,
    pub reported_by: UserId,
    /// When the reporter says the price was seen.
    pub reported_at: DateTime<Utc>,
    /// When the ledger stored the entry.
    pub recorded_at: DateTime<Utc>,
    pub correlation_id: CorrelationId,
}

/// Snapshot of a station's price ledger.
///
/// ## Invariants
/// - A branch is present only once it has received at least one report.
/// - A branch whose entries were all retracted stays present and empty, so
///   "retracted" and "never reported" remain distinguishable.
/// - Entries within a branch keep append order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    id: StationId,
    branches: BTreeMap<PriceBranch, Vec<PriceEntry>>,
}

impl Station {
    /// A station with no branches yet.
    pub fn new(id: StationId) -> Self {
        Self {
            id,
            branches: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &StationId {
        &self.id
    }

    /// Entries recorded under `branch`, or `None` when it was never reported.
    pub fn branch(&self, branch: PriceBranch) -> Option<&[PriceEntry]> {
        self.branches.get(&branch).map(Vec::as_slice)
    }

    /// Every present branch in key order.
    pub fn branches(&self) -> impl Iterator<Item = (PriceBranch, &[PriceEntry])> {
        self.branches
            .iter()
            .map(|(branch, entries)| (*branch, entries.as_slice()))
    }

    /// Present branches for a single fuel type, keyed by payment method.
    pub fn fuel_type(&self, fuel_type: FuelType) -> BTreeMap<PaymentMethod, &[PriceEntry]> {
        self.branches()
            .filter(|(branch, _)| branch.fuel_type == fuel_type)
            .map(|(branch, entries)| (branch.payment_method, entries))
            .collect()
    }

    /// Most recently appended entry of `branch`.
    pub fn latest(&self, branch: PriceBranch) -> Option<&PriceEntry> {
        self.branch(branch).and_then(<[PriceEntry]>::last)
    }

    /// Mark `branch` as present without adding an entry.
    pub fn ensure_branch(&mut self, branch: PriceBranch) {
        self.branches.entry(branch).or_default();
    }

    /// Append an entry, creating the branch on first use.
    pub fn append(&mut self, branch: PriceBranch, entry: PriceEntry) {
        self.branches.entry(branch).or_default().push(entry);
    }

    /// Remove the entry carrying `correlation_id` from `branch`.
    ///
    /// Only an entry reported by `reported_by` matches. Returns how many
    /// entries were removed; zero when nothing matched.
    pub fn retract(
        &mut self,
        branch: PriceBranch,
        reported_by: &UserId,
        correlation_id: CorrelationId,
    ) -> u64 {
        let Some(entries) = self.branches.get_mut(&branch) else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|entry| {
            entry.correlation_id != correlation_id || entry.reported_by != *reported_by
        });
        u64::try_from(before.saturating_sub(entries.len())).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    //! Station ledger behaviour.

    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    const REPORTER: &str = "7d4c2a8e-5b1f-4e39-9c60-2f8a1d3b6e05";

    fn entry(price: &str, correlation_id: CorrelationId) -> PriceEntry {
        let at = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        PriceEntry {
            price: Price::new(price).expect("valid price"),
            reported_by: UserId::new(REPORTER).expect("valid id"),
            reported_at: at,
            recorded_at: at,
            correlation_id,
        }
    }

    #[fixture]
    fn reporter() -> UserId {
        UserId::new(REPORTER).expect("valid id")
    }

    #[fixture]
    fn regular_cash() -> PriceBranch {
        PriceBranch::new(FuelType::Regular, PaymentMethod::Cash)
    }

    #[fixture]
    fn station() -> Station {
        Station::new(StationId::new("ChIJ-station").expect("valid id"))
    }

    #[rstest]
    #[case("", StationValidationError::EmptyId)]
    #[case(" abc", StationValidationError::IdHasSurroundingWhitespace)]
    #[case("abc\u{0007}", StationValidationError::IdHasControlCharacters)]
    fn station_id_rejects_malformed_values(
        #[case] raw: &str,
        #[case] expected: StationValidationError,
    ) {
        assert_eq!(StationId::new(raw), Err(expected));
    }

    #[rstest]
    fn station_id_rejects_overlong_values() {
        let raw = "x".repeat(STATION_ID_MAX + 1);
        assert_eq!(
            StationId::new(raw),
            Err(StationValidationError::IdTooLong {
                max: STATION_ID_MAX
            })
        );
    }

    #[rstest]
    #[case("regular", "cash", "regular.cash")]
    #[case("diesel", "credit", "diesel.credit")]
    #[case("midgrade", "credit", "midgrade.credit")]
    fn branch_parses_known_keys(#[case] fuel: &str, #[case] method: &str, #[case] path: &str) {
        let branch = PriceBranch::parse(fuel, method).expect("known branch");
        assert_eq!(branch.path(), path);
    }

    #[rstest]
    #[case("kerosene", "cash", "fuelType")]
    #[case("regular", "bitcoin", "paymentMethod")]
    #[case("regular.cash", "cash", "fuelType")]
    #[case("Regular", "cash", "fuelType")]
    fn branch_rejects_unknown_keys(#[case] fuel: &str, #[case] method: &str, #[case] field: &str) {
        let err = PriceBranch::parse(fuel, method).expect_err("unknown branch");
        assert_eq!(err.field(), field);
    }

    #[rstest]
    fn price_keeps_text_verbatim_and_rejects_blanks() {
        assert_eq!(Price::new("3.49").expect("price").as_ref(), "3.49");
        assert_eq!(Price::new("$3.499/gal").expect("price").as_ref(), "$3.499/gal");
        assert_eq!(Price::new("  "), Err(StationValidationError::EmptyPrice));
    }

    #[rstest]
    fn append_creates_only_the_reported_branch(mut station: Station, regular_cash: PriceBranch) {
        station.append(regular_cash, entry("3.49", CorrelationId::random()));

        assert_eq!(station.branch(regular_cash).map(<[PriceEntry]>::len), Some(1));
        let sibling = PriceBranch::new(FuelType::Regular, PaymentMethod::Credit);
        assert!(station.branch(sibling).is_none());
        assert_eq!(station.fuel_type(FuelType::Regular).len(), 1);
        assert!(station.fuel_type(FuelType::Diesel).is_empty());
    }

    #[rstest]
    fn appends_keep_order_and_latest_is_last(mut station: Station, regular_cash: PriceBranch) {
        station.append(regular_cash, entry("3.49", CorrelationId::random()));
        station.append(regular_cash, entry("3.59", CorrelationId::random()));

        let latest = station.latest(regular_cash).expect("latest entry");
        assert_eq!(latest.price.as_ref(), "3.59");
    }

    #[rstest]
    fn retract_removes_by_correlation_and_leaves_empty_branch(
        mut station: Station,
        regular_cash: PriceBranch,
        reporter: UserId,
    ) {
        let correlation_id = CorrelationId::random();
        station.append(regular_cash, entry("3.49", correlation_id));

        assert_eq!(station.retract(regular_cash, &reporter, correlation_id), 1);
        assert_eq!(station.branch(regular_cash), Some(&[][..]));
        assert_eq!(station.retract(regular_cash, &reporter, correlation_id), 0);
        assert!(station.latest(regular_cash).is_none());
    }

    #[rstest]
    fn retract_on_absent_branch_is_a_no_op(
        mut station: Station,
        regular_cash: PriceBranch,
        reporter: UserId,
    ) {
        assert_eq!(
            station.retract(regular_cash, &reporter, CorrelationId::random()),
            0
        );
        assert!(station.branch(regular_cash).is_none());
    }

    #[rstest]
    fn retract_by_another_reporter_keeps_the_entry(
        mut station: Station,
        regular_cash: PriceBranch,
    ) {
        let correlation_id = CorrelationId::random();
        station.append(regular_cash, entry("3.49", correlation_id));

        assert_eq!(
            station.retract(regular_cash, &UserId::random(), correlation_id),
            0
        );
        assert_eq!(station.branch(regular_cash).map(<[PriceEntry]>::len), Some(1));
    }
}
