//! Individually tracked units and their human-readable codes.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpool_core::{Entity, ProductId, TenantId, UnitId, ValueObject};

use crate::error::{InventoryError, InventoryResult};

/// Opaque display/filter attributes (color, size, material, ...).
///
/// Never consulted by availability logic.
pub type UnitAttributes = BTreeMap<String, String>;

/// Lifecycle status of a tracked unit.
///
/// `Available` and `Reserved` are both allocatable: whether a unit is free for
/// a window is decided by overlapping reservations, not by this flag.
/// `Reserved` mirrors "has a reservation covering today" and is maintained by
/// the allocation service. `Maintenance` and `Retired` units are never free.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Available,
    Reserved,
    Maintenance,
    Retired,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Reserved => "reserved",
            UnitStatus::Maintenance => "maintenance",
            UnitStatus::Retired => "retired",
        }
    }

    /// Eligible for reservations (subject to window overlap).
    pub fn is_allocatable(&self) -> bool {
        matches!(self, UnitStatus::Available | UnitStatus::Reserved)
    }
}

impl core::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(UnitStatus::Available),
            "reserved" => Ok(UnitStatus::Reserved),
            "maintenance" => Ok(UnitStatus::Maintenance),
            "retired" => Ok(UnitStatus::Retired),
            other => Err(InventoryError::InvalidRequest(format!(
                "unit status '{other}' is not one of available, reserved, maintenance, retired"
            ))),
        }
    }
}

/// Sequential, category-prefixed unit code, e.g. `1000-0007`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitCode {
    prefix: String,
    number: u64,
    width: usize,
}

impl ValueObject for UnitCode {}

const MAX_PREFIX_LEN: usize = 16;

/// Category prefixes are short ASCII alphanumerics (no separator).
pub fn validate_prefix(prefix: &str) -> InventoryResult<()> {
    if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN {
        return Err(InventoryError::InvalidRequest(format!(
            "category prefix must be 1..={MAX_PREFIX_LEN} characters"
        )));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(InventoryError::InvalidRequest(format!(
            "category prefix '{prefix}' must be ASCII alphanumeric"
        )));
    }
    Ok(())
}

impl UnitCode {
    pub fn new(prefix: impl Into<String>, number: u64, width: usize) -> InventoryResult<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        if number == 0 {
            return Err(InventoryError::InvalidRequest("unit code numbers start at 1".to_string()));
        }
        Ok(Self {
            prefix,
            number,
            width: width.max(1),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// Width of the rendered numeric suffix (at least the zero-pad width).
    pub fn width(&self) -> usize {
        self.width.max(self.number.to_string().len())
    }

    /// The next `count` codes after `last` for `prefix`.
    ///
    /// Takes the last-issued suffix, increments by one per unit and zero-pads to
    /// the width of the previous code. Without a previous code numbering starts
    /// at 1 padded to `default_width`.
    pub fn sequence_after(
        last: Option<&UnitCode>,
        prefix: &str,
        count: usize,
        default_width: usize,
    ) -> InventoryResult<Vec<UnitCode>> {
        validate_prefix(prefix)?;
        let (mut next, width) = match last {
            Some(code) if code.prefix == prefix => (code.number + 1, code.width()),
            Some(code) => {
                return Err(InventoryError::InvalidRequest(format!(
                    "last code {code} does not belong to prefix '{prefix}'"
                )));
            }
            None => (1, default_width.max(1)),
        };

        let mut codes = Vec::with_capacity(count);
        for _ in 0..count {
            codes.push(UnitCode {
                prefix: prefix.to_string(),
                number: next,
                width,
            });
            next += 1;
        }
        Ok(codes)
    }
}

impl core::fmt::Display for UnitCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{:0width$}", self.prefix, self.number, width = self.width)
    }
}

impl FromStr for UnitCode {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, digits) = s
            .rsplit_once('-')
            .ok_or_else(|| InventoryError::InvalidRequest(format!("malformed unit code '{s}'")))?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(InventoryError::InvalidRequest(format!("malformed unit code '{s}'")));
        }
        let number: u64 = digits
            .parse()
            .map_err(|_| InventoryError::InvalidRequest(format!("malformed unit code '{s}'")))?;
        UnitCode::new(prefix, number, digits.len())
    }
}

impl Serialize for UnitCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UnitCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An individually identified unit of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub code: UnitCode,
    pub status: UnitStatus,
    pub attributes: UnitAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Unit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Unit {
    pub fn new(
        id: UnitId,
        tenant_id: TenantId,
        product_id: ProductId,
        code: UnitCode,
        attributes: UnitAttributes,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            product_id,
            code,
            status: UnitStatus::Available,
            attributes,
            created_at,
            updated_at: created_at,
        }
    }

    /// Operator-driven status change (maintenance, retirement, return to service).
    ///
    /// `Reserved` is owned by the allocation service and cannot be set here.
    /// `Retired` is terminal. Returns whether the status actually changed.
    pub fn change_status(&mut self, to: UnitStatus, at: DateTime<Utc>) -> InventoryResult<bool> {
        let from = self.status;
        if from == to {
            return Ok(false);
        }
        if to == UnitStatus::Reserved || from == UnitStatus::Retired {
            return Err(InventoryError::InvalidStatusTransition { from, to });
        }
        // Returning a reserved unit to "available" is a no-op: the flag follows reservations.
        if from == UnitStatus::Reserved && to == UnitStatus::Available {
            return Ok(false);
        }
        self.status = to;
        self.updated_at = at;
        Ok(true)
    }

    /// Align the `Available`/`Reserved` flag with whether a reservation covers today.
    ///
    /// Maintenance and retired units are left untouched. Returns whether it changed.
    pub fn sync_reserved_flag(&mut self, reserved_now: bool, at: DateTime<Utc>) -> bool {
        let next = match (self.status, reserved_now) {
            (UnitStatus::Available, true) => UnitStatus::Reserved,
            (UnitStatus::Reserved, false) => UnitStatus::Available,
            _ => return false,
        };
        self.status = next;
        self.updated_at = at;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit() -> Unit {
        Unit::new(
            UnitId::new(),
            TenantId::new(),
            ProductId::new(),
            "1000-0001".parse().unwrap(),
            UnitAttributes::new(),
            Utc::now(),
        )
    }

    #[test]
    fn code_parses_and_renders_with_padding() {
        let code: UnitCode = "1000-0007".parse().unwrap();
        assert_eq!(code.prefix(), "1000");
        assert_eq!(code.number(), 7);
        assert_eq!(code.width(), 4);
        assert_eq!(code.to_string(), "1000-0007");
    }

    #[test]
    fn malformed_codes_are_rejected() {
        assert!("10000007".parse::<UnitCode>().is_err());
        assert!("1000-".parse::<UnitCode>().is_err());
        assert!("1000-00a7".parse::<UnitCode>().is_err());
        assert!("-0007".parse::<UnitCode>().is_err());
    }

    #[test]
    fn sequence_continues_from_last_code_at_its_width() {
        let last: UnitCode = "1000-0007".parse().unwrap();
        let next = UnitCode::sequence_after(Some(&last), "1000", 3, 2).unwrap();
        let rendered: Vec<String> = next.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["1000-0008", "1000-0009", "1000-0010"]);
    }

    #[test]
    fn sequence_starts_at_one_without_history() {
        let codes = UnitCode::sequence_after(None, "CAM", 2, 4).unwrap();
        assert_eq!(codes[0].to_string(), "CAM-0001");
        assert_eq!(codes[1].to_string(), "CAM-0002");
    }

    #[test]
    fn sequence_grows_past_the_padding_width() {
        let last: UnitCode = "7-99".parse().unwrap();
        let next = UnitCode::sequence_after(Some(&last), "7", 1, 4).unwrap();
        assert_eq!(next[0].to_string(), "7-100");
        assert_eq!(next[0].width(), 3);
    }

    #[test]
    fn sequence_rejects_a_foreign_last_code() {
        let last: UnitCode = "2000-0001".parse().unwrap();
        assert!(UnitCode::sequence_after(Some(&last), "1000", 1, 4).is_err());
    }

    #[test]
    fn reserved_cannot_be_set_by_operators() {
        let mut u = unit();
        let err = u.change_status(UnitStatus::Reserved, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            InventoryError::InvalidStatusTransition {
                from: UnitStatus::Available,
                to: UnitStatus::Reserved
            }
        );
    }

    #[test]
    fn retired_is_terminal() {
        let mut u = unit();
        assert!(u.change_status(UnitStatus::Retired, Utc::now()).unwrap());
        assert!(u.change_status(UnitStatus::Available, Utc::now()).is_err());
        assert!(u.change_status(UnitStatus::Maintenance, Utc::now()).is_err());
    }

    #[test]
    fn reserved_flag_follows_reservations_only_for_allocatable_units() {
        let mut u = unit();
        assert!(u.sync_reserved_flag(true, Utc::now()));
        assert_eq!(u.status, UnitStatus::Reserved);
        assert!(u.sync_reserved_flag(false, Utc::now()));
        assert_eq!(u.status, UnitStatus::Available);

        u.change_status(UnitStatus::Maintenance, Utc::now()).unwrap();
        assert!(!u.sync_reserved_flag(true, Utc::now()));
        assert_eq!(u.status, UnitStatus::Maintenance);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Maintenance".parse::<UnitStatus>().unwrap(), UnitStatus::Maintenance);
        assert!("lost".parse::<UnitStatus>().is_err());
    }

    proptest! {
        #[test]
        fn generated_codes_are_unique_and_strictly_increasing(
            start in 0u64..100_000,
            count in 1usize..200,
            width in 1usize..8,
        ) {
            let last = (start > 0).then(|| UnitCode::new("1000", start, width).unwrap());
            let codes = UnitCode::sequence_after(last.as_ref(), "1000", count, width).unwrap();
            prop_assert_eq!(codes.len(), count);
            for pair in codes.windows(2) {
                prop_assert_eq!(pair[1].number(), pair[0].number() + 1);
                prop_assert_ne!(pair[0].to_string(), pair[1].to_string());
            }
            if let Some(last) = last {
                prop_assert_eq!(codes[0].number(), last.number() + 1);
            }
        }

        #[test]
        fn rendered_codes_parse_back(
            prefix in "[A-Z0-9]{1,8}",
            number in 1u64..1_000_000,
            width in 1usize..8,
        ) {
            let code = UnitCode::new(prefix, number, width).unwrap();
            let parsed: UnitCode = code.to_string().parse().unwrap();
            prop_assert_eq!(parsed.to_string(), code.to_string());
            prop_assert_eq!(parsed.number(), code.number());
        }
    }
}
