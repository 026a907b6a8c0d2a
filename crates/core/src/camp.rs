//! Camp: a scheduled event, publicly addressed by its moniker.

use chrono::{NaiveDate, NaiveDateTime};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::CampId;
use crate::talk::Talk;
use crate::validate;

pub const MONIKER_MAX_LEN: usize = 20;
pub const NAME_MAX_LEN: usize = 100;
pub const MIN_LENGTH_DAYS: i32 = 1;
pub const MAX_LENGTH_DAYS: i32 = 100;

/// Path segments under `/api/camps` that are routes of their own.
pub const RESERVED_MONIKERS: &[&str] = &["search"];

/// Where a camp takes place. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub venue_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub address3: Option<String>,
    pub city_town: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// The writable fields of a camp (everything except identity and talks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampDetails {
    pub name: String,
    pub event_date: Option<NaiveDateTime>,
    pub length: i32,
    pub location: Location,
}

impl CampDetails {
    pub fn validate(&self) -> DomainResult<()> {
        validate::text("name", &self.name, 1, NAME_MAX_LEN)?;
        validate::range("length", self.length, MIN_LENGTH_DAYS, MAX_LENGTH_DAYS)
    }
}

/// A camp that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCamp {
    pub moniker: String,
    pub details: CampDetails,
}

impl NewCamp {
    pub fn validate(&self) -> DomainResult<()> {
        validate_moniker(&self.moniker)?;
        self.details.validate()
    }
}

/// A stored camp. `talks` is only populated when the caller asked for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camp {
    pub id: CampId,
    pub moniker: String,
    pub name: String,
    pub event_date: Option<NaiveDateTime>,
    pub length: i32,
    pub location: Location,
    pub talks: Vec<Talk>,
}

impl Camp {
    /// Build the stored form of `new` under a freshly assigned id.
    pub fn from_new(id: CampId, new: NewCamp) -> Self {
        let NewCamp { moniker, details } = new;
        Self {
            id,
            moniker,
            name: details.name,
            event_date: details.event_date,
            length: details.length,
            location: details.location,
            talks: Vec::new(),
        }
    }

    /// Overwrite the writable fields. Identity, moniker and talks are kept.
    pub fn apply(&mut self, details: CampDetails) {
        self.name = details.name;
        self.event_date = details.event_date;
        self.length = details.length;
        self.location = details.location;
    }

    /// Whether the camp is scheduled on the given calendar day.
    pub fn takes_place_on(&self, date: NaiveDate) -> bool {
        self.event_date.is_some_and(|d| d.date() == date)
    }
}

impl Entity for Camp {
    type Id = CampId;

    fn id(&self) -> CampId {
        self.id
    }
}

/// Monikers appear verbatim in URLs and `Location` headers, so they are limited
/// to ASCII letters, digits, `-`, `_` and `.`.
pub fn validate_moniker(moniker: &str) -> DomainResult<()> {
    validate::text("moniker", moniker, 1, MONIKER_MAX_LEN)?;
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if !moniker.chars().all(allowed) {
        return Err(DomainError::validation(
            "moniker may only contain letters, digits, '-', '_' and '.'",
        ));
    }
    if RESERVED_MONIKERS
        .iter()
        .any(|reserved| moniker.eq_ignore_ascii_case(reserved))
    {
        return Err(DomainError::validation(format!(
            "moniker '{moniker}' is reserved"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn details(name: &str, length: i32) -> CampDetails {
        CampDetails {
            name: name.to_string(),
            event_date: None,
            length,
            location: Location::default(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_camp_requires_name_and_moniker() {
        let camp = NewCamp {
            moniker: "SD2021".to_string(),
            details: details("   ", 1),
        };
        assert_eq!(
            camp.validate(),
            Err(DomainError::validation("name is required"))
        );

        let camp = NewCamp {
            moniker: String::new(),
            details: details("Code Camp", 1),
        };
        assert!(camp.validate().is_err());
    }

    #[test]
    fn moniker_rejects_unsafe_and_long_values() {
        assert!(validate_moniker("SD 2021").is_err());
        assert!(validate_moniker("SD/2021").is_err());
        assert!(validate_moniker("sd-2021_b.1").is_ok());
        assert!(validate_moniker(&"X".repeat(MONIKER_MAX_LEN + 1)).is_err());
        assert!(validate_moniker("ATL2018").is_ok());
    }

    #[test]
    fn moniker_rejects_reserved_route_segments() {
        for moniker in ["search", "SEARCH", "Search"] {
            assert_eq!(
                validate_moniker(moniker),
                Err(DomainError::validation(format!("moniker '{moniker}' is reserved")))
            );
        }
        assert!(validate_moniker("search2024").is_ok());
    }

    #[test]
    fn apply_keeps_identity_and_talks() {
        let mut camp = Camp::from_new(
            CampId::new(3),
            NewCamp {
                moniker: "ATL2018".to_string(),
                details: details("Atlanta Code Camp", 1),
            },
        );
        let mut changed = details("Atlanta Code Camp 2", 2);
        changed.location.city_town = Some("Atlanta".to_string());
        camp.apply(changed);

        assert_eq!(camp.id, CampId::new(3));
        assert_eq!(camp.moniker, "ATL2018");
        assert_eq!(camp.name, "Atlanta Code Camp 2");
        assert_eq!(camp.length, 2);
        assert_eq!(camp.location.city_town.as_deref(), Some("Atlanta"));
    }

    #[test]
    fn takes_place_on_ignores_time_of_day() {
        let mut camp = Camp::from_new(
            CampId::new(1),
            NewCamp {
                moniker: "ATL2018".to_string(),
                details: details("Atlanta Code Camp", 1),
            },
        );
        assert!(!camp.takes_place_on(date(2018, 10, 18)));

        camp.event_date = date(2018, 10, 18).and_hms_opt(9, 30, 0);
        assert!(camp.takes_place_on(date(2018, 10, 18)));
        assert!(!camp.takes_place_on(date(2018, 10, 19)));
    }

    proptest! {
        #[test]
        fn length_is_valid_only_within_bounds(length in -1000i32..1000) {
            let ok = details("Code Camp", length).validate().is_ok();
            prop_assert_eq!(ok, (MIN_LENGTH_DAYS..=MAX_LENGTH_DAYS).contains(&length));
        }
    }
}
