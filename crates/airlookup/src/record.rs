//! Core aircraft record types for airlookup.
//!
//! This module defines the ICAO24 address type, the aircraft record shown to
//! users, the entity persisted in the aircraft table, and the field patch used
//! by upserts.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 24-bit ICAO transponder address.
///
/// Stored in its canonical uppercase form, which is also the table row key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Icao24(String);

fn icao24_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9A-F]{6}$").expect("static pattern is valid"))
}

impl Icao24 {
    /// Parse and normalize an ICAO24 address.
    ///
    /// Surrounding whitespace is ignored and hex digits of either case are
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIcao24`] unless the input is exactly six hex digits.
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = Self::normalize(input);
        if icao24_pattern().is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(Error::InvalidIcao24 {
                input: input.to_string(),
            })
        }
    }

    /// Canonical form of a raw address: trimmed and uppercased.
    #[must_use]
    pub fn normalize(input: &str) -> String {
        input.trim().to_ascii_uppercase()
    }

    /// The table row key for this aircraft.
    #[must_use]
    pub fn row_key(&self) -> &str {
        &self.0
    }

    /// The lowercase form used by the online metadata service.
    #[must_use]
    pub fn query_form(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for Icao24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Icao24 {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Icao24> for String {
    fn from(value: Icao24) -> Self {
        value.0
    }
}

/// Aircraft identity metadata as held in the aircraft table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftRecord {
    /// Transponder address.
    pub icao24: Icao24,
    /// Registration mark, e.g. `N12345`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    /// ICAO aircraft type designator, e.g. `B738`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icao_type: Option<String>,
    /// ICAO operator code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

impl AircraftRecord {
    /// Build a record from a stored table entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity's row key is not a valid ICAO24 address.
    pub fn from_entity(entity: &AircraftEntity) -> Result<Self> {
        Ok(Self {
            icao24: Icao24::parse(&entity.row_key)?,
            registration: non_empty(entity.registration.as_deref()),
            icao_type: non_empty(entity.icao_aircraft_type.as_deref()),
            operator: non_empty(entity.icao_operator.as_deref()),
        })
    }
}

/// A row in the aircraft table.
///
/// Field names match the table schema. Unknown properties such as the
/// service-maintained `Timestamp` are ignored on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AircraftEntity {
    /// Partition key, shared by every aircraft row.
    pub partition_key: String,
    /// Row key, the uppercased ICAO24.
    pub row_key: String,
    /// Registration mark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    /// ICAO aircraft type designator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icao_aircraft_type: Option<String>,
    /// ICAO operator code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icao_operator: Option<String>,
}

impl AircraftEntity {
    /// Create an entity with no metadata fields set.
    #[must_use]
    pub fn new(partition_key: impl Into<String>, icao24: &Icao24) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: icao24.row_key().to_string(),
            ..Self::default()
        }
    }
}

/// Metadata fields supplied for a write.
///
/// Empty or whitespace-only values count as not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    /// New registration mark.
    pub registration: Option<String>,
    /// New ICAO aircraft type designator.
    pub icao_type: Option<String>,
    /// New ICAO operator code.
    pub operator: Option<String>,
}

/// What a [`RecordPatch::fill_missing`] call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// No row existed; one was created.
    Inserted,
    /// At least one blank field was filled.
    Updated,
    /// Every supplied field was already set.
    Unchanged,
}

impl RecordPatch {
    /// Build a patch, discarding blank values.
    #[must_use]
    pub fn new(
        registration: Option<&str>,
        icao_type: Option<&str>,
        operator: Option<&str>,
    ) -> Self {
        Self {
            registration: non_empty(registration),
            icao_type: non_empty(icao_type),
            operator: non_empty(operator),
        }
    }

    /// Check if no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registration.is_none() && self.icao_type.is_none() && self.operator.is_none()
    }

    /// Overwrite the fields of `entity` that this patch supplies.
    pub fn merge_into(&self, entity: &mut AircraftEntity) {
        if let Some(registration) = &self.registration {
            entity.registration = Some(registration.clone());
        }
        if let Some(icao_type) = &self.icao_type {
            entity.icao_aircraft_type = Some(icao_type.clone());
        }
        if let Some(operator) = &self.operator {
            entity.icao_operator = Some(operator.clone());
        }
    }

    /// Set only the fields of `entity` that are currently blank.
    ///
    /// Returns `true` if anything changed.
    pub fn fill_missing(&self, entity: &mut AircraftEntity) -> bool {
        let mut changed = false;
        changed |= fill(&mut entity.registration, self.registration.as_ref());
        changed |= fill(&mut entity.icao_aircraft_type, self.icao_type.as_ref());
        changed |= fill(&mut entity.icao_operator, self.operator.as_ref());
        changed
    }
}

fn fill(slot: &mut Option<String>, value: Option<&String>) -> bool {
    match value {
        Some(value) if non_empty(slot.as_deref()).is_none() => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// Trim a value, mapping blank strings to `None`.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
