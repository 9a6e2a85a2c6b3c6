//! Measurement fields of a reading and their declared ranges.
//!
//! Only boundary checks happen here: a value must be finite and within its
//! inclusive [`ValueRange`]. Saving a draft accepts missing fields; submitting
//! requires all four ([`MeasurementLimits::check_complete`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four measured quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Pressure,
    Temperature,
    FlowRate,
    ContainedVolume,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Pressure,
        Field::Temperature,
        Field::FlowRate,
        Field::ContainedVolume,
    ];

    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Pressure => "pressure",
            Field::Temperature => "temperature",
            Field::FlowRate => "flowRate",
            Field::ContainedVolume => "containedVolume",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measured values of one reading. Flattened into the reading on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    /// Pressure, bar.
    pub pressure: Option<f64>,
    /// Temperature, °C.
    pub temperature: Option<f64>,
    /// Flow rate, m³/h.
    pub flow_rate: Option<f64>,
    /// Contained volume, m³.
    pub contained_volume: Option<f64>,
}

impl Measurements {
    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Pressure => self.pressure,
            Field::Temperature => self.temperature,
            Field::FlowRate => self.flow_rate,
            Field::ContainedVolume => self.contained_volume,
        }
    }

    /// Fields with no value.
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Finite bounds with `min <= max`.
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// A measurement that failed a boundary check.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasurementError {
    #[error("{field} is required")]
    Missing { field: Field },
    #[error("{field} = {value} is outside {range}")]
    OutOfRange {
        field: Field,
        value: f64,
        range: ValueRange,
    },
}

/// Declared valid ranges, one per field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct MeasurementLimits {
    pub pressure: ValueRange,
    pub temperature: ValueRange,
    pub flow_rate: ValueRange,
    pub contained_volume: ValueRange,
}

impl Default for MeasurementLimits {
    fn default() -> Self {
        Self {
            pressure: ValueRange::new(0.0, 150.0),
            temperature: ValueRange::new(-40.0, 120.0),
            flow_rate: ValueRange::new(0.0, 10_000.0),
            contained_volume: ValueRange::new(0.0, 100_000.0),
        }
    }
}

impl MeasurementLimits {
    pub fn range(&self, field: Field) -> ValueRange {
        match field {
            Field::Pressure => self.pressure,
            Field::Temperature => self.temperature,
            Field::FlowRate => self.flow_rate,
            Field::ContainedVolume => self.contained_volume,
        }
    }

    /// Present values must be within range. Missing values are accepted.
    pub fn check_bounds(&self, m: &Measurements) -> Result<(), MeasurementError> {
        for field in Field::ALL {
            if let Some(value) = m.get(field) {
                let range = self.range(field);
                if !range.contains(value) {
                    return Err(MeasurementError::OutOfRange { field, value, range });
                }
            }
        }
        Ok(())
    }

    /// Every field present and within range (required before submission).
    pub fn check_complete(&self, m: &Measurements) -> Result<(), MeasurementError> {
        if let Some(field) = m.missing().into_iter().next() {
            return Err(MeasurementError::Missing { field });
        }
        self.check_bounds(m)
    }
}
