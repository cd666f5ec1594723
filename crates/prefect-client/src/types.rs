//! Vehicle records and command codes for the vendor API

use std::fmt;

use serde::{Deserialize, Deserializer};

// =============================================================================
// Command Lookup Codes
// =============================================================================

/// Vendor command identifier sent as `LOOKUPCODE`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupCode {
    Start,
    CancelStart,
    Lock,
    Unlock,
    /// Any other code the vendor defines
    Other(String),
}

impl LookupCode {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "START_CMD",
            Self::CancelStart => "CANCEL_START_CMD",
            Self::Lock => "LOCK_CMD",
            Self::Unlock => "UNLOCK_CMD",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for LookupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LookupCode {
    fn from(code: &str) -> Self {
        match code {
            "START_CMD" => Self::Start,
            "CANCEL_START_CMD" => Self::CancelStart,
            "LOCK_CMD" => Self::Lock,
            "UNLOCK_CMD" => Self::Unlock,
            other => Self::Other(other.to_string()),
        }
    }
}

// =============================================================================
// Vehicle Snapshot
// =============================================================================

/// GPS position reported by the vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Point-in-time copy of one vehicle's telemetry from the energy report
///
/// Replaced wholesale on refresh, never patched field by field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawVehicle")]
pub struct VehicleSnapshot {
    pub vin: String,
    pub nickname: Option<String>,
    pub model_name: Option<String>,
    pub model_year: Option<String>,
    pub odometer: f64,
    pub location: Location,
    pub fuel_level: Option<f64>,
    /// Battery state of charge (electrified vehicles only)
    pub state_of_charge: Option<f64>,
    pub charge_status: Option<String>,
    pub plug_status: Option<String>,
    /// Overall distance to empty
    pub distance_to_empty: f64,
    pub fuel_distance_to_empty: f64,
    pub electric_distance_to_empty: f64,
}

impl VehicleSnapshot {
    /// Parse one vehicle object from the energy report
    pub fn from_value(value: &serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value.clone())
    }

    /// Whether the vehicle reports battery/charging telemetry
    pub fn is_electrified(&self) -> bool {
        self.state_of_charge.is_some() || self.charge_status.is_some() || self.plug_status.is_some()
    }
}

/// Vendor wire shape of a vehicle record.
///
/// Numbers arrive either as JSON numbers or as numeric strings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVehicle {
    vin: String,
    #[serde(default, deserialize_with = "opt_string")]
    nick_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    model_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    model_year: Option<String>,
    #[serde(default, deserialize_with = "opt_number")]
    odometer: Option<f64>,
    #[serde(default, deserialize_with = "opt_number")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "opt_number")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "opt_number")]
    fuel_level: Option<f64>,
    #[serde(default, deserialize_with = "opt_number")]
    state_of_charge: Option<f64>,
    #[serde(default, deserialize_with = "opt_string")]
    charge_status: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    plug_status: Option<String>,
    #[serde(default, deserialize_with = "opt_number")]
    dte: Option<f64>,
    #[serde(default, deserialize_with = "opt_number")]
    fuel_dte: Option<f64>,
    #[serde(default, deserialize_with = "opt_number")]
    elec_dte: Option<f64>,
}

impl From<RawVehicle> for VehicleSnapshot {
    fn from(raw: RawVehicle) -> Self {
        Self {
            vin: raw.vin,
            nickname: raw.nick_name,
            model_name: raw.model_name,
            model_year: raw.model_year,
            odometer: raw.odometer.unwrap_or_default(),
            location: Location {
                latitude: raw.latitude.unwrap_or_default(),
                longitude: raw.longitude.unwrap_or_default(),
            },
            fuel_level: raw.fuel_level,
            state_of_charge: raw.state_of_charge,
            charge_status: raw.charge_status,
            plug_status: raw.plug_status,
            distance_to_empty: raw.dte.unwrap_or_default(),
            fuel_distance_to_empty: raw.fuel_dte.unwrap_or_default(),
            electric_distance_to_empty: raw.elec_dte.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
}

fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Number(n)) => Ok(Some(n)),
        Some(Scalar::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Text(s)) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(serde::de::Error::custom(format!("not a number: {:?}", s))),
        },
        Some(Scalar::Bool(b)) => Err(serde::de::Error::custom(format!(
            "expected a number, got {}",
            b
        ))),
        None => Ok(None),
    }
}

fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Text(s)) => Some(s),
        Some(Scalar::Number(n)) if n.fract() == 0.0 => Some(format!("{}", n as i64)),
        Some(Scalar::Number(n)) => Some(n.to_string()),
        Some(Scalar::Bool(b)) => Some(b.to_string()),
        None => None,
    })
}
