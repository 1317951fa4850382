//! Ledger records shared by the logistics services
//!
//! Field names on the wire follow the ledger record layout (`blno`,
//! `containerno`, ...). Optional attributes may be absent entirely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::alerts::{Bounds, Thresholds};
use crate::error::{Error, Result};

/// Version every `init` payload must declare.
pub const CONTRACT_VERSION: &str = "1.0.0";

/// Type tag carried by every compliance record raised for a shipment.
pub const SHIPPING_TYPE: &str = "SHIPPING";

/// Geographic position reported by a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

/// Contractual terms of a Bill of Lading
///
/// Immutable once written under its B/L key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    #[serde(rename = "blno", default)]
    pub bl_no: Option<String>,

    /// Comma separated container numbers
    #[serde(rename = "containernos", default)]
    pub container_nos: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hazmat: Option<bool>,

    #[serde(rename = "mintemperature", default, skip_serializing_if = "Option::is_none")]
    pub min_temperature: Option<f64>,
    #[serde(rename = "maxtemperature", default, skip_serializing_if = "Option::is_none")]
    pub max_temperature: Option<f64>,

    #[serde(rename = "minhumidity", default, skip_serializing_if = "Option::is_none")]
    pub min_humidity: Option<f64>,
    #[serde(rename = "maxhumidity", default, skip_serializing_if = "Option::is_none")]
    pub max_humidity: Option<f64>,

    #[serde(rename = "minlight", default, skip_serializing_if = "Option::is_none")]
    pub min_light: Option<f64>,
    #[serde(rename = "maxlight", default, skip_serializing_if = "Option::is_none")]
    pub max_light: Option<f64>,

    #[serde(rename = "minacceleration", default, skip_serializing_if = "Option::is_none")]
    pub min_acceleration: Option<f64>,
    #[serde(rename = "maxacceleration", default, skip_serializing_if = "Option::is_none")]
    pub max_acceleration: Option<f64>,

    #[serde(rename = "transitcomplete", default, skip_serializing_if = "Option::is_none")]
    pub transit_complete: Option<bool>,

    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RegistrationRecord {
    /// Threshold set used by the alert evaluator
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            temperature: Bounds::new(self.min_temperature, self.max_temperature),
            humidity: Bounds::new(self.min_humidity, self.max_humidity),
            light: Bounds::new(self.min_light, self.max_light),
            acceleration: Bounds::new(self.min_acceleration, self.max_acceleration),
        }
    }

    /// Container numbers from the comma separated list, trimmed, blanks dropped
    pub fn container_numbers(&self) -> Vec<String> {
        self.container_nos
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Current-state telemetry snapshot of one physical container
///
/// Every attribute is optional so the same shape carries both the stored
/// state and a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    #[serde(rename = "containerno", default)]
    pub container_no: Option<String>,

    #[serde(rename = "blno", default, skip_serializing_if = "Option::is_none")]
    pub bl_no: Option<String>,

    /// Current asset location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Geolocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,

    #[serde(default)]
    pub timestamp: Option<String>,

    /// Celsius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Lumen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<f64>,

    #[serde(rename = "doorclosed", default, skip_serializing_if = "Option::is_none")]
    pub door_closed: Option<bool>,

    /// Free-form sensor payload, stored verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,

    /// Serialized snapshot of the last raised alerts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<String>,

    #[serde(rename = "transitcomplete", default, skip_serializing_if = "Option::is_none")]
    pub transit_complete: Option<bool>,
}

impl ContainerRecord {
    /// Fresh record linking a container to its Bill of Lading
    pub fn new(container_no: String, bl_no: String, timestamp: String) -> Self {
        Self {
            container_no: Some(container_no),
            bl_no: Some(bl_no),
            timestamp: Some(timestamp),
            transit_complete: Some(false),
            ..Default::default()
        }
    }
}

/// Ordered log of container snapshots, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerHistory {
    #[serde(rename = "conthistory", default)]
    pub entries: Vec<String>,
}

impl ContainerHistory {
    pub fn with_entry(entry: String) -> Self {
        Self {
            entries: vec![entry],
        }
    }

    /// Put `entry` ahead of everything already logged
    pub fn prepend(&mut self, entry: String) {
        self.entries.insert(0, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Record sent to the compliance service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    #[serde(rename = "blno")]
    pub bl_no: String,

    #[serde(rename = "type")]
    pub record_type: String,

    pub compliance: bool,

    /// Container number to serialized alert snapshot
    #[serde(rename = "assetalerts", default)]
    pub asset_alerts: Option<BTreeMap<String, String>>,

    #[serde(default = "default_active")]
    pub active: bool,

    pub timestamp: String,
}

fn default_active() -> bool {
    true
}

impl ComplianceRecord {
    /// Seed record raised when a shipment registers
    pub fn initial(bl_no: String, timestamp: String) -> Self {
        Self {
            bl_no,
            record_type: SHIPPING_TYPE.to_string(),
            compliance: true,
            asset_alerts: None,
            active: true,
            timestamp,
        }
    }

    /// Violation raised by a container update
    pub fn violation(bl_no: String, container_no: String, alerts: String, timestamp: String) -> Self {
        let mut asset_alerts = BTreeMap::new();
        asset_alerts.insert(container_no, alerts);

        Self {
            bl_no,
            record_type: SHIPPING_TYPE.to_string(),
            compliance: false,
            asset_alerts: Some(asset_alerts),
            active: true,
            timestamp,
        }
    }
}

/// Downstream services a contract may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Container,
    Compliance,
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dependency::Container => write!(f, "container"),
            Dependency::Compliance => write!(f, "compliance"),
        }
    }
}

/// Contract configuration declared at `init`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub version: String,

    #[serde(rename = "containercc", default, skip_serializing_if = "Option::is_none")]
    pub container_service: Option<String>,

    #[serde(rename = "compliancecc", default, skip_serializing_if = "Option::is_none")]
    pub compliance_service: Option<String>,
}

impl ContractConfig {
    /// Reject a version mismatch or any blank required dependency id
    pub fn validate(&self, required: &[Dependency]) -> Result<()> {
        if self.version != CONTRACT_VERSION {
            return Err(Error::validation(format!(
                "Contract version {} must match version argument: {}",
                CONTRACT_VERSION, self.version
            )));
        }

        for dependency in required {
            self.dependency(*dependency)
                .map_err(|_| Error::validation(format!("{} service id is mandatory", dependency)))?;
        }

        Ok(())
    }

    /// Resolve the service id of a dependency
    pub fn dependency(&self, dependency: Dependency) -> Result<&str> {
        let id = match dependency {
            Dependency::Container => self.container_service.as_deref(),
            Dependency::Compliance => self.compliance_service.as_deref(),
        };

        id.map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Uninitialized(format!("no {} service id configured", dependency)))
    }
}

/// Trim a mandatory string field, rejecting absent or blank values
pub fn require_trimmed(value: Option<&str>, field: &str) -> Result<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{} is mandatory and cannot be blank", field)));
    }
    Ok(trimmed.to_string())
}
