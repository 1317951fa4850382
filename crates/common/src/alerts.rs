//! Alert rule evaluator
//!
//! Checks a telemetry reading against the shipment's thresholds. For each
//! dimension a set maximum is checked first and, only when no maximum is set,
//! the minimum. A dimension with both bounds therefore never reports `below`.

use serde::{Deserialize, Serialize};

use crate::models::ContainerRecord;

/// Direction of a threshold violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variation {
    Normal,
    Above,
    Below,
}

/// Alerts raised by one reading
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts {
    #[serde(rename = "tempalert", default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Variation>,

    #[serde(rename = "humalert", default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<Variation>,

    #[serde(rename = "lightalert", default, skip_serializing_if = "Option::is_none")]
    pub light: Option<Variation>,

    #[serde(rename = "accalert", default, skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<Variation>,

    #[serde(rename = "dooralert", default, skip_serializing_if = "Option::is_none")]
    pub door: Option<bool>,
}

impl Alerts {
    pub fn any(&self) -> bool {
        self.temperature.is_some()
            || self.humidity.is_some()
            || self.light.is_some()
            || self.acceleration.is_some()
            || self.door == Some(true)
    }
}

/// Allowed range of one dimension; either end may be unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_set(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    fn check(&self, reading: f64) -> Option<Variation> {
        if let Some(max) = self.max {
            (reading > max).then_some(Variation::Above)
        } else if let Some(min) = self.min {
            (reading < min).then_some(Variation::Below)
        } else {
            None
        }
    }
}

/// Contractual thresholds of a shipment
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature: Bounds,
    pub humidity: Bounds,
    pub light: Bounds,
    pub acceleration: Bounds,
}

/// Measured dimensions with thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Temperature,
    Humidity,
    Light,
    Acceleration,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Temperature,
        Dimension::Humidity,
        Dimension::Light,
        Dimension::Acceleration,
    ];

    fn reading(self, record: &ContainerRecord) -> Option<f64> {
        match self {
            Dimension::Temperature => record.temperature,
            Dimension::Humidity => record.humidity,
            Dimension::Light => record.light,
            Dimension::Acceleration => record.acceleration,
        }
    }

    fn bounds(self, thresholds: &Thresholds) -> Bounds {
        match self {
            Dimension::Temperature => thresholds.temperature,
            Dimension::Humidity => thresholds.humidity,
            Dimension::Light => thresholds.light,
            Dimension::Acceleration => thresholds.acceleration,
        }
    }

    fn slot(self, alerts: &mut Alerts) -> &mut Option<Variation> {
        match self {
            Dimension::Temperature => &mut alerts.temperature,
            Dimension::Humidity => &mut alerts.humidity,
            Dimension::Light => &mut alerts.light,
            Dimension::Acceleration => &mut alerts.acceleration,
        }
    }
}

/// Outcome of evaluating one reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// At least one rule was violated
    Violation(Alerts),
    /// Rules were checked and none was violated
    Clear,
    /// Nothing in the reading could be checked
    NoData,
}

impl Evaluation {
    pub fn alerts(&self) -> Option<&Alerts> {
        match self {
            Evaluation::Violation(alerts) => Some(alerts),
            _ => None,
        }
    }
}

/// Evaluate `reading` against `thresholds`. Pure, no ledger access.
pub fn evaluate(thresholds: &Thresholds, reading: &ContainerRecord) -> Evaluation {
    let mut alerts = Alerts::default();
    let mut evaluated = false;

    for dimension in Dimension::ALL {
        let bounds = dimension.bounds(thresholds);
        let Some(value) = dimension.reading(reading) else {
            continue;
        };
        if !bounds.is_set() {
            continue;
        }

        evaluated = true;
        if let Some(variation) = bounds.check(value) {
            *dimension.slot(&mut alerts) = Some(variation);
        }
    }

    if let Some(door_closed) = reading.door_closed {
        evaluated = true;
        if !door_closed {
            alerts.door = Some(true);
        }
    }

    if alerts.any() {
        Evaluation::Violation(alerts)
    } else if evaluated {
        Evaluation::Clear
    } else {
        Evaluation::NoData
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temperature_only(min: Option<f64>, max: Option<f64>) -> Thresholds {
        Thresholds {
            temperature: Bounds::new(min, max),
            ..Default::default()
        }
    }

    fn reading(temperature: f64) -> ContainerRecord {
        ContainerRecord {
            temperature: Some(temperature),
            ..Default::default()
        }
    }

    #[test]
    fn test_above_max() {
        let result = evaluate(&temperature_only(Some(10.0), Some(20.0)), &reading(25.0));
        assert_eq!(
            result.alerts().and_then(|a| a.temperature),
            Some(Variation::Above)
        );
    }

    #[test]
    fn test_min_ignored_when_max_set() {
        let result = evaluate(&temperature_only(Some(10.0), Some(20.0)), &reading(5.0));
        assert_eq!(result, Evaluation::Clear);
    }

    #[test]
    fn test_below_min_without_max() {
        let result = evaluate(&temperature_only(Some(10.0), None), &reading(5.0));
        assert_eq!(
            result.alerts().and_then(|a| a.temperature),
            Some(Variation::Below)
        );
    }

    #[test]
    fn test_boundary_values_do_not_alert() {
        assert_eq!(
            evaluate(&temperature_only(None, Some(20.0)), &reading(20.0)),
            Evaluation::Clear
        );
        assert_eq!(
            evaluate(&temperature_only(Some(10.0), None), &reading(10.0)),
            Evaluation::Clear
        );
    }

    #[test]
    fn test_no_thresholds_means_no_data() {
        assert_eq!(
            evaluate(&Thresholds::default(), &reading(1000.0)),
            Evaluation::NoData
        );
    }

    #[test]
    fn test_door_alert_only_when_present_and_open() {
        let thresholds = Thresholds::default();

        let open = ContainerRecord {
            door_closed: Some(false),
            ..Default::default()
        };
        let alerts = evaluate(&thresholds, &open);
        assert_eq!(alerts.alerts().and_then(|a| a.door), Some(true));

        let closed = ContainerRecord {
            door_closed: Some(true),
            ..Default::default()
        };
        assert_eq!(evaluate(&thresholds, &closed), Evaluation::Clear);
        assert_eq!(
            evaluate(&thresholds, &ContainerRecord::default()),
            Evaluation::NoData
        );
    }

    #[test]
    fn test_dimensions_are_independent() {
        let thresholds = Thresholds {
            humidity: Bounds::new(None, Some(50.0)),
            acceleration: Bounds::new(Some(0.5), None),
            ..Default::default()
        };
        let record = ContainerRecord {
            humidity: Some(60.0),
            acceleration: Some(0.1),
            light: Some(900.0),
            ..Default::default()
        };

        let alerts = evaluate(&thresholds, &record).alerts().cloned().unwrap();
        assert_eq!(alerts.humidity, Some(Variation::Above));
        assert_eq!(alerts.acceleration, Some(Variation::Below));
        assert!(alerts.light.is_none());
        assert!(alerts.temperature.is_none());
    }

    #[test]
    fn test_alert_snapshot_wire_format() {
        let alerts = Alerts {
            temperature: Some(Variation::Above),
            door: Some(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&alerts).unwrap(),
            r#"{"tempalert":"above","dooralert":true}"#
        );
    }
}
