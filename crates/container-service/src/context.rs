//! Per-operation shipment context
//!
//! Container creation stores the registration terms next to the containers;
//! every update loads them once and passes them down to the evaluator.

use logistics_common::ledger::{get_json, put_json, shipment_terms_key};
use logistics_common::{Ledger, RegistrationRecord, Result, Thresholds};
use tracing::{debug, warn};

/// Registration terms resolved for one operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentContext {
    pub bl_no: String,
    pub hazmat: bool,
    pub thresholds: Thresholds,
}

impl ShipmentContext {
    pub fn from_registration(bl_no: &str, registration: &RegistrationRecord) -> Self {
        Self {
            bl_no: bl_no.to_string(),
            hazmat: registration.hazmat.unwrap_or(false),
            thresholds: registration.thresholds(),
        }
    }

    /// Snapshot the registration terms of `bl_no`
    ///
    /// The latest creation wins: a registration retried after a failed
    /// attempt replaces the terms of that attempt.
    pub async fn record(
        ledger: &dyn Ledger,
        bl_no: &str,
        registration: &RegistrationRecord,
    ) -> Result<()> {
        let key = shipment_terms_key(bl_no);
        if ledger.get(&key).await?.is_some() {
            debug!("Replacing shipment terms recorded for {}", bl_no);
        }
        put_json(ledger, &key, registration).await
    }

    /// Resolve the terms of `bl_no`. A shipment without stored terms has no
    /// thresholds, so only door alerts can fire.
    pub async fn load(ledger: &dyn Ledger, bl_no: &str) -> Result<Self> {
        let registration: Option<RegistrationRecord> =
            get_json(ledger, &shipment_terms_key(bl_no)).await?;

        match registration {
            Some(registration) => Ok(Self::from_registration(bl_no, &registration)),
            None => {
                warn!("No shipment terms recorded for {}, evaluating without thresholds", bl_no);
                Ok(Self {
                    bl_no: bl_no.to_string(),
                    ..Default::default()
                })
            }
        }
    }
}
