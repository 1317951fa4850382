//! Registration saga
//!
//! Registration touches three independently committed places: container
//! records, the compliance record and the registration record. Nothing can be
//! rolled back, so each step is recorded in a marker under `{blno}_SAGA`
//! before it runs. A failure after an earlier step committed is reported as
//! partially applied and the marker stays behind for reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info};
use uuid::Uuid;

use logistics_common::ledger::{get_json, put_json, saga_key};
use logistics_common::{Error, Ledger, Result};

/// Ordered steps of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    CreateContainers,
    SeedCompliance,
    PersistRegistration,
}

impl RegistrationStep {
    pub const ORDER: [RegistrationStep; 3] = [
        RegistrationStep::CreateContainers,
        RegistrationStep::SeedCompliance,
        RegistrationStep::PersistRegistration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStep::CreateContainers => "create_containers",
            RegistrationStep::SeedCompliance => "seed_compliance",
            RegistrationStep::PersistRegistration => "persist_registration",
        }
    }
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Saga status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    /// A step is running or about to run
    Pending,
    /// Every step committed
    Committed,
    /// The first step failed, nothing was applied
    Aborted,
    /// A step failed after earlier steps committed
    PartiallyApplied,
}

/// Marker stored under `{blno}_SAGA`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaRecord {
    pub saga_id: String,
    pub bl_no: String,
    pub status: SagaStatus,
    pub completed: Vec<RegistrationStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<RegistrationStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registration saga in flight
pub struct Saga<'a> {
    ledger: &'a dyn Ledger,
    record: SagaRecord,
}

impl<'a> Saga<'a> {
    /// Open a saga for `bl_no`, replacing any marker of an earlier attempt
    pub async fn begin(ledger: &'a dyn Ledger, bl_no: &str) -> Result<Saga<'a>> {
        let now = ledger.transaction_time();
        let record = SagaRecord {
            saga_id: Uuid::new_v4().to_string(),
            bl_no: bl_no.to_string(),
            status: SagaStatus::Pending,
            completed: Vec::new(),
            pending: None,
            failure: None,
            started_at: now,
            updated_at: now,
        };

        if let Some(previous) = load(ledger, bl_no).await? {
            info!(
                "Replacing {:?} saga {} for {}",
                previous.status, previous.saga_id, bl_no
            );
        }

        let saga = Saga { ledger, record };
        saga.save().await?;
        Ok(saga)
    }

    pub fn record(&self) -> &SagaRecord {
        &self.record
    }

    async fn save(&self) -> Result<()> {
        put_json(self.ledger, &saga_key(&self.record.bl_no), &self.record).await
    }

    /// Persist `step` as pending before running it
    pub async fn enter(&mut self, step: RegistrationStep) -> Result<()> {
        self.record.pending = Some(step);
        self.record.updated_at = self.ledger.transaction_time();
        self.save().await?;
        debug!("Saga {} entering {}", self.record.saga_id, step);
        Ok(())
    }

    /// Settle the pending step with its outcome
    ///
    /// A failure is turned into the error the caller must surface:
    /// the step's own error when nothing committed before it, otherwise
    /// `PartiallyApplied`.
    pub async fn exit<T>(&mut self, outcome: Result<T>) -> Result<T> {
        let step = self
            .record
            .pending
            .take()
            .ok_or_else(|| Error::validation("saga has no pending step"))?;
        self.record.updated_at = self.ledger.transaction_time();

        match outcome {
            Ok(value) => {
                self.record.completed.push(step);
                self.save().await?;
                Ok(value)
            }
            Err(err) => {
                error!("Saga {} failed at {}: {}", self.record.saga_id, step, err);

                self.record.failure = Some(err.to_string());
                self.record.status = if self.record.completed.is_empty() {
                    SagaStatus::Aborted
                } else {
                    SagaStatus::PartiallyApplied
                };
                if let Err(save_err) = self.save().await {
                    error!("Failed to record saga failure for {}: {}", self.record.bl_no, save_err);
                }

                if self.record.completed.is_empty() {
                    return Err(err);
                }

                Err(Error::PartiallyApplied {
                    key: self.record.bl_no.clone(),
                    completed: self
                        .record
                        .completed
                        .iter()
                        .map(|s| s.as_str().to_string())
                        .collect(),
                    failed_step: step.as_str().to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Mark every step committed
    pub async fn commit(mut self) -> Result<SagaRecord> {
        self.record.status = SagaStatus::Committed;
        self.record.updated_at = self.ledger.transaction_time();
        self.save().await?;
        info!("Saga {} for {} committed", self.record.saga_id, self.record.bl_no);
        Ok(self.record)
    }
}

/// Read the saga marker of `bl_no`
pub async fn load(ledger: &dyn Ledger, bl_no: &str) -> Result<Option<SagaRecord>> {
    get_json(ledger, &saga_key(bl_no)).await
}
