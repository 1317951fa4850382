//! Container State Tracker
//!
//! Owns the lifecycle of container records: creation when a Bill of Lading
//! registers, merge of partial telemetry updates, alert evaluation, history
//! logging and compliance notification on violation.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use logistics_common::invoke::{single_arg, unknown_function};
use logistics_common::ledger::{
    archive_key, check_bl_no, get_json, history_key, put_json, timestamp_string,
};
use logistics_common::models::require_trimmed;
use logistics_common::{
    evaluate, merge, ComplianceRecord, ContainerHistory, ContainerRecord, ContractConfig,
    ContractService, Dependency, Error, Evaluation, Ledger, RegistrationRecord, Result,
    ServiceInvoker,
};

use crate::context::ShipmentContext;
use crate::history::{self, HistoryRetention};

/// Ledger key of the contract configuration
pub const CONTRACT_STATE_KEY: &str = "CONTSTATEKEY";

/// Service name used in logs and health responses
pub const SERVICE_NAME: &str = "container-logistics";

/// Compliance operation receiving alert records
pub const COMPLIANCE_FUNCTION: &str = "createUpdateComplianceRecord";

/// Example container record returned by the schema operation
pub const CONTAINER_SCHEMA_EXAMPLE: &str = r#"{"containerno":"MSKU000000","location":{"latitude":10,"longitude":15},"temperature":2,"carrier":"Maersk","timestamp":"2016-03-03T20:27:23.969676659Z","humidity":15,"light":5,"doorclosed":true,"acceleration":0}"#;

/// Payload of the read operations
#[derive(Debug, Deserialize)]
struct ContainerQuery {
    #[serde(rename = "containerno", default)]
    container_no: Option<String>,
}

/// What an update did
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub container_no: String,
    pub evaluation: Evaluation,
    pub history_len: usize,
}

pub struct ContainerService {
    ledger: Arc<dyn Ledger>,
    invoker: Arc<dyn ServiceInvoker>,
    retention: HistoryRetention,
}

impl ContainerService {
    pub fn new(ledger: Arc<dyn Ledger>, invoker: Arc<dyn ServiceInvoker>) -> Self {
        Self {
            ledger,
            invoker,
            retention: HistoryRetention::default(),
        }
    }

    pub fn with_history_retention(mut self, retention: HistoryRetention) -> Self {
        self.retention = retention;
        self
    }

    fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    /// Store the contract configuration after validating it
    pub async fn init_contract(&self, config: &ContractConfig) -> Result<()> {
        config.validate(&[Dependency::Compliance])?;
        put_json(self.ledger(), CONTRACT_STATE_KEY, config).await?;

        info!(
            "Container contract initialized (version {}, compliance {:?})",
            config.version, config.compliance_service
        );
        Ok(())
    }

    async fn contract_config(&self) -> Result<ContractConfig> {
        get_json(self.ledger(), CONTRACT_STATE_KEY)
            .await?
            .ok_or_else(|| Error::Uninitialized("container contract state not found".to_string()))
    }

    /// Create the container records of a freshly registered Bill of Lading
    pub async fn create_from_registration(&self, registration: &RegistrationRecord) -> Result<()> {
        let bl_no = require_trimmed(registration.bl_no.as_deref(), "Bill of Lading number")?;
        require_trimmed(registration.container_nos.as_deref(), "Container numbers")?;
        check_bl_no(&bl_no)?;

        let container_numbers = registration.container_numbers();
        if container_numbers.is_empty() {
            return Err(Error::validation("Container numbers list has no container number"));
        }

        let timestamp = match registration.timestamp.as_deref().map(str::trim) {
            Some(ts) if !ts.is_empty() => ts.to_string(),
            _ => timestamp_string(self.ledger.transaction_time()),
        };

        ShipmentContext::record(self.ledger(), &bl_no, registration).await?;

        for container_no in container_numbers {
            if let Some(raw) = self.ledger.get(&container_no).await? {
                let existing: ContainerRecord = serde_json::from_slice(&raw)?;
                let old_bl_no = existing.bl_no.unwrap_or_default();

                if old_bl_no == bl_no {
                    debug!("Container {} already linked to {}, leaving untouched", container_no, bl_no);
                    continue;
                }

                self.archive(&container_no, &old_bl_no, raw).await?;
            }

            let record = ContainerRecord::new(container_no.clone(), bl_no.clone(), timestamp.clone());
            let snapshot = serde_json::to_string(&record)?;

            put_json(self.ledger(), &container_no, &record).await?;
            history::start(self.ledger(), &container_no, snapshot).await?;

            info!("Created container record {} for {}", container_no, bl_no);
        }

        Ok(())
    }

    /// Re-key a container used by an earlier shipment to `{container}_{old blno}`
    async fn archive(&self, container_no: &str, old_bl_no: &str, raw: Vec<u8>) -> Result<()> {
        let key = archive_key(container_no, old_bl_no);
        self.ledger.put(&key, raw).await?;

        if let Some(history) = history::read(self.ledger(), container_no).await? {
            put_json(self.ledger(), &history_key(&key), &history).await?;
        }

        info!("Archived container {} of {} under {}", container_no, old_bl_no, key);
        Ok(())
    }

    /// Apply a partial telemetry update to a registered container
    ///
    /// The compliance notification happens before anything is written: if it
    /// fails, the container state stays as it was.
    pub async fn update(&self, payload: &[u8]) -> Result<UpdateOutcome> {
        let mut incoming: ContainerRecord = serde_json::from_slice(payload)?;
        let container_no = require_trimmed(incoming.container_no.as_deref(), "Container number")?;
        incoming.container_no = Some(container_no.clone());

        let stored: ContainerRecord = get_json(self.ledger(), &container_no)
            .await?
            .ok_or_else(|| {
                Error::NotRegistered(format!(
                    "Container record {} not created during registration",
                    container_no
                ))
            })?;

        let mut merged = merge(stored, &incoming);

        let bl_no = merged.bl_no.clone().ok_or_else(|| {
            Error::NotRegistered(format!("Container {} is not linked to a Bill of Lading", container_no))
        })?;
        incoming.bl_no = Some(bl_no.clone());

        let context = ShipmentContext::load(self.ledger(), &bl_no).await?;
        let evaluation = evaluate(&context.thresholds, &incoming);

        if let Evaluation::Violation(alerts) = &evaluation {
            let snapshot = serde_json::to_string(alerts)?;
            warn!(
                "Container {} of {} (hazmat: {}) raised alerts: {}",
                container_no, context.bl_no, context.hazmat, snapshot
            );

            merged.alerts = Some(snapshot.clone());
            let timestamp = merged
                .timestamp
                .clone()
                .unwrap_or_else(|| timestamp_string(self.ledger.transaction_time()));

            let record = ComplianceRecord::violation(bl_no.clone(), container_no.clone(), snapshot, timestamp);
            self.notify_compliance(&record).await?;
        }

        put_json(self.ledger(), &container_no, &merged).await?;

        let entry = String::from_utf8_lossy(payload).into_owned();
        let history_len = history::append(self.ledger(), &container_no, entry, self.retention).await?;

        info!("Container {} state written to ledger", container_no);

        Ok(UpdateOutcome {
            container_no,
            evaluation,
            history_len,
        })
    }

    async fn notify_compliance(&self, record: &ComplianceRecord) -> Result<()> {
        let config = self.contract_config().await?;
        let service = config.dependency(Dependency::Compliance)?;
        let args = vec![serde_json::to_vec(record)?];

        self.invoker
            .invoke(service, COMPLIANCE_FUNCTION, args)
            .await
            .map_err(|e| {
                error!("Compliance notification for {} failed: {:#}", record.bl_no, e);
                Error::dependency(service, COMPLIANCE_FUNCTION, &e)
            })?;

        Ok(())
    }

    /// Current state of a container
    pub async fn current_status(&self, container_no: &str) -> Result<ContainerRecord> {
        let container_no = require_trimmed(Some(container_no), "Container number")?;
        get_json(self.ledger(), &container_no)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Container record not available: {}", container_no)))
    }

    /// History log of a container, newest first
    pub async fn history(&self, container_no: &str) -> Result<ContainerHistory> {
        let container_no = require_trimmed(Some(container_no), "Container number")?;
        history::read(self.ledger(), &container_no)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No history for container: {}", container_no)))
    }

    fn query(args: &[Vec<u8>]) -> Result<String> {
        let query: ContainerQuery = single_arg(args)?;
        require_trimmed(query.container_no.as_deref(), "Container number")
    }
}

#[async_trait]
impl ContractService for ContainerService {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn init(&self, payload: &[u8]) -> Result<()> {
        let config: ContractConfig = serde_json::from_slice(payload)?;
        self.init_contract(&config).await
    }

    async fn invoke(&self, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        match function {
            "createContainerLogistics" => {
                let registration: RegistrationRecord = single_arg(args)?;
                self.create_from_registration(&registration).await?;
                Ok(Vec::new())
            }
            "updateContainerLogistics" => match args {
                [payload] => {
                    self.update(payload).await?;
                    Ok(Vec::new())
                }
                _ => Err(Error::validation(
                    "Incorrect number of arguments: expected a single JSON container update",
                )),
            },
            "readContainerCurrentStatus" => {
                let record = self.current_status(&Self::query(args)?).await?;
                Ok(serde_json::to_vec(&record)?)
            }
            "readContainerHistory" => {
                let history = self.history(&Self::query(args)?).await?;
                Ok(serde_json::to_vec(&history)?)
            }
            "readContainerLogisticsSchema" | "readContainerLogisitcsSchema" => {
                Ok(CONTAINER_SCHEMA_EXAMPLE.as_bytes().to_vec())
            }
            other => Err(unknown_function(SERVICE_NAME, other)),
        }
    }
}
