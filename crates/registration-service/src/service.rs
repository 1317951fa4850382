//! Bill of Lading registration
//!
//! A registration creates the container records through the container
//! service, seeds a compliant record in the compliance service and finally
//! stores the registration itself. Each step must succeed before the next
//! one runs; progress is tracked by the registration saga.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use logistics_common::invoke::{single_arg, unknown_function};
use logistics_common::ledger::{check_bl_no, get_json, put_json, timestamp_string};
use logistics_common::models::require_trimmed;
use logistics_common::{
    ComplianceRecord, ContractConfig, ContractService, Dependency, Error, Ledger,
    RegistrationRecord, Result, ServiceInvoker,
};

use crate::saga::{self, RegistrationStep, Saga, SagaRecord};

/// Ledger key of the contract configuration
pub const CONTRACT_STATE_KEY: &str = "BLSTATEKEY";

/// Service name used in logs and health responses
pub const SERVICE_NAME: &str = "bill-of-lading-registration";

/// Container service operation creating the containers of a registration
pub const CREATE_CONTAINERS_FUNCTION: &str = "createContainerLogistics";

/// Compliance operation seeding the shipment's record
pub const COMPLIANCE_FUNCTION: &str = "createUpdateComplianceRecord";

/// Example registration returned by the schema operation
pub const REGISTRATION_SCHEMA_EXAMPLE: &str = r#"{"blno":"0000000000","containernos":"MSKU000000, MRSK000000","hazmat":false,"mintemperature":-20.00,"maxtemperature":0.00,"minhumidity":20.00,"maxhumidity":50.00,"minlight":0.00,"maxlight":100.00,"minacceleration":0.001,"maxacceleration":1.9}"#;

/// Payload of the read operations
#[derive(Debug, Deserialize)]
struct RegistrationQuery {
    #[serde(rename = "blno", default)]
    bl_no: Option<String>,
}

pub struct RegistrationService {
    ledger: Arc<dyn Ledger>,
    invoker: Arc<dyn ServiceInvoker>,
}

impl RegistrationService {
    pub fn new(ledger: Arc<dyn Ledger>, invoker: Arc<dyn ServiceInvoker>) -> Self {
        Self { ledger, invoker }
    }

    fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    /// Store the contract configuration after validating it
    pub async fn init_contract(&self, config: &ContractConfig) -> Result<()> {
        config.validate(&[Dependency::Container, Dependency::Compliance])?;
        put_json(self.ledger(), CONTRACT_STATE_KEY, config).await?;

        info!(
            "Registration contract initialized (version {}, container {:?}, compliance {:?})",
            config.version, config.container_service, config.compliance_service
        );
        Ok(())
    }

    async fn contract_config(&self) -> Result<ContractConfig> {
        get_json(self.ledger(), CONTRACT_STATE_KEY)
            .await?
            .ok_or_else(|| {
                Error::Uninitialized("registration contract state not found".to_string())
            })
    }

    /// Register a Bill of Lading
    pub async fn register(&self, payload: &[u8]) -> Result<RegistrationRecord> {
        let mut registration: RegistrationRecord = serde_json::from_slice(payload)?;

        if registration.bl_no.is_none()
            || registration.container_nos.is_none()
            || registration.hazmat.is_none()
        {
            return Err(Error::validation(
                "Bill of Lading, Container Numbers and Hazmat flag are mandatory",
            ));
        }

        let bl_no = require_trimmed(registration.bl_no.as_deref(), "Bill of Lading number")?;
        let container_nos =
            require_trimmed(registration.container_nos.as_deref(), "Container numbers")?;
        check_bl_no(&bl_no)?;
        registration.bl_no = Some(bl_no.clone());
        registration.container_nos = Some(container_nos);
        if registration.container_numbers().is_empty() {
            return Err(Error::validation("Container numbers list has no container number"));
        }

        let timestamp = match registration.timestamp.as_deref().map(str::trim) {
            Some(ts) if !ts.is_empty() => ts.to_string(),
            _ => timestamp_string(self.ledger.transaction_time()),
        };
        registration.timestamp = Some(timestamp.clone());

        if self.ledger.get(&bl_no).await?.is_some() {
            return Err(Error::Duplicate(format!(
                "You cannot create an existing Bill of Lading record: {}",
                bl_no
            )));
        }

        registration.transit_complete = Some(false);

        let config = self.contract_config().await?;
        let container_service = config.dependency(Dependency::Container)?;
        let compliance_service = config.dependency(Dependency::Compliance)?;

        let registration_json = serde_json::to_vec(&registration)?;
        let compliance = ComplianceRecord::initial(bl_no.clone(), timestamp);

        let mut saga = Saga::begin(self.ledger(), &bl_no).await?;
        debug!("Registering {} under saga {}", bl_no, saga.record().saga_id);

        saga.enter(RegistrationStep::CreateContainers).await?;
        let outcome = self
            .call(container_service, CREATE_CONTAINERS_FUNCTION, registration_json.clone())
            .await;
        saga.exit(outcome).await?;

        saga.enter(RegistrationStep::SeedCompliance).await?;
        let outcome = match serde_json::to_vec(&compliance) {
            Ok(body) => self.call(compliance_service, COMPLIANCE_FUNCTION, body).await,
            Err(e) => Err(e.into()),
        };
        saga.exit(outcome).await?;

        saga.enter(RegistrationStep::PersistRegistration).await?;
        let outcome = self.ledger.put(&bl_no, registration_json).await;
        saga.exit(outcome).await?;

        saga.commit().await?;
        info!("Registered Bill of Lading {}", bl_no);

        Ok(registration)
    }

    async fn call(&self, service: &str, function: &str, payload: Vec<u8>) -> Result<()> {
        debug!("Invoking {} on {}", function, service);

        self.invoker
            .invoke(service, function, vec![payload])
            .await
            .map_err(|e| {
                error!("Failed to invoke {} on {}: {:#}", function, service, e);
                Error::dependency(service, function, &e)
            })?;

        Ok(())
    }

    /// Deregistration is declared but has no behavior
    pub async fn deregister(&self, _payload: &[u8]) -> Result<()> {
        debug!("deregisterBillOfLading called, nothing to do");
        Ok(())
    }

    /// Registration record of a Bill of Lading
    pub async fn registration(&self, bl_no: &str) -> Result<RegistrationRecord> {
        let bl_no = require_trimmed(Some(bl_no), "Bill of Lading number")?;
        get_json(self.ledger(), &bl_no)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Bill of Lading not registered: {}", bl_no)))
    }

    /// Saga marker of the last registration attempt of a Bill of Lading
    pub async fn saga_status(&self, bl_no: &str) -> Result<SagaRecord> {
        let bl_no = require_trimmed(Some(bl_no), "Bill of Lading number")?;
        saga::load(self.ledger(), &bl_no)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No registration attempt for: {}", bl_no)))
    }

    fn query(args: &[Vec<u8>]) -> Result<String> {
        let query: RegistrationQuery = single_arg(args)?;
        require_trimmed(query.bl_no.as_deref(), "Bill of Lading number")
    }
}

#[async_trait]
impl ContractService for RegistrationService {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn init(&self, payload: &[u8]) -> Result<()> {
        let config: ContractConfig = serde_json::from_slice(payload)?;
        self.init_contract(&config).await
    }

    async fn invoke(&self, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        match function {
            "registerBillOfLading" => match args {
                [payload] => {
                    self.register(payload).await?;
                    Ok(Vec::new())
                }
                _ => Err(Error::validation(
                    "Incorrect number of arguments: expected a single JSON registration",
                )),
            },
            "deregisterBillOfLading" => {
                self.deregister(args.first().map(Vec::as_slice).unwrap_or_default())
                    .await?;
                Ok(Vec::new())
            }
            "getBillOfLadingRegistration" => {
                let registration = self.registration(&Self::query(args)?).await?;
                Ok(serde_json::to_vec(&registration)?)
            }
            "getRegistrationSagaStatus" => {
                let record = self.saga_status(&Self::query(args)?).await?;
                Ok(serde_json::to_vec(&record)?)
            }
            "getBillOfLadingRegistrationSchema" => {
                Ok(REGISTRATION_SCHEMA_EXAMPLE.as_bytes().to_vec())
            }
            other => Err(unknown_function(SERVICE_NAME, other)),
        }
    }
}
