//! Shared types for the logistics services

pub mod alerts;
pub mod api;
pub mod error;
pub mod invoke;
pub mod ledger;
pub mod merge;
pub mod models;

pub use alerts::{evaluate, Alerts, Bounds, Evaluation, Thresholds, Variation};
pub use error::{Error, Result};
pub use invoke::{ContractService, HttpInvoker, LocalInvoker, ServiceInvoker};
pub use ledger::{Ledger, LedgerBackend, MemoryLedger, RedisLedger};
pub use merge::{merge, Mergeable};
pub use models::{
    ComplianceRecord, ContainerHistory, ContainerRecord, ContractConfig, Dependency, Geolocation,
    RegistrationRecord,
};
