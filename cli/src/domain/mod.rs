//! Domain layer — pure types, validation and aggregation rules.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod address;
pub mod config;
pub mod context;
pub mod error;
pub mod instance;
pub mod naming;
pub mod request;
pub mod ssh;

pub use address::AddressPair;
pub use config::{FlotillaConfig, validate_config_key, validate_config_value};
pub use context::{MachineRecord, PipelineContext, ResultSet};
pub use error::{ConfigError, ProvisionError, ShellError};
pub use instance::{InstanceHandle, InstanceState, Readiness};
pub use request::{DeprovisionRequest, ProviderOptions, ProvisionRequest};
pub use ssh::{CommandResult, SshAuth, SshCredential, SshTarget};
