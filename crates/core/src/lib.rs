//! gridrun core: configuration, error taxonomy, domain types and the
//! capabilities (clock, reporter) injected into every deployer component.

pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod reporter;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DeployOverrides, DeploymentConfig, GridrunConfig};
pub use error::{ConfigError, GridrunError};
pub use reporter::{RecordingReporter, ReportEvent, Reporter, SilentReporter};
pub use types::{CommandResult, JobOutcome, Manifest, ReadinessState, ReportArtifact};
