//! Configuration management: `gridrun.toml` parsing and the immutable run config.
//!
//! [`GridrunConfig`] mirrors the TOML file. [`DeploymentConfig`] is derived from it
//! once per run, after CLI overrides, and is never mutated afterwards.
//!
//! # Loading priority
//! 1. CLI flags (highest)
//! 2. Environment variables (`GRIDRUN_JOB_TIMEOUT_SECS=600` style)
//! 3. Config file (`gridrun.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), gridrun_core::error::GridrunError> {
//! use gridrun_core::config::{DeployOverrides, DeploymentConfig, GridrunConfig};
//!
//! let config = GridrunConfig::load("gridrun.toml").await?;
//! let deployment = DeploymentConfig::from_config(&config, &DeployOverrides::default())?;
//! assert!((1..=5).contains(&deployment.node_count()));
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, GridrunError};

/// Smallest number of browser nodes a run may request.
pub const MIN_NODE_COUNT: u32 = 1;
/// Largest number of browser nodes a run may request.
pub const MAX_NODE_COUNT: u32 = 5;

/// Clamps a requested node count into `MIN_NODE_COUNT..=MAX_NODE_COUNT`.
pub fn clamp_node_count(requested: i64) -> u32 {
    requested.clamp(i64::from(MIN_NODE_COUNT), i64::from(MAX_NODE_COUNT)) as u32
}

/// Full gridrun configuration as read from `gridrun.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridrunConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl GridrunConfig {
    /// Loads a TOML file, applies environment overrides and validates the result.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GridrunError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, GridrunError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GridrunError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                GridrunError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Defaults plus environment overrides, used when no config file exists.
    pub fn from_env() -> Result<Self, GridrunError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML string. Missing sections and fields fall back to defaults.
    pub fn parse(toml_str: &str) -> Result<Self, GridrunError> {
        toml::from_str(toml_str).map_err(|e| {
            GridrunError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies `GRIDRUN_{SECTION}_{FIELD}` environment variables.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "GRIDRUN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "GRIDRUN_GENERAL_LOG_FORMAT");

        override_string(&mut self.cluster.kubectl, "GRIDRUN_CLUSTER_KUBECTL");
        override_string(&mut self.cluster.namespace, "GRIDRUN_CLUSTER_NAMESPACE");
        override_string(
            &mut self.cluster.manifests_dir,
            "GRIDRUN_CLUSTER_MANIFESTS_DIR",
        );

        override_parsed(&mut self.grid.node_count, "GRIDRUN_GRID_NODE_COUNT");
        override_string(&mut self.grid.workload, "GRIDRUN_GRID_WORKLOAD");
        override_string(&mut self.grid.service, "GRIDRUN_GRID_SERVICE");
        override_string(&mut self.grid.config_map, "GRIDRUN_GRID_CONFIG_MAP");
        override_string(&mut self.grid.config_key, "GRIDRUN_GRID_CONFIG_KEY");

        override_parsed(
            &mut self.readiness.timeout_secs,
            "GRIDRUN_READINESS_TIMEOUT_SECS",
        );
        override_parsed(
            &mut self.readiness.interval_secs,
            "GRIDRUN_READINESS_INTERVAL_SECS",
        );

        override_string(&mut self.job.selector, "GRIDRUN_JOB_SELECTOR");
        override_parsed(
            &mut self.job.startup_delay_secs,
            "GRIDRUN_JOB_STARTUP_DELAY_SECS",
        );
        override_parsed(&mut self.job.timeout_secs, "GRIDRUN_JOB_TIMEOUT_SECS");
        override_parsed(
            &mut self.job.poll_interval_secs,
            "GRIDRUN_JOB_POLL_INTERVAL_SECS",
        );
        override_parsed(&mut self.job.tail_lines, "GRIDRUN_JOB_TAIL_LINES");

        override_string(&mut self.report.output_dir, "GRIDRUN_REPORT_OUTPUT_DIR");
    }

    /// Checks every field against its allowed domain.
    pub fn validate(&self) -> Result<(), GridrunError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        for (field, value) in [
            ("cluster.kubectl", &self.cluster.kubectl),
            ("cluster.namespace", &self.cluster.namespace),
            ("grid.workload", &self.grid.workload),
            ("grid.service", &self.grid.service),
            ("grid.config_map", &self.grid.config_map),
            ("grid.config_key", &self.grid.config_key),
            ("job.selector", &self.job.selector),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty".to_owned()));
            }
        }

        if self.readiness.interval_secs == 0 {
            return Err(invalid(
                "readiness.interval_secs",
                "must be greater than zero".to_owned(),
            ));
        }
        if self.readiness.interval_secs > self.readiness.timeout_secs {
            return Err(invalid(
                "readiness.interval_secs",
                "must not exceed readiness.timeout_secs".to_owned(),
            ));
        }
        if self.job.poll_interval_secs == 0 {
            return Err(invalid(
                "job.poll_interval_secs",
                "must be greater than zero".to_owned(),
            ));
        }
        if self.job.poll_interval_secs > self.job.timeout_secs {
            return Err(invalid(
                "job.poll_interval_secs",
                "must not exceed job.timeout_secs".to_owned(),
            ));
        }
        if self.job.tail_lines == 0 {
            return Err(invalid("job.tail_lines", "must be greater than zero".to_owned()));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> GridrunError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Control-plane access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// kubectl binary name or path.
    pub kubectl: String,
    /// Namespace owning every resource of the run.
    pub namespace: String,
    /// Directory holding the five ordered manifests.
    pub manifests_dir: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_owned(),
            namespace: "test-automation".to_owned(),
            manifests_dir: "k8s/manifests".to_owned(),
        }
    }
}

/// Browser node workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Requested replica count; clamped into 1..=5 when the run config is built.
    pub node_count: i64,
    pub workload: String,
    pub service: String,
    pub config_map: String,
    /// Config map data key receiving the node count.
    pub config_key: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            node_count: 2,
            workload: "chrome-node".to_owned(),
            service: "chrome-node-service".to_owned(),
            config_map: "test-automation-config".to_owned(),
            config_key: "node_count".to_owned(),
        }
    }
}

/// Replica readiness polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            interval_secs: 10,
        }
    }
}

/// Job-runner monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Label selector identifying the job-runner pod.
    pub selector: String,
    /// Delay between deploying the job runner and looking up its pod.
    pub startup_delay_secs: u64,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Number of log lines fetched per poll.
    pub tail_lines: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            selector: "component=test-controller".to_owned(),
            startup_delay_secs: 5,
            timeout_secs: 300,
            poll_interval_secs: 5,
            tail_lines: 100,
        }
    }
}

/// Report artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: "reports".to_owned(),
        }
    }
}

/// CLI-level overrides applied on top of [`GridrunConfig`].
#[derive(Debug, Clone, Default)]
pub struct DeployOverrides {
    pub node_count: Option<i64>,
    pub manifests_dir: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub namespace: Option<String>,
}

/// Immutable settings for one orchestrator run.
///
/// The node count is clamped on construction, so every consumer sees a value
/// in `MIN_NODE_COUNT..=MAX_NODE_COUNT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentConfig {
    namespace: String,
    manifests_dir: PathBuf,
    node_count: u32,
    workload: String,
    service: String,
    config_map: String,
    config_key: String,
    job_selector: String,
    readiness_timeout: Duration,
    readiness_interval: Duration,
    job_startup_delay: Duration,
    job_timeout: Duration,
    job_poll_interval: Duration,
    log_tail_lines: u32,
    report_dir: PathBuf,
}

impl DeploymentConfig {
    /// Builds the run config from a loaded file config plus CLI overrides.
    ///
    /// A blank namespace, typically from `--namespace ""`, is rejected.
    pub fn from_config(
        config: &GridrunConfig,
        overrides: &DeployOverrides,
    ) -> Result<Self, GridrunError> {
        let deployment = Self::resolve(config, overrides);
        if deployment.namespace.trim().is_empty() {
            return Err(invalid("namespace", "must not be empty".to_owned()));
        }
        Ok(deployment)
    }

    fn resolve(config: &GridrunConfig, overrides: &DeployOverrides) -> Self {
        let requested = overrides.node_count.unwrap_or(config.grid.node_count);
        let node_count = clamp_node_count(requested);
        if i64::from(node_count) != requested {
            warn!(
                requested,
                node_count,
                "node count clamped into allowed range"
            );
        }

        Self {
            namespace: overrides
                .namespace
                .clone()
                .unwrap_or_else(|| config.cluster.namespace.clone()),
            manifests_dir: overrides
                .manifests_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.cluster.manifests_dir)),
            node_count,
            workload: config.grid.workload.clone(),
            service: config.grid.service.clone(),
            config_map: config.grid.config_map.clone(),
            config_key: config.grid.config_key.clone(),
            job_selector: config.job.selector.clone(),
            readiness_timeout: Duration::from_secs(config.readiness.timeout_secs),
            readiness_interval: Duration::from_secs(config.readiness.interval_secs),
            job_startup_delay: Duration::from_secs(config.job.startup_delay_secs),
            job_timeout: Duration::from_secs(config.job.timeout_secs),
            job_poll_interval: Duration::from_secs(config.job.poll_interval_secs),
            log_tail_lines: config.job.tail_lines,
            report_dir: overrides
                .report_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.report.output_dir)),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn manifests_dir(&self) -> &Path {
        &self.manifests_dir
    }

    /// Path of one of the five pipeline manifests.
    pub fn manifest_path(&self, manifest: crate::types::Manifest) -> PathBuf {
        self.manifests_dir.join(manifest.file_name())
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn workload(&self) -> &str {
        &self.workload
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config_map(&self) -> &str {
        &self.config_map
    }

    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    pub fn job_selector(&self) -> &str {
        &self.job_selector
    }

    pub fn readiness_timeout(&self) -> Duration {
        self.readiness_timeout
    }

    pub fn readiness_interval(&self) -> Duration {
        self.readiness_interval
    }

    pub fn job_startup_delay(&self) -> Duration {
        self.job_startup_delay
    }

    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    pub fn job_poll_interval(&self) -> Duration {
        self.job_poll_interval
    }

    pub fn log_tail_lines(&self) -> u32 {
        self.log_tail_lines
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self::resolve(&GridrunConfig::default(), &DeployOverrides::default())
    }
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Manifest;

    #[test]
    fn default_config_mirrors_script_defaults() {
        let config = GridrunConfig::default();
        assert_eq!(config.cluster.namespace, "test-automation");
        assert_eq!(config.cluster.manifests_dir, "k8s/manifests");
        assert_eq!(config.grid.node_count, 2);
        assert_eq!(config.readiness.timeout_secs, 300);
        assert_eq!(config.readiness.interval_secs, 10);
        assert_eq!(config.job.selector, "component=test-controller");
        assert_eq!(config.job.tail_lines, 100);
    }

    #[test]
    fn default_config_passes_validation() {
        GridrunConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = GridrunConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.grid.workload, "chrome-node");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[grid]
node_count = 4

[job]
timeout_secs = 900
"#;
        let config = GridrunConfig::parse(toml).unwrap();
        assert_eq!(config.grid.node_count, 4);
        assert_eq!(config.grid.service, "chrome-node-service");
        assert_eq!(config.job.timeout_secs, 900);
        assert_eq!(config.job.poll_interval_secs, 5);
    }

    #[test]
    fn parse_wrong_type_fails() {
        let err = GridrunConfig::parse("[grid]\nnode_count = \"many\"").unwrap_err();
        assert!(matches!(err, GridrunError::Config(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = GridrunConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = GridrunConfig::default();
        config.job.poll_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("job.poll_interval_secs"));
    }

    #[test]
    fn validate_rejects_interval_longer_than_timeout() {
        let mut config = GridrunConfig::default();
        config.readiness.timeout_secs = 5;
        config.readiness.interval_secs = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("readiness.interval_secs"));
    }

    #[test]
    fn validate_rejects_blank_namespace() {
        let mut config = GridrunConfig::default();
        config.cluster.namespace = "  ".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cluster.namespace"));
    }

    #[test]
    fn clamp_node_count_bounds() {
        assert_eq!(clamp_node_count(0), 1);
        assert_eq!(clamp_node_count(-3), 1);
        assert_eq!(clamp_node_count(1), 1);
        assert_eq!(clamp_node_count(3), 3);
        assert_eq!(clamp_node_count(5), 5);
        assert_eq!(clamp_node_count(9), 5);
    }

    #[test]
    fn deployment_config_clamps_file_value() {
        let mut config = GridrunConfig::default();
        config.grid.node_count = 12;
        let overrides = DeployOverrides::default();
        let deployment = DeploymentConfig::from_config(&config, &overrides).unwrap();
        assert_eq!(deployment.node_count(), 5);
    }

    #[test]
    fn deployment_config_cli_overrides_win() {
        let config = GridrunConfig::default();
        let overrides = DeployOverrides {
            node_count: Some(0),
            manifests_dir: Some(PathBuf::from("/srv/manifests")),
            report_dir: Some(PathBuf::from("/tmp/reports")),
            namespace: Some("qa".to_owned()),
        };
        let deployment = DeploymentConfig::from_config(&config, &overrides).unwrap();
        assert_eq!(deployment.node_count(), 1);
        assert_eq!(deployment.namespace(), "qa");
        assert_eq!(deployment.report_dir(), Path::new("/tmp/reports"));
        assert_eq!(
            deployment.manifest_path(Manifest::Namespace),
            PathBuf::from("/srv/manifests/01-namespace.yaml")
        );
    }

    #[test]
    fn deployment_config_rejects_blank_namespace_override() {
        for namespace in ["", "  "] {
            let overrides = DeployOverrides {
                namespace: Some(namespace.to_owned()),
                ..Default::default()
            };
            let config = GridrunConfig::default();
            let err = DeploymentConfig::from_config(&config, &overrides).unwrap_err();
            assert!(matches!(
                err,
                GridrunError::Config(ConfigError::InvalidValue { ref field, .. })
                    if field == "namespace"
            ));
        }
    }

    #[test]
    fn deployment_config_rejects_blank_file_namespace() {
        let mut config = GridrunConfig::default();
        config.cluster.namespace = String::new();
        let overrides = DeployOverrides::default();
        assert!(DeploymentConfig::from_config(&config, &overrides).is_err());
    }

    #[test]
    fn deployment_config_converts_seconds() {
        let deployment = DeploymentConfig::default();
        assert_eq!(deployment.readiness_timeout(), Duration::from_secs(300));
        assert_eq!(deployment.readiness_interval(), Duration::from_secs(10));
        assert_eq!(deployment.job_startup_delay(), Duration::from_secs(5));
        assert_eq!(deployment.job_poll_interval(), Duration::from_secs(5));
    }
}
