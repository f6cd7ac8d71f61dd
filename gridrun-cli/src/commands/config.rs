//! `gridrun config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use gridrun_core::config::GridrunConfig;

use super::{load_config, source_label};
use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Section names accepted by `config show --section`.
pub const SECTIONS: [&str; 6] = ["general", "cluster", "grid", "readiness", "job", "report"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Loads and validates the configuration, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails.
async fn execute_validate(
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let source = source_label(config_path);
    info!(source = %source, "validating configuration");

    let report = match load_config(config_path).await {
        Ok(_) => ConfigValidationReport {
            source,
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Displays the effective configuration, optionally a single section.
async fn execute_show(
    config_path: Option<&Path>,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let source = source_label(config_path);
    info!(source = %source, "loading configuration");

    let config = load_config(config_path).await?;

    let config_toml = match section.as_deref() {
        Some(name) => section_toml(&config, name)?,
        None => to_toml(&config),
    };

    let report = ConfigReport {
        source,
        section,
        config_toml,
    };
    writer.render(&report)?;

    Ok(())
}

/// TOML text of one named section.
pub fn section_toml(config: &GridrunConfig, name: &str) -> Result<String, CliError> {
    let text = match name {
        "general" => to_toml(&config.general),
        "cluster" => to_toml(&config.cluster),
        "grid" => to_toml(&config.grid),
        "readiness" => to_toml(&config.readiness),
        "job" => to_toml(&config.job),
        "report" => to_toml(&config.report),
        _ => {
            return Err(CliError::Command(format!(
                "unknown section: {name} (expected: {})",
                SECTIONS.join(", ")
            )));
        }
    };
    Ok(text)
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {e})"))
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid.
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_toml_known_sections() {
        let config = GridrunConfig::default();
        for name in SECTIONS {
            let text = section_toml(&config, name).expect("known section");
            assert!(!text.is_empty(), "{name} should render");
        }
        let job = section_toml(&config, "job").expect("job section");
        assert!(job.contains("selector = \"component=test-controller\""));
    }

    #[test]
    fn test_section_toml_unknown_section() {
        let err = section_toml(&GridrunConfig::default(), "ebpf").expect_err("unknown");
        assert!(err.to_string().contains("unknown section: ebpf"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_config_report_render_text_section() {
        let report = ConfigReport {
            source: "gridrun.toml".to_owned(),
            section: Some("grid".to_owned()),
            config_toml: "node_count = 2\n".to_owned(),
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("renders");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("[grid]"));
        assert!(output.contains("gridrun.toml"));
        assert!(output.contains("node_count = 2"));
    }

    #[test]
    fn test_config_report_json_skips_toml() {
        let report = ConfigReport {
            source: "gridrun.toml".to_owned(),
            section: None,
            config_toml: "secret".to_owned(),
        };
        let json = serde_json::to_string(&report).expect("serializes");
        assert!(!json.contains("secret"));
        assert!(!json.contains("section"));
    }

    #[test]
    fn test_validation_report_render_invalid() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["invalid config value for 'job.timeout_secs'".to_owned()],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("renders");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("INVALID"));
        assert!(output.contains("job.timeout_secs"));
    }
}
