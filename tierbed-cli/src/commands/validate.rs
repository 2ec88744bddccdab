//! `tierbed validate` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use tierbed_core::config::{PlanKind, TierbedConfig};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Loads and validates the configuration file, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if loading or validation fails.
pub async fn execute(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = ValidationReport::from_result(
        config_path,
        TierbedConfig::load(config_path).await.map_err(|e| e.to_string()),
    );
    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Validation outcome plus a one-line plan summary.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub source: String,
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PlanSummary>,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub prefix: String,
    pub kind: PlanKind,
    pub entities: usize,
    pub tiers: Vec<String>,
    pub policy: bool,
    pub phases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl ValidationReport {
    pub fn from_result(path: &Path, result: Result<TierbedConfig, String>) -> Self {
        let source = path.display().to_string();
        match result {
            Ok(config) => {
                let plan = &config.plan;
                Self {
                    source,
                    valid: true,
                    errors: Vec::new(),
                    summary: Some(PlanSummary {
                        prefix: plan.prefix.clone(),
                        kind: plan.kind,
                        entities: plan.entities.len(),
                        tiers: plan
                            .entities
                            .iter()
                            .map(|e| e.target_tier.to_string())
                            .collect(),
                        policy: plan.policy.enabled,
                        phases: plan.policy.phases.iter().map(ToString::to_string).collect(),
                        repository: plan.policy.repository().map(str::to_owned),
                    }),
                }
            }
            Err(error) => Self {
                source,
                valid: false,
                errors: vec![error],
                summary: None,
            },
        }
    }
}

impl Render for ValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.valid {
            writeln!(w, "{} {}", "valid".green().bold(), self.source)?;
        } else {
            writeln!(w, "{} {}", "invalid".red().bold(), self.source)?;
            for error in &self.errors {
                writeln!(w, "  - {error}")?;
            }
        }

        if let Some(summary) = &self.summary {
            writeln!(w, "  prefix:     {}", summary.prefix)?;
            writeln!(
                w,
                "  entities:   {} ({})",
                summary.entities,
                summary.tiers.join(", ")
            )?;
            if summary.policy {
                writeln!(w, "  policy:     {}", summary.phases.join(" -> "))?;
            } else {
                writeln!(w, "  policy:     {}", "disabled".dimmed())?;
            }
            if let Some(repository) = &summary.repository {
                writeln!(w, "  repository: {repository}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_reports_plan_summary() {
        let config = TierbedConfig::parse(
            r#"
[plan]
prefix = "ci"

[plan.policy]
phases = ["hot", "frozen"]
repository = "snaps"

[[plan.entities]]
target_tier = "frozen"
"#,
        )
        .expect("should parse");
        let report = ValidationReport::from_result(Path::new("t.toml"), Ok(config));

        assert!(report.valid);
        let summary = report.summary.as_ref().expect("summary for a valid config");
        assert_eq!(summary.prefix, "ci");
        assert_eq!(summary.tiers, ["frozen"]);
        assert_eq!(summary.repository.as_deref(), Some("snaps"));

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("hot -> frozen"));
    }

    #[test]
    fn invalid_config_lists_errors() {
        let report =
            ValidationReport::from_result(Path::new("bad.toml"), Err("boom".to_owned()));
        assert!(!report.valid);
        assert!(report.summary.is_none());

        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["errors"][0], "boom");
        assert!(json.get("summary").is_none());
    }
}
