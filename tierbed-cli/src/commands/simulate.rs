//! `tierbed simulate` command handler
//!
//! Runs the configured plan against a fresh [`MemoryBackend`]: setup, print
//! what is tracked, then teardown unless `--keep` was given.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use tierbed_core::backend::memory::MemoryBackend;
use tierbed_core::config::{TierbedConfig, WaitConfig};
use tierbed_core::types::EntityKind;
use tierbed_fixtures::{Orchestrator, TeardownReport};
use tierbed_lifecycle::Waiter;

use crate::cli::SimulateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Poll interval against the in-memory backend, whose clock moves per call.
pub const SIMULATED_INTERVAL: Duration = Duration::from_millis(10);

pub async fn execute(
    args: SimulateArgs,
    config: &TierbedConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = simulate(config, args.keep).await?;
    writer.render(&report)?;

    if !report.leftovers.is_empty() && !report.kept {
        return Err(CliError::Leaked(format!(
            "{} entities left behind",
            report.leftovers.len()
        )));
    }
    Ok(())
}

/// Runs one setup (and teardown unless `keep`) against a new backend.
///
/// # Errors
///
/// `CliError::Config` for a contradictory plan, `CliError::Setup` when setup
/// fails. A failed setup is torn down before returning.
pub async fn simulate(config: &TierbedConfig, keep: bool) -> Result<SimulationReport, CliError> {
    let mut backend = MemoryBackend::new();
    if let Some(repository) = config.plan.policy.repository() {
        backend = backend.with_repository(repository);
    }
    let backend = Arc::new(backend);

    let mut orchestrator =
        Orchestrator::build(backend.clone(), &config.plan, simulated_waiter(&config.wait))?;
    info!(uniq = orchestrator.uniq(), "simulating fixture setup");

    if let Err(err) = orchestrator.setup().await {
        warn!(error = %err, "setup failed, tearing down");
        if !orchestrator.teardown().await {
            warn!(leftovers = backend.leftovers().len(), "teardown after failed setup leaked");
        }
        return Err(err.into());
    }

    let tracked = orchestrator
        .tracked()
        .await
        .into_iter()
        .map(|(kind, name)| Entry { kind, name })
        .collect();

    let teardown = if keep {
        None
    } else {
        let reports = orchestrator.teardown_reports().await;
        for report in reports.iter().filter(|r| !r.is_clean()) {
            warn!(
                kind = report.kind.as_str(),
                failed = report.failed.len(),
                "fixtures leaked; manual cleanup needed"
            );
        }
        Some(reports.iter().map(TeardownSummary::from).collect())
    };

    let leftovers = backend
        .leftovers()
        .into_iter()
        .map(|(kind, name)| Entry { kind, name })
        .collect();

    Ok(SimulationReport {
        uniq: orchestrator.uniq().to_owned(),
        tracked,
        kept: keep,
        teardown,
        leftovers,
    })
}

fn simulated_waiter(config: &WaitConfig) -> Waiter {
    let waiter = Waiter::new(SIMULATED_INTERVAL, config.max_iterations);
    match config.timeout() {
        Some(timeout) => waiter.with_timeout(timeout),
        None => waiter,
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub uniq: String,
    /// Tracked entities after setup, in setup order.
    pub tracked: Vec<Entry>,
    pub kept: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown: Option<Vec<TeardownSummary>>,
    /// Entities still on the backend at the end of the run.
    pub leftovers: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub kind: EntityKind,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TeardownSummary {
    pub kind: EntityKind,
    pub deleted: usize,
    pub failed: Vec<String>,
    pub setup_incomplete: bool,
}

impl From<&TeardownReport> for TeardownSummary {
    fn from(report: &TeardownReport) -> Self {
        Self {
            kind: report.kind,
            deleted: report.deleted.len(),
            failed: report
                .failed
                .iter()
                .map(|(name, reason)| format!("{name}: {reason}"))
                .collect(),
            setup_incomplete: report.setup_incomplete,
        }
    }
}

impl Render for SimulationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "uniq: {}", self.uniq.bold())?;
        let mut current = None;
        for entry in &self.tracked {
            if current != Some(entry.kind) {
                writeln!(w, "{}", entry.kind.as_str().cyan().bold())?;
                current = Some(entry.kind);
            }
            writeln!(w, "  {}", entry.name)?;
        }

        match &self.teardown {
            None => writeln!(w, "{}", "teardown skipped (--keep)".yellow())?,
            Some(summaries) => {
                for summary in summaries {
                    let status = if summary.failed.is_empty() && !summary.setup_incomplete {
                        "ok".green()
                    } else {
                        "leaked".red()
                    };
                    writeln!(
                        w,
                        "teardown {:<12} {} ({} deleted)",
                        summary.kind.as_str(),
                        status,
                        summary.deleted
                    )?;
                    for failure in &summary.failed {
                        writeln!(w, "  - {failure}")?;
                    }
                }
            }
        }

        if !self.leftovers.is_empty() {
            writeln!(w, "{}", "left on backend:".bold())?;
            for entry in &self.leftovers {
                writeln!(w, "  {} {}", entry.kind.as_str(), entry.name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: &str, tiers: &[&str]) -> TierbedConfig {
        let mut toml = format!(
            r#"
[plan]
prefix = "sim"
uniq = "u1"
kind = "{kind}"

[plan.policy]
phases = ["hot", "warm", "cold", "frozen", "delete"]
repository = "repo"
"#
        );
        for tier in tiers {
            toml.push_str(&format!("\n[[plan.entities]]\ndoc_count = 3\ntarget_tier = \"{tier}\"\n"));
        }
        TierbedConfig::parse(&toml).expect("should parse")
    }

    #[tokio::test(start_paused = true)]
    async fn simulation_sets_up_and_cleans_up() {
        let report = simulate(&config("index", &["frozen", "hot"]), false)
            .await
            .expect("simulation should succeed");

        assert_eq!(report.uniq, "u1");
        assert!(
            report
                .tracked
                .iter()
                .any(|e| e.kind == EntityKind::Index && e.name == "partial-sim-idx-u1-000001")
        );
        assert!(report.tracked.iter().any(|e| e.kind == EntityKind::Snapshot));
        let teardown = report.teardown.as_ref().expect("teardown ran");
        assert!(teardown.iter().all(|s| s.failed.is_empty()));
        assert!(report.leftovers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn keep_leaves_fixtures_in_place() {
        let report = simulate(&config("data_stream", &["cold", "hot"]), true)
            .await
            .expect("simulation should succeed");

        assert!(report.kept);
        assert!(report.teardown.is_none());
        assert!(
            report
                .leftovers
                .iter()
                .any(|e| e.kind == EntityKind::DataStream && e.name == "sim-ds-u1-000001")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn contradictory_plan_is_a_config_error() {
        let mut config = config("index", &["frozen"]);
        config.plan.policy.repository = String::new();

        let err = simulate(&config, false).await.expect_err("repository is required");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn render_groups_by_kind() {
        let report = SimulationReport {
            uniq: "u1".to_owned(),
            tracked: vec![
                Entry {
                    kind: EntityKind::Component,
                    name: "c1".to_owned(),
                },
                Entry {
                    kind: EntityKind::Component,
                    name: "c2".to_owned(),
                },
            ],
            kept: true,
            teardown: None,
            leftovers: Vec::new(),
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let text = String::from_utf8(buffer).expect("utf8");

        assert_eq!(text.matches("component").count(), 1);
        assert!(text.contains("  c1") && text.contains("  c2"));
        assert!(text.contains("--keep"));
    }
}
