//! `tierbed names` command handler
//!
//! Names are deterministic for a given prefix and uniq token, so the full
//! set can be printed without touching a backend.

use std::io::Write;

use serde::Serialize;
use tracing::info;

use tierbed_core::config::{Plan, PlanKind, TierbedConfig};
use tierbed_core::types::EntityKind;
use tierbed_fixtures::Namer;
use tierbed_fixtures::strategy::ComponentStrategy;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

pub fn execute(config: &TierbedConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let report = plan_names(&config.plan);
    info!(uniq = report.uniq.as_str(), "computed fixture names");
    writer.render(&report)?;
    Ok(())
}

/// Names one orchestrated run of `plan` would create.
///
/// An empty uniq token is generated here, so each call on such a plan
/// yields a different set.
pub fn plan_names(plan: &Plan) -> NamesReport {
    let mut plan = plan.clone();
    let generated = plan.uniq.trim().is_empty();
    let uniq = plan.resolve_uniq().to_owned();
    let prefix = plan.prefix.as_str();

    let mut groups = Vec::new();
    let mut push = |kind: EntityKind, count: usize| {
        let namer = Namer::new(prefix, kind, &uniq);
        let names = (1..=count as u32).map(|n| namer.peek(n)).collect();
        groups.push(NameGroup {
            kind,
            names,
            pattern: namer.pattern(),
        });
    };

    push(EntityKind::Policy, usize::from(plan.policy.enabled));
    push(EntityKind::Component, ComponentStrategy::COUNT);
    push(EntityKind::Template, 1);
    push(EntityKind::Snapshot, 0);
    match plan.kind {
        PlanKind::Index => push(EntityKind::Index, plan.entities.len()),
        PlanKind::DataStream => push(EntityKind::DataStream, 1),
    }

    let primary = Namer::new(prefix, plan.kind.entity_kind(), &uniq);
    let rollover_alias = (plan.kind == PlanKind::Index && plan.policy.enabled)
        .then(|| primary.base().to_owned());

    NamesReport {
        uniq,
        generated,
        groups,
        rollover_alias,
    }
}

#[derive(Debug, Serialize)]
pub struct NamesReport {
    pub uniq: String,
    /// The uniq token was empty and generated for this report.
    pub generated: bool,
    pub groups: Vec<NameGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollover_alias: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NameGroup {
    pub kind: EntityKind,
    pub names: Vec<String>,
    pub pattern: String,
}

impl Render for NamesReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let note = if self.generated { " (generated)" } else { "" };
        writeln!(w, "uniq: {}{}", self.uniq.bold(), note.dimmed())?;
        for group in &self.groups {
            writeln!(
                w,
                "{:<12} {}",
                group.kind.as_str().cyan(),
                group.pattern.dimmed()
            )?;
            for name in &group.names {
                writeln!(w, "  {name}")?;
            }
        }
        if let Some(alias) = &self.rollover_alias {
            writeln!(w, "{:<12} {alias}", "alias".cyan())?;
        }
        Ok(())
    }
}
