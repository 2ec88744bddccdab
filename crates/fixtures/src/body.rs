//! Request bodies for policies, component templates and index templates.
//!
//! Only the hot phase matures on its own; every later phase carries a
//! `min_age` far enough out that fixtures move solely through explicit phase
//! moves.

use serde_json::{Map, Value, json};
use tierbed_core::backend::{POLICY_SETTING, ROLLOVER_ALIAS_SETTING};
use tierbed_core::config::PolicyConfig;
use tierbed_core::types::Phase;

/// `min_age` for every phase after hot.
pub const PARKED_MIN_AGE: &str = "365d";

/// Priority of fixture index templates, above the built-in ones.
pub const TEMPLATE_PRIORITY: u32 = 500;

/// Phase that receives the forcemerge action.
///
/// Warm when the policy has it, otherwise hot. Cold and frozen mount from a
/// snapshot and never merge.
pub fn forcemerge_phase(phases: &[Phase]) -> Option<Phase> {
    [Phase::Warm, Phase::Hot]
        .into_iter()
        .find(|p| phases.contains(p))
}

/// Lifecycle policy body for the configured phases.
pub fn policy_body(policy: &PolicyConfig) -> Value {
    let merge_in = if policy.forcemerge {
        forcemerge_phase(&policy.phases)
    } else {
        None
    };

    let mut phases = Map::new();
    for &phase in &policy.phases {
        let mut actions = Map::new();
        match phase {
            Phase::Hot => {
                actions.insert(
                    "rollover".to_owned(),
                    json!({ "max_age": "1d", "max_primary_shard_size": "1gb" }),
                );
            }
            Phase::Cold | Phase::Frozen => {
                if let Some(repository) = policy.repository() {
                    actions.insert(
                        "searchable_snapshot".to_owned(),
                        json!({ "snapshot_repository": repository }),
                    );
                }
            }
            Phase::Delete => {
                actions.insert("delete".to_owned(), json!({}));
            }
            Phase::New | Phase::Warm => {}
        }
        if merge_in == Some(phase) {
            actions.insert(
                "forcemerge".to_owned(),
                json!({ "max_num_segments": policy.max_num_segments }),
            );
        }
        let min_age = if phase == Phase::Hot { "0ms" } else { PARKED_MIN_AGE };
        phases.insert(
            phase.to_string(),
            json!({ "min_age": min_age, "actions": actions }),
        );
    }
    json!({ "policy": { "phases": phases } })
}

/// Settings component: shard layout plus the lifecycle wiring.
pub fn settings_component(policy: Option<&str>, rollover_alias: Option<&str>) -> Value {
    let mut settings = Map::new();
    settings.insert("index.number_of_shards".to_owned(), json!(1));
    settings.insert("index.number_of_replicas".to_owned(), json!(0));
    if let Some(policy) = policy {
        settings.insert(POLICY_SETTING.to_owned(), json!(policy));
        if let Some(alias) = rollover_alias {
            settings.insert(ROLLOVER_ALIAS_SETTING.to_owned(), json!(alias));
        }
    }
    json!({ "template": { "settings": settings } })
}

/// Mappings component for generated documents.
pub fn mappings_component() -> Value {
    json!({
        "template": {
            "mappings": {
                "properties": {
                    "@timestamp": { "type": "date" },
                    "message": { "type": "text" },
                    "matched": { "type": "boolean" }
                }
            }
        }
    })
}

pub fn template_body(patterns: &[String], composed_of: &[String], data_stream: bool) -> Value {
    let mut body = json!({
        "index_patterns": patterns,
        "composed_of": composed_of,
        "priority": TEMPLATE_PRIORITY,
    });
    if data_stream && let Some(map) = body.as_object_mut() {
        map.insert("data_stream".to_owned(), json!({}));
    }
    body
}
