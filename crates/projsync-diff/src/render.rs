//! Human-readable rendering of composite structures
//!
//! Orchestrations, transformations and shared code are not diffed
//! structurally. Each is rendered to a stable text summary and the two
//! summaries are compared line by line, which keeps the diff readable for
//! large scripts and deeply nested phases.

use projsync_model::{
    JsonMap, Orchestration, Script, SharedCodeConfig, SharedCodeRow, Transformation,
};

pub fn render_orchestration(orchestration: &Orchestration) -> String {
    let mut out = Vec::new();
    for (i, phase) in orchestration.phases.iter().enumerate() {
        out.push(format!("#  {:03}-{}", i + 1, phase.name));
        out.push(format!("depends on phases: [{}]", phase.depends_on.join(", ")));
        push_json(&mut out, &phase.content);
        for (j, task) in phase.tasks.iter().enumerate() {
            out.push(format!("## {:03}-{}", j + 1, task.name));
            let target = match &task.config_id {
                Some(config_id) => format!("{}/{}", task.component_id, config_id),
                None => task.component_id.to_string(),
            };
            let disabled = if task.enabled { "" } else { " (disabled)" };
            out.push(format!(">> {target}{disabled}"));
            push_json(&mut out, &task.content);
        }
    }
    out.join("\n")
}

pub fn render_transformation(transformation: &Transformation) -> String {
    let mut out = Vec::new();
    for block in &transformation.blocks {
        out.push(format!("# {}", block.name));
        for code in &block.codes {
            out.push(format!("## {}", code.name));
            push_scripts(&mut out, &code.scripts);
        }
    }
    out.join("\n")
}

pub fn render_shared_code_config(shared_code: &SharedCodeConfig) -> String {
    format!("target component: {}", shared_code.target_component_id)
}

pub fn render_shared_code_row(shared_code: &SharedCodeRow) -> String {
    let mut out = vec![format!(
        "target component: {}",
        shared_code.target_component_id
    )];
    push_scripts(&mut out, &shared_code.scripts);
    out.join("\n")
}

fn push_scripts(out: &mut Vec<String>, scripts: &[Script]) {
    for script in scripts {
        out.extend(script.to_string().lines().map(str::to_string));
    }
}

fn push_json(out: &mut Vec<String>, content: &JsonMap) {
    if content.is_empty() {
        return;
    }
    let sorted = sorted_json(&serde_json::Value::Object(content.clone()));
    match serde_json::to_string_pretty(&sorted) {
        Ok(text) => out.extend(text.lines().map(str::to_string)),
        Err(_) => out.push(sorted.to_string()),
    }
}

/// Copy of a value with object keys sorted, so rendering is order-insensitive
fn sorted_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted_json(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sorted_json).collect())
        }
        other => other.clone(),
    }
}
