use anyhow::{Context, Result, bail};
use schemars::{Schema, schema_for};
use serde_valid::Validate;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use super::models::{Action, Config, Step};

/// Load configuration from a string slice.
pub fn load_from_str(s: &str) -> Result<Config> {
    let cfg: Config =
        serde_json::from_str(s).context("Failed to parse JSON config string into Config")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<Config> {
    let cfg: Config =
        serde_json::from_reader(reader).context("Failed to parse JSON config from reader")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open config file {}", path_ref.display()))?;
    let cfg = load_from_reader(file)?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Load configuration from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<Config> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;
    let cfg: Config = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse JSON config from {}", path_ref.display()))?;
    validate_config(&cfg)?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Generate the JSON Schema for the Config model (for external validation or tooling).
pub fn generate_schema() -> Schema {
    schema_for!(Config)
}

/// Write the JSON Schema for the Config model to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}

/// Normalize word-list content the way the authoring flow does:
/// - trim surrounding whitespace
/// - drop lines starting with `ignore_prefix` (if given and non-empty)
/// - optionally remove duplicate lines, keeping the first occurrence
///
/// Interior empty lines are kept; an empty entry is a legitimate fuzzing value.
pub fn normalize_wordlist_content(
    content: &str,
    ignore_prefix: Option<&str>,
    remove_duplicates: bool,
) -> String {
    let mut lines: Vec<&str> = content.trim().split('\n').collect();

    if let Some(prefix) = ignore_prefix.filter(|p| !p.is_empty()) {
        lines.retain(|l| !l.starts_with(prefix));
    }

    if remove_duplicates {
        let mut seen = BTreeSet::new();
        lines.retain(|l| seen.insert(*l));
    }

    lines.join("\n")
}

/// Perform basic sanity checks and internal reference validation.
/// - Apply the serde_valid constraint annotations on the models.
/// - Ensure word-list names are unique.
/// - Ensure steps reference existing elements and carry usable payloads.
/// - Reject draft (`none`) steps: they exist only in the authoring flow.
pub fn validate_config(cfg: &Config) -> Result<()> {
    cfg.validate()
        .map_err(|e| anyhow::anyhow!("Config constraint validation failed: {e}"))?;

    let mut wordlist_names = BTreeSet::new();
    for wl in &cfg.wordlists {
        if !wordlist_names.insert(wl.name.as_str()) {
            bail!("Duplicate wordlist name '{}'", wl.name);
        }
    }

    let element_ids = cfg
        .elements
        .iter()
        .map(|e| e.id.as_str())
        .collect::<BTreeSet<_>>();

    for action in &cfg.actions {
        validate_action(action, &element_ids)
            .with_context(|| format!("Invalid action '{}'", action.name))?;
    }

    Ok(())
}

fn validate_action(action: &Action, element_ids: &BTreeSet<&str>) -> Result<()> {
    if action.repeat > 0 && action.repeat_interval_ms < 1 {
        bail!("repeat_interval_ms must be at least 1 when repeat > 0");
    }

    for (idx, step) in action.steps.iter().enumerate() {
        validate_step(step, element_ids).with_context(|| format!("Invalid step {idx}"))?;
    }

    Ok(())
}

fn validate_step(step: &Step, element_ids: &BTreeSet<&str>) -> Result<()> {
    match step {
        Step::Delay { amount_ms } => {
            if *amount_ms < 1 {
                bail!("delay amount must be at least 1ms");
            }
        }

        Step::ChangeProperty {
            element,
            property,
            value,
        } => {
            if !element_ids.contains(element.as_str()) {
                bail!("step references unknown element '{element}'");
            }
            if property.name.is_empty() {
                bail!("property name is empty");
            }
            if value.is_empty() {
                bail!("value template is empty");
            }
        }

        Step::DispatchEvent {
            element,
            event,
            properties,
        } => {
            if !element_ids.contains(element.as_str()) {
                bail!("step references unknown element '{element}'");
            }
            if event.is_empty() {
                bail!("event name is empty");
            }
            for p in properties {
                if p.name.is_empty() || p.value.is_empty() {
                    bail!("event property name or value is empty");
                }
            }
        }

        Step::None => bail!("draft step in recorded action"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config(steps_json: &str) -> String {
        format!(
            r#"{{
                "elements": [
                    {{ "id": "e1", "name": "input", "xpath": "id(\"q\")",
                       "properties": [{{ "name": "value", "type": "string" }}] }}
                ],
                "wordlists": [
                    {{ "id": "w1", "name": "colors", "content": "red\nblue" }}
                ],
                "actions": [
                    {{ "id": "a1", "name": "probe", "steps": {steps_json} }}
                ]
            }}"#
        )
    }

    #[test]
    fn loads_valid_config() {
        let json = minimal_config(
            r#"[{ "type": "change_property", "element": "e1",
                  "property": { "name": "value", "type": "string" },
                  "value": "{colors}" }]"#,
        );
        let cfg = load_from_str(&json).unwrap();
        assert_eq!(cfg.actions.len(), 1);
        assert_eq!(cfg.wordlists[0].entries(), vec!["red", "blue"]);
    }

    #[test]
    fn rejects_unknown_element_reference() {
        let json = minimal_config(
            r#"[{ "type": "change_property", "element": "missing",
                  "property": { "name": "value", "type": "string" },
                  "value": "x" }]"#,
        );
        let err = load_from_str(&json).unwrap_err();
        assert!(format!("{err:#}").contains("unknown element"));
    }

    #[test]
    fn rejects_draft_step() {
        let json = minimal_config(r#"[{ "type": "none" }]"#);
        let err = load_from_str(&json).unwrap_err();
        assert!(format!("{err:#}").contains("draft step"));
    }

    #[test]
    fn rejects_zero_delay() {
        let json = minimal_config(r#"[{ "type": "delay", "amount_ms": 0 }]"#);
        assert!(load_from_str(&json).is_err());
    }

    #[test]
    fn rejects_duplicate_wordlist_names() {
        let json = r#"{
            "wordlists": [
                { "id": "w1", "name": "colors", "content": "red" },
                { "id": "w2", "name": "colors", "content": "blue" }
            ]
        }"#;
        let err = load_from_str(json).unwrap_err();
        assert!(format!("{err:#}").contains("Duplicate wordlist name"));
    }

    #[test]
    fn rejects_repeat_without_interval() {
        let json = r#"{
            "actions": [
                { "id": "a1", "name": "probe", "repeat": 3 }
            ]
        }"#;
        let err = load_from_str(json).unwrap_err();
        assert!(format!("{err:#}").contains("repeat_interval_ms"));
    }

    #[test]
    fn normalize_strips_prefix_and_duplicates() {
        let content = "# comment\nred\nblue\nred\n";
        let out = normalize_wordlist_content(content, Some("#"), true);
        assert_eq!(out, "red\nblue");
    }

    #[test]
    fn normalize_keeps_interior_empty_lines() {
        let out = normalize_wordlist_content("a\n\nb", None, false);
        assert_eq!(out, "a\n\nb");
    }
}
