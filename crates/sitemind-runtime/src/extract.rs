//! Best-effort key-fact lookup.
//!
//! Matching is approximate: a loose name or word match can return the wrong
//! fact rather than nothing. It exists to answer simple lookups without a
//! second translator round trip.

use std::collections::BTreeMap;

use serde_json::Value;

use sitemind_protocols::PageModel;

/// Resolve each requested key (mapped to its description) against the
/// model's key facts. Unmatched keys map to `Value::Null`.
pub fn extract_by_schema(model: &PageModel, schema: &BTreeMap<String, String>) -> BTreeMap<String, Value> {
    schema
        .iter()
        .map(|(key, description)| {
            let value = lookup(&model.key_data, key, description)
                .cloned()
                .unwrap_or(Value::Null);
            (key.clone(), value)
        })
        .collect()
}

fn lookup<'a>(facts: &'a BTreeMap<String, Value>, key: &str, description: &str) -> Option<&'a Value> {
    let wanted = key.trim().to_lowercase();

    if !wanted.is_empty() {
        let by_name = facts.iter().find(|(name, _)| {
            let name = name.to_lowercase();
            !name.is_empty() && (name.contains(&wanted) || wanted.contains(&name))
        });
        if let Some((_, value)) = by_name {
            return Some(value);
        }
    }

    let words: Vec<String> = description
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3)
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        return None;
    }

    facts
        .iter()
        .find(|(name, _)| {
            let name = name.to_lowercase();
            words.iter().any(|w| name.contains(w.as_str()))
        })
        .map(|(_, value)| value)
}
