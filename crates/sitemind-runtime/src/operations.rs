//! Capability projection: the operations callable on the current page.
//!
//! The list is derived from the page model on every request, so it changes
//! as the page changes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use sitemind_protocols::{ActionDefinition, PageModel};

/// One callable operation with a JSON-schema parameter description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl OperationDescriptor {
    fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    fn from_action(action: &ActionDefinition) -> Self {
        let properties: serde_json::Map<String, Value> = action
            .params
            .iter()
            .map(|p| (p.name.clone(), json!({ "type": p.param_type.as_str() })))
            .collect();
        let required: Vec<&str> = action
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        let description = if action.returns.is_empty() {
            action.description.clone()
        } else {
            format!("{} Returns: {}", action.description, action.returns)
        };

        Self {
            name: action.name.clone(),
            description,
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

fn core_operations() -> Vec<OperationDescriptor> {
    let no_params = json!({ "type": "object", "properties": {} });
    vec![
        OperationDescriptor::new(
            "navigate",
            "Open a URL in the session and return the page model.",
            json!({
                "type": "object",
                "properties": { "url": { "type": "string" } },
                "required": ["url"],
            }),
        ),
        OperationDescriptor::new(
            "get_page_state",
            "Return the current page model.",
            no_params.clone(),
        ),
        OperationDescriptor::new(
            "fill_form",
            "Fill fields of a named form. Unresolved fields are reported, not fatal.",
            json!({
                "type": "object",
                "properties": {
                    "form_name": { "type": "string" },
                    "fields": { "type": "object", "additionalProperties": { "type": "string" } },
                },
                "required": ["form_name", "fields"],
            }),
        ),
        OperationDescriptor::new(
            "extract",
            "Look up key facts on the current page by name and description.",
            json!({
                "type": "object",
                "properties": {
                    "schema": { "type": "object", "additionalProperties": { "type": "string" } },
                },
                "required": ["schema"],
            }),
        ),
        OperationDescriptor::new(
            "run_parallel",
            "Visit several URLs concurrently in isolated sessions.",
            json!({
                "type": "object",
                "properties": {
                    "tasks": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "url": { "type": "string" },
                                "schema": { "type": "object" },
                            },
                            "required": ["url"],
                        },
                    },
                },
                "required": ["tasks"],
            }),
        ),
        OperationDescriptor::new(
            "knowledge_stats",
            "Counts of known domains, sessions, proven selectors and cached pages.",
            no_params,
        ),
    ]
}

/// Core operations followed by one operation per page action.
///
/// Page actions whose names collide with a core operation are left out.
pub fn available_operations(model: &PageModel) -> Vec<OperationDescriptor> {
    let mut operations = core_operations();
    for action in &model.actions {
        if operations.iter().any(|op| op.name == action.name) {
            continue;
        }
        operations.push(OperationDescriptor::from_action(action));
    }
    operations
}
