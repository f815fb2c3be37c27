//! Page model definitions.
//!
//! A [`PageModel`] is a point-in-time semantic snapshot of a page produced by a
//! [`Translator`](crate::Translator). Models are never mutated once adopted;
//! a newer snapshot supersedes them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum number of key facts a model may carry.
pub const MAX_KEY_DATA: usize = 10;

/// Name of the generic action offered by degraded models.
pub const FALLBACK_ACTION: &str = "extract_content";

/// Page classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PageType {
    Login,
    Signup,
    Dashboard,
    Search,
    Product,
    Checkout,
    Cart,
    Form,
    Article,
    Listing,
    Profile,
    Settings,
    Error,
    Captcha,
    #[default]
    Unknown,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Dashboard => "dashboard",
            Self::Search => "search",
            Self::Product => "product",
            Self::Checkout => "checkout",
            Self::Cart => "cart",
            Self::Form => "form",
            Self::Article => "article",
            Self::Listing => "listing",
            Self::Profile => "profile",
            Self::Settings => "settings",
            Self::Error => "error",
            Self::Captcha => "captcha",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = std::convert::Infallible;

    /// Unrecognized classifications map to [`PageType::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let page_type = match s.trim().to_ascii_lowercase().as_str() {
            "login" => Self::Login,
            "signup" => Self::Signup,
            "dashboard" => Self::Dashboard,
            "search" => Self::Search,
            "product" => Self::Product,
            "checkout" => Self::Checkout,
            "cart" => Self::Cart,
            "form" => Self::Form,
            "article" => Self::Article,
            "listing" => Self::Listing,
            "profile" => Self::Profile,
            "settings" => Self::Settings,
            "error" => Self::Error,
            "captcha" => Self::Captcha,
            _ => Self::Unknown,
        };
        Ok(page_type)
    }
}

impl From<String> for PageType {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Primitive type of an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ParamType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

impl From<String> for ParamType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" | "float" => Self::Number,
            "integer" | "int" => Self::Integer,
            "boolean" | "bool" => Self::Boolean,
            _ => Self::String,
        }
    }
}

/// A typed parameter of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParam {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
}

/// Low-level instructions for performing an action.
///
/// Supplied by the translator and consumed only inside the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionHint {
    /// Click a single element.
    Click { selector: String },

    /// Fill parameter values into mapped fields, then optionally submit.
    #[serde(alias = "form")]
    Fill {
        /// Parameter name -> field selector.
        #[serde(default)]
        fields: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        submit: Option<String>,
    },

    /// Go somewhere: `target` is an absolute URL or a link selector.
    Navigate {
        #[serde(alias = "selector", alias = "url")]
        target: String,
    },

    /// A hint kind this version does not understand.
    #[serde(other)]
    Unknown,
}

/// A named operation offered by a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "parameters")]
    pub params: Vec<ActionParam>,
    #[serde(default)]
    pub returns: String,
    /// Serialized so cached models keep it; stripped from [`PageView`].
    #[serde(default, alias = "execution", skip_serializing_if = "Option::is_none")]
    pub hint: Option<ExecutionHint>,
}

impl ActionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            returns: String::new(),
            hint: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, param_type: ParamType, required: bool) -> Self {
        self.params.push(ActionParam {
            name: name.into(),
            param_type,
            required,
        });
        self
    }

    pub fn with_returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = returns.into();
        self
    }

    pub fn with_hint(mut self, hint: ExecutionHint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// The action as callers may see it.
    pub fn without_hint(&self) -> Self {
        Self {
            hint: None,
            ..self.clone()
        }
    }
}

/// A field inside a form descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

fn default_field_type() -> String {
    "text".to_string()
}

impl FormField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            field_type: default_field_type(),
            required: false,
            selector: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Case-insensitive match against the field name or its label.
    pub fn matches(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key)
            || self
                .label
                .as_deref()
                .is_some_and(|label| label.eq_ignore_ascii_case(key))
    }
}

/// A form found on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_selector: Option<String>,
}

impl FormDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            submit_selector: None,
        }
    }

    pub fn with_field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.matches(key))
    }
}

/// A navigation link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    #[serde(default)]
    pub text: String,
    pub url: String,
}

/// Semantic snapshot of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageModel {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub page_type: PageType,
    #[serde(default, alias = "summary")]
    pub status: String,
    /// Key facts, kept in key order. The translator's own ordering is not
    /// preserved.
    #[serde(default)]
    pub key_data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub navigation: Vec<NavLink>,
    #[serde(default)]
    pub forms: Vec<FormDescriptor>,
}

impl PageModel {
    pub fn new(url: impl Into<String>, page_type: PageType, status: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page_type,
            status: status.into(),
            key_data: BTreeMap::new(),
            actions: Vec::new(),
            warnings: Vec::new(),
            navigation: Vec::new(),
            forms: Vec::new(),
        }
    }

    /// Minimal model used when translation fails: one generic extraction
    /// action and a warning flagging the degraded analysis.
    pub fn fallback(url: impl Into<String>, reason: &str) -> Self {
        let mut model = Self::new(url, PageType::Unknown, "Page analysis degraded");
        model.actions.push(
            ActionDefinition::new(FALLBACK_ACTION, "Extract the visible text content of the page")
                .with_returns("Page text"),
        );
        model
            .warnings
            .push(format!("Page analysis degraded: {}", reason));
        model
    }

    /// Fixed model for an anti-bot challenge page. Offers no actions.
    pub fn captcha(url: impl Into<String>) -> Self {
        let mut model = Self::new(url, PageType::Captcha, "Blocked by a CAPTCHA or bot challenge");
        model.warnings.push(
            "CAPTCHA or anti-bot challenge detected; automated interaction stopped".to_string(),
        );
        model
    }

    pub fn with_action(mut self, action: ActionDefinition) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_form(mut self, form: FormDescriptor) -> Self {
        self.forms.push(form);
        self
    }

    pub fn with_key_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.key_data.insert(key.into(), value.into());
        self
    }

    /// Enforce ingestion bounds: at most [`MAX_KEY_DATA`] key facts and no
    /// unnamed actions.
    ///
    /// The facts kept are the first [`MAX_KEY_DATA`] in key order, so the
    /// result does not depend on the order the translator emitted them.
    pub fn sanitize(mut self) -> Self {
        if self.key_data.len() > MAX_KEY_DATA {
            if let Some(cut) = self.key_data.keys().nth(MAX_KEY_DATA).cloned() {
                let _ = self.key_data.split_off(&cut);
            }
        }
        self.actions.retain(|a| !a.name.trim().is_empty());
        self
    }

    /// Look up an action by exact name, then case-insensitively.
    pub fn action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions
            .iter()
            .find(|a| a.name == name)
            .or_else(|| self.actions.iter().find(|a| a.name.eq_ignore_ascii_case(name)))
    }

    pub fn action_names(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.name.clone()).collect()
    }

    /// Look up a form by case-insensitive name.
    pub fn form(&self, name: &str) -> Option<&FormDescriptor> {
        self.forms.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn form_names(&self) -> Vec<String> {
        self.forms.iter().map(|f| f.name.clone()).collect()
    }

    pub fn is_degraded(&self) -> bool {
        self.page_type == PageType::Unknown
            && self.actions.len() == 1
            && self.actions[0].name == FALLBACK_ACTION
    }

    /// Caller-facing view: execution hints and element selectors removed.
    pub fn view(&self) -> PageView {
        PageView {
            url: self.url.clone(),
            page_type: self.page_type,
            status: self.status.clone(),
            key_data: self.key_data.clone(),
            actions: self.actions.iter().map(ActionDefinition::without_hint).collect(),
            warnings: self.warnings.clone(),
            navigation: self.navigation.clone(),
            forms: self
                .forms
                .iter()
                .map(|form| FormDescriptor {
                    name: form.name.clone(),
                    fields: form
                        .fields
                        .iter()
                        .map(|f| FormField {
                            selector: None,
                            ..f.clone()
                        })
                        .collect(),
                    submit_selector: None,
                })
                .collect(),
        }
    }
}

/// What callers see of a [`PageModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub url: String,
    pub page_type: PageType,
    pub status: String,
    pub key_data: BTreeMap<String, serde_json::Value>,
    pub actions: Vec<ActionDefinition>,
    pub warnings: Vec<String>,
    pub navigation: Vec<NavLink>,
    pub forms: Vec<FormDescriptor>,
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
