//! State-change computation between two page snapshots.

use serde::{Deserialize, Serialize};

use sitemind_protocols::{PageModel, PageType};

/// What an action did to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub navigated: bool,
    /// Destination URL when navigation occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_url: Option<String>,
    pub page_type_changed: bool,
    pub from_type: PageType,
    pub to_type: PageType,
    /// Left a login page.
    pub auth_changed: bool,
    /// The page had forms and navigation followed.
    pub form_submitted: bool,
    pub summary: String,
}

impl StateChange {
    pub fn compute(before: &PageModel, after: &PageModel, before_url: &str, after_url: &str) -> Self {
        let navigated = before_url != after_url;
        let page_type_changed = before.page_type != after.page_type;
        let auth_changed = before.page_type == PageType::Login && after.page_type != PageType::Login;
        let form_submitted = !before.forms.is_empty() && navigated;

        let mut summary = if navigated {
            format!("Navigated to {} ({} page)", after_url, after.page_type)
        } else if page_type_changed {
            format!("Page changed from {} to {}", before.page_type, after.page_type)
        } else {
            format!("Action completed on {} page", after.page_type)
        };
        if auth_changed {
            summary.push_str("; authentication state changed");
        }

        Self {
            navigated,
            new_url: navigated.then(|| after_url.to_string()),
            page_type_changed,
            from_type: before.page_type,
            to_type: after.page_type,
            auth_changed,
            form_submitted,
            summary,
        }
    }
}
