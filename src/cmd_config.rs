//! Configuration subcommand handlers.

use std::path::Path;

use sitemind_config::{Config, ConfigValidator, ValidationResult};

use crate::cli::ConfigAction;

pub(crate) fn handle_config_command(
    action: ConfigAction,
    path: &Path,
    config: &Config,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Check => {
            let result = ConfigValidator::validate(config);
            print!("{}", render_report(path, &result));
            if let Some(e) = result.into_error() {
                return Err(e.into());
            }
        }
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}

fn render_report(path: &Path, result: &ValidationResult) -> String {
    let mut out = format!("Configuration: {}\n", path.display());
    for error in &result.errors {
        out.push_str(&format!("  error:   {}: {}\n", error.path, error.message));
    }
    for warning in &result.warnings {
        out.push_str(&format!("  warning: {}: {}\n", warning.path, warning.message));
    }
    if result.is_valid() {
        out.push_str("  ok\n");
    }
    out
}
