//! Knowledge store subcommand handlers.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::info;

use sitemind_protocols::{KnowledgeStore, PageModel, PageType, Session, SiteProfile};
use sitemind_runtime::available_operations;

use crate::cli::{Commands, SessionAction};

/// Handle the store inspection subcommands.
pub(crate) async fn handle_store_command(
    command: Commands,
    store: &dyn KnowledgeStore,
) -> anyhow::Result<()> {
    match command {
        Commands::Stats => {
            let stats = store.stats().await?;
            println!("Domains:          {}", stats.domains);
            println!("Saved sessions:   {}", stats.sessions);
            println!("Proven selectors: {}", stats.proven_selectors);
            println!("Cached pages:     {}", stats.cached_pages);
        }
        Commands::Context { domain } => match store.build_context(&domain).await? {
            Some(context) => println!("{}", context),
            None => println!("Nothing known about {}.", domain),
        },
        Commands::Profile { domain } => {
            let profile = store.site_profile(&domain).await?;
            let selectors = store.known_selectors(&domain).await?;
            print!("{}", render_profile(&domain, profile.as_ref(), &selectors));
        }
        Commands::Forget { domain } => {
            let removed = store.invalidate(&domain).await?;
            info!("Invalidated {} cached page(s) for {}", removed, domain);
            println!("Removed {} cached page(s) for {}.", removed, domain);
        }
        Commands::Operations { url } => {
            let model = match url {
                Some(url) => store.get_cached_model(&url).await?.unwrap_or_else(|| {
                    println!("No fresh cached model for {}; showing core operations.", url);
                    PageModel::new(url, PageType::Unknown, "")
                }),
                None => PageModel::new("", PageType::Unknown, ""),
            };
            let operations = available_operations(&model);
            println!("{}", serde_json::to_string_pretty(&operations)?);
        }
        Commands::Sessions { .. } | Commands::Config { .. } => {
            anyhow::bail!("not a knowledge store command")
        }
    }
    Ok(())
}

/// Handle the saved session subcommands.
pub(crate) async fn handle_session_command(
    action: SessionAction,
    store: &dyn KnowledgeStore,
) -> anyhow::Result<()> {
    match action {
        SessionAction::List { format } => {
            let sessions = store.list_sessions().await?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&sessions)?),
                _ if sessions.is_empty() => println!("No saved sessions."),
                _ => print!("{}", render_sessions(&sessions)),
            }
        }
        SessionAction::Delete { id } => {
            if store.delete_session(&id).await? {
                println!("Deleted session {}.", id);
            } else {
                anyhow::bail!("session not found: {}", id);
            }
        }
    }
    Ok(())
}

fn render_profile(
    domain: &str,
    profile: Option<&SiteProfile>,
    selectors: &BTreeMap<String, String>,
) -> String {
    let mut out = String::new();
    let Some(profile) = profile else {
        let _ = writeln!(out, "No profile for {}.", domain);
        return out;
    };

    let page_types: Vec<&str> = profile.page_types.iter().map(PageType::as_str).collect();
    let _ = writeln!(out, "Domain:     {}", profile.domain);
    let _ = writeln!(out, "Visits:     {}", profile.visit_count);
    let _ = writeln!(out, "First seen: {}", profile.first_seen.to_rfc3339());
    let _ = writeln!(out, "Last seen:  {}", profile.last_seen.to_rfc3339());
    let _ = writeln!(out, "Page types: {}", page_types.join(", "));

    if !profile.notes.is_empty() {
        let _ = writeln!(out, "Notes:");
        for note in &profile.notes {
            let _ = writeln!(out, "  - {}", note);
        }
    }
    if !selectors.is_empty() {
        let _ = writeln!(out, "Selectors:");
        for (action, selector) in selectors {
            let _ = writeln!(out, "  {:<24} {}", action, selector);
        }
    }
    out
}

fn render_sessions(sessions: &[Session]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:<26} {:<8} {}", "ID", "LAST ACTIVE", "EVENTS", "AUTH");
    let _ = writeln!(out, "{}", "-".repeat(80));
    for session in sessions {
        let auth = if session.auth_domains.is_empty() {
            "-".to_string()
        } else {
            session.auth_domains.join(", ")
        };
        let _ = writeln!(
            out,
            "{:<24} {:<26} {:<8} {}",
            session.id,
            session.last_active.format("%Y-%m-%d %H:%M:%S UTC"),
            session.history.len(),
            auth
        );
    }
    out
}
