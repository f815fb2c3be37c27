//! Database schema management.

use std::time::Duration;

use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(SCHEMA)
}

const SCHEMA: &str = r#"
-- Cached page models, keyed by normalized URL pattern
CREATE TABLE IF NOT EXISTS page_cache (
    url_pattern TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    model TEXT NOT NULL,
    hit_count INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Selector outcomes; counters accumulate through upserts
CREATE TABLE IF NOT EXISTS selectors (
    domain TEXT NOT NULL,
    action TEXT NOT NULL,
    selector TEXT NOT NULL,
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    last_used TEXT NOT NULL,
    PRIMARY KEY (domain, action, selector)
);

-- Site profiles
CREATE TABLE IF NOT EXISTS site_profiles (
    domain TEXT PRIMARY KEY,
    visit_count INTEGER NOT NULL DEFAULT 0,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS site_page_types (
    domain TEXT NOT NULL,
    page_type TEXT NOT NULL,
    PRIMARY KEY (domain, page_type)
);

CREATE TABLE IF NOT EXISTS site_notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL,
    note TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (domain, note)
);

-- Saved session snapshots
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    last_active TEXT NOT NULL,
    auth_domains TEXT NOT NULL DEFAULT '[]',
    storage_state TEXT NOT NULL DEFAULT 'null',
    history TEXT NOT NULL DEFAULT '[]'
);

-- Indexes for efficient queries
CREATE INDEX IF NOT EXISTS idx_page_cache_domain ON page_cache(domain);
CREATE INDEX IF NOT EXISTS idx_selectors_domain_action ON selectors(domain, action);
CREATE INDEX IF NOT EXISTS idx_site_notes_domain ON site_notes(domain);
CREATE INDEX IF NOT EXISTS idx_sessions_last_active ON sessions(last_active);
"#;
