//! Synchronous row operations, run on the connection thread.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use sitemind_protocols::knowledge::{MAX_PROFILE_NOTES, MIN_SELECTOR_ATTEMPTS};
use sitemind_protocols::{PageType, SelectorRecord, SiteProfile, StoreStats};

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub(super) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Unparseable timestamps read as the epoch, which makes cache rows stale.
pub(super) fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

// ---- page cache ----

/// Fresh model JSON for a pattern. Counts the hit; purges the row if stale.
pub(super) fn cache_lookup(
    conn: &Connection,
    pattern: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> rusqlite::Result<Option<String>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT model, updated_at FROM page_cache WHERE url_pattern = ?1",
            [pattern],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((model, updated_at)) = row else {
        return Ok(None);
    };

    if now.signed_duration_since(parse_ts(&updated_at)) >= ttl {
        conn.execute("DELETE FROM page_cache WHERE url_pattern = ?1", [pattern])?;
        return Ok(None);
    }

    conn.execute(
        "UPDATE page_cache SET hit_count = hit_count + 1 WHERE url_pattern = ?1",
        [pattern],
    )?;
    Ok(Some(model))
}

pub(super) fn cache_upsert(
    conn: &Connection,
    pattern: &str,
    domain: &str,
    model: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO page_cache (url_pattern, domain, model, hit_count, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4)
         ON CONFLICT(url_pattern) DO UPDATE SET
             domain = excluded.domain,
             model = excluded.model,
             updated_at = excluded.updated_at",
        params![pattern, domain, model, fmt_ts(now)],
    )?;
    Ok(())
}

pub(super) fn cache_remove(conn: &Connection, pattern: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM page_cache WHERE url_pattern = ?1", [pattern])
}

pub(super) fn cache_invalidate(conn: &Connection, domain: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM page_cache WHERE domain = ?1", [domain])
}

// ---- selectors ----

/// Single-statement upsert so concurrent writers never lose an increment.
pub(super) fn selector_upsert(
    conn: &Connection,
    domain: &str,
    action: &str,
    selector: &str,
    success: bool,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let (ok, failed) = if success { (1, 0) } else { (0, 1) };
    conn.execute(
        "INSERT INTO selectors (domain, action, selector, success_count, failure_count, last_used)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(domain, action, selector) DO UPDATE SET
             success_count = success_count + excluded.success_count,
             failure_count = failure_count + excluded.failure_count,
             last_used = excluded.last_used",
        params![domain, action, selector, ok, failed, fmt_ts(now)],
    )?;
    Ok(())
}

fn selector_from_row(row: &Row<'_>) -> rusqlite::Result<SelectorRecord> {
    let last_used: String = row.get(5)?;
    Ok(SelectorRecord {
        domain: row.get(0)?,
        action: row.get(1)?,
        selector: row.get(2)?,
        success_count: row.get(3)?,
        failure_count: row.get(4)?,
        last_used: parse_ts(&last_used),
    })
}

/// Proven selector records for a domain, optionally narrowed to one action.
pub(super) fn proven_selectors(
    conn: &Connection,
    domain: &str,
    action: Option<&str>,
) -> rusqlite::Result<Vec<SelectorRecord>> {
    let base = "SELECT domain, action, selector, success_count, failure_count, last_used
                FROM selectors
                WHERE domain = ?1 AND success_count + failure_count >= ?2";

    match action {
        Some(action) => {
            let mut stmt = conn.prepare(&format!("{} AND action = ?3", base))?;
            let records = stmt
                .query_map(params![domain, MIN_SELECTOR_ATTEMPTS, action], selector_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            records
        }
        None => {
            let mut stmt = conn.prepare(&format!("{} ORDER BY action", base))?;
            let records = stmt
                .query_map(params![domain, MIN_SELECTOR_ATTEMPTS], selector_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            records
        }
    }
}

// ---- site profiles ----

fn profile_ensure(conn: &Connection, domain: &str, now: DateTime<Utc>, visits: i64) -> rusqlite::Result<()> {
    let now = fmt_ts(now);
    conn.execute(
        "INSERT INTO site_profiles (domain, visit_count, first_seen, last_seen)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(domain) DO UPDATE SET
             visit_count = visit_count + excluded.visit_count,
             last_seen = excluded.last_seen",
        params![domain, visits, now],
    )?;
    Ok(())
}

pub(super) fn profile_visit(conn: &Connection, domain: &str, now: DateTime<Utc>) -> rusqlite::Result<()> {
    profile_ensure(conn, domain, now, 1)
}

/// Add a page type and a note, evicting the oldest notes past the cap.
pub(super) fn profile_update(
    conn: &mut Connection,
    domain: &str,
    page_type: PageType,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    profile_ensure(&tx, domain, now, 0)?;

    tx.execute(
        "INSERT OR IGNORE INTO site_page_types (domain, page_type) VALUES (?1, ?2)",
        params![domain, page_type.as_str()],
    )?;

    if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
        tx.execute(
            "INSERT OR IGNORE INTO site_notes (domain, note, created_at) VALUES (?1, ?2, ?3)",
            params![domain, note, fmt_ts(now)],
        )?;
        tx.execute(
            "DELETE FROM site_notes
             WHERE domain = ?1 AND id NOT IN (
                 SELECT id FROM site_notes WHERE domain = ?1 ORDER BY id DESC LIMIT ?2
             )",
            params![domain, MAX_PROFILE_NOTES as i64],
        )?;
    }

    tx.commit()
}

pub(super) fn profile_load(conn: &Connection, domain: &str) -> rusqlite::Result<Option<SiteProfile>> {
    let head: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT visit_count, first_seen, last_seen FROM site_profiles WHERE domain = ?1",
            [domain],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((visit_count, first_seen, last_seen)) = head else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT page_type FROM site_page_types WHERE domain = ?1 ORDER BY rowid")?;
    let page_types = stmt
        .query_map([domain], |row| row.get::<_, String>(0))?
        .map(|r| r.map(PageType::from))
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare("SELECT note FROM site_notes WHERE domain = ?1 ORDER BY id")?;
    let notes = stmt
        .query_map([domain], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(SiteProfile {
        domain: domain.to_string(),
        visit_count: visit_count.max(0) as u64,
        first_seen: parse_ts(&first_seen),
        last_seen: parse_ts(&last_seen),
        page_types,
        notes,
    }))
}

// ---- sessions ----

/// Session row with JSON columns still encoded.
#[derive(Debug, Clone)]
pub(super) struct SessionRow {
    pub id: String,
    pub created_at: String,
    pub last_active: String,
    pub auth_domains: String,
    pub storage_state: String,
    pub history: String,
}

const SESSION_COLUMNS: &str = "id, created_at, last_active, auth_domains, storage_state, history";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        last_active: row.get(2)?,
        auth_domains: row.get(3)?,
        storage_state: row.get(4)?,
        history: row.get(5)?,
    })
}

pub(super) fn session_upsert(conn: &Connection, row: &SessionRow) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, created_at, last_active, auth_domains, storage_state, history)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             created_at = excluded.created_at,
             last_active = excluded.last_active,
             auth_domains = excluded.auth_domains,
             storage_state = excluded.storage_state,
             history = excluded.history",
        params![
            row.id,
            row.created_at,
            row.last_active,
            row.auth_domains,
            row.storage_state,
            row.history
        ],
    )?;
    Ok(())
}

pub(super) fn session_load(conn: &Connection, id: &str) -> rusqlite::Result<Option<SessionRow>> {
    conn.query_row(
        &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
        [id],
        session_from_row,
    )
    .optional()
}

pub(super) fn session_list(conn: &Connection) -> rusqlite::Result<Vec<SessionRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM sessions ORDER BY last_active DESC",
        SESSION_COLUMNS
    ))?;
    let rows = stmt
        .query_map([], session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>();
    rows
}

pub(super) fn session_delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM sessions WHERE id = ?1", [id])? > 0)
}

// ---- stats ----

pub(super) fn stats(conn: &Connection) -> rusqlite::Result<StoreStats> {
    let count = |sql: &str| -> rusqlite::Result<u64> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n.max(0) as u64)
    };

    Ok(StoreStats {
        domains: count("SELECT COUNT(*) FROM site_profiles")?,
        sessions: count("SELECT COUNT(*) FROM sessions")?,
        proven_selectors: conn
            .query_row(
                "SELECT COUNT(*) FROM selectors WHERE success_count + failure_count >= ?1",
                [MIN_SELECTOR_ATTEMPTS],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n.max(0) as u64)?,
        cached_pages: count("SELECT COUNT(*) FROM page_cache")?,
    })
}
