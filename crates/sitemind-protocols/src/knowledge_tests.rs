use super::*;

fn record(action: &str, selector: &str, success: u32, failure: u32) -> SelectorRecord {
    SelectorRecord {
        domain: "example.com".to_string(),
        action: action.to_string(),
        selector: selector.to_string(),
        success_count: success,
        failure_count: failure,
        last_used: Utc::now(),
    }
}

#[test]
fn test_confidence() {
    assert_eq!(record("a", "#a", 0, 0).confidence(), 0.0);
    assert_eq!(record("a", "#a", 3, 1).confidence(), 0.75);
}

#[test]
fn test_single_success_is_not_proven() {
    let r = record("a", "#a", 1, 0);
    assert_eq!(r.confidence(), 1.0);
    assert!(!r.is_proven());
    assert!(pick_best([&r]).is_none());
}

#[test]
fn test_pick_best_prefers_ratio_then_attempts() {
    let records = vec![
        record("a", "#low", 2, 2),
        record("a", "#high", 3, 0),
        record("a", "#high-more", 6, 0),
    ];
    assert_eq!(pick_best(&records).unwrap().selector, "#high-more");
}

#[test]
fn test_pick_best_rejects_unreliable_winner() {
    let records = vec![record("a", "#flaky", 1, 2), record("a", "#worse", 0, 5)];
    assert!(pick_best(&records).is_none());
}

#[test]
fn test_pick_best_accepts_exact_threshold() {
    let records = vec![record("a", "#half", 1, 1)];
    assert_eq!(pick_best(&records).unwrap().selector, "#half");
}

#[test]
fn test_best_per_action() {
    let records = vec![
        record("login", "#login", 4, 0),
        record("login", "#old-login", 1, 3),
        record("login.email", "#email", 2, 0),
        record("search", "#q", 0, 2),
    ];
    let best = best_per_action(&records);
    assert_eq!(best.len(), 2);
    assert_eq!(best["login"].selector, "#login");
    assert_eq!(best["login.email"].selector, "#email");
    assert!(!best.contains_key("search"));
}

#[test]
fn test_compose_context_nothing_known() {
    assert!(compose_context("example.com", None, &BTreeMap::new()).is_none());
}

#[test]
fn test_compose_context_empty_profile_is_known() {
    let now = Utc::now();
    let profile = SiteProfile {
        domain: "example.com".to_string(),
        visit_count: 1,
        first_seen: now,
        last_seen: now,
        page_types: Vec::new(),
        notes: Vec::new(),
    };
    let context = compose_context("example.com", Some(&profile), &BTreeMap::new()).unwrap();
    assert!(context.contains("Visited 1 time(s)"));
}

#[test]
fn test_compose_context_full() {
    let now = Utc::now();
    let profile = SiteProfile {
        domain: "example.com".to_string(),
        visit_count: 3,
        first_seen: now,
        last_seen: now,
        page_types: vec![PageType::Login, PageType::Dashboard],
        notes: vec!["action 'authenticate' on login page leads to dashboard page".to_string()],
    };
    let records = vec![record("authenticate", "#submit", 3, 1)];
    let selectors = best_per_action(&records);

    let context = compose_context("example.com", Some(&profile), &selectors).unwrap();
    assert!(context.starts_with("Site knowledge for example.com:"));
    assert!(context.contains("Known page types: login, dashboard"));
    assert!(context.contains("leads to dashboard"));
    assert!(context.contains("authenticate: #submit (75% over 4 attempts)"));
}

#[test]
fn test_stats_default() {
    let stats = StoreStats::default();
    assert_eq!(stats.domains, 0);
    assert_eq!(stats.cached_pages, 0);
}
