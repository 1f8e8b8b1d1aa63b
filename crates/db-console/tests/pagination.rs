use db_console::console::{interrupt::CancelFlag, pager::run_statement, state::SessionState};
use db_console::core::{backend::fetch_all, sqlite::SqliteBackend};
use db_console::core::types::OutputFormat;

/// Table with an INTEGER PRIMARY KEY and gaps in its ids.
fn sparse_table() -> SqliteBackend {
    let b = SqliteBackend::in_memory().unwrap();
    b.connection()
        .execute_batch("CREATE TABLE events (id INTEGER PRIMARY KEY, kind TEXT, payload BLOB)")
        .unwrap();
    for id in (1..=40).map(|i| i * 5 + i % 3) {
        b.connection()
            .execute(
                "INSERT INTO events (id, kind, payload) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, if id % 2 == 0 { "even" } else { "odd" }, vec![id as u8; 2]],
            )
            .unwrap();
    }
    b
}

fn json_ids(out: &[u8], key: &str) -> Vec<i64> {
    let text = String::from_utf8(out.to_vec()).unwrap();
    let body: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let doc = format!("[{}]", body.join("").replace("}{", "},{").trim_start_matches('[').trim_end_matches(']'));
    let rows: Vec<serde_json::Value> = serde_json::from_str(&doc).unwrap();
    rows.iter().map(|r| r[key].as_i64().unwrap()).collect()
}

#[test]
fn paged_output_equals_unpaged_output_for_every_page_size() {
    let mut b = sparse_table();
    let mut expected: Vec<i64> = fetch_all(&mut b, "SELECT id FROM events")
        .unwrap()
        .iter()
        .map(|r| r.values()[0].to_plain().parse().unwrap())
        .collect();
    expected.sort();

    for page_size in [1, 2, 7, 39, 40, 41, 1000] {
        let mut state = SessionState {
            page_size,
            rid_name: "id".into(),
            ..SessionState::default()
        };
        let mut out = Vec::new();
        let report = run_statement(&mut state, &mut b, "SELECT kind, payload FROM events", &mut out, &CancelFlag::default()).unwrap();
        assert!(report.paged);
        assert_eq!(report.rows, 40, "page size {page_size}");
        assert_eq!(report.pages, 40 / page_size + 1 + usize::from(40 % page_size != 0), "page size {page_size}");
        assert_eq!(json_ids(&out, "id"), expected, "page size {page_size}");
    }
}

#[test]
fn default_rowid_cursor_pages_an_integer_primary_key_table() {
    let mut b = sparse_table();
    let mut state = SessionState {
        page_size: 16,
        ..SessionState::default()
    };
    let mut out = Vec::new();
    let report = run_statement(&mut state, &mut b, "select kind from events where kind = 'odd'", &mut out, &CancelFlag::default()).unwrap();
    assert_eq!(report.warning, None);
    let ids = json_ids(&out, "_ROWID_");
    assert!(!ids.is_empty());
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "strictly increasing, no repeats");
    assert!(ids.iter().all(|id| id % 2 == 1));
    assert_eq!(state.last_rid, ids.last().unwrap().to_string());
}

#[test]
fn explicit_limit_is_never_rewritten() {
    let mut b = sparse_table();
    let mut state = SessionState {
        page_size: 5,
        ..SessionState::default()
    };
    let mut out = Vec::new();
    let report = run_statement(&mut state, &mut b, "SELECT id FROM events LIMIT 12", &mut out, &CancelFlag::default()).unwrap();
    assert!(!report.paged);
    assert_eq!(report.rows, 12);
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
    assert_eq!(rows.len(), 12);
    assert!(rows[0].get("_ROWID_").is_none(), "unpaged statements are not given an identity column");
}

#[test]
fn text_output_keeps_one_header_and_sampled_widths_across_pages() {
    let mut b = sparse_table();
    let mut state = SessionState {
        page_size: 4,
        sample_rows: 6,
        format: OutputFormat::Text,
        rid_name: "id".into(),
        ..SessionState::default()
    };
    let mut out = Vec::new();
    run_statement(&mut state, &mut b, "SELECT id, kind FROM events", &mut out, &CancelFlag::default()).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 41);
    assert_eq!(lines.iter().filter(|l| l.contains("kind")).count(), 1);
    // widths come from the first six rows (two-digit ids); later ids have three digits
    let sampled = lines[1].find('"').unwrap();
    assert!(lines.iter().skip(1).take(6).all(|l| l.find('"') == Some(sampled)));
}

#[test]
fn binary_field_is_decoded_and_other_blobs_are_typed() {
    let mut b = sparse_table();
    b.connection()
        .execute_batch("CREATE TABLE docs (body BLOB, raw BLOB); INSERT INTO docs VALUES (CAST('héllo' AS BLOB), X'01');")
        .unwrap();
    let mut state = SessionState {
        binary_field: Some("body".into()),
        ..SessionState::default()
    };
    let mut out = Vec::new();
    run_statement(&mut state, &mut b, "SELECT body, raw FROM docs", &mut out, &CancelFlag::default()).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
    assert_eq!(rows[0]["body"], "héllo");
    assert_eq!(rows[0]["raw"]["$type"], "blob");
    assert_eq!(rows[0]["raw"]["base64"], "AQ==");
}
