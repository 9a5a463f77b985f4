//! Limit enforcement properties over a corpus of realistic queries.

use ask_db::limit::{enforce, has_limit_clause, LimitPolicy, DEFAULT_MAX_ROWS};
use pretty_assertions::assert_eq;

const QUERIES: &[&str] = &[
    "SELECT * FROM users",
    "SELECT * FROM users;",
    "select id from orders where speed_limit > 10",
    "SELECT dept, SUM(budget) FROM budgets WHERE year=2024 GROUP BY dept",
    "SELECT * FROM t LIMIT 5",
    "SELECT 'limit' AS word FROM t",
    "SELECT \"limit\" FROM t;;",
    "SELECT * FROM t -- limit later",
    "WITH x AS (SELECT 1) SELECT * FROM x\n",
    "SELECT * FROM (SELECT * FROM t LIMIT 3) s",
    "SELECT * FROM t ORDER BY id FETCH FIRST 10 ROWS ONLY",
];

#[test]
fn test_enforcement_is_idempotent() {
    for query in QUERIES {
        let once = enforce(query, 200, true).unwrap();
        let twice = enforce(&once, 200, true).unwrap();
        assert_eq!(once, twice, "not idempotent for {query:?}");
    }
}

#[test]
fn test_enabled_output_always_bounded() {
    for query in QUERIES {
        let enforced = enforce(query, 200, true).unwrap();
        assert!(has_limit_clause(&enforced), "no bound in {enforced:?}");
        assert!(enforced.ends_with(';') && !enforced.ends_with(";;"));
    }
}

#[test]
fn test_disabled_only_normalizes_terminator() {
    for query in QUERIES {
        let passed = enforce(query, 200, false).unwrap();
        let body = query.trim().trim_end_matches(';').trim_end();
        assert_eq!(passed, format!("{body};"));
    }
}

#[test]
fn test_word_boundary_detection() {
    assert_eq!(
        enforce("select id from orders where speed_limit > 10", 100, true).unwrap(),
        "select id from orders where speed_limit > 10 LIMIT 100;"
    );
    assert_eq!(
        enforce("SELECT * FROM t -- limit later", 100, true).unwrap(),
        "SELECT * FROM t -- limit later\nLIMIT 100;"
    );
    assert_eq!(
        enforce("SELECT * FROM t LIMIT 5", 100, true).unwrap(),
        "SELECT * FROM t LIMIT 5;"
    );
}

#[test]
fn test_policy_bounds() {
    assert!(LimitPolicy::new(true, 9).is_err());
    assert!(LimitPolicy::new(true, 10).is_ok());
    assert!(LimitPolicy::new(true, 10_000).is_ok());
    assert!(LimitPolicy::new(true, 10_001).is_err());
    assert_eq!(LimitPolicy::default().max_rows, DEFAULT_MAX_ROWS);
}
