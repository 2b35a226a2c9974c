//! End-to-end SQL → PipeQL translation cases.

use std::path::Path;

use sqlpipe::Error;
use sqlpipe::sql::Parser;
use sqlpipe::store::{Stores, TableCatalog, ViewStore};
use sqlpipe::translate::{StatementKind, statement_info};

fn parse(sql: &str) -> sqlpipe::sql::Statement {
    let mut parser = Parser::new(sql);
    let stmt = parser.parse_statement();
    assert!(
        parser.errors().is_empty(),
        "parser returned errors for {sql:?}: {:?}",
        parser.errors()
    );
    stmt.unwrap_or_else(|| panic!("no statement parsed for {sql:?}"))
}

fn stores(tables: &[(&str, &str)], views_dir: Option<&Path>) -> Stores {
    let catalog = TableCatalog::new(
        tables
            .iter()
            .map(|(name, expr)| (name.to_string(), expr.to_string())),
    )
    .expect("table catalog");
    let views = views_dir.map(|dir| ViewStore::new(dir).expect("view store"));
    Stores::new(catalog, views)
}

fn translate_with(sql: &str, stores: &Stores) -> Result<String, Error> {
    Ok(statement_info(&parse(sql), stores)?.pipeql)
}

fn translate(sql: &str) -> Result<String, Error> {
    translate_with(sql, &stores(&[("logs", "*")], None))
}

fn must_translate(sql: &str) -> String {
    translate(sql).unwrap_or_else(|err| panic!("translate failed for {sql:?}: {err}"))
}

#[test]
fn translates_supported_selects() {
    let cases = [
        ("SELECT * FROM logs", "*"),
        ("SELECT * FROM logs WHERE level = 'error'", "level:error"),
        (
            "SELECT * FROM logs WHERE level != 'info' OR status = 500",
            "(-level:info OR status:500)",
        ),
        (
            "SELECT * FROM logs AS l WHERE l.level = 'error' AND l.message LIKE 'fail%'",
            "(level:error AND message:fail*)",
        ),
        (
            "SELECT * FROM logs WHERE _time >= '2024-01-01' ORDER BY _time DESC LIMIT 10",
            "_time:>=2024-01-01 | sort by (_time desc) | limit 10",
        ),
        (
            "SELECT * FROM logs ORDER BY _time LIMIT 20 OFFSET 5",
            "* | sort by (_time) | offset 5 | limit 20",
        ),
        ("SELECT * FROM logs OFFSET 3", "* | offset 3"),
        (
            "SELECT * FROM logs WHERE service IN ('api', 'worker')",
            "service:(api OR worker)",
        ),
        ("SELECT * FROM logs WHERE host IS NULL", "host:\"\""),
        ("SELECT * FROM logs WHERE host IS NOT NULL", "host:*"),
        ("SELECT level, message FROM logs", "* | fields level, message"),
        (
            "SELECT host AS instance FROM logs",
            "* | rename host as instance | fields instance",
        ),
        (
            "SELECT DISTINCT level FROM logs",
            "* | fields level | uniq by (level)",
        ),
        (
            "SELECT DISTINCT host, service FROM logs",
            "* | fields host, service | uniq by (host, service)",
        ),
        (
            "SELECT UPPER(level) AS lvl FROM logs",
            "* | format \"<uc:level>\" as lvl | fields lvl",
        ),
        (
            "SELECT LOWER(service) FROM logs",
            "* | format \"<lc:service>\" as lower_service | fields lower_service",
        ),
        ("SELECT COUNT(*) FROM logs", "* | stats count()"),
        (
            "SELECT TRIM(message) AS trimmed FROM logs",
            "* | extract_regexp '(?s)^\\s*(?P<trimmed>.*?\\S)?\\s*$' from message | fields trimmed",
        ),
        (
            "SELECT LTRIM(message) FROM logs",
            "* | extract_regexp '(?s)^\\s*(?P<ltrim_message>.*)$' from message | fields ltrim_message",
        ),
        (
            "SELECT * FROM logs WHERE latency BETWEEN 100 AND 200",
            "latency:[100, 200]",
        ),
        (
            "SELECT * FROM logs WHERE message LIKE '%error_%'",
            "message:~\"^.*error..*$\"",
        ),
        (
            "SELECT * FROM logs WHERE message LIKE '_foo'",
            "message:~\"^.foo$\"",
        ),
        (
            "SELECT (duration_ms / 1000) AS duration_s FROM logs",
            "* | math (duration_ms / 1000) as duration_s | fields duration_s",
        ),
        (
            "SELECT ABS(delta) FROM logs",
            "* | math abs(delta) as expr_abs_delta | fields expr_abs_delta",
        ),
        (
            "SELECT SUBSTR(message, 2, 5) AS snippet FROM logs",
            "* | extract_regexp '(?s)^.{1}(?P<snippet>.{0,5})' from message | fields snippet",
        ),
        (
            "SELECT * FROM logs WHERE UPPER(level) = 'ERROR'",
            "* | format \"<uc:level>\" as __filter_expr_1 | filter __filter_expr_1:ERROR | delete __filter_expr_1",
        ),
        (
            "SELECT * FROM logs WHERE LOWER(service) != 'api'",
            "* | format \"<lc:service>\" as __filter_expr_1 | filter -__filter_expr_1:api | delete __filter_expr_1",
        ),
        (
            "SELECT * FROM logs WHERE LOWER(level) LIKE 'warn%'",
            "* | format \"<lc:level>\" as __filter_expr_1 | filter __filter_expr_1:warn* | delete __filter_expr_1",
        ),
        (
            "SELECT * FROM logs WHERE SUBSTR(message, 1, 3) = 'foo'",
            "* | extract_regexp '(?s)^.{0}(?P<__filter_expr_1>.{0,3})' from message | filter __filter_expr_1:foo | delete __filter_expr_1",
        ),
        (
            "SELECT CONCAT(host, ':', service) AS endpoint FROM logs",
            "* | format \"<host>:<service>\" as endpoint | fields endpoint",
        ),
        (
            "SELECT REPLACE(message, 'foo', 'bar') AS updated FROM logs",
            "* | format \"<message>\" as updated | replace ('foo', 'bar') at updated | fields updated",
        ),
        (
            "SELECT SUM(duration_ms) OVER (PARTITION BY service ORDER BY _time) AS running_sum FROM logs",
            "* | sort by (_time) | running_stats by (service) sum(duration_ms) as running_sum | fields running_sum",
        ),
        (
            "SELECT COUNT(*) OVER (ORDER BY _time) AS running_count FROM logs",
            "* | sort by (_time) | running_stats count() as running_count | fields running_count",
        ),
        (
            "SELECT CEIL(duration_ms / 1000.0) AS duration FROM logs",
            "* | math ceil((duration_ms / 1000.0)) as duration | fields duration",
        ),
        (
            "SELECT GREATEST(cpu_usage, memory_usage, 50) AS max_usage FROM logs",
            "* | math max(cpu_usage, memory_usage, 50) as max_usage | fields max_usage",
        ),
        (
            "SELECT LEAST(cpu_usage, 10) AS min_usage FROM logs",
            "* | math min(cpu_usage, 10) as min_usage | fields min_usage",
        ),
        (
            "SELECT CURRENT_TIMESTAMP FROM logs",
            "* | math now() as current_timestamp_nanos | format '<time:current_timestamp_nanos>' as current_timestamp | delete current_timestamp_nanos | fields current_timestamp",
        ),
        (
            "SELECT CURRENT_DATE FROM logs",
            "* | math now() as current_date_nanos | format '<time:current_date_nanos>' as current_date_formatted | extract_regexp '^(?P<current_date>[0-9]{4}-[0-9]{2}-[0-9]{2})' from current_date_formatted | delete current_date_nanos, current_date_formatted | fields current_date",
        ),
        (
            "SELECT * FROM logs WHERE level = 'error'\nUNION ALL\nSELECT * FROM logs WHERE level = 'warn'",
            "level:error | union (level:warn)",
        ),
        (
            "SELECT level, COUNT(*) AS total FROM logs GROUP BY level HAVING COUNT(*) > 10",
            "* | stats by (level) count() total | filter total:>10",
        ),
        (
            "WITH recent_errors AS (\n    SELECT * FROM logs WHERE level = 'error'\n)\nSELECT * FROM recent_errors",
            "level:error",
        ),
        (
            "WITH recent_errors AS (\n    SELECT * FROM logs WHERE level = 'error'\n)\nSELECT user FROM recent_errors WHERE service = 'api'",
            "level:error | filter service:api | fields user",
        ),
        (
            "SELECT LOWER(user) AS user_lower, COUNT(*) AS total FROM logs GROUP BY LOWER(user)",
            "* | format \"<lc:user>\" as group_1 | stats by (group_1) count() total | rename group_1 as user_lower",
        ),
        (
            "SELECT user AS usr, COUNT(*) AS total FROM logs GROUP BY usr",
            "* | stats by (user) count() total | rename user as usr",
        ),
        (
            "SELECT LOWER(user) AS user_lower, COUNT(*) AS total FROM logs GROUP BY user_lower",
            "* | format \"<lc:user>\" as group_1 | stats by (group_1) count() total | rename group_1 as user_lower",
        ),
        (
            "SELECT *\nFROM (\n    SELECT *\n    FROM logs\n    WHERE level = 'error'\n) AS recent_errors",
            "level:error",
        ),
        (
            "SELECT *\nFROM (\n    SELECT *\n    FROM logs\n    WHERE level = 'error'\n)",
            "level:error",
        ),
        (
            "SELECT recent.user, recent.fail_count\nFROM (\n    SELECT user, COUNT(*) AS fail_count\n    FROM logs\n    WHERE level = 'error'\n    GROUP BY user\n) AS recent\nWHERE recent.fail_count > 10\nORDER BY recent.fail_count DESC\nLIMIT 5",
            "level:error | stats by (user) count() fail_count | filter fail_count:>10 | fields user, fail_count | sort by (fail_count desc) | limit 5",
        ),
        (
            "SELECT user, fail_count\nFROM (\n    SELECT user, COUNT(*) AS fail_count\n    FROM logs\n    WHERE level = 'error'\n    GROUP BY user\n)\nWHERE fail_count > 10\nORDER BY fail_count DESC\nLIMIT 5",
            "level:error | stats by (user) count() fail_count | filter fail_count:>10 | fields user, fail_count | sort by (fail_count desc) | limit 5",
        ),
        (
            "SELECT l.user, m.fail_count\nFROM logs AS l\nINNER JOIN (\n    SELECT user, COUNT(*) AS fail_count\n    FROM logs\n    WHERE level = 'error'\n    GROUP BY user\n) AS m ON l.user = m.user\nWHERE l.level = 'error'\nORDER BY m.fail_count DESC\nLIMIT 5",
            "level:error | join by (user) (level:error | stats by (user) count() fail_count) inner | fields user, fail_count | sort by (fail_count desc) | limit 5",
        ),
        (
            "SELECT l.user, fail_count\nFROM logs AS l\nINNER JOIN (\n    SELECT user, COUNT(*) AS fail_count\n    FROM logs\n    WHERE level = 'error'\n    GROUP BY user\n) ON l.user = user\nWHERE l.level = 'error'\nORDER BY fail_count DESC\nLIMIT 5",
            "level:error | join by (user) (level:error | stats by (user) count() fail_count) inner | fields user, fail_count | sort by (fail_count desc) | limit 5",
        ),
    ];

    for (sql, expected) in cases {
        let got = must_translate(sql);
        assert_eq!(got, expected, "translate mismatch for {sql:?}");
    }
}

#[test]
fn translates_against_configured_tables() {
    let stores = stores(
        &[
            ("logs", "*"),
            ("errors", "* | level:ERROR"),
            ("api", "service:api"),
        ],
        None,
    );

    assert_eq!(
        translate_with("SELECT * FROM errors", &stores).unwrap(),
        "* | level:ERROR"
    );
    assert_eq!(
        translate_with("SELECT * FROM errors WHERE status = 500", &stores).unwrap(),
        "* | level:ERROR | filter status:500"
    );
    assert_eq!(
        translate_with("SELECT * FROM api WHERE level = 'warn'", &stores).unwrap(),
        "(service:api AND level:warn)"
    );

    let sql = "SELECT recent.user, a.level\nFROM (\n    SELECT user\n    FROM logs\n    WHERE level = 'error'\n) AS recent\nINNER JOIN api AS a ON recent.user = a.user";
    assert_eq!(
        translate_with(sql, &stores).unwrap(),
        "level:error | fields user | join by (user) (service:api) inner | fields user, level"
    );

    let err = translate_with("SELECT * FROM missing", &stores).unwrap_err();
    assert!(err.to_string().contains("not configured"));
    assert_eq!(err.code(), 404);
}

#[test]
fn rejects_unsupported_dialect() {
    let cases = [
        "SELECT DISTINCT * FROM logs",
        "SELECT * FROM users",
        "SELECT REVERSE(message) FROM logs",
        "SELECT DISTINCT COUNT(*) FROM logs",
        "SELECT * FROM logs UNION SELECT * FROM logs",
        "SELECT * FROM logs INTERSECT SELECT * FROM logs",
        "SELECT *\nFROM logs l\nJOIN logs ON l.user = logs.user",
        "SELECT AVG(duration_ms) OVER (ORDER BY _time) FROM logs",
        "SELECT SUM(DISTINCT duration_ms) OVER (ORDER BY _time) FROM logs",
        "SELECT * FROM logs a RIGHT JOIN logs b ON a.x = b.x",
        "SELECT * FROM logs LIMIT x",
        "SELECT level FROM logs GROUP BY level",
        "SELECT host, COUNT(*) FROM logs GROUP BY level",
        "SELECT level FROM logs HAVING COUNT(*) > 1",
        "INSERT INTO logs (level) VALUES ('x')",
        "UPDATE logs SET level = 'x'",
        "DELETE FROM logs",
        "WITH RECURSIVE r AS (SELECT * FROM logs) SELECT * FROM r",
        "SELECT 1",
    ];
    for sql in cases {
        let err = translate(sql).unwrap_err();
        assert_eq!(err.code() / 100, 4, "expected client error for {sql:?}");
    }
}

#[test]
fn routes_select() {
    let stores = stores(&[("logs", "*")], None);
    let info = statement_info(&parse("SELECT * FROM logs"), &stores).unwrap();
    assert_eq!(info.kind, StatementKind::Select);
    assert_eq!(info.pipeql, "*");
    assert_eq!(info.data, "");
}

#[test]
fn routes_describe_table() {
    let stores = stores(&[("errors", "* | level:ERROR")], None);
    let info = statement_info(&parse("DESCRIBE TABLE errors"), &stores).unwrap();
    assert_eq!(info.kind, StatementKind::Describe);
    assert_eq!(info.pipeql, "* | level:ERROR");

    let err = statement_info(&parse("DESCRIBE TABLE missing"), &stores).unwrap_err();
    assert_eq!(err.code(), 404);
}

#[test]
fn routes_show_tables() {
    let stores = stores(&[("logs", "*"), ("errors", "* | level:ERROR")], None);
    let info = statement_info(&parse("SHOW TABLES"), &stores).unwrap();
    assert_eq!(info.kind, StatementKind::ShowTables);
    assert_eq!(info.pipeql, "");
    assert_eq!(
        info.data,
        "{\"table_name\":\"errors\",\"query\":\"* | level:ERROR\"}\n{\"table_name\":\"logs\",\"query\":\"*\"}\n"
    );
}

#[test]
fn rejects_insert_update_delete() {
    let stores = stores(&[("logs", "*")], None);
    for sql in [
        "INSERT INTO logs (level) VALUES ('x')",
        "UPDATE logs SET level = 'x'",
        "DELETE FROM logs WHERE level = 'x'",
    ] {
        let err = statement_info(&parse(sql), &stores).unwrap_err();
        assert_eq!(err.code(), 400, "expected 400 for {sql:?}");
        assert!(err.to_string().contains("unsupported statement"));
    }
}

#[test]
fn translation_is_deterministic() {
    let sql = "SELECT level, COUNT(*) AS total FROM logs \
               WHERE UPPER(level) = 'ERROR' OR UPPER(service) = 'API' \
               GROUP BY level ORDER BY COUNT(*) DESC LIMIT 3";
    let first = must_translate(sql);
    for _ in 0..10 {
        assert_eq!(must_translate(sql), first);
    }
}

#[test]
fn non_aggregated_projection_has_single_fields_stage() {
    let cases = [
        "SELECT level, message FROM logs",
        "SELECT host AS instance, level FROM logs ORDER BY level LIMIT 5",
        "SELECT UPPER(level) AS lvl, host FROM logs",
        "SELECT DISTINCT level, host FROM logs",
    ];
    for sql in cases {
        let program = must_translate(sql);
        let count = program
            .split(" | ")
            .filter(|stage| stage.starts_with("fields "))
            .count();
        assert_eq!(count, 1, "expected one fields stage in {program:?}");
    }
}
