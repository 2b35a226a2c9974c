//! SHOW TABLES / SHOW VIEWS payload builders.
//!
//! Both emit one JSON object per line, terminated by `\n`, ordered by
//! name.

use serde::Serialize;

use crate::error::Error;
use crate::store::{TableCatalog, ViewStore};

use super::error::TranslationError;

fn is_empty_str(value: &&str) -> bool {
    value.is_empty()
}

#[derive(Serialize)]
struct ShowTableRow<'a> {
    table_name: &'a str,
    #[serde(skip_serializing_if = "is_empty_str")]
    query: &'a str,
}

#[derive(Serialize)]
struct ShowViewRow<'a> {
    view_name: &'a str,
    query: &'a str,
}

/// Renders the SHOW TABLES payload.
pub fn show_tables_payload(tables: &TableCatalog) -> Result<String, Error> {
    let mut rows = String::new();
    for (name, query) in tables.iter() {
        let row = ShowTableRow {
            table_name: name,
            query,
        };
        append_row(&mut rows, &row, "SHOW TABLES")?;
    }
    Ok(rows)
}

/// Renders the SHOW VIEWS payload.
pub fn show_views_payload(views: Option<&ViewStore>) -> Result<String, Error> {
    let Some(views) = views else {
        return Err(Error::Translation(TranslationError::bad_request(
            "translator: SHOW VIEWS requires configured views directory",
        )));
    };
    let mut rows = String::new();
    for (name, query) in views.view_definitions()? {
        let row = ShowViewRow {
            view_name: &name,
            query: &query,
        };
        append_row(&mut rows, &row, "SHOW VIEWS")?;
    }
    Ok(rows)
}

fn append_row(rows: &mut String, row: &impl Serialize, what: &str) -> Result<(), Error> {
    let payload = serde_json::to_string(row).map_err(|err| {
        Error::Translation(TranslationError::internal(format!(
            "translator: marshal {what} payload: {err}"
        )))
    })?;
    rows.push_str(&payload);
    rows.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_tables_payload_sorted_ndjson() {
        let catalog = TableCatalog::new([
            ("logs".to_string(), "*".to_string()),
            ("errors".to_string(), "* | level:ERROR".to_string()),
        ])
        .unwrap();
        let payload = show_tables_payload(&catalog).unwrap();
        assert_eq!(
            payload,
            "{\"table_name\":\"errors\",\"query\":\"* | level:ERROR\"}\n\
             {\"table_name\":\"logs\",\"query\":\"*\"}\n"
        );
    }

    #[test]
    fn test_show_tables_payload_empty_catalog() {
        assert_eq!(show_tables_payload(&TableCatalog::empty()).unwrap(), "");
    }

    #[test]
    fn test_show_tables_omits_empty_query() {
        let catalog =
            TableCatalog::new([("logs".to_string(), String::new())]).unwrap();
        let payload = show_tables_payload(&catalog).unwrap();
        assert_eq!(payload, "{\"table_name\":\"logs\"}\n");
    }

    #[test]
    fn test_show_views_requires_store() {
        let err = show_views_payload(None).unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(err.to_string().contains("views directory"));
    }
}
