//! DESCRIBE TABLE / DESCRIBE VIEW handlers.

use crate::error::Error;
use crate::sql::ast::{DescribeStatement, DescribeTarget};
use crate::store::{Stores, TableCatalog, ViewStore};

use super::error::TranslationError;

/// Resolves a DESCRIBE statement to the described PipeQL expression.
pub fn describe_statement(stmt: &DescribeStatement, stores: &Stores) -> Result<String, Error> {
    if stmt.name.parts.is_empty() {
        return Err(Error::Translation(TranslationError::bad_request(
            "translator: DESCRIBE requires a target name",
        )));
    }
    match stmt.target {
        DescribeTarget::Table => describe_table(&stmt.name.parts, stores.tables()),
        DescribeTarget::View => describe_view(&stmt.name.parts, stores.views()),
    }
}

fn describe_table(parts: &[String], tables: &TableCatalog) -> Result<String, Error> {
    let name = parts.last().map(String::as_str).unwrap_or_default();
    match tables.get(name) {
        Some(expr) => Ok(expr.to_string()),
        None => {
            let available = tables.list().join(", ");
            Err(Error::Translation(TranslationError::not_found(format!(
                "translator: table {:?} is not configured (available: {})",
                parts.join("."),
                available
            ))))
        }
    }
}

fn describe_view(parts: &[String], views: Option<&ViewStore>) -> Result<String, Error> {
    let Some(views) = views else {
        return Err(Error::Translation(TranslationError::bad_request(
            "translator: DESCRIBE VIEW requires configured views directory",
        )));
    };
    match views.load(parts)? {
        Some(query) => Ok(query),
        None => Err(Error::Translation(TranslationError::not_found(format!(
            "translator: view {} not found",
            ViewStore::display_name(parts)
        )))),
    }
}
