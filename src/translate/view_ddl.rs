//! CREATE VIEW and DROP VIEW execution.

use crate::error::Error;
use crate::sql::ast::{CreateViewStatement, DropViewStatement};
use crate::store::{Stores, ViewOptions};

use super::error::TranslationError;
use super::select::{CteMap, translate_select_with_ctes};

fn bad_request(message: impl Into<String>) -> Error {
    Error::Translation(TranslationError::bad_request(message))
}

/// Translates the view body, persists it, and returns the translated
/// program.
///
/// With IF NOT EXISTS the body is still translated (so its diagnostics
/// surface) but an existing view file is left untouched.
pub fn execute_create_view(stmt: &CreateViewStatement, stores: &Stores) -> Result<String, Error> {
    let Some(views) = stores.views() else {
        return Err(bad_request(
            "translator: CREATE VIEW requires configured views directory",
        ));
    };
    if stmt.materialized {
        return Err(bad_request(format!(
            "translator: MATERIALIZED VIEW {} is not supported",
            view_display_name(&stmt.name.parts)
        )));
    }
    if stmt.name.parts.is_empty() {
        return Err(bad_request("translator: CREATE VIEW missing name"));
    }
    let Some(select) = &stmt.select else {
        return Err(bad_request(format!(
            "translator: CREATE VIEW {} missing SELECT",
            stmt.name.display()
        )));
    };

    let query = translate_select_with_ctes(select, stores, &CteMap::new()).map_err(|err| {
        bad_request(format!(
            "translator: failed to translate SELECT for view {}: {err}",
            stmt.name.display()
        ))
    })?;

    views.save(
        &stmt.name.parts,
        &query,
        ViewOptions {
            or_replace: stmt.or_replace,
            if_not_exists: stmt.if_not_exists,
        },
    )?;
    Ok(query)
}

/// Deletes a view via the view store.
pub fn execute_drop_view(stmt: &DropViewStatement, stores: &Stores) -> Result<(), Error> {
    let Some(views) = stores.views() else {
        return Err(bad_request(
            "translator: DROP VIEW requires configured views directory",
        ));
    };
    if stmt.materialized {
        return Err(bad_request(format!(
            "translator: DROP MATERIALIZED VIEW {} is not supported",
            view_display_name(&stmt.name.parts)
        )));
    }
    if stmt.name.parts.is_empty() {
        return Err(bad_request("translator: DROP VIEW missing name"));
    }
    views.remove(&stmt.name.parts, stmt.if_exists)?;
    Ok(())
}

fn view_display_name(parts: &[String]) -> String {
    if parts.is_empty() {
        return "view".to_string();
    }
    parts.join(".")
}
