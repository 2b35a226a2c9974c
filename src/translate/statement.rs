//! Statement routing.
//!
//! A single dispatch on the parsed statement kind: SELECT goes through the
//! translator, DESCRIBE/SHOW read the catalogs, CREATE/DROP VIEW mutate
//! the view store.

use crate::error::Error;
use crate::sql::ast::Statement;
use crate::store::Stores;

use super::describe::describe_statement;
use super::error::TranslationError;
use super::select::translate_select;
use super::show::{show_tables_payload, show_views_payload};
use super::view_ddl::{execute_create_view, execute_drop_view};

/// The kind of a routed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Describe,
    CreateView,
    DropView,
    ShowTables,
    ShowViews,
}

impl StatementKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Describe => "describe",
            StatementKind::CreateView => "create_view",
            StatementKind::DropView => "drop_view",
            StatementKind::ShowTables => "show_tables",
            StatementKind::ShowViews => "show_views",
        }
    }
}

/// The routed result of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementInfo {
    /// What was executed.
    pub kind: StatementKind,
    /// The PipeQL program, empty for SHOW and DROP VIEW.
    pub pipeql: String,
    /// Newline-delimited JSON payload for SHOW statements.
    pub data: String,
}

impl StatementInfo {
    fn with_pipeql(kind: StatementKind, pipeql: String) -> Self {
        Self {
            kind,
            pipeql,
            data: String::new(),
        }
    }

    fn with_data(kind: StatementKind, data: String) -> Self {
        Self {
            kind,
            pipeql: String::new(),
            data,
        }
    }
}

/// Routes a parsed statement and returns its translation result.
pub fn statement_info(stmt: &Statement, stores: &Stores) -> Result<StatementInfo, Error> {
    match stmt {
        Statement::Select(select) => {
            let pipeql = translate_select(select, stores)?;
            Ok(StatementInfo::with_pipeql(StatementKind::Select, pipeql))
        }
        Statement::Describe(describe) => {
            let pipeql = describe_statement(describe, stores)?;
            Ok(StatementInfo::with_pipeql(StatementKind::Describe, pipeql))
        }
        Statement::CreateView(create) => {
            let pipeql = execute_create_view(create, stores)?;
            Ok(StatementInfo::with_pipeql(StatementKind::CreateView, pipeql))
        }
        Statement::DropView(drop) => {
            execute_drop_view(drop, stores)?;
            Ok(StatementInfo::with_pipeql(
                StatementKind::DropView,
                String::new(),
            ))
        }
        Statement::ShowTables => {
            let payload = show_tables_payload(stores.tables())?;
            Ok(StatementInfo::with_data(StatementKind::ShowTables, payload))
        }
        Statement::ShowViews => {
            let payload = show_views_payload(stores.views())?;
            Ok(StatementInfo::with_data(StatementKind::ShowViews, payload))
        }
        Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_) => {
            Err(Error::Translation(TranslationError::bad_request(format!(
                "translator: unsupported statement {}",
                statement_name(stmt)
            ))))
        }
    }
}

fn statement_name(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Select(_) => "SELECT",
        Statement::Insert(_) => "INSERT",
        Statement::Update(_) => "UPDATE",
        Statement::Delete(_) => "DELETE",
        Statement::CreateView(_) => "CREATE VIEW",
        Statement::DropView(_) => "DROP VIEW",
        Statement::Describe(_) => "DESCRIBE",
        Statement::ShowTables => "SHOW TABLES",
        Statement::ShowViews => "SHOW VIEWS",
    }
}
