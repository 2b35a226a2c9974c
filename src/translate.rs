//! SQL → PipeQL translation.
//!
//! The entry point is [`statement_info`]: it routes a parsed
//! [`Statement`](crate::sql::Statement) to the SELECT translator, the
//! DESCRIBE/SHOW catalog readers, or the view DDL executors, and returns a
//! [`StatementInfo`] carrying the emitted program or payload.

mod describe;
mod error;
mod select;
mod show;
mod statement;
mod view_ddl;

pub use error::TranslationError;
pub use select::translate_select;
pub use statement::{StatementInfo, StatementKind, statement_info};
