//! Column level encryption for the data panel.
//!
//! A statement that touches encrypted columns is never rewritten by mutating
//! its syntax tree. Instead, every SQL construct that needs a change (insert
//! columns, insert values, `ON DUPLICATE KEY UPDATE`, `UPDATE ... SET`,
//! projections, `WHERE` predicates) has an edit generator that reads the
//! parsed [`statement::SQLStatementContext`] together with the
//! [`schema::EncryptSchema`] and emits position anchored [`rewrite::Edit`]s.
//! The [`rewrite::RewritePipeline`] runs the generators in a fixed order and
//! hands back one ordered, non-overlapping edit set for the renderer to splice
//! into the original SQL text.

#![warn(rust_2018_idioms)]

pub mod encryptor;
pub mod rewrite;
pub mod schema;
pub mod statement;

#[cfg(test)]
mod test_helpers;

pub use data_panel_common::common::{Error, Result};

pub use crate::encryptor::{AssistedQueryEncryptor, Encryptor};
pub use crate::rewrite::{Edit, EditKind, EditSet, QueryMode, RewriteContext, RewritePipeline};
pub use crate::schema::{ColumnMapping, EncryptSchema};
pub use crate::statement::value::Value;
pub use crate::statement::SQLStatementContext;
