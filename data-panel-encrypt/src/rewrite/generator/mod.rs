// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Edit generators, one per SQL construct.
//!
//! `applies_to` is a cheap structural check. When it holds, `generate` may
//! rely on the structure it checked for; anything else missing is reported as
//! a configuration integrity error rather than skipped.

use data_panel_common::common::Error;

use crate::rewrite::edit::{Edit, EditSet};
use crate::rewrite::{QueryMode, RewriteContext};
use crate::schema::ColumnMapping;
use crate::statement::{CommonStatementContext, SQLStatementContext};
use crate::Result;

mod assignment;
mod default_insert_columns;
mod insert_columns;
mod insert_values;
mod predicate;
mod projection;

pub use self::assignment::{OnDuplicateKeyAssignmentGenerator, UpdateAssignmentGenerator};
pub use self::default_insert_columns::DefaultInsertColumnsGenerator;
pub use self::insert_columns::InsertColumnsGenerator;
pub use self::insert_values::InsertValuesGenerator;
pub use self::predicate::{PredicateColumnGenerator, PredicateValueGenerator};
pub use self::projection::ProjectionGenerator;

/// Builds fresh edits, never looking at what earlier generators produced.
pub trait CollectionEditGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies_to(&self, statement: &SQLStatementContext) -> bool;

    fn generate(&self, ctx: &RewriteContext<'_>) -> Result<Vec<Edit>>;
}

/// Extends the edit an earlier generator made for the same construct, or
/// makes it. Prior edits are reached through [`EditSet::find`] and
/// [`EditSet::upsert`] only.
pub trait StatefulEditGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies_to(&self, statement: &SQLStatementContext) -> bool;

    fn generate(&self, ctx: &RewriteContext<'_>, edits: &mut EditSet) -> Result<()>;
}

pub enum EditGenerator {
    Collection(Box<dyn CollectionEditGenerator>),
    Stateful(Box<dyn StatefulEditGenerator>),
}

impl EditGenerator {
    pub fn name(&self) -> &'static str {
        match self {
            EditGenerator::Collection(g) => g.name(),
            EditGenerator::Stateful(g) => g.name(),
        }
    }

    pub fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        match self {
            EditGenerator::Collection(g) => g.applies_to(statement),
            EditGenerator::Stateful(g) => g.applies_to(statement),
        }
    }

    pub(crate) fn run(&self, ctx: &RewriteContext<'_>, edits: &mut EditSet) -> Result<()> {
        match self {
            EditGenerator::Collection(g) => {
                for edit in g.generate(ctx)? {
                    edits.push(edit);
                }
                Ok(())
            }
            EditGenerator::Stateful(g) => g.generate(ctx, edits),
        }
    }
}

/// The physical column a read of an encrypted column goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryColumn<'a> {
    Plain(&'a str),
    AssistedQuery(&'a str),
    Cipher(&'a str),
}

impl<'a> QueryColumn<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            QueryColumn::Plain(c) | QueryColumn::AssistedQuery(c) | QueryColumn::Cipher(c) => *c,
        }
    }
}

/// Column for projections: plain when reading plain and it exists, else cipher.
pub(crate) fn projection_column(mapping: &ColumnMapping, query_mode: QueryMode) -> &str {
    match (query_mode, mapping.plain_column()) {
        (QueryMode::ReadPlain, Some(plain)) => plain,
        _ => mapping.cipher_column(),
    }
}

/// Column for predicates: like projections, except the assisted query column
/// beats the cipher column.
pub(crate) fn predicate_column(mapping: &ColumnMapping, query_mode: QueryMode) -> QueryColumn<'_> {
    if let (QueryMode::ReadPlain, Some(plain)) = (query_mode, mapping.plain_column()) {
        return QueryColumn::Plain(plain);
    }
    match mapping.assisted_query_column() {
        Some(assisted) => QueryColumn::AssistedQuery(assisted),
        None => QueryColumn::Cipher(mapping.cipher_column()),
    }
}

/// Cipher, assisted query and plain column, leaving out companions the
/// statement already writes itself.
pub(crate) fn physical_columns<F>(mapping: &ColumnMapping, is_destination: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let mut result = vec![mapping.cipher_column().to_string()];
    if let Some(assisted) = assisted_companion(mapping, &is_destination) {
        result.push(assisted.to_string());
    }
    if let Some(plain) = plain_companion(mapping, &is_destination) {
        result.push(plain.to_string());
    }
    result
}

pub(crate) fn assisted_companion<'a, F>(mapping: &'a ColumnMapping, is_destination: &F) -> Option<&'a str>
where
    F: Fn(&str) -> bool,
{
    mapping.assisted_query_column().filter(|c| !is_destination(*c))
}

pub(crate) fn plain_companion<'a, F>(mapping: &'a ColumnMapping, is_destination: &F) -> Option<&'a str>
where
    F: Fn(&str) -> bool,
{
    mapping.plain_column().filter(|c| !is_destination(*c))
}

pub(crate) fn contains_ignore_case(columns: &[String], column: &str) -> bool {
    columns.iter().any(|c| c.eq_ignore_ascii_case(column))
}

pub(crate) fn require_single_table<'a>(common_ctx: &'a CommonStatementContext, generator: &str) -> Result<&'a str> {
    common_ctx
        .single_table_name()
        .ok_or_else(|| Error::ConfigIntegrity(format!("{} needs exactly one resolved table", generator)))
}

pub(crate) fn unexpected_statement(generator: &str, statement: &SQLStatementContext) -> Error {
    Error::ConfigIntegrity(format!("{} can not rewrite {:?}", generator, statement))
}
