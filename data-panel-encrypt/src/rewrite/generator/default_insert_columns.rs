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

use data_panel_common::common::Error;

use crate::rewrite::edit::{DefaultInsertColumns, Edit, EditKind, EditPayload, EditSet};
use crate::rewrite::generator::{contains_ignore_case, physical_columns, require_single_table, unexpected_statement, StatefulEditGenerator};
use crate::rewrite::RewriteContext;
use crate::schema::EncryptSchema;
use crate::statement::segment::InsertColumnsSegment;
use crate::statement::SQLStatementContext;
use crate::Result;

/// Writes out the column list of an `INSERT` that has none, with every
/// encrypted column expanded to its physical columns.
pub struct DefaultInsertColumnsGenerator;

impl StatefulEditGenerator for DefaultInsertColumnsGenerator {
    fn name(&self) -> &'static str {
        "default-insert-columns"
    }

    fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        statement.as_insert().map(|insert| insert.is_implicit_columns()).unwrap_or(false)
    }

    fn generate(&self, ctx: &RewriteContext<'_>, edits: &mut EditSet) -> Result<()> {
        let insert = ctx
            .statement()
            .as_insert()
            .ok_or_else(|| unexpected_statement(self.name(), ctx.statement()))?;
        let (stop_index, declared) = match insert.columns() {
            InsertColumnsSegment::Implicit { stop_index, declared } => (*stop_index, declared),
            InsertColumnsSegment::Explicit { .. } => return Err(unexpected_statement(self.name(), ctx.statement())),
        };
        let table = require_single_table(insert.common_ctx(), self.name())?;
        let schema = ctx.schema();

        edits.upsert(
            EditKind::DefaultInsertColumns,
            || {
                if !declared.iter().any(|c| schema.find_mapping(table, c).is_some()) {
                    return Ok(None);
                }
                let columns = expand_columns(schema, table, declared);
                log::debug!("writing {} default insert column(s) for `{}`", columns.len(), table);
                Ok(Some(Edit::insertion(
                    stop_index,
                    EditKind::DefaultInsertColumns,
                    EditPayload::DefaultInsertColumns(DefaultInsertColumns::new(declared.clone(), columns)),
                )))
            },
            |edit| match edit.payload_mut() {
                EditPayload::DefaultInsertColumns(prior) => {
                    let columns = expand_columns(schema, table, prior.declared());
                    log::debug!("rebuilding {} default insert column(s) for `{}`", columns.len(), table);
                    prior.set_columns(columns);
                    Ok(())
                }
                other => Err(Error::ConfigIntegrity(format!("default insert columns edit carries {:?}", other))),
            },
        )
    }
}

/// Walks `declared` backwards so that splicing companions in after a column
/// never moves a column still to be visited.
fn expand_columns(schema: &EncryptSchema, table: &str, declared: &[String]) -> Vec<String> {
    let mut columns = declared.to_vec();
    for (ordinal, column) in declared.iter().enumerate().rev() {
        if let Some(mapping) = schema.find_mapping(table, column) {
            let physical = physical_columns(mapping, |c| contains_ignore_case(declared, c));
            columns.splice(ordinal..=ordinal, physical);
        }
    }
    columns
}
