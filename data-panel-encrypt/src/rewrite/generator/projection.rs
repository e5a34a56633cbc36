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

use crate::rewrite::edit::{Edit, EditKind, EditPayload};
use crate::rewrite::generator::{projection_column, unexpected_statement, CollectionEditGenerator};
use crate::rewrite::{QueryMode, RewriteContext};
use crate::schema::EncryptSchema;
use crate::statement::segment::{ProjectionSegment, ShorthandProjectionSegment, TableSegment};
use crate::statement::SQLStatementContext;
use crate::Result;

/// Points selected encrypted columns at the physical column the pass reads.
pub struct ProjectionGenerator;

impl CollectionEditGenerator for ProjectionGenerator {
    fn name(&self) -> &'static str {
        "projection"
    }

    fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        statement
            .as_select()
            .map(|select| !select.common_ctx().tables().is_empty())
            .unwrap_or(false)
    }

    fn generate(&self, ctx: &RewriteContext<'_>) -> Result<Vec<Edit>> {
        let select = ctx
            .statement()
            .as_select()
            .ok_or_else(|| unexpected_statement(self.name(), ctx.statement()))?;
        let schema = ctx.schema();

        let mut edits = vec![];
        for projection in select.projections() {
            match projection {
                ProjectionSegment::Column { column, alias } => {
                    let mapping = select
                        .common_ctx()
                        .find_table_name(column, schema)
                        .and_then(|table| schema.find_mapping(table, &column.name));
                    if let Some(mapping) = mapping {
                        let physical = projection_column(mapping, ctx.query_mode());
                        // a written alias follows the name span and already names the output
                        let rewritten = match alias {
                            Some(_) => physical.to_string(),
                            None => aliased(physical, &column.name),
                        };
                        edits.push(Edit::substitution(
                            column.name_start_index(),
                            column.stop_index,
                            EditKind::Projection,
                            EditPayload::Columns(vec![rewritten]),
                        ));
                    }
                }
                ProjectionSegment::Shorthand(shorthand) => {
                    if let Some(edit) = expand_shorthand(shorthand, select.common_ctx().tables(), schema, ctx.query_mode()) {
                        edits.push(edit);
                    }
                }
                ProjectionSegment::Expression { .. } => {}
            }
        }
        log::debug!("{} projection(s) rewritten", edits.len());
        Ok(edits)
    }
}

/// `*` stays as is unless it hides an encrypted column.
///
/// Expanded columns keep the shorthand qualifier. A bare `*` over several
/// tables qualifies each column with its own table, or that table's alias.
fn expand_shorthand(
    shorthand: &ShorthandProjectionSegment,
    tables: &[TableSegment],
    schema: &EncryptSchema,
    query_mode: QueryMode,
) -> Option<Edit> {
    if !shorthand
        .actual_columns
        .iter()
        .any(|c| schema.find_mapping(&c.table, &c.name).is_some())
    {
        return None;
    }
    let columns = shorthand
        .actual_columns
        .iter()
        .map(|c| {
            let qualifier = match &shorthand.owner {
                Some(owner) => Some(owner.name.as_str()),
                None if tables.len() > 1 => Some(
                    tables
                        .iter()
                        .find(|t| t.name.eq_ignore_ascii_case(&c.table))
                        .and_then(|t| t.alias.as_deref())
                        .unwrap_or(c.table.as_str()),
                ),
                None => None,
            };
            let qualify = |column: &str| match qualifier {
                Some(qualifier) => format!("{}.{}", qualifier, column),
                None => column.to_string(),
            };
            match schema.find_mapping(&c.table, &c.name) {
                Some(mapping) => aliased(&qualify(projection_column(mapping, query_mode)), &c.name),
                None => qualify(&c.name),
            }
        })
        .collect();
    Some(Edit::substitution(
        shorthand.start_index,
        shorthand.stop_index,
        EditKind::Projection,
        EditPayload::Columns(columns),
    ))
}

/// Keeps the logical name on the result set.
fn aliased(physical: &str, logical: &str) -> String {
    format!("{} AS {}", physical, logical)
}
