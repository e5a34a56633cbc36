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
use crate::rewrite::generator::{contains_ignore_case, physical_columns, require_single_table, unexpected_statement, CollectionEditGenerator};
use crate::rewrite::RewriteContext;
use crate::statement::segment::InsertColumnsSegment;
use crate::statement::SQLStatementContext;
use crate::Result;

/// Expands each encrypted column of an explicit `INSERT` column list.
pub struct InsertColumnsGenerator;

impl CollectionEditGenerator for InsertColumnsGenerator {
    fn name(&self) -> &'static str {
        "insert-columns"
    }

    fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        statement.as_insert().map(|insert| !insert.is_implicit_columns()).unwrap_or(false)
    }

    fn generate(&self, ctx: &RewriteContext<'_>) -> Result<Vec<Edit>> {
        let insert = ctx
            .statement()
            .as_insert()
            .ok_or_else(|| unexpected_statement(self.name(), ctx.statement()))?;
        let columns = match insert.columns() {
            InsertColumnsSegment::Explicit { columns, .. } => columns,
            InsertColumnsSegment::Implicit { .. } => return Err(unexpected_statement(self.name(), ctx.statement())),
        };
        let table = require_single_table(insert.common_ctx(), self.name())?;
        let destinations = insert.columns().column_names();

        let mut result = vec![];
        for column in columns {
            if let Some(mapping) = ctx.schema().find_mapping(table, &column.name) {
                let physical = physical_columns(mapping, |c| contains_ignore_case(&destinations, c));
                result.push(Edit::substitution(
                    column.name_start_index(),
                    column.stop_index,
                    EditKind::InsertColumns,
                    EditPayload::Columns(physical),
                ));
            }
        }
        log::debug!("{} insert column(s) of `{}` expanded", result.len(), table);
        Ok(result)
    }
}
