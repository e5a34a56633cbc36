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

use crate::rewrite::edit::{AssignmentPayload, Edit, EditKind, EditPayload};
use crate::rewrite::generator::{require_single_table, unexpected_statement, CollectionEditGenerator};
use crate::rewrite::RewriteContext;
use crate::schema::{ColumnMapping, EncryptSchema};
use crate::statement::segment::{AssignmentSegment, Expression};
use crate::statement::SQLStatementContext;
use crate::Result;

/// `INSERT ... ON DUPLICATE KEY UPDATE col = v`. Writes the cipher column and,
/// when there is one, the plain column.
pub struct OnDuplicateKeyAssignmentGenerator;

impl CollectionEditGenerator for OnDuplicateKeyAssignmentGenerator {
    fn name(&self) -> &'static str {
        "on-duplicate-key-assignment"
    }

    fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        statement
            .as_insert()
            .map(|insert| !insert.on_duplicate_key_update().is_empty())
            .unwrap_or(false)
    }

    fn generate(&self, ctx: &RewriteContext<'_>) -> Result<Vec<Edit>> {
        let insert = ctx
            .statement()
            .as_insert()
            .ok_or_else(|| unexpected_statement(self.name(), ctx.statement()))?;
        let table = require_single_table(insert.common_ctx(), self.name())?;
        let edits = assignment_edits(
            ctx.schema(),
            table,
            insert.on_duplicate_key_update(),
            EditKind::OnDuplicateKeyAssignment,
            false,
        )?;
        log::debug!("{} duplicate key assignment(s) of `{}` rewritten", edits.len(), table);
        Ok(edits)
    }
}

/// `UPDATE ... SET col = v`. Also keeps the assisted query column in step, so
/// lookups on the updated rows still match.
pub struct UpdateAssignmentGenerator;

impl CollectionEditGenerator for UpdateAssignmentGenerator {
    fn name(&self) -> &'static str {
        "update-assignment"
    }

    fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        statement
            .as_update()
            .map(|update| !update.assignments().is_empty())
            .unwrap_or(false)
    }

    fn generate(&self, ctx: &RewriteContext<'_>) -> Result<Vec<Edit>> {
        let update = ctx
            .statement()
            .as_update()
            .ok_or_else(|| unexpected_statement(self.name(), ctx.statement()))?;
        let table = require_single_table(update.common_ctx(), self.name())?;
        let edits = assignment_edits(ctx.schema(), table, update.assignments(), EditKind::UpdateAssignment, true)?;
        log::debug!("{} update assignment(s) of `{}` rewritten", edits.len(), table);
        Ok(edits)
    }
}

fn assignment_edits(
    schema: &EncryptSchema,
    table: &str,
    assignments: &[AssignmentSegment],
    kind: EditKind,
    with_assisted: bool,
) -> Result<Vec<Edit>> {
    let mut edits = vec![];
    for assignment in assignments {
        let mapping = match schema.find_mapping(table, &assignment.column.name) {
            Some(mapping) => mapping,
            None => continue,
        };
        let payload = match &assignment.value.expr {
            Expression::Parameter(ordinal) => AssignmentPayload::Parameterized {
                columns: destination_columns(mapping, with_assisted),
                ordinal: *ordinal,
            },
            Expression::Literal(value) => {
                let mut pairs = vec![(mapping.cipher_column().to_string(), mapping.encrypt(value)?)];
                if let (true, Some(assisted)) = (with_assisted, mapping.assisted_query_column()) {
                    pairs.push((assisted.to_string(), mapping.assisted_encrypt(value)?));
                }
                if let Some(plain) = mapping.plain_column() {
                    pairs.push((plain.to_string(), value.clone()));
                }
                AssignmentPayload::Literal(pairs)
            }
            Expression::Complex(text) => return Err(Error::UnsupportedExpression(text.clone())),
        };
        edits.push(Edit::substitution(
            assignment.start_index,
            assignment.stop_index,
            kind,
            EditPayload::Assignment(payload),
        ));
    }
    Ok(edits)
}

fn destination_columns(mapping: &ColumnMapping, with_assisted: bool) -> Vec<String> {
    let mut columns = vec![mapping.cipher_column().to_string()];
    if let (true, Some(assisted)) = (with_assisted, mapping.assisted_query_column()) {
        columns.push(assisted.to_string());
    }
    if let Some(plain) = mapping.plain_column() {
        columns.push(plain.to_string());
    }
    columns
}
