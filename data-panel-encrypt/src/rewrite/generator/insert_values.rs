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

use crate::rewrite::edit::{CompanionRole, DerivedParameter, Edit, EditKind, EditPayload, EditSet, InsertValue, RowProjection};
use crate::rewrite::generator::{
    assisted_companion, contains_ignore_case, plain_companion, require_single_table, unexpected_statement, StatefulEditGenerator,
};
use crate::rewrite::RewriteContext;
use crate::schema::ColumnMapping;
use crate::statement::segment::Expression;
use crate::statement::SQLStatementContext;
use crate::Result;

/// Encrypts the values of every inserted row and adds the companion values
/// that line up with the columns added by the column generators.
pub struct InsertValuesGenerator;

impl StatefulEditGenerator for InsertValuesGenerator {
    fn name(&self) -> &'static str {
        "insert-values"
    }

    fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        statement
            .as_insert()
            .and_then(|insert| insert.values())
            .map(|values| !values.rows.is_empty())
            .unwrap_or(false)
    }

    fn generate(&self, ctx: &RewriteContext<'_>, edits: &mut EditSet) -> Result<()> {
        let insert = ctx
            .statement()
            .as_insert()
            .ok_or_else(|| unexpected_statement(self.name(), ctx.statement()))?;
        let values = insert
            .values()
            .ok_or_else(|| unexpected_statement(self.name(), ctx.statement()))?;
        let table = require_single_table(insert.common_ctx(), self.name())?;
        // an empty row list has no span to rewrite
        if values.rows.is_empty() || !ctx.schema().is_encrypted_table(table) {
            return Ok(());
        }

        // values follow the logical list, whatever physical list gets written
        let logical = match edits.find(EditKind::DefaultInsertColumns).map(|e| e.payload()) {
            Some(EditPayload::DefaultInsertColumns(columns)) => columns.declared().to_vec(),
            Some(other) => {
                return Err(Error::ConfigIntegrity(format!("default insert columns edit carries {:?}", other)));
            }
            None => insert.columns().column_names(),
        };
        let encrypted: Vec<(usize, &ColumnMapping)> = logical
            .iter()
            .enumerate()
            .filter_map(|(ordinal, column)| ctx.schema().find_mapping(table, column).map(|m| (ordinal, m)))
            .collect();
        if encrypted.is_empty() {
            return Ok(());
        }
        let projector = RowProjector {
            logical: &logical,
            encrypted: &encrypted,
        };

        edits.upsert(
            EditKind::InsertValues,
            || {
                let mut rows = Vec::with_capacity(values.rows.len());
                for row in &values.rows {
                    let mut projection = RowProjection::from_row(row);
                    projector.project(&mut projection)?;
                    rows.push(projection);
                }
                log::debug!("{} row(s) of `{}` encrypted", rows.len(), table);
                Ok(Some(Edit::substitution(
                    values.start_index,
                    values.stop_index,
                    EditKind::InsertValues,
                    EditPayload::InsertValues(rows),
                )))
            },
            |edit| match edit.payload_mut() {
                EditPayload::InsertValues(rows) => {
                    for projection in rows.iter_mut() {
                        projector.project(projection)?;
                    }
                    log::debug!("{} prior row(s) of `{}` encrypted", rows.len(), table);
                    Ok(())
                }
                other => Err(Error::ConfigIntegrity(format!("insert values edit carries {:?}", other))),
            },
        )
    }
}

struct RowProjector<'a> {
    logical: &'a [String],
    /// Encrypted columns with their ordinal in `logical`, ascending.
    encrypted: &'a [(usize, &'a ColumnMapping)],
}

impl<'a> RowProjector<'a> {
    /// Visits encrypted columns last to first, the same order the column
    /// generators expand them in, so companions inserted after one ordinal
    /// never move an ordinal still to be visited.
    fn project(&self, row: &mut RowProjection) -> Result<()> {
        let is_destination = |c: &str| contains_ignore_case(self.logical, c);
        for &(ordinal, mapping) in self.encrypted.iter().rev() {
            let expr = match row.get(ordinal) {
                Some(InsertValue::Original(expr)) => expr.clone(),
                Some(other) => {
                    return Err(Error::ConfigIntegrity(format!(
                        "value `{}` at ordinal {} of row {} is already rewritten",
                        other, ordinal, row
                    )));
                }
                None => {
                    return Err(Error::ConfigIntegrity(format!("row {} has no value at ordinal {}", row, ordinal)));
                }
            };
            match expr {
                Expression::Literal(value) => {
                    if plain_companion(mapping, &is_destination).is_some() {
                        row.insert(ordinal + 1, InsertValue::Derived(value.clone()));
                    }
                    if assisted_companion(mapping, &is_destination).is_some() {
                        row.insert(ordinal + 1, InsertValue::Derived(mapping.assisted_encrypt(&value)?));
                    }
                    row.set(ordinal, InsertValue::Encrypted(mapping.encrypt(&value)?));
                }
                Expression::Parameter(source) => {
                    // bound values are encrypted at bind time
                    if plain_companion(mapping, &is_destination).is_some() {
                        let derived = derived_parameter(row, source, CompanionRole::Plain);
                        row.insert(ordinal + 1, derived);
                    }
                    if assisted_companion(mapping, &is_destination).is_some() {
                        let derived = derived_parameter(row, source, CompanionRole::AssistedQuery);
                        row.insert(ordinal + 1, derived);
                    }
                }
                Expression::Complex(text) => return Err(Error::UnsupportedExpression(text)),
            }
        }
        row.renumber_parameters();
        Ok(())
    }
}

fn derived_parameter(row: &RowProjection, source: usize, role: CompanionRole) -> InsertValue {
    InsertValue::DerivedParameter(DerivedParameter {
        ordinal: row.parameter_count(),
        source,
        role,
    })
}
