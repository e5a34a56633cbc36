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

//! `WHERE` predicates on encrypted columns. Columns and values are rewritten
//! by two generators that agree on the column through [`predicate_column`].

use data_panel_common::common::Error;

use crate::rewrite::edit::{Edit, EditKind, EditPayload, PredicateValue, PredicateValues};
use crate::rewrite::generator::{predicate_column, unexpected_statement, CollectionEditGenerator, QueryColumn};
use crate::rewrite::RewriteContext;
use crate::schema::ColumnMapping;
use crate::statement::segment::{Expression, PredicateSegment};
use crate::statement::value::Value;
use crate::statement::SQLStatementContext;
use crate::Result;

fn has_where(statement: &SQLStatementContext) -> bool {
    match statement {
        SQLStatementContext::Select(_) | SQLStatementContext::Update(_) | SQLStatementContext::Delete(_) => {
            statement.where_segment().is_some()
        }
        _ => false,
    }
}

/// Predicates of the statement with the mapping of their column, skipping
/// those on columns nothing encrypts.
fn encrypted_predicates<'a>(
    generator: &str,
    ctx: &RewriteContext<'a>,
) -> Result<Vec<(&'a PredicateSegment, &'a ColumnMapping)>> {
    let statement = ctx.statement();
    let common_ctx = statement
        .common_ctx()
        .ok_or_else(|| unexpected_statement(generator, statement))?;
    if common_ctx.tables().is_empty() {
        return Err(Error::ConfigIntegrity(format!("{} found a WHERE clause without tables", generator)));
    }
    let where_segment = common_ctx
        .where_segment()
        .ok_or_else(|| unexpected_statement(generator, statement))?;
    let schema = ctx.schema();
    Ok(where_segment
        .predicates
        .iter()
        .filter_map(|predicate| {
            common_ctx
                .find_table_name(&predicate.column, schema)
                .and_then(|table| schema.find_mapping(table, &predicate.column.name))
                .map(|mapping| (predicate, mapping))
        })
        .collect())
}

pub struct PredicateColumnGenerator;

impl CollectionEditGenerator for PredicateColumnGenerator {
    fn name(&self) -> &'static str {
        "predicate-column"
    }

    fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        has_where(statement)
    }

    fn generate(&self, ctx: &RewriteContext<'_>) -> Result<Vec<Edit>> {
        let edits: Vec<Edit> = encrypted_predicates(self.name(), ctx)?
            .into_iter()
            .map(|(predicate, mapping)| {
                let column = &predicate.column;
                Edit::substitution(
                    column.name_start_index(),
                    column.stop_index,
                    EditKind::PredicateColumn,
                    EditPayload::Columns(vec![predicate_column(mapping, ctx.query_mode()).name().to_string()]),
                )
            })
            .collect();
        log::debug!("{} predicate column(s) rewritten", edits.len());
        Ok(edits)
    }
}

/// Encrypts the right hand side of predicates compared against the cipher or
/// assisted query column. Bound markers stay `?`; the edit carries the value
/// to bind instead.
pub struct PredicateValueGenerator;

impl CollectionEditGenerator for PredicateValueGenerator {
    fn name(&self) -> &'static str {
        "predicate-value"
    }

    fn applies_to(&self, statement: &SQLStatementContext) -> bool {
        has_where(statement)
    }

    fn generate(&self, ctx: &RewriteContext<'_>) -> Result<Vec<Edit>> {
        let mut edits = vec![];
        for (predicate, mapping) in encrypted_predicates(self.name(), ctx)? {
            let (first, last) = match (predicate.values.first(), predicate.values.last()) {
                (Some(first), Some(last)) => (first, last),
                _ => continue,
            };
            let query_column = predicate_column(mapping, ctx.query_mode());
            if let QueryColumn::Plain(_) = query_column {
                continue;
            }
            let mut values = Vec::with_capacity(predicate.values.len());
            for value in &predicate.values {
                values.push(match &value.expr {
                    Expression::Literal(v) => PredicateValue::Literal(encrypt_for(query_column, mapping, v)?),
                    Expression::Parameter(ordinal) => PredicateValue::Parameter {
                        ordinal: *ordinal,
                        value: encrypt_for(query_column, mapping, ctx.parameter(*ordinal)?)?,
                    },
                    Expression::Complex(text) => return Err(Error::UnsupportedExpression(text.clone())),
                });
            }
            edits.push(Edit::substitution(
                first.start_index,
                last.stop_index,
                EditKind::PredicateValue,
                EditPayload::PredicateValues(PredicateValues::new(predicate.operator, values)),
            ));
        }
        log::debug!("{} predicate value list(s) rewritten", edits.len());
        Ok(edits)
    }
}

fn encrypt_for(query_column: QueryColumn<'_>, mapping: &ColumnMapping, value: &Value) -> Result<Value> {
    match query_column {
        QueryColumn::AssistedQuery(_) => mapping.assisted_encrypt(value),
        QueryColumn::Cipher(_) => mapping.encrypt(value),
        QueryColumn::Plain(_) => Ok(value.clone()),
    }
}
