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

use data_panel_common::config::RewriteConfig;

use crate::rewrite::edit::{Edit, EditSet};
use crate::rewrite::generator::{
    DefaultInsertColumnsGenerator, EditGenerator, InsertColumnsGenerator, InsertValuesGenerator, OnDuplicateKeyAssignmentGenerator,
    PredicateColumnGenerator, PredicateValueGenerator, ProjectionGenerator, UpdateAssignmentGenerator,
};
use crate::rewrite::RewriteContext;
use crate::Result;

/// Runs edit generators one after another over a statement.
///
/// Order matters: the insert values generator aligns rows with the column
/// list written by the default insert columns generator, so it has to run
/// after it.
pub struct RewritePipeline {
    generators: Vec<EditGenerator>,
}

impl RewritePipeline {
    /// An empty pipeline. See [`RewritePipeline::default`] for the full one.
    pub fn new() -> Self {
        RewritePipeline { generators: vec![] }
    }

    pub fn with_generator(mut self, generator: EditGenerator) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn generators(&self) -> &[EditGenerator] {
        &self.generators
    }

    pub fn rewrite(&self, ctx: &RewriteContext<'_>) -> Result<Vec<Edit>> {
        self.rewrite_with(ctx, EditSet::new())
    }

    /// Like [`RewritePipeline::rewrite`], starting from edits another rewrite
    /// already made to the same statement.
    pub fn rewrite_with(&self, ctx: &RewriteContext<'_>, mut edits: EditSet) -> Result<Vec<Edit>> {
        for generator in &self.generators {
            if !generator.applies_to(ctx.statement()) {
                continue;
            }
            let before = edits.len();
            generator.run(ctx, &mut edits)?;
            log::debug!("{}: {} new edit(s)", generator.name(), edits.len() - before);
        }
        let edits = edits.into_sorted()?;
        if RewriteConfig::sql_show() {
            for edit in &edits {
                log::info!("rewrite [{}, {}] {:?}: {}", edit.start_index(), edit.stop_index(), edit.kind(), edit);
            }
        }
        Ok(edits)
    }
}

impl Default for RewritePipeline {
    fn default() -> Self {
        RewritePipeline::new()
            .with_generator(EditGenerator::Stateful(Box::new(DefaultInsertColumnsGenerator)))
            .with_generator(EditGenerator::Collection(Box::new(InsertColumnsGenerator)))
            .with_generator(EditGenerator::Stateful(Box::new(InsertValuesGenerator)))
            .with_generator(EditGenerator::Collection(Box::new(OnDuplicateKeyAssignmentGenerator)))
            .with_generator(EditGenerator::Collection(Box::new(UpdateAssignmentGenerator)))
            .with_generator(EditGenerator::Collection(Box::new(ProjectionGenerator)))
            .with_generator(EditGenerator::Collection(Box::new(PredicateColumnGenerator)))
            .with_generator(EditGenerator::Collection(Box::new(PredicateValueGenerator)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use data_panel_common::common::Error;

    use crate::rewrite::edit::{
        CompanionRole, DefaultInsertColumns, Edit, EditKind, EditPayload, EditSet, InsertValue, ParameterSource, RowProjection,
    };
    use crate::rewrite::generator::{CollectionEditGenerator, EditGenerator, ProjectionGenerator};
    use crate::rewrite::{QueryMode, RewriteContext, RewritePipeline};
    use crate::schema::{ColumnMapping, EncryptSchema};
    use crate::statement::segment::{
        AssignmentSegment, ColumnSegment, Expression, InsertColumnsSegment, InsertRowSegment, InsertValuesSegment, PredicateOperator,
        PredicateSegment, ProjectionSegment, WhereSegment,
    };
    use crate::statement::value::Value;
    use crate::statement::{InsertStatementContext, SQLStatementContext, SelectStatementContext, UpdateStatementContext};
    use crate::test_helpers::{
        column, init_log, literal, parameter, render, span, table, user_schema, AssistedTestEncryptor, TestEncryptor,
    };

    fn where_of(sql: &str, predicates: Vec<PredicateSegment>) -> WhereSegment {
        let (start_index, _) = span(sql, "WHERE", 0);
        WhereSegment {
            start_index,
            stop_index: sql.len() - 1,
            predicates,
        }
    }

    fn row(sql: &str, nth: usize, values: Vec<crate::statement::segment::ExpressionSegment>) -> InsertRowSegment {
        let (start_index, _) = span(sql, "(", nth);
        let (stop_index, _) = span(sql, ")", nth);
        InsertRowSegment::new(start_index, stop_index, values)
    }

    fn abc_schema() -> EncryptSchema {
        EncryptSchema::builder()
            .column(
                "t",
                "a",
                ColumnMapping::new("a_cipher", Arc::new(AssistedTestEncryptor))
                    .with_assisted_query_column("a_assisted")
                    .with_plain_column("a_plain"),
            )
            .column("t", "b", ColumnMapping::new("b_cipher", Arc::new(TestEncryptor)).with_plain_column("b_plain"))
            .build()
            .unwrap()
    }

    fn implicit_insert(sql: &str, declared: &[&str], rows: Vec<InsertRowSegment>) -> SQLStatementContext {
        let table = table(sql, "t");
        let stop_index = table.stop_index;
        SQLStatementContext::Insert(
            InsertStatementContext::new(
                table,
                InsertColumnsSegment::Implicit {
                    stop_index,
                    declared: declared.iter().map(|c| c.to_string()).collect(),
                },
            )
            .with_values(InsertValuesSegment::new(rows)),
        )
    }

    #[test]
    fn test_default_order() {
        let names: Vec<&str> = RewritePipeline::default().generators().iter().map(|g| g.name()).collect();
        assert_eq!(
            names,
            vec![
                "default-insert-columns",
                "insert-columns",
                "insert-values",
                "on-duplicate-key-assignment",
                "update-assignment",
                "projection",
                "predicate-column",
                "predicate-value",
            ]
        );
    }

    #[test]
    fn test_implicit_insert_reverse_order() {
        init_log();
        let schema = abc_schema();
        let sql = "INSERT INTO t VALUES ('x', 'y', 'z')";
        let values = vec![
            literal(sql, "'x'", Value::string("x"), 0),
            literal(sql, "'y'", Value::string("y"), 0),
            literal(sql, "'z'", Value::string("z"), 0),
        ];
        let statement = implicit_insert(sql, &["a", "b", "c"], vec![row(sql, 0, values)]);
        let ctx = RewriteContext::new(&statement, &schema).with_query_mode(QueryMode::ReadCipher);
        let edits = RewritePipeline::default().rewrite(&ctx).unwrap();

        assert_eq!(edits.len(), 2);
        assert_eq!(
            render(sql, &edits),
            "INSERT INTO t (a_cipher, a_assisted, a_plain, b_cipher, b_plain, c) \
             VALUES ('enc(x)', 'ast(x)', 'x', 'enc(y)', 'y', 'z')"
        );
    }

    #[test]
    fn test_parameterized_insert_alignment() {
        let schema = abc_schema();
        let sql = "INSERT INTO t VALUES (?, ?, ?)";
        let statement = implicit_insert(
            sql,
            &["a", "b", "c"],
            vec![row(sql, 0, vec![parameter(sql, 0), parameter(sql, 1), parameter(sql, 2)])],
        );
        let ctx = RewriteContext::new(&statement, &schema);
        let edits = RewritePipeline::default().rewrite(&ctx).unwrap();
        assert_eq!(render(sql, &edits), "INSERT INTO t (a_cipher, a_assisted, a_plain, b_cipher, b_plain, c) VALUES (?, ?, ?, ?, ?, ?)");

        let values = edits.iter().find(|e| e.kind() == EditKind::InsertValues).unwrap();
        let projection = match values.payload() {
            EditPayload::InsertValues(rows) => &rows[0],
            other => panic!("expected insert values, got {:?}", other),
        };
        // 3 original markers, 3 companions bound to parameters
        assert_eq!(projection.parameter_count(), 6);
        assert_eq!(
            projection.parameter_sources(),
            vec![
                ParameterSource::Original(0),
                ParameterSource::Derived {
                    source: 0,
                    role: CompanionRole::AssistedQuery
                },
                ParameterSource::Derived {
                    source: 0,
                    role: CompanionRole::Plain
                },
                ParameterSource::Original(1),
                ParameterSource::Derived {
                    source: 1,
                    role: CompanionRole::Plain
                },
                ParameterSource::Original(2),
            ]
        );
        for (slot, value) in projection.values().iter().enumerate() {
            if let InsertValue::DerivedParameter(derived) = value {
                assert_eq!(derived.ordinal, slot);
            }
        }
    }

    #[test]
    fn test_insert_with_columns_values_and_duplicate_key() {
        let schema = user_schema();
        let sql = "INSERT INTO t_user (id, name, mobile) VALUES (1, 'Al', '555') ON DUPLICATE KEY UPDATE mobile = '556'";
        let (start_index, _) = span(sql, "(", 0);
        let (stop_index, _) = span(sql, ")", 0);
        let values = vec![
            literal(sql, "1", Value::number(1), 0),
            literal(sql, "'Al'", Value::string("Al"), 0),
            literal(sql, "'555'", Value::string("555"), 0),
        ];
        let statement = SQLStatementContext::Insert(
            InsertStatementContext::new(
                table(sql, "t_user"),
                InsertColumnsSegment::Explicit {
                    start_index,
                    stop_index,
                    columns: vec![column(sql, "id", 0), column(sql, "name", 0), column(sql, "mobile", 0)],
                },
            )
            .with_values(InsertValuesSegment::new(vec![row(sql, 1, values)]))
            .with_on_duplicate_key_update(AssignmentSegment::new(
                column(sql, "mobile", 1),
                literal(sql, "'556'", Value::string("556"), 0),
            )),
        );
        let ctx = RewriteContext::new(&statement, &schema);
        let edits = RewritePipeline::default().rewrite(&ctx).unwrap();

        let kinds: Vec<EditKind> = edits.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                EditKind::InsertColumns,
                EditKind::InsertColumns,
                EditKind::InsertValues,
                EditKind::OnDuplicateKeyAssignment
            ]
        );
        assert_eq!(
            render(sql, &edits),
            "INSERT INTO t_user (id, name_cipher, name_assisted, name_plain, mobile_cipher, mobile_plain) \
             VALUES (1, 'enc(Al)', 'ast(Al)', 'Al', 'enc(555)', '555') \
             ON DUPLICATE KEY UPDATE mobile_cipher = 'enc(556)', mobile_plain = '556'"
        );
    }

    #[test]
    fn test_query_mode_switch() {
        let schema = user_schema();
        let sql = "SELECT mobile FROM t_user WHERE mobile = '555'";
        let statement = SQLStatementContext::Select(
            SelectStatementContext::new()
                .with_table(table(sql, "t_user"))
                .with_projection(ProjectionSegment::Column {
                    column: column(sql, "mobile", 0),
                    alias: None,
                })
                .with_where(where_of(
                    sql,
                    vec![PredicateSegment::new(
                        column(sql, "mobile", 1),
                        PredicateOperator::Equal,
                        vec![literal(sql, "'555'", Value::string("555"), 0)],
                    )],
                )),
        );
        let pipeline = RewritePipeline::default();

        let plain = RewriteContext::new(&statement, &schema).with_query_mode(QueryMode::ReadPlain);
        assert_eq!(
            render(sql, &pipeline.rewrite(&plain).unwrap()),
            "SELECT mobile_plain AS mobile FROM t_user WHERE mobile_plain = '555'"
        );
        let cipher = RewriteContext::new(&statement, &schema).with_query_mode(QueryMode::ReadCipher);
        assert_eq!(
            render(sql, &pipeline.rewrite(&cipher).unwrap()),
            "SELECT mobile_cipher AS mobile FROM t_user WHERE mobile_cipher = 'enc(555)'"
        );
    }

    #[test]
    fn test_cipher_only_predicate_round_trip() {
        let schema = EncryptSchema::builder()
            .column("t_user", "name", ColumnMapping::new("name_cipher", Arc::new(TestEncryptor)))
            .build()
            .unwrap();
        let sql = "SELECT id FROM t_user WHERE name = 'Alice'";
        let statement = SQLStatementContext::Select(
            SelectStatementContext::new().with_table(table(sql, "t_user")).with_where(where_of(
                sql,
                vec![PredicateSegment::new(
                    column(sql, "name", 0),
                    PredicateOperator::Equal,
                    vec![literal(sql, "'Alice'", Value::string("Alice"), 0)],
                )],
            )),
        );
        for query_mode in [QueryMode::ReadPlain, QueryMode::ReadCipher].iter() {
            let ctx = RewriteContext::new(&statement, &schema).with_query_mode(*query_mode);
            let first = render(sql, &RewritePipeline::default().rewrite(&ctx).unwrap());
            let second = render(sql, &RewritePipeline::default().rewrite(&ctx).unwrap());
            assert_eq!(first, "SELECT id FROM t_user WHERE name_cipher = 'enc(Alice)'");
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_pass_through() {
        let schema = user_schema();
        let sql = "SELECT id, age FROM t_log WHERE id = 1";
        let statement = SQLStatementContext::Select(
            SelectStatementContext::new()
                .with_table(table(sql, "t_log"))
                .with_projection(ProjectionSegment::Column {
                    column: column(sql, "id", 0),
                    alias: None,
                })
                .with_projection(ProjectionSegment::Column {
                    column: column(sql, "age", 0),
                    alias: None,
                })
                .with_where(where_of(
                    sql,
                    vec![PredicateSegment::new(
                        column(sql, "id", 1),
                        PredicateOperator::Equal,
                        vec![literal(sql, "1", Value::number(1), 0)],
                    )],
                )),
        );
        let ctx = RewriteContext::new(&statement, &schema);
        assert!(RewritePipeline::default().rewrite(&ctx).unwrap().is_empty());
        assert!(RewritePipeline::default()
            .rewrite(&RewriteContext::new(&SQLStatementContext::Default, &schema))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_update_statement() {
        let schema = user_schema();
        let sql = "UPDATE t_user SET name = ?, age = ? WHERE pwd = ?";
        let statement = SQLStatementContext::Update(
            UpdateStatementContext::new(table(sql, "t_user"))
                .with_assignment(AssignmentSegment::new(column(sql, "name", 0), parameter(sql, 0)))
                .with_assignment(AssignmentSegment::new(column(sql, "age", 0), parameter(sql, 1)))
                .with_where(where_of(
                    sql,
                    vec![PredicateSegment::new(column(sql, "pwd", 0), PredicateOperator::Equal, vec![parameter(sql, 2)])],
                )),
        );
        let parameters = vec![Value::string("Bob"), Value::number(30), Value::string("secret")];
        let ctx = RewriteContext::new(&statement, &schema).with_parameters(&parameters);
        let edits = RewritePipeline::default().rewrite(&ctx).unwrap();
        let starts: Vec<usize> = edits.iter().map(|e| e.start_index()).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(
            render(sql, &edits),
            "UPDATE t_user SET name_cipher = ?, name_assisted = ?, name_plain = ?, age = ? WHERE pwd_cipher = ?"
        );
    }

    #[test]
    fn test_seeded_edits_are_extended() {
        let schema = abc_schema();
        let sql = "INSERT INTO t VALUES ('x', 'y', 'z')";
        let values = vec![
            literal(sql, "'x'", Value::string("x"), 0),
            literal(sql, "'y'", Value::string("y"), 0),
            literal(sql, "'z'", Value::string("z"), 0),
        ];
        let row = row(sql, 0, values);
        let statement = implicit_insert(sql, &["a", "b", "c"], vec![row.clone()]);
        let ctx = RewriteContext::new(&statement, &schema);

        // an earlier rewrite appended a generated key column and value
        let (table_stop, _) = span(sql, "t", 0);
        let mut seeded = EditSet::new();
        seeded.push(Edit::insertion(
            table_stop,
            EditKind::DefaultInsertColumns,
            EditPayload::DefaultInsertColumns(DefaultInsertColumns::new(
                vec!["a".to_string(), "b".to_string(), "c".to_string(), "id".to_string()],
                vec![],
            )),
        ));
        let mut projection = RowProjection::from_row(&row);
        projection.insert(3, InsertValue::Original(Expression::Literal(Value::number(9))));
        seeded.push(Edit::substitution(
            row.start_index,
            row.stop_index,
            EditKind::InsertValues,
            EditPayload::InsertValues(vec![projection]),
        ));

        let edits = RewritePipeline::default().rewrite_with(&ctx, seeded).unwrap();
        assert_eq!(edits.len(), 2);
        assert_eq!(
            render(sql, &edits),
            "INSERT INTO t (a_cipher, a_assisted, a_plain, b_cipher, b_plain, c, id) \
             VALUES ('enc(x)', 'ast(x)', 'x', 'enc(y)', 'y', 'z', 9)"
        );
    }

    #[test]
    fn test_overlap_surfaces() {
        let schema = user_schema();
        let sql = "SELECT name FROM t_user";
        let statement = SQLStatementContext::Select(
            SelectStatementContext::new()
                .with_table(table(sql, "t_user"))
                .with_projection(ProjectionSegment::Column {
                    column: column(sql, "name", 0),
                    alias: None,
                }),
        );
        // the same generator twice claims the same span
        let pipeline = RewritePipeline::new()
            .with_generator(EditGenerator::Collection(Box::new(ProjectionGenerator)))
            .with_generator(EditGenerator::Collection(Box::new(ProjectionGenerator)));
        let ctx = RewriteContext::new(&statement, &schema);
        assert!(ProjectionGenerator.applies_to(&statement));
        assert!(matches!(pipeline.rewrite(&ctx), Err(Error::OverlappingEdits { .. })));
    }

    #[test]
    fn test_errors_surface() {
        let schema = user_schema();
        let sql = "INSERT INTO t_user (pwd) VALUES (NOW())";
        let (start_index, stop_index) = span(sql, "(pwd)", 0);
        let (value_start, value_stop) = span(sql, "NOW()", 0);
        let statement = SQLStatementContext::Insert(
            InsertStatementContext::new(
                table(sql, "t_user"),
                InsertColumnsSegment::Explicit {
                    start_index,
                    stop_index,
                    columns: vec![ColumnSegment::new(start_index + 1, stop_index - 1, "pwd")],
                },
            )
            .with_values(InsertValuesSegment::new(vec![InsertRowSegment::new(
                value_start - 1,
                sql.len() - 1,
                vec![crate::statement::segment::ExpressionSegment::new(
                    value_start,
                    value_stop,
                    Expression::Complex("NOW()".to_string()),
                )],
            )])),
        );
        let ctx = RewriteContext::new(&statement, &schema);
        assert!(matches!(
            RewritePipeline::default().rewrite(&ctx),
            Err(Error::UnsupportedExpression(_))
        ));
    }
}
