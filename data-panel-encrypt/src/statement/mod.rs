//! The parsed surface of one SQL statement, as handed over by the parser.
//!
//! Rewriting only ever reads these contexts.

use crate::schema::EncryptSchema;
use crate::statement::segment::{
    AssignmentSegment, ColumnSegment, InsertColumnsSegment, InsertValuesSegment, ProjectionSegment, TableSegment, WhereSegment,
};

pub mod segment;
pub mod value;

#[derive(Debug, Clone)]
pub enum SQLStatementContext {
    Select(SelectStatementContext),
    Insert(InsertStatementContext),
    Update(UpdateStatementContext),
    Delete(DeleteStatementContext),
    Default,
}

impl SQLStatementContext {
    pub fn add_table(&mut self, table: TableSegment) {
        if let Some(common_ctx) = self.common_ctx_mut() {
            common_ctx.add_table(table);
        }
    }

    pub fn common_ctx(&self) -> Option<&CommonStatementContext> {
        match self {
            SQLStatementContext::Select(s) => Some(&s.common_ctx),
            SQLStatementContext::Insert(s) => Some(&s.common_ctx),
            SQLStatementContext::Update(s) => Some(&s.common_ctx),
            SQLStatementContext::Delete(s) => Some(&s.common_ctx),
            SQLStatementContext::Default => None,
        }
    }

    fn common_ctx_mut(&mut self) -> Option<&mut CommonStatementContext> {
        match self {
            SQLStatementContext::Select(s) => Some(&mut s.common_ctx),
            SQLStatementContext::Insert(s) => Some(&mut s.common_ctx),
            SQLStatementContext::Update(s) => Some(&mut s.common_ctx),
            SQLStatementContext::Delete(s) => Some(&mut s.common_ctx),
            SQLStatementContext::Default => None,
        }
    }

    pub fn tables(&self) -> &[TableSegment] {
        self.common_ctx().map(|c| c.tables()).unwrap_or(&[])
    }

    pub fn where_segment(&self) -> Option<&WhereSegment> {
        self.common_ctx().and_then(|c| c.where_segment())
    }

    pub fn as_select(&self) -> Option<&SelectStatementContext> {
        match self {
            SQLStatementContext::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_insert(&self) -> Option<&InsertStatementContext> {
        match self {
            SQLStatementContext::Insert(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_update(&self) -> Option<&UpdateStatementContext> {
        match self {
            SQLStatementContext::Update(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommonStatementContext {
    tables: Vec<TableSegment>,
    where_segment: Option<WhereSegment>,
}

impl CommonStatementContext {
    pub fn new() -> Self {
        CommonStatementContext {
            tables: Default::default(),
            where_segment: None,
        }
    }

    pub fn add_table(&mut self, table: TableSegment) {
        self.tables.push(table);
    }

    pub fn set_where(&mut self, where_segment: WhereSegment) {
        self.where_segment = Some(where_segment);
    }

    pub fn tables(&self) -> &[TableSegment] {
        &self.tables
    }

    pub fn where_segment(&self) -> Option<&WhereSegment> {
        self.where_segment.as_ref()
    }

    /// The table name when every table segment names the same table.
    pub fn single_table_name(&self) -> Option<&str> {
        let first = self.tables.first()?;
        if self.tables.iter().all(|t| t.name.eq_ignore_ascii_case(&first.name)) {
            Some(&first.name)
        } else {
            None
        }
    }

    /// Resolves the table a column belongs to.
    ///
    /// A qualified column resolves through table names and aliases. An
    /// unqualified one belongs to the only table, or else to the first table
    /// whose encrypt rule knows the column; a column no rule knows stays
    /// unresolved, which downstream means "not encrypted".
    pub fn find_table_name(&self, column: &ColumnSegment, schema: &EncryptSchema) -> Option<&str> {
        let resolved = match &column.owner {
            Some(owner) => self.tables.iter().find(|t| t.is_owned_by(&owner.name)).map(|t| t.name.as_str()),
            None if self.tables.len() == 1 => Some(self.tables[0].name.as_str()),
            None => self
                .tables
                .iter()
                .find(|t| schema.find_mapping(&t.name, &column.name).is_some())
                .map(|t| t.name.as_str()),
        };
        log::trace!("column {:?} resolved to table {:?}", column.name, resolved);
        resolved
    }
}

#[derive(Debug, Clone)]
pub struct SelectStatementContext {
    common_ctx: CommonStatementContext,
    projections: Vec<ProjectionSegment>,
}

impl SelectStatementContext {
    pub fn new() -> Self {
        SelectStatementContext {
            common_ctx: CommonStatementContext::new(),
            projections: vec![],
        }
    }

    pub fn with_table(mut self, table: TableSegment) -> Self {
        self.common_ctx.add_table(table);
        self
    }

    pub fn with_projection(mut self, projection: ProjectionSegment) -> Self {
        self.projections.push(projection);
        self
    }

    pub fn with_where(mut self, where_segment: WhereSegment) -> Self {
        self.common_ctx.set_where(where_segment);
        self
    }

    pub fn common_ctx(&self) -> &CommonStatementContext {
        &self.common_ctx
    }

    pub fn projections(&self) -> &[ProjectionSegment] {
        &self.projections
    }
}

impl Default for SelectStatementContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct InsertStatementContext {
    common_ctx: CommonStatementContext,
    columns: InsertColumnsSegment,
    values: Option<InsertValuesSegment>,
    on_duplicate_key_update: Vec<AssignmentSegment>,
}

impl InsertStatementContext {
    pub fn new(table: TableSegment, columns: InsertColumnsSegment) -> Self {
        let mut common_ctx = CommonStatementContext::new();
        common_ctx.add_table(table);
        InsertStatementContext {
            common_ctx,
            columns,
            values: None,
            on_duplicate_key_update: vec![],
        }
    }

    pub fn with_values(mut self, values: InsertValuesSegment) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_on_duplicate_key_update(mut self, assignment: AssignmentSegment) -> Self {
        self.on_duplicate_key_update.push(assignment);
        self
    }

    pub fn common_ctx(&self) -> &CommonStatementContext {
        &self.common_ctx
    }

    pub fn columns(&self) -> &InsertColumnsSegment {
        &self.columns
    }

    pub fn values(&self) -> Option<&InsertValuesSegment> {
        self.values.as_ref()
    }

    pub fn on_duplicate_key_update(&self) -> &[AssignmentSegment] {
        &self.on_duplicate_key_update
    }

    pub fn is_implicit_columns(&self) -> bool {
        matches!(self.columns, InsertColumnsSegment::Implicit { .. })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateStatementContext {
    common_ctx: CommonStatementContext,
    assignments: Vec<AssignmentSegment>,
}

impl UpdateStatementContext {
    pub fn new(table: TableSegment) -> Self {
        let mut common_ctx = CommonStatementContext::new();
        common_ctx.add_table(table);
        UpdateStatementContext {
            common_ctx,
            assignments: vec![],
        }
    }

    pub fn with_assignment(mut self, assignment: AssignmentSegment) -> Self {
        self.assignments.push(assignment);
        self
    }

    pub fn with_where(mut self, where_segment: WhereSegment) -> Self {
        self.common_ctx.set_where(where_segment);
        self
    }

    pub fn common_ctx(&self) -> &CommonStatementContext {
        &self.common_ctx
    }

    pub fn assignments(&self) -> &[AssignmentSegment] {
        &self.assignments
    }
}

#[derive(Debug, Clone)]
pub struct DeleteStatementContext {
    common_ctx: CommonStatementContext,
}

impl DeleteStatementContext {
    pub fn new(table: TableSegment) -> Self {
        let mut common_ctx = CommonStatementContext::new();
        common_ctx.add_table(table);
        DeleteStatementContext { common_ctx }
    }

    pub fn with_where(mut self, where_segment: WhereSegment) -> Self {
        self.common_ctx.set_where(where_segment);
        self
    }

    pub fn common_ctx(&self) -> &CommonStatementContext {
        &self.common_ctx
    }
}
