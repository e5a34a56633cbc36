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

//! Source segments of a parsed statement.
//!
//! Every segment remembers where it came from in the original SQL text as a
//! pair of byte offsets, `start_index` and `stop_index`, both inclusive.

use std::fmt;

use crate::statement::value::Value;

/// A table in `FROM`, `UPDATE`, `DELETE FROM` or `INSERT INTO`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub name: String,
    pub alias: Option<String>,
}

impl TableSegment {
    pub fn new<S: Into<String>>(start_index: usize, stop_index: usize, name: S) -> Self {
        TableSegment {
            start_index,
            stop_index,
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_alias<S: Into<String>>(mut self, alias: S) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Whether `owner` (a column qualifier) refers to this table.
    pub fn is_owned_by(&self, owner: &str) -> bool {
        match &self.alias {
            Some(alias) if alias.eq_ignore_ascii_case(owner) => true,
            _ => self.name.eq_ignore_ascii_case(owner),
        }
    }
}

/// The `t` of `t.col` or `t.*`.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub name: String,
}

impl OwnerSegment {
    pub fn new<S: Into<String>>(start_index: usize, stop_index: usize, name: S) -> Self {
        OwnerSegment {
            start_index,
            stop_index,
            name: name.into(),
        }
    }
}

/// A column reference, optionally qualified. The span covers the qualifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub owner: Option<OwnerSegment>,
    pub name: String,
}

impl ColumnSegment {
    pub fn new<S: Into<String>>(start_index: usize, stop_index: usize, name: S) -> Self {
        ColumnSegment {
            start_index,
            stop_index,
            owner: None,
            name: name.into(),
        }
    }

    pub fn with_owner(mut self, owner: OwnerSegment) -> Self {
        self.owner = Some(owner);
        self
    }

    /// First index of the bare column name, skipping `owner.`.
    pub fn name_start_index(&self) -> usize {
        match &self.owner {
            Some(owner) => owner.stop_index + 2,
            None => self.start_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// A `?` marker with its statement wide ordinal
    Parameter(usize),
    /// Anything else, kept as source text
    Complex(String),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Parameter(_) => f.write_str("?"),
            Expression::Complex(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub expr: Expression,
}

impl ExpressionSegment {
    pub fn new(start_index: usize, stop_index: usize, expr: Expression) -> Self {
        ExpressionSegment {
            start_index,
            stop_index,
            expr,
        }
    }
}

/// One item of a `SELECT` list.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionSegment {
    Column {
        column: ColumnSegment,
        alias: Option<String>,
    },
    Shorthand(ShorthandProjectionSegment),
    Expression {
        start_index: usize,
        stop_index: usize,
        text: String,
    },
}

/// `*` or `t.*`, with the columns it stands for resolved from metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ShorthandProjectionSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub owner: Option<OwnerSegment>,
    pub actual_columns: Vec<ShorthandColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShorthandColumn {
    pub table: String,
    pub name: String,
}

impl ShorthandColumn {
    pub fn new<T: Into<String>, N: Into<String>>(table: T, name: N) -> Self {
        ShorthandColumn {
            table: table.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOperator {
    Equal,
    NotEqual,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

impl PredicateOperator {
    /// Text placed between two consecutive right hand values.
    pub fn value_separator(&self) -> &'static str {
        match self {
            PredicateOperator::Between | PredicateOperator::NotBetween => " AND ",
            _ => ", ",
        }
    }
}

/// A simple comparison `column <op> values` inside a `WHERE` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub column: ColumnSegment,
    pub operator: PredicateOperator,
    pub values: Vec<ExpressionSegment>,
}

impl PredicateSegment {
    pub fn new(column: ColumnSegment, operator: PredicateOperator, values: Vec<ExpressionSegment>) -> Self {
        let start_index = column.start_index;
        let stop_index = values.last().map(|v| v.stop_index).unwrap_or(column.stop_index);
        PredicateSegment {
            start_index,
            stop_index,
            column,
            operator,
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub predicates: Vec<PredicateSegment>,
}

/// `column = value`, in `UPDATE ... SET` or `ON DUPLICATE KEY UPDATE`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub column: ColumnSegment,
    pub value: ExpressionSegment,
}

impl AssignmentSegment {
    pub fn new(column: ColumnSegment, value: ExpressionSegment) -> Self {
        AssignmentSegment {
            start_index: column.start_index,
            stop_index: value.stop_index,
            column,
            value,
        }
    }
}

/// The column list of an `INSERT`.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertColumnsSegment {
    /// `(a, b, c)` written out in the statement; the span covers the parentheses.
    Explicit {
        start_index: usize,
        stop_index: usize,
        columns: Vec<ColumnSegment>,
    },
    /// No column list: values follow the table's declared column order.
    /// A column list written later goes right after `stop_index`.
    Implicit { stop_index: usize, declared: Vec<String> },
}

impl InsertColumnsSegment {
    /// Logical column names in value order.
    pub fn column_names(&self) -> Vec<String> {
        match self {
            InsertColumnsSegment::Explicit { columns, .. } => columns.iter().map(|c| c.name.clone()).collect(),
            InsertColumnsSegment::Implicit { declared, .. } => declared.clone(),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        match self {
            InsertColumnsSegment::Explicit { columns, .. } => columns.iter().any(|c| c.name.eq_ignore_ascii_case(column)),
            InsertColumnsSegment::Implicit { declared, .. } => declared.iter().any(|c| c.eq_ignore_ascii_case(column)),
        }
    }
}

/// `VALUES (...), (...)`; the span runs from the first row's opening
/// parenthesis to the last row's closing one.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertValuesSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub rows: Vec<InsertRowSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertRowSegment {
    pub start_index: usize,
    pub stop_index: usize,
    pub values: Vec<ExpressionSegment>,
}

impl InsertRowSegment {
    pub fn new(start_index: usize, stop_index: usize, values: Vec<ExpressionSegment>) -> Self {
        InsertRowSegment {
            start_index,
            stop_index,
            values,
        }
    }
}

impl InsertValuesSegment {
    pub fn new(rows: Vec<InsertRowSegment>) -> Self {
        let start_index = rows.first().map(|r| r.start_index).unwrap_or_default();
        let stop_index = rows.last().map(|r| r.stop_index).unwrap_or_default();
        InsertValuesSegment {
            start_index,
            stop_index,
            rows,
        }
    }
}
