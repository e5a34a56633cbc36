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

use std::collections::HashMap;
use std::fmt;

use data_panel_common::common::Error;

use crate::statement::segment::{Expression, InsertRowSegment, PredicateOperator};
use crate::statement::value::Value;
use crate::Result;

/// Which construct an edit rewrites. At most one edit per kind is looked up
/// by later generators, see [`EditSet::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    InsertColumns,
    DefaultInsertColumns,
    InsertValues,
    OnDuplicateKeyAssignment,
    UpdateAssignment,
    Projection,
    PredicateColumn,
    PredicateValue,
}

/// How an edit is applied to the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditShape {
    /// Replaces `[start_index, stop_index]`.
    Substitution,
    /// Zero width, goes right after `start_index`.
    Insertion,
    /// Replaces its span with one rendered sub payload per row.
    Collection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditPayload {
    Columns(Vec<String>),
    DefaultInsertColumns(DefaultInsertColumns),
    InsertValues(Vec<RowProjection>),
    Assignment(AssignmentPayload),
    PredicateValues(PredicateValues),
}

/// A position anchored change to the original SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    start_index: usize,
    stop_index: usize,
    kind: EditKind,
    payload: EditPayload,
}

impl Edit {
    pub fn substitution(start_index: usize, stop_index: usize, kind: EditKind, payload: EditPayload) -> Self {
        Edit {
            start_index,
            stop_index,
            kind,
            payload,
        }
    }

    pub fn insertion(index: usize, kind: EditKind, payload: EditPayload) -> Self {
        Edit {
            start_index: index,
            stop_index: index,
            kind,
            payload,
        }
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    pub fn kind(&self) -> EditKind {
        self.kind
    }

    pub fn payload(&self) -> &EditPayload {
        &self.payload
    }

    pub(crate) fn payload_mut(&mut self) -> &mut EditPayload {
        &mut self.payload
    }

    pub fn shape(&self) -> EditShape {
        match self.payload {
            EditPayload::DefaultInsertColumns(_) => EditShape::Insertion,
            EditPayload::InsertValues(_) => EditShape::Collection,
            _ => EditShape::Substitution,
        }
    }

    pub fn is_zero_width(&self) -> bool {
        self.shape() == EditShape::Insertion
    }

    fn conflicts_with(&self, other: &Edit) -> bool {
        match (self.is_zero_width(), other.is_zero_width()) {
            (false, false) => self.start_index <= other.stop_index && other.start_index <= self.stop_index,
            // an insertion lands between `index` and `index + 1`
            (true, false) => other.start_index <= self.start_index && self.start_index < other.stop_index,
            (false, true) => other.conflicts_with(self),
            (true, true) => false,
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload)
    }
}

impl fmt::Display for EditPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditPayload::Columns(columns) => f.write_str(&columns.join(", ")),
            EditPayload::DefaultInsertColumns(columns) => write!(f, " ({})", columns.columns.join(", ")),
            EditPayload::InsertValues(rows) => {
                let mut delim = "";
                for row in rows {
                    write!(f, "{}{}", delim, row)?;
                    delim = ", ";
                }
                Ok(())
            }
            EditPayload::Assignment(assignment) => write!(f, "{}", assignment),
            EditPayload::PredicateValues(values) => write!(f, "{}", values),
        }
    }
}

/// Column list written after the table of an `INSERT` without one.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultInsertColumns {
    declared: Vec<String>,
    columns: Vec<String>,
}

impl DefaultInsertColumns {
    pub fn new(declared: Vec<String>, columns: Vec<String>) -> Self {
        DefaultInsertColumns { declared, columns }
    }

    /// Logical columns the row values are aligned with.
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    /// Physical columns written to the statement.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(crate) fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionRole {
    Plain,
    AssistedQuery,
}

/// A `?` added for a companion column. Its value is the bound value of
/// parameter `source`, copied (plain) or turned into an assisted token.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedParameter {
    pub ordinal: usize,
    pub source: usize,
    pub role: CompanionRole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertValue {
    Original(Expression),
    Encrypted(Value),
    Derived(Value),
    DerivedParameter(DerivedParameter),
}

impl fmt::Display for InsertValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertValue::Original(expr) => write!(f, "{}", expr),
            InsertValue::Encrypted(v) | InsertValue::Derived(v) => write!(f, "{}", v),
            InsertValue::DerivedParameter(_) => f.write_str("?"),
        }
    }
}

/// Where the value of one bind slot of a rewritten row comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSource {
    Original(usize),
    Derived { source: usize, role: CompanionRole },
}

/// The value list of one inserted row, aligned with the rewritten columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RowProjection {
    values: Vec<InsertValue>,
}

impl RowProjection {
    pub fn from_row(row: &InsertRowSegment) -> Self {
        RowProjection {
            values: row.values.iter().map(|v| InsertValue::Original(v.expr.clone())).collect(),
        }
    }

    pub fn values(&self) -> &[InsertValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&InsertValue> {
        self.values.get(index)
    }

    pub(crate) fn insert(&mut self, index: usize, value: InsertValue) {
        self.values.insert(index, value);
    }

    pub(crate) fn set(&mut self, index: usize, value: InsertValue) {
        self.values[index] = value;
    }

    /// Markers currently in the row, original and derived.
    pub fn parameter_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| matches!(v, InsertValue::Original(Expression::Parameter(_)) | InsertValue::DerivedParameter(_)))
            .count()
    }

    /// Gives every derived marker the bind slot it ended up in.
    pub(crate) fn renumber_parameters(&mut self) {
        let mut slot = 0;
        for value in self.values.iter_mut() {
            match value {
                InsertValue::Original(Expression::Parameter(_)) => slot += 1,
                InsertValue::DerivedParameter(derived) => {
                    derived.ordinal = slot;
                    slot += 1;
                }
                _ => {}
            }
        }
    }

    /// Bind slots of the row in order.
    pub fn parameter_sources(&self) -> Vec<ParameterSource> {
        self.values
            .iter()
            .filter_map(|v| match v {
                InsertValue::Original(Expression::Parameter(ordinal)) => Some(ParameterSource::Original(*ordinal)),
                InsertValue::DerivedParameter(derived) => Some(ParameterSource::Derived {
                    source: derived.source,
                    role: derived.role,
                }),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for RowProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut delim = "";
        for value in &self.values {
            write!(f, "{}{}", delim, value)?;
            delim = ", ";
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentPayload {
    /// Physical destination columns of one bound value, in order.
    Parameterized { columns: Vec<String>, ordinal: usize },
    Literal(Vec<(String, Value)>),
}

impl fmt::Display for AssignmentPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut delim = "";
        match self {
            AssignmentPayload::Parameterized { columns, .. } => {
                for column in columns {
                    write!(f, "{}{} = ?", delim, column)?;
                    delim = ", ";
                }
            }
            AssignmentPayload::Literal(pairs) => {
                for (column, value) in pairs {
                    write!(f, "{}{} = {}", delim, column, value)?;
                    delim = ", ";
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Literal(Value),
    /// The marker stays `?`; `value` is what must be bound at `ordinal`.
    Parameter { ordinal: usize, value: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicateValues {
    operator: PredicateOperator,
    values: Vec<PredicateValue>,
}

impl PredicateValues {
    pub fn new(operator: PredicateOperator, values: Vec<PredicateValue>) -> Self {
        PredicateValues { operator, values }
    }

    pub fn operator(&self) -> PredicateOperator {
        self.operator
    }

    pub fn values(&self) -> &[PredicateValue] {
        &self.values
    }

    /// Re-bound parameters as `(ordinal, value)`.
    pub fn parameters(&self) -> Vec<(usize, &Value)> {
        self.values
            .iter()
            .filter_map(|v| match v {
                PredicateValue::Parameter { ordinal, value } => Some((*ordinal, value)),
                PredicateValue::Literal(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for PredicateValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut delim = "";
        for value in &self.values {
            f.write_str(delim)?;
            match value {
                PredicateValue::Literal(v) => write!(f, "{}", v)?,
                PredicateValue::Parameter { .. } => f.write_str("?")?,
            }
            delim = self.operator.value_separator();
        }
        Ok(())
    }
}

/// Edits of one pipeline run, in generation order, with the position of the
/// first edit of every kind.
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: Vec<Edit>,
    index: HashMap<EditKind, usize>,
}

impl EditSet {
    pub fn new() -> Self {
        EditSet::default()
    }

    pub fn push(&mut self, edit: Edit) {
        self.index.entry(edit.kind).or_insert(self.edits.len());
        self.edits.push(edit);
    }

    pub fn find(&self, kind: EditKind) -> Option<&Edit> {
        self.index.get(&kind).map(|&i| &self.edits[i])
    }

    /// Extends the edit of `kind` when one exists, else pushes what `build`
    /// makes of the statement (if anything).
    pub fn upsert<B, X>(&mut self, kind: EditKind, build: B, extend: X) -> Result<()>
    where
        B: FnOnce() -> Result<Option<Edit>>,
        X: FnOnce(&mut Edit) -> Result<()>,
    {
        if let Some(&i) = self.index.get(&kind) {
            return extend(&mut self.edits[i]);
        }
        if let Some(edit) = build()? {
            if edit.kind != kind {
                return Err(Error::ConfigIntegrity(format!("built a {:?} edit for {:?}", edit.kind, kind)));
            }
            self.push(edit);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter()
    }

    /// Fails on the first pair of conflicting edits.
    pub fn validate(&self) -> Result<()> {
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        ordered.sort_by_key(|e| (e.start_index, e.stop_index));
        for (i, edit) in ordered.iter().enumerate() {
            for other in &ordered[i + 1..] {
                if other.start_index > edit.stop_index {
                    break;
                }
                if edit.conflicts_with(other) {
                    return Err(Error::OverlappingEdits {
                        first: (edit.start_index, edit.stop_index),
                        second: (other.start_index, other.stop_index),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validated edits ordered by `start_index`; same point insertions keep
    /// their generation order.
    pub fn into_sorted(self) -> Result<Vec<Edit>> {
        self.validate()?;
        let mut edits = self.edits;
        edits.sort_by_key(|e| e.start_index);
        Ok(edits)
    }
}
