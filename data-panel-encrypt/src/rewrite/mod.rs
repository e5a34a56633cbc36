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

//! Token based rewriting of statements that touch encrypted columns.

use data_panel_common::common::Error;
use data_panel_common::config::{PropsConfig, RewriteConfig};

use crate::schema::EncryptSchema;
use crate::statement::value::Value;
use crate::statement::SQLStatementContext;
use crate::Result;

pub mod edit;
pub mod generator;
mod pipeline;

pub use self::edit::{Edit, EditKind, EditPayload, EditSet, EditShape};
pub use self::pipeline::RewritePipeline;

/// Which physical column a read prefers when a plain column exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    ReadPlain,
    ReadCipher,
}

impl QueryMode {
    pub fn from_props(props: &PropsConfig) -> Self {
        if props.query_with_cipher_column() {
            QueryMode::ReadCipher
        } else {
            QueryMode::ReadPlain
        }
    }

    /// The mode configured in the current rewrite config.
    pub fn current() -> Self {
        QueryMode::from_props(RewriteConfig::current().props())
    }
}

/// Everything one pipeline run reads.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    statement: &'a SQLStatementContext,
    schema: &'a EncryptSchema,
    query_mode: QueryMode,
    parameters: &'a [Value],
}

impl<'a> RewriteContext<'a> {
    pub fn new(statement: &'a SQLStatementContext, schema: &'a EncryptSchema) -> Self {
        RewriteContext {
            statement,
            schema,
            query_mode: QueryMode::current(),
            parameters: &[],
        }
    }

    pub fn with_query_mode(mut self, query_mode: QueryMode) -> Self {
        self.query_mode = query_mode;
        self
    }

    /// Values bound to the statement's parameter markers, by ordinal.
    pub fn with_parameters(mut self, parameters: &'a [Value]) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn statement(&self) -> &'a SQLStatementContext {
        self.statement
    }

    pub fn schema(&self) -> &'a EncryptSchema {
        self.schema
    }

    pub fn query_mode(&self) -> QueryMode {
        self.query_mode
    }

    pub fn parameter(&self, ordinal: usize) -> Result<&'a Value> {
        self.parameters.get(ordinal).ok_or(Error::MissingParameter(ordinal))
    }
}
