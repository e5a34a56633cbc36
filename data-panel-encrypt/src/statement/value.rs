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

use std::fmt;

/// Primitive SQL values such as number and string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Numeric literal, kept in its source spelling
    Number(String),
    /// 'string value'
    SingleQuotedString(String),
    /// "string value"
    DoubleQuotedString(String),
    /// X'hex value'
    HexStringLiteral(String),
    Boolean(bool),
    /// `NULL` value
    Null,
}

impl Value {
    pub fn string<S: Into<String>>(value: S) -> Self {
        Value::SingleQuotedString(value.into())
    }

    pub fn number<S: ToString>(value: S) -> Self {
        Value::Number(value.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value without SQL quoting, as handed to encryptors.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::Number(v)
            | Value::SingleQuotedString(v)
            | Value::DoubleQuotedString(v)
            | Value::HexStringLiteral(v) => v.clone(),
            Value::Boolean(v) => v.to_string(),
            Value::Null => "NULL".to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", v),
            Value::SingleQuotedString(v) => write!(f, "'{}'", escape_single_quote_string(v)),
            Value::DoubleQuotedString(v) => write!(f, "\"{}\"", v),
            Value::HexStringLiteral(v) => write!(f, "X'{}'", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Null => write!(f, "NULL"),
        }
    }
}

pub struct EscapeSingleQuoteString<'a>(&'a str);

impl<'a> fmt::Display for EscapeSingleQuoteString<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            if c == '\'' {
                write!(f, "\'\'")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

pub fn escape_single_quote_string(s: &str) -> EscapeSingleQuoteString<'_> {
    EscapeSingleQuoteString(s)
}
