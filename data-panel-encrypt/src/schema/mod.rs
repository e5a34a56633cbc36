//! Encrypt rules: which logical columns are encrypted, and how each one is
//! laid out physically.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use data_panel_common::common::Error;

use crate::encryptor::{AssistedQueryEncryptor, Encryptor};
use crate::statement::value::Value;
use crate::Result;

mod config;

pub use self::config::{EncryptColumnRuleConfig, EncryptRuleConfig, EncryptTableRuleConfig};

/// Physical layout of one encrypted logical column.
#[derive(Clone)]
pub struct ColumnMapping {
    cipher_column: String,
    plain_column: Option<String>,
    assisted_query_column: Option<String>,
    encryptor: Arc<dyn Encryptor>,
}

impl ColumnMapping {
    pub fn new<S: Into<String>>(cipher_column: S, encryptor: Arc<dyn Encryptor>) -> Self {
        ColumnMapping {
            cipher_column: cipher_column.into(),
            plain_column: None,
            assisted_query_column: None,
            encryptor,
        }
    }

    pub fn with_plain_column<S: Into<String>>(mut self, plain_column: S) -> Self {
        self.plain_column = Some(plain_column.into());
        self
    }

    pub fn with_assisted_query_column<S: Into<String>>(mut self, assisted_query_column: S) -> Self {
        self.assisted_query_column = Some(assisted_query_column.into());
        self
    }

    pub fn cipher_column(&self) -> &str {
        &self.cipher_column
    }

    pub fn plain_column(&self) -> Option<&str> {
        self.plain_column.as_deref()
    }

    pub fn assisted_query_column(&self) -> Option<&str> {
        self.assisted_query_column.as_deref()
    }

    pub fn encryptor(&self) -> &dyn Encryptor {
        self.encryptor.as_ref()
    }

    pub fn assisted_encryptor(&self) -> Option<&dyn AssistedQueryEncryptor> {
        self.encryptor.assisted_query()
    }

    /// Cipher text for `value`. `NULL` stays `NULL`.
    pub fn encrypt(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        self.encryptor.encrypt(value)
    }

    /// Assisted query token for `value`. `NULL` stays `NULL`.
    pub fn assisted_encrypt(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self.assisted_encryptor() {
            Some(encryptor) => encryptor.assisted_encrypt(value),
            None => Err(Error::ConfigIntegrity(format!(
                "cipher column `{}` has no assisted query encryptor",
                self.cipher_column
            ))),
        }
    }

    fn validate(&self, table: &str, column: &str) -> Result<()> {
        if self.cipher_column.is_empty() {
            return Err(Error::ConfigIntegrity(format!("`{}`.`{}` has an empty cipher column", table, column)));
        }
        let mut physical = vec![self.cipher_column.as_str()];
        for companion in self.plain_column.iter().chain(self.assisted_query_column.iter()) {
            if companion.is_empty() || physical.iter().any(|c| c.eq_ignore_ascii_case(companion)) {
                return Err(Error::ConfigIntegrity(format!(
                    "`{}`.`{}` maps to an empty or repeated physical column `{}`",
                    table, column, companion
                )));
            }
            physical.push(companion);
        }
        if self.assisted_query_column.is_some() && self.assisted_encryptor().is_none() {
            return Err(Error::ConfigIntegrity(format!(
                "`{}`.`{}` has an assisted query column but its encryptor can not produce assisted tokens",
                table, column
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnMapping")
            .field("cipher_column", &self.cipher_column)
            .field("plain_column", &self.plain_column)
            .field("assisted_query_column", &self.assisted_query_column)
            .field("assisted", &self.assisted_encryptor().is_some())
            .finish()
    }
}

/// The encrypted columns of one table, keyed by lower case logical name.
#[derive(Debug, Clone)]
pub struct EncryptTable {
    name: String,
    columns: HashMap<String, ColumnMapping>,
}

impl EncryptTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_mapping(&self, column: &str) -> Option<&ColumnMapping> {
        self.columns.get(&column.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Immutable `table -> logical column -> mapping` lookup. Names are matched
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct EncryptSchema {
    tables: HashMap<String, EncryptTable>,
}

impl EncryptSchema {
    pub fn builder() -> EncryptSchemaBuilder {
        EncryptSchemaBuilder::default()
    }

    /// `None` means the column is not encrypted and passes through.
    pub fn find_mapping(&self, table: &str, column: &str) -> Option<&ColumnMapping> {
        self.find_table(table).and_then(|t| t.find_mapping(column))
    }

    pub fn find_table(&self, table: &str) -> Option<&EncryptTable> {
        self.tables.get(&table.to_lowercase())
    }

    pub fn is_encrypted_table(&self, table: &str) -> bool {
        self.find_table(table).map(|t| !t.is_empty()).unwrap_or(false)
    }
}

#[derive(Default)]
pub struct EncryptSchemaBuilder {
    tables: HashMap<String, EncryptTable>,
    errors: Vec<Error>,
}

impl EncryptSchemaBuilder {
    pub fn column(mut self, table: &str, column: &str, mapping: ColumnMapping) -> Self {
        if let Err(e) = mapping.validate(table, column) {
            self.errors.push(e);
            return self;
        }
        let encrypt_table = self.tables.entry(table.to_lowercase()).or_insert_with(|| EncryptTable {
            name: table.to_string(),
            columns: HashMap::new(),
        });
        if encrypt_table.columns.insert(column.to_lowercase(), mapping).is_some() {
            self.errors.push(Error::ConfigIntegrity(format!("`{}`.`{}` is configured twice", table, column)));
        }
        self
    }

    /// Fails with the first rule problem met while adding columns.
    pub fn build(mut self) -> Result<EncryptSchema> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        log::debug!("encrypt schema built for {} table(s)", self.tables.len());
        Ok(EncryptSchema { tables: self.tables })
    }
}
