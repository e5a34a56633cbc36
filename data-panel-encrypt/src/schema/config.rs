use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use data_panel_common::common::Error;

use crate::encryptor::Encryptor;
use crate::schema::{ColumnMapping, EncryptSchema};
use crate::Result;

/// Declarative encrypt rules, as found under `encrypt` in a rule file.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EncryptRuleConfig {
    #[serde(default)]
    pub tables: BTreeMap<String, EncryptTableRuleConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EncryptTableRuleConfig {
    #[serde(default)]
    pub columns: BTreeMap<String, EncryptColumnRuleConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EncryptColumnRuleConfig {
    pub cipher_column: String,
    #[serde(default)]
    pub plain_column: Option<String>,
    #[serde(default)]
    pub assisted_query_column: Option<String>,
    pub encryptor_name: String,
}

impl EncryptSchema {
    /// Builds a schema from rule config, looking encryptors up by name.
    pub fn from_config(config: &EncryptRuleConfig, encryptors: &HashMap<String, Arc<dyn Encryptor>>) -> Result<Self> {
        let mut builder = EncryptSchema::builder();
        for (table, table_config) in &config.tables {
            for (column, column_config) in &table_config.columns {
                let encryptor = encryptors.get(&column_config.encryptor_name).ok_or_else(|| {
                    Error::ConfigIntegrity(format!(
                        "`{}`.`{}` uses unknown encryptor `{}`",
                        table, column, column_config.encryptor_name
                    ))
                })?;
                let mut mapping = ColumnMapping::new(column_config.cipher_column.clone(), encryptor.clone());
                if let Some(plain_column) = &column_config.plain_column {
                    mapping = mapping.with_plain_column(plain_column.clone());
                }
                if let Some(assisted_query_column) = &column_config.assisted_query_column {
                    mapping = mapping.with_assisted_query_column(assisted_query_column.clone());
                }
                builder = builder.column(table, column, mapping);
            }
        }
        builder.build()
    }
}
