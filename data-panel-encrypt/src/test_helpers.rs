//! Fixtures shared by the unit tests: encryptors with readable output, the
//! `t_user` schema, span finders over literal SQL and a splice renderer.

use std::sync::Arc;

use rand::Rng;

use data_panel_common::common::Error;

use crate::encryptor::{AssistedQueryEncryptor, Encryptor};
use crate::rewrite::edit::{Edit, EditShape};
use crate::schema::{ColumnMapping, EncryptSchema};
use crate::statement::segment::{ColumnSegment, Expression, ExpressionSegment, OwnerSegment, TableSegment};
use crate::statement::value::Value;
use crate::Result;

fn unwrap_tagged(tag: &str, cipher: &Value) -> Result<String> {
    let text = cipher.to_plain_string();
    text.strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
        .map(|plain| plain.to_string())
        .ok_or_else(|| Error::Encryptor(format!("`{}` is not a {} cipher", text, tag)))
}

/// Deterministic, `x` becomes `'enc(x)'`.
pub struct TestEncryptor;

impl Encryptor for TestEncryptor {
    fn encrypt(&self, plain: &Value) -> Result<Value> {
        Ok(Value::string(format!("enc({})", plain.to_plain_string())))
    }

    fn decrypt(&self, cipher: &Value) -> Result<Value> {
        unwrap_tagged("enc", cipher).map(Value::string)
    }
}

/// Like [`TestEncryptor`], with assisted tokens `'ast(x)'`.
pub struct AssistedTestEncryptor;

impl Encryptor for AssistedTestEncryptor {
    fn encrypt(&self, plain: &Value) -> Result<Value> {
        TestEncryptor.encrypt(plain)
    }

    fn decrypt(&self, cipher: &Value) -> Result<Value> {
        TestEncryptor.decrypt(cipher)
    }

    fn assisted_query(&self) -> Option<&dyn AssistedQueryEncryptor> {
        Some(self)
    }
}

impl AssistedQueryEncryptor for AssistedTestEncryptor {
    fn assisted_encrypt(&self, plain: &Value) -> Result<Value> {
        Ok(Value::string(format!("ast({})", plain.to_plain_string())))
    }
}

/// Salts every cipher with a random nonce, `x` becomes `'rnd(nonce:x)'`.
pub struct RandomTestEncryptor;

impl Encryptor for RandomTestEncryptor {
    fn encrypt(&self, plain: &Value) -> Result<Value> {
        let nonce: u64 = rand::thread_rng().gen();
        Ok(Value::string(format!("rnd({}:{})", nonce, plain.to_plain_string())))
    }

    fn decrypt(&self, cipher: &Value) -> Result<Value> {
        let salted = unwrap_tagged("rnd", cipher)?;
        match salted.split_once(':') {
            Some((_, plain)) => Ok(Value::string(plain)),
            None => Err(Error::Encryptor(format!("`{}` carries no nonce", salted))),
        }
    }
}

/// `t_user`:
/// * `name`: cipher, assisted query and plain column
/// * `pwd`: cipher column only
/// * `mobile`: cipher and plain column
pub fn user_schema() -> EncryptSchema {
    EncryptSchema::builder()
        .column(
            "t_user",
            "name",
            ColumnMapping::new("name_cipher", Arc::new(AssistedTestEncryptor))
                .with_assisted_query_column("name_assisted")
                .with_plain_column("name_plain"),
        )
        .column("t_user", "pwd", ColumnMapping::new("pwd_cipher", Arc::new(TestEncryptor)))
        .column(
            "t_user",
            "mobile",
            ColumnMapping::new("mobile_cipher", Arc::new(TestEncryptor)).with_plain_column("mobile_plain"),
        )
        .build()
        .unwrap()
}

pub fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Inclusive span of the `nth` (from 0) occurrence of `needle` in `sql`.
/// Identifier needles only match whole identifiers.
pub fn span(sql: &str, needle: &str, nth: usize) -> (usize, usize) {
    let starts_ident = needle.chars().next().map(is_ident).unwrap_or(false);
    let ends_ident = needle.chars().last().map(is_ident).unwrap_or(false);
    let found = sql
        .match_indices(needle)
        .map(|(start, _)| start)
        .filter(|&start| {
            let before = sql[..start].chars().last();
            let after = sql[start + needle.len()..].chars().next();
            !(starts_ident && before.map(is_ident).unwrap_or(false)) && !(ends_ident && after.map(is_ident).unwrap_or(false))
        })
        .nth(nth);
    match found {
        Some(start) => (start, start + needle.len() - 1),
        None => panic!("no occurrence {} of `{}` in `{}`", nth, needle, sql),
    }
}

pub fn table(sql: &str, name: &str) -> TableSegment {
    let (start, stop) = span(sql, name, 0);
    TableSegment::new(start, stop, name)
}

pub fn column(sql: &str, name: &str, nth: usize) -> ColumnSegment {
    let (start, stop) = span(sql, name, nth);
    ColumnSegment::new(start, stop, name)
}

/// `owner.name`
pub fn qualified(sql: &str, owner: &str, name: &str, nth: usize) -> ColumnSegment {
    let (start, stop) = span(sql, &format!("{}.{}", owner, name), nth);
    ColumnSegment::new(start, stop, name).with_owner(OwnerSegment::new(start, start + owner.len() - 1, owner))
}

/// `text` is the literal as written, `value` what it parses to.
pub fn literal(sql: &str, text: &str, value: Value, nth: usize) -> ExpressionSegment {
    let (start, stop) = span(sql, text, nth);
    ExpressionSegment::new(start, stop, Expression::Literal(value))
}

/// The `nth` marker of the statement, which is also its ordinal.
pub fn parameter(sql: &str, nth: usize) -> ExpressionSegment {
    let (start, stop) = span(sql, "?", nth);
    ExpressionSegment::new(start, stop, Expression::Parameter(nth))
}

/// Splices sorted edits into `sql`, last one first.
pub fn render(sql: &str, edits: &[Edit]) -> String {
    let mut result = sql.to_string();
    for edit in edits.iter().rev() {
        let text = edit.to_string();
        match edit.shape() {
            EditShape::Insertion => result.insert_str(edit.start_index() + 1, &text),
            EditShape::Substitution | EditShape::Collection => {
                result.replace_range(edit.start_index()..=edit.stop_index(), &text)
            }
        }
    }
    result
}
