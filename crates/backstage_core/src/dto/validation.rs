//! Field rules, localized messages and error aggregation for request DTOs.
//!
//! # Responsibility
//! - Name each predicate a DTO field can declare and render its message.
//! - Collect every failing rule per field before a DTO is accepted.
//! - Read common field shapes (`ids`, `trashed`, page numbers) from payloads.
//!
//! # Invariants
//! - All declared rules of a field are evaluated; failures never
//!   short-circuit other fields.
//! - Storage existence checks go through [`DataExists`] and fail closed.

use crate::model::{EntityId, Record};
use crate::repo::descriptor::SOFT_DELETE_COLUMN;
use crate::repo::query::quote;
use crate::util::to_boolean;
use log::error;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// HTTP-style status carried by every rejection.
pub const VALIDATION_STATUS: u16 = 400;
/// Distinct character classes a password must mix.
pub const MIN_PASSWORD_CHAR_CLASSES: usize = 3;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 50;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid uuid regex")
});

/// Message language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    ZhCn,
}

impl Locale {
    /// Parses `en` / `zh-cn` style tags, case-insensitively.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" => Some(Self::En),
            "zh" | "zh-cn" => Some(Self::ZhCn),
            _ => None,
        }
    }
}

/// Named field predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    IsObject,
    IsDefined,
    IsArray,
    IsUuid,
    IsBoolean,
    IsString,
    IsInt,
    Min(i64),
    IsEnum(&'static [&'static str]),
    IsNotEmpty,
    Length { min: usize, max: usize },
    DataExists { table: &'static str },
    PasswordComplexity,
}

impl Rule {
    /// Stable rule key used in `FieldError::constraints`.
    pub fn name(self) -> &'static str {
        match self {
            Self::IsObject => "is_object",
            Self::IsDefined => "is_defined",
            Self::IsArray => "is_array",
            Self::IsUuid => "is_uuid",
            Self::IsBoolean => "is_boolean",
            Self::IsString => "is_string",
            Self::IsInt => "is_int",
            Self::Min(_) => "min",
            Self::IsEnum(_) => "is_enum",
            Self::IsNotEmpty => "is_not_empty",
            Self::Length { .. } => "length",
            Self::DataExists { .. } => "data_exists",
            Self::PasswordComplexity => "password_complexity",
        }
    }

    pub fn message(self, locale: Locale, field: &str) -> String {
        let classes = MIN_PASSWORD_CHAR_CLASSES;
        match locale {
            Locale::En => match self {
                Self::IsObject => "request body must be an object".to_string(),
                Self::IsDefined => format!("{field} should not be null or undefined"),
                Self::IsArray => format!("{field} must be an array"),
                Self::IsUuid => format!("{field} must be a valid UUID"),
                Self::IsBoolean => format!("{field} must be a boolean value"),
                Self::IsString => format!("{field} must be a string"),
                Self::IsInt => format!("{field} must be an integer number"),
                Self::Min(min) => format!("{field} must not be less than {min}"),
                Self::IsEnum(values) => format!("{field} must be one of: {}", values.join(", ")),
                Self::IsNotEmpty => format!("{field} should not be empty"),
                Self::Length { min, max } => {
                    format!("{field} must be between {min} and {max} characters")
                }
                Self::DataExists { table } => {
                    format!("{field} does not reference an existing record in {table}")
                }
                Self::PasswordComplexity => format!(
                    "{field} must mix {classes} of lowercase, uppercase, digits and symbols"
                ),
            },
            Locale::ZhCn => match self {
                Self::IsObject => "请求体必须是对象".to_string(),
                Self::IsDefined => format!("{field}不能为空"),
                Self::IsArray => format!("{field}必须是数组"),
                Self::IsUuid => format!("{field}必须是合法的UUID"),
                Self::IsBoolean => format!("{field}必须是布尔值"),
                Self::IsString => format!("{field}必须是字符串"),
                Self::IsInt => format!("{field}必须是整数"),
                Self::Min(min) => format!("{field}不能小于{min}"),
                Self::IsEnum(values) => format!("{field}必须是以下值之一: {}", values.join(", ")),
                Self::IsNotEmpty => format!("{field}不能为空字符串"),
                Self::Length { min, max } => format!("{field}长度必须在{min}到{max}个字符之间"),
                Self::DataExists { table } => format!("{field}在{table}中不存在"),
                Self::PasswordComplexity => {
                    format!("{field}必须至少包含小写字母、大写字母、数字和符号中的{classes}种")
                }
            },
        }
    }
}

/// Failures of one field, keyed by rule name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub constraints: BTreeMap<&'static str, String>,
}

impl FieldError {
    pub fn has(&self, rule: &str) -> bool {
        self.constraints.contains_key(rule)
    }
}

/// Aggregated rejection returned before a request reaches any handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRejection {
    pub status: u16,
    pub errors: Vec<FieldError>,
}

impl ValidationRejection {
    pub fn field(&self, name: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.field == name)
    }
}

impl Display for ValidationRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.errors.iter().map(|err| err.field.as_str()).collect();
        write!(
            f,
            "validation failed ({}): {}",
            self.status,
            fields.join(", ")
        )
    }
}

impl Error for ValidationRejection {}

/// Per-field failure accumulator, in first-failure field order.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    locale: Locale,
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            errors: Vec::new(),
        }
    }

    pub fn add(&mut self, field: &str, rule: Rule) {
        let message = rule.message(self.locale, field);
        match self.errors.iter_mut().find(|error| error.field == field) {
            Some(existing) => {
                existing.constraints.insert(rule.name(), message);
            }
            None => self.errors.push(FieldError {
                field: field.to_string(),
                constraints: BTreeMap::from([(rule.name(), message)]),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(value)` when no rule failed, else the aggregated rejection.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationRejection> {
        if self.errors.is_empty() {
            return Ok(value);
        }
        Err(self.into_rejection())
    }

    pub fn into_rejection(self) -> ValidationRejection {
        ValidationRejection {
            status: VALIDATION_STATUS,
            errors: self.errors,
        }
    }
}

/// Storage-backed existence lookup used by `data_exists` rules.
pub trait DataExists {
    /// Whether a live row of `table` has `column = value`.
    fn data_exists(&self, table: &str, column: &str, value: &str) -> rusqlite::Result<bool>;
}

impl DataExists for rusqlite::Connection {
    fn data_exists(&self, table: &str, column: &str, value: &str) -> rusqlite::Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND {} IS NULL);",
            quote(table),
            quote(column),
            quote(SOFT_DELETE_COLUMN)
        );
        self.query_row(&sql, [value], |row| row.get(0))
    }
}

/// Inputs shared by every DTO validation run.
#[derive(Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    pub locale: Locale,
    pub store: Option<&'a dyn DataExists>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            store: None,
        }
    }

    pub fn with_store(mut self, store: &'a dyn DataExists) -> Self {
        self.store = Some(store);
        self
    }

    pub fn errors(&self) -> ValidationErrors {
        ValidationErrors::new(self.locale)
    }

    /// Runs an existence lookup. Missing store or storage errors count as
    /// "does not exist".
    pub fn exists(&self, table: &'static str, value: &str) -> bool {
        let Some(store) = self.store else {
            error!("event=dto_data_exists module=dto status=error table={table} error=no_store");
            return false;
        };
        match store.data_exists(table, "id", value) {
            Ok(found) => found,
            Err(err) => {
                error!("event=dto_data_exists module=dto status=error table={table} error={err}");
                false
            }
        }
    }
}

/// A request shape that can be parsed and validated from a JSON object.
pub trait Validate: Sized {
    fn validate(payload: &Record, ctx: &ValidationContext<'_>) -> Result<Self, ValidationRejection>;
}

pub fn is_uuid(value: &str) -> bool {
    UUID_RE.is_match(value)
}

/// Reads `ids`: absent defaults to `[]`; each element must be a UUID.
pub fn read_ids(payload: &Record, field: &str, errors: &mut ValidationErrors) -> Vec<EntityId> {
    match payload.get(field) {
        None => Vec::new(),
        Some(Value::Null) => {
            errors.add(field, Rule::IsDefined);
            Vec::new()
        }
        Some(Value::Array(items)) => {
            let mut ids = Vec::with_capacity(items.len());
            let mut all_valid = true;
            for item in items {
                let text = item.as_str().filter(|text| is_uuid(text));
                match text.map(Uuid::parse_str) {
                    Some(Ok(id)) => ids.push(id),
                    _ => all_valid = false,
                }
            }
            if !all_valid {
                errors.add(field, Rule::IsUuid);
            }
            ids
        }
        Some(_) => {
            errors.add(field, Rule::IsArray);
            Vec::new()
        }
    }
}

/// Reads an optional boolean, coercing strings first.
pub fn read_trashed(payload: &Record, field: &str, errors: &mut ValidationErrors) -> Option<bool> {
    let raw = payload.get(field)?;
    match to_boolean(Some(raw)) {
        Value::Bool(flag) => Some(flag),
        _ => {
            errors.add(field, Rule::IsBoolean);
            None
        }
    }
}

/// Reads an optional integer ≥ `min`; numeric strings are accepted.
pub fn read_min_int(
    payload: &Record,
    field: &str,
    min: i64,
    default: u32,
    errors: &mut ValidationErrors,
) -> u32 {
    let parsed = match payload.get(field) {
        None | Some(Value::Null) => return default,
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match parsed {
        None => {
            errors.add(field, Rule::IsInt);
            default
        }
        Some(value) if value < min => {
            errors.add(field, Rule::Min(min));
            default
        }
        Some(value) => u32::try_from(value).unwrap_or(u32::MAX),
    }
}

/// Reads an optional string field; non-strings fail `is_string`.
pub fn read_optional_string<'p>(
    payload: &'p Record,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<&'p str> {
    match payload.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.as_str()),
        Some(_) => {
            errors.add(field, Rule::IsString);
            None
        }
    }
}

/// Counts lowercase, uppercase, digit and symbol classes present.
pub fn char_classes(value: &str) -> usize {
    let lower = value.chars().any(|c| c.is_lowercase());
    let upper = value.chars().any(|c| c.is_uppercase());
    let digit = value.chars().any(|c| c.is_ascii_digit());
    let symbol = value
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());
    [lower, upper, digit, symbol]
        .into_iter()
        .filter(|present| *present)
        .count()
}
