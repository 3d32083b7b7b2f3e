//! Error types for formkit-core

use thiserror::Error;

/// Failure inside the formula evaluator.
///
/// These never leave [`crate::formula::FormulaEvaluator::evaluate`]; they are
/// logged and collapsed into an empty derived value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// Expression still contains something other than digits, operators,
    /// parentheses and whitespace after substitution
    #[error("expression contains disallowed characters: {0:?}")]
    DisallowedCharacters(String),

    /// Substitution key that cannot be turned into a word-boundary pattern
    #[error("invalid substitution key: {0:?}")]
    InvalidSubstitutionKey(String),

    /// Nothing left to evaluate
    #[error("empty expression")]
    EmptyExpression,

    /// Token that does not fit the grammar at this position
    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken { position: usize, found: char },

    /// Input ended where an operand or ')' was required
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Digit run that is not a number (e.g. `1.2.3`)
    #[error("invalid number literal: {0}")]
    InvalidNumber(String),

    /// Parenthesis nesting beyond the parser limit
    #[error("expression nested deeper than {0} levels")]
    NestingTooDeep(usize),

    /// Date of birth that no supported format accepts
    #[error("unparseable date: {0}")]
    InvalidDate(String),
}

/// Form schema / configuration error
#[derive(Error, Debug)]
pub enum FormError {
    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("duplicate field id: {0}")]
    DuplicateField(String),

    #[error("field index {index} out of range (form has {len} fields)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown config key: {0}")]
    UnknownConfigKey(String),

    #[error("invalid value for {key}: {value}")]
    InvalidConfigValue { key: String, value: String },

    #[error("cannot locate home directory")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result type for formkit-core
pub type Result<T> = std::result::Result<T, FormError>;
