//! Validation rules and validity state.
//!
//! A rule is a tagged variant with typed parameters. Rules are evaluated by a
//! fixed evaluator against the current value of an element; nothing is built
//! from strings at runtime except compiled patterns.
//!
//! # Example
//!
//! ```
//! use horizon_bind::validation::{RuleKind, RuleSet, ValidationRule};
//!
//! let mut rules = RuleSet::new();
//! rules.set_rule(RuleKind::MinLength, Some(ValidationRule::MinLength(4)));
//! rules.set_rule(RuleKind::Pattern, Some(ValidationRule::pattern(r"/^[a-z]+$/i").unwrap()));
//!
//! assert!(rules.get(RuleKind::Pattern).unwrap().check("Secret"));
//! assert!(!rules.get(RuleKind::MinLength).unwrap().check("abc"));
//! ```

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use super::element::ElementId;
use crate::error::{BindError, Result};

/// The kinds of validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Regular expression the value must match.
    Pattern,
    /// Lower bound of the integer value.
    Min,
    /// Upper bound of the integer value.
    Max,
    /// Minimum length of the value.
    MinLength,
    /// Maximum length of the value.
    MaxLength,
    /// The value must not be empty, checked on every validation.
    NotNull,
    /// The value must equal the value of another element.
    CheckEqual,
    /// The value must parse as a data type.
    DataType,
    /// Application supplied predicate.
    Custom,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Pattern => "pattern",
            RuleKind::Min => "min",
            RuleKind::Max => "max",
            RuleKind::MinLength => "minlength",
            RuleKind::MaxLength => "maxlength",
            RuleKind::NotNull => "notnull",
            RuleKind::CheckEqual => "check-equal",
            RuleKind::DataType => "datatype",
            RuleKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Built-in data types understood by [`ValidationRule::DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Any string.
    String,
    /// Optionally signed integer.
    Integer,
    /// Optionally signed decimal number.
    Decimal,
    /// `true`, `false`, `1` or `0`.
    Boolean,
    /// `YYYY-MM-DD`.
    Date,
    /// RFC 3339 or `YYYY-MM-DDTHH:MM:SS[.fff]`.
    DateTime,
    /// `HH:MM:SS[.fff]`.
    Time,
}

impl DataType {
    /// Checks whether `value` is a lexical value of this type.
    pub fn matches(self, value: &str) -> bool {
        match self {
            DataType::String => true,
            DataType::Integer => {
                let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
            DataType::Decimal => {
                let number = value.strip_prefix(['+', '-']).unwrap_or(value);
                let (int, frac) = number.split_once('.').unwrap_or((number, ""));
                !(int.is_empty() && frac.is_empty())
                    && int.bytes().all(|b| b.is_ascii_digit())
                    && frac.bytes().all(|b| b.is_ascii_digit())
            }
            DataType::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            DataType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            DataType::DateTime => {
                DateTime::parse_from_rfc3339(value).is_ok()
                    || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            }
            DataType::Time => NaiveTime::parse_from_str(value, "%H:%M:%S%.f").is_ok(),
        }
    }
}

impl FromStr for DataType {
    type Err = BindError;

    /// Parses an XSD built-in type name, with or without the `xsd:` prefix.
    fn from_str(name: &str) -> Result<Self> {
        let local = name.strip_prefix("xsd:").unwrap_or(name);
        match local.to_ascii_lowercase().as_str() {
            "string" => Ok(DataType::String),
            "integer" | "int" | "long" => Ok(DataType::Integer),
            "decimal" | "double" | "float" => Ok(DataType::Decimal),
            "boolean" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            "datetime" => Ok(DataType::DateTime),
            "time" => Ok(DataType::Time),
            _ => Err(BindError::UnknownDataType(name.to_string())),
        }
    }
}

/// Predicate of a custom rule.
pub type CustomPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A validation rule with its parameter.
#[derive(Clone)]
pub enum ValidationRule {
    /// The value must contain a match of the pattern.
    Pattern(Regex),
    /// The leading integer of the value must be at least this.
    Min(i64),
    /// The leading integer of the value must be at most this.
    Max(i64),
    /// The value must have at least this many characters.
    MinLength(usize),
    /// The value may have at most this many characters.
    MaxLength(usize),
    /// The value must not be empty.
    NotNull,
    /// The value must equal the value of the referenced element, unless that
    /// element is itself invalid.
    CheckEqual(ElementId),
    /// The value must parse as the data type.
    DataType(DataType),
    /// The predicate must accept the value.
    Custom(CustomPredicate),
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Min(v) => f.debug_tuple("Min").field(v).finish(),
            Self::Max(v) => f.debug_tuple("Max").field(v).finish(),
            Self::MinLength(v) => f.debug_tuple("MinLength").field(v).finish(),
            Self::MaxLength(v) => f.debug_tuple("MaxLength").field(v).finish(),
            Self::NotNull => f.write_str("NotNull"),
            Self::CheckEqual(id) => f.debug_tuple("CheckEqual").field(id).finish(),
            Self::DataType(t) => f.debug_tuple("DataType").field(t).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ValidationRule {
    /// Compiles a pattern rule.
    ///
    /// Accepts a plain regular expression or the delimited form
    /// `/source/flags`, where `i` makes the match case-insensitive, `m`
    /// makes `^` and `$` match at line boundaries and `g` is ignored.
    pub fn pattern(pattern: &str) -> Result<Self> {
        let source = match delimited_pattern(pattern) {
            Some((body, flags)) => {
                let mut inline = String::new();
                if flags.contains('i') {
                    inline.push('i');
                }
                if flags.contains('m') {
                    inline.push('m');
                }
                if inline.is_empty() {
                    body.to_string()
                } else {
                    format!("(?{inline}){body}")
                }
            }
            None => pattern.to_string(),
        };
        Regex::new(&source)
            .map(Self::Pattern)
            .map_err(|e| BindError::invalid_pattern(pattern, e))
    }

    /// Parses a data type rule from an XSD type name.
    pub fn data_type(name: &str) -> Result<Self> {
        name.parse().map(Self::DataType)
    }

    /// Creates a custom rule from a predicate.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// The kind of this rule.
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Pattern(_) => RuleKind::Pattern,
            Self::Min(_) => RuleKind::Min,
            Self::Max(_) => RuleKind::Max,
            Self::MinLength(_) => RuleKind::MinLength,
            Self::MaxLength(_) => RuleKind::MaxLength,
            Self::NotNull => RuleKind::NotNull,
            Self::CheckEqual(_) => RuleKind::CheckEqual,
            Self::DataType(_) => RuleKind::DataType,
            Self::Custom(_) => RuleKind::Custom,
        }
    }

    /// Evaluates the rule against a value.
    ///
    /// `CheckEqual` needs the element tree and always passes here; it is
    /// evaluated by [`ElementTree::is_valid`](super::ElementTree::is_valid).
    pub fn check(&self, value: &str) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(value),
            Self::Min(min) => leading_int(value).is_some_and(|v| v >= *min),
            Self::Max(max) => leading_int(value).is_some_and(|v| v <= *max),
            Self::MinLength(len) => value.chars().count() >= *len,
            Self::MaxLength(len) => value.chars().count() <= *len,
            Self::NotNull => !value.is_empty(),
            Self::CheckEqual(_) => true,
            Self::DataType(data_type) => data_type.matches(value),
            Self::Custom(predicate) => predicate(value),
        }
    }
}

/// Splits `/body/flags` into body and flags.
fn delimited_pattern(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let (body, flags) = (&rest[..end], &rest[end + 1..]);
    flags
        .chars()
        .all(|c| matches!(c, 'g' | 'i' | 'm'))
        .then_some((body, flags))
}

/// Parses the integer at the start of `value`, ignoring anything after it.
///
/// Values outside the `i64` range saturate to its bounds.
fn leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    match trimmed[..sign_len + digits].parse::<i64>() {
        Ok(parsed) => Some(parsed),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// The ordered rules of one element.
///
/// Each kind has at most one slot. Slots keep the order in which their kind
/// was first registered; unsetting a rule empties its slot, and an empty slot
/// is always satisfied.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    slots: Vec<(RuleKind, Option<ValidationRule>)>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule under its own kind.
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.set_rule(rule.kind(), Some(rule));
        self
    }

    /// Sets or unsets the rule of a kind.
    pub fn set_rule(&mut self, kind: RuleKind, rule: Option<ValidationRule>) {
        match self.slots.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = rule,
            None if rule.is_some() => self.slots.push((kind, rule)),
            None => {}
        }
    }

    /// The rule of a kind, if set.
    pub fn get(&self, kind: RuleKind) -> Option<&ValidationRule> {
        self.slots
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, rule)| rule.as_ref())
    }

    /// The set rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleKind, &ValidationRule)> {
        self.slots
            .iter()
            .filter_map(|(kind, rule)| rule.as_ref().map(|r| (*kind, r)))
    }

    /// Whether no rule is set.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Which checks an element's value failed, HTML5 style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityState {
    pub value_missing: bool,
    pub type_mismatch: bool,
    pub pattern_mismatch: bool,
    pub too_long: bool,
    pub too_short: bool,
    pub range_underflow: bool,
    pub range_overflow: bool,
    pub step_mismatch: bool,
    pub custom_error: bool,
    /// Set when the last check passed.
    pub valid: bool,
}

impl ValidityState {
    /// Clears every flag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Flags the failure of a rule kind.
    pub fn set(&mut self, kind: RuleKind) {
        match kind {
            RuleKind::Min => self.range_underflow = true,
            RuleKind::Max => self.range_overflow = true,
            RuleKind::MinLength => self.too_short = true,
            RuleKind::MaxLength => self.too_long = true,
            RuleKind::Pattern => self.pattern_mismatch = true,
            RuleKind::DataType | RuleKind::NotNull | RuleKind::CheckEqual => {
                self.type_mismatch = true
            }
            RuleKind::Custom => self.custom_error = true,
        }
    }

    /// Whether any failure flag is set.
    pub fn has_failure(&self) -> bool {
        self.value_missing
            || self.type_mismatch
            || self.pattern_mismatch
            || self.too_long
            || self.too_short
            || self.range_underflow
            || self.range_overflow
            || self.step_mismatch
            || self.custom_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_forms() {
        let plain = ValidationRule::pattern(r"\d{3}").unwrap();
        assert!(plain.check("tel 555"));
        assert!(!plain.check("tel"));

        let delimited = ValidationRule::pattern("/^abc$/i").unwrap();
        assert!(delimited.check("ABC"));
        assert!(!delimited.check("abcd"));

        let multiline = ValidationRule::pattern("/^b$/gm").unwrap();
        assert!(multiline.check("a\nb"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ValidationRule::pattern("(unclosed").unwrap_err();
        assert!(matches!(err, BindError::InvalidPattern { .. }));
    }

    #[test]
    fn test_range_uses_leading_integer() {
        let min = ValidationRule::Min(10);
        assert!(min.check("12"));
        assert!(min.check("12abc"));
        assert!(!min.check("9"));
        assert!(!min.check("abc"));

        let max = ValidationRule::Max(0);
        assert!(max.check("-3"));
        assert!(!max.check(" +4"));
    }

    #[test]
    fn test_range_saturates_out_of_range_integers() {
        let huge = "99999999999999999999";
        assert!(!ValidationRule::Max(100).check(huge));
        assert!(ValidationRule::Min(0).check(huge));
        assert!(ValidationRule::Min(0).check("+99999999999999999999 units"));

        let tiny = "-99999999999999999999";
        assert!(!ValidationRule::Min(0).check(tiny));
        assert!(ValidationRule::Max(0).check(tiny));
    }

    #[test]
    fn test_lengths_count_chars() {
        assert!(ValidationRule::MinLength(3).check("äöü"));
        assert!(ValidationRule::MaxLength(3).check("äöü"));
        assert!(!ValidationRule::MaxLength(2).check("äöü"));
    }

    #[test]
    fn test_data_types() {
        let cases = [
            ("integer", "-42", true),
            ("integer", "4.2", false),
            ("xsd:decimal", "4.25", true),
            ("decimal", ".5", true),
            ("decimal", "1e3", false),
            ("boolean", "true", true),
            ("boolean", "yes", false),
            ("date", "2024-02-29", true),
            ("date", "2023-02-29", false),
            ("dateTime", "2024-05-01T10:30:00Z", true),
            ("dateTime", "2024-05-01T10:30:00.25", true),
            ("time", "23:59:59", true),
            ("time", "24:00:01", false),
            ("string", "", true),
        ];
        for (name, value, expected) in cases {
            let rule = ValidationRule::data_type(name).unwrap();
            assert_eq!(rule.check(value), expected, "{name} {value:?}");
        }
        assert!(matches!(
            ValidationRule::data_type("xsd:duration"),
            Err(BindError::UnknownDataType(_))
        ));
    }

    #[test]
    fn test_custom_rule() {
        let even = ValidationRule::custom(|v| v.len() % 2 == 0);
        assert_eq!(even.kind(), RuleKind::Custom);
        assert!(even.check("ab"));
        assert!(!even.check("abc"));
    }

    #[test]
    fn test_rule_set_keeps_first_registration_order() {
        let mut rules = RuleSet::new();
        rules.set_rule(RuleKind::Max, Some(ValidationRule::Max(5)));
        rules.set_rule(RuleKind::Min, Some(ValidationRule::Min(1)));
        rules.set_rule(RuleKind::Max, None);
        assert_eq!(
            rules.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec![RuleKind::Min]
        );

        rules.set_rule(RuleKind::Max, Some(ValidationRule::Max(9)));
        assert_eq!(
            rules.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec![RuleKind::Max, RuleKind::Min]
        );

        rules.set_rule(RuleKind::Pattern, None);
        assert!(rules.get(RuleKind::Pattern).is_none());
        assert!(!rules.is_empty());
    }

    #[test]
    fn test_validity_state_kinds() {
        let mut state = ValidityState::default();
        state.set(RuleKind::Min);
        state.set(RuleKind::CheckEqual);
        state.set(RuleKind::MinLength);
        assert!(state.range_underflow);
        assert!(state.type_mismatch);
        assert!(state.too_short);
        assert!(state.has_failure());

        state.reset();
        assert_eq!(state, ValidityState::default());
        assert_eq!(RuleKind::CheckEqual.to_string(), "check-equal");
    }
}
