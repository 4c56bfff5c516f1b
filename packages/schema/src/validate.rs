//! # Property Validation
//!
//! Checks a [`PropertyValue`] against its [`PropertyDefinition`] and turns raw
//! inspector input into typed values.
//!
//! ## Rules
//!
//! - text, richText, enum: string values only
//! - assetRef: a string, or null when unset
//! - number: finite f64, optional whole-number and range checks
//! - boolean: bool values only
//! - `required` rejects empty strings and null assets
//! - length limits count characters, not bytes

use crate::error::ValidationError;
use crate::types::{PropertyDefinition, PropertyKind, PropertyValue};
use regex::Regex;

/// Validate `value` against `definition`.
///
/// `pattern` is the compiled form of `definition.constraints.pattern`; the
/// registry compiles patterns once when it is built.
pub fn check_value(
    definition: &PropertyDefinition,
    value: &PropertyValue,
    pattern: Option<&Regex>,
) -> Result<(), ValidationError> {
    let key = &definition.key;
    let constraints = &definition.constraints;

    match (definition.kind, value) {
        (PropertyKind::AssetRef, PropertyValue::Null) => {
            if constraints.required {
                return Err(ValidationError::Required { key: key.clone() });
            }
            Ok(())
        }

        (kind, PropertyValue::String(s)) if kind.is_textual() => {
            if constraints.required && s.trim().is_empty() {
                return Err(ValidationError::Required { key: key.clone() });
            }

            let len = s.chars().count();
            if let Some(min) = constraints.min_length {
                if len < min {
                    return Err(ValidationError::TooShort { key: key.clone(), min });
                }
            }
            if let Some(max) = constraints.max_length {
                if len > max {
                    return Err(ValidationError::TooLong { key: key.clone(), max });
                }
            }

            if kind == PropertyKind::Enum && !constraints.options.iter().any(|o| o == s) {
                return Err(ValidationError::NotAnOption {
                    key: key.clone(),
                    value: s.clone(),
                    options: constraints.options.clone(),
                });
            }

            // Empty optional values skip the pattern
            if let Some(re) = pattern {
                if !s.is_empty() && !re.is_match(s) {
                    return Err(ValidationError::PatternMismatch {
                        key: key.clone(),
                        pattern: re.as_str().to_string(),
                    });
                }
            }

            Ok(())
        }

        (PropertyKind::Number, PropertyValue::Number(n)) => {
            if !n.is_finite() {
                return Err(ValidationError::NotFinite { key: key.clone() });
            }
            if constraints.integer && n.fract() != 0.0 {
                return Err(ValidationError::NotAnInteger { key: key.clone() });
            }
            if let Some(min) = constraints.min {
                if *n < min {
                    return Err(ValidationError::BelowMinimum { key: key.clone(), min });
                }
            }
            if let Some(max) = constraints.max {
                if *n > max {
                    return Err(ValidationError::AboveMaximum { key: key.clone(), max });
                }
            }
            Ok(())
        }

        (PropertyKind::Boolean, PropertyValue::Bool(_)) => Ok(()),

        (kind, other) => Err(ValidationError::WrongKind {
            key: key.clone(),
            expected: kind,
            found: other.type_name(),
        }),
    }
}

/// Parse raw text typed into an inspector field.
///
/// Only converts; constraint checks are left to [`check_value`].
pub fn parse_input(definition: &PropertyDefinition, raw: &str) -> Result<PropertyValue, ValidationError> {
    let unparseable = || ValidationError::Unparseable {
        key: definition.key.clone(),
        input: raw.to_string(),
        expected: definition.kind,
    };

    match definition.kind {
        PropertyKind::Text | PropertyKind::RichText | PropertyKind::Enum => {
            Ok(PropertyValue::String(raw.to_string()))
        }
        PropertyKind::AssetRef => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Ok(PropertyValue::Null)
            } else {
                Ok(PropertyValue::String(trimmed.to_string()))
            }
        }
        PropertyKind::Number => raw
            .trim()
            .parse::<f64>()
            .map(PropertyValue::Number)
            .map_err(|_| unparseable()),
        PropertyKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(PropertyValue::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(PropertyValue::Bool(false)),
            _ => Err(unparseable()),
        },
    }
}
