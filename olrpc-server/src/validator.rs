//! Parameter validation against a [`MethodSchema`]
//!
//! Two passes use the same schema:
//!
//! - [`check_shape`] is the session's coarse gate: required names, JSON types,
//!   numeric and length bounds, blank queries. It ignores undeclared names and
//!   fails with `Error::InvalidParams`.
//! - [`validate_params`] is the router's full pass: it rejects undeclared
//!   names, fills defaults, applies the per-field semantic rules and returns
//!   the resolved parameter map. It fails with `Error::Validation`.

use crate::schema::{
    IntegerConstraints, ListConstraints, ListItem, MethodSchema, ParamKind, ParamSpec,
    StringConstraints, StringRule,
};
use olrpc_core::{Error, Params, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid address pattern")
});

/// Characters never accepted in identifiers
const IDENTIFIER_FORBIDDEN: &[char] = &['<', '>', '"', '\'', '&', '\n', '\r', '\t'];
/// Characters additionally refused in folder names
const FOLDER_FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
/// Characters refused in attachment paths
const PATH_FORBIDDEN: &[char] = &['<', '>', '"', '|', '?', '*'];
/// Longest accepted attachment path
const MAX_PATH_LEN: usize = 260;

/// Whether `address` looks like `local@domain.tld`
pub fn is_valid_email_address(address: &str) -> bool {
    EMAIL_ADDRESS.is_match(address)
}

/// Validate and resolve parameters for a method
///
/// Returns a map containing every supplied parameter (normalized where a rule
/// normalizes) plus the defaults of omitted optional parameters.
///
/// # Errors
///
/// `Error::Validation` naming the offending field: undeclared names (all of
/// them, sorted), a missing required parameter, a wrong JSON type, or a
/// failed constraint.
pub fn validate_params(schema: &MethodSchema, params: &Params) -> Result<Params> {
    let mut unknown: Vec<&str> = params
        .keys()
        .filter(|name| schema.get(name).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(Error::Validation {
            field: Some(unknown.join(", ")),
            message: format!(
                "Unknown parameter(s) for '{}': {}",
                schema.name,
                unknown.join(", ")
            ),
        });
    }

    let mut resolved = Params::new();
    for spec in &schema.params {
        match params.get(&spec.name) {
            None | Some(Value::Null) if spec.required => {
                return Err(Error::validation(
                    &spec.name,
                    format!("Missing required parameter: {}", spec.name),
                ));
            }
            None | Some(Value::Null) => {
                if let Some(default) = &spec.default {
                    resolved.insert(spec.name.clone(), default.clone());
                }
            }
            Some(value) => {
                let value = validate_value(spec, value)?;
                resolved.insert(spec.name.clone(), value);
            }
        }
    }
    Ok(resolved)
}

/// Coarse check of parameters against the advertised input shape
///
/// Undeclared names pass through untouched.
pub fn check_shape(schema: &MethodSchema, params: &Params) -> Result<()> {
    for spec in &schema.params {
        let value = match params.get(&spec.name) {
            None | Some(Value::Null) if spec.required => {
                return Err(Error::InvalidParams(format!(
                    "Missing required parameter: {}",
                    spec.name
                )))
            }
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };
        let invalid = |msg: String| Error::InvalidParams(msg);
        match &spec.kind {
            ParamKind::String(c) => {
                let s = value
                    .as_str()
                    .ok_or_else(|| invalid(type_message(spec)))?;
                if c.rule == StringRule::SearchQuery && s.trim().is_empty() {
                    return Err(invalid(format!("Parameter '{}' cannot be empty", spec.name)));
                }
                check_length(&spec.name, s.chars().count(), c.min_len, c.max_len, "characters")
                    .map_err(invalid)?;
            }
            ParamKind::Integer(c) => {
                let n = as_integer(value).ok_or_else(|| invalid(type_message(spec)))?;
                check_bounds(&spec.name, n, c).map_err(invalid)?;
            }
            ParamKind::List(c) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| invalid(type_message(spec)))?;
                check_length(&spec.name, items.len(), c.min_items, c.max_items, "items")
                    .map_err(invalid)?;
            }
        }
    }
    Ok(())
}

fn validate_value(spec: &ParamSpec, value: &Value) -> Result<Value> {
    let field = spec.name.as_str();
    let fail = |msg: String| Error::validation(field, msg);
    match &spec.kind {
        ParamKind::String(c) => {
            let s = value.as_str().ok_or_else(|| fail(type_message(spec)))?;
            validate_string(field, s, c).map(Value::String).map_err(fail)
        }
        ParamKind::Integer(c) => {
            let n = as_integer(value).ok_or_else(|| fail(type_message(spec)))?;
            check_bounds(field, n, c).map_err(fail)?;
            Ok(Value::from(n))
        }
        ParamKind::List(c) => {
            let items = value.as_array().ok_or_else(|| fail(type_message(spec)))?;
            validate_list(field, items, c).map(Value::Array).map_err(fail)
        }
    }
}

fn validate_string(
    field: &str,
    s: &str,
    c: &StringConstraints,
) -> std::result::Result<String, String> {
    let value = match &c.rule {
        StringRule::SearchQuery => s.trim(),
        _ => s,
    };
    check_length(field, value.chars().count(), c.min_len, c.max_len, "characters")?;

    match &c.rule {
        StringRule::Plain | StringRule::SearchQuery => Ok(value.to_string()),
        StringRule::Identifier => {
            check_identifier(field, value)?;
            Ok(value.to_string())
        }
        StringRule::FolderName => {
            check_identifier(field, value)?;
            if let Some(bad) = value.chars().find(|ch| FOLDER_FORBIDDEN.contains(ch)) {
                return Err(format!(
                    "Parameter '{}' contains a character not allowed in folder names: {:?}",
                    field, bad
                ));
            }
            Ok(value.to_string())
        }
        StringRule::OneOf(allowed) => {
            let lowered = value.to_lowercase();
            allowed
                .iter()
                .find(|candidate| **candidate == lowered)
                .map(|candidate| candidate.to_string())
                .ok_or_else(|| {
                    format!(
                        "Parameter '{}' must be one of: {}",
                        field,
                        allowed.join(", ")
                    )
                })
        }
    }
}

fn check_identifier(field: &str, value: &str) -> std::result::Result<(), String> {
    match value
        .chars()
        .find(|ch| ch.is_control() || IDENTIFIER_FORBIDDEN.contains(ch))
    {
        Some(bad) => Err(format!(
            "Parameter '{}' contains an invalid character: {:?}",
            field, bad
        )),
        None => Ok(()),
    }
}

fn validate_list(
    field: &str,
    items: &[Value],
    c: &ListConstraints,
) -> std::result::Result<Vec<Value>, String> {
    check_length(field, items.len(), c.min_items, c.max_items, "items")?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let s = item
                .as_str()
                .ok_or_else(|| format!("Parameter '{}[{}]' must be a string", field, index))?;
            match c.item {
                ListItem::EmailAddress => {
                    let address = s.trim();
                    if !is_valid_email_address(address) {
                        return Err(format!("Invalid email address in '{}': {}", field, s));
                    }
                    Ok(Value::String(address.to_string()))
                }
                ListItem::AttachmentPath => {
                    let len = s.chars().count();
                    if len == 0 || len > MAX_PATH_LEN {
                        return Err(format!(
                            "Attachment path in '{}' must be 1-{} characters",
                            field, MAX_PATH_LEN
                        ));
                    }
                    if s.chars().any(|ch| ch.is_control() || PATH_FORBIDDEN.contains(&ch)) {
                        return Err(format!(
                            "Attachment path in '{}' contains invalid characters: {}",
                            field, s
                        ));
                    }
                    Ok(Value::String(s.to_string()))
                }
                ListItem::Text => Ok(Value::String(s.to_string())),
            }
        })
        .collect()
}

fn check_length(
    field: &str,
    len: usize,
    min: usize,
    max: usize,
    unit: &str,
) -> std::result::Result<(), String> {
    if len < min {
        if min == 1 && unit == "characters" {
            return Err(format!("Parameter '{}' cannot be empty", field));
        }
        return Err(format!(
            "Parameter '{}' must have at least {} {}",
            field, min, unit
        ));
    }
    if len > max {
        return Err(format!(
            "Parameter '{}' must have at most {} {}",
            field, max, unit
        ));
    }
    Ok(())
}

fn check_bounds(field: &str, n: i64, c: &IntegerConstraints) -> std::result::Result<(), String> {
    if n < c.min {
        return Err(format!("Parameter '{}' must be at least {}", field, c.min));
    }
    if n > c.max {
        return Err(format!("Parameter '{}' must be at most {}", field, c.max));
    }
    Ok(())
}

/// Integers only; floats and booleans are rejected
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn type_message(spec: &ParamSpec) -> String {
    let article = match spec.kind {
        ParamKind::Integer(_) | ParamKind::List(_) => "an",
        ParamKind::String(_) => "a",
    };
    let noun = match spec.kind {
        ParamKind::String(_) => "string",
        ParamKind::Integer(_) => "integer",
        ParamKind::List(_) => "array",
    };
    format!("Parameter '{}' must be {} {}", spec.name, article, noun)
}
