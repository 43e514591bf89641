//! Configuration validation.
//!
//! Data-source configuration arrives as `serde_json::Value`. It is checked
//! against the data source [`Schema`] first, then every filter directive is
//! checked on its own so that the user gets one diagnostic per faulty
//! directive before any request is sent.
//!
//! # Example
//!
//! ```
//! use fabric_catalog::schema::{Attribute, Schema};
//! use fabric_catalog::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0().with_attribute("cheapest", Attribute::optional_bool());
//!
//! assert!(validate(&schema, &json!({"cheapest": true})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"cheapest": "yes"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("cheapest".to_string()));
//! ```

use serde_json::Value;

use crate::error::FilterError;
use crate::filter::FilterDirective;
use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema};

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is
/// valid. Computed attributes and computed blocks are ignored.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Like [`validate`], returning `Err` with the diagnostics when invalid.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Check every directive with `check`, reporting failures at
/// `filters.<index>.<attribute>`.
///
/// Unlike compilation this does not stop at the first failure and does not
/// de-duplicate names.
pub fn filter_diagnostics<F>(directives: &[FilterDirective], check: F) -> Vec<Diagnostic>
where
    F: Fn(&FilterDirective) -> Result<(), FilterError>,
{
    directives
        .iter()
        .enumerate()
        .filter_map(|(i, directive)| check(directive).err().map(|err| filter_diagnostic(i, err)))
        .collect()
}

/// Check the directives the compiler would keep, reporting failures at
/// `filters.<index>.<attribute>`.
///
/// A directive followed by another on the same name is replaced during
/// compilation, so only the last directive per name is checked.
pub fn compiled_filter_diagnostics(directives: &[FilterDirective]) -> Vec<Diagnostic> {
    directives
        .iter()
        .enumerate()
        .filter(|(i, directive)| {
            !directives[i + 1..]
                .iter()
                .any(|later| later.name == directive.name)
        })
        .filter_map(|(i, directive)| directive.clause().err().map(|err| filter_diagnostic(i, err)))
        .collect()
}

fn filter_diagnostic(index: usize, err: FilterError) -> Diagnostic {
    Diagnostic::error("Invalid filter")
        .with_detail(err.to_string())
        .with_attribute(format!("filters.{}.{}", index, err.attribute()))
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diag = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        if nested.computed {
            continue;
        }
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let ok = match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => value.is_i64() || value.as_f64().is_some_and(|f| f.fract() == 0.0),
        AttributeType::Float64 => value.is_number(),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::List(element_type) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    // Terraform sends unknown list elements as null.
                    if !item.is_null() {
                        validate_attribute_type(element_type, item, &format!("{}.{}", path, i), diagnostics);
                    }
                }
                true
            },
            None => false,
        },
        AttributeType::Map(value_type) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    validate_attribute_type(value_type, item, &format!("{}.{}", path, key), diagnostics);
                }
                true
            },
            None => false,
        },
    };

    if !ok {
        diagnostics.push(type_error(path, type_name(attr_type), value));
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (nested.nesting_mode, value) {
        (_, None | Some(Value::Null)) => {},
        (BlockNestingMode::Single, Some(v)) => validate_block(&nested.block, v, path, diagnostics),
        (BlockNestingMode::List, Some(Value::Array(items))) => {
            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        },
        (BlockNestingMode::List, Some(v)) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn type_name(attr_type: &AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Float64 => "float64",
        AttributeType::Bool => "bool",
        AttributeType::List(_) => "list",
        AttributeType::Map(_) => "map",
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}
