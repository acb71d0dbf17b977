use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{SchemaError, Violation};
use crate::metadata::Role;

/// Major number of the metadata specification this crate understands.
///
/// Documents announce their own `spec_version`; anything outside this major
/// line is rejected at validation time.
pub const SUPPORTED_SPEC_MAJOR: u32 = 1;

static SPEC_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{SUPPORTED_SPEC_MAJOR}\.[0-9]+\.[0-9]+$"))
        .expect("supported spec_version pattern is valid")
});

/// Validates a decoded metadata document against the composed schema for a
/// role.
///
/// The base constraints shared by every role run first, then the fields the
/// role itself contributes. Validation never stops at the first problem;
/// every violation is collected so one round trip to the repository surfaces
/// everything wrong with a document.
///
/// # Arguments
/// * `role` - role whose composed schema the document must satisfy
/// * `document` - decoded document, outer signature envelope included
///
/// # Returns
/// * `Result<(), SchemaError>` - `Ok` when every constraint holds, otherwise
///   the full violation list
pub fn validate(role: &Role, document: &Value) -> Result<(), SchemaError> {
    let mut violations = Vec::new();

    if let Some(document) = require_object(document, "document", &mut violations) {
        check_document_fields(role, document, &mut violations);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError {
            role: role.name().to_string(),
            violations,
        })
    }
}

/// The outer document carries exactly the signed payload and its signatures.
fn check_document_fields(
    role: &Role,
    document: &Map<String, Value>,
    violations: &mut Vec<Violation>,
) {
    for field in document.keys() {
        if field != "signed" && field != "signatures" {
            violations.push(Violation::new(field.clone(), "unexpected field"));
        }
    }

    if let Some(value) = require_field(document, "signed", "signed", violations) {
        if let Some(signed) = require_object(value, "signed", violations) {
            check_signed_fields(role, signed, violations);
            role.check_contributed_fields(signed, violations);
        }
    }

    if let Some(value) = require_field(document, "signatures", "signatures", violations) {
        check_signatures(value, violations);
    }
}

/// Base constraints every role's payload shares. Unknown fields inside
/// `signed` are tolerated so newer repositories keep validating.
fn check_signed_fields(role: &Role, signed: &Map<String, Value>, violations: &mut Vec<Violation>) {
    if let Some(value) = require_field(signed, "_type", "signed._type", violations) {
        if let Some(actual) = require_nonblank_string(value, "signed._type", violations) {
            if actual != role.type_name() {
                violations.push(Violation::new(
                    "signed._type",
                    format!("must be \"{}\", got \"{actual}\"", role.type_name()),
                ));
            }
        }
    }

    if let Some(value) = require_field(signed, "spec_version", "signed.spec_version", violations) {
        if let Some(version) = require_nonblank_string(value, "signed.spec_version", violations) {
            if !SPEC_VERSION.is_match(version) {
                violations.push(Violation::new(
                    "signed.spec_version",
                    format!("unsupported specification version \"{version}\""),
                ));
            }
        }
    }

    if let Some(value) = require_field(signed, "version", "signed.version", violations) {
        require_integer(value, "signed.version", 1, violations);
    }

    if let Some(value) = require_field(signed, "expires", "signed.expires", violations) {
        if let Some(expires) = require_nonblank_string(value, "signed.expires", violations) {
            if DateTime::parse_from_rfc3339(expires).is_err() {
                violations.push(Violation::new(
                    "signed.expires",
                    format!("must be an ISO 8601 date-time, got \"{expires}\""),
                ));
            }
        }
    }
}

/// Signature entries are a closed shape: exactly a key reference and a
/// signature value, both non-blank strings.
fn check_signatures(value: &Value, violations: &mut Vec<Violation>) {
    let Some(signatures) = require_array(value, "signatures", violations) else {
        return;
    };
    if signatures.is_empty() {
        violations.push(Violation::new(
            "signatures",
            "must contain at least 1 element, got 0",
        ));
        return;
    }
    for (index, entry) in signatures.iter().enumerate() {
        let entry_path = format!("signatures[{index}]");
        let Some(entry) = require_object(entry, &entry_path, violations) else {
            continue;
        };
        for field in entry.keys() {
            if field != "keyid" && field != "sig" {
                violations.push(Violation::new(
                    format!("{entry_path}.{field}"),
                    "unexpected field",
                ));
            }
        }
        for field in ["keyid", "sig"] {
            let field_path = format!("{entry_path}.{field}");
            if let Some(value) = require_field(entry, field, &field_path, violations) {
                require_nonblank_string(value, &field_path, violations);
            }
        }
    }
}

pub(crate) fn require_field<'a>(
    map: &'a Map<String, Value>,
    field: &str,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<&'a Value> {
    let value = map.get(field);
    if value.is_none() {
        violations.push(Violation::new(path, "required field is missing"));
    }
    value
}

pub(crate) fn require_object<'a>(
    value: &'a Value,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<&'a Map<String, Value>> {
    let object = value.as_object();
    if object.is_none() {
        violations.push(Violation::new(
            path,
            format!("must be an object, got {}", describe(value)),
        ));
    }
    object
}

pub(crate) fn require_array<'a>(
    value: &'a Value,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<&'a Vec<Value>> {
    let array = value.as_array();
    if array.is_none() {
        violations.push(Violation::new(
            path,
            format!("must be an array, got {}", describe(value)),
        ));
    }
    array
}

pub(crate) fn require_nonblank_string<'a>(
    value: &'a Value,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<&'a str> {
    match value.as_str() {
        Some(string) if string.trim().is_empty() => {
            violations.push(Violation::new(path, "must not be blank"));
            None
        }
        Some(string) => Some(string),
        None => {
            violations.push(Violation::new(
                path,
                format!("must be a string, got {}", describe(value)),
            ));
            None
        }
    }
}

pub(crate) fn require_integer(
    value: &Value,
    path: &str,
    min: u64,
    violations: &mut Vec<Violation>,
) -> Option<u64> {
    match value.as_u64() {
        Some(number) if number >= min => Some(number),
        Some(number) => {
            violations.push(Violation::new(
                path,
                format!("must be greater than or equal to {min}, got {number}"),
            ));
            None
        }
        None => {
            violations.push(Violation::new(
                path,
                format!(
                    "must be an integer greater than or equal to {min}, got {}",
                    describe(value)
                ),
            ));
            None
        }
    }
}

/// Renders a value for a violation message so the reader sees what the
/// document actually said.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::String(string) => format!("\"{string}\""),
        Value::Array(items) => format!("an array of {} elements", items.len()),
        Value::Object(members) => format!("an object with {} members", members.len()),
        other => other.to_string(),
    }
}
