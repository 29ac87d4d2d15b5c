//! Wire codec for user schema documents.
//!
//! The directory service returns the whole user schema as one JSON object.
//! Base properties live under `definitions.base.properties`, keyed by index,
//! and the base `required` array lists the mandatory ones:
//!
//! ```json
//! {
//!   "id": "https://example.okta.com/meta/schemas/user/default",
//!   "definitions": {
//!     "base": {
//!       "id": "#base",
//!       "type": "object",
//!       "properties": {
//!         "login": {
//!           "title": "Username",
//!           "type": "string",
//!           "required": true,
//!           "pattern": "[a-z]+",
//!           "permissions": [{ "principal": "SELF", "action": "READ_ONLY" }],
//!           "minLength": 5
//!         }
//!       },
//!       "required": ["login"]
//!     },
//!     "custom": { "id": "#custom", "type": "object", "properties": {} }
//!   }
//! }
//! ```
//!
//! Decoding keeps the raw document; encoding rewrites only the entries that
//! were upserted and leaves everything else exactly as it was fetched.

use crate::document::SchemaDocument;
use crate::error::{Error, Result};
use crate::types::{Permission, SchemaProperty, SchemaScope};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// Principal whose action carries the property's permission level.
const SELF_PRINCIPAL: &str = "SELF";

/// Attribute keys modeled by [`SchemaProperty`]; everything else is opaque.
const MANAGED_KEYS: [&str; 5] = ["title", "type", "required", "permissions", "pattern"];

/// Decode a wire document into a [`SchemaDocument`].
///
/// Attributes that cannot be decoded are left in the raw document and
/// skipped with a warning, so one odd sibling never blocks the rest.
pub fn decode(scope: &SchemaScope, raw: Value) -> Result<SchemaDocument> {
    if !raw.is_object() {
        return Err(Error::Codec {
            scope: scope.clone(),
            message: "document is not a JSON object".to_string(),
        });
    }

    let base_required = required_list(&raw);
    let mut properties = BTreeMap::new();

    if let Some(attributes) = base_properties(&raw) {
        for (index, attribute) in attributes {
            match decode_property(index, attribute, &base_required) {
                Ok(property) => {
                    properties.insert(index.clone(), property);
                }
                Err(message) => {
                    log::warn!("Skipping base property '{index}' in {scope}: {message}");
                }
            }
        }
    } else {
        log::debug!("Schema document for {scope} has no base properties");
    }

    Ok(SchemaDocument {
        properties,
        raw,
        touched: BTreeSet::new(),
    })
}

/// Encode a document back to its wire form.
///
/// Untouched entries are copied verbatim from the fetched document.
pub fn encode(document: &SchemaDocument) -> Value {
    let mut raw = document.raw.clone();

    for index in &document.touched {
        let Some(property) = document.properties.get(index) else {
            continue;
        };
        let Some(attributes) = base_properties_mut(&mut raw) else {
            break;
        };
        let existing = attributes.get(index);
        let encoded = encode_property(property, existing);
        attributes.insert(index.clone(), encoded);
        sync_required(&mut raw, index, property.required);
    }

    raw
}

/// Decode one attribute object.
pub fn decode_property(
    index: &str,
    attribute: &Value,
    base_required: &[String],
) -> std::result::Result<SchemaProperty, String> {
    let object = attribute
        .as_object()
        .ok_or_else(|| "attribute is not an object".to_string())?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing type".to_string())?
        .parse()?;

    let title = object
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let required = object
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or_else(|| base_required.iter().any(|r| r == index));

    let permissions = decode_permission(object.get("permissions"))?;

    let pattern = match object.get("pattern") {
        None | Some(Value::Null) => None,
        Some(Value::String(p)) => Some(p.clone()),
        Some(other) => return Err(format!("pattern is not a string: {other}")),
    };

    let extra = object
        .iter()
        .filter(|(key, _)| !MANAGED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(SchemaProperty {
        index: index.to_string(),
        title,
        kind,
        required,
        permissions,
        pattern,
        extra,
    })
}

/// Encode one property over the attribute it replaces.
///
/// Unmanaged fields of `existing` survive; managed fields are always
/// written, and an absent pattern removes any previous one.
pub fn encode_property(property: &SchemaProperty, existing: Option<&Value>) -> Value {
    let mut object = existing
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    for (key, value) in &property.extra {
        object.insert(key.clone(), value.clone());
    }

    let permissions = encode_permissions(object.get("permissions"), property.permissions);

    object.insert("title".into(), Value::from(property.title.as_str()));
    object.insert("type".into(), Value::from(property.kind.as_str()));
    object.insert("required".into(), Value::from(property.required));
    object.insert("permissions".into(), permissions);
    match &property.pattern {
        Some(pattern) => {
            object.insert("pattern".into(), Value::from(pattern.as_str()));
        }
        None => {
            object.remove("pattern");
        }
    }

    Value::Object(object)
}

fn decode_permission(value: Option<&Value>) -> std::result::Result<Permission, String> {
    let entries = value
        .and_then(Value::as_array)
        .ok_or_else(|| "missing permissions".to_string())?;

    entries
        .iter()
        .find(|entry| entry.get("principal").and_then(Value::as_str) == Some(SELF_PRINCIPAL))
        .and_then(|entry| entry.get("action").and_then(Value::as_str))
        .ok_or_else(|| "no SELF permission".to_string())?
        .parse()
}

/// Update the SELF action in place, keeping any other principals.
fn encode_permissions(existing: Option<&Value>, permission: Permission) -> Value {
    let mut entries = existing
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let self_entry = entries
        .iter_mut()
        .find(|entry| entry.get("principal").and_then(Value::as_str) == Some(SELF_PRINCIPAL));

    match self_entry {
        Some(Value::Object(entry)) => {
            entry.insert("action".into(), Value::from(permission.as_str()));
        }
        _ => entries.push(json!({
            "principal": SELF_PRINCIPAL,
            "action": permission.as_str(),
        })),
    }

    Value::Array(entries)
}

pub(crate) fn base_properties(raw: &Value) -> Option<&Map<String, Value>> {
    raw.pointer("/definitions/base/properties")
        .and_then(Value::as_object)
}

fn required_list(raw: &Value) -> Vec<String> {
    raw.pointer("/definitions/base/required")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Walk to `definitions.base.properties`, creating missing objects.
fn base_properties_mut(raw: &mut Value) -> Option<&mut Map<String, Value>> {
    let base = base_mut(raw)?;
    child_object(base, "properties")
}

fn base_mut(raw: &mut Value) -> Option<&mut Map<String, Value>> {
    let definitions = child_object(raw.as_object_mut()?, "definitions")?;
    child_object(definitions, "base")
}

fn child_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    let slot = map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

/// Keep `definitions.base.required` in step with one property's flag.
fn sync_required(raw: &mut Value, index: &str, required: bool) {
    let Some(base) = base_mut(raw) else {
        return;
    };

    match base.get_mut("required") {
        Some(Value::Array(items)) => {
            let present = items.iter().any(|v| v.as_str() == Some(index));
            if required && !present {
                items.push(Value::from(index));
            } else if !required && present {
                items.retain(|v| v.as_str() != Some(index));
            }
        }
        _ if required => {
            base.insert("required".into(), json!([index]));
        }
        _ => {}
    }
}
