//! Per-resource transforms from raw store rows to the public payload shape.
//!
//! Shaping is deterministic and never fails: undecodable sub-fields fall back
//! to their empty value so a single malformed row cannot take a listing down.

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::application::repos::Row;
use crate::domain::resource::Resource;

use super::entry::Payload;

/// A sub-field that could not be decoded into its public form.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("`images` text is not a JSON list of strings: {0}")]
    ImagesText(#[from] serde_json::Error),
    #[error("`images` has unsupported {0} representation")]
    ImagesKind(&'static str),
}

/// Materialize `rows` into the shape served for `resource`.
pub fn shape(resource: Resource, rows: Vec<Row>) -> Payload {
    match resource {
        Resource::Settings => Payload::Mapping(settings_mapping(rows)),
        Resource::Experiences => Payload::Records(rows.into_iter().map(experience).collect()),
        Resource::Certifications => {
            Payload::Records(rows.into_iter().map(certification).collect())
        }
        Resource::Projects | Resource::Posts => {
            Payload::Records(rows.into_iter().map(with_default_tags).collect())
        }
    }
}

/// Collapse `{key, value}` rows into a mapping. Later rows win on duplicate keys.
fn settings_mapping(rows: Vec<Row>) -> Map<String, Value> {
    let mut mapping = Map::new();
    for mut row in rows {
        match row.remove("key") {
            Some(Value::String(key)) => {
                let value = row.remove("value").unwrap_or(Value::Null);
                mapping.insert(key, value);
            }
            other => debug!(key = ?other, "skipping settings row without a text key"),
        }
    }
    mapping
}

fn experience(mut row: Row) -> Value {
    let images = decode_images(row.get("images")).unwrap_or_else(|err| {
        debug!(id = ?row.get("id"), error = %err, "falling back to no experience images");
        Vec::new()
    });
    let tags = split_tags(row.get("tags"));
    let image = match row.get("image") {
        Some(Value::String(image)) if !image.is_empty() => image.clone(),
        _ => images.first().cloned().unwrap_or_default(),
    };

    let id = take(&mut row, "id");
    let title = take(&mut row, "title");
    let organization = take(&mut row, "organization");
    let period = take(&mut row, "period");
    let description = take(&mut row, "description");
    let kind = take(&mut row, "type");
    let start_date = take(&mut row, "start_date");

    json!({
        "id": id,
        "title": title,
        "organization": organization,
        "period": period,
        "description": description,
        "type": kind,
        "image": image,
        "images": images,
        "tags": tags,
        "startDate": start_date,
    })
}

fn certification(mut row: Row) -> Value {
    let issue_date = month_prefix(row.get("issue_date"));
    let expiry_date = month_prefix(row.get("expiry_date"));

    let id = take(&mut row, "id");
    let name = take(&mut row, "name");
    let organization = take(&mut row, "organization");
    let credential_id = take(&mut row, "credential_id");
    let credential_url = take(&mut row, "credential_url");
    let image = take(&mut row, "image");
    let skills = match take(&mut row, "skills") {
        Value::Null => Value::Array(Vec::new()),
        skills => skills,
    };

    json!({
        "id": id,
        "name": name,
        "organization": organization,
        "issueDate": issue_date,
        "expiryDate": expiry_date,
        "credentialId": credential_id,
        "credentialUrl": credential_url,
        "image": image,
        "skills": skills,
    })
}

fn with_default_tags(mut row: Row) -> Value {
    if matches!(row.get("tags"), None | Some(Value::Null)) {
        row.insert("tags".to_string(), Value::Array(Vec::new()));
    }
    Value::Object(row)
}

fn take(row: &mut Row, key: &str) -> Value {
    row.remove(key).unwrap_or(Value::Null)
}

/// Split a comma-joined tag string. Arrays pass through; anything else is no tags.
pub fn split_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(joined)) if !joined.is_empty() => {
            joined.split(',').map(str::to_string).collect()
        }
        Some(Value::Array(items)) => strings(items),
        _ => Vec::new(),
    }
}

/// Decode `images`, which arrives either as a list or as JSON-encoded text.
pub fn decode_images(value: Option<&Value>) -> Result<Vec<String>, DecodeError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(strings(items)),
        Some(Value::String(text)) => Ok(serde_json::from_str(text)?),
        Some(Value::Bool(_)) => Err(DecodeError::ImagesKind("boolean")),
        Some(Value::Number(_)) => Err(DecodeError::ImagesKind("numeric")),
        Some(Value::Object(_)) => Err(DecodeError::ImagesKind("object")),
    }
}

/// First seven characters (`YYYY-MM`) of a date, or empty when absent.
pub fn month_prefix(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(date)) => date.chars().take(7).collect(),
        Some(Value::Number(number)) => number.to_string().chars().take(7).collect(),
        _ => String::new(),
    }
}

fn strings(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect()
}
