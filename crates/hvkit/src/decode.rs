//! Decoding the JSON payload printed by the `GetFile` script.
//!
//! Wire format (field names and casing are fixed):
//!
//! ```text
//! {"Path":"C:\\vm\\a.iso","Name":"a.iso","Size":1024,"DirName":"C:\\vm",
//!  "Exists":true,"CreationTime":"...","LastWriteTime":"..."}
//! {"Exists": false}
//! ```
//!
//! The script lists whatever sits at the path, so a directory with exactly
//! one child reads as that child, and an empty directory reads as absent.
//! `DirName` and `Size` are null when that child is itself a directory.

use crate::error::{Error, Result};
use crate::types::FileResource;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One item as serialized by the script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FilePayload {
    #[serde(default, deserialize_with = "string_or_null")]
    path: String,
    #[serde(default, deserialize_with = "string_or_null")]
    name: String,
    #[serde(default, deserialize_with = "size_or_null")]
    size: u64,
    #[serde(default, deserialize_with = "string_or_null")]
    dir_name: String,
    exists: Option<bool>,
    #[serde(default, deserialize_with = "opaque_string")]
    creation_time: String,
    #[serde(default, deserialize_with = "opaque_string")]
    last_write_time: String,
}

/// `Length` is null for directories.
fn size_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_null<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps are kept verbatim whatever JSON scalar the host produced.
fn opaque_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Decode captured `GetFile` output into a [`FileResource`].
///
/// Absence (empty output or `Exists: false`) is a normal outcome, not an
/// error. Anything that is not the expected shape is a decode error.
pub fn decode(raw: &str) -> Result<FileResource> {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(FileResource::absent());
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| Error::decode(format!("malformed JSON: {e}"), raw))?;

    let item = match value {
        Value::Object(_) => value,
        Value::Array(mut items) => match items.len() {
            0 => return Ok(FileResource::absent()),
            1 => items.remove(0),
            n => {
                return Err(Error::decode(
                    format!("path matched {n} items, expected a single file"),
                    raw,
                ));
            }
        },
        _ => return Err(Error::decode("expected a JSON object", raw)),
    };

    let payload: FilePayload = serde_json::from_value(item)
        .map_err(|e| Error::decode(format!("unexpected payload shape: {e}"), raw))?;

    match payload.exists {
        None => Err(Error::decode("payload has no Exists field", raw)),
        Some(false) => Ok(FileResource::absent()),
        Some(true) => Ok(FileResource {
            path: payload.path,
            source: String::new(),
            name: payload.name,
            size: payload.size,
            directory_name: payload.dir_name,
            exists: true,
            creation_time: payload.creation_time,
            last_write_time: payload.last_write_time,
        }),
    }
}
