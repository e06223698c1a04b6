use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

/// One part of a multipart form, as given to `-F`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    /// Explicit MIME type from `;type=`. `None` lets the writer infer one.
    pub content_type: Option<String>,
    /// `value` is a path to stream rather than literal content.
    pub is_file: bool,
    pub value: String,
    /// Filename reported in the part. Only meaningful when `is_file` is set.
    pub filealias: String,
}

/// Form fields keyed by name, in first-seen order.
pub type FormData = IndexMap<String, Field>;

/// Errors produced while parsing `-F` values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("not a valid key-value pair: '{0}'")]
    InvalidPair(String),

    #[error("malformed form data")]
    Malformed,
}

/// Parse every `-F` value into a `FormData`.
///
/// A name given twice keeps its original position and takes the later value.
pub fn parse_form<S: AsRef<str>>(raw: &[S]) -> Result<FormData, FormError> {
    let mut form = FormData::new();
    for value in raw {
        let (name, field) = parse_field(value.as_ref())?;
        form.insert(name, field);
    }
    Ok(form)
}

/// Parse a single `name=value[;type=MIME][;filename=alias]` value.
///
/// # Arguments
///
/// * `raw` - The flag value as typed by the user.
///
/// # Returns
///
/// * `Result<(String, Field), FormError>` - The field name and its descriptor.
pub fn parse_field(raw: &str) -> Result<(String, Field), FormError> {
    let mut field = Field::default();
    let mut name: Option<String> = None;

    for (i, part) in split_params(raw).iter().enumerate() {
        let (key, value) = key_value(part)?;
        match key {
            "type" => field.content_type = Some(value.to_string()),
            "filename" => field.filealias = value.to_string(),
            _ => {
                if name.is_some() || i != 0 {
                    return Err(FormError::Malformed);
                }
                name = Some(key.to_string());
                match value.strip_prefix('@') {
                    Some(path) if !path.is_empty() => {
                        field.is_file = true;
                        field.value = path.to_string();
                    }
                    _ => {
                        field.is_file = false;
                        field.value = value.to_string();
                    }
                }
            }
        }
    }

    if field.is_file && field.filealias.is_empty() {
        field.filealias = base_name(&field.value);
    }

    Ok((name.unwrap_or_default(), field))
}

/// Split on `;` outside double quotes. Quotes are dropped and empty parts skipped.
fn split_params(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn key_value(part: &str) -> Result<(&str, &str), FormError> {
    part.split_once('=')
        .ok_or_else(|| FormError::InvalidPair(part.to_string()))
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
