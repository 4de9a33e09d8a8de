//! Multipart form fields for upload endpoints.

use reqwest::multipart::{Form, Part};

use super::error::Result;

/// Content type the upload endpoints expect on named file parts.
pub const FILE_PART_CONTENT_TYPE: &str = "multipart/form-data";

/// A single named field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartField {
    /// The form field name, e.g. `urls[0]`.
    pub name: String,
    /// The field payload.
    pub value: FieldValue,
}

/// Payload of a multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A plain text value.
    Text(String),
    /// Binary content, optionally sent as a named file.
    File {
        filename: Option<String>,
        contents: Vec<u8>,
    },
}

impl MultipartField {
    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        }
    }

    /// A file field carrying `contents` under `filename`.
    pub fn file(name: impl Into<String>, filename: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::File {
                filename: Some(filename.into()),
                contents,
            },
        }
    }

    /// A binary field without a filename.
    pub fn bytes(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::File {
                filename: None,
                contents,
            },
        }
    }
}

/// Encode fields, in order, into a reqwest form.
pub(crate) fn build_form(fields: Vec<MultipartField>) -> Result<Form> {
    let mut form = Form::new();
    for field in fields {
        form = match field.value {
            FieldValue::Text(text) => form.text(field.name, text),
            FieldValue::File {
                filename: Some(filename),
                contents,
            } => {
                let part = Part::bytes(contents)
                    .file_name(filename)
                    .mime_str(FILE_PART_CONTENT_TYPE)?;
                form.part(field.name, part)
            }
            FieldValue::File {
                filename: None,
                contents,
            } => form.part(field.name, Part::bytes(contents)),
        };
    }
    Ok(form)
}
