//! Request body construction.
//!
//! This module provides [`BodyBuilder`], which encodes request payloads in
//! one of three ways:
//!
//! - **JSON**: `application/json`
//! - **MessagePack**: `application/x-msgpack`
//! - **Raw**: pre-encoded bytes passed through untouched, for content types
//!   such as `application/octet-stream` or `application/zip`
//!
//! The JSON and MessagePack variants share one contract and differ only in
//! the bytes they produce. Every `set_*` call either replaces the body
//! completely or fails and leaves the previous body in place.
//!
//! # Example
//!
//! ```
//! use docwire_core::{BodyBuilder, WireFormat};
//! use serde_json::json;
//!
//! let mut body = BodyBuilder::new(WireFormat::Json);
//! body.set_body_merge(&json!({"name": "jan", "age": 40}), &json!({"age": 41}))?;
//! assert_eq!(body.content_type(), "application/json");
//! # Ok::<(), docwire_core::BodyError>(())
//! ```

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::merge::{kind, merge_values};
use crate::raw::to_raw_bytes;
use crate::{BodyError, WireFormat, is_raw_content_type, merge_patch};

/// How a bulk import body was laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportLayout {
    /// One encoded record per line.
    Lines,
    /// A single encoded array. The import endpoint must be told with
    /// `type=list`.
    List,
}

/// Encoder for request payloads.
///
/// A closed set of variants selected by content type; see
/// [`BodyBuilder::for_content_type`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyBuilder {
    /// JSON encoded body.
    Json(Bytes),
    /// MessagePack encoded body.
    MessagePack(Bytes),
    /// Pre-encoded bytes with their own content type.
    Raw { content_type: String, body: Bytes },
}

impl Default for BodyBuilder {
    fn default() -> Self {
        BodyBuilder::Json(Bytes::new())
    }
}

impl BodyBuilder {
    /// Create an empty builder for the given wire format.
    pub fn new(format: WireFormat) -> Self {
        match format {
            WireFormat::Json => BodyBuilder::Json(Bytes::new()),
            WireFormat::MessagePack => BodyBuilder::MessagePack(Bytes::new()),
        }
    }

    /// Create an empty raw passthrough builder.
    pub fn raw<S: Into<String>>(content_type: S) -> Self {
        BodyBuilder::Raw {
            content_type: content_type.into(),
            body: Bytes::new(),
        }
    }

    /// Create an empty builder matching a `Content-Type` value.
    ///
    /// Returns `None` for content types no builder handles.
    pub fn for_content_type(content_type: &str) -> Option<Self> {
        if is_raw_content_type(content_type) {
            return Some(Self::raw(content_type));
        }
        WireFormat::from_content_type(content_type).map(Self::new)
    }

    /// The wire format this builder encodes, `None` for raw bodies.
    pub fn format(&self) -> Option<WireFormat> {
        match self {
            BodyBuilder::Json(_) => Some(WireFormat::Json),
            BodyBuilder::MessagePack(_) => Some(WireFormat::MessagePack),
            BodyBuilder::Raw { .. } => None,
        }
    }

    /// The content type of the encoded body.
    pub fn content_type(&self) -> &str {
        match self {
            BodyBuilder::Json(_) => WireFormat::Json.content_type(),
            BodyBuilder::MessagePack(_) => WireFormat::MessagePack.content_type(),
            BodyBuilder::Raw { content_type, .. } => content_type,
        }
    }

    /// The encoded body.
    pub fn body(&self) -> &Bytes {
        match self {
            BodyBuilder::Json(body) | BodyBuilder::MessagePack(body) => body,
            BodyBuilder::Raw { body, .. } => body,
        }
    }

    /// Returns true if no body has been set.
    pub fn is_empty(&self) -> bool {
        self.body().is_empty()
    }

    /// Encode a single value as the body.
    ///
    /// Raw builders take the value as is: a string, or a byte sequence such
    /// as `Vec<u8>`, `[u8; N]` or `&[u8]`. Nothing is re-encoded. Use
    /// [`set_raw_body`](Self::set_raw_body) to hand over a `Bytes` buffer
    /// without copying.
    pub fn set_body<T>(&mut self, body: &T) -> Result<(), BodyError>
    where
        T: Serialize + ?Sized,
    {
        let encoded = if matches!(self, BodyBuilder::Raw { .. }) {
            to_raw_bytes(body)?
        } else {
            self.encode("set_body", body)?
        };
        self.replace(encoded);
        Ok(())
    }

    /// Set the pre-encoded payload of a raw builder.
    ///
    /// JSON and MessagePack builders reject this with `InvalidArgument`,
    /// since their bodies must be produced by the encoder.
    pub fn set_raw_body<B: Into<Bytes>>(&mut self, payload: B) -> Result<(), BodyError> {
        match self {
            BodyBuilder::Raw { body, .. } => {
                *body = payload.into();
                Ok(())
            }
            _ => Err(BodyError::invalid_argument(format!(
                "set_raw_body requires a raw content type, not {}",
                self.content_type()
            ))),
        }
    }

    /// Encode the fields of `patch` merged over the fields of `base`.
    ///
    /// Keys present in both take the value from `patch`.
    pub fn set_body_merge<B, P>(&mut self, base: &B, patch: &P) -> Result<(), BodyError>
    where
        B: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        self.ensure_encoded("set_body_merge")?;
        let merged = merge_patch(base, patch)?;
        let encoded = self.encode("set_body_merge", &merged)?;
        self.replace(encoded);
        Ok(())
    }

    /// Set the body from one or two dynamically typed parts.
    ///
    /// One part is encoded as is, two parts are `(base, patch)` and encoded
    /// as their merge. Any other count is rejected.
    pub fn set_body_parts(&mut self, parts: &[Value]) -> Result<(), BodyError> {
        match parts {
            [body] => self.set_body(body),
            [base, patch] => self.set_body_merge(base, patch),
            _ => Err(BodyError::invalid_argument(format!(
                "must provide 1 or 2 bodies, got {}",
                parts.len()
            ))),
        }
    }

    /// Encode a sequence as a single array.
    ///
    /// `items` must serialize to a sequence.
    pub fn set_body_array<T>(&mut self, items: &T) -> Result<(), BodyError>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_encoded("set_body_array")?;
        sequence("set_body_array", items)?;
        let encoded = self.encode("set_body_array", items)?;
        self.replace(encoded);
        Ok(())
    }

    /// Encode a sequence as a single array where element `i` is
    /// `patches[i]` merged over `items[i]`.
    ///
    /// `items` must serialize to a sequence with exactly one element per
    /// patch.
    pub fn set_body_array_merged<T, P>(&mut self, items: &T, patches: &[P]) -> Result<(), BodyError>
    where
        T: Serialize + ?Sized,
        P: Serialize,
    {
        self.ensure_encoded("set_body_array")?;
        let items = sequence("set_body_array", items)?;
        if items.len() != patches.len() {
            return Err(BodyError::invalid_argument(format!(
                "got {} merge patches for {} items",
                patches.len(),
                items.len()
            )));
        }

        let merged = items
            .into_iter()
            .zip(patches)
            .map(|(item, patch)| {
                let patch =
                    serde_json::to_value(patch).map_err(|e| BodyError::encode("set_body_array", e))?;
                merge_values(item, patch)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let encoded = self.encode("set_body_array", &merged)?;
        self.replace(encoded);
        Ok(())
    }

    /// Encode a sequence for the bulk import endpoint.
    ///
    /// JSON bodies get one record per line, in input order. A `null` element
    /// (e.g. `None` in a `Vec<Option<T>>`) becomes an empty line, which the
    /// import endpoint skips.
    ///
    /// MessagePack has no line-delimited form, so the whole sequence is
    /// encoded as one array and [`ImportLayout::List`] is returned. The
    /// caller must then add `type=list` to the request.
    pub fn set_body_import_array<T>(&mut self, items: &T) -> Result<ImportLayout, BodyError>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_encoded("set_body_import_array")?;
        let items = sequence("set_body_import_array", items)?;

        let (encoded, layout) = match self.format() {
            Some(WireFormat::MessagePack) => {
                let encoded = self.encode("set_body_import_array", &items)?;
                (encoded, ImportLayout::List)
            }
            _ => (encode_lines(&items)?, ImportLayout::Lines),
        };

        self.replace(encoded);
        Ok(layout)
    }

    fn encode<T>(&self, operation: &'static str, value: &T) -> Result<Vec<u8>, BodyError>
    where
        T: Serialize + ?Sized,
    {
        match self.format() {
            Some(format) => format.encode_for(operation, value),
            None => Err(raw_unsupported(operation)),
        }
    }

    fn ensure_encoded(&self, operation: &'static str) -> Result<(), BodyError> {
        match self {
            BodyBuilder::Raw { .. } => Err(raw_unsupported(operation)),
            _ => Ok(()),
        }
    }

    fn replace(&mut self, encoded: Vec<u8>) {
        let encoded = Bytes::from(encoded);
        match self {
            BodyBuilder::Json(body) | BodyBuilder::MessagePack(body) => *body = encoded,
            BodyBuilder::Raw { body, .. } => *body = encoded,
        }
    }
}

fn raw_unsupported(operation: &'static str) -> BodyError {
    BodyError::invalid_argument(format!("{operation} is not supported for raw bodies"))
}

/// Serialize `items` and require a sequence.
fn sequence<T>(operation: &'static str, items: &T) -> Result<Vec<Value>, BodyError>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_value(items).map_err(|e| BodyError::encode(operation, e))? {
        Value::Array(items) => Ok(items),
        other => Err(BodyError::invalid_argument(format!(
            "{operation}: items must be a sequence, got {}",
            kind(&other)
        ))),
    }
}

/// One JSON record per line, `null` as an empty line.
fn encode_lines(items: &[Value]) -> Result<Vec<u8>, BodyError> {
    let mut out = Vec::new();
    for item in items {
        if !item.is_null() {
            serde_json::to_writer(&mut out, item)
                .map_err(|e| BodyError::encode("set_body_import_array", e))?;
        }
        out.push(b'\n');
    }
    Ok(out)
}
