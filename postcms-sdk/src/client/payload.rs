//! Request payload encoding.
//!
//! - [`QueryParams`] become the query string of a GET request. Scalars are sent
//!   as-is, arrays comma-joined and objects JSON-stringified.
//! - [`FormPayload`] becomes the multipart body of a POST request. Files are
//!   attached natively, objects and arrays are JSON-stringified.
//!
//! `null` values are dropped by both encoders.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::{Map, Value};

use super::controller::ProgressFn;
use crate::errors::{RequestError, Result};

/// Size of the chunks a file body is streamed in when progress is observed.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// File name browsers give to nameless blobs.
const BLOB_FILE_NAME: &str = "blob";

fn to_object<T: Serialize + ?Sized>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(RequestError::Validation {
            message: format!("payload must serialize to a JSON object, got {other}"),
        }
        .into()),
        Err(e) => Err(RequestError::Validation {
            message: format!("failed to serialize payload: {e}"),
        }
        .into()),
    }
}

/// Text form of a value nested inside an array.
fn join_element(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(join_element).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

// --- Query string ---

/// Parameters of a GET request.
///
/// # Example
/// ```
/// # use postcms::QueryParams;
/// let params = QueryParams::new()
///     .insert("tags", vec!["news", "tech"])
///     .insert("limit", 10);
/// let pairs = params.pairs();
/// assert!(pairs.contains(&("tags".to_string(), "news,tech".to_string())));
/// assert!(pairs.contains(&("limit".to_string(), "10".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(Map<String, Value>);

impl QueryParams {
    /// No parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any value serializing to a JSON object.
    ///
    /// # Errors
    /// - [`RequestError::Validation`] if `value` is not an object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self(to_object(value)?))
    }

    /// Add or replace one parameter.
    #[must_use]
    pub fn insert<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// True when no parameter will be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Value::is_null)
    }

    /// The encoded `(key, value)` pairs, before percent-encoding.
    #[must_use]
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    Value::Array(items) => {
                        items.iter().map(join_element).collect::<Vec<_>>().join(",")
                    }
                    other => other.to_string(),
                };
                Some((key.clone(), text))
            })
            .collect()
    }
}

// --- Multipart form ---

/// File or blob attached to a mutation.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    bytes: Vec<u8>,
    file_name: Option<String>,
    mime: Option<String>,
}

impl FileUpload {
    /// Nameless blob.
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: None,
            mime: None,
        }
    }

    /// Read a file from disk, keeping its file name.
    ///
    /// # Errors
    /// - [`RequestError::Validation`] if the file cannot be read.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RequestError::Validation {
                message: format!("cannot read upload file {}: {e}", path.display()),
            })?;
        let mut upload = Self::from_bytes(bytes);
        upload.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(upload)
    }

    /// Set the file name sent with the part.
    #[must_use]
    pub fn file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the MIME type sent with the part.
    #[must_use]
    pub fn mime<S: Into<String>>(mut self, mime: S) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// True for an empty file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn into_part(self, progress: Option<&Tracker>) -> Result<Part> {
        let name = self
            .file_name
            .unwrap_or_else(|| BLOB_FILE_NAME.to_string());
        let part = match progress {
            None => Part::bytes(self.bytes),
            Some(tracker) => {
                let len = self.bytes.len() as u64;
                let tracker = tracker.clone();
                let chunks: Vec<Vec<u8>> =
                    self.bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
                let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
                    tracker.advance(chunk.len() as u64);
                    Ok::<_, std::io::Error>(chunk)
                }));
                Part::stream_with_length(reqwest::Body::wrap_stream(stream), len)
            }
        };
        let part = part.file_name(name);
        match self.mime {
            Some(mime) => Ok(part.mime_str(&mime)?),
            None => Ok(part),
        }
    }
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("len", &self.bytes.len())
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .finish()
    }
}

/// One field of a [`FormPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Plain text field.
    Text(String),
    /// File part.
    File(FileUpload),
}

/// Multipart body of a POST request.
///
/// # Example
/// ```
/// # use postcms::{FormPayload, FormValue};
/// # use serde_json::json;
/// let form = FormPayload::from_serialize(&json!({
///     "id": "p1",
///     "status": 2,
///     "tags": ["a", "b"],
///     "gone": null,
/// }))?;
/// assert_eq!(form.get("status"), Some(&FormValue::Text("2".into())));
/// assert_eq!(form.get("tags"), Some(&FormValue::Text(r#"["a","b"]"#.into())));
/// assert!(form.get("gone").is_none());
/// # Ok::<_, postcms::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    fields: Vec<(String, FormValue)>,
}

impl FormPayload {
    /// Empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any value serializing to a JSON object.
    ///
    /// # Errors
    /// - [`RequestError::Validation`] if `value` is not an object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let mut form = Self::new();
        for (key, value) in to_object(value)? {
            form = form.value(key, value);
        }
        Ok(form)
    }

    /// Append a text field.
    #[must_use]
    pub fn text<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set(key.into(), FormValue::Text(value.into()));
        self
    }

    /// Append a JSON value using the form encoding rules.
    #[must_use]
    pub fn value<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        let text = match value {
            Value::Null => return self,
            Value::String(s) => s,
            other => other.to_string(),
        };
        self.set(key.into(), FormValue::Text(text));
        self
    }

    /// Append a file part.
    #[must_use]
    pub fn file<K: Into<String>>(mut self, key: K, file: FileUpload) -> Self {
        self.set(key.into(), FormValue::File(file));
        self
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// True when no field will be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total size of all file parts.
    #[must_use]
    pub fn file_bytes(&self) -> u64 {
        self.fields
            .iter()
            .map(|(_, value)| match value {
                FormValue::File(file) => file.len(),
                FormValue::Text(_) => 0,
            })
            .sum()
    }

    /// Later keys replace earlier ones, keeping the original position.
    fn set(&mut self, key: String, value: FormValue) {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Convert into a reqwest multipart form, streaming files through `progress`.
    pub(crate) fn into_form(self, progress: Option<ProgressFn>) -> Result<Form> {
        let tracker = progress.map(|f| Tracker::new(f, self.file_bytes()));
        let mut form = Form::new();
        for (key, value) in self.fields {
            form = match value {
                FormValue::Text(text) => form.text(key, text),
                FormValue::File(file) => form.part(key, file.into_part(tracker.as_ref())?),
            };
        }
        Ok(form)
    }
}

/// Shared byte counter across every file part of one request.
#[derive(Clone)]
struct Tracker {
    loaded: Arc<AtomicU64>,
    total: u64,
    report: ProgressFn,
}

impl Tracker {
    fn new(report: ProgressFn, total: u64) -> Self {
        Self {
            loaded: Arc::new(AtomicU64::new(0)),
            total,
            report,
        }
    }

    fn advance(&self, bytes: u64) {
        let loaded = self.loaded.fetch_add(bytes, Ordering::Relaxed) + bytes;
        (self.report)(loaded, self.total);
    }
}
