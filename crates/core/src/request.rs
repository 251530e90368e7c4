//! Parse-job request payload.
//!
//! The body is deliberately loose: a map of form fields plus an optional
//! attached document. The service validates option values; the client only
//! checks that exactly one document source is present.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;

/// Default parse model.
pub const DEFAULT_MODEL: &str = "dpt-2-latest";

/// Form field selecting the parse model.
pub const FIELD_MODEL: &str = "model";

/// Form field selecting the split mode (e.g. `page`).
pub const FIELD_SPLIT: &str = "split";

/// Form field carrying a remote document URL.
pub const FIELD_DOCUMENT_URL: &str = "document_url";

/// Multipart part name of an uploaded document.
pub const DOCUMENT_PART: &str = "document";

/// A document uploaded with the request.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Unit of work submitted to the parse-jobs endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRequest {
    fields: BTreeMap<String, String>,
    document: Option<Document>,
}

impl JobRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary form field, replacing any previous value.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn model(self, model: impl Into<String>) -> Self {
        self.field(FIELD_MODEL, model)
    }

    pub fn split(self, split: impl Into<String>) -> Self {
        self.field(FIELD_SPLIT, split)
    }

    pub fn document_url(self, url: impl Into<String>) -> Self {
        self.field(FIELD_DOCUMENT_URL, url)
    }

    /// Attach a document to upload.
    pub fn document(mut self, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.document = Some(Document {
            file_name: file_name.into(),
            bytes,
        });
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn attached_document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Check that exactly one document source is set.
    pub fn validate(&self) -> Result<(), CoreError> {
        let has_url = self
            .get(FIELD_DOCUMENT_URL)
            .is_some_and(|url| !url.trim().is_empty());

        match (self.document.is_some(), has_url) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(CoreError::Validation(
                "request needs a document or a document_url".to_string(),
            )),
            (true, true) => Err(CoreError::Validation(
                "request cannot carry both a document and a document_url".to_string(),
            )),
        }
    }
}
