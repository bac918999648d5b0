//! OpenAPI document loading and querying.
//!
//! This module locates the OpenAPI JSON document inside an input directory,
//! parses it (keeping the key order of the source document, which the rest
//! of the pipeline relies on for deterministic naming) and provides accessors
//! for the sections the generator consumes.
//!
//! # Examples
//!
//! ```no_run
//! use dartgen_core::openapi::OpenApiContext;
//! use dartgen_core::error::Result;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let (spec, path) = OpenApiContext::from_dir("api_doc").await?;
//! println!("Loaded {} from {}", spec.title().unwrap_or("API"), path.display());
//! # Ok(())
//! # }
//! ```

pub mod endpoint;
pub mod resolver;

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

use crate::Error;

// External imports (alphabetized)
use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio::fs;

pub use endpoint::{EndpointInfo, HttpMethod, ParamInfo};
pub use resolver::{COMPONENT_NAME_KEY, SchemaResolver};

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Represents a loaded OpenAPI document
#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct OpenApiContext {
    /// The raw JSON value of the OpenAPI document
    pub json: JsonValue,
}

impl OpenApiContext {
    /// Locate the single `*.json` document inside `dir` and load it.
    ///
    /// When several JSON files are present the first one in sorted order is
    /// used and a warning is logged. Returns the document and the file it was
    /// read from.
    pub async fn from_dir<P: AsRef<Path>>(dir: P) -> crate::Result<(Self, PathBuf)> {
        let dir = dir.as_ref();
        if !fs::try_exists(dir).await.unwrap_or(false) {
            return Err(Error::input(format!(
                "Input directory does not exist: {}",
                dir.display()
            )));
        }

        let mut candidates = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json && entry.file_type().await?.is_file() {
                candidates.push(path);
            }
        }
        candidates.sort();

        let Some(path) = candidates.first().cloned() else {
            return Err(Error::input(format!(
                "No JSON file found in {}",
                dir.display()
            )));
        };
        if candidates.len() > 1 {
            log::warn!(
                "Found {} JSON files in {}, using {}",
                candidates.len(),
                dir.display(),
                path.display()
            );
        }

        let spec = Self::from_file(&path).await?;
        Ok((spec, path))
    }

    /// Load an OpenAPI document from a JSON file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        Self::parse_content(&content).map_err(|e| {
            Error::input(format!(
                "Failed to parse OpenAPI document at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Parse JSON content into a document
    pub fn parse_content(content: &str) -> crate::Result<Self> {
        let json: JsonValue = serde_json::from_str(content)?;
        if !json.is_object() {
            return Err(Error::input("OpenAPI document must be a JSON object"));
        }
        Ok(Self { json })
    }

    /// Get a reference to the raw JSON value
    pub fn as_json(&self) -> &JsonValue {
        &self.json
    }

    /// Get the title of the API
    pub fn title(&self) -> Option<&str> {
        self.json.get("info")?.get("title")?.as_str()
    }

    /// Get the version of the API
    pub fn version(&self) -> Option<&str> {
        self.json.get("info")?.get("version")?.as_str()
    }

    /// The `paths` object, in document order
    pub fn paths(&self) -> crate::Result<&JsonMap<String, JsonValue>> {
        self.json
            .get("paths")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| Error::openapi("Missing 'paths' object"))
    }

    /// The `components.schemas` map, if the document has one
    pub fn component_schemas(&self) -> Option<&JsonMap<String, JsonValue>> {
        self.json
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(JsonValue::as_object)
    }

    /// A resolver bound to this document's component schemas
    pub fn resolver(&self) -> SchemaResolver<'_> {
        SchemaResolver::new(self.component_schemas())
    }

    /// Follow a local `$ref` (e.g. `#/components/parameters/limit`) if `value`
    /// is a reference object, otherwise return `value` itself
    pub fn deref_local<'a>(&'a self, value: &'a JsonValue) -> crate::Result<&'a JsonValue> {
        let Some(ref_str) = value.get("$ref").and_then(JsonValue::as_str) else {
            return Ok(value);
        };
        let pointer = ref_str
            .strip_prefix('#')
            .ok_or_else(|| Error::openapi(format!("Unsupported external ref '{}'", ref_str)))?;
        self.json
            .pointer(pointer)
            .ok_or_else(|| Error::openapi(format!("Unresolvable ref '{}'", ref_str)))
    }
}

/// Component name of a `#/components/schemas/<Name>` reference
pub fn schema_ref_name(ref_str: &str) -> Option<&str> {
    ref_str.strip_prefix(SCHEMA_REF_PREFIX)
}
