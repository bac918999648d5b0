//! Configuration management for dartgen code generation.
//!
//! This module defines the `Config` struct and the output layout of a Flutter
//! project. The configuration can be created programmatically, loaded from a
//! YAML or TOML file, and then overridden from command-line arguments.
//!
//! # Examples
//!
//! ```
//! use dartgen_core::config::{Config, EnvelopeKey};
//!
//! let mut config = Config::new("api_doc");
//! config.replace = true;
//! config.wrapped_by = "results".parse().unwrap();
//! assert_eq!(config.wrapped_by, EnvelopeKey::Result);
//! assert!(config.service_file_path().ends_with("lib/data_source/api/app_api_service.dart"));
//! ```

// Internal imports (std, crate)
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// External imports (alphabetized)
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Marker comment separating hand-written service methods from generated ones
pub const DEFAULT_MARKER: &str = "// GENERATED API METHODS - DO NOT REMOVE THIS MARKER";

/// Property name under which the API nests the real response payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKey {
    #[default]
    Data,
    #[serde(alias = "results")]
    #[value(alias = "results")]
    Result,
}

impl EnvelopeKey {
    /// The JSON property name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Result => "result",
        }
    }
}

impl FromStr for EnvelopeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "data" => Ok(Self::Data),
            "result" | "results" => Ok(Self::Result),
            other => Err(format!(
                "Unknown envelope key '{other}', expected one of: data, results, result"
            )),
        }
    }
}

impl fmt::Display for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where generated artifacts live inside the Flutter project, relative to
/// the project (or output) root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    /// Service file receiving the generated API methods
    pub service_file: PathBuf,

    /// Name of the class inside the service file; the first class is used when unset
    pub service_class: Option<String>,

    /// Directory for response/model classes
    pub model_dir: PathBuf,

    /// Directory for request body classes
    pub request_dir: PathBuf,

    /// Directory for enums
    pub enum_dir: PathBuf,

    /// Shared file declaring the response envelope key
    pub envelope_file: PathBuf,

    /// Marker comment delimiting generated methods in the service file
    pub marker: String,

    /// Client field the generated methods call into
    pub api_client: String,

    /// Barrel import added to every generated Dart file
    pub barrel_import: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            service_file: PathBuf::from("lib/data_source/api/app_api_service.dart"),
            service_class: Some("AppApiService".to_string()),
            model_dir: PathBuf::from("lib/model/api"),
            request_dir: PathBuf::from("lib/model/api/request"),
            enum_dir: PathBuf::from("lib/model/enum"),
            envelope_file: PathBuf::from("lib/model/base/data_response.dart"),
            marker: DEFAULT_MARKER.to_string(),
            api_client: "_authAppServerApiClient".to_string(),
            barrel_import: "package:app/index.dart".to_string(),
        }
    }
}

/// Configuration for one generator run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing exactly one OpenAPI JSON document
    pub input_path: PathBuf,

    /// Root of the Flutter project the default layout is relative to
    pub project_root: PathBuf,

    /// Alternative root for every generated file
    pub output_path: Option<PathBuf>,

    /// `{method}_{path}` keys of the endpoints to generate; empty means all
    pub apis: Vec<String>,

    /// Replace the generated block of the service file instead of appending
    pub replace: bool,

    /// Envelope key to unwrap from responses
    pub wrapped_by: EnvelopeKey,

    /// Directory with template overrides
    pub template_dir: Option<PathBuf>,

    /// Project layout
    pub layout: OutputLayout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            project_root: PathBuf::from("."),
            output_path: None,
            apis: Vec::new(),
            replace: false,
            wrapped_by: EnvelopeKey::default(),
            template_dir: None,
            layout: OutputLayout::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a file (`.toml` or YAML)
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let config = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(config)
    }

    /// Save configuration to a file as YAML
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Root all generated files are written under
    pub fn output_root(&self) -> &Path {
        self.output_path.as_deref().unwrap_or(&self.project_root)
    }

    /// Service file inside the output root
    pub fn service_file_path(&self) -> PathBuf {
        self.output_root().join(&self.layout.service_file)
    }

    /// Service file at the conventional project location, used to seed a
    /// custom output root
    pub fn default_service_file_path(&self) -> PathBuf {
        self.project_root.join(&self.layout.service_file)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.output_root().join(&self.layout.model_dir)
    }

    pub fn request_dir(&self) -> PathBuf {
        self.output_root().join(&self.layout.request_dir)
    }

    pub fn enum_dir(&self) -> PathBuf {
        self.output_root().join(&self.layout.enum_dir)
    }

    pub fn envelope_file_path(&self) -> PathBuf {
        self.output_root().join(&self.layout.envelope_file)
    }

    /// Whether the endpoint identified by `method` and `path` passes the `apis` filter
    pub fn includes_endpoint(&self, method: &str, path: &str) -> bool {
        if self.apis.iter().all(|api| api.trim().is_empty()) {
            return true;
        }
        let key = api_filter_key(method, path);
        self.apis
            .iter()
            .filter_map(|api| api.split_once('_').map(|(m, p)| api_filter_key(m, p)))
            .any(|candidate| candidate == key)
    }
}

/// Normalized `{method}_{path}` key: lowercase, no leading slash
fn api_filter_key(method: &str, path: &str) -> String {
    format!(
        "{}_{}",
        method.trim().to_lowercase(),
        path.trim().trim_start_matches('/').to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_config_roundtrip() -> crate::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("dartgen.yaml");

        let mut config = Config::new("api_doc");
        config.wrapped_by = EnvelopeKey::Result;
        config.apis = vec!["get_v1/users".to_string()];
        config.save(&file_path).await?;

        let loaded = Config::from_file(&file_path).await?;
        assert_eq!(loaded.input_path, PathBuf::from("api_doc"));
        assert_eq!(loaded.wrapped_by, EnvelopeKey::Result);
        assert_eq!(loaded.apis, vec!["get_v1/users".to_string()]);
        assert!(!loaded.replace);
        assert_eq!(loaded.layout, OutputLayout::default());

        Ok(())
    }

    #[tokio::test]
    async fn test_partial_toml_config() -> crate::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("dartgen.toml");
        tokio::fs::write(
            &file_path,
            "wrapped_by = \"results\"\n\n[layout]\nservice_class = \"ApiService\"\n",
        )
        .await?;

        let loaded = Config::from_file(&file_path).await?;
        assert_eq!(loaded.wrapped_by, EnvelopeKey::Result);
        assert_eq!(loaded.layout.service_class.as_deref(), Some("ApiService"));
        assert_eq!(loaded.layout.marker, DEFAULT_MARKER);
        Ok(())
    }

    #[test]
    fn test_envelope_key_parsing() {
        assert_eq!("data".parse::<EnvelopeKey>(), Ok(EnvelopeKey::Data));
        assert_eq!("results".parse::<EnvelopeKey>(), Ok(EnvelopeKey::Result));
        assert_eq!("RESULT".parse::<EnvelopeKey>(), Ok(EnvelopeKey::Result));
        assert!("payload".parse::<EnvelopeKey>().is_err());
        assert_eq!(EnvelopeKey::Result.to_string(), "result");
    }

    #[test]
    fn test_api_filter() {
        let mut config = Config::new("in");
        assert!(config.includes_endpoint("post", "/v1/users"));

        config.apis = vec!["GET_v1/users".to_string(), "delete_/v1/users/{id}".to_string()];
        assert!(config.includes_endpoint("get", "/v1/users"));
        assert!(config.includes_endpoint("delete", "/v1/users/{id}"));
        assert!(!config.includes_endpoint("post", "/v1/users"));
        assert!(!config.includes_endpoint("get", "/v1/users/{id}"));
    }

    #[test]
    fn test_output_path_redirects_roots() {
        let mut config = Config::new("in");
        config.project_root = PathBuf::from("/app");
        config.output_path = Some(PathBuf::from("/tmp/out"));
        assert_eq!(config.model_dir(), PathBuf::from("/tmp/out/lib/model/api"));
        assert_eq!(
            config.default_service_file_path(),
            PathBuf::from("/app/lib/data_source/api/app_api_service.dart")
        );
    }
}
