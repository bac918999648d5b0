//! Test utilities for dartgen integration tests

// Internal imports (std, crate)
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// External imports (alphabetized)
use anyhow::Context;
use tempfile::TempDir;

pub const SERVICE_FILE: &str = "lib/data_source/api/app_api_service.dart";
pub const ENVELOPE_FILE: &str = "lib/model/base/data_response.dart";
pub const MODEL_DIR: &str = "lib/model/api";
pub const REQUEST_DIR: &str = "lib/model/api/request";
pub const ENUM_DIR: &str = "lib/model/enum";

pub const SERVICE_SOURCE: &str = r#"import 'package:app/index.dart';

class AppApiService {
  AppApiService(this._noneAuthAppServerApiClient, this._authAppServerApiClient);

  final NoneAuthAppServerApiClient _noneAuthAppServerApiClient;
  final AuthAppServerApiClient _authAppServerApiClient;

  Future<DataResponse<void>?> login() {
    return _noneAuthAppServerApiClient.request(
      method: RestMethod.post,
      path: '/v1/login',
      successResponseMapperType: SuccessResponseMapperType.plain,
      decoder: (_) {},
    );
  }

  // GENERATED API METHODS - DO NOT REMOVE THIS MARKER
}

const apiServiceVersion = '1';
"#;

pub const ENVELOPE_SOURCE: &str = r#"import 'package:app/index.dart';

part 'data_response.freezed.dart';
part 'data_response.g.dart';

@Freezed(genericArgumentFactories: true)
sealed class DataResponse<T> with _$DataResponse<T> {
  const factory DataResponse({
    @JsonKey(name: 'data') T? data,
  }) = _DataResponse;
}

@Freezed(genericArgumentFactories: true)
sealed class DataListResponse<T> with _$DataListResponse<T> {
  const factory DataListResponse({
    @JsonKey(name: 'data') List<T>? data,
  }) = _DataListResponse;
}
"#;

pub const USERS_DOC: &str = r##"{
  "openapi": "3.0.1",
  "info": {"title": "Users API", "version": "1.0.0"},
  "paths": {
    "/v1/users/{id}": {
      "get": {
        "summary": "Get a user by id",
        "parameters": [
          {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
        ],
        "responses": {
          "200": {
            "description": "OK",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/UserResponse"}}}
          }
        }
      }
    },
    "/v1/users": {
      "get": {
        "parameters": [
          {"name": "keyword", "in": "query", "schema": {"type": "string"}},
          {"name": "page", "in": "query", "required": true, "schema": {"type": "integer"}}
        ],
        "responses": {
          "200": {
            "description": "OK",
            "content": {"application/json": {"schema": {
              "type": "object",
              "properties": {"data": {"type": "array", "items": {"$ref": "#/components/schemas/User"}}}
            }}}
          }
        }
      },
      "post": {
        "requestBody": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/CreateUser"}}}},
        "responses": {"204": {"description": "No content"}}
      }
    }
  },
  "components": {
    "schemas": {
      "User": {
        "type": "object",
        "properties": {
          "id": {"type": "integer"},
          "name": {"type": "string"},
          "status": {"type": "string", "enum": ["active", "banned"]}
        }
      },
      "UserResponse": {
        "type": "object",
        "properties": {"data": {"$ref": "#/components/schemas/User"}}
      },
      "CreateUser": {
        "type": "object",
        "required": ["name"],
        "properties": {"name": {"type": "string"}, "email": {"type": "string"}}
      }
    }
  }
}"##;

/// A throwaway Flutter project layout with an OpenAPI document in `api_doc/`
pub struct TestProject {
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestProject {
    pub fn new(document: &str) -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().to_path_buf();
        write_file(&root.join("api_doc/openapi.json"), document)?;
        write_file(&root.join(SERVICE_FILE), SERVICE_SOURCE)?;
        write_file(&root.join(ENVELOPE_FILE), ENVELOPE_SOURCE)?;
        Ok(Self {
            _temp_dir: temp_dir,
            root,
        })
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn read(&self, relative: &str) -> anyhow::Result<String> {
        let path = self.path(relative);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Run the dartgen binary from the project root
    pub fn run(&self, args: &[&str]) -> anyhow::Result<Output> {
        Command::new(env!("CARGO_BIN_EXE_dartgen"))
            .current_dir(&self.root)
            .arg("generate")
            .args(args)
            .output()
            .context("Failed to run dartgen")
    }

    /// Run and fail with the captured output unless the exit status is 0
    pub fn run_ok(&self, args: &[&str]) -> anyhow::Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            anyhow::bail!(
                "dartgen {:?} failed with {}:\n{}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Asserts that a file contains specific content
pub fn assert_file_contains<P: AsRef<Path>>(path: P, contents: &[&str]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(anyhow::anyhow!("File not found: {}", path.display()));
    }

    let file_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let missing_contents: Vec<&str> = contents
        .iter()
        .copied()
        .filter(|expected| !file_content.contains(expected))
        .collect();

    if !missing_contents.is_empty() {
        return Err(anyhow::anyhow!(
            "File {} is missing expected content:\n  {}\n--- file ---\n{}",
            path.display(),
            missing_contents.join("\n  "),
            file_content
        ));
    }

    Ok(())
}
