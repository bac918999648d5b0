//! Per-operation analysis: parameters, request body, response envelope.

use std::fmt;

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{OpenApiContext, SchemaResolver, schema_ref_name};
use crate::config::EnvelopeKey;
use crate::templates::ParameterKind;

/// Status codes checked for the success response, in priority order
const SUCCESS_STATUSES: [&str; 3] = ["200", "201", "202"];

/// HTTP methods the generator emits client methods for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Lowercase verb as used in OpenAPI path items
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }

    /// Every supported method in emission order
    pub fn all() -> impl Iterator<Item = Self> {
        use HttpMethod::*;
        [Get, Post, Put, Patch, Delete].into_iter()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path or query parameter of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamInfo {
    /// Name as written in the document
    pub name: String,
    /// Dart type (`int` or `String`)
    pub dart_type: String,
    pub required: bool,
    pub kind: ParameterKind,
}

/// Everything the generator needs to know about one `(method, path)` pair
#[derive(Debug, Clone)]
pub struct EndpointInfo {
    pub method: HttpMethod,
    pub path: String,
    pub path_params: Vec<ParamInfo>,
    pub query_params: Vec<ParamInfo>,
    pub has_body: bool,
    pub body_schema: Option<JsonValue>,
    /// Resolved 2xx schema before the envelope is unwrapped
    pub response_schema: Option<JsonValue>,
    /// Resolved schema under the envelope key
    pub wrapped_response_schema: Option<JsonValue>,
    /// Component name when the response is a direct `$ref`
    pub response_schema_name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
}

impl EndpointInfo {
    /// `{method}_{path}` key as accepted by the `apis` filter
    pub fn filter_key(&self) -> String {
        format!("{}_{}", self.method, self.path.trim_start_matches('/'))
    }
}

impl OpenApiContext {
    /// Analyze every operation under `paths`, in document order
    pub fn parse_endpoints(&self, envelope: EnvelopeKey) -> crate::Result<Vec<EndpointInfo>> {
        let resolver = self.resolver();
        let mut endpoints = Vec::new();

        for (path, item) in self.paths()? {
            let item = self.deref_local(item)?;
            for method in HttpMethod::all() {
                let Some(operation) = item.get(method.as_str()).filter(|op| op.is_object()) else {
                    continue;
                };
                let endpoint =
                    self.analyze_operation(&resolver, envelope, method, path, item, operation)?;
                log::debug!(
                    "Analyzed {} {} ({} query params, body: {})",
                    method,
                    path,
                    endpoint.query_params.len(),
                    endpoint.has_body
                );
                endpoints.push(endpoint);
            }
        }
        Ok(endpoints)
    }

    fn analyze_operation(
        &self,
        resolver: &SchemaResolver<'_>,
        envelope: EnvelopeKey,
        method: HttpMethod,
        path: &str,
        path_item: &JsonValue,
        operation: &JsonValue,
    ) -> crate::Result<EndpointInfo> {
        let params = self.collect_parameters(path_item, operation)?;
        let (path_params, query_params): (Vec<ParamInfo>, Vec<ParamInfo>) = params
            .into_iter()
            .partition(|p| p.kind == ParameterKind::Path);

        let body_schema = match operation.get("requestBody") {
            Some(body) => self
                .json_schema_of(self.deref_local(body)?)
                .map(|schema| resolver.resolve(schema))
                .transpose()?,
            None => None,
        };

        let raw_response = match SUCCESS_STATUSES
            .iter()
            .find_map(|status| operation.get("responses")?.get(*status))
        {
            Some(response) => self.json_schema_of(self.deref_local(response)?),
            None => None,
        };
        let response_schema_name = raw_response
            .and_then(|schema| schema.get("$ref"))
            .and_then(JsonValue::as_str)
            .and_then(schema_ref_name)
            .map(String::from);
        let response_schema = raw_response
            .map(|schema| resolver.resolve(schema))
            .transpose()?;

        let wrapped_response_schema = match &response_schema {
            Some(schema) => {
                let wrapped = unwrap_envelope(schema, envelope);
                if wrapped.is_none() {
                    log::warn!(
                        "{} {}: response has no '{}' property, treating it as void",
                        method.as_str().to_uppercase(),
                        path,
                        envelope
                    );
                }
                wrapped
            }
            None => None,
        };

        Ok(EndpointInfo {
            method,
            path: path.to_string(),
            path_params,
            query_params,
            has_body: body_schema.is_some(),
            body_schema,
            response_schema,
            wrapped_response_schema,
            response_schema_name,
            summary: text_field(operation, "summary"),
            description: text_field(operation, "description"),
            deprecated: operation
                .get("deprecated")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
        })
    }

    /// Path-item parameters overlaid by operation parameters, path and query only
    fn collect_parameters(
        &self,
        path_item: &JsonValue,
        operation: &JsonValue,
    ) -> crate::Result<Vec<ParamInfo>> {
        let mut params: Vec<ParamInfo> = Vec::new();
        let declared = [path_item, operation]
            .into_iter()
            .filter_map(|owner| owner.get("parameters").and_then(JsonValue::as_array))
            .flatten();

        for raw in declared {
            let param = self.deref_local(raw)?;
            let kind = match param.get("in").and_then(JsonValue::as_str) {
                Some("path") => ParameterKind::Path,
                Some("query") => ParameterKind::Query,
                _ => continue,
            };
            let Some(name) = param.get("name").and_then(JsonValue::as_str) else {
                continue;
            };
            let type_name = param
                .get("schema")
                .and_then(|s| s.get("type"))
                .or_else(|| param.get("type"))
                .and_then(JsonValue::as_str);
            let info = ParamInfo {
                name: name.to_string(),
                dart_type: match type_name {
                    Some("integer") => "int".to_string(),
                    _ => "String".to_string(),
                },
                required: kind == ParameterKind::Path
                    || param.get("required").and_then(JsonValue::as_bool).unwrap_or(false),
                kind,
            };

            match params.iter_mut().find(|p| p.name == info.name && p.kind == info.kind) {
                Some(existing) => *existing = info,
                None => params.push(info),
            }
        }
        Ok(params)
    }

    /// `content.application/json.schema` of a request body or response object
    fn json_schema_of<'a>(&self, holder: &'a JsonValue) -> Option<&'a JsonValue> {
        holder
            .get("content")
            .and_then(|content| content.get("application/json").or_else(|| content.get("*/*")))
            .and_then(|media| media.get("schema"))
            // Swagger 2.0 responses carry the schema directly
            .or_else(|| holder.get("schema"))
    }
}

/// Schema under the envelope key of a resolved response, if present
fn unwrap_envelope(schema: &JsonValue, envelope: EnvelopeKey) -> Option<JsonValue> {
    schema
        .get("properties")
        .and_then(JsonValue::as_object)
        .and_then(|props| props.get(envelope.as_str()))
        .cloned()
}

fn text_field(value: &JsonValue, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
