//! Dart endpoint context builder: signature, call site and decoder.

use std::collections::HashSet;

use serde_json::Value as JsonValue;

use super::{EndpointContextBuilder, MethodPlan};
use crate::model::{DartType, ResponseShape};
use crate::openapi::ParamInfo;
use crate::templates::{ApiMethodContext, QueryEntryContext};
use crate::utils::{doc_lines, escape_dart_string, to_dart_identifier};

const BODY_PARAM: &str = "request";

#[derive(Debug, Clone)]
pub struct DartEndpointContextBuilder {
    /// Field of the service class that performs requests
    pub client: String,
}

impl DartEndpointContextBuilder {
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
        }
    }

    pub fn method_context<'a>(&self, plan: &MethodPlan<'a>) -> ApiMethodContext {
        let endpoint = plan.endpoint;

        let mut docs = doc_lines(endpoint.summary.as_deref());
        for line in doc_lines(endpoint.description.as_deref()) {
            if !docs.contains(&line) {
                docs.push(line);
            }
        }

        // path params claim names first; a clashing query param gets a suffix
        let mut used = HashSet::new();
        let mut unique = |p: &'a ParamInfo| {
            let base = to_dart_identifier(&p.name);
            let mut ident = base.clone();
            let mut n = 2;
            while !used.insert(ident.clone()) {
                ident = format!("{base}{n}");
                n += 1;
            }
            (p, ident)
        };
        let path_params: Vec<_> = endpoint.path_params.iter().map(&mut unique).collect();
        let query_params: Vec<_> = endpoint.query_params.iter().map(&mut unique).collect();

        let required_query = query_params.iter().filter(|(p, _)| p.required);
        let optional_query = query_params.iter().filter(|(p, _)| !p.required);
        let mut params: Vec<String> = path_params
            .iter()
            .chain(required_query)
            .map(|(p, ident)| format!("required {} {}", p.dart_type, ident))
            .collect();
        params.extend(optional_query.map(|(p, ident)| format!("{}? {}", p.dart_type, ident)));

        let body_param = if used.contains(BODY_PARAM) {
            format!("{BODY_PARAM}Body")
        } else {
            BODY_PARAM.to_string()
        };
        let body = plan.request.as_ref().map(|request| {
            params.push(format!("required {} {}", request.ty, body_param));
            if request.is_model {
                format!("{body_param}.toJson()")
            } else {
                body_param.clone()
            }
        });

        let (return_type, mapper_type, decoder) = match &plan.response {
            ResponseShape::Void => (
                "DataResponse<void>".to_string(),
                "plain",
                "(_) {}".to_string(),
            ),
            ResponseShape::List(item) => (
                format!("DataListResponse<{item}>"),
                "dataJsonArray",
                decoder(item),
            ),
            ResponseShape::Single(ty) => (
                format!("DataResponse<{ty}>"),
                "dataJsonObject",
                decoder(ty),
            ),
        };

        ApiMethodContext {
            name: plan.name.clone(),
            doc_lines: docs,
            deprecated: endpoint.deprecated,
            return_type,
            params,
            client: self.client.clone(),
            http_method: endpoint.method.as_str().to_string(),
            path: path_literal(&endpoint.path, &path_params),
            query: query_params
                .iter()
                .map(|(p, ident)| QueryEntryContext {
                    key: escape_dart_string(&p.name),
                    value: ident.clone(),
                    optional: !p.required,
                })
                .collect(),
            body,
            mapper_type: mapper_type.to_string(),
            decoder,
        }
    }
}

impl EndpointContextBuilder for DartEndpointContextBuilder {
    fn build(&self, plan: &MethodPlan<'_>) -> crate::Result<JsonValue> {
        Ok(serde_json::to_value(self.method_context(plan))?)
    }
}

/// Path as the content of a Dart string literal, `{id}` → `${id}`
fn path_literal(path: &str, params: &[(&ParamInfo, String)]) -> String {
    let mut out = String::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        out.push_str(&escape_dart_string(&rest[..open]));
        let name = &rest[open + 1..close];
        let ident = params
            .iter()
            .find(|(p, _)| p.name == name)
            .map_or_else(|| to_dart_identifier(name), |(_, ident)| ident.clone());
        out.push_str(&format!("${{{ident}}}"));
        rest = &rest[close + 1..];
    }
    out.push_str(&escape_dart_string(rest));
    out
}

/// Decoder closure for one payload value of type `ty`
fn decoder(ty: &DartType) -> String {
    if *ty == DartType::Dynamic {
        return "(json) => json".to_string();
    }
    format!("(json) => {}", value_expr(ty, "json", 0))
}

fn value_expr(ty: &DartType, var: &str, depth: usize) -> String {
    match ty {
        DartType::Model(name) => format!("{name}.fromJson({var} as Map<String, dynamic>)"),
        DartType::Enum(name) => format!(
            "{name}.values.firstWhere((e) => e.jsonValue == {var}, orElse: () => {name}.none)"
        ),
        DartType::Double => format!("safeCast<num>({var})?.toDouble() ?? 0.0"),
        DartType::Map => format!("safeCast<Map<String, dynamic>>({var}) ?? const {{}}"),
        DartType::Dynamic => var.to_string(),
        DartType::List(inner) => {
            let item = format!("e{depth}");
            format!(
                "(safeCast<List<dynamic>>({var}) ?? const []).map(({item}) => {}).toList()",
                value_expr(inner, &item, depth + 1)
            )
        }
        DartType::String | DartType::Int | DartType::Bool => format!(
            "safeCast<{ty}>({var}) ?? {}",
            ty.default_literal().unwrap_or_default()
        ),
    }
}
