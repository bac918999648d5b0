//! Template-facing context types for the Dart templates

use serde::{Deserialize, Serialize};

use crate::model::{DartType, EnumModel, ModelClass, ModelField, ModelFile};
use crate::utils::{doc_lines, escape_dart_string};

/// Where an operation parameter is sent, from the OpenAPI `in` field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Path,
    Query,
}

/// Context for `model.dart.tera`
#[derive(Clone, Debug, Serialize)]
pub struct ModelFileContext {
    pub file_stem: String,
    pub barrel_import: String,
    pub classes: Vec<ClassContext>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClassContext {
    pub name: String,
    pub doc_lines: Vec<String>,
    pub fields: Vec<FieldContext>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FieldContext {
    pub name: String,
    /// JSON key, escaped for a Dart string literal
    pub json_key: String,
    /// Declared type including a nullable suffix
    pub declaration: String,
    pub default_value: Option<String>,
    /// `unknownEnumValue` for enum-typed fields
    pub unknown_enum_value: Option<String>,
    pub doc_lines: Vec<String>,
}

/// Context for `enum.dart.tera`
#[derive(Clone, Debug, Serialize)]
pub struct EnumContext {
    pub name: String,
    pub values: Vec<EnumValueContext>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnumValueContext {
    pub member: String,
    pub json_value: String,
}

/// Context for `api_method.dart.tera`
#[derive(Clone, Debug, Serialize)]
pub struct ApiMethodContext {
    pub name: String,
    pub doc_lines: Vec<String>,
    pub deprecated: bool,
    /// e.g. `DataResponse<User>`
    pub return_type: String,
    /// Named parameter declarations, in signature order
    pub params: Vec<String>,
    pub client: String,
    /// `RestMethod` member
    pub http_method: String,
    /// Path literal content with `${...}` interpolation for path params
    pub path: String,
    pub query: Vec<QueryEntryContext>,
    /// Body expression, if the operation has one
    pub body: Option<String>,
    /// `SuccessResponseMapperType` member
    pub mapper_type: String,
    pub decoder: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct QueryEntryContext {
    pub key: String,
    pub value: String,
    pub optional: bool,
}

impl ModelFileContext {
    pub fn new(file: &ModelFile, barrel_import: &str) -> Self {
        Self {
            file_stem: file.file_stem(),
            barrel_import: barrel_import.to_string(),
            classes: file.classes.iter().map(ClassContext::from).collect(),
        }
    }
}

impl From<&ModelClass> for ClassContext {
    fn from(class: &ModelClass) -> Self {
        Self {
            name: class.name.clone(),
            doc_lines: doc_lines(class.description.as_deref()),
            fields: class.fields.iter().map(FieldContext::from).collect(),
        }
    }
}

impl From<&ModelField> for FieldContext {
    fn from(field: &ModelField) -> Self {
        let unknown_enum_value = match &field.ty {
            DartType::Enum(name) => Some(format!("{name}.none")),
            _ => None,
        };
        Self {
            name: field.name.clone(),
            json_key: escape_dart_string(&field.json_key),
            declaration: field.ty.declaration(field.nullable),
            default_value: field.default_value.clone(),
            unknown_enum_value,
            doc_lines: doc_lines(field.description.as_deref()),
        }
    }
}

impl From<&EnumModel> for EnumContext {
    fn from(model: &EnumModel) -> Self {
        Self {
            name: model.name.clone(),
            values: model
                .values
                .iter()
                .map(|v| EnumValueContext {
                    member: v.member.clone(),
                    json_value: escape_dart_string(&v.json_value),
                })
                .collect(),
        }
    }
}
