//! Schema → Dart class/enum synthesis.
//!
//! Naming rules:
//! - component schemas keep their (PascalCased) component name and get a
//!   file of their own, built once per run;
//! - inline nested objects are embedded in the parent's file as
//!   `{Parent}{Field}`;
//! - inline wrapped responses become `{Base}Data`, inline array items
//!   `{Base}Item`, request bodies `{Method}Request`;
//! - field enums are `{Owner}{Field}`.
//!
//! Every name is claimed from the run's [`NameArena`].

use std::collections::{HashMap, HashSet};

use serde_json::Value as JsonValue;

use super::{
    DartType, EnumModel, FieldPolicy, ModelClass, ModelField, ModelFile, ModelKind, RequestPolicy,
    ResponsePolicy,
};
use crate::naming::NameArena;
use crate::openapi::{COMPONENT_NAME_KEY, EndpointInfo};
use crate::utils::{to_dart_identifier, to_upper_camel_case};

/// What a generated API method returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// No (or an empty) payload under the envelope key
    Void,
    /// A single value: `DataResponse<T>`
    Single(DartType),
    /// A list: `DataListResponse<T>`
    List(DartType),
}

/// How a request body is passed to a generated API method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestShape {
    pub ty: DartType,
    /// Whether `ty` is a generated request class serialized with `toJson()`
    pub is_model: bool,
}

/// Builds the Dart type model for one generator run
#[derive(Debug, Default)]
pub struct ModelSynthesizer {
    arena: NameArena,
    /// Component schema name → type, for response models and enums
    components: HashMap<String, DartType>,
    /// Component schema name → embedded class, for the request being built
    request_components: HashMap<String, String>,
    files: Vec<ModelFile>,
    enums: Vec<EnumModel>,
}

impl ModelSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &NameArena {
        &self.arena
    }

    /// Model files produced so far, in creation order
    pub fn files(&self) -> &[ModelFile] {
        &self.files
    }

    pub fn enums(&self) -> &[EnumModel] {
        &self.enums
    }

    pub fn into_output(self) -> (Vec<ModelFile>, Vec<EnumModel>) {
        (self.files, self.enums)
    }

    /// Synthesize the return type of `endpoint` from its unwrapped response
    pub fn synthesize_response(
        &mut self,
        endpoint: &EndpointInfo,
        method_name: &str,
    ) -> crate::Result<ResponseShape> {
        let Some(wrapped) = endpoint
            .wrapped_response_schema
            .as_ref()
            .filter(|schema| !is_empty_schema(schema))
        else {
            return Ok(ResponseShape::Void);
        };

        let base = endpoint
            .response_schema_name
            .as_deref()
            .map(to_upper_camel_case)
            .unwrap_or_else(|| to_upper_camel_case(method_name));

        if schema_type(wrapped).0 == Some("array") {
            let items = wrapped.get("items").cloned().unwrap_or(JsonValue::Null);
            let item = self.top_level_type(&items, &format!("{base}Item"))?;
            Ok(ResponseShape::List(item))
        } else {
            let ty = self.top_level_type(wrapped, &format!("{base}Data"))?;
            Ok(ResponseShape::Single(ty))
        }
    }

    /// Synthesize the request body parameter of the method `method_name`
    pub fn synthesize_request(
        &mut self,
        schema: &JsonValue,
        method_name: &str,
    ) -> crate::Result<RequestShape> {
        self.request_components.clear();
        let hint = format!("{}Request", to_upper_camel_case(method_name));
        let mut classes = Vec::new();

        let shape = if is_object_like(schema) {
            let class_name = self.arena.claim(&hint);
            if let Some(component) = component_name(schema) {
                self.request_components
                    .insert(component.to_string(), class_name.clone());
            }
            self.build_class(class_name.clone(), schema, &RequestPolicy, &mut classes)?;
            RequestShape {
                ty: DartType::Model(class_name),
                is_model: true,
            }
        } else {
            RequestShape {
                ty: self.derive_type(schema, &hint, &RequestPolicy, &mut classes)?,
                is_model: false,
            }
        };

        self.push_file(ModelKind::Request, classes);
        Ok(shape)
    }

    /// Build the response model for a component schema (or return the
    /// already-built one)
    pub fn component_model(&mut self, name: &str, schema: &JsonValue) -> crate::Result<DartType> {
        if let Some(ty) = self.components.get(name) {
            return Ok(ty.clone());
        }
        let class_name = self.arena.claim(&to_upper_camel_case(name));
        let ty = DartType::Model(class_name.clone());
        // registered before the fields so cyclic references find it
        self.components.insert(name.to_string(), ty.clone());

        let mut classes = Vec::new();
        self.build_class(class_name, schema, &ResponsePolicy, &mut classes)?;
        self.push_file(ModelKind::Response, classes);
        Ok(ty)
    }

    /// Type of a top-level response value; inline classes get a file of their own
    fn top_level_type(&mut self, schema: &JsonValue, hint: &str) -> crate::Result<DartType> {
        if is_string_enum(schema) {
            return Ok(DartType::String);
        }
        let mut classes = Vec::new();
        let ty = self.derive_type(schema, hint, &ResponsePolicy, &mut classes)?;
        self.push_file(ModelKind::Response, classes);
        Ok(ty)
    }

    fn push_file(&mut self, kind: ModelKind, classes: Vec<ModelClass>) {
        if !classes.is_empty() {
            self.files.push(ModelFile { kind, classes });
        }
    }

    /// Derive the Dart type of `schema`. Inline classes are appended to `sink`.
    fn derive_type(
        &mut self,
        schema: &JsonValue,
        hint: &str,
        policy: &dyn FieldPolicy,
        sink: &mut Vec<ModelClass>,
    ) -> crate::Result<DartType> {
        if let Some(component) = component_name(schema) {
            if schema.get("$ref").is_some() {
                return Ok(self.cyclic_type(component, policy));
            }
            if is_string_enum(schema) {
                return Ok(self.component_enum(component, schema));
            }
            if is_object_like(schema) {
                return match policy.kind() {
                    ModelKind::Response => self.component_model(component, schema),
                    ModelKind::Request => {
                        if let Some(class_name) = self.request_components.get(component) {
                            return Ok(DartType::Model(class_name.clone()));
                        }
                        let class_name = self.arena.claim(hint);
                        self.request_components
                            .insert(component.to_string(), class_name.clone());
                        self.build_class(class_name.clone(), schema, policy, sink)?;
                        Ok(DartType::Model(class_name))
                    }
                };
            }
        }

        if is_string_enum(schema) {
            let name = self.arena.claim(hint);
            self.enums.push(EnumModel::new(name.clone(), enum_values(schema)));
            return Ok(DartType::Enum(name));
        }

        let ty = match schema_type(schema).0 {
            Some("string") => DartType::String,
            Some("integer") => DartType::Int,
            Some("number") => DartType::Double,
            Some("boolean") => DartType::Bool,
            Some("array") => {
                let items = schema.get("items").cloned().unwrap_or(JsonValue::Null);
                DartType::List(Box::new(self.derive_type(&items, hint, policy, sink)?))
            }
            _ if is_object_like(schema) => {
                let class_name = self.arena.claim(hint);
                self.build_class(class_name.clone(), schema, policy, sink)?;
                DartType::Model(class_name)
            }
            Some("object") => DartType::Map,
            _ => DartType::Dynamic,
        };
        Ok(ty)
    }

    /// Append `name` to `sink` with one field per property
    fn build_class(
        &mut self,
        name: String,
        schema: &JsonValue,
        policy: &dyn FieldPolicy,
        sink: &mut Vec<ModelClass>,
    ) -> crate::Result<()> {
        let index = sink.len();
        sink.push(ModelClass {
            name: name.clone(),
            fields: Vec::new(),
            description: text(schema, "description"),
        });

        let required: Vec<&str> = schema
            .get("required")
            .and_then(JsonValue::as_array)
            .map(|arr| arr.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::new();
        let mut field_names = HashSet::new();
        let properties = schema.get("properties").and_then(JsonValue::as_object);
        for (json_key, property) in properties.into_iter().flatten() {
            let hint = format!("{name}{}", to_upper_camel_case(json_key));
            let ty = self.derive_type(property, &hint, policy, sink)?;
            let is_required = required.contains(&json_key.as_str());
            let shape = policy.shape(&ty, schema_type(property).1, is_required);

            let base = to_dart_identifier(json_key);
            let mut field_name = base.clone();
            let mut n = 2;
            while !field_names.insert(field_name.clone()) {
                field_name = format!("{base}{n}");
                n += 1;
            }

            fields.push(ModelField {
                json_key: json_key.clone(),
                name: field_name,
                ty,
                nullable: shape.nullable,
                default_value: shape.default_value,
                description: text(property, "description"),
            });
        }

        if let Some(class) = sink.get_mut(index) {
            class.fields = fields;
        }
        Ok(())
    }

    fn component_enum(&mut self, name: &str, schema: &JsonValue) -> DartType {
        if let Some(ty) = self.components.get(name) {
            return ty.clone();
        }
        let enum_name = self.arena.claim(&to_upper_camel_case(name));
        self.enums
            .push(EnumModel::new(enum_name.clone(), enum_values(schema)));
        let ty = DartType::Enum(enum_name);
        self.components.insert(name.to_string(), ty.clone());
        ty
    }

    /// Type for a reference left unresolved because it closes a cycle
    fn cyclic_type(&self, component: &str, policy: &dyn FieldPolicy) -> DartType {
        let known = match policy.kind() {
            ModelKind::Response => self.components.get(component).cloned(),
            ModelKind::Request => self
                .request_components
                .get(component)
                .map(|name| DartType::Model(name.clone())),
        };
        known.unwrap_or_else(|| {
            log::warn!(
                "Cyclic reference to '{}' has no generated class, typing it as a map",
                component
            );
            DartType::Map
        })
    }
}

fn component_name(schema: &JsonValue) -> Option<&str> {
    schema.get(COMPONENT_NAME_KEY).and_then(JsonValue::as_str)
}

/// Declared type and nullability (`nullable`, `x-nullable` or a `"null"` type entry)
fn schema_type(schema: &JsonValue) -> (Option<&str>, bool) {
    let flagged = ["nullable", "x-nullable"]
        .iter()
        .any(|key| schema.get(*key).and_then(JsonValue::as_bool).unwrap_or(false));
    match schema.get("type") {
        Some(JsonValue::String(ty)) => (Some(ty.as_str()), flagged),
        Some(JsonValue::Array(types)) => {
            let mut names = types.iter().filter_map(JsonValue::as_str);
            let has_null = types.iter().any(|t| t.as_str() == Some("null"));
            (names.find(|t| *t != "null"), flagged || has_null)
        }
        _ => (None, flagged),
    }
}

fn is_object_like(schema: &JsonValue) -> bool {
    let has_properties = schema
        .get("properties")
        .and_then(JsonValue::as_object)
        .is_some_and(|props| !props.is_empty());
    has_properties && matches!(schema_type(schema).0, None | Some("object"))
}

fn is_string_enum(schema: &JsonValue) -> bool {
    schema_type(schema).0 == Some("string")
        && schema
            .get("enum")
            .and_then(JsonValue::as_array)
            .is_some_and(|values| !values.is_empty())
}

fn enum_values(schema: &JsonValue) -> Vec<String> {
    schema
        .get("enum")
        .and_then(JsonValue::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| match v {
                    JsonValue::String(s) => Some(s.clone()),
                    JsonValue::Null => None,
                    other => Some(other.to_string()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A schema with nothing to generate from (`{}` or only annotations)
fn is_empty_schema(schema: &JsonValue) -> bool {
    match schema.as_object() {
        Some(obj) => !["type", "properties", "items", "enum", "$ref"]
            .iter()
            .any(|key| obj.contains_key(*key)),
        None => true,
    }
}

fn text(schema: &JsonValue, key: &str) -> Option<String> {
    schema
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::{HttpMethod, SchemaResolver};
    use serde_json::json;

    fn endpoint_with(wrapped: Option<JsonValue>, response_name: Option<&str>) -> EndpointInfo {
        EndpointInfo {
            method: HttpMethod::Get,
            path: "/v1/users".to_string(),
            path_params: Vec::new(),
            query_params: Vec::new(),
            has_body: false,
            body_schema: None,
            response_schema: wrapped
                .clone()
                .map(|w| json!({"type": "object", "properties": {"data": w}})),
            wrapped_response_schema: wrapped,
            response_schema_name: response_name.map(String::from),
            summary: None,
            description: None,
            deprecated: false,
        }
    }

    fn resolve(components: JsonValue, schema: JsonValue) -> JsonValue {
        let map = components.as_object().cloned().unwrap_or_default();
        SchemaResolver::new(Some(&map))
            .resolve(&schema)
            .unwrap_or(JsonValue::Null)
    }

    #[test]
    fn test_component_response_with_typed_defaults() -> crate::Result<()> {
        let wrapped = resolve(
            json!({"User": {"type": "object", "properties": {
                "id": {"type": "integer"},
                "name": {"type": "string"},
                "score": {"type": "number"},
                "active": {"type": "boolean"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "meta": {"type": "object"},
                "nickname": {"type": "string", "nullable": true},
                "extra": {}
            }}}),
            json!({"$ref": "#/components/schemas/User"}),
        );
        let mut synth = ModelSynthesizer::new();
        let shape = synth.synthesize_response(&endpoint_with(Some(wrapped), None), "getUsersId")?;
        assert_eq!(shape, ResponseShape::Single(DartType::Model("User".into())));

        let user = synth.files()[0]
            .class("User")
            .cloned()
            .unwrap_or_else(|| panic!("User missing"));
        let defaults: Vec<(&str, Option<&str>)> = user
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.default_value.as_deref()))
            .collect();
        assert_eq!(
            defaults,
            vec![
                ("id", Some("0")),
                ("name", Some("''")),
                ("score", Some("0.0")),
                ("active", Some("false")),
                ("tags", Some("[]")),
                ("meta", Some("{}")),
                ("nickname", None),
                ("extra", None),
            ]
        );
        assert!(user.field("nickname").is_some_and(|f| f.nullable));
        assert_eq!(user.field("extra").map(|f| f.ty.clone()), Some(DartType::Dynamic));
        Ok(())
    }

    #[test]
    fn test_list_of_refs_reuses_component_without_item_class() -> crate::Result<()> {
        let wrapped = resolve(
            json!({"Foo": {"type": "object", "properties": {"id": {"type": "integer"}}}}),
            json!({"type": "array", "items": {"$ref": "#/components/schemas/Foo"}}),
        );
        let mut synth = ModelSynthesizer::new();
        let shape = synth.synthesize_response(&endpoint_with(Some(wrapped), None), "getFoos")?;
        assert_eq!(shape, ResponseShape::List(DartType::Model("Foo".into())));
        let names: Vec<&str> = synth.files().iter().map(ModelFile::primary_name).collect();
        assert_eq!(names, vec!["Foo"]);
        Ok(())
    }

    #[test]
    fn test_inline_shapes_are_named_after_method() -> crate::Result<()> {
        let mut synth = ModelSynthesizer::new();
        let items = json!({
            "type": "array",
            "items": {"type": "object", "properties": {"id": {"type": "integer"}}}
        });
        let shape = synth.synthesize_response(&endpoint_with(Some(items), None), "getUsers")?;
        assert_eq!(shape, ResponseShape::List(DartType::Model("GetUsersItem".into())));

        let object = json!({"type": "object", "properties": {"total": {"type": "integer"}}});
        let endpoint = endpoint_with(Some(object), Some("UserPage"));
        let shape = synth.synthesize_response(&endpoint, "getUsers")?;
        assert_eq!(shape, ResponseShape::Single(DartType::Model("UserPageData".into())));
        Ok(())
    }

    #[test]
    fn test_primitive_and_void_responses() -> crate::Result<()> {
        let mut synth = ModelSynthesizer::new();
        let ints = json!({"type": "array", "items": {"type": "integer"}});
        assert_eq!(
            synth.synthesize_response(&endpoint_with(Some(ints), None), "getIds")?,
            ResponseShape::List(DartType::Int)
        );
        let text = json!({"type": "string", "enum": ["a", "b"]});
        assert_eq!(
            synth.synthesize_response(&endpoint_with(Some(text), None), "getMode")?,
            ResponseShape::Single(DartType::String)
        );
        assert_eq!(
            synth.synthesize_response(&endpoint_with(Some(json!({})), None), "ping")?,
            ResponseShape::Void
        );
        assert_eq!(
            synth.synthesize_response(&endpoint_with(None, None), "ping")?,
            ResponseShape::Void
        );
        assert!(synth.files().is_empty());
        assert!(synth.enums().is_empty());
        Ok(())
    }

    #[test]
    fn test_nested_objects_are_embedded_with_compound_names() -> crate::Result<()> {
        let wrapped = json!({"type": "object", "properties": {
            "profile": {"type": "object", "properties": {
                "address": {"type": "object", "properties": {"city": {"type": "string"}}}
            }}
        }});
        let mut synth = ModelSynthesizer::new();
        synth.synthesize_response(&endpoint_with(Some(wrapped), Some("Account")), "getAccount")?;

        assert_eq!(synth.files().len(), 1);
        let names: Vec<&str> = synth.files()[0].classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["AccountData", "AccountDataProfile", "AccountDataProfileAddress"]
        );
        let profile = synth.files()[0]
            .class("AccountData")
            .and_then(|c| c.field("profile"))
            .cloned();
        assert_eq!(
            profile.and_then(|f| f.default_value),
            Some("AccountDataProfile()".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_collisions_append_data() -> crate::Result<()> {
        let mut synth = ModelSynthesizer::new();
        let first = json!({"type": "object", "properties": {"a": {"type": "string"}}});
        let second = json!({"type": "object", "properties": {"b": {"type": "string"}}});
        let one = synth.synthesize_response(&endpoint_with(Some(first), Some("User")), "getA")?;
        let two = synth.synthesize_response(&endpoint_with(Some(second), Some("User")), "getB")?;
        assert_eq!(one, ResponseShape::Single(DartType::Model("UserData".into())));
        assert_eq!(two, ResponseShape::Single(DartType::Model("UserDataData".into())));
        Ok(())
    }

    #[test]
    fn test_field_enums_are_namespaced_and_defaulted() -> crate::Result<()> {
        let wrapped = resolve(
            json!({
                "User": {
                    "type": "object",
                    "properties": {"status": {"type": "string", "enum": ["active", "inactive"]}}
                },
                "Order": {
                    "type": "object",
                    "properties": {"status": {"type": "string", "enum": ["open", "none"]}}
                }
            }),
            json!({"type": "object", "properties": {
                "user": {"$ref": "#/components/schemas/User"},
                "order": {"$ref": "#/components/schemas/Order"}
            }}),
        );
        let mut synth = ModelSynthesizer::new();
        synth.synthesize_response(&endpoint_with(Some(wrapped), None), "getDashboard")?;

        let enums: Vec<(&str, Vec<&str>)> = synth
            .enums()
            .iter()
            .map(|e| (e.name.as_str(), e.members()))
            .collect();
        assert_eq!(
            enums,
            vec![
                ("UserStatus", vec!["none", "active", "inactive"]),
                ("OrderStatus", vec!["open", "none"]),
            ]
        );
        let user = synth.files().iter().find_map(|f| f.class("User")).cloned();
        assert_eq!(
            user.and_then(|u| u.field("status").and_then(|f| f.default_value.clone())),
            Some("UserStatus.none".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_cyclic_component_refers_to_itself() -> crate::Result<()> {
        let wrapped = resolve(
            json!({"Node": {"type": "object", "properties": {
                "name": {"type": "string"},
                "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
            }}}),
            json!({"$ref": "#/components/schemas/Node"}),
        );
        let mut synth = ModelSynthesizer::new();
        synth.synthesize_response(&endpoint_with(Some(wrapped), None), "getTree")?;
        let node = synth.files()[0].class("Node").cloned();
        assert_eq!(
            node.and_then(|n| n.field("children").map(|f| f.ty.clone())),
            Some(DartType::List(Box::new(DartType::Model("Node".into()))))
        );
        Ok(())
    }

    #[test]
    fn test_request_policy_and_embedding() -> crate::Result<()> {
        let body = resolve(
            json!({"Address": {"type": "object", "properties": {"city": {"type": "string"}}}}),
            json!({
                "type": "object",
                "required": ["email", "address"],
                "properties": {
                    "email": {"type": "string"},
                    "nickname": {"type": "string"},
                    "age": {"type": "integer", "nullable": true},
                    "address": {"$ref": "#/components/schemas/Address"}
                }
            }),
        );
        let mut synth = ModelSynthesizer::new();
        let shape = synth.synthesize_request(&body, "postUsers")?;
        assert_eq!(
            shape,
            RequestShape {
                ty: DartType::Model("PostUsersRequest".into()),
                is_model: true,
            }
        );

        let file = &synth.files()[0];
        assert_eq!(file.kind, ModelKind::Request);
        let names: Vec<&str> = file.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["PostUsersRequest", "PostUsersRequestAddress"]);

        let request = &file.classes[0];
        let email = request.field("email").cloned();
        assert_eq!(email.as_ref().and_then(|f| f.default_value.clone()), Some("''".into()));
        assert!(request.field("nickname").is_some_and(|f| f.nullable && f.default_value.is_none()));
        assert!(request.field("age").is_some_and(|f| f.nullable));
        Ok(())
    }

    #[test]
    fn test_non_object_request_body() -> crate::Result<()> {
        let mut synth = ModelSynthesizer::new();
        let body = json!({"type": "array", "items": {"type": "integer"}});
        let shape = synth.synthesize_request(&body, "putIds")?;
        assert_eq!(
            shape,
            RequestShape {
                ty: DartType::List(Box::new(DartType::Int)),
                is_model: false,
            }
        );
        assert!(synth.files().is_empty());
        Ok(())
    }

    #[test]
    fn test_shared_component_built_once() -> crate::Result<()> {
        let components = json!({
            "Foo": {"type": "object", "properties": {"id": {"type": "integer"}}}
        });
        let mut synth = ModelSynthesizer::new();
        for method in ["getA", "getB"] {
            let wrapped = resolve(components.clone(), json!({"$ref": "#/components/schemas/Foo"}));
            synth.synthesize_response(&endpoint_with(Some(wrapped), None), method)?;
        }
        assert_eq!(synth.files().len(), 1);
        assert_eq!(synth.arena().len(), 1);
        Ok(())
    }
}
