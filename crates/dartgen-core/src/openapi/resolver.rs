//! `$ref` substitution and composition merging for schema fragments.
//!
//! Resolution produces a tree: every `#/components/schemas/<Name>` reference
//! is replaced by the component itself, annotated with [`COMPONENT_NAME_KEY`]
//! so later stages can keep using the original name. A reference that is
//! already being resolved further up the same chain is left in place; the
//! synthesizer types it as the component class.

use std::collections::HashSet;

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::schema_ref_name;
use crate::Error;

/// Annotation added to substituted component schemas
pub const COMPONENT_NAME_KEY: &str = "x-component-name";

const COMPOSITION_KEYS: [&str; 3] = ["allOf", "oneOf", "anyOf"];

/// Dereferences schema fragments against `components.schemas`
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    schemas: Option<&'a JsonMap<String, JsonValue>>,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(schemas: Option<&'a JsonMap<String, JsonValue>>) -> Self {
        Self { schemas }
    }

    /// Fully dereference `schema`
    pub fn resolve(&self, schema: &JsonValue) -> crate::Result<JsonValue> {
        self.resolve_chain(schema, &mut Vec::new())
    }

    /// Look up a component by name without resolving it
    pub fn component(&self, name: &str) -> Option<&'a JsonValue> {
        self.schemas.and_then(|s| s.get(name))
    }

    fn resolve_chain(
        &self,
        schema: &JsonValue,
        chain: &mut Vec<String>,
    ) -> crate::Result<JsonValue> {
        let Some(obj) = schema.as_object() else {
            return Ok(schema.clone());
        };

        if let Some(ref_str) = obj.get("$ref").and_then(JsonValue::as_str) {
            return self.resolve_ref(ref_str, obj, chain);
        }

        if COMPOSITION_KEYS.iter().any(|key| obj.contains_key(*key)) {
            return self.resolve_composition(obj, chain);
        }

        let mut out = obj.clone();
        if let Some(props) = obj.get("properties").and_then(JsonValue::as_object) {
            let mut resolved = JsonMap::new();
            for (name, prop) in props {
                resolved.insert(name.clone(), self.resolve_chain(prop, chain)?);
            }
            out.insert("properties".to_string(), JsonValue::Object(resolved));
        }
        if let Some(items) = obj.get("items") {
            out.insert("items".to_string(), self.resolve_chain(items, chain)?);
        }
        if let Some(additional) = obj.get("additionalProperties").filter(|v| v.is_object()) {
            out.insert(
                "additionalProperties".to_string(),
                self.resolve_chain(additional, chain)?,
            );
        }
        Ok(JsonValue::Object(out))
    }

    fn resolve_ref(
        &self,
        ref_str: &str,
        obj: &JsonMap<String, JsonValue>,
        chain: &mut Vec<String>,
    ) -> crate::Result<JsonValue> {
        let name = schema_ref_name(ref_str)
            .ok_or_else(|| Error::openapi(format!("Unsupported schema ref '{}'", ref_str)))?;

        if chain.iter().any(|seen| seen == name) {
            log::debug!("Cyclic reference to '{}' left unresolved", name);
            let mut placeholder = JsonMap::new();
            placeholder.insert("$ref".to_string(), JsonValue::String(ref_str.to_string()));
            placeholder.insert(COMPONENT_NAME_KEY.to_string(), JsonValue::String(name.to_string()));
            return Ok(JsonValue::Object(placeholder));
        }

        let def = self
            .component(name)
            .ok_or_else(|| Error::openapi(format!("Schema '{}' not found", name)))?;

        chain.push(name.to_string());
        let resolved = self.resolve_chain(def, chain);
        chain.pop();

        let mut resolved = match resolved? {
            JsonValue::Object(map) => map,
            other => return Ok(other),
        };
        // Siblings of `$ref` (e.g. `nullable`, `description`) refine the target
        for (key, value) in obj.iter().filter(|(k, _)| k.as_str() != "$ref") {
            resolved.insert(key.clone(), value.clone());
        }
        resolved.insert(COMPONENT_NAME_KEY.to_string(), JsonValue::String(name.to_string()));
        Ok(JsonValue::Object(resolved))
    }

    fn resolve_composition(
        &self,
        obj: &JsonMap<String, JsonValue>,
        chain: &mut Vec<String>,
    ) -> crate::Result<JsonValue> {
        let mut base = obj.clone();
        for key in COMPOSITION_KEYS {
            base.remove(key);
        }

        // `allOf: [{$ref}]` is a reference with refinements, keep the name
        if let Some([single]) = obj.get("allOf").and_then(JsonValue::as_array).map(Vec::as_slice) {
            if single.get("$ref").is_some() && !base.contains_key("properties") {
                let mut merged = match self.resolve_chain(single, chain)? {
                    JsonValue::Object(map) => map,
                    other => return Ok(other),
                };
                for (key, value) in base {
                    merged.insert(key, value);
                }
                return Ok(JsonValue::Object(merged));
            }
        }

        let mut base = match self.resolve_chain(&JsonValue::Object(base), chain)? {
            JsonValue::Object(map) => map,
            other => return Ok(other),
        };
        let mut properties = base
            .remove("properties")
            .and_then(|p| match p {
                JsonValue::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        let mut required: Vec<String> = string_list(base.get("required"));

        for key in COMPOSITION_KEYS {
            let Some(branches) = obj.get(key).and_then(JsonValue::as_array) else {
                continue;
            };
            for branch in branches {
                let branch = self.resolve_chain(branch, chain)?;
                if let Some(props) = branch.get("properties").and_then(JsonValue::as_object) {
                    for (name, prop) in props {
                        properties.insert(name.clone(), prop.clone());
                    }
                }
                if key == "allOf" {
                    required.extend(string_list(branch.get("required")));
                }
                if !base.contains_key("type") {
                    if let Some(ty) = branch.get("type") {
                        base.insert("type".to_string(), ty.clone());
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        required.retain(|name| seen.insert(name.clone()));

        if !properties.is_empty() {
            base.insert("type".to_string(), JsonValue::String("object".to_string()));
            base.insert("properties".to_string(), JsonValue::Object(properties));
        }
        if !required.is_empty() {
            base.insert(
                "required".to_string(),
                JsonValue::Array(required.into_iter().map(JsonValue::String).collect()),
            );
        }
        Ok(JsonValue::Object(base))
    }
}

fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(JsonValue::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schemas(value: JsonValue) -> JsonMap<String, JsonValue> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_resolves_nested_refs_and_annotates_names() -> crate::Result<()> {
        let components = schemas(json!({
            "User": {"type": "object", "properties": {"address": {"$ref": "#/components/schemas/Address"}}},
            "Address": {"type": "object", "properties": {"city": {"type": "string"}}}
        }));
        let resolver = SchemaResolver::new(Some(&components));

        let resolved = resolver.resolve(&json!({"$ref": "#/components/schemas/User"}))?;
        assert_eq!(resolved[COMPONENT_NAME_KEY], json!("User"));
        assert_eq!(resolved["properties"]["address"][COMPONENT_NAME_KEY], json!("Address"));
        assert_eq!(
            resolved["properties"]["address"]["properties"]["city"]["type"],
            json!("string")
        );
        Ok(())
    }

    #[test]
    fn test_ref_siblings_override_target() -> crate::Result<()> {
        let components = schemas(json!({"Tag": {"type": "object", "properties": {}}}));
        let resolver = SchemaResolver::new(Some(&components));
        let resolved =
            resolver.resolve(&json!({"$ref": "#/components/schemas/Tag", "nullable": true}))?;
        assert_eq!(resolved["nullable"], json!(true));
        assert_eq!(resolved[COMPONENT_NAME_KEY], json!("Tag"));
        Ok(())
    }

    #[test]
    fn test_cycles_leave_placeholder() -> crate::Result<()> {
        let components = schemas(json!({
            "Node": {
                "type": "object",
                "properties": {
                    "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
                }
            }
        }));
        let resolver = SchemaResolver::new(Some(&components));
        let resolved = resolver.resolve(&json!({"$ref": "#/components/schemas/Node"}))?;
        let items = &resolved["properties"]["children"]["items"];
        assert_eq!(items["$ref"], json!("#/components/schemas/Node"));
        assert_eq!(items[COMPONENT_NAME_KEY], json!("Node"));
        Ok(())
    }

    #[test]
    fn test_all_of_merges_properties_and_dedups_required() -> crate::Result<()> {
        let components = schemas(json!({
            "Base": {
                "type": "object",
                "required": ["id"],
                "properties": {"id": {"type": "integer"}, "name": {"type": "integer"}}
            }
        }));
        let resolver = SchemaResolver::new(Some(&components));
        let resolved = resolver.resolve(&json!({
            "allOf": [
                {"$ref": "#/components/schemas/Base"},
                {"type": "object", "required": ["id", "name"], "properties": {"name": {"type": "string"}}}
            ]
        }))?;

        let keys: Vec<&String> = resolved["properties"]
            .as_object()
            .map(|m| m.keys().collect())
            .unwrap_or_default();
        assert_eq!(keys, vec!["id", "name"]);
        assert_eq!(resolved["properties"]["name"]["type"], json!("string"));
        assert_eq!(resolved["required"], json!(["id", "name"]));
        assert_eq!(resolved["type"], json!("object"));
        assert!(resolved.get(COMPONENT_NAME_KEY).is_none());
        Ok(())
    }

    #[test]
    fn test_single_ref_all_of_keeps_component_name() -> crate::Result<()> {
        let components = schemas(json!({
            "Pet": {"type": "object", "properties": {"id": {"type": "integer"}}}
        }));
        let resolver = SchemaResolver::new(Some(&components));
        let resolved = resolver.resolve(&json!({
            "allOf": [{"$ref": "#/components/schemas/Pet"}],
            "nullable": true
        }))?;
        assert_eq!(resolved[COMPONENT_NAME_KEY], json!("Pet"));
        assert_eq!(resolved["nullable"], json!(true));
        Ok(())
    }

    #[test]
    fn test_one_of_unions_properties_without_required() -> crate::Result<()> {
        let resolver = SchemaResolver::new(None);
        let resolved = resolver.resolve(&json!({
            "oneOf": [
                {"type": "object", "required": ["card"], "properties": {"card": {"type": "string"}}},
                {"type": "object", "properties": {"iban": {"type": "string"}}}
            ]
        }))?;
        assert!(resolved["properties"].get("card").is_some());
        assert!(resolved["properties"].get("iban").is_some());
        assert!(resolved.get("required").is_none());
        Ok(())
    }

    #[test]
    fn test_missing_and_foreign_refs_error() {
        let resolver = SchemaResolver::new(None);
        assert!(resolver.resolve(&json!({"$ref": "#/components/schemas/Nope"})).is_err());
        assert!(resolver.resolve(&json!({"$ref": "other.json#/Foo"})).is_err());
    }
}
