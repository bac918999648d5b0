//! Dart-side type model synthesized from resolved schemas.

pub mod policy;
pub mod synth;

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::utils::{to_dart_identifier, to_snake_case};

pub use policy::{FieldPolicy, FieldShape, RequestPolicy, ResponsePolicy};
pub use synth::{ModelSynthesizer, RequestShape, ResponseShape};

/// A Dart type as it appears in a field, parameter or return type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DartType {
    String,
    Int,
    Double,
    Bool,
    Dynamic,
    /// `Map<String, dynamic>`
    Map,
    List(Box<DartType>),
    /// A synthesized (or component) class
    Model(String),
    /// A synthesized enum
    Enum(String),
}

impl DartType {
    /// Whether values of this type are decoded without a `fromJson` call
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Int | Self::Double | Self::Bool | Self::Dynamic | Self::Map
        )
    }

    /// `dynamic` is nullable already and never takes a `?`
    pub fn accepts_nullable_suffix(&self) -> bool {
        !matches!(self, Self::Dynamic)
    }

    /// Type as written in a declaration, with the nullable suffix if requested
    pub fn declaration(&self, nullable: bool) -> String {
        if nullable && self.accepts_nullable_suffix() {
            format!("{self}?")
        } else {
            self.to_string()
        }
    }

    /// Literal used for `@Default(...)` annotations and decoder fallbacks
    pub fn default_literal(&self) -> Option<String> {
        let literal = match self {
            Self::String => "''".to_string(),
            Self::Int => "0".to_string(),
            Self::Double => "0.0".to_string(),
            Self::Bool => "false".to_string(),
            Self::Dynamic => return None,
            Self::Map => "{}".to_string(),
            Self::List(_) => "[]".to_string(),
            Self::Model(name) => format!("{name}()"),
            Self::Enum(name) => format!("{name}.none"),
        };
        Some(literal)
    }
}

impl fmt::Display for DartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("String"),
            Self::Int => f.write_str("int"),
            Self::Double => f.write_str("double"),
            Self::Bool => f.write_str("bool"),
            Self::Dynamic => f.write_str("dynamic"),
            Self::Map => f.write_str("Map<String, dynamic>"),
            Self::List(inner) => write!(f, "List<{inner}>"),
            Self::Model(name) | Self::Enum(name) => f.write_str(name),
        }
    }
}

/// Which nullability policy produced a class, and where its file goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Response,
    Request,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelField {
    /// Property name in the JSON payload
    pub json_key: String,
    /// Dart field name
    pub name: String,
    pub ty: DartType,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelClass {
    pub name: String,
    pub fields: Vec<ModelField>,
    pub description: Option<String>,
}

impl ModelClass {
    pub fn field(&self, json_key: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.json_key == json_key)
    }
}

/// One generated Dart file: the primary class followed by its embedded
/// nested classes
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFile {
    pub kind: ModelKind,
    pub classes: Vec<ModelClass>,
}

impl ModelFile {
    /// Name of the class the file is named after
    pub fn primary_name(&self) -> &str {
        self.classes.first().map(|c| c.name.as_str()).unwrap_or_default()
    }

    /// `snake_case` file stem derived from the primary class name
    pub fn file_stem(&self) -> String {
        to_snake_case(self.primary_name())
    }

    pub fn class(&self, name: &str) -> Option<&ModelClass> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// Identifiers an enum constant cannot take: members every Dart enum has,
/// plus the wire value field of generated enums
const ENUM_RESERVED_MEMBERS: [&str; 3] = ["values", "index", "jsonValue"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    /// Dart member identifier
    pub member: String,
    /// Value on the wire
    pub json_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumModel {
    pub name: String,
    pub values: Vec<EnumValue>,
}

impl EnumModel {
    /// Build an enum, prepending a `none` member unless `"none"` is already a value
    pub fn new<I, S>(name: impl Into<String>, raw_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw_values: Vec<String> = raw_values.into_iter().map(Into::into).collect();
        let mut ordered = Vec::with_capacity(raw_values.len() + 1);
        if !raw_values.iter().any(|v| v == "none") {
            ordered.push("none".to_string());
        }
        ordered.extend(raw_values);

        let mut used: HashSet<String> =
            ENUM_RESERVED_MEMBERS.iter().map(|m| m.to_string()).collect();
        let mut values = Vec::with_capacity(ordered.len());
        for json_value in ordered {
            if values.iter().any(|v: &EnumValue| v.json_value == json_value) {
                continue;
            }
            let base = to_dart_identifier(&json_value);
            let mut member = base.clone();
            let mut n = 2;
            while !used.insert(member.clone()) {
                member = format!("{base}{n}");
                n += 1;
            }
            values.push(EnumValue { member, json_value });
        }

        Self {
            name: name.into(),
            values,
        }
    }

    pub fn file_stem(&self) -> String {
        to_snake_case(&self.name)
    }

    pub fn members(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.member.as_str()).collect()
    }
}
