//! Field policies: how a derived type becomes a declared field.
//!
//! Type derivation is shared between response and request models; the policy
//! decides nullability and defaults afterwards.

use super::{DartType, ModelKind};

/// Nullability and default of a declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub nullable: bool,
    pub default_value: Option<String>,
}

impl FieldShape {
    fn nullable() -> Self {
        Self {
            nullable: true,
            default_value: None,
        }
    }

    fn defaulted(ty: &DartType) -> Self {
        Self {
            nullable: false,
            default_value: ty.default_literal(),
        }
    }
}

pub trait FieldPolicy {
    /// Kind of model classes built with this policy
    fn kind(&self) -> ModelKind;

    /// Shape a field of type `ty`, given the schema's `nullable` flag and
    /// whether the owning object lists the field as required
    fn shape(&self, ty: &DartType, schema_nullable: bool, required: bool) -> FieldShape;
}

/// Response/model classes: every non-nullable field carries a type-directed default
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsePolicy;

impl FieldPolicy for ResponsePolicy {
    fn kind(&self) -> ModelKind {
        ModelKind::Response
    }

    fn shape(&self, ty: &DartType, schema_nullable: bool, _required: bool) -> FieldShape {
        if schema_nullable {
            FieldShape::nullable()
        } else {
            FieldShape::defaulted(ty)
        }
    }
}

/// Request classes: only required, non-nullable fields carry a default;
/// everything else is left nullable so it can be omitted
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestPolicy;

impl FieldPolicy for RequestPolicy {
    fn kind(&self) -> ModelKind {
        ModelKind::Request
    }

    fn shape(&self, ty: &DartType, schema_nullable: bool, required: bool) -> FieldShape {
        if required && !schema_nullable {
            FieldShape::defaulted(ty)
        } else {
            FieldShape::nullable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_policy_defaults_regardless_of_required() {
        let shape = ResponsePolicy.shape(&DartType::Int, false, false);
        assert_eq!(shape, FieldShape { nullable: false, default_value: Some("0".into()) });

        let nullable = ResponsePolicy.shape(&DartType::String, true, true);
        assert!(nullable.nullable);
        assert_eq!(nullable.default_value, None);
    }

    #[test]
    fn test_request_policy() {
        let required = RequestPolicy.shape(&DartType::String, false, true);
        assert_eq!(required.default_value.as_deref(), Some("''"));
        assert!(!required.nullable);

        let optional = RequestPolicy.shape(&DartType::String, false, false);
        assert!(optional.nullable);
        assert_eq!(optional.default_value, None);

        let required_nullable = RequestPolicy.shape(&DartType::Bool, true, true);
        assert!(required_nullable.nullable);
        assert_eq!(RequestPolicy.kind(), ModelKind::Request);
    }
}
