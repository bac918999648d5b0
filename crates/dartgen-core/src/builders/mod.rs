//! Context builder traits and adapters for the API method template.
pub mod dart;

use serde_json::Value as JsonValue;

use crate::model::{RequestShape, ResponseShape};
use crate::openapi::EndpointInfo;

pub use dart::DartEndpointContextBuilder;

/// An included endpoint together with what was synthesized for it
#[derive(Debug, Clone)]
pub struct MethodPlan<'a> {
    pub endpoint: &'a EndpointInfo,
    /// Generated method name
    pub name: String,
    pub response: ResponseShape,
    pub request: Option<RequestShape>,
}

/// Trait for converting a planned method into a template context.
pub trait EndpointContextBuilder {
    fn build(&self, plan: &MethodPlan<'_>) -> crate::Result<JsonValue>;
}

pub struct EndpointContext;

impl EndpointContext {
    /// Build one context per plan, keeping document order
    pub fn transform_endpoints(
        builder: &dyn EndpointContextBuilder,
        plans: &[MethodPlan<'_>],
    ) -> crate::Result<Vec<JsonValue>> {
        plans.iter().map(|plan| builder.build(plan)).collect()
    }
}
