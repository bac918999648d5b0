//! Dartgen Core Library
//!
//! This library provides the core functionality for generating Dart API
//! clients (freezed models, enums and service methods) from OpenAPI
//! documents for a Flutter project.

pub mod builders;
pub mod config;
pub mod envelope;
pub mod error;
pub mod generate;
pub mod model;
pub mod naming;
pub mod openapi;
pub mod surgery;
pub mod templates;
pub mod utils;

pub use crate::{
    config::{Config, EnvelopeKey, OutputLayout},
    error::{Error, Result},
    generate::{GenerationReport, generate},
    openapi::OpenApiContext,
    templates::TemplateManager,
};
