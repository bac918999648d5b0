//! Code generation pipeline for dartgen

use std::path::PathBuf;

use serde::Serialize;

use crate::{
    builders::{DartEndpointContextBuilder, EndpointContext, MethodPlan},
    config::Config,
    envelope::update_envelope_file,
    error::{Error, Result},
    model::{ModelKind, ModelSynthesizer},
    naming::method_names,
    openapi::OpenApiContext,
    surgery::{PatchMode, PatchOptions, patch_service},
    templates::{
        API_METHOD_TEMPLATE, ENUM_TEMPLATE, EnumContext, MODEL_TEMPLATE, ModelFileContext,
        TemplateManager,
    },
};

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// OpenAPI document that was read
    pub document: PathBuf,
    pub service_file: PathBuf,
    pub methods: usize,
    pub models: usize,
    pub requests: usize,
    pub enums: usize,
}

/// Main entry point for code generation
pub async fn generate(config: &Config) -> Result<GenerationReport> {
    // 1. Load the OpenAPI document
    let (spec, document) = OpenApiContext::from_dir(&config.input_path).await?;
    log::info!(
        "Loaded {} {} from {}",
        spec.title().unwrap_or("API"),
        spec.version().unwrap_or_default(),
        document.display()
    );

    // 2. Analyze endpoints; names are computed over the whole document
    let endpoints = spec.parse_endpoints(config.wrapped_by)?;
    let names = method_names(&endpoints);
    let templates = TemplateManager::new(config.template_dir.clone()).await?;

    // 3. Synthesize models for the included endpoints
    let mut synth = ModelSynthesizer::new();
    let mut plans = Vec::new();
    for (endpoint, name) in endpoints.iter().zip(names) {
        if !config.includes_endpoint(endpoint.method.as_str(), &endpoint.path) {
            log::debug!("Skipping {} (not in apis filter)", endpoint.filter_key());
            continue;
        }
        let response = synth.synthesize_response(endpoint, &name)?;
        let request = endpoint
            .body_schema
            .as_ref()
            .map(|schema| synth.synthesize_request(schema, &name))
            .transpose()?;
        plans.push(MethodPlan {
            endpoint,
            name,
            response,
            request,
        });
    }
    if plans.is_empty() {
        log::warn!("No endpoints selected for generation");
    }
    log::info!("Prepared {} of {} endpoints", plans.len(), endpoints.len());

    // 4. Render methods and patch the service class in memory first, so a
    //    broken service file aborts before anything is written
    let builder = DartEndpointContextBuilder::new(config.layout.api_client.as_str());
    let block = EndpointContext::transform_endpoints(&builder, &plans)?
        .iter()
        .map(|context| templates.render(API_METHOD_TEMPLATE, context))
        .collect::<Result<Vec<_>>>()?
        .iter()
        .map(|method| method.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n\n");

    let service_file = prepare_service_file(config).await?;
    let source = tokio::fs::read_to_string(&service_file).await.map_err(|e| {
        Error::surgery(format!(
            "Failed to read service file {}: {}",
            service_file.display(),
            e
        ))
    })?;
    let patched = patch_service(
        &source,
        &block,
        &PatchOptions {
            class_name: config.layout.service_class.as_deref(),
            marker: &config.layout.marker,
            mode: PatchMode::from_replace(config.replace),
        },
    )?;

    // 5. Write models, enums and the service file
    let (files, enums) = synth.into_output();
    let mut report = GenerationReport {
        document,
        service_file: service_file.clone(),
        methods: plans.len(),
        ..GenerationReport::default()
    };

    for file in &files {
        let dir = match file.kind {
            ModelKind::Response => {
                report.models += 1;
                config.model_dir()
            }
            ModelKind::Request => {
                report.requests += 1;
                config.request_dir()
            }
        };
        let context = ModelFileContext::new(file, &config.layout.barrel_import);
        let path = dir.join(format!("{}.dart", file.file_stem()));
        templates.render_to_file(MODEL_TEMPLATE, &context, path).await?;
    }

    let enum_dir = config.enum_dir();
    for model in &enums {
        templates
            .render_to_file(
                ENUM_TEMPLATE,
                &EnumContext::from(model),
                enum_dir.join(format!("{}.dart", model.file_stem())),
            )
            .await?;
    }
    report.enums = enums.len();

    tokio::fs::write(&service_file, patched).await?;
    log::info!(
        "{} {} method(s) in {}",
        if config.replace { "Replaced with" } else { "Appended" },
        report.methods,
        service_file.display()
    );

    // 6. Keep the envelope declaration in line with the unwrapped key
    update_envelope_file(&config.envelope_file_path(), config.wrapped_by).await?;

    Ok(report)
}

/// Service file to patch; under a custom output root it is seeded from the
/// project's own service file when missing
async fn prepare_service_file(config: &Config) -> Result<PathBuf> {
    let target = config.service_file_path();
    if config.output_path.is_none() || tokio::fs::try_exists(&target).await.unwrap_or(false) {
        return Ok(target);
    }

    let source = config.default_service_file_path();
    if tokio::fs::try_exists(&source).await.unwrap_or(false) {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, &target).await?;
        log::info!(
            "Seeded {} from {}",
            target.display(),
            source.display()
        );
    }
    Ok(target)
}
