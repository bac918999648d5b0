//! Keeps the shared response envelope declaration in line with `wrapped_by`.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::EnvelopeKey;
use crate::error::Result;

static ENVELOPE_JSON_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@JsonKey\(\s*name:\s*(['"])(data|results?)(['"])"#)
        .expect("valid envelope key regex")
});

/// Point every envelope `@JsonKey(name: ...)` at `key`; returns the new
/// source and how many annotations were rewritten
pub fn rewrite_envelope_key(source: &str, key: EnvelopeKey) -> (String, usize) {
    let mut count = 0;
    let rewritten = ENVELOPE_JSON_KEY.replace_all(source, |caps: &Captures<'_>| {
        if &caps[2] != key.as_str() {
            count += 1;
        }
        format!("@JsonKey(name: {}{}{}", &caps[1], key.as_str(), &caps[3])
    });
    (rewritten.into_owned(), count)
}

/// Rewrite the envelope file at `path`. A missing file is only a warning.
///
/// Returns whether the file was changed.
pub async fn update_envelope_file(path: &Path, key: EnvelopeKey) -> Result<bool> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        log::warn!(
            "Envelope file {} not found, skipping the '{}' key update",
            path.display(),
            key
        );
        return Ok(false);
    }

    let source = tokio::fs::read_to_string(path).await?;
    let (rewritten, count) = rewrite_envelope_key(&source, key);
    if count == 0 {
        log::debug!("Envelope file {} already uses '{}'", path.display(), key);
        return Ok(false);
    }
    tokio::fs::write(path, rewritten).await?;
    log::info!(
        "Updated {} envelope key(s) in {} to '{}'",
        count,
        path.display(),
        key
    );
    Ok(true)
}
