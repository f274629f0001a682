//! Trial runner library
//!
//! File handling behind the `rdk` command: load a trial request or a bare
//! configuration, run it headless, validate it, write JSON results.

use anyhow::{bail, Context, Result};
use rdk_core::{run_trial, ResolvedTrial, ScriptedKey, TrialConfig, TrialOutput, TrialRequest};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Load a `TrialRequest` from disk.
///
/// A file with a top-level `config` object is a full request; anything else
/// is read as a bare `TrialConfig` with default run options.
pub fn load_request(path: &Path) -> Result<TrialRequest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trial file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse JSON: {}", path.display()))?;

    if value.get("config").is_some_and(|c| c.is_object()) {
        debug!(path = %path.display(), "loaded full trial request");
        serde_json::from_value(value).context("Invalid trial request")
    } else {
        debug!(path = %path.display(), "loaded bare trial configuration");
        let config: TrialConfig =
            serde_json::from_value(value).context("Invalid trial configuration")?;
        Ok(TrialRequest::new(config))
    }
}

/// Parse a `key@milliseconds` response script entry, e.g. `f@350`.
pub fn parse_key_spec(spec: &str) -> Result<ScriptedKey> {
    let Some((key, at)) = spec.rsplit_once('@') else {
        bail!("Key spec must look like KEY@MS, got: {spec}");
    };
    if key.is_empty() {
        bail!("Key spec has an empty key: {spec}");
    }
    let at_ms: f64 = at.parse().with_context(|| format!("Invalid time in key spec: {spec}"))?;
    if !at_ms.is_finite() || at_ms < 0.0 {
        bail!("Key time must be a non-negative number: {spec}");
    }
    Ok(ScriptedKey::new(key, at_ms))
}

/// Command-line overrides applied on top of the loaded request.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub keys: Vec<ScriptedKey>,
    pub refresh_hz: Option<f64>,
    pub max_duration_ms: Option<f64>,
    pub include_frames: bool,
}

pub fn run_file(path: &Path, overrides: RunOverrides) -> Result<TrialOutput> {
    let mut request = load_request(path)?;
    request.responses.extend(overrides.keys);
    if let Some(hz) = overrides.refresh_hz {
        request.refresh_hz = hz;
    }
    if let Some(ms) = overrides.max_duration_ms {
        request.max_duration_ms = ms;
    }
    request.include_frames |= overrides.include_frames;

    let output = run_trial(&request).with_context(|| format!("Trial failed: {}", path.display()))?;
    info!(seed = output.result.config.seed, frames = output.result.frame_count, "trial finished");
    Ok(output)
}

pub fn validate_file(path: &Path) -> Result<ResolvedTrial> {
    let request = load_request(path)?;
    request
        .config
        .resolve()
        .with_context(|| format!("Invalid configuration: {}", path.display()))
}

/// Pretty-print `value` to `out`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(out: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            fs::write(path, json)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}
