use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::SynthesisResult;

/// Get the default directory for storing synthesis results
pub fn get_default_results_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join("trend-synthesizer")
        .join("results");

    fs::create_dir_all(&data_dir).context("Failed to create results directory")?;

    Ok(data_dir)
}

/// Save a synthesis result to a JSON file
pub fn save_result(result: &SynthesisResult, filename: &str) -> Result<PathBuf> {
    save_result_in(&get_default_results_dir()?, result, filename)
}

fn save_result_in(dir: &Path, result: &SynthesisResult, filename: &str) -> Result<PathBuf> {
    let filepath = dir.join(filename);

    let json =
        serde_json::to_string_pretty(result).context("Failed to serialize synthesis result")?;

    fs::write(&filepath, json).context("Failed to write result file")?;

    Ok(filepath)
}

/// Load a synthesis result from a JSON file
pub fn load_result(filepath: &Path) -> Result<SynthesisResult> {
    if !filepath.exists() {
        anyhow::bail!("Result file not found: {}", filepath.display());
    }

    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read result file: {}", filepath.display()))?;

    let result: SynthesisResult = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse result JSON from {}. The file may be corrupted or not a valid result file.",
            filepath.display()
        )
    })?;

    Ok(result)
}

/// List all saved result files, newest first
pub fn list_result_files() -> Result<Vec<(PathBuf, SynthesisResult)>> {
    list_result_files_in(&get_default_results_dir()?)
}

fn list_result_files_in(dir: &Path) -> Result<Vec<(PathBuf, SynthesisResult)>> {
    let mut files = Vec::new();

    if dir.exists() {
        for entry in fs::read_dir(dir).context("Failed to read results directory")? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                match load_result(&path) {
                    Ok(result) => {
                        files.push((path, result));
                    }
                    Err(e) => {
                        eprintln!("Warning: Could not load {}: {}", path.display(), e);
                    }
                }
            }
        }
    }

    files.sort_by(|a, b| b.1.generated_at.cmp(&a.1.generated_at));

    Ok(files)
}
