use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Callsite {
    pub file: String,
    pub line: u32,
}

/// Contents of a `<artifact>.provenance.json` sidecar.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    pub code_rev: String,
    pub callsite: Option<Callsite>,
    pub params: Value,
    pub outputs: Vec<String>,
}

impl Provenance {
    /// Provenance block for the current build with no artifact attached.
    #[track_caller]
    pub fn current(params: Value) -> Self {
        let callsite = Location::caller();
        Self {
            code_rev: current_git_rev(),
            callsite: Some(Callsite {
                file: callsite.file().to_string(),
                line: callsite.line(),
            }),
            params,
            outputs: Vec::new(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Write `<first output>.provenance.json` with the git commit, callsite, params, and outputs.
#[track_caller]
pub fn write_sidecar<T: Serialize>(outputs: &[PathBuf], params: &T) -> Result<PathBuf> {
    let artifact = outputs
        .first()
        .context("provenance needs at least one output")?;
    let provenance_path = provenance_path(artifact);
    if let Some(parent) = provenance_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating provenance dir {}", parent.display()))?;
        }
    }

    let mut doc = Provenance::current(serde_json::to_value(params)?);
    doc.outputs = outputs
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    fs::write(&provenance_path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {}", provenance_path.display()))?;
    Ok(provenance_path)
}

pub fn provenance_path(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    let mut name = stem;
    name.push(".provenance.json");
    artifact.with_file_name(name)
}

pub fn current_git_rev() -> String {
    if let Some(from_env) = option_env!("GIT_COMMIT") {
        if !from_env.is_empty() {
            return from_env.to_string();
        }
    }
    if let Ok(env_override) = std::env::var("GIT_COMMIT") {
        if !env_override.is_empty() {
            return env_override;
        }
    }
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Params {
        seed: u64,
        samples: usize,
    }

    #[test]
    fn provenance_path_rewrites_extension() {
        let base = Path::new("/tmp/output/poses2.txt");
        let derived = provenance_path(base);
        assert_eq!(derived, Path::new("/tmp/output/poses2.provenance.json"));
    }

    #[test]
    fn write_sidecar_round_trips() {
        let dir = tempdir().unwrap();
        let poses = dir.path().join("poses2.txt");
        let configs = dir.path().join("configurations2.txt");
        let prov_path = write_sidecar(&[poses.clone(), configs], &Params { seed: 7, samples: 300 }).unwrap();
        assert!(prov_path.exists());
        let parsed = Provenance::read(&prov_path).unwrap();
        assert_eq!(parsed.outputs.len(), 2);
        assert_eq!(parsed.outputs[0], poses.to_string_lossy());
        assert_eq!(parsed.params, json!({"seed": 7, "samples": 300}));
        assert!(parsed.callsite.unwrap().file.ends_with("provenance.rs"));
    }

    #[test]
    fn sidecar_needs_an_output() {
        assert!(write_sidecar(&[], &json!({})).is_err());
    }
}
