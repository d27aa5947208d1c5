use anyhow::{Context, Result};
use postdoc::RenderOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "postdoc.json";

/// Top-level postdoc.json schema.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostdocConfig {
    /// Limits passed to the renderer.
    #[serde(default)]
    pub render: RenderOptions,

    /// Where `batch` writes fragments, relative to the working directory.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Manifest file name inside a batch source directory.
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

impl Default for PostdocConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            out_dir: default_out_dir(),
            manifest: default_manifest(),
        }
    }
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist/fragments")
}

fn default_manifest() -> String {
    "posts.json".to_string()
}

/// Load config from `path`, or from `postdoc.json` in the working directory.
///
/// A missing default file yields defaults; an explicitly named file must exist.
pub fn load_config(path: Option<&Path>) -> Result<PostdocConfig> {
    let (config_path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(CONFIG_FILE), false),
    };

    if !explicit && !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(PostdocConfig::default());
    }

    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: PostdocConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "render": { "maxNesting": 4, "maxInputBytes": 65536 },
            "outDir": "public/posts",
            "manifest": "index.json"
        }"#;

        let config: PostdocConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.render.max_nesting, 4);
        assert_eq!(config.render.max_input_bytes, Some(65536));
        assert_eq!(config.out_dir, PathBuf::from("public/posts"));
        assert_eq!(config.manifest, "index.json");
    }

    #[test]
    fn test_partial_render_section() {
        let json = r#"{ "render": { "maxInputBytes": 10 } }"#;
        let config: PostdocConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.render.max_nesting, 16);
        assert_eq!(config.render.max_input_bytes, Some(10));
    }

    #[test]
    fn test_defaults() {
        let config: PostdocConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.render, RenderOptions::default());
        assert_eq!(config.out_dir, PathBuf::from("dist/fragments"));
        assert_eq!(config.manifest, "posts.json");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("postdoc-config-test-missing.json");
        let _ = std::fs::remove_file(&missing);
        let err = load_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("postdoc-config-test-load.json");
        std::fs::write(&path, r#"{ "outDir": "out" }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.out_dir, PathBuf::from("out"));
        let _ = std::fs::remove_file(&path);
    }
}
