use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FlowdocError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Source discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Base directory for module path resolution; defaults to the input
    /// directory (or the file's parent for single-file input)
    pub src_root: Option<PathBuf>,

    /// Directory names to skip during discovery, in addition to the defaults
    pub exclude: Vec<String>,

    /// Whether docstring capture is attempted during extraction
    pub include_docstrings: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            src_root: None,
            exclude: Vec::new(),
            include_docstrings: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (mermaid, dot, png, svg, pdf, html, json)
    pub format: String,

    /// Layout direction: TB or LR
    pub direction: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "mermaid".to_string(),
            direction: "TB".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| FlowdocError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = ["Flowdoc.toml", "flowdoc.toml", ".flowdoc.toml"];
                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.output.format, "mermaid");
        assert_eq!(config.output.direction, "TB");
        assert!(config.discovery.include_docstrings);
        assert!(config.discovery.exclude.is_empty());
    }

    #[test]
    fn loads_partial_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Flowdoc.toml");
        fs::write(
            &path,
            "[output]\nformat = \"dot\"\n\n[discovery]\nexclude = [\"migrations\"]\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.output.format, "dot");
        assert_eq!(config.output.direction, "TB");
        assert_eq!(config.discovery.exclude, vec!["migrations".to_string()]);
    }

    #[test]
    fn missing_path_falls_back_to_default() {
        let config = Config::load_or_default(Some("/nonexistent/Flowdoc.toml")).unwrap();
        assert_eq!(config.output.format, "mermaid");
    }
}
