//! Read options, loadable from TOML.

use serde::Deserialize;
use std::path::Path;

use crate::error::{ReadError, Result};
use crate::xer::XerParser;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadOptions {
    /// Treat unreadable values as absent instead of failing the read.
    #[serde(default = "default_true")]
    pub ignore_errors: bool,

    /// WHATWG encoding label. Windows-1252 when unset.
    #[serde(default)]
    pub encoding: Option<String>,

    /// Project to read from a multi-project export. The first one when unset.
    #[serde(default)]
    pub project_id: Option<i32>,

    #[serde(default)]
    pub raise_on_structured_text_error: bool,

    /// Prefix WBS codes with their parent's code.
    #[serde(default = "default_true")]
    pub wbs_is_full_path: bool,

    /// Copy planned values onto baselines. When unset this happens only if
    /// the project names no baseline project.
    #[serde(default)]
    pub baseline_from_current_project: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            ignore_errors: true,
            encoding: None,
            project_id: None,
            raise_on_structured_text_error: false,
            wbs_is_full_path: true,
            baseline_from_current_project: None,
        }
    }
}

impl ReadOptions {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ReadError::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReadError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// A tabular parser using the configured encoding.
    pub fn parser(&self) -> Result<XerParser> {
        match &self.encoding {
            Some(label) => XerParser::new().with_encoding_label(label),
            None => Ok(XerParser::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty() {
        let options = ReadOptions::from_toml_str("").unwrap();
        assert_eq!(options, ReadOptions::default());
        assert!(options.ignore_errors);
        assert!(options.wbs_is_full_path);
    }

    #[test]
    fn test_partial_override() {
        let options = ReadOptions::from_toml_str(
            r#"
ignore_errors = false
project_id = 42
encoding = "utf-8"
"#,
        )
        .unwrap();
        assert!(!options.ignore_errors);
        assert_eq!(options.project_id, Some(42));
        assert_eq!(options.encoding.as_deref(), Some("utf-8"));
        assert!(options.wbs_is_full_path);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ReadOptions::from_toml_str("ignore_erors = true").unwrap_err();
        assert!(matches!(err, ReadError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "baseline_from_current_project = false").unwrap();
        let options = ReadOptions::load(file.path()).unwrap();
        assert_eq!(options.baseline_from_current_project, Some(false));
    }

    #[test]
    fn test_bad_encoding_label() {
        let options = ReadOptions {
            encoding: Some("no-such-encoding".into()),
            ..Default::default()
        };
        assert!(matches!(options.parser(), Err(ReadError::UnknownEncoding(_))));
    }
}
