//! Programmatic options stored as a TOML file.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::config::LaunchOptions;
use crate::error::ConfigError;

/// Load an options document from TOML. Validation happens at `configure`.
pub fn load_options(path: &Path) -> Result<LaunchOptions, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded options file");
    Ok(LaunchOptions::from_document(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_reads_toml_into_options_document() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("launcher.toml");
        fs::write(
            &path,
            r#"
developerMode = false

[project]
rootDirectoryPath = "/repo"

[test]
type = "unit"

[test.reports]
html = false

[coverage]
enabled = true
excludes = ["**/fixtures/**"]
"#,
        )
        .expect("write");

        let options = load_options(&path).expect("load");
        assert_eq!(options.document["project"]["rootDirectoryPath"], json!("/repo"));
        assert_eq!(options.document["test"]["reports"]["html"], json!(false));
        assert_eq!(options.document["coverage"]["excludes"], json!(["**/fixtures/**"]));
        assert!(options.steps.is_empty());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_options(&temp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "{err}");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("broken.toml");
        fs::write(&path, "[project\nrootDirectoryPath = ").expect("write");
        let err = load_options(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }
}
