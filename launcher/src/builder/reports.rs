use serde_json::{Map, Value};

use super::SectionBuilder;

/// Builds the `reports` section.
#[derive(Debug, Clone, Default)]
pub struct ReportsConfigBuilder {
    root_directory_path: Option<String>,
}

impl ReportsConfigBuilder {
    /// `None` falls back to `<project root>/reports/test`.
    pub fn root_directory_path(&mut self, path: Option<&str>) -> &mut Self {
        self.root_directory_path = path.map(str::to_string);
        self
    }
}

impl SectionBuilder for ReportsConfigBuilder {
    fn section_key(&self) -> &'static str {
        "reports"
    }

    fn build(&self) -> Value {
        let mut section = Map::new();
        if let Some(path) = &self.root_directory_path {
            section.insert("rootDirectoryPath".to_string(), Value::from(path.as_str()));
        }
        Value::Object(section)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}
