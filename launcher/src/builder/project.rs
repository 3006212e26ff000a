use serde_json::{Map, Value};

use super::SectionBuilder;

/// Builds the `project` section.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfigBuilder {
    root_directory_path: Option<String>,
}

impl ProjectConfigBuilder {
    /// `None` unsets the root; resolution then requires it from elsewhere.
    pub fn root_directory_path(&mut self, path: Option<&str>) -> &mut Self {
        self.root_directory_path = path.map(str::to_string);
        self
    }
}

impl SectionBuilder for ProjectConfigBuilder {
    fn section_key(&self) -> &'static str {
        "project"
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
