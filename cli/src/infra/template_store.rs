//! Infrastructure implementation of the `TemplateStore` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use threetier_common::Template;

use crate::application::ports::TemplateStore;

/// Default output directory for synthesized templates.
pub const DEFAULT_OUT_DIR: &str = "cdk.out";

/// Writes `<out_dir>/<stack>.template.json`.
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    out_dir: PathBuf,
}

impl FileTemplateStore {
    #[must_use]
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    #[must_use]
    pub fn template_path(&self, stack_name: &str) -> PathBuf {
        self.out_dir.join(format!("{stack_name}.template.json"))
    }
}

impl Default for FileTemplateStore {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_OUT_DIR))
    }
}

impl TemplateStore for FileTemplateStore {
    fn write_template(&self, stack_name: &str, template: &Template) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("cannot create {}", self.out_dir.display()))?;
        let path = self.template_path(stack_name);
        let mut content = template.to_json_pretty().context("cannot serialize template")?;
        content.push('\n');
        std::fs::write(&path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }

    fn read_template(&self, path: &Path) -> Result<Template> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Template::from_json(&content).with_context(|| format!("cannot parse {}", path.display()))
    }
}
