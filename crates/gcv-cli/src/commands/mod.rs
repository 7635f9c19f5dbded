pub mod batch;
pub mod compare;
pub mod config;
pub mod envelope;

use anyhow::{Context, Result};
use gcv_core::ValidationConfig;
use std::path::Path;

/// Configuration from `path`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => ValidationConfig::load_from(path)
            .with_context(|| format!("loading configuration '{}'", path.display())),
        None => Ok(ValidationConfig::default()),
    }
}

/// Write `text` to `out`, or stdout when absent.
pub fn emit(text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory '{}'", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("writing '{}'", path.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
