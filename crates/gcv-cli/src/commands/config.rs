use anyhow::{Context, Result};
use gcv_core::ValidationConfig;
use std::path::Path;

use super::emit;

pub fn handle(out: Option<&Path>) -> Result<()> {
    let text = ValidationConfig::default()
        .to_toml_string()
        .context("rendering default configuration")?;
    emit(&text, out)
}
