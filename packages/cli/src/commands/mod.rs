pub mod check;
pub mod fmt;
pub mod init;
pub mod render;

pub use check::{check, CheckArgs};
pub use fmt::{fmt, FmtArgs};
pub use init::{init, InitArgs};
pub use render::{render, RenderArgs};

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MARKUP_EXTENSIONS: &[&str] = &["html", "htm"];

/// Expand a file or directory argument into the markup files it names
pub(crate) fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let is_markup = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| MARKUP_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_markup && !is_rendered_output(path) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Files written by `folio render` are never inputs
pub(crate) fn is_rendered_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.ends_with(".rendered"))
        .unwrap_or(false)
}
