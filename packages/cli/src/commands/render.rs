use super::collect_inputs;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_render::{apply_alignment, parse_fragment, print, AlignmentPass, PassReport};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Markup file or directory to render
    pub input: PathBuf,

    /// Print the rendered markup instead of writing `<name>.rendered.html`
    #[arg(long)]
    pub stdout: bool,
}

/// Align images inside content containers. A file without any container is
/// treated as the content of one.
pub fn render_source(source: &str, pass: &AlignmentPass) -> (String, PassReport) {
    let mut nodes = parse_fragment(source);
    let mut report = pass.apply(&mut nodes);
    if report.containers == 0 {
        report = apply_alignment(&mut nodes);
    }
    (print(&nodes), report)
}

pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}.rendered.html"))
}

pub fn render(args: RenderArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let pass = AlignmentPass::new(config.content_class);
    let files = collect_inputs(&args.input)?;

    let mut images = 0;
    for file in &files {
        let source = fs::read_to_string(file)?;
        let (rendered, report) = render_source(&source, &pass);
        images += report.images;

        if args.stdout {
            print!("{rendered}");
            continue;
        }

        let output = output_path(file);
        fs::write(&output, rendered)?;
        println!(
            "  {} {} → {} ({} images, {} restyled)",
            "✓".green(),
            file.display(),
            output.display(),
            report.images,
            report.restyled
        );
    }

    if !args.stdout {
        println!();
        println!(
            "✨ {} {} files, {} images aligned",
            "Rendered".green().bold(),
            files.len(),
            images
        );
    }
    Ok(())
}
