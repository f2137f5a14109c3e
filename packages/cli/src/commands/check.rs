use super::collect_inputs;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_markup::{format_errors, parse_with_diagnostics};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Markup file or directory to check
    pub input: PathBuf,

    /// List clean files as well
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn check(args: CheckArgs, _cwd: &Path) -> Result<()> {
    println!("🔍 {} markup", "Checking".green().bold());
    println!("   Input: {}", args.input.display());
    println!();

    let files = collect_inputs(&args.input)?;
    let mut total_recoveries = 0;
    let mut files_with_recoveries = 0;

    for file in &files {
        let source = fs::read_to_string(file)?;
        let parsed = parse_with_diagnostics(&source);

        if parsed.is_lossless() {
            if args.verbose {
                println!("{} {}", "✓".green(), file.display());
            }
            continue;
        }

        files_with_recoveries += 1;
        total_recoveries += parsed.errors.len();
        println!("{} {}", "✗".red(), file.display());
        eprint!(
            "{}",
            format_errors(&source, &file.to_string_lossy(), &parsed.errors)
        );
    }

    println!();
    println!("   Files checked: {}", files.len());

    if total_recoveries > 0 {
        return Err(anyhow!(
            "{} recoveries in {} files; the stored markup would not match the source",
            total_recoveries,
            files_with_recoveries
        ));
    }

    println!("   {} No issues found!", "✓".green());
    Ok(())
}
