use super::collect_inputs;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::Editor;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct FmtArgs {
    /// Markup file or directory to normalize
    pub input: PathBuf,

    /// Report files that would change without writing them
    #[arg(long)]
    pub check: bool,

    /// Print the normalized markup instead of writing it back
    #[arg(long)]
    pub stdout: bool,
}

/// Markup as the editor would store it
#[derive(Debug)]
pub struct Formatted {
    pub output: String,
    /// Recoveries the parser had to make
    pub recoveries: usize,
}

pub fn format_source(source: &str, config: &Config) -> Formatted {
    let mut editor = Editor::new(config.editor_config());
    let recoveries = editor.set_markup(source).len();

    let mut output = editor.get_markup();
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Formatted { output, recoveries }
}

pub fn fmt(args: FmtArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let files = collect_inputs(&args.input)?;

    let mut changed = 0;
    for file in &files {
        let source = fs::read_to_string(file)?;
        let formatted = format_source(&source, &config);

        if args.stdout {
            print!("{}", formatted.output);
            continue;
        }

        if formatted.output == source {
            tracing::debug!(file = %file.display(), "Already formatted");
            continue;
        }
        changed += 1;

        if formatted.recoveries > 0 {
            println!(
                "  {} {} needed {} recoveries, run `folio check` for details",
                "⚠️".yellow(),
                file.display(),
                formatted.recoveries
            );
        }

        if args.check {
            println!("  {} {}", "✗".red(), file.display());
        } else {
            fs::write(file, &formatted.output)?;
            println!("  {} {}", "✓".green(), file.display());
        }
    }

    if args.stdout {
        return Ok(());
    }

    if args.check && changed > 0 {
        return Err(anyhow!("{} of {} files need formatting", changed, files.len()));
    }

    println!();
    println!(
        "✨ {} {} files, {} changed",
        "Formatted".green().bold(),
        files.len(),
        changed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_is_idempotent() {
        let config = Config::default();
        let first = format_source("loose <b>text</b><ul><li>a<li>b</ul>", &config);
        assert!(first.recoveries > 0);

        let second = format_source(&first.output, &config);
        assert_eq!(second.output, first.output);
        assert_eq!(second.recoveries, 0);
    }

    #[test]
    fn test_check_leaves_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("post.html");
        fs::write(&file, "<p>a<b>b</b>").unwrap();

        let result = fmt(
            FmtArgs {
                input: file.clone(),
                check: true,
                stdout: false,
            },
            dir.path(),
        );
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), "<p>a<b>b</b>");
    }

    #[test]
    fn test_fmt_writes_normalized_markup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("post.html");
        fs::write(&file, "<p>a<b>b</b>").unwrap();

        fmt(
            FmtArgs {
                input: file.clone(),
                check: false,
                stdout: false,
            },
            dir.path(),
        )
        .unwrap();

        let written = fs::read_to_string(&file).unwrap();
        assert!(written.contains("<strong>b</strong>") || written.contains("<b>b</b>"));
        assert_eq!(format_source(&written, &Config::default()).output, written);
    }
}
