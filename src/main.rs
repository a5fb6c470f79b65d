use airtrain_patcher::patcher::{plan, PatchOutcome};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "airtrain-patcher")]
#[command(about = "Patch airtrain so AIRTRAIN_TELEMETRY_ENABLED=false disables telemetry", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the virtualenv whose airtrain install should be patched
    venv_dir: PathBuf,

    /// Dry run - show what would be changed without modifying the file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,
}

fn main() -> ExitCode {
    // Usage errors exit 1 (help and version still exit 0).
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
            let _ = err.print();
            return code;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let plan = match plan(&cli.venv_dir)? {
        Some(plan) => plan,
        None => {
            println!(
                "{}",
                format!(
                    "airtrain is not installed under {}; nothing to patch",
                    cli.venv_dir.display()
                )
                .dimmed()
            );
            return Ok(());
        }
    };

    if plan.is_noop() {
        println!(
            "{} {}: Already patched (no changes needed)",
            "⊙".yellow(),
            plan.file.display()
        );
        return Ok(());
    }

    if cli.diff {
        display_diff(&plan.file, &plan.original, &plan.updated);
    }

    if cli.dry_run {
        println!(
            "{} {}: Would patch (dry run)",
            "✓".green(),
            plan.file.display()
        );
        return Ok(());
    }

    match plan.apply()? {
        PatchOutcome::Patched { file } => {
            println!("{} {}: Patched", "✓".green(), file.display());
        }
        PatchOutcome::Unchanged { file } | PatchOutcome::NotInstalled { file } => {
            println!("{} {}: No changes written", "⊙".yellow(), file.display());
        }
    }

    Ok(())
}

/// Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
