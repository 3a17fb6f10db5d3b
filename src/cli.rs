use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate, generate_to};
use salesview::AssembleOptions;

pub const DEFAULT_JSON_PATH: &str = "data/output/views.json";
pub const DEFAULT_CSV_PATH: &str = "data/output/tables.csv";

pub const PAYLOAD_HELP: &str =
    "Dashboard payload as returned by the analytics service (a JSON object with one key per widget).";
pub const OPTIONS_HELP: &str = "JSON file with assemble options (labelMaxLength, topCount, colorCycle, currency). Unknown keys are ignored; command-line flags take precedence.";
pub const SAVE_JSON_HELP: &str = "Save every compiled view model to the given JSON file (defaults to data/output/views.json when no path is provided). Use --archive to store a .gz instead.";
pub const SAVE_CSV_HELP: &str = "Save the table views as long-format CSV (defaults to data/output/tables.csv when no path is provided). Use --archive to store a .gz instead.";
pub const ARCHIVE_HELP: &str = "Gzip saved outputs and append .gz to their file names.";

#[derive(Debug, Parser)]
#[command(
    name = "salesview",
    about = "Compile a weekly/monthly sales comparison payload into chart and table view models.",
    version = env!("CARGO_PKG_VERSION"),
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[arg(value_name = "PAYLOAD", help = PAYLOAD_HELP)]
    pub payload: Option<PathBuf>,
    #[arg(long, value_name = "FILE", help = OPTIONS_HELP)]
    pub options: Option<PathBuf>,
    #[arg(
        long,
        value_name = "CHARS",
        help = "Truncate chart labels longer than this many characters (0 disables truncation)."
    )]
    pub label_max_length: Option<usize>,
    #[arg(
        long,
        value_name = "N",
        help = "Rows kept in ranked charts and tables (0 keeps every row)."
    )]
    pub top_count: Option<usize>,
    #[arg(
        long,
        overrides_with = "no_currency",
        help = "Render monetary columns with a currency symbol (default)."
    )]
    pub currency: bool,
    #[arg(
        long,
        overrides_with = "currency",
        help = "Render monetary columns as plain numbers."
    )]
    pub no_currency: bool,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_JSON_PATH,
        help = SAVE_JSON_HELP
    )]
    pub save_json: Option<PathBuf>,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_CSV_PATH,
        help = SAVE_CSV_HELP
    )]
    pub save_csv: Option<PathBuf>,
    #[arg(long, help = ARCHIVE_HELP)]
    pub archive: bool,
    #[arg(
        long,
        help = "Print every table view with all rows and columns instead of the abbreviated summary."
    )]
    pub full_output: bool,
    #[arg(long, help = "Disable progress spinner output.")]
    pub no_progress: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// `Some` only when one of the currency flags was given.
    pub const fn currency_override(&self) -> Option<bool> {
        if self.no_currency {
            Some(false)
        } else if self.currency {
            Some(true)
        } else {
            None
        }
    }

    /// Command-line flags win over whatever the options file set.
    pub fn apply_overrides(&self, options: &mut AssembleOptions) {
        if let Some(length) = self.label_max_length {
            options.label_max_length = length;
        }
        if let Some(count) = self.top_count {
            options.top_count = count;
        }
        if let Some(currency) = self.currency_override() {
            options.currency = currency;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate shell completion scripts, optionally installing them for the current user.
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for.")]
        shell: Shell,
        #[arg(
            long,
            value_name = "DIR",
            help = "Directory to write the completion script to."
        )]
        output_dir: Option<PathBuf>,
        #[arg(
            long,
            help = "Install the completion script into the default location for the selected shell."
        )]
        install: bool,
    },
}

pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Completions {
            shell,
            output_dir,
            install,
        } => write_completions(shell, output_dir, install),
    }
}

fn write_completions(shell: Shell, output_dir: Option<PathBuf>, install: bool) -> Result<()> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    let target_dir = match (output_dir, install) {
        (Some(dir), _) => Some(dir),
        (None, true) => Some(completion_dir(shell)?),
        (None, false) => None,
    };

    let Some(dir) = target_dir else {
        let mut stdout = io::stdout().lock();
        generate(shell, &mut command, bin_name, &mut stdout);
        return stdout
            .flush()
            .context("failed to flush completion output");
    };

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create completion directory {}", dir.display()))?;
    let path = generate_to(shell, &mut command, bin_name, &dir)
        .context("failed to write completion file")?;
    println!("Installed {shell:?} completions to {}", path.display());
    Ok(())
}

fn completion_dir(shell: Shell) -> Result<PathBuf> {
    let relative = match shell {
        Shell::Bash => ".local/share/bash-completion/completions",
        Shell::Elvish => ".elvish/lib/completions",
        Shell::Fish => ".config/fish/completions",
        Shell::PowerShell => ".local/share/powershell/Scripts",
        Shell::Zsh => ".local/share/zsh/site-functions",
        other => {
            return Err(anyhow!(
                "no default install location for {other:?}; specify --output-dir"
            ));
        }
    };
    let home = std::env::var_os("HOME").ok_or_else(|| {
        anyhow!("HOME environment variable is not set; use --output-dir to specify a path")
    })?;
    Ok(PathBuf::from(home).join(relative))
}
