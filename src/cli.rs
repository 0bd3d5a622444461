use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

/// Printed by `ssed examples`
pub const EXAMPLES: &str = "ssed usage examples
===================

Replace text:
  ssed 'replace hello with hi' greeting.txt
  ssed 'replace /[0-9]+/ with N' < input.txt
  echo 'hello world' | ssed 'replace world with rust'

Delete lines:
  ssed 'delete error' app.log
  ssed 'delete lines starting with #' config.ini
  ssed 'delete lines 1 to 5' data.csv

Show/filter lines:
  ssed 'show error' app.log
  ssed 'show lines containing whole word TODO' src/main.rs
  ssed 'show first 10' big.log
  ssed 'show line numbers' notes.txt

Insert text:
  ssed 'insert header before title' doc.txt
  ssed 'insert footer last' README.md

Transform and count:
  ssed 'convert to titlecase' names.txt
  ssed 'remove trailing whitespace' code.txt
  ssed 'count /^ERROR/' app.log

Chain commands:
  ssed 'show lines containing ERROR then replace ERROR with E then show last 5' app.log

Options:
  ssed 'replace foo with bar' file.txt --preview       # Preview changes
  ssed 'replace foo with bar' file.txt --diff          # Preview as a diff
  ssed 'replace foo with bar' file.txt -i              # Edit in place
  ssed 'replace foo with bar' file.txt -i --backup .bak  # With backup
  ssed --explain 'show lines not ending with ;'        # Print the parsed query
";

#[derive(Parser, Debug)]
#[command(name = "ssed")]
#[command(about = "Stream text through English-like editing queries")]
#[command(long_about = "ssed edits text with queries that read like English.

A query is one command, or several joined with 'then'. Each command reads
lines and writes lines; chained commands run concurrently, each feeding the
next.

COMMANDS:
  replace <pattern> with <text>        Replace every occurrence on every line
  delete <selection>                   Drop the selected lines
  show <selection>                     Keep only the selected lines
  show line numbers                    Prefix each line with its number
  insert <text> before|after <ref>     Add a line around matching lines
  insert <text> first|last             Add a line at the start or end
  convert to uppercase|lowercase|titlecase
  trim [whitespace]                    Strip both ends of each line
  remove leading|trailing [spaces]     Strip one end of each line
  count <pattern>                      Print the number of matching lines

SELECTIONS:
  first N / last N                     Head or tail of the input
  line N / lines N to M                Line numbers (1-based, inclusive)
  lines [not] starting with <p>        Prefix match
  lines [not] ending with <p>          Suffix match
  lines [not] containing [whole word] <p>
  <p>                                  Lines containing <p>

Patterns are bare words, quoted strings ('...' or \"...\"), or /regex/.

STDIN/STDOUT:
  When no files are given, ssed reads stdin and writes stdout.

EXAMPLES:
  ssed 'replace foo with bar' file.txt
  cat app.log | ssed 'show lines containing ERROR then show last 20'
  ssed 'delete /^\\s*#/' config.ini
  ssed -i --backup .bak 'remove trailing whitespace' *.txt
  ssed --preview --diff 'convert to uppercase' notes.md
  ssed --explain 'show lines not starting with #'")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Query to execute (e.g., 'replace foo with bar', 'show first 10')
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// Files to process
    #[arg(value_name = "FILE")]
    files: Vec<String>,

    /// Preview the result for each input without writing anything
    #[arg(short = 'p', long)]
    preview: bool,

    /// Show a diff against the original instead of the full output
    #[arg(long, help = "Show a line diff against the original\nImplies --preview")]
    diff: bool,

    /// Number of context lines around diff hunks
    #[arg(short = 'C', long, value_name = "NUM")]
    context: Option<usize>,

    /// Edit files in place
    #[arg(short = 'i', long = "in-place")]
    in_place: bool,

    /// Backup suffix for in-place edits
    #[arg(short = 'b', long, value_name = "SUFFIX", requires = "in_place")]
    #[arg(help = "Copy each file to <FILE><SUFFIX> before editing\nRequires --in-place")]
    backup: Option<String>,

    /// Suppress Modified/Backup notices
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Print the parsed query as JSON and exit
    #[arg(long)]
    explain: bool,

    /// Debug logging to stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show usage examples
    Examples,

    /// Inspect or create the configuration file
    #[command(long_about = "Inspect or create the configuration file.

The configuration lives at ~/.ssed/config.toml. Every setting is optional.

CONFIGURATION OPTIONS:
  [processing]
    max_line_bytes = 10485760     # Longest accepted input line
    handoff_capacity = 4          # Buffered chunks between chained commands
    mmap_threshold_kb = 1024      # Memory-map files at least this large

  [output]
    color = \"auto\"                # auto, always, or never
    context_lines = 3             # Context lines in --diff output

  [logging]
    debug = false                 # Also write logs to ~/.ssed/ssed.log
    level = \"warn\"                # error, warn, info, debug, or trace

EXAMPLES:
  ssed config --show              Show the effective configuration
  ssed config --init              Write a default config file
  ssed config --path              Print the config file location")]
    Config {
        /// Show the effective configuration
        #[arg(long, conflicts_with_all = ["init", "path"])]
        show: bool,

        /// Write a default configuration file
        #[arg(long, conflicts_with = "path")]
        init: bool,

        /// Print the configuration file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Write results to stdout
    Stdout,
    /// Print framed results, touch nothing
    Preview,
    /// Print a diff against the input, touch nothing
    Diff,
    /// Rewrite the files
    InPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    Show,
    Init,
    Path,
}

#[derive(Debug)]
pub enum Args {
    Execute {
        query: String,
        files: Vec<String>,
        mode: OutputMode,
        context: Option<usize>,
        backup: Option<String>,
        quiet: bool,
        explain: bool,
        verbose: bool,
    },
    Examples,
    Config {
        action: ConfigAction,
    },
}

pub fn parse_args() -> Result<Args> {
    into_args(Cli::parse())
}

fn into_args(cli: Cli) -> Result<Args> {
    match cli.command {
        Some(Commands::Examples) => Ok(Args::Examples),
        Some(Commands::Config { show, init, path }) => {
            // Plain `ssed config` shows the configuration
            let action = if show || !(init || path) {
                ConfigAction::Show
            } else if init {
                ConfigAction::Init
            } else {
                ConfigAction::Path
            };
            Ok(Args::Config { action })
        }
        None => {
            let query = cli
                .query
                .context("Missing query. Usage: ssed 'replace old with new' file.txt")?;

            // Preview never writes, so it wins over --in-place
            let mode = if cli.diff {
                OutputMode::Diff
            } else if cli.preview {
                OutputMode::Preview
            } else if cli.in_place {
                OutputMode::InPlace
            } else {
                OutputMode::Stdout
            };

            if mode == OutputMode::InPlace && cli.files.is_empty() {
                anyhow::bail!("--in-place needs at least one file");
            }

            Ok(Args::Execute {
                query,
                files: cli.files,
                mode,
                context: cli.context,
                backup: cli.backup,
                quiet: cli.quiet,
                explain: cli.explain,
                verbose: cli.verbose,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Result<Args> {
        let cli = Cli::try_parse_from(argv)?;
        into_args(cli)
    }

    #[test]
    fn test_query_and_files() {
        match args(&["ssed", "replace a with b", "x.txt", "y.txt"]).unwrap() {
            Args::Execute {
                query, files, mode, ..
            } => {
                assert_eq!(query, "replace a with b");
                assert_eq!(files, vec!["x.txt", "y.txt"]);
                assert_eq!(mode, OutputMode::Stdout);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_preview_wins_over_in_place() {
        match args(&["ssed", "-i", "-p", "trim", "x.txt"]).unwrap() {
            Args::Execute { mode, .. } => assert_eq!(mode, OutputMode::Preview),
            other => panic!("unexpected {other:?}"),
        }
        match args(&["ssed", "-i", "--diff", "trim", "x.txt"]).unwrap() {
            Args::Execute { mode, .. } => assert_eq!(mode, OutputMode::Diff),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_backup_requires_in_place() {
        assert!(args(&["ssed", "--backup", ".bak", "trim", "x.txt"]).is_err());

        match args(&["ssed", "-i", "-b", ".bak", "trim", "x.txt"]).unwrap() {
            Args::Execute { mode, backup, .. } => {
                assert_eq!(mode, OutputMode::InPlace);
                assert_eq!(backup.as_deref(), Some(".bak"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_in_place_needs_files() {
        let err = args(&["ssed", "-i", "trim"]).unwrap_err();
        assert!(err.to_string().contains("--in-place"));
    }

    #[test]
    fn test_missing_query() {
        let err = args(&["ssed"]).unwrap_err();
        assert!(err.to_string().contains("Missing query"));
    }

    #[test]
    fn test_examples_text() {
        assert!(EXAMPLES.contains("Replace text:"));
        for line in EXAMPLES.lines().filter(|l| l.trim_start().starts_with("ssed '")) {
            let query = line.split('\'').nth(1).unwrap();
            assert!(!crate::parser::parse(query).is_illegal(), "{query}");
        }
    }

    #[test]
    fn test_subcommands() {
        assert!(matches!(args(&["ssed", "examples"]).unwrap(), Args::Examples));
        assert!(matches!(
            args(&["ssed", "config"]).unwrap(),
            Args::Config {
                action: ConfigAction::Show
            }
        ));
        assert!(matches!(
            args(&["ssed", "config", "--init"]).unwrap(),
            Args::Config {
                action: ConfigAction::Init
            }
        ));
        assert!(matches!(
            args(&["ssed", "config", "--path"]).unwrap(),
            Args::Config {
                action: ConfigAction::Path
            }
        ));
    }

    #[test]
    fn test_explain_and_verbose_flags() {
        match args(&["ssed", "--explain", "-v", "-q", "count x"]).unwrap() {
            Args::Execute {
                explain,
                verbose,
                quiet,
                files,
                ..
            } => {
                assert!(explain && verbose && quiet);
                assert!(files.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
