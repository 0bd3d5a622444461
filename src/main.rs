use anyhow::{Context, Result};
use ssed::cli::{self, Args, ConfigAction, OutputMode};
use ssed::config::{self, ColorMode, Config};
use ssed::editor;
use ssed::input::InputSource;
use ssed::logger;
use ssed::preview::{self, PreviewFormatter};
use ssed::{Command, ExecError, Executor};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

const STDIN_NAME: &str = "stdin";

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    match args {
        Args::Execute {
            query,
            files,
            mode,
            context,
            backup,
            quiet,
            explain,
            verbose,
        } => {
            let config = config::load_config()?;
            config::validate_config(&config)?;
            let _log_guard = logger::init_logging(&config.logging, verbose)?;

            let command = ssed::parse(&query);
            if explain {
                println!("{}", serde_json::to_string_pretty(&command)?);
            }
            let command = command.into_result()?;
            if explain {
                return Ok(());
            }

            let run = Run {
                command: &command,
                executor: Executor::new(config.exec_options()),
                config: &config,
                context,
                backup: backup.as_deref(),
                quiet,
            };
            run.execute(&files, mode)?;
        }
        Args::Examples => {
            print!("{}", cli::EXAMPLES);
        }
        Args::Config { action } => {
            config_command(action)?;
        }
    }

    Ok(())
}

/// One query applied to every input
struct Run<'a> {
    command: &'a Command,
    executor: Executor,
    config: &'a Config,
    context: Option<usize>,
    backup: Option<&'a str>,
    quiet: bool,
}

impl Run<'_> {
    fn execute(&self, files: &[String], mode: OutputMode) -> Result<()> {
        tracing::debug!(kind = %self.command.kind(), ?mode, inputs = files.len(), "running query");

        if files.is_empty() {
            return match mode {
                OutputMode::Stdout | OutputMode::InPlace => self.to_stdout(InputSource::stdin()),
                OutputMode::Preview | OutputMode::Diff => {
                    self.preview(STDIN_NAME, InputSource::stdin(), mode)
                }
            };
        }

        for file in files {
            let path = Path::new(file);
            match mode {
                OutputMode::Stdout => {
                    let source = InputSource::open(path, self.config.mmap_threshold_bytes())?;
                    self.to_stdout(source)?;
                }
                OutputMode::Preview | OutputMode::Diff => {
                    let source = InputSource::open(path, self.config.mmap_threshold_bytes())?;
                    self.preview(file, source, mode)?;
                }
                OutputMode::InPlace => self.in_place(path)?,
            }
        }

        Ok(())
    }

    fn to_stdout(&self, source: InputSource) -> Result<()> {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());

        let result = self
            .executor
            .execute(self.command, source, &mut out)
            .map_err(anyhow::Error::from)
            .and_then(|()| out.flush().context("Failed to write output"));

        match result {
            // `ssed ... | head` closing the pipe early is not an error
            Err(e) if is_stdout_closed(&e) => Ok(()),
            other => other,
        }
    }

    fn preview(&self, name: &str, mut source: InputSource, mode: OutputMode) -> Result<()> {
        let mut original = Vec::new();
        source
            .read_to_end(&mut original)
            .with_context(|| format!("Failed to read {name}"))?;

        let mut transformed = Vec::with_capacity(original.len());
        self.executor
            .execute(self.command, original.as_slice(), &mut transformed)
            .with_context(|| format!("Failed to process {name}"))?;

        let formatter = PreviewFormatter::new(
            use_color(self.config.output.color),
            self.context.unwrap_or(self.config.output.context_lines),
        );

        let transformed = String::from_utf8_lossy(&transformed);
        let rendered = if mode == OutputMode::Diff {
            formatter.format_diff(name, &String::from_utf8_lossy(&original), &transformed)
        } else {
            formatter.format_preview(name, &transformed)
        };

        print!("{rendered}");
        Ok(())
    }

    fn in_place(&self, path: &Path) -> Result<()> {
        let outcome = editor::edit_in_place(path, self.command, &self.executor, self.backup)?;

        if !self.quiet {
            if let Some(backup) = &outcome.backup {
                eprintln!("Backup created: {}", backup.display());
            }
            eprintln!("Modified: {}", outcome.path.display());
        }
        tracing::debug!(path = %outcome.path.display(), changed = outcome.changed, "edited in place");

        Ok(())
    }
}

fn use_color(mode: ColorMode) -> bool {
    let enabled = preview::should_use_color(mode);
    if mode == ColorMode::Always {
        colored::control::set_override(true);
    }
    enabled
}

fn is_stdout_closed(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| match cause.downcast_ref::<ExecError>() {
        Some(ExecError::Io(e)) => e.kind() == io::ErrorKind::BrokenPipe,
        Some(_) => false,
        None => cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe),
    })
}

fn config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config_path = config::config_file_path()?;
            let config = config::load_config_from(&config_path)?;
            config::validate_config(&config)?;

            if config_path.exists() {
                println!("# {}", config_path.display());
            } else {
                println!("# {} (not found, showing defaults)", config_path.display());
            }
            print!("{}", config::to_toml(&config)?);
        }
        ConfigAction::Init => {
            let path = config::save_default_config()?;
            println!("Created config file: {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", config::config_file_path()?.display());
        }
    }

    Ok(())
}
