//! Preview rendering
//!
//! `--preview` shows what a query would produce for each file without
//! touching it. `--diff` narrows that to a unified diff against the original
//! with a configurable number of context lines.

use colored::*;
use similar::{ChangeTag, TextDiff};
use std::io::IsTerminal;

use crate::config::ColorMode;

pub struct PreviewFormatter {
    use_color: bool,
    context_lines: usize,
}

/// Decide whether stdout output should be colored
pub fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        // https://no-color.org/
        ColorMode::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
    }
}

impl PreviewFormatter {
    pub fn new(use_color: bool, context_lines: usize) -> Self {
        Self {
            use_color,
            context_lines,
        }
    }

    /// Whole transformed output between preview markers
    pub fn format_preview(&self, name: &str, output: &str) -> String {
        let mut rendered = String::new();

        let header = format!("=== Preview for {name} ===");
        if self.use_color {
            rendered.push_str(&format!("{}\n", header.bold().cyan()));
        } else {
            rendered.push_str(&format!("{header}\n"));
        }

        rendered.push_str(output);
        if !output.is_empty() && !output.ends_with('\n') {
            rendered.push('\n');
        }

        let footer = "=== End preview (no changes made) ===";
        if self.use_color {
            rendered.push_str(&format!("{}\n", footer.dimmed()));
        } else {
            rendered.push_str(&format!("{footer}\n"));
        }

        rendered
    }

    /// Unified diff of `original` against `transformed`
    pub fn format_diff(&self, name: &str, original: &str, transformed: &str) -> String {
        let diff = TextDiff::from_lines(original, transformed);
        let mut rendered = String::new();

        if self.use_color {
            rendered.push_str(&format!("{}\n", format!("--- {name}").red().bold()));
            rendered.push_str(&format!("{}\n", format!("+++ {name} (preview)").green().bold()));
        } else {
            rendered.push_str(&format!("--- {name}\n+++ {name} (preview)\n"));
        }

        let mut added = 0usize;
        let mut deleted = 0usize;

        let mut unified = diff.unified_diff();
        unified.context_radius(self.context_lines);

        for hunk in unified.iter_hunks() {
            let header = hunk.header().to_string();
            if self.use_color {
                rendered.push_str(&format!("{}\n", header.cyan()));
            } else {
                rendered.push_str(&format!("{header}\n"));
            }

            for change in hunk.iter_changes() {
                let content = change.value().trim_end_matches('\n');
                let (sign, line) = match change.tag() {
                    ChangeTag::Delete => {
                        deleted += 1;
                        ("-", content)
                    }
                    ChangeTag::Insert => {
                        added += 1;
                        ("+", content)
                    }
                    ChangeTag::Equal => (" ", content),
                };

                if self.use_color {
                    let colored_line = match change.tag() {
                        ChangeTag::Delete => format!("{}{}", sign.red().bold(), line.red()),
                        ChangeTag::Insert => format!("{}{}", sign.green().bold(), line.green()),
                        ChangeTag::Equal => format!("{}{}", sign, line.dimmed()),
                    };
                    rendered.push_str(&colored_line);
                } else {
                    rendered.push_str(sign);
                    rendered.push_str(line);
                }
                rendered.push('\n');
            }
        }

        // Summary
        if added == 0 && deleted == 0 {
            rendered.push_str("No changes.\n");
        } else if self.use_color {
            rendered.push_str(&format!(
                "\nTotal: {} added, {} deleted\n",
                added.to_string().green().bold(),
                deleted.to_string().red().bold()
            ));
        } else {
            rendered.push_str(&format!("\nTotal: {added} added, {deleted} deleted\n"));
        }

        rendered
    }
}
