//! Command execution over byte streams
//!
//! Every command reads its input line by line and writes transformed lines
//! to its output. Only `insert` holds the whole input in memory; `last N`
//! holds at most N lines; everything else keeps a single line at a time.
//!
//! A `then` chain runs as a pipeline: each stage except the last gets its own
//! scoped thread, connected to its neighbours by bounded handoffs from
//! [`crate::pipeline`]. The last stage runs on the calling thread and writes
//! to the real output.

use crate::command::{Command, InsertPosition, LineRange, Selection, TransformKind};
use crate::error::ExecError;
use crate::line_io::{DEFAULT_MAX_LINE_BYTES, IO_BUFFER_SIZE, LineReader, write_line};
use crate::matcher::LineMatcher;
use crate::pipeline::{self, DEFAULT_HANDOFF_CAPACITY, HandoffWriter};
use crate::regex_error;
use crate::ring_buffer::RingBuffer;
use memchr::memmem;
use std::io::{BufWriter, Read, Write};
use std::thread;

/// Limits applied while executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Longest accepted input line in bytes
    pub max_line_bytes: usize,
    /// Chunks buffered between two pipeline stages
    pub handoff_capacity: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            handoff_capacity: DEFAULT_HANDOFF_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    options: ExecOptions,
}

/// Execute with default options
pub fn execute<R, W>(command: &Command, input: R, output: W) -> Result<(), ExecError>
where
    R: Read + Send,
    W: Write,
{
    Executor::default().execute(command, input, output)
}

/// Whether a delete/show selection applies to one line
enum LineTest {
    Range(LineRange),
    Pattern(LineMatcher),
}

impl LineTest {
    fn is_match(&self, line_number: usize, line: &[u8]) -> bool {
        match self {
            LineTest::Range(range) => range.contains(line_number),
            LineTest::Pattern(matcher) => matcher.is_match(line),
        }
    }
}

impl Executor {
    pub fn new(options: ExecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExecOptions {
        &self.options
    }

    /// Run `command` from `input` to `output`
    ///
    /// `Command::Illegal` is not executable and is accepted as a no-op; check
    /// parse results with [`Command::into_result`] first.
    pub fn execute<R, W>(&self, command: &Command, input: R, output: W) -> Result<(), ExecError>
    where
        R: Read + Send,
        W: Write,
    {
        tracing::trace!(kind = %command.kind(), "executing");

        match command {
            Command::Replace {
                source,
                is_regex,
                replacement,
            } => self.replace(source, *is_regex, replacement, input, output),
            Command::Delete { selection } => self.select(selection, false, input, output),
            Command::Show {
                selection,
                show_line_numbers,
            } => {
                if *show_line_numbers {
                    self.number_lines(input, output)
                } else {
                    self.select(selection, true, input, output)
                }
            }
            Command::Insert {
                text,
                position,
                reference,
            } => self.insert(text, *position, reference, input, output),
            Command::Transform { kind } => self.transform(*kind, input, output),
            Command::Count { target, is_regex } => self.count(target, *is_regex, input, output),
            Command::Compound { commands } => self.compound(commands, input, output),
            Command::Illegal(_) => Ok(()),
        }
    }

    fn reader<R: Read>(&self, input: R) -> LineReader<std::io::BufReader<R>> {
        LineReader::buffered(input, self.options.max_line_bytes)
    }

    fn replace<R: Read, W: Write>(
        &self,
        source: &str,
        is_regex: bool,
        replacement: &str,
        input: R,
        output: W,
    ) -> Result<(), ExecError> {
        let re = if is_regex {
            Some(regex_error::compile(source)?)
        } else {
            None
        };

        let finder = memmem::Finder::new(source);
        let replacement = replacement.as_bytes();

        let mut lines = self.reader(input);
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, output);

        while let Some(line) = lines.next_line()? {
            match &re {
                Some(re) => write_line(&mut out, &re.replace_all(&line, replacement))?,
                // An empty source would match between every character
                None if source.is_empty() => write_line(&mut out, &line)?,
                None => write_line(&mut out, &replace_literal(&finder, &line, replacement))?,
            }
        }

        out.flush()?;
        Ok(())
    }

    /// `delete` keeps lines the selection does not match; `show` keeps the rest
    fn select<R: Read, W: Write>(
        &self,
        selection: &Selection,
        keep_matching: bool,
        input: R,
        output: W,
    ) -> Result<(), ExecError> {
        let test = match selection {
            Selection::LastN(n) => return self.last_n(*n, keep_matching, input, output),
            Selection::FirstN(n) => return self.first_n(*n, keep_matching, input, output),
            Selection::All => {
                return if keep_matching {
                    self.pass_through(input, output)
                } else {
                    self.drain(input)
                };
            }
            Selection::Range(range) => LineTest::Range(*range),
            Selection::Pattern(pattern) => LineTest::Pattern(LineMatcher::from_pattern(pattern)?),
        };

        let mut lines = self.reader(input);
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, output);

        while let Some(line) = lines.next_line()? {
            if test.is_match(lines.line_number(), &line) == keep_matching {
                write_line(&mut out, &line)?;
            }
        }

        out.flush()?;
        Ok(())
    }

    fn first_n<R: Read, W: Write>(
        &self,
        n: usize,
        keep_matching: bool,
        input: R,
        output: W,
    ) -> Result<(), ExecError> {
        let mut lines = self.reader(input);
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, output);

        if keep_matching {
            // Stop reading as soon as the window is complete
            while lines.line_number() < n {
                match lines.next_line()? {
                    Some(line) => write_line(&mut out, &line)?,
                    None => break,
                }
            }
        } else {
            while let Some(line) = lines.next_line()? {
                if lines.line_number() > n {
                    write_line(&mut out, &line)?;
                }
            }
        }

        out.flush()?;
        Ok(())
    }

    /// Sliding window over the final `n` lines
    ///
    /// `show` emits the window after end of input; `delete` streams each line
    /// as soon as a newer one pushes it out, so the final `n` never appear.
    fn last_n<R: Read, W: Write>(
        &self,
        n: usize,
        keep_matching: bool,
        input: R,
        output: W,
    ) -> Result<(), ExecError> {
        let mut lines = self.reader(input);
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, output);
        let mut window = RingBuffer::new(n);

        while let Some(line) = lines.next_line()? {
            if let Some(evicted) = window.push(line) {
                if !keep_matching {
                    write_line(&mut out, &evicted)?;
                }
            }
        }

        if keep_matching {
            for line in window {
                write_line(&mut out, &line)?;
            }
        }

        out.flush()?;
        Ok(())
    }

    fn number_lines<R: Read, W: Write>(&self, input: R, output: W) -> Result<(), ExecError> {
        let mut lines = self.reader(input);
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, output);

        while let Some(line) = lines.next_line()? {
            write!(out, "{:>6}\t", lines.line_number())?;
            write_line(&mut out, &line)?;
        }

        out.flush()?;
        Ok(())
    }

    fn pass_through<R: Read, W: Write>(&self, input: R, output: W) -> Result<(), ExecError> {
        let mut lines = self.reader(input);
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, output);

        while let Some(line) = lines.next_line()? {
            write_line(&mut out, &line)?;
        }

        out.flush()?;
        Ok(())
    }

    /// Consume and validate input without producing output
    fn drain<R: Read>(&self, input: R) -> Result<(), ExecError> {
        let mut lines = self.reader(input);
        while lines.next_line()?.is_some() {}
        Ok(())
    }

    fn insert<R: Read, W: Write>(
        &self,
        text: &str,
        position: InsertPosition,
        reference: &str,
        input: R,
        output: W,
    ) -> Result<(), ExecError> {
        // Append needs to know where the input ends, so read it all first
        let mut lines = self.reader(input);
        let mut buffered = Vec::new();
        while let Some(line) = lines.next_line()? {
            buffered.push(line);
        }

        let text = text.as_bytes();
        let reference = memmem::Finder::new(reference);
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, output);

        if position == InsertPosition::Prepend {
            write_line(&mut out, text)?;
        }

        for line in &buffered {
            let is_reference = reference.find(line).is_some();

            if position == InsertPosition::Before && is_reference {
                write_line(&mut out, text)?;
            }
            write_line(&mut out, line)?;
            if position == InsertPosition::After && is_reference {
                write_line(&mut out, text)?;
            }
        }

        if position == InsertPosition::Append {
            write_line(&mut out, text)?;
        }

        out.flush()?;
        Ok(())
    }

    fn transform<R: Read, W: Write>(
        &self,
        kind: TransformKind,
        input: R,
        output: W,
    ) -> Result<(), ExecError> {
        let mut lines = self.reader(input);
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, output);

        while let Some(line) = lines.next_line()? {
            write_line(&mut out, &apply_transform(kind, &line))?;
        }

        out.flush()?;
        Ok(())
    }

    fn count<R: Read, W: Write>(
        &self,
        target: &str,
        is_regex: bool,
        input: R,
        mut output: W,
    ) -> Result<(), ExecError> {
        let matcher = LineMatcher::containing(target, is_regex)?;
        let mut lines = self.reader(input);
        let mut total = 0usize;

        while let Some(line) = lines.next_line()? {
            if matcher.is_match(&line) {
                total += 1;
            }
        }

        writeln!(output, "{total}")?;
        output.flush()?;
        Ok(())
    }

    fn compound<R, W>(&self, commands: &[Command], input: R, output: W) -> Result<(), ExecError>
    where
        R: Read + Send,
        W: Write,
    {
        let Some((last, upstream)) = commands.split_last() else {
            return Ok(());
        };
        if upstream.is_empty() {
            return self.execute(last, input, output);
        }

        tracing::debug!(stages = commands.len(), "starting pipeline");

        let results = thread::scope(|scope| {
            let mut workers = Vec::with_capacity(upstream.len());
            let mut stage_input: Box<dyn Read + Send + '_> = Box::new(input);

            for (index, command) in upstream.iter().enumerate() {
                let (writer, reader) = pipeline::handoff(self.options.handoff_capacity);
                let source = std::mem::replace(&mut stage_input, Box::new(reader));
                let executor = *self;
                workers.push(scope.spawn(move || executor.run_stage(index, command, source, writer)));
            }

            // Dropping the last reader here lets upstream stages stop early
            let last_result = self.execute(last, stage_input, output);

            let mut results: Vec<Result<(), ExecError>> = workers
                .into_iter()
                .map(|worker| match worker.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect();
            results.push(last_result);
            results
        });

        first_failure(results)
    }

    fn run_stage(
        &self,
        index: usize,
        command: &Command,
        input: Box<dyn Read + Send + '_>,
        mut writer: HandoffWriter,
    ) -> Result<(), ExecError> {
        tracing::trace!(stage = index, kind = %command.kind(), "stage started");

        let result = self.execute(command, input, &mut writer);

        match &result {
            Err(err) if !err.is_downstream_gone() => {
                tracing::debug!(stage = index, error = %err, "stage failed, closing handoff");
                writer.close_with_error(err.to_string());
            }
            _ => tracing::trace!(stage = index, "stage finished"),
        }

        result
    }
}

/// First real error in stage order
///
/// A stage whose consumer went away did not fail on its own account: either
/// the consumer finished early, or the consumer's own error is further down
/// the list.
fn first_failure(results: Vec<Result<(), ExecError>>) -> Result<(), ExecError> {
    for result in results {
        match result {
            Err(err) if err.is_downstream_gone() => {
                tracing::trace!("upstream stage stopped after its consumer finished");
            }
            Err(err) => return Err(err),
            Ok(()) => {}
        }
    }
    Ok(())
}

/// Every non-overlapping occurrence of the finder's needle replaced
fn replace_literal(finder: &memmem::Finder<'_>, line: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut rewritten = Vec::with_capacity(line.len());
    let mut copied = 0;
    for start in finder.find_iter(line) {
        rewritten.extend_from_slice(&line[copied..start]);
        rewritten.extend_from_slice(replacement);
        copied = start + finder.needle().len();
    }
    rewritten.extend_from_slice(&line[copied..]);
    rewritten
}

/// One line through a case or whitespace transform
///
/// Bytes that are not valid UTF-8 are copied through unchanged.
pub fn apply_transform(kind: TransformKind, line: &[u8]) -> Vec<u8> {
    match kind {
        TransformKind::Uppercase => map_text(line, str::to_uppercase),
        TransformKind::Lowercase => map_text(line, str::to_lowercase),
        TransformKind::Titlecase => match std::str::from_utf8(line) {
            Ok(text) => title_case(text).into_bytes(),
            Err(_) => title_case_bytes(line),
        },
        TransformKind::Trim => trim_end(trim_start(line)).to_vec(),
        TransformKind::TrimLeading => trim_start(line).to_vec(),
        TransformKind::TrimTrailing => trim_end(line).to_vec(),
    }
}

/// Apply `f` to each valid UTF-8 run, keeping invalid bytes in place
fn map_text(line: &[u8], f: impl Fn(&str) -> String) -> Vec<u8> {
    let mut mapped = Vec::with_capacity(line.len());
    for chunk in line.utf8_chunks() {
        mapped.extend_from_slice(f(chunk.valid()).as_bytes());
        mapped.extend_from_slice(chunk.invalid());
    }
    mapped
}

fn trim_start(line: &[u8]) -> &[u8] {
    match line.utf8_chunks().next() {
        Some(chunk) => {
            let valid = chunk.valid();
            &line[valid.len() - valid.trim_start().len()..]
        }
        None => line,
    }
}

fn trim_end(line: &[u8]) -> &[u8] {
    match line.utf8_chunks().last() {
        // Whitespace behind an invalid byte is not at the end of the text
        Some(chunk) if chunk.invalid().is_empty() => {
            let valid = chunk.valid();
            &line[..line.len() - (valid.len() - valid.trim_end().len())]
        }
        _ => line,
    }
}

/// Capitalize each whitespace-separated word and join with single spaces
fn title_case(line: &str) -> String {
    let words: Vec<String> = line
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();
    words.join(" ")
}

/// `title_case` for lines with invalid UTF-8, splitting on ASCII whitespace
fn title_case_bytes(line: &[u8]) -> Vec<u8> {
    let words: Vec<Vec<u8>> = line
        .split(u8::is_ascii_whitespace)
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut titled = Vec::with_capacity(word.len());
            let mut at_start = true;
            for chunk in word.utf8_chunks() {
                let mut chars = chunk.valid().chars();
                if at_start {
                    if let Some(first) = chars.next() {
                        titled.extend(first.to_uppercase().collect::<String>().bytes());
                    }
                }
                titled.extend(chars.flat_map(char::to_lowercase).collect::<String>().bytes());
                titled.extend_from_slice(chunk.invalid());
                at_start = false;
            }
            titled
        })
        .collect();
    words.join(&b' ')
}
