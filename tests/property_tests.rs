//! Property-based tests for ssed
//!
//! These check the algebraic laws the executor promises for any input:
//! partitions, windows, identities and pipeline equivalence.

use ssed::lexer::tokenize;
use ssed::{Command, Pattern, Selection, TokenType, TransformKind, execute, parse};

use proptest::prelude::*;

fn run(command: &Command, input: &str) -> String {
    let mut out = Vec::new();
    execute(command, input.as_bytes(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn join(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

fn out_lines(output: &str) -> Vec<String> {
    output.lines().map(str::to_string).collect()
}

fn lines_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[ab c]{0,8}", 0..30)
}

fn delete(selection: Selection) -> Command {
    Command::Delete { selection }
}

fn show(selection: Selection) -> Command {
    Command::Show {
        selection,
        show_line_numbers: false,
    }
}

fn transform_strategy() -> impl Strategy<Value = TransformKind> {
    prop_oneof![
        Just(TransformKind::Uppercase),
        Just(TransformKind::Lowercase),
        Just(TransformKind::Titlecase),
        Just(TransformKind::Trim),
        Just(TransformKind::TrimLeading),
        Just(TransformKind::TrimTrailing),
    ]
}

/// A handful of streaming commands to compose
fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        ("[abc]{1,2}", "[XY]{0,2}").prop_map(|(source, replacement)| Command::Replace {
            source,
            is_regex: false,
            replacement,
        }),
        "[abc]{1,2}".prop_map(|t| delete(Selection::Pattern(Pattern::contains(t, false)))),
        "[abc]{1,2}".prop_map(|t| show(Selection::Pattern(Pattern::contains(t, false)))),
        (0usize..6).prop_map(|n| show(Selection::FirstN(n))),
        (0usize..6).prop_map(|n| delete(Selection::LastN(n))),
        (0usize..6).prop_map(|n| show(Selection::LastN(n))),
        transform_strategy().prop_map(|kind| Command::Transform { kind }),
    ]
}

// ============================================================================
// Property 1: Replace
// ============================================================================

proptest! {
    /// Replacing a literal with itself only normalizes line endings
    #[test]
    fn prop_identity_replace(lines in lines_strategy(), source in "[abc]{1,3}") {
        let command = Command::Replace {
            source: source.clone(),
            is_regex: false,
            replacement: source,
        };
        let input = join(&lines);
        prop_assert_eq!(run(&command, &input), input);
    }

    /// Replace works line by line and never changes the line count
    #[test]
    fn prop_replace_is_per_line(
        lines in lines_strategy(),
        source in "[abc]{1,2}",
        replacement in "[XY ]{0,3}"
    ) {
        let command = Command::Replace {
            source: source.clone(),
            is_regex: false,
            replacement: replacement.clone(),
        };
        let expected: Vec<String> = lines.iter().map(|l| l.replace(&source, &replacement)).collect();
        prop_assert_eq!(run(&command, &join(&lines)), join(&expected));
    }

    /// CRLF input produces the same output as LF input
    #[test]
    fn prop_crlf_is_normalized(lines in lines_strategy(), source in "[abc]{1,2}") {
        let command = Command::Replace {
            source,
            is_regex: false,
            replacement: "Z".to_string(),
        };
        let crlf: String = lines.iter().map(|l| format!("{l}\r\n")).collect();
        prop_assert_eq!(run(&command, &crlf), run(&command, &join(&lines)));
    }
}

// ============================================================================
// Property 2: Delete and Show partition the input
// ============================================================================

proptest! {
    /// Delete keeps exactly the lines Show drops, in order
    #[test]
    fn prop_delete_show_partition(lines in lines_strategy(), target in "[abc]{1,2}") {
        let pattern = Selection::Pattern(Pattern::contains(target.clone(), false));
        let input = join(&lines);

        let kept: Vec<String> = lines.iter().filter(|l| !l.contains(&target)).cloned().collect();
        let shown: Vec<String> = lines.iter().filter(|l| l.contains(&target)).cloned().collect();

        prop_assert_eq!(run(&delete(pattern.clone()), &input), join(&kept));
        prop_assert_eq!(run(&show(pattern), &input), join(&shown));
    }

    /// Negated patterns swap the roles of Delete and Show
    #[test]
    fn prop_negation_swaps_partition(lines in lines_strategy(), target in "[abc]") {
        let plain = Pattern::contains(target.clone(), false);
        let negated = Pattern { negated: true, ..plain.clone() };
        let input = join(&lines);

        prop_assert_eq!(
            run(&delete(Selection::Pattern(negated)), &input),
            run(&show(Selection::Pattern(plain)), &input)
        );
    }

    /// Show/Delete first N are take/skip
    #[test]
    fn prop_first_n_is_take_and_skip(lines in lines_strategy(), n in 0usize..40) {
        let input = join(&lines);
        let head: Vec<String> = lines.iter().take(n).cloned().collect();
        let rest: Vec<String> = lines.iter().skip(n).cloned().collect();

        prop_assert_eq!(run(&show(Selection::FirstN(n)), &input), join(&head));
        prop_assert_eq!(run(&delete(Selection::FirstN(n)), &input), join(&rest));
    }
}

// ============================================================================
// Property 3: Last N window
// ============================================================================

proptest! {
    /// Show last N yields the final min(N, len) lines
    #[test]
    fn prop_last_n_window(lines in lines_strategy(), n in 0usize..40) {
        let start = lines.len().saturating_sub(n);
        let expected = join(&lines[start..]);
        prop_assert_eq!(run(&show(Selection::LastN(n)), &join(&lines)), expected);
    }

    /// Delete last N followed by show last N reassembles the input
    #[test]
    fn prop_last_n_complement(lines in lines_strategy(), n in 0usize..40) {
        let input = join(&lines);
        let mut combined = run(&delete(Selection::LastN(n)), &input);
        combined.push_str(&run(&show(Selection::LastN(n)), &input));
        prop_assert_eq!(combined, input);
    }
}

// ============================================================================
// Property 4: Compound
// ============================================================================

proptest! {
    /// A one-stage chain behaves like the stage itself
    #[test]
    fn prop_single_stage_compound(lines in lines_strategy(), command in command_strategy()) {
        let input = join(&lines);
        let compound = Command::Compound { commands: vec![command.clone()] };
        prop_assert_eq!(run(&compound, &input), run(&command, &input));
    }

    /// An empty chain produces no output
    #[test]
    fn prop_empty_compound(lines in lines_strategy()) {
        let compound = Command::Compound { commands: vec![] };
        prop_assert_eq!(run(&compound, &join(&lines)), "");
    }

    /// Running stages concurrently matches running them one after another
    #[test]
    fn prop_pipeline_matches_sequential(
        lines in lines_strategy(),
        commands in prop::collection::vec(command_strategy(), 2..5)
    ) {
        let input = join(&lines);

        let mut expected = input.clone();
        for command in &commands {
            expected = run(command, &expected);
        }

        let compound = Command::Compound { commands };
        prop_assert_eq!(run(&compound, &input), expected);
    }
}

// ============================================================================
// Property 5: Transform
// ============================================================================

proptest! {
    /// Case and trim transforms are idempotent
    #[test]
    fn prop_transform_idempotent(
        lines in prop::collection::vec("[ \taBc1é]{0,12}", 0..20),
        kind in transform_strategy()
    ) {
        let command = Command::Transform { kind };
        let once = run(&command, &join(&lines));
        let twice = run(&command, &once);
        prop_assert_eq!(twice, once);
    }

    /// Transforms never add or drop lines
    #[test]
    fn prop_transform_keeps_line_count(lines in lines_strategy(), kind in transform_strategy()) {
        let output = run(&Command::Transform { kind }, &join(&lines));
        prop_assert_eq!(out_lines(&output).len(), lines.len());
    }
}

// ============================================================================
// Property 6: Front end never panics
// ============================================================================

proptest! {
    /// Any query tokenizes to a stream that ends in exactly one Eof
    #[test]
    fn prop_lexer_always_terminates(query in "\\PC{0,40}") {
        let tokens = tokenize(&query);
        prop_assert!(tokens.last().is_some_and(|t| t.is(TokenType::Eof)));
        prop_assert_eq!(tokens.iter().filter(|t| t.is(TokenType::Eof)).count(), 1);
    }

    /// Any query parses to some command; failures carry a position
    #[test]
    fn prop_parser_never_panics(query in "[a-z /'\"0-9#]{0,40}") {
        if let Command::Illegal(illegal) = parse(&query) {
            prop_assert!(illegal.message.starts_with("line "), "{}", illegal.message);
        }
    }

    /// Count agrees with Show for the same literal target
    #[test]
    fn prop_count_matches_show(lines in lines_strategy(), target in "[abc]{1,2}") {
        let input = join(&lines);
        let count = run(&Command::Count { target: target.clone(), is_regex: false }, &input);
        let shown = run(&show(Selection::Pattern(Pattern::contains(target, false))), &input);
        prop_assert_eq!(count, format!("{}\n", out_lines(&shown).len()));
    }
}
