//! Assembly language parser and label resolver.
//!
//! Converts human-readable assembly source into a resolved [`Program`].
//!
//! # Syntax
//!
//! ```text
//! [label:] [MNEMONIC [arg1 arg2 ...]] [// comment]
//! ```
//!
//! - One label, one instruction, both, or neither per line
//! - Mnemonics are matched case-insensitively against the opcode set
//! - Arguments are decimal integers or label names; a label name resolves
//!   to the absolute index of the instruction following its declaration
//! - Comments start with `//` and run to end of line; a single `/` is a
//!   syntax error
//!
//! Assembly runs in two passes: the first scans every line and records
//! labels and instruction tokens, the second resolves label references and
//! materializes arity-checked instructions. Any error aborts the whole
//! assembly with the offending line and column.

use crate::errors::{AsmError, AsmErrorKind};
use crate::isa::{Instruction, Opcode};
use crate::program::Program;
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const LABEL_SUFFIX: char = ':';
const COMMENT_CHAR: char = '/';

/// One mnemonic or argument token with its 1-based column.
#[derive(Debug, Clone)]
struct Token {
    text: String,
    column: usize,
}

/// Scanned form of one source line.
#[derive(Debug)]
struct Line {
    /// 1-based source line number.
    number: usize,
    label: Option<Token>,
    /// Mnemonic followed by argument tokens; empty when the line carries
    /// no instruction.
    instruction: Vec<Token>,
}

impl Line {
    fn is_blank(&self) -> bool {
        self.label.is_none() && self.instruction.is_empty()
    }
}

fn skip_whitespace(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() && chars[*pos].is_whitespace() {
        *pos += 1;
    }
}

/// Index of the first `/` at or after `from`, or the line length.
fn comment_start(chars: &[char], from: usize) -> usize {
    chars[from..]
        .iter()
        .position(|&c| c == COMMENT_CHAR)
        .map(|i| from + i)
        .unwrap_or(chars.len())
}

/// Whether a `:` occurs at or after `from`, before any comment.
fn colon_before_comment(chars: &[char], from: usize) -> bool {
    for &c in &chars[from..] {
        match c {
            LABEL_SUFFIX => return true,
            COMMENT_CHAR => return false,
            _ => {}
        }
    }
    false
}

/// Splits `chars[start..end]` into whitespace-separated tokens.
fn split_tokens(chars: &[char], start: usize, end: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = start;
    while pos < end {
        if chars[pos].is_whitespace() {
            pos += 1;
            continue;
        }
        let token_start = pos;
        while pos < end && !chars[pos].is_whitespace() {
            pos += 1;
        }
        tokens.push(Token {
            text: chars[token_start..pos].iter().collect(),
            column: token_start + 1,
        });
    }
    tokens
}

/// Scans one physical line into its label and instruction parts.
///
/// Grammar, in order: leading whitespace, optional `identifier:` label,
/// whitespace, optional instruction (first character alphabetic, extends to
/// the start of a comment), whitespace, optional `//` comment. Anything
/// left over is a syntax error.
fn scan_line(number: usize, text: &str) -> Result<Line, AsmError> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0usize;

    skip_whitespace(&chars, &mut pos);

    let mut label = None;
    if pos < chars.len() {
        if chars[pos] == LABEL_SUFFIX {
            return Err(AsmError::at(number, pos + 1, AsmErrorKind::EmptyLabel));
        }
        if chars[pos].is_alphabetic() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_alphanumeric() {
                pos += 1;
            }
            if pos < chars.len() && chars[pos] == LABEL_SUFFIX {
                pos += 1;
                label = Some(Token {
                    text: chars[start..pos - 1].iter().collect(),
                    column: start + 1,
                });
            } else if colon_before_comment(&chars, pos) {
                // A later `:` on the line means this was meant as a label
                // declaration that the identifier does not reach.
                return Err(AsmError::at(
                    number,
                    start + 1,
                    AsmErrorKind::UnterminatedLabel,
                ));
            } else {
                // The identifier is the start of the instruction.
                pos = start;
            }
        }
    }

    skip_whitespace(&chars, &mut pos);

    let mut instruction = Vec::new();
    if pos < chars.len() && chars[pos].is_alphabetic() {
        let end = comment_start(&chars, pos);
        instruction = split_tokens(&chars, pos, end);
        pos = end;
    }

    skip_whitespace(&chars, &mut pos);

    if pos < chars.len() && chars[pos] == COMMENT_CHAR {
        if pos + 1 < chars.len() && chars[pos + 1] == COMMENT_CHAR {
            pos = chars.len();
        } else {
            return Err(AsmError::at(
                number,
                pos + 1,
                AsmErrorKind::MalformedComment,
            ));
        }
    }

    if pos < chars.len() {
        return Err(AsmError::at(
            number,
            pos + 1,
            AsmErrorKind::UnexpectedCharacter(chars[pos]),
        ));
    }

    Ok(Line {
        number,
        label,
        instruction,
    })
}

/// Fails if any label name is declared on two lines, citing both.
fn check_duplicate_labels(lines: &[Line]) -> Result<(), AsmError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for line in lines {
        if let Some(label) = &line.label {
            if let Some(&first_line) = seen.get(label.text.as_str()) {
                return Err(AsmError::at(
                    line.number,
                    label.column,
                    AsmErrorKind::DuplicateLabel {
                        label: label.text.clone(),
                        first_line,
                    },
                ));
            }
            seen.insert(&label.text, line.number);
        }
    }
    Ok(())
}

/// Maps each label to the index the next instruction will occupy.
///
/// A line carrying only a label does not advance the position counter, so
/// a label at the end of the file denotes one past the last instruction.
fn label_positions(lines: &[Line]) -> HashMap<String, i64> {
    let mut positions = HashMap::new();
    let mut location = 0i64;
    for line in lines {
        if let Some(label) = &line.label {
            positions.insert(label.text.clone(), location);
        }
        if !line.instruction.is_empty() {
            location += 1;
        }
    }
    positions
}

/// Resolves one argument token: a label reference if it starts with an
/// alphabetic character, a decimal integer literal otherwise.
fn resolve_argument(
    line: usize,
    token: &Token,
    labels: &HashMap<String, i64>,
) -> Result<i64, AsmError> {
    if token.text.chars().next().is_some_and(char::is_alphabetic) {
        labels.get(&token.text).copied().ok_or_else(|| {
            AsmError::at(
                line,
                token.column,
                AsmErrorKind::UndefinedLabel(token.text.clone()),
            )
        })
    } else {
        token.text.parse().map_err(|_| {
            AsmError::at(
                line,
                token.column,
                AsmErrorKind::InvalidIntegerLiteral(token.text.clone()),
            )
        })
    }
}

/// Turns a scanned instruction line into an arity-checked [`Instruction`].
fn materialize(line: &Line, labels: &HashMap<String, i64>) -> Result<Instruction, AsmError> {
    let mnemonic = &line.instruction[0];
    let opcode = Opcode::from_mnemonic(&mnemonic.text).ok_or_else(|| {
        AsmError::at(
            line.number,
            mnemonic.column,
            AsmErrorKind::UnknownMnemonic(mnemonic.text.clone()),
        )
    })?;

    let mut args = Vec::with_capacity(line.instruction.len() - 1);
    for token in &line.instruction[1..] {
        args.push(resolve_argument(line.number, token, labels)?);
    }

    Instruction::new(opcode, args).map_err(|kind| AsmError::at(line.number, mnemonic.column, kind))
}

/// Assembles a full source string into a [`Program`].
///
/// Two passes: the first scans every line and records labels and
/// instruction tokens, then duplicate labels are rejected, blank lines are
/// dropped, and label positions are computed. The second pass resolves
/// arguments against the label table and materializes the instructions.
pub fn assemble_source(source: impl AsRef<str>) -> Result<Program, AsmError> {
    let source = source.as_ref();

    let mut lines = Vec::new();
    for (index, text) in source.lines().enumerate() {
        lines.push(scan_line(index + 1, text)?);
    }

    check_duplicate_labels(&lines)?;
    lines.retain(|line| !line.is_blank());
    let labels = label_positions(&lines);

    let mut instructions = Vec::new();
    for line in &lines {
        if line.instruction.is_empty() {
            continue;
        }
        instructions.push(materialize(line, &labels)?);
    }

    Ok(Program::new(instructions))
}

/// Convenience: assemble directly from a file path.
///
/// On failure, a compiler-style diagnostic with the source location is
/// emitted to stderr before the error is returned.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, AsmError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| AsmError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let result = assemble_source(&source);
    if let Err(err) = &result {
        log_assembly_error(&path.display().to_string(), &source, err);
    }
    result
}

/// Formats a compiler-style diagnostic for assembly failures.
fn render_assembly_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    column: usize,
    message: &str,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{column}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(column.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "  | {}^", underline);
    }

    diag
}

/// Emits a diagnostic to stderr for a failed assembly.
fn log_assembly_error(file: &str, source: &str, err: &AsmError) {
    match err {
        AsmError::Syntax { line, column, kind } => {
            eprintln!(
                "{}",
                render_assembly_diagnostic(file, source, *line, *column, &kind.to_string())
            );
        }
        other => eprintln!("error: {other}"),
    }
}
