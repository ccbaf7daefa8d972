// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.
use crate::diagnostic::{Diagnostic, Severity};
use crate::include::IncludeResolver;
use crate::macro_table::Define;
use crate::preprocessor::Preprocessor;
use crate::token::TokenKind;

#[cfg(windows)]
const LINE_TERMINATOR: &str = "\r\n";
#[cfg(not(windows))]
const LINE_TERMINATOR: &str = "\n";

const INDENT_UNIT: &str = "    ";

/// The reformatted text and collected diagnostics from [`preprocess`].
#[derive(Debug, Default)]
pub struct PreprocessResult {
    pub output: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Pulls every token from a fresh [`Preprocessor`] and reassembles them
/// into indented text, collecting any `PreprocessingError` tokens as
/// diagnostics instead of emitting them to the output.
///
/// A thin convenience layer over the streaming API: callers that need
/// the raw token stream should use [`Preprocessor`] directly.
pub fn preprocess(
    filename: Option<&str>,
    source: &str,
    seed_defines: &[Define],
    resolver: &mut dyn IncludeResolver,
) -> PreprocessResult {
    let mut pp = match Preprocessor::start(filename, source, resolver, seed_defines) {
        Ok(pp) => pp,
        Err(err) => {
            return PreprocessResult {
                output: String::new(),
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    message: err.0,
                    filename: filename.map(Into::into),
                    line: 0,
                }],
            };
        },
    };

    let mut output = String::new();
    let mut diagnostics = Vec::new();
    let mut indent: u32 = 0;
    let mut at_line_start = true;

    loop {
        let pos = pp.source_pos();
        let token = pp.next_token();
        match token.kind {
            TokenKind::Eoi => break,
            TokenKind::PreprocessingError => {
                let pos = pos.unwrap_or(crate::frame::SourcePos { filename: None, line: 0 });
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    message: token.text.into_owned(),
                    filename: pos.filename,
                    line: pos.line,
                });
            },
            TokenKind::Char(b';') | TokenKind::Char(b'}') => {
                if token.kind == TokenKind::Char(b'}') {
                    indent = indent.saturating_sub(1);
                }
                if at_line_start {
                    push_indent(&mut output, indent);
                } else {
                    output.push(' ');
                }
                output.push_str(&token.text);
                output.push_str(LINE_TERMINATOR);
                at_line_start = true;
            },
            TokenKind::Char(b'{') => {
                output.push_str(LINE_TERMINATOR);
                push_indent(&mut output, indent);
                output.push('{');
                output.push_str(LINE_TERMINATOR);
                indent += 1;
                at_line_start = true;
            },
            TokenKind::Char(b'\n') => {},
            _ => {
                if at_line_start {
                    push_indent(&mut output, indent);
                } else {
                    output.push(' ');
                }
                output.push_str(&token.text);
                at_line_start = false;
            },
        }
    }

    PreprocessResult { output, diagnostics }
}

fn push_indent(output: &mut String, indent: u32) {
    for _ in 0..indent {
        output.push_str(INDENT_UNIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::FsIncludeResolver;
    use indoc::indoc;

    #[test]
    fn brace_and_semicolon_formatting() {
        let source = indoc! {"
            void main() { x; }
        "};
        let mut resolver = FsIncludeResolver::new();
        let result = preprocess(None, source, &[], &mut resolver);
        assert!(result.diagnostics.is_empty());
        let brace_line = result.output.lines().find(|l| l.trim() == "{").expect("a lone { line");
        assert_eq!(brace_line, "{");
        let semi_line = result.output.lines().find(|l| l.contains('x')).expect("a line with x");
        assert_eq!(semi_line, "    x ;");
        let close_line = result.output.lines().find(|l| l.trim() == "}").expect("a lone } line");
        assert_eq!(close_line, "}");
    }

    #[test]
    fn embedded_newline_tokens_do_not_echo_into_the_output() {
        let result = preprocess(None, "{\nx;\n}\n", &[], &mut FsIncludeResolver::new());
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.output, "\n{\n    x ;\n}\n");
    }

    #[test]
    fn duplicate_seed_defines_surface_as_a_diagnostic() {
        let defines = [Define::new("FOO", "1"), Define::new("FOO", "2")];
        let mut resolver = FsIncludeResolver::new();
        let result = preprocess(None, "x\n", &defines, &mut resolver);
        assert_eq!(result.output, "");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message, "'FOO' already defined");
    }
}
