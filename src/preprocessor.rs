// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::conditional::{ConditionalFrame, ConditionalKind};
use crate::diagnostic::DiagnosticState;
use crate::frame::{FilenamePool, FrameStack, SourceFrame, SourcePos};
use crate::include::{IncludeKind, IncludeResolver};
use crate::lexer::lex;
use crate::macro_table::{Define, MacroTable};
use crate::token::TokenKind;

/// Failure from [`Preprocessor::start`]: currently only a duplicate
/// caller-supplied define.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartError(pub String);

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StartError {}

/// One token pulled from [`Preprocessor::next_token`].
///
/// `text` borrows from the preprocessor's current top frame for ordinary
/// tokens, or owns a freshly formatted message for a `PreprocessingError`
/// or end-of-input token.
#[derive(Debug)]
pub struct PulledToken<'p> {
    pub kind: TokenKind,
    pub text: Cow<'p, str>,
}

/// The streaming preprocessor core: a pull-driven tokenizer coupled to an
/// include stack, a conditional-compilation state machine, and a macro
/// table.
///
/// Single-threaded and non-reentrant by construction: it owns `Rc`
/// filename handles, so it is not `Sync`, and every operation here is
/// synchronous.
pub struct Preprocessor<'a> {
    resolver: &'a mut dyn IncludeResolver,
    frames: FrameStack<'a>,
    macros: MacroTable,
    filenames: FilenamePool,
    diag: DiagnosticState,
}

impl<'a> Preprocessor<'a> {
    pub fn start(
        filename: Option<&str>,
        source: &'a str,
        resolver: &'a mut dyn IncludeResolver,
        seed_defines: &[Define],
    ) -> Result<Self, StartError> {
        let mut macros = MacroTable::new();
        for define in seed_defines {
            macros.add(&define.name, &define.value).map_err(StartError)?;
        }

        let mut filenames = FilenamePool::new();
        let interned_filename = filename.map(|name| filenames.intern(name));
        let root = SourceFrame::new_root(interned_filename, source);

        let mut frames = FrameStack::new();
        frames.push(root);

        Ok(Preprocessor { resolver, frames, macros, filenames, diag: DiagnosticState::new() })
    }

    pub fn source_pos(&self) -> Option<SourcePos> {
        self.frames.top().map(SourceFrame::source_pos)
    }

    pub fn out_of_memory(&self) -> bool {
        self.diag.out_of_memory()
    }

    /// The main token pump. See the module-level doc for the case order
    /// this follows.
    pub fn next_token(&mut self) -> PulledToken<'_> {
        loop {
            if let Some(message) = self.diag.take() {
                return PulledToken { kind: TokenKind::PreprocessingError, text: Cow::Owned(message) };
            }

            if self.frames.is_empty() {
                return PulledToken { kind: TokenKind::Eoi, text: Cow::Borrowed("") };
            }

            let skipping =
                self.frames.top().and_then(|f| f.conditionals.last()).map(|c| c.skipping).unwrap_or(false);

            let kind = lex(self.frames.top_mut().expect("checked non-empty above"));

            if kind == TokenKind::Eoi {
                let has_open_conditionals = !self.frames.top().unwrap().conditionals.is_empty();
                if has_open_conditionals {
                    let message = self.recover_unterminated_conditional();
                    self.diag.latch(message);
                } else {
                    let popped = self.frames.pop();
                    trace!(filename = ?popped.and_then(|f| f.filename), "source frame exhausted");
                }
                continue;
            }

            if kind == TokenKind::IncompleteComment {
                self.diag.latch("Incomplete multiline comment");
                continue;
            }

            if kind.is_unconditional_directive() {
                let result = match kind {
                    TokenKind::PpIfdef => self.handle_ifdef_ifndef(ConditionalKind::Ifdef),
                    TokenKind::PpIfndef => self.handle_ifdef_ifndef(ConditionalKind::Ifndef),
                    TokenKind::PpElse => self.handle_else(),
                    TokenKind::PpEndif => self.handle_endif(),
                    _ => unreachable!(),
                };
                if let Err(message) = result {
                    self.diag.latch(message);
                }
                continue;
            }

            if skipping {
                continue;
            }

            if kind.is_dispatched_directive() {
                let result = match kind {
                    TokenKind::PpInclude => self.handle_include(),
                    TokenKind::PpLine => self.handle_line(),
                    TokenKind::PpUndef => self.handle_undef(),
                    TokenKind::PpError => {
                        self.diag.latch(self.handle_error());
                        Ok(())
                    },
                    _ => unreachable!(),
                };
                if let Err(message) = result {
                    self.diag.latch(message);
                }
                continue;
            }

            let frame = self.frames.top().expect("checked non-empty above");
            return PulledToken { kind, text: Cow::Borrowed(frame.token_text()) };
        }
    }

    fn require_newline(&mut self) -> bool {
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        let saved_cursor = frame.cursor;
        let saved_line = frame.line;
        let kind = lex(frame);
        frame.cursor = saved_cursor;
        frame.line = saved_line;
        kind.is_end_of_line()
    }

    fn handle_ifdef_ifndef(&mut self, kind: ConditionalKind) -> Result<(), String> {
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        if lex(frame) != TokenKind::Identifier {
            return Err("Macro names must be identifiers".to_string());
        }
        let id = frame.token_text().to_string();
        let line = frame.line;
        if !self.require_newline() {
            return Err("Macro names must be identifiers".to_string());
        }

        let found = self.macros.find(&id).is_some();
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        let enclosing_skipping = frame.conditionals.last().map(|c| c.skipping).unwrap_or(false);
        let conditional = ConditionalFrame::new_ifdef_like(kind, line, enclosing_skipping, found);
        debug!(?kind, %id, found, skipping = conditional.skipping, "conditional opened");
        frame.conditionals.push(conditional);
        Ok(())
    }

    fn handle_else(&mut self) -> Result<(), String> {
        if !self.require_newline() {
            return Err("Invalid #else directive".to_string());
        }
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        match frame.conditionals.last_mut() {
            None => Err("#else without #if".to_string()),
            Some(top) if top.kind == ConditionalKind::Else => Err("#else after #else".to_string()),
            Some(top) => {
                top.take_else();
                Ok(())
            },
        }
    }

    fn handle_endif(&mut self) -> Result<(), String> {
        if !self.require_newline() {
            return Err("Invalid #endif directive".to_string());
        }
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        if frame.conditionals.pop().is_none() {
            return Err("Unmatched #endif".to_string());
        }
        Ok(())
    }

    fn recover_unterminated_conditional(&mut self) -> String {
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        let popped = frame.conditionals.pop().expect("caller checked conditionals is non-empty");
        popped.kind.unterminated_message().to_string()
    }

    fn handle_undef(&mut self) -> Result<(), String> {
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        if lex(frame) != TokenKind::Identifier {
            return Err("Macro names must be identifiers".to_string());
        }
        let id = frame.token_text().to_string();
        if !self.require_newline() {
            return Err("Macro names must be identifiers".to_string());
        }
        self.macros.remove(&id);
        Ok(())
    }

    fn handle_line(&mut self) -> Result<(), String> {
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        if lex(frame) != TokenKind::IntLiteral {
            return Err("Invalid #line directive".to_string());
        }
        let new_line: u32 = frame.token_text().parse().map_err(|_| "Invalid #line directive".to_string())?;

        let frame = self.frames.top_mut().expect("caller holds an active frame");
        if lex(frame) != TokenKind::StringLiteral {
            return Err("Invalid #line directive".to_string());
        }
        let filename = strip_quotes(frame.token_text()).to_string();

        if !self.require_newline() {
            return Err("Invalid #line directive".to_string());
        }

        let interned = self.filenames.intern(&filename);
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        frame.line = new_line;
        frame.filename = Some(interned);
        Ok(())
    }

    fn handle_error(&mut self) -> String {
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        let message_start = frame.cursor;
        loop {
            let saved_cursor = frame.cursor;
            let saved_line = frame.line;
            let kind = lex(frame);
            match kind {
                TokenKind::Char(b'\n') => {
                    let terminator = frame.token_start;
                    let text = frame.text()[message_start..terminator].trim_start().to_string();
                    // Rewind past the newline so the pump re-lexes it on
                    // the next pull, bumping `line` at the usual time.
                    frame.cursor = saved_cursor;
                    frame.line = saved_line;
                    return format!("#error {}", text);
                },
                TokenKind::Eoi | TokenKind::IncompleteComment => {
                    let terminator = frame.token_start;
                    let text = frame.text()[message_start..terminator].trim_start().to_string();
                    return format!("#error {}", text);
                },
                _ => continue,
            }
        }
    }

    fn handle_include(&mut self) -> Result<(), String> {
        let frame = self.frames.top_mut().expect("caller holds an active frame");
        let token_kind = lex(frame);
        let (kind, filename) = match token_kind {
            TokenKind::StringLiteral => (IncludeKind::Local, strip_quotes(frame.token_text()).to_string()),
            TokenKind::Char(b'<') => match scan_system_include(frame) {
                Some(name) => (IncludeKind::System, name),
                None => return Err("Invalid #include directive".to_string()),
            },
            _ => return Err("Invalid #include directive".to_string()),
        };

        if !self.require_newline() {
            return Err("Invalid #include directive".to_string());
        }

        let parent = self.frames.top().and_then(|f| f.filename.clone());
        let parent_str = parent.as_deref();
        match self.resolver.open(kind, &filename, parent_str) {
            Ok(data) => {
                let interned = Some(self.filenames.intern(&filename));
                debug!(%filename, ?kind, "include opened");
                self.frames.push(SourceFrame::new_included(interned, data));
                Ok(())
            },
            Err(_) => Err("Include callback failed".to_string()),
        }
    }
}

/// Strips one leading and one trailing byte (the enclosing quotes or
/// angle brackets), defensively returning an empty string for a token
/// shorter than 2 bytes rather than panicking on the slice.
fn strip_quotes(text: &str) -> &str {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        ""
    }
}

/// Reads raw bytes directly from the cursor (bypassing the lexer) up to
/// the first `>`, `\r`, or `\n`. Only `>` is a valid terminator.
fn scan_system_include(frame: &mut SourceFrame) -> Option<String> {
    let start = frame.cursor;
    loop {
        match frame.peek_byte() {
            Some(b'>') => {
                let name = frame.text()[start..frame.cursor].to_string();
                frame.bump();
                return Some(name);
            },
            Some(b'\r') | Some(b'\n') | None => return None,
            Some(_) => frame.bump(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::FsIncludeResolver;

    fn collect(source: &str, defines: &[Define]) -> Vec<(TokenKind, String)> {
        let mut resolver = FsIncludeResolver::new();
        let mut pp = Preprocessor::start(None, source, &mut resolver, defines).unwrap();
        let mut out = Vec::new();
        loop {
            let token = pp.next_token();
            let done = token.kind == TokenKind::Eoi;
            out.push((token.kind, token.text.into_owned()));
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn pure_passthrough() {
        let tokens = collect("a b\n", &[]);
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::Identifier, "b".to_string()),
                (TokenKind::Char(b'\n'), "\n".to_string()),
                (TokenKind::Eoi, "".to_string()),
            ]
        );
    }

    #[test]
    fn ifdef_taken() {
        let defines = [Define::new("FOO", "1")];
        let tokens = collect("#ifdef FOO\nx\n#endif\ny\n", &defines);
        let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert!(texts.contains(&"x"));
        assert!(texts.contains(&"y"));
        assert!(!texts.iter().any(|t| t.starts_with("Unterminated") || t.starts_with("#else")));
        assert_eq!(texts.last(), Some(&""));
    }

    #[test]
    fn ifdef_not_taken_else_active() {
        let tokens = collect("#ifdef FOO\nx\n#else\ny\n#endif\n", &[]);
        let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert!(!texts.contains(&"x"));
        assert!(texts.contains(&"y"));
    }

    #[test]
    fn unterminated_ifdef_reports_and_ends() {
        let tokens = collect("#ifdef FOO\nx\n", &[]);
        assert_eq!(tokens.last().unwrap().0, TokenKind::Eoi);
        let error = tokens.iter().find(|(k, _)| *k == TokenKind::PreprocessingError).unwrap();
        assert!(error.1.starts_with("Unterminated #ifdef"));
    }

    #[test]
    fn error_directive_latches_and_rescans_its_newline() {
        let tokens = collect("#error do not use\n", &[]);
        assert_eq!(
            tokens,
            vec![(TokenKind::PreprocessingError, "#error do not use".to_string()), (TokenKind::Eoi, "".to_string())]
        );
    }

    #[test]
    fn duplicate_seed_defines_fail_start() {
        let defines = [Define::new("FOO", "1"), Define::new("FOO", "2")];
        let mut resolver = FsIncludeResolver::new();
        let err = Preprocessor::start(None, "x\n", &mut resolver, &defines).unwrap_err();
        assert_eq!(err.0, "'FOO' already defined");
    }

    struct MockIncluder;
    impl IncludeResolver for MockIncluder {
        fn open(&mut self, _kind: IncludeKind, filename: &str, _parent: Option<&str>) -> std::io::Result<Box<str>> {
            if filename == "b.h" {
                Ok("B\n".into())
            } else {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such include"))
            }
        }
    }

    #[test]
    fn include_round_trip() {
        let mut resolver = MockIncluder;
        let source = "A\n#include \"b.h\"\nC\n";
        let mut pp = Preprocessor::start(None, source, &mut resolver, &[]).unwrap();

        let mut texts = Vec::new();
        let mut saw_b_pos = None;
        loop {
            let token = pp.next_token();
            let done = token.kind == TokenKind::Eoi;
            let text = token.text.into_owned();
            if text == "B" {
                saw_b_pos = pp.source_pos();
            }
            texts.push(text);
            if done {
                break;
            }
        }

        assert_eq!(texts, vec!["A", "\n", "B", "\n", "C", "\n", ""]);
        let pos = saw_b_pos.expect("saw the B token");
        assert_eq!(pos.filename.as_deref(), Some("b.h"));
        assert_eq!(pos.line, 1);
    }
}
