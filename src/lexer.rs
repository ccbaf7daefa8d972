// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.
use crate::frame::SourceFrame;
use crate::token::TokenKind;

/// Reads the next token from `frame`'s cursor.
///
/// On return, `frame.token_start` marks the token's first byte and
/// `frame.cursor` has advanced past its last byte; `frame.line` has been
/// incremented for every newline consumed along the way, including ones
/// swallowed inside a skipped comment.
pub fn lex(frame: &mut SourceFrame) -> TokenKind {
    loop {
        if let Some(incomplete) = skip_intertoken_space(frame) {
            frame.token_start = frame.cursor;
            return incomplete;
        }
        frame.token_start = frame.cursor;
        let Some(c) = frame.peek_byte() else {
            return TokenKind::Eoi;
        };
        return match c {
            b'\n' => {
                frame.bump_newline();
                TokenKind::Char(b'\n')
            },
            b'"' => lex_string(frame),
            b'#' => lex_hash(frame),
            b'_' => lex_identifier(frame),
            c if c.is_ascii_alphabetic() => lex_identifier(frame),
            c if c.is_ascii_digit() => lex_number(frame),
            c if c.is_ascii_graphic() || c == b' ' => {
                frame.bump();
                TokenKind::Char(c)
            },
            _ => {
                frame.bump();
                TokenKind::BadChars
            },
        };
    }
}

/// Skips spaces, tabs, carriage returns, and comments. Returns
/// `Some(TokenKind::IncompleteComment)` if a `/*` comment runs off the end
/// of the source without a closing `*/`.
fn skip_intertoken_space(frame: &mut SourceFrame) -> Option<TokenKind> {
    loop {
        match (frame.peek_byte(), frame.peek_at(1)) {
            (Some(b' '), _) | (Some(b'\t'), _) | (Some(b'\r'), _) => {
                frame.bump();
            },
            (Some(b'/'), Some(b'/')) => {
                frame.bump();
                frame.bump();
                while !matches!(frame.peek_byte(), None | Some(b'\n')) {
                    frame.bump();
                }
            },
            (Some(b'/'), Some(b'*')) => {
                frame.bump();
                frame.bump();
                if !skip_block_comment(frame) {
                    return Some(TokenKind::IncompleteComment);
                }
            },
            _ => return None,
        }
    }
}

/// Returns `false` if the comment is unterminated.
fn skip_block_comment(frame: &mut SourceFrame) -> bool {
    loop {
        match (frame.peek_byte(), frame.peek_at(1)) {
            (None, _) => return false,
            (Some(b'*'), Some(b'/')) => {
                frame.bump();
                frame.bump();
                return true;
            },
            (Some(b'\n'), _) => frame.bump_newline(),
            _ => frame.bump(),
        }
    }
}

fn lex_identifier(frame: &mut SourceFrame) -> TokenKind {
    while matches!(frame.peek_byte(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
        frame.bump();
    }
    TokenKind::Identifier
}

fn lex_number(frame: &mut SourceFrame) -> TokenKind {
    while matches!(frame.peek_byte(), Some(c) if c.is_ascii_digit()) {
        frame.bump();
    }
    TokenKind::IntLiteral
}

fn lex_string(frame: &mut SourceFrame) -> TokenKind {
    frame.bump(); // opening quote
    loop {
        match frame.peek_byte() {
            None | Some(b'\n') => break,
            Some(b'"') => {
                frame.bump();
                break;
            },
            Some(b'\\') => {
                frame.bump();
                if frame.peek_byte().is_some() {
                    frame.bump();
                }
            },
            Some(_) => frame.bump(),
        }
    }
    TokenKind::StringLiteral
}

/// Classifies text after a `#`: a known directive name becomes its own
/// `TokenKind`; anything else leaves the cursor where it was and the `#`
/// is returned as an ordinary character token.
fn lex_hash(frame: &mut SourceFrame) -> TokenKind {
    frame.bump(); // '#'
    let rewind = frame.cursor;
    while matches!(frame.peek_byte(), Some(b' ') | Some(b'\t')) {
        frame.bump();
    }
    let name_start = frame.cursor;
    while matches!(frame.peek_byte(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
        frame.bump();
    }
    let name = &frame.text()[name_start..frame.cursor];
    let kind = match name {
        "include" => Some(TokenKind::PpInclude),
        "line" => Some(TokenKind::PpLine),
        "undef" => Some(TokenKind::PpUndef),
        "ifdef" => Some(TokenKind::PpIfdef),
        "ifndef" => Some(TokenKind::PpIfndef),
        "else" => Some(TokenKind::PpElse),
        "endif" => Some(TokenKind::PpEndif),
        "error" => Some(TokenKind::PpError),
        "define" => Some(TokenKind::PpDefine),
        "if" => Some(TokenKind::PpIf),
        "elif" => Some(TokenKind::PpElif),
        _ => None,
    };
    match kind {
        Some(kind) => kind,
        None => {
            frame.cursor = rewind;
            TokenKind::Char(b'#')
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SourceFrame;

    fn lex_all(src: &str) -> Vec<TokenKind> {
        let mut frame = SourceFrame::new_root(None, src);
        let mut kinds = Vec::new();
        loop {
            let kind = lex(&mut frame);
            let done = kind == TokenKind::Eoi;
            kinds.push(kind);
            if done {
                break;
            }
        }
        kinds
    }

    #[test]
    fn identifiers_and_newline() {
        let kinds = lex_all("a b\n");
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Char(b'\n'), TokenKind::Eoi]
        );
    }

    #[test]
    fn directive_name_is_recognized() {
        let mut frame = SourceFrame::new_root(None, "#ifdef FOO\n");
        assert_eq!(lex(&mut frame), TokenKind::PpIfdef);
        assert_eq!(lex(&mut frame), TokenKind::Identifier);
        assert_eq!(frame.token_text(), "FOO");
    }

    #[test]
    fn unknown_hash_name_rewinds_to_a_char_token() {
        let mut frame = SourceFrame::new_root(None, "#bogus\n");
        assert_eq!(lex(&mut frame), TokenKind::Char(b'#'));
        assert_eq!(lex(&mut frame), TokenKind::Identifier);
        assert_eq!(frame.token_text(), "bogus");
    }

    #[test]
    fn line_comment_is_skipped() {
        let kinds = lex_all("a // comment\nb\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Char(b'\n'),
                TokenKind::Identifier,
                TokenKind::Char(b'\n'),
                TokenKind::Eoi
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_is_flagged() {
        let mut frame = SourceFrame::new_root(None, "a /* oops");
        assert_eq!(lex(&mut frame), TokenKind::Identifier);
        assert_eq!(lex(&mut frame), TokenKind::IncompleteComment);
    }

    #[test]
    fn block_comment_advances_line_count() {
        let mut frame = SourceFrame::new_root(None, "/*\n\n*/a");
        assert_eq!(lex(&mut frame), TokenKind::Identifier);
        assert_eq!(frame.line, 3);
    }

    #[test]
    fn string_literal_handles_escapes() {
        let mut frame = SourceFrame::new_root(None, r#""a\"b""#);
        assert_eq!(lex(&mut frame), TokenKind::StringLiteral);
        assert_eq!(frame.token_text(), r#""a\"b""#);
    }
}
