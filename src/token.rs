// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.

/// A lexical token kind.
///
/// Single-ASCII-character tokens (operators, punctuation, the newline
/// token) carry their byte directly rather than getting a named variant
/// each; everything the preprocessor core actually inspects gets a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Any single-byte token not covered by a named variant below,
    /// including the newline token (`Char(b'\n')`).
    Char(u8),
    Identifier,
    IntLiteral,
    StringLiteral,
    PpInclude,
    PpLine,
    PpUndef,
    PpIfdef,
    PpIfndef,
    PpElse,
    PpEndif,
    PpError,
    /// Recognized by the lexer but not handled by the pump; passes
    /// through as an ordinary token if reached unskipped.
    PpDefine,
    /// Recognized but not handled, see `PpDefine`.
    PpIf,
    /// Recognized but not handled, see `PpDefine`.
    PpElif,
    IncompleteComment,
    BadChars,
    Eoi,
    PreprocessingError,
}

impl TokenKind {
    pub fn is_newline(self) -> bool {
        matches!(self, TokenKind::Char(b'\n'))
    }

    pub fn is_end_of_line(self) -> bool {
        matches!(self, TokenKind::Char(b'\n') | TokenKind::Eoi | TokenKind::IncompleteComment)
    }

    pub fn is_unconditional_directive(self) -> bool {
        matches!(self, TokenKind::PpIfdef | TokenKind::PpIfndef | TokenKind::PpEndif | TokenKind::PpElse)
    }

    pub fn is_dispatched_directive(self) -> bool {
        matches!(self, TokenKind::PpInclude | TokenKind::PpLine | TokenKind::PpError | TokenKind::PpUndef)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_variant_compares_like_a_byte() {
        assert_eq!(TokenKind::Char(b'<'), TokenKind::Char(b'<'));
        assert_ne!(TokenKind::Char(b'<'), TokenKind::Char(b'>'));
    }

    #[test]
    fn newline_is_a_char_token() {
        assert!(TokenKind::Char(b'\n').is_newline());
        assert!(TokenKind::Char(b'\n').is_end_of_line());
        assert!(TokenKind::Eoi.is_end_of_line());
        assert!(TokenKind::IncompleteComment.is_end_of_line());
        assert!(!TokenKind::Identifier.is_end_of_line());
    }
}
