// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.

/// The directive kind that opened a conditional scope.
///
/// `If` and `Elif` exist only so unterminated-conditional messages can
/// name them correctly; the pump never actually constructs a frame with
/// one of those kinds since `#if`/`#elif` are recognized but not handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionalKind {
    If,
    Ifdef,
    Ifndef,
    Else,
    Elif,
}

impl ConditionalKind {
    pub fn unterminated_message(self) -> &'static str {
        match self {
            ConditionalKind::If => "Unterminated #if",
            ConditionalKind::Ifdef => "Unterminated #ifdef",
            ConditionalKind::Ifndef => "Unterminated #ifndef",
            ConditionalKind::Else => "Unterminated #else",
            ConditionalKind::Elif => "Unterminated #elif",
        }
    }
}

/// One stacked `#if*`/`#else` scope, local to a single source frame.
#[derive(Clone, Copy, Debug)]
pub struct ConditionalFrame {
    pub kind: ConditionalKind,
    /// The source line this conditional opened on.
    pub line: u32,
    /// True when the current branch's tokens must be dropped.
    pub skipping: bool,
    /// True once some branch of this chain has been active; keeps a
    /// later `#else` skipped if an earlier branch was already taken.
    pub chosen: bool,
}

impl ConditionalFrame {
    pub fn new_ifdef_like(kind: ConditionalKind, line: u32, enclosing_skipping: bool, found: bool) -> Self {
        let skipping = if enclosing_skipping {
            true
        } else {
            match kind {
                ConditionalKind::Ifdef => !found,
                ConditionalKind::Ifndef => found,
                _ => unreachable!("only Ifdef/Ifndef are constructed this way"),
            }
        };
        ConditionalFrame { kind, line, skipping, chosen: !skipping }
    }

    /// Applies `#else` semantics in place: flips `skipping` to the prior
    /// `chosen` value and marks this chain as chosen if it wasn't yet.
    pub fn take_else(&mut self) {
        self.skipping = self.chosen;
        self.chosen = true;
        self.kind = ConditionalKind::Else;
    }
}
