use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    Whitespace,
    Newline,
    Punctuation,
}

/// A slice of page text. `start` is the byte offset of `text` in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
}

impl Token<'_> {
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.text.len()
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

/// ASCII word characters plus apostrophe and hyphen.
pub fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '\'' | '-')
}

fn classify(ch: char) -> TokenKind {
    if ch == '\n' {
        TokenKind::Newline
    } else if is_word_char(ch) {
        TokenKind::Word
    } else if ch.is_whitespace() {
        TokenKind::Whitespace
    } else {
        TokenKind::Punctuation
    }
}

/// Split page text into tokens. Concatenating the token texts gives back `text`.
///
/// Words and whitespace are maximal runs; every newline and every other
/// character is a token of its own.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let kind = classify(ch);
        let mut end = start + ch.len_utf8();

        if matches!(kind, TokenKind::Word | TokenKind::Whitespace) {
            while let Some(&(idx, next)) = chars.peek() {
                if classify(next) != kind {
                    break;
                }
                end = idx + next.len_utf8();
                chars.next();
            }
        }

        tokens.push(Token {
            kind,
            text: &text[start..end],
            start,
        });
    }

    tokens
}
