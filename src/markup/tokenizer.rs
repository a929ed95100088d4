//! logos-based markup tokenizer.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `<\body` as BlockOpen beats `<` as Lt)
//! 2. For equal length matches, earlier-defined variants win
//!
//! Our ordering ensures:
//! - `<\|>` matches [`Token::EscapedBar`], not `Lt` + text + `Bar`
//! - `<\src-title` matches [`Token::BlockOpen`], not `Lt` + text
//! - `</body>` matches [`Token::BlockClose`] as a single token

use logos::Logos;

/// Markup token produced by the lexer.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // ── Compound tokens (longer matches, defined first) ──────────────

    /// Escaped argument separator inside text: `<\|>`.
    #[token("<\\|>")]
    EscapedBar,

    /// Start of a block-form tag: `<\body`, `<\macro`.
    #[regex(r"<\\[A-Za-z0-9_#*.+-]+")]
    BlockOpen,

    /// End of a block-form tag: `</body>`.
    #[regex(r"</[A-Za-z0-9_#*.+-]+>")]
    BlockClose,

    /// Separator between two block sections of the same tag: `<|cell>`.
    #[regex(r"<\|[A-Za-z0-9_#*.+-]+>")]
    BlockNext,

    /// Start of an inline tag: `<assign`, `<value`, `<less`.
    #[regex(r"<[A-Za-z0-9_#*.+-]+")]
    TagOpen,

    /// Line break, together with the indentation of the following line.
    #[regex(r"\n[ \t]*")]
    Newline,

    /// Run of plain text.
    #[regex(r"[^<|>\n]+")]
    Text,

    // ── Single-character punctuation ─────────────────────────────────

    /// A `<` that does not start a tag.
    #[token("<")]
    Lt,

    /// `|`
    #[token("|")]
    Bar,

    /// `>`
    #[token(">")]
    Close,
}

impl Token {
    /// Returns the tag name carried by tag-introducing tokens.
    ///
    /// `text` must be the source slice this token was lexed from.
    pub fn tag_name<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            Token::BlockOpen => text.get(2..),
            Token::BlockClose | Token::BlockNext => text.get(2..text.len() - 1),
            Token::TagOpen => text.get(1..),
            _ => None,
        }
    }
}

/// Tokenize markup into a vector of `(Token, String)` pairs.
///
/// Logos error tokens are skipped.
pub fn tokenize(input: &str) -> Vec<(Token, String)> {
    let lexer = Token::lexer(input);
    lexer
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| (token, input[span].to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).into_iter().map(|(t, _)| t).collect()
    }

    // ── Inline tags ──────────────────────────────────────────────────

    #[test]
    fn test_inline_assign() {
        let result = tokenize("<assign|par-first|0fn>");
        assert_eq!(result[0], (Token::TagOpen, "<assign".into()));
        assert_eq!(result[1], (Token::Bar, "|".into()));
        assert_eq!(result[2], (Token::Text, "par-first".into()));
        assert_eq!(result[3], (Token::Bar, "|".into()));
        assert_eq!(result[4], (Token::Text, "0fn".into()));
        assert_eq!(result[5], (Token::Close, ">".into()));
    }

    #[test]
    fn test_starred_tag_name() {
        let result = tokenize("<active*|x>");
        assert_eq!(result[0], (Token::TagOpen, "<active*".into()));
    }

    #[test]
    fn test_hex_color_is_text() {
        let result = tokenize("<assign|granite-strong-color|#f0ffb0>");
        assert_eq!(result[4], (Token::Text, "#f0ffb0".into()));
    }

    // ── Block tags ───────────────────────────────────────────────────

    #[test]
    fn test_block_tokens() {
        assert_eq!(
            tokens("<\\body>\n  x\n</body>"),
            vec![
                Token::BlockOpen,
                Token::Close,
                Token::Newline,
                Token::Text,
                Token::Newline,
                Token::BlockClose,
            ]
        );
    }

    #[test]
    fn test_block_next() {
        assert_eq!(tokens("<|cell>"), vec![Token::BlockNext]);
    }

    #[test]
    fn test_escaped_bar_priority() {
        assert_eq!(tokens("a<\\|>b"), vec![Token::Text, Token::EscapedBar, Token::Text]);
    }

    #[test]
    fn test_lone_lt() {
        assert_eq!(tokens("a < b"), vec![Token::Text, Token::Lt, Token::Text]);
    }

    #[test]
    fn test_newline_swallows_indentation() {
        let result = tokenize("pastel\n      blue");
        assert_eq!(result[1], (Token::Newline, "\n      ".into()));
        assert_eq!(result[2], (Token::Text, "blue".into()));
    }

    // ── Tag names ────────────────────────────────────────────────────

    #[test]
    fn test_tag_name_extraction() {
        assert_eq!(Token::BlockOpen.tag_name("<\\src-title"), Some("src-title"));
        assert_eq!(Token::BlockClose.tag_name("</src-title>"), Some("src-title"));
        assert_eq!(Token::BlockNext.tag_name("<|cell>"), Some("cell"));
        assert_eq!(Token::TagOpen.tag_name("<value"), Some("value"));
        assert_eq!(Token::Text.tag_name("value"), None);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokens("").is_empty());
    }
}
