//! Recursive descent markup parser.
//!
//! Parses style-file markup into a list of top-level paragraphs ([`Tree`]s).
//! Uses the logos-based tokenizer from [`crate::markup::tokenizer`].
//!
//! Whitespace rules:
//! - inside a document, a blank line separates paragraphs and a single line
//!   break is a space;
//! - inside an inline argument, a line break (with its indentation) is a space;
//! - paragraphs are trimmed at both ends, inline arguments are not.

use logos::Logos;

use crate::markup::model::Tree;
use crate::markup::tokenizer::Token;

/// Errors from markup parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected token at position {position}: {message}")]
    UnexpectedToken { position: usize, message: String },
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),
    #[error("tag at position {position} is nested deeper than {limit} levels")]
    NestingTooDeep { position: usize, limit: usize },
}

/// A positioned token.
#[derive(Debug, Clone)]
struct PToken {
    token: Token,
    text: String,
    /// Index in the token stream (for error reporting).
    pos: usize,
}

/// Deepest tag nesting accepted by [`parse_markup`].
pub const MAX_NESTING: usize = 256;

/// Paragraph content marking an intentionally empty paragraph.
const EMPTY_PARAGRAPH: &str = "\\;";

/// Tokenize input, numbering the tokens that lexed successfully.
fn tokenize_positioned(input: &str) -> Vec<PToken> {
    let lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    let mut idx = 0;

    for (result, span) in lexer.spanned() {
        if let Ok(token) = result {
            tokens.push(PToken {
                text: input[span].to_string(),
                token,
                pos: idx,
            });
            idx += 1;
        }
    }

    tokens
}

/// Parse markup text into its top-level paragraphs.
pub fn parse_markup(input: &str) -> Result<Vec<Tree>, ParseError> {
    let normalized = input.replace("\r\n", "\n");
    let tokens = tokenize_positioned(&normalized);

    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let paragraphs = parser.parse_document()?;

    if let Some(tok) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            position: tok.pos,
            message: format!("unmatched closing tag '{}'", tok.text),
        });
    }

    Ok(paragraphs)
}

/// Recursive descent parser state.
struct Parser {
    tokens: Vec<PToken>,
    cursor: usize,
    /// Tags currently open.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&PToken> {
        self.tokens.get(self.cursor)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<PToken> {
        let tok = self.tokens.get(self.cursor).cloned();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    /// Parse paragraphs until a block close, a block separator, or the end of input.
    ///
    /// The terminating token is left for the caller.
    fn parse_document(&mut self) -> Result<Vec<Tree>, ParseError> {
        let mut paragraphs = Vec::new();
        let mut items = Vec::new();

        while let Some(tok) = self.peek() {
            match tok.token {
                Token::BlockClose | Token::BlockNext => break,
                Token::Newline => {
                    self.advance();
                    if self.peek_token() == Some(&Token::Newline) {
                        while self.peek_token() == Some(&Token::Newline) {
                            self.advance();
                        }
                        if let Some(p) = finish_paragraph(std::mem::take(&mut items)) {
                            paragraphs.push(p);
                        }
                    } else {
                        items.push(Tree::atom(" "));
                    }
                }
                _ => items.push(self.parse_item()?),
            }
        }

        if let Some(p) = finish_paragraph(items) {
            paragraphs.push(p);
        }
        Ok(paragraphs)
    }

    /// Parse one non-newline item shared by documents and inline arguments.
    ///
    /// In document context `|` and `>` are ordinary text.
    fn parse_item(&mut self) -> Result<Tree, ParseError> {
        let tok = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof("expected markup".into()))?;

        match tok.token {
            Token::Text | Token::Lt | Token::Bar | Token::Close => Ok(Tree::atom(tok.text)),
            Token::EscapedBar => Ok(Tree::atom("|")),
            Token::TagOpen => {
                let tag = tag_of(&tok)?;
                let args = self.nested(&tok, Self::parse_arguments)?;
                Ok(decode_special(tag, args))
            }
            Token::BlockOpen => {
                let tag = tag_of(&tok)?;
                self.nested(&tok, |p| p.parse_block(tag))
            }
            Token::Newline => Ok(Tree::atom(" ")),
            Token::BlockClose | Token::BlockNext => Err(ParseError::UnexpectedToken {
                position: tok.pos,
                message: format!("unexpected '{}'", tok.text),
            }),
        }
    }

    /// Run `parse` one tag level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        opener: &PToken,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                position: opener.pos,
                limit: MAX_NESTING,
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse `|arg|arg...>` after a tag opener, consuming the closing `>`.
    fn parse_arguments(&mut self) -> Result<Vec<Tree>, ParseError> {
        let mut args = Vec::new();

        loop {
            let tok = self
                .advance()
                .ok_or_else(|| ParseError::UnexpectedEof("expected '|' or '>'".into()))?;
            match tok.token {
                Token::Close => return Ok(args),
                Token::Bar => args.push(self.parse_inline_argument()?),
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        position: tok.pos,
                        message: format!("expected '|' or '>', got {:?} '{}'", tok.token, tok.text),
                    })
                }
            }
        }
    }

    /// Parse one inline argument, stopping before the next `|` or `>`.
    fn parse_inline_argument(&mut self) -> Result<Tree, ParseError> {
        let mut items = Vec::new();

        loop {
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof("unterminated tag argument".into())),
                Some(t) if matches!(t.token, Token::Bar | Token::Close) => break,
                Some(t) if matches!(t.token, Token::BlockClose | Token::BlockNext) => {
                    return Err(ParseError::UnexpectedToken {
                        position: t.pos,
                        message: format!("unexpected '{}' inside tag argument", t.text),
                    })
                }
                Some(t) if t.token == Token::Newline => {
                    self.advance();
                    items.push(Tree::atom(" "));
                }
                Some(_) => items.push(self.parse_item()?),
            }
        }

        Ok(Tree::concat(items))
    }

    /// Parse a block tag after its `<\tag` opener.
    ///
    /// Inline arguments come first; each block section (`<|tag>` starts a new
    /// one) becomes a trailing document argument.
    fn parse_block(&mut self, tag: String) -> Result<Tree, ParseError> {
        let mut args = self.parse_arguments()?;

        loop {
            let body = self.parse_document()?;
            args.push(Tree::document(body));

            let tok = self
                .advance()
                .ok_or_else(|| ParseError::UnexpectedEof(format!("expected '</{tag}>'")))?;
            let name = tag_of(&tok)?;
            if name != tag {
                return Err(ParseError::UnexpectedToken {
                    position: tok.pos,
                    message: format!("expected '</{tag}>', got '{}'", tok.text),
                });
            }
            match tok.token {
                Token::BlockClose => break,
                _ => continue,
            }
        }

        Ok(Tree::compound(tag, args))
    }
}

fn tag_of(tok: &PToken) -> Result<String, ParseError> {
    tok.token
        .tag_name(&tok.text)
        .map(str::to_string)
        .ok_or_else(|| ParseError::UnexpectedToken {
            position: tok.pos,
            message: format!("expected a tag, got '{}'", tok.text),
        })
}

/// Decode argument-less escape tags: `<less>`, `<gtr>`, `<#20AC>`.
fn decode_special(tag: String, args: Vec<Tree>) -> Tree {
    if args.is_empty() {
        match tag.as_str() {
            "less" => return Tree::atom("<"),
            "gtr" => return Tree::atom(">"),
            _ => {
                if let Some(c) = tag
                    .strip_prefix('#')
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32)
                {
                    return Tree::atom(c.to_string());
                }
            }
        }
    }
    Tree::compound(tag, args)
}

/// Close a paragraph: join its items and trim the outer whitespace.
///
/// Returns `None` for paragraphs that contain only whitespace.
fn finish_paragraph(items: Vec<Tree>) -> Option<Tree> {
    let joined = trim_inline(Tree::concat(items));
    match &joined {
        Tree::Atom(s) if s.is_empty() => None,
        Tree::Atom(s) if s == EMPTY_PARAGRAPH => Some(Tree::atom("")),
        _ => Some(joined),
    }
}

fn trim_inline(tree: Tree) -> Tree {
    match tree {
        Tree::Atom(s) => Tree::Atom(s.trim().to_string()),
        Tree::Compound { tag, mut children } if tag == crate::markup::model::CONCAT => {
            if let Some(Tree::Atom(first)) = children.first_mut() {
                *first = first.trim_start().to_string();
            }
            if let Some(Tree::Atom(last)) = children.last_mut() {
                *last = last.trim_end().to_string();
            }
            Tree::concat(children)
        }
        other => other,
    }
}
