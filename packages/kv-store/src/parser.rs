//! Tokenizer and parser for the text property-tree format.

use std::iter::Peekable;
use std::str::Chars;

use appstate_core::{Error, Format};

use crate::Property;

/// Deepest block nesting the parser accepts.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// A quoted or bare string.
    Str(String),
    Open,
    Close,
    /// A `[$FLAG]` conditional. Accepted and ignored.
    Flag(String),
}

fn malformed(line: usize, message: impl std::fmt::Display) -> Error {
    Error::malformed(Format::TEXT, format!("line {}: {}", line, message))
}

struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    /// The next token and the line it started on.
    fn next_token(&mut self) -> Result<Option<(Token, usize)>, Error> {
        loop {
            let Some(&c) = self.chars.peek() else {
                return Ok(None);
            };
            match c {
                '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '/' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'/') {
                        self.skip_comment();
                    } else {
                        // A lone slash starts a bare word.
                        let mut word = String::from('/');
                        self.read_bare(&mut word);
                        return Ok(Some((Token::Str(word), self.line)));
                    }
                }
                '{' => {
                    self.chars.next();
                    return Ok(Some((Token::Open, self.line)));
                }
                '}' => {
                    self.chars.next();
                    return Ok(Some((Token::Close, self.line)));
                }
                '"' => {
                    self.chars.next();
                    let start = self.line;
                    let s = self.read_quoted(start)?;
                    return Ok(Some((Token::Str(s), start)));
                }
                '[' => {
                    self.chars.next();
                    let start = self.line;
                    let flag = self.read_flag(start)?;
                    return Ok(Some((Token::Flag(flag), start)));
                }
                _ => {
                    let mut word = String::new();
                    self.read_bare(&mut word);
                    return Ok(Some((Token::Str(word), self.line)));
                }
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                return;
            }
            self.chars.next();
        }
    }

    fn read_quoted(&mut self, start: usize) -> Result<String, Error> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(malformed(start, "unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        if other == '\n' {
                            self.line += 1;
                        }
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(malformed(start, "unterminated string")),
                },
                Some(c) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    out.push(c);
                }
            }
        }
    }

    fn read_flag(&mut self, start: usize) -> Result<String, Error> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some(']') => return Ok(out),
                Some('\n') | None => return Err(malformed(start, "unterminated [flag]")),
                Some(c) => out.push(c),
            }
        }
    }

    fn read_bare(&mut self, out: &mut String) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | '"') {
                return;
            }
            out.push(c);
            self.chars.next();
        }
    }
}

struct Parser<'a> {
    tokens: Tokenizer<'a>,
    /// A token read ahead of time by `skip_trailing_flags`.
    pending: Option<(Token, usize)>,
    /// Blocks currently open.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<Option<(Token, usize)>, Error> {
        match self.pending.take() {
            Some(tok) => Ok(Some(tok)),
            None => self.tokens.next_token(),
        }
    }

    /// Consume any flags, returning the first non-flag token.
    fn next_skipping_flags(&mut self) -> Result<Option<(Token, usize)>, Error> {
        loop {
            match self.next()? {
                Some((Token::Flag(_), _)) => continue,
                other => return Ok(other),
            }
        }
    }

    /// Drop flags that trail a value.
    fn skip_trailing_flags(&mut self) -> Result<(), Error> {
        self.pending = self.next_skipping_flags()?;
        Ok(())
    }

    /// Parse children until the matching `}` (or end of input at the root).
    fn parse_children(&mut self, opened_on: Option<usize>) -> Result<Vec<Property>, Error> {
        let mut children = Vec::new();
        loop {
            let Some((token, line)) = self.next_skipping_flags()? else {
                return match opened_on {
                    Some(open_line) => Err(malformed(
                        open_line,
                        "block is never closed with '}'",
                    )),
                    None => Ok(children),
                };
            };
            match token {
                Token::Close => {
                    return match opened_on {
                        Some(_) => Ok(children),
                        None => Err(malformed(line, "unexpected '}'")),
                    };
                }
                Token::Open => return Err(malformed(line, "block has no name")),
                Token::Flag(_) => continue,
                Token::Str(key) => {
                    children.push(self.parse_value(key, line)?);
                }
            }
        }
    }

    fn parse_value(&mut self, key: String, key_line: usize) -> Result<Property, Error> {
        match self.next_skipping_flags()? {
            Some((Token::Str(value), _)) => {
                self.skip_trailing_flags()?;
                Ok(Property::leaf(key, value))
            }
            Some((Token::Open, line)) => {
                if self.depth >= MAX_DEPTH {
                    return Err(malformed(line, "blocks nested too deeply"));
                }
                self.depth += 1;
                let children = self.parse_children(Some(line))?;
                self.depth -= 1;
                self.skip_trailing_flags()?;
                Ok(Property::block(key, children))
            }
            Some((Token::Close | Token::Flag(_), _)) | None => Err(malformed(
                key_line,
                format!("key {:?} has no value", key),
            )),
        }
    }
}

/// Parse a whole document into its top-level properties.
pub(crate) fn parse_document(text: &str) -> Result<Vec<Property>, Error> {
    let mut parser = Parser {
        tokens: Tokenizer::new(text),
        pending: None,
        depth: 0,
    };
    let children = parser.parse_children(None)?;
    tracing::trace!(count = children.len(), "parsed text document");
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        let mut t = Tokenizer::new(text);
        let mut out = Vec::new();
        while let Some((tok, _)) = t.next_token().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn tokenizes_quoted_bare_and_braces() {
        assert_eq!(
            tokens(r#""a b" bare { } [$X]"#),
            vec![
                Token::Str("a b".to_string()),
                Token::Str("bare".to_string()),
                Token::Open,
                Token::Close,
                Token::Flag("$X".to_string()),
            ]
        );
    }

    #[test]
    fn escapes_are_decoded() {
        assert_eq!(
            tokens(r#""q\"uote\\ \n\t \z""#),
            vec![Token::Str("q\"uote\\ \n\t \\z".to_string())]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            tokens("// hello\n\"a\" // trailing\n\"b\""),
            vec![Token::Str("a".to_string()), Token::Str("b".to_string())]
        );
    }

    #[test]
    fn bare_words_stop_at_quotes_and_braces() {
        assert_eq!(
            tokens("key{value}"),
            vec![
                Token::Str("key".to_string()),
                Token::Open,
                Token::Str("value".to_string()),
                Token::Close,
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_start_line() {
        let err = parse_document("\"a\" \"b\"\n\"c\" \"never\nends").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn stray_close_is_an_error() {
        let err = parse_document("\"a\" \"b\"\n}").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
        assert!(err.to_string().contains("unexpected '}'"));
    }

    #[test]
    fn unclosed_block_reports_open_line() {
        let err = parse_document("\"a\"\n{\n\"b\" \"c\"\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
        assert!(err.to_string().contains("never closed"));
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let nested = |depth: usize| "\"a\" {\n".repeat(depth) + &"}\n".repeat(depth);
        assert!(parse_document(&nested(MAX_DEPTH)).is_ok());

        let err = parse_document(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"), "{}", err);
        assert!(err.to_string().contains(&format!("line {}", MAX_DEPTH + 1)), "{}", err);

        let err = parse_document(&nested(200_000)).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"), "{}", err);
    }

    #[test]
    fn key_without_value_is_an_error() {
        let err = parse_document("\"block\" { \"lonely\" }").unwrap_err();
        assert!(err.to_string().contains("\"lonely\" has no value"), "{}", err);
    }

    #[test]
    fn anonymous_block_is_an_error() {
        assert!(parse_document("{ \"a\" \"b\" }").is_err());
    }

    #[test]
    fn flags_are_ignored() {
        let props = parse_document("\"a\" \"1\" [$WIN32]\n\"b\" [!$X] { \"c\" \"2\" }").unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0], Property::leaf("a", "1"));
        assert_eq!(
            props[1],
            Property::block("b", vec![Property::leaf("c", "2")])
        );
    }

    #[test]
    fn empty_document_is_empty() {
        assert!(parse_document("").unwrap().is_empty());
        assert!(parse_document("  // only a comment\n").unwrap().is_empty());
    }
}
