//! Lexical analysis (tokenizer)
use crate::tokens::{Keyword, Token, TokenKind};

use itertools::{multipeek, MultiPeek};
use smol_str::SmolStr;
use std::{
    error, fmt,
    iter::Iterator,
    str::{CharIndices, FromStr},
};

/// Lexical analyzer.
///
/// Produces the flat token sequence of one source unit. Whitespace,
/// line comments and block comments are stripped during scanning and
/// never reach the token stream. String constants are scanned as whole
/// quoted spans, so punctuation inside a literal is never mistaken for
/// a grammar symbol.
pub struct Lexer<'a> {
    source: SourceText<'a>,
    /// Start byte position of the token currently being scanned.
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            source: SourceText::new(source_code),
            token_start: 0,
        }
    }

    /// Scan the next token, skipping whitespace and comments.
    ///
    /// Returns `None` once the source is exhausted; end-of-stream is
    /// not an error by itself.
    pub fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        loop {
            let (index, next_char) = self.source.next_char()?;
            self.token_start = index;

            let result = match next_char {
                ' ' | '\t' | '\r' | '\n' => continue,
                '/' => match self.source.peek_char() {
                    Some((_, '/')) => {
                        self.source.reset_peek();
                        self.consume_line_comment();
                        continue;
                    }
                    Some((_, '*')) => {
                        self.source.reset_peek();
                        match self.consume_block_comment() {
                            Ok(()) => continue,
                            Err(err) => Err(err),
                        }
                    }
                    _ => {
                        self.source.reset_peek();
                        Ok(self.make_symbol('/'))
                    }
                },
                '"' => self.consume_string(),
                '0'..='9' => Ok(self.consume_number()),
                '_' | 'a'..='z' | 'A'..='Z' => Ok(self.consume_ident()),
                ch if is_grammar_symbol(ch) => Ok(self.make_symbol(ch)),
                ch => Err(LexError::UnknownCharacter {
                    ch,
                    line: self.source.line,
                }),
            };

            return Some(result);
        }
    }

    /// Build a token from the source text between the recorded token
    /// start and the current cursor position.
    fn make_token(&mut self, kind: TokenKind) -> Token {
        let fragment = &self.source.original[self.token_start..=self.source.current.0];
        Token {
            kind,
            text: SmolStr::new(fragment),
        }
    }

    fn make_symbol(&mut self, ch: char) -> Token {
        self.make_token(TokenKind::Symbol(ch))
    }

    fn consume_number(&mut self) -> Token {
        self.source.reset_peek();

        while let Some((_, '0'..='9')) = self.source.peek_char() {
            self.source.next_char();
        }
        self.source.reset_peek();

        self.make_token(TokenKind::IntConst)
    }

    fn consume_ident(&mut self) -> Token {
        self.source.reset_peek();

        while let Some((_, c)) = self.source.peek_char() {
            match c {
                '_' | 'a'..='z' | 'A'..='Z' | '0'..='9' => {
                    self.source.next_char();
                }
                _ => break,
            }
        }
        self.source.reset_peek();

        // If a valid keyword can be parsed from the source fragment, then
        // the token is a reserved word instead of a user defined identifier.
        let fragment = &self.source.original[self.token_start..=self.source.current.0];
        let token_kind = Keyword::from_str(fragment)
            .map(TokenKind::Keyword)
            .unwrap_or(TokenKind::Ident);
        self.make_token(token_kind)
    }

    /// Scan a quoted string span. The opening quote has been consumed;
    /// the token text is the body without either quote.
    fn consume_string(&mut self) -> Result<Token, LexError> {
        let line = self.source.line;
        let body_start = self.token_start + 1;

        loop {
            match self.source.next_char() {
                Some((index, '"')) => {
                    let body = &self.source.original[body_start..index];
                    return Ok(Token {
                        kind: TokenKind::StrConst,
                        text: SmolStr::new(body),
                    });
                }
                Some(_) => {}
                None => return Err(LexError::UnterminatedString { line }),
            }
        }
    }

    /// Erase a `//` comment up to and including the trailing newline.
    fn consume_line_comment(&mut self) {
        while let Some((_, c)) = self.source.next_char() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Erase a `/* ... */` (or `/** ... */`) comment body.
    fn consume_block_comment(&mut self) -> Result<(), LexError> {
        let line = self.source.line;

        // The '*' of the opening marker is still pending.
        self.source.next_char();

        loop {
            match self.source.next_char() {
                Some((_, '*')) => {
                    if let Some((_, '/')) = self.source.peek_char() {
                        self.source.next_char();
                        return Ok(());
                    }
                    self.source.reset_peek();
                }
                Some(_) => {}
                None => return Err(LexError::UnterminatedComment { line }),
            }
        }
    }
}

/// Implement `Lexer` as an iterator for consuming tokens lazily.
impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Grammar symbols form a fixed closed set.
#[rustfmt::skip]
fn is_grammar_symbol(ch: char) -> bool {
    matches!(
        ch,
        '{' | '}' | '(' | ')' | '[' | ']'
            | '.' | ',' | ';'
            | '+' | '-' | '*' | '/'
            | '&' | '|' | '<' | '>' | '=' | '~'
    )
}

/// Wrapper for source code that keeps a cursor position.
///
/// Allows forward lookup via peeking.
struct SourceText<'a> {
    /// Keep reference to the source so tokens can
    /// slice fragments from it.
    original: &'a str,

    /// Iterator over UTF-8 encoded source code.
    ///
    /// The `MultiPeek` wrapper allows for arbitrary lookahead by consuming
    /// the iterator internally and buffering the result. Peeking advances
    /// an internal peek cursor, which is restored by `next()` or
    /// `reset_peek()`.
    chars: MultiPeek<CharIndices<'a>>,

    /// Byte position and value of the current character.
    current: (usize, char),
    /// Line of the current character, starting at 1.
    line: usize,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            original: source,
            chars: multipeek(source.char_indices()),
            current: (0, '\0'),
            line: 1,
        }
    }

    /// Advance the cursor and return the next position and character.
    fn next_char(&mut self) -> Option<(usize, char)> {
        match self.chars.next() {
            Some((index, c)) => {
                if c == '\n' {
                    self.line += 1;
                }
                self.current = (index, c);
                Some((index, c))
            }
            None => {
                // There is no end-of-file character, so park the cursor
                // one past the final byte.
                self.current = (self.original.len(), '\0');
                None
            }
        }
    }

    /// Peeks the next character in the stream.
    ///
    /// This call advances the peek cursor. Subsequent
    /// calls will look ahead by one character each call.
    fn peek_char(&mut self) -> Option<(usize, char)> {
        self.chars.peek().cloned()
    }

    /// Reset the stream peek cursor.
    fn reset_peek(&mut self) {
        self.chars.reset_peek()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnknownCharacter { ch: char, line: usize },
    UnterminatedString { line: usize },
    UnterminatedComment { line: usize },
}

impl error::Error for LexError {}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LexError::UnknownCharacter { ch, line } => {
                write!(f, "unknown character '{}' on line {}", ch, line)
            }
            LexError::UnterminatedString { line } => {
                write!(f, "unterminated string constant starting on line {}", line)
            }
            LexError::UnterminatedComment { line } => {
                write!(f, "unterminated block comment starting on line {}", line)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .collect::<Result<Vec<_>, _>>()
            .expect("lexing failed")
    }

    #[test]
    fn test_lex_declaration() {
        let tokens = lex("var int count;");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword(Keyword::Var),
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Ident,
                TokenKind::Symbol(';'),
            ]
        );
        assert_eq!(tokens[2].text, "count");
    }

    #[test]
    fn test_lex_strips_comments() {
        let tokens = lex("let x = 1; // trailing\n/* block\ncomment */ let y = 2;");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["let", "x", "=", "1", ";", "let", "y", "=", "2", ";"]);
    }

    #[test]
    fn test_lex_doc_comment() {
        let tokens = lex("/** API doc */ class Main { }");
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Class));
    }

    #[test]
    fn test_lex_string_keeps_symbols() {
        // Punctuation and comment markers inside a literal are not tokens.
        let tokens = lex("let s = \"a + b; // c\";");
        assert_eq!(tokens[3].kind, TokenKind::StrConst);
        assert_eq!(tokens[3].text, "a + b; // c");
        assert!(tokens[4].is_symbol(';'));
    }

    #[test]
    fn test_lex_adjacent_symbols() {
        let tokens = lex("a[i]=-1;");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "[", "i", "]", "=", "-", "1", ";"]);
    }

    #[test]
    fn test_lex_unknown_character() {
        let result: Result<Vec<_>, _> = Lexer::new("let x = 1 # 2;").collect();
        assert_eq!(
            result.unwrap_err(),
            LexError::UnknownCharacter { ch: '#', line: 1 }
        );
    }

    #[test]
    fn test_lex_unterminated_string() {
        let result: Result<Vec<_>, _> = Lexer::new("let s = \"oops;").collect();
        assert!(matches!(
            result.unwrap_err(),
            LexError::UnterminatedString { line: 1 }
        ));
    }

    #[test]
    fn test_lex_unterminated_comment() {
        let result: Result<Vec<_>, _> = Lexer::new("let x = 1; /* no end").collect();
        assert!(matches!(
            result.unwrap_err(),
            LexError::UnterminatedComment { line: 1 }
        ));
    }
}
