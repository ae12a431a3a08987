//! Two-token lookahead window over the lexer.
use crate::{
    lex::{LexError, Lexer},
    tokens::{Keyword, Token, TokenKind},
};

use smol_str::SmolStr;
use std::{error, fmt};

/// Buffered stream of tokens exposing a `(current, next)` window.
///
/// Tokens are lazily lexed; advancing pulls one further token from the
/// internal lexer. One token of lookahead is exactly what the grammar
/// needs to pick an alternative (array index vs. call vs. plain
/// variable, another declared name after `,`, and so on).
///
/// Advancing past the end of the stream leaves `current` unset and is
/// not an error by itself. Grammar productions must not be invoked past
/// the final valid token.
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    current: Option<Token>,
    next: Option<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> Result<Self, LexError> {
        let mut stream = Self {
            lexer,
            current: None,
            next: None,
        };
        // Prime the two-token window.
        stream.advance()?;
        stream.advance()?;
        Ok(stream)
    }

    /// The token under the cursor. `None` once the stream is exhausted.
    #[inline]
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// One-token lookahead view.
    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.next.as_ref()
    }

    /// Shift `next` into `current` and pull one further token.
    pub fn advance(&mut self) -> Result<(), LexError> {
        self.current = self.next.take();
        self.next = self.lexer.next().transpose()?;
        Ok(())
    }

    /// Consume the current token if it is the given symbol.
    ///
    /// Returns true when matched. Does not consume the token
    /// when the symbol does not match.
    pub fn match_symbol(&mut self, ch: char) -> Result<bool, TokenError> {
        match self.current {
            Some(ref token) if token.is_symbol(ch) => {
                self.advance()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Consume the current token, which must be the given symbol.
    ///
    /// The cursor is not advanced if the token does not match.
    pub fn expect_symbol(&mut self, ch: char) -> Result<(), TokenError> {
        self.expect(TokenKind::Symbol(ch)).map(|_| ())
    }

    /// Consume the current token, which must be the given keyword.
    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), TokenError> {
        self.expect(TokenKind::Keyword(keyword)).map(|_| ())
    }

    /// Consume the current token, which must be an identifier,
    /// and return its name.
    pub fn expect_ident(&mut self) -> Result<SmolStr, TokenError> {
        self.expect(TokenKind::Ident).map(|token| token.text)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, TokenError> {
        match self.current {
            Some(ref token) => {
                if token.kind != kind {
                    Err(TokenError::Mismatch {
                        expected: kind,
                        encountered: token.kind,
                    })
                } else {
                    let token = token.clone();
                    self.advance()?;
                    Ok(token)
                }
            }
            None => Err(TokenError::EndOfSource),
        }
    }
}

/// Error returned when an unexpected token is encountered.
#[derive(Debug)]
pub enum TokenError {
    Mismatch {
        expected: TokenKind,
        encountered: TokenKind,
    },
    EndOfSource,
    Lex(LexError),
}

impl error::Error for TokenError {}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenError as E;
        match self {
            E::Mismatch {
                expected,
                encountered,
            } => write!(
                f,
                "encountered unexpected token '{}', expected '{}'",
                encountered, expected
            ),
            E::EndOfSource => write!(f, "unexpected end of source code"),
            E::Lex(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl From<LexError> for TokenError {
    fn from(err: LexError) -> Self {
        TokenError::Lex(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stream(source: &str) -> TokenStream {
        TokenStream::new(Lexer::new(source)).expect("lexing failed")
    }

    #[test]
    fn test_lookahead_window() {
        let mut tokens = stream("let x = 1;");
        assert!(tokens.current().unwrap().is_keyword(Keyword::Let));
        assert_eq!(tokens.peek().unwrap().text, "x");

        tokens.advance().unwrap();
        assert_eq!(tokens.current().unwrap().text, "x");
        assert!(tokens.peek().unwrap().is_symbol('='));
    }

    #[test]
    fn test_advance_past_end() {
        let mut tokens = stream("x");
        assert!(tokens.current().is_some());
        assert!(tokens.peek().is_none());

        // Not an error; current becomes unset.
        tokens.advance().unwrap();
        assert!(tokens.current().is_none());
    }

    #[test]
    fn test_expect_mismatch_does_not_consume() {
        let mut tokens = stream("let x = 1;");
        let err = tokens.expect_symbol(';').unwrap_err();
        assert!(matches!(err, TokenError::Mismatch { .. }));
        assert!(tokens.current().unwrap().is_keyword(Keyword::Let));
    }

    #[test]
    fn test_match_symbol() {
        let mut tokens = stream(", x");
        assert!(tokens.match_symbol(',').unwrap());
        assert!(!tokens.match_symbol(',').unwrap());
        assert_eq!(tokens.current().unwrap().text, "x");
    }
}
