//! Tokens
use smol_str::SmolStr;
use std::{fmt, str::FromStr};

/// A single lexical token: its kind and the source text it was scanned from.
///
/// The text of a [`TokenKind::StrConst`] token is the string body without
/// the surrounding double quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
}

impl Token {
    #[inline]
    pub fn is_symbol(&self, ch: char) -> bool {
        self.kind == TokenKind::Symbol(ch)
    }

    #[inline]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier in the set of reserved words.
    Keyword(Keyword),
    /// One grammar symbol from the closed set `{}()[].,;+-*/&|<>=~`.
    Symbol(char),
    Ident,
    /// Integer literal. Range is enforced by the compilation engine,
    /// not the lexer.
    IntConst,
    /// String literal, stored without its quotes.
    StrConst,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::Keyword(keyword) => write!(f, "{}", keyword),
            TokenKind::Symbol(ch) => write!(f, "{}", ch),
            TokenKind::Ident => write!(f, "identifier"),
            TokenKind::IntConst => write!(f, "integer constant"),
            TokenKind::StrConst => write!(f, "string constant"),
        }
    }
}

/// Reserved keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl FromStr for Keyword {
    type Err = ();

    #[rustfmt::skip]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Keyword as K;
        match s {
            "class"       => Ok(K::Class),
            "constructor" => Ok(K::Constructor),
            "function"    => Ok(K::Function),
            "method"      => Ok(K::Method),
            "field"       => Ok(K::Field),
            "static"      => Ok(K::Static),
            "var"         => Ok(K::Var),
            "int"         => Ok(K::Int),
            "char"        => Ok(K::Char),
            "boolean"     => Ok(K::Boolean),
            "void"        => Ok(K::Void),
            "true"        => Ok(K::True),
            "false"       => Ok(K::False),
            "null"        => Ok(K::Null),
            "this"        => Ok(K::This),
            "let"         => Ok(K::Let),
            "do"          => Ok(K::Do),
            "if"          => Ok(K::If),
            "else"        => Ok(K::Else),
            "while"       => Ok(K::While),
            "return"      => Ok(K::Return),
            _             => Err(()),
        }
    }
}

impl fmt::Display for Keyword {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Keyword as K;
        match self {
            K::Class       => write!(f, "class"),
            K::Constructor => write!(f, "constructor"),
            K::Function    => write!(f, "function"),
            K::Method      => write!(f, "method"),
            K::Field       => write!(f, "field"),
            K::Static      => write!(f, "static"),
            K::Var         => write!(f, "var"),
            K::Int         => write!(f, "int"),
            K::Char        => write!(f, "char"),
            K::Boolean     => write!(f, "boolean"),
            K::Void        => write!(f, "void"),
            K::True        => write!(f, "true"),
            K::False       => write!(f, "false"),
            K::Null        => write!(f, "null"),
            K::This        => write!(f, "this"),
            K::Let         => write!(f, "let"),
            K::Do          => write!(f, "do"),
            K::If          => write!(f, "if"),
            K::Else        => write!(f, "else"),
            K::While       => write!(f, "while"),
            K::Return      => write!(f, "return"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keyword_round_trip() {
        for word in [
            "class",
            "constructor",
            "function",
            "method",
            "field",
            "static",
            "var",
            "int",
            "char",
            "boolean",
            "void",
            "true",
            "false",
            "null",
            "this",
            "let",
            "do",
            "if",
            "else",
            "while",
            "return",
        ] {
            let keyword = Keyword::from_str(word).unwrap();
            assert_eq!(keyword.to_string(), word);
        }
    }

    #[test]
    fn test_keyword_rejects_identifiers() {
        assert!(Keyword::from_str("classy").is_err());
        assert!(Keyword::from_str("Main").is_err());
        assert!(Keyword::from_str("").is_err());
    }
}
