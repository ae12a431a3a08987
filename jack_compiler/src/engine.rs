//! Grammar-directed compilation engine.
//!
//! One method per grammar nonterminal; each consumes exactly the tokens
//! of its production and emits VM instructions as it goes. There is no
//! syntax tree: one token of lookahead plus symbol-table state is
//! enough to pick every alternative in this grammar.
use crate::{
    emitter::{ArithCommand, Emitter, Segment},
    lex::LexError,
    symbols::{Kind, Symbol, SymbolError, SymbolTable},
    token_stream::{TokenError, TokenStream},
    tokens::{Keyword, Token, TokenKind},
};

use smol_str::SmolStr;
use std::{error, fmt};

/// Largest integer literal the grammar admits.
const INT_MAX: u32 = 32767;

/// Single-pass compiler for one source unit.
///
/// Owns its token stream, symbol table and emitter exclusively; no
/// state is shared across units. Control-flow label counters are
/// subroutine-local and reset at every subroutine header.
pub struct CompilationEngine<'a> {
    stream: TokenStream<'a>,
    symbols: SymbolTable,
    emitter: Emitter,
    class_name: SmolStr,
    /// Declared return type of the subroutine being compiled.
    return_type: SmolStr,
    if_label: u32,
    while_label: u32,
}

/// Subroutine flavor; decides the prologue emitted after the
/// `function` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

impl<'a> CompilationEngine<'a> {
    pub fn new(stream: TokenStream<'a>) -> Self {
        Self {
            stream,
            symbols: SymbolTable::new(),
            emitter: Emitter::new(),
            class_name: SmolStr::default(),
            return_type: SmolStr::default(),
            if_label: 0,
            while_label: 0,
        }
    }

    /// Compile the unit and render its VM instruction stream.
    ///
    /// The first grammar-shape, range or redefinition failure aborts
    /// the unit; the partially filled instruction buffer is dropped
    /// with the engine and never escapes.
    pub fn compile(mut self) -> Result<String, CompileError> {
        self.compile_class()?;
        Ok(self.emitter.into_text())
    }

    // ------------------------------------------------------------------------
    // Program structure

    /// `'class' className '{' classVarDec* subroutineDec* '}'`
    fn compile_class(&mut self) -> Result<(), CompileError> {
        self.stream.expect_keyword(Keyword::Class)?;
        self.class_name = self.stream.expect_ident()?;
        self.stream.expect_symbol('{')?;

        while let Some(kind) = self.current_class_var_kind() {
            self.compile_class_var_dec(kind)?;
        }
        while let Some(kind) = self.current_subroutine_kind() {
            self.compile_subroutine(kind)?;
        }

        self.stream.expect_symbol('}')?;
        Ok(())
    }

    /// `('static' | 'field') type varName (',' varName)* ';'`
    ///
    /// Every field declared here contributes to the instance size used
    /// by this class's constructors.
    fn compile_class_var_dec(&mut self, kind: Kind) -> Result<(), CompileError> {
        self.stream.advance()?; // static/field keyword
        let ty = self.expect_type()?;
        loop {
            let name = self.stream.expect_ident()?;
            self.symbols.define(name, ty.clone(), kind)?;
            if !self.stream.match_symbol(',')? {
                break;
            }
        }
        self.stream.expect_symbol(';')?;
        Ok(())
    }

    /// `('constructor' | 'function' | 'method') ('void' | type)
    /// subroutineName '(' parameterList ')' '{' varDec* statements '}'`
    ///
    /// The `function` header is emitted only once the parameter list
    /// and local declarations are fully parsed, because its operand is
    /// the local count.
    fn compile_subroutine(&mut self, kind: SubroutineKind) -> Result<(), CompileError> {
        self.stream.advance()?; // constructor/function/method keyword
        self.if_label = 0;
        self.while_label = 0;
        self.symbols.start_subroutine();

        self.return_type = self.expect_return_type()?;
        let name = self.stream.expect_ident()?;

        if kind == SubroutineKind::Method {
            // The receiver is the implicit first argument.
            self.symbols
                .define(SmolStr::new("this"), self.class_name.clone(), Kind::Argument)?;
        }

        self.stream.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.stream.expect_symbol(')')?;

        self.stream.expect_symbol('{')?;
        while self.current_keyword() == Some(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let full_name = SmolStr::new(format!("{}.{}", self.class_name, name));
        self.emitter.function(full_name, self.symbols.count_locals());
        match kind {
            SubroutineKind::Constructor => {
                // Allocate the object, then bind the this reference.
                self.emitter.push(Segment::Constant, self.symbols.field_count());
                self.emitter.call(SmolStr::new("Memory.alloc"), 1);
                self.emitter.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Method => {
                self.emitter.push(Segment::Argument, 0);
                self.emitter.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements()?;
        self.stream.expect_symbol('}')?;
        Ok(())
    }

    /// `((type varName) (',' type varName)*)?`
    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        if self.current_is_symbol(')') {
            return Ok(());
        }
        loop {
            let ty = self.expect_type()?;
            let name = self.stream.expect_ident()?;
            self.symbols.define(name, ty, Kind::Argument)?;
            if !self.stream.match_symbol(',')? {
                break;
            }
        }
        Ok(())
    }

    /// `'var' type varName (',' varName)* ';'`
    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.stream.expect_keyword(Keyword::Var)?;
        let ty = self.expect_type()?;
        loop {
            let name = self.stream.expect_ident()?;
            self.symbols.define(name, ty.clone(), Kind::Local)?;
            if !self.stream.match_symbol(',')? {
                break;
            }
        }
        self.stream.expect_symbol(';')?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Statements

    /// `statement*` where statement starts with let/if/while/do/return.
    fn compile_statements(&mut self) -> Result<(), CompileError> {
        loop {
            match self.current_keyword() {
                Some(Keyword::Let) => self.compile_let()?,
                Some(Keyword::If) => self.compile_if()?,
                Some(Keyword::While) => self.compile_while()?,
                Some(Keyword::Do) => self.compile_do()?,
                Some(Keyword::Return) => self.compile_return()?,
                _ => return Ok(()),
            }
        }
    }

    /// `'let' varName ('[' expression ']')? '=' expression ';'`
    ///
    /// For an array target, the base-plus-index address is computed
    /// before the right-hand side, leaving it on the stack under the
    /// value. The value is parked in `temp 0` before the address is
    /// popped into `pointer 1`; a naive pop order would clobber one
    /// with the other.
    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.stream.expect_keyword(Keyword::Let)?;
        let name = self.stream.expect_ident()?;
        let target = self.resolve_variable(&name)?;

        let is_array = self.stream.match_symbol('[')?;
        if is_array {
            self.emitter.push(target.kind, target.index);
            self.compile_expression()?;
            self.stream.expect_symbol(']')?;
            self.emitter.arith(ArithCommand::Add);
        }

        self.stream.expect_symbol('=')?;
        self.compile_expression()?;
        self.stream.expect_symbol(';')?;

        if is_array {
            self.emitter.pop(Segment::Temp, 0);
            self.emitter.pop(Segment::Pointer, 1);
            self.emitter.push(Segment::Temp, 0);
            self.emitter.pop(Segment::That, 0);
        } else {
            self.emitter.pop(target.kind, target.index);
        }
        Ok(())
    }

    /// `'if' '(' expression ')' '{' statements '}'
    /// ('else' '{' statements '}')?`
    fn compile_if(&mut self) -> Result<(), CompileError> {
        self.stream.expect_keyword(Keyword::If)?;
        let n = self.if_label;
        self.if_label += 1;

        self.stream.expect_symbol('(')?;
        self.compile_expression()?;
        self.stream.expect_symbol(')')?;

        self.emitter.if_goto(control_label("IF_TRUE", n));
        self.emitter.goto(control_label("IF_FALSE", n));
        self.emitter.label(control_label("IF_TRUE", n));

        self.stream.expect_symbol('{')?;
        self.compile_statements()?;
        self.stream.expect_symbol('}')?;

        self.emitter.goto(control_label("IF_END", n));
        self.emitter.label(control_label("IF_FALSE", n));

        if self.current_keyword() == Some(Keyword::Else) {
            self.stream.advance()?;
            self.stream.expect_symbol('{')?;
            self.compile_statements()?;
            self.stream.expect_symbol('}')?;
        }

        self.emitter.label(control_label("IF_END", n));
        Ok(())
    }

    /// `'while' '(' expression ')' '{' statements '}'`
    fn compile_while(&mut self) -> Result<(), CompileError> {
        self.stream.expect_keyword(Keyword::While)?;
        let n = self.while_label;
        self.while_label += 1;

        self.emitter.label(control_label("WHILE_EXP", n));

        self.stream.expect_symbol('(')?;
        self.compile_expression()?;
        self.stream.expect_symbol(')')?;

        self.emitter.arith(ArithCommand::Not);
        self.emitter.if_goto(control_label("WHILE_END", n));

        self.stream.expect_symbol('{')?;
        self.compile_statements()?;
        self.stream.expect_symbol('}')?;

        self.emitter.goto(control_label("WHILE_EXP", n));
        self.emitter.label(control_label("WHILE_END", n));
        Ok(())
    }

    /// `'do' subroutineCall ';'`
    ///
    /// The callee's return value is discarded into `temp 0`.
    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.stream.expect_keyword(Keyword::Do)?;
        let name = self.stream.expect_ident()?;
        self.compile_subroutine_call(name)?;
        self.emitter.pop(Segment::Temp, 0);
        self.stream.expect_symbol(';')?;
        Ok(())
    }

    /// `'return' expression? ';'`
    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.stream.expect_keyword(Keyword::Return)?;
        if !self.current_is_symbol(';') {
            self.compile_expression()?;
        }
        self.stream.expect_symbol(';')?;
        self.emitter.ret(self.return_type == "void");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Expressions

    /// `term (op term)*`
    ///
    /// Operators are emitted after both operands; `*` and `/` are not
    /// native opcodes and lower to OS calls.
    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;
        while let Some(op) = self.current_binary_op() {
            self.stream.advance()?;
            self.compile_term()?;
            match op {
                '+' => self.emitter.arith(ArithCommand::Add),
                '-' => self.emitter.arith(ArithCommand::Sub),
                '*' => self.emitter.call(SmolStr::new("Math.multiply"), 2),
                '/' => self.emitter.call(SmolStr::new("Math.divide"), 2),
                '&' => self.emitter.arith(ArithCommand::And),
                '|' => self.emitter.arith(ArithCommand::Or),
                '<' => self.emitter.arith(ArithCommand::Lt),
                '>' => self.emitter.arith(ArithCommand::Gt),
                '=' => self.emitter.arith(ArithCommand::Eq),
                _ => unreachable!("not a binary operator: {}", op),
            }
        }
        Ok(())
    }

    /// `(expression (',' expression)*)?` — returns the argument count.
    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        let mut n_args = 0;
        if !self.current_is_symbol(')') {
            loop {
                self.compile_expression()?;
                n_args += 1;
                if !self.stream.match_symbol(',')? {
                    break;
                }
            }
        }
        Ok(n_args)
    }

    /// `integerConstant | stringConstant | keywordConstant | varName |
    /// varName '[' expression ']' | subroutineCall | '(' expression ')' |
    /// unaryOp term`
    fn compile_term(&mut self) -> Result<(), CompileError> {
        let token = match self.stream.current() {
            Some(token) => token.clone(),
            None => return Err(self.syntax_error("term")),
        };

        match token.kind {
            TokenKind::IntConst => {
                let value = parse_int(&token)?;
                self.emitter.push(Segment::Constant, value);
                self.stream.advance()?;
            }
            TokenKind::StrConst => {
                self.compile_string_const(&token.text);
                self.stream.advance()?;
            }
            TokenKind::Keyword(Keyword::False) | TokenKind::Keyword(Keyword::Null) => {
                self.emitter.push(Segment::Constant, 0);
                self.stream.advance()?;
            }
            TokenKind::Keyword(Keyword::True) => {
                // Bitwise complement of 0 is the all-ones true value.
                self.emitter.push(Segment::Constant, 0);
                self.emitter.arith(ArithCommand::Not);
                self.stream.advance()?;
            }
            TokenKind::Keyword(Keyword::This) => {
                self.emitter.push(Segment::Pointer, 0);
                self.stream.advance()?;
            }
            TokenKind::Symbol('(') => {
                self.stream.advance()?;
                self.compile_expression()?;
                self.stream.expect_symbol(')')?;
            }
            TokenKind::Symbol('-') => {
                self.stream.advance()?;
                self.compile_term()?;
                self.emitter.arith(ArithCommand::Neg);
            }
            TokenKind::Symbol('~') => {
                self.stream.advance()?;
                self.compile_term()?;
                self.emitter.arith(ArithCommand::Not);
            }
            TokenKind::Ident => self.compile_ident_term(token)?,
            _ => return Err(self.syntax_error("term")),
        }
        Ok(())
    }

    /// Identifier in value position: a lookahead token decides between
    /// an array element read, a subroutine call, and a plain variable.
    fn compile_ident_term(&mut self, token: Token) -> Result<(), CompileError> {
        match self.stream.peek().map(|next| next.kind) {
            Some(TokenKind::Symbol('[')) => {
                self.stream.advance()?; // varName
                let base = self.resolve_variable(&token.text)?;
                self.emitter.push(base.kind, base.index);
                self.stream.expect_symbol('[')?;
                self.compile_expression()?;
                self.stream.expect_symbol(']')?;
                // Dereference the computed address.
                self.emitter.arith(ArithCommand::Add);
                self.emitter.pop(Segment::Pointer, 1);
                self.emitter.push(Segment::That, 0);
            }
            Some(TokenKind::Symbol('(')) | Some(TokenKind::Symbol('.')) => {
                self.stream.advance()?; // callee or receiver name
                self.compile_subroutine_call(token.text)?;
            }
            _ => {
                let variable = self.resolve_variable(&token.text)?;
                self.emitter.push(variable.kind, variable.index);
                self.stream.advance()?;
            }
        }
        Ok(())
    }

    /// `subroutineName '(' expressionList ')' |
    /// (className | varName) '.' subroutineName '(' expressionList ')'`
    ///
    /// The leading identifier has already been consumed. Three call
    /// shapes, decided from the following token and the symbol table:
    /// a bare name is an implicit call on the current object; a dotted
    /// name is method dispatch when the receiver resolves to a
    /// variable, and static dispatch on a class name otherwise.
    fn compile_subroutine_call(&mut self, name: SmolStr) -> Result<(), CompileError> {
        if self.stream.match_symbol('.')? {
            let subroutine = self.stream.expect_ident()?;
            let (target, receiver_args) = match self.symbols.get(&name) {
                Some(receiver) => {
                    // Method dispatch: the stored object reference
                    // becomes the implicit first argument, and the call
                    // target comes from the receiver's declared type.
                    self.emitter.push(receiver.kind, receiver.index);
                    (SmolStr::new(format!("{}.{}", receiver.ty, subroutine)), 1)
                }
                None => (SmolStr::new(format!("{}.{}", name, subroutine)), 0),
            };

            self.stream.expect_symbol('(')?;
            let n_args = receiver_args + self.compile_expression_list()?;
            self.stream.expect_symbol(')')?;
            self.emitter.call(target, n_args);
        } else {
            if self.symbols.get(&name).is_some() {
                // A storage location cannot be called.
                return Err(CompileError::Syntax {
                    expected: "subroutine name",
                    found: Some(Token {
                        kind: TokenKind::Ident,
                        text: name,
                    }),
                });
            }

            self.stream.expect_symbol('(')?;
            // Implicit call on the current object.
            self.emitter.push(Segment::Pointer, 0);
            let n_args = self.compile_expression_list()? + 1;
            self.stream.expect_symbol(')')?;
            let target = SmolStr::new(format!("{}.{}", self.class_name, name));
            self.emitter.call(target, n_args);
        }
        Ok(())
    }

    /// Lower a string literal: build the object, then append each
    /// character left to right. The reference is left on the stack.
    fn compile_string_const(&mut self, text: &str) {
        self.emitter.push(Segment::Constant, text.chars().count() as u16);
        self.emitter.call(SmolStr::new("String.new"), 1);
        for ch in text.chars() {
            self.emitter.push(Segment::Constant, ch as u16);
            self.emitter.call(SmolStr::new("String.appendChar"), 2);
        }
    }

    // ------------------------------------------------------------------------
    // Helpers

    /// `'int' | 'char' | 'boolean' | className`
    fn expect_type(&mut self) -> Result<SmolStr, CompileError> {
        let ty = match self.stream.current() {
            Some(token) => match token.kind {
                TokenKind::Keyword(Keyword::Int)
                | TokenKind::Keyword(Keyword::Char)
                | TokenKind::Keyword(Keyword::Boolean)
                | TokenKind::Ident => token.text.clone(),
                _ => return Err(self.syntax_error("type")),
            },
            None => return Err(self.syntax_error("type")),
        };
        self.stream.advance()?;
        Ok(ty)
    }

    /// `'void' | type`
    fn expect_return_type(&mut self) -> Result<SmolStr, CompileError> {
        if self.current_keyword() == Some(Keyword::Void) {
            self.stream.advance()?;
            Ok(SmolStr::new("void"))
        } else {
            self.expect_type()
        }
    }

    /// Resolve an identifier that must denote a storage location.
    fn resolve_variable(&self, name: &str) -> Result<Symbol, CompileError> {
        self.symbols
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownVariable(SmolStr::new(name)))
    }

    fn current_keyword(&self) -> Option<Keyword> {
        match self.stream.current() {
            Some(Token {
                kind: TokenKind::Keyword(keyword),
                ..
            }) => Some(*keyword),
            _ => None,
        }
    }

    fn current_is_symbol(&self, ch: char) -> bool {
        matches!(self.stream.current(), Some(token) if token.is_symbol(ch))
    }

    fn current_class_var_kind(&self) -> Option<Kind> {
        match self.current_keyword() {
            Some(Keyword::Static) => Some(Kind::Static),
            Some(Keyword::Field) => Some(Kind::Field),
            _ => None,
        }
    }

    fn current_subroutine_kind(&self) -> Option<SubroutineKind> {
        match self.current_keyword() {
            Some(Keyword::Constructor) => Some(SubroutineKind::Constructor),
            Some(Keyword::Function) => Some(SubroutineKind::Function),
            Some(Keyword::Method) => Some(SubroutineKind::Method),
            _ => None,
        }
    }

    fn current_binary_op(&self) -> Option<char> {
        match self.stream.current() {
            Some(Token {
                kind: TokenKind::Symbol(ch),
                ..
            }) if matches!(*ch, '+' | '-' | '*' | '/' | '&' | '|' | '<' | '>' | '=') => Some(*ch),
            _ => None,
        }
    }

    #[inline(never)]
    #[cold]
    fn syntax_error(&self, expected: &'static str) -> CompileError {
        CompileError::Syntax {
            expected,
            found: self.stream.current().cloned(),
        }
    }
}

/// Parse an integer literal, enforcing the permitted range.
/// Out-of-range values are a reported failure, never truncated.
fn parse_int(token: &Token) -> Result<u16, CompileError> {
    match token.text.parse::<u32>() {
        Ok(value) if value <= INT_MAX => Ok(value as u16),
        _ => Err(CompileError::IntOutOfRange(token.text.clone())),
    }
}

fn control_label(prefix: &str, n: u32) -> SmolStr {
    SmolStr::new(format!("{}{}", prefix, n))
}

#[derive(Debug)]
pub enum CompileError {
    /// Current token does not match any alternative of the active
    /// production.
    Syntax {
        expected: &'static str,
        found: Option<Token>,
    },
    Token(TokenError),
    Lex(LexError),
    /// Integer literal outside `[0, 32767]`.
    IntOutOfRange(SmolStr),
    /// Identifier used as a storage location but declared nowhere.
    UnknownVariable(SmolStr),
    Symbol(SymbolError),
}

impl error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use CompileError as E;
        match self {
            E::Syntax { expected, found } => match found {
                Some(token) => write!(f, "expected {}, found '{}'", expected, token.text),
                None => write!(f, "expected {}, found end of source", expected),
            },
            E::Token(err) => fmt::Display::fmt(err, f),
            E::Lex(err) => fmt::Display::fmt(err, f),
            E::IntOutOfRange(text) => {
                write!(f, "integer constant '{}' is out of range (0..=32767)", text)
            }
            E::UnknownVariable(name) => write!(f, "unknown variable '{}'", name),
            E::Symbol(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl From<TokenError> for CompileError {
    fn from(err: TokenError) -> Self {
        CompileError::Token(err)
    }
}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        CompileError::Lex(err)
    }
}

impl From<SymbolError> for CompileError {
    fn from(err: SymbolError) -> Self {
        CompileError::Symbol(err)
    }
}
