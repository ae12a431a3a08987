//! VM instruction emission and formatting.
use crate::symbols::Kind;

use smol_str::SmolStr;
use std::fmt;

/// VM-level storage segment addressed by push/pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl fmt::Display for Segment {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Segment as S;
        match self {
            S::Constant => write!(f, "constant"),
            S::Argument => write!(f, "argument"),
            S::Local    => write!(f, "local"),
            S::Static   => write!(f, "static"),
            S::This     => write!(f, "this"),
            S::That     => write!(f, "that"),
            S::Pointer  => write!(f, "pointer"),
            S::Temp     => write!(f, "temp"),
        }
    }
}

/// Segment-name normalization: declaration kinds map onto the target
/// VM's generic segments at the moment of emission. Fields are instance
/// storage addressed relative to the bound `this` pointer, not a
/// standalone segment.
impl From<Kind> for Segment {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }
}

/// Arithmetic and logic opcodes of the target VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithCommand {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl fmt::Display for ArithCommand {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ArithCommand as C;
        match self {
            C::Add => write!(f, "add"),
            C::Sub => write!(f, "sub"),
            C::Neg => write!(f, "neg"),
            C::Eq  => write!(f, "eq"),
            C::Gt  => write!(f, "gt"),
            C::Lt  => write!(f, "lt"),
            C::And => write!(f, "and"),
            C::Or  => write!(f, "or"),
            C::Not => write!(f, "not"),
        }
    }
}

/// One instruction of the closed target set. `Display` renders exactly
/// one well-formed instruction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arith(ArithCommand),
    Label(SmolStr),
    Goto(SmolStr),
    IfGoto(SmolStr),
    Call(SmolStr, u16),
    Function(SmolStr, u16),
    Return,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction as I;
        match self {
            I::Push(segment, index) => write!(f, "push {} {}", segment, index),
            I::Pop(segment, index) => write!(f, "pop {} {}", segment, index),
            I::Arith(command) => write!(f, "{}", command),
            I::Label(name) => write!(f, "label {}", name),
            I::Goto(name) => write!(f, "goto {}", name),
            I::IfGoto(name) => write!(f, "if-goto {}", name),
            I::Call(name, n_args) => write!(f, "call {} {}", name, n_args),
            I::Function(name, n_locals) => write!(f, "function {} {}", name, n_locals),
            I::Return => write!(f, "return"),
        }
    }
}

/// Append-only instruction writer.
///
/// Each method writes one instruction; no validation happens here
/// beyond segment-name normalization. Instructions are emitted in
/// program order and never rewritten or reordered.
#[derive(Debug, Default)]
pub struct Emitter {
    code: Vec<Instruction>,
}

impl Emitter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: impl Into<Segment>, index: u16) {
        self.emit(Instruction::Push(segment.into(), index));
    }

    pub fn pop(&mut self, segment: impl Into<Segment>, index: u16) {
        self.emit(Instruction::Pop(segment.into(), index));
    }

    pub fn arith(&mut self, command: ArithCommand) {
        self.emit(Instruction::Arith(command));
    }

    pub fn label(&mut self, name: SmolStr) {
        self.emit(Instruction::Label(name));
    }

    pub fn goto(&mut self, name: SmolStr) {
        self.emit(Instruction::Goto(name));
    }

    pub fn if_goto(&mut self, name: SmolStr) {
        self.emit(Instruction::IfGoto(name));
    }

    pub fn call(&mut self, name: SmolStr, n_args: u16) {
        self.emit(Instruction::Call(name, n_args));
    }

    pub fn function(&mut self, name: SmolStr, n_locals: u16) {
        self.emit(Instruction::Function(name, n_locals));
    }

    /// Write a return. The calling convention requires every callee to
    /// push exactly one value, so a void subroutine pushes `constant 0`
    /// first.
    pub fn ret(&mut self, is_void: bool) {
        if is_void {
            self.push(Segment::Constant, 0);
        }
        self.emit(Instruction::Return);
    }

    #[inline]
    fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    /// Emitted instructions, in program order.
    #[inline]
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    /// Render the instruction stream as text, one instruction per line.
    pub fn into_text(self) -> String {
        let mut text = String::new();
        for instruction in &self.code {
            text.push_str(&instruction.to_string());
            text.push('\n');
        }
        text
    }
}
