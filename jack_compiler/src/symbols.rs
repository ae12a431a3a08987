//! Two-level scoped symbol table.
use smol_str::SmolStr;
use std::{collections::BTreeMap, error, fmt};

/// Declaration kind of a symbol. Determines both the scope a name is
/// defined in and the VM segment its storage lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    /// Static and field declarations live in class scope; arguments and
    /// locals live in subroutine scope.
    #[inline]
    pub fn is_class_scope(self) -> bool {
        matches!(self, Kind::Static | Kind::Field)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kind::Static => write!(f, "static"),
            Kind::Field => write!(f, "field"),
            Kind::Argument => write!(f, "argument"),
            Kind::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: SmolStr,
    /// Declared type: `int`, `char`, `boolean` or a class name.
    pub ty: SmolStr,
    pub kind: Kind,
    /// Positional index, assigned monotonically per (scope, kind).
    pub index: u16,
}

/// Symbol registry with a class scope and a subroutine scope.
///
/// Lookup resolves through subroutine scope first, so arguments and
/// locals shadow fields and statics of the same name. A name absent
/// from both scopes is not an error here; the caller classifies it as a
/// class or subroutine name from context.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: BTreeMap<SmolStr, Symbol>,
    subroutine_scope: BTreeMap<SmolStr, Symbol>,
    static_index: u16,
    field_index: u16,
    argument_index: u16,
    local_index: u16,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset subroutine scope. Must be called before parsing each
    /// subroutine's parameter list.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.argument_index = 0;
        self.local_index = 0;
    }

    /// Define a new symbol, assigning it the next free index for its
    /// (scope, kind) pair.
    ///
    /// Redefining a name already present in the same scope is an error.
    /// Shadowing a class-scope name from subroutine scope is allowed.
    pub fn define(&mut self, name: SmolStr, ty: SmolStr, kind: Kind) -> Result<u16, SymbolError> {
        let scope = if kind.is_class_scope() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };
        if scope.contains_key(&name) {
            return Err(SymbolError::Redefined { name });
        }

        let counter = match kind {
            Kind::Static => &mut self.static_index,
            Kind::Field => &mut self.field_index,
            Kind::Argument => &mut self.argument_index,
            Kind::Local => &mut self.local_index,
        };
        let index = *counter;
        *counter += 1;

        scope.insert(
            name.clone(),
            Symbol {
                name,
                ty,
                kind,
                index,
            },
        );
        Ok(index)
    }

    /// Resolve a name through subroutine scope, falling back to class
    /// scope. `None` means the identifier does not denote a variable.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    #[inline]
    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.get(name).map(|symbol| symbol.kind)
    }

    #[inline]
    pub fn type_of(&self, name: &str) -> Option<&SmolStr> {
        self.get(name).map(|symbol| &symbol.ty)
    }

    #[inline]
    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.get(name).map(|symbol| symbol.index)
    }

    /// Number of local-kind entries in the current subroutine scope;
    /// the operand of the `function` instruction.
    #[inline]
    pub fn count_locals(&self) -> u16 {
        self.local_index
    }

    /// Number of fields declared by the class; the allocation size a
    /// constructor passes to `Memory.alloc`.
    #[inline]
    pub fn field_count(&self) -> u16 {
        self.field_index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// A name was declared twice in the same scope.
    Redefined { name: SmolStr },
}

impl error::Error for SymbolError {}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolError::Redefined { name } => {
                write!(f, "'{}' is already defined in this scope", name)
            }
        }
    }
}
