//! Single-pass compiler for a small object-oriented language,
//! targeting a textual stack-machine instruction stream.
pub mod emitter;
pub mod engine;
pub mod lex;
pub mod symbols;
pub mod token_stream;
pub mod tokens;

pub use engine::{CompilationEngine, CompileError};

/// Compile one source unit (a single class) into its VM instruction
/// stream, one instruction per line.
pub fn compile_str(source: &str) -> Result<String, CompileError> {
    // Lexical analysis
    let lexer = lex::Lexer::new(source);
    let stream = token_stream::TokenStream::new(lexer)?;

    // Parsing, symbol resolution and code emission in one pass
    let engine = engine::CompilationEngine::new(stream);
    engine.compile()
}
