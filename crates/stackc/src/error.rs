//! Composite error type for the compilation pipeline, separating failures by
//! stage, with one variant and one `From` impl per stage instead of a single
//! stringly-typed error.

use std::fmt;

use crate::pos::Pos;

#[derive(Debug, Clone)]
pub struct ParseError {
    pub pos: Pos,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct SemanticError {
    pub pos: Pos,
    pub message: String,
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

/// Reserved for codegen-stage failures; the current backends are total over
/// a semantically checked AST, so this is currently never constructed.
#[derive(Debug, Clone)]
pub struct CodegenError {
    pub message: String,
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Top-level error for a `compile()` call, separating failures by pipeline
/// stage so the CLI can map each to its own exit code.
#[derive(Debug, Clone)]
pub enum CompileError {
    Parse(ParseError),
    Semantic(SemanticError),
    Sil(CodegenError),
    Jbc(CodegenError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Semantic(e) => write!(f, "semantic error: {e}"),
            Self::Sil(e) => write!(f, "msil generation error: {e}"),
            Self::Jbc(e) => write!(f, "jbc generation error: {e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<SemanticError> for CompileError {
    fn from(error: SemanticError) -> Self {
        Self::Semantic(error)
    }
}

impl CompileError {
    /// Exit code for the CLI: 1 parse, 2 semantic, 3 SIL generation, 4 JBC
    /// generation.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Parse(_) => 1,
            Self::Semantic(_) => 2,
            Self::Sil(_) => 3,
            Self::Jbc(_) => 4,
        }
    }
}
