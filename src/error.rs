use crate::token::Token;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CompilerError {
    FileNotFound(String),
    IO(std::io::Error),
    Lexing(LexingError),
    Syntax(SyntaxError),
    Semantic(SemanticError),
    Translate(TranslateError),
    Assemble(AssembleError),
}

impl Error for CompilerError {}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompilerError::IO(err) => writeln!(f, "IOError: {}", err),
            CompilerError::FileNotFound(err) => writeln!(f, "FileNotFoundError: {}", err),
            CompilerError::Lexing(err) => write!(f, "{}", err),
            CompilerError::Syntax(err) => write!(f, "{}", err),
            CompilerError::Semantic(err) => write!(f, "{}", err),
            CompilerError::Translate(err) => write!(f, "{}", err),
            CompilerError::Assemble(err) => write!(f, "{}", err),
        }
    }
}

impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IO(err)
    }
}

impl From<LexingError> for CompilerError {
    fn from(err: LexingError) -> Self {
        CompilerError::Lexing(err)
    }
}

impl From<SyntaxError> for CompilerError {
    fn from(err: SyntaxError) -> Self {
        CompilerError::Syntax(err)
    }
}

impl From<SemanticError> for CompilerError {
    fn from(err: SemanticError) -> Self {
        CompilerError::Semantic(err)
    }
}

impl From<TranslateError> for CompilerError {
    fn from(err: TranslateError) -> Self {
        CompilerError::Translate(err)
    }
}

impl From<AssembleError> for CompilerError {
    fn from(err: AssembleError) -> Self {
        CompilerError::Assemble(err)
    }
}

/// Error produced while breaking source text into tokens.
#[derive(Debug)]
pub struct LexingError {
    pub(crate) path: PathBuf,
    pub(crate) message: String,
    pub(crate) line: usize,
    pub(crate) position: usize,
}

impl Error for LexingError {}

impl LexingError {
    pub fn new(path: PathBuf, message: String, line: usize, position: usize) -> Self {
        Self {
            path,
            message,
            line,
            position,
        }
    }
}

impl fmt::Display for LexingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "LexingError: {}\n  --> {}:{}:{}",
            self.message,
            self.path.display(),
            self.line + 1,
            self.position,
        )
    }
}

/// Error produced when the token sequence violates the grammar. Carries
/// the offending token's text and source position.
#[derive(Debug)]
pub struct SyntaxError {
    pub(crate) path: PathBuf,
    pub(crate) message: String,
    pub(crate) line: usize,
    pub(crate) position: usize,
    pub(crate) token: String,
}

impl Error for SyntaxError {}

impl SyntaxError {
    pub fn from_token(path: PathBuf, token: &Token, message: String) -> Self {
        Self {
            path,
            message,
            line: token.line,
            position: token.position,
            token: token.value.clone(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "SyntaxError: {} (at '{}')\n  --> {}:{}:{}",
            self.message,
            self.token,
            self.path.display(),
            self.line + 1,
            self.position,
        )
    }
}

/// Error produced during code generation, e.g. a reference to a name
/// that is declared in neither scope.
#[derive(Debug)]
pub struct SemanticError {
    pub(crate) path: PathBuf,
    pub(crate) message: String,
    pub(crate) line: usize,
    pub(crate) position: usize,
}

impl Error for SemanticError {}

impl SemanticError {
    pub fn new(path: PathBuf, message: String, line: usize, position: usize) -> Self {
        Self {
            path,
            message,
            line,
            position,
        }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "SemanticError: {}\n  --> {}:{}:{}",
            self.message,
            self.path.display(),
            self.line + 1,
            self.position,
        )
    }
}

/// Error produced while translating VM instructions to assembly.
#[derive(Debug)]
pub struct TranslateError {
    pub(crate) path: PathBuf,
    pub(crate) message: String,
    pub(crate) line: usize,
}

impl Error for TranslateError {}

impl TranslateError {
    pub fn new(path: PathBuf, message: String, line: usize) -> Self {
        Self {
            path,
            message,
            line,
        }
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "TranslateError: {}\n  --> {}:{}",
            self.message,
            self.path.display(),
            self.line + 1,
        )
    }
}

/// Error produced while assembling mnemonics into binary.
#[derive(Debug)]
pub struct AssembleError {
    pub(crate) path: PathBuf,
    pub(crate) message: String,
    pub(crate) line: usize,
}

impl Error for AssembleError {}

impl AssembleError {
    pub fn new(path: PathBuf, message: String, line: usize) -> Self {
        Self {
            path,
            message,
            line,
        }
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "AssembleError: {}\n  --> {}:{}",
            self.message,
            self.path.display(),
            self.line + 1,
        )
    }
}
