pub mod assembler;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod symbol_table;
pub mod token;
pub mod translator;
pub mod vm;
pub mod xml;
