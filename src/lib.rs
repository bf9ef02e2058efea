//! # Cplus
//!
//! Middle-end of the cplus compiler: checks a parsed program and lowers it to LLVM IR.

pub mod ast;
#[cfg(feature = "llvm")]
pub mod codegen;
pub mod driver;
pub mod errors;
pub mod resolve;
pub mod session;
pub mod ty;

type Result<T> = std::result::Result<T, errors::Error>;
