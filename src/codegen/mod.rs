use std::{fmt, path::Path};

use crate::{ast::Program, errors::codegen::CodegenError, ty::Ty};

pub mod consts;
mod llvm;

pub use self::llvm::Generator as LlvmBackend;
pub use inkwell::context::Context;

type Result<T> = std::result::Result<T, CodegenError>;

pub trait CodeGenBackend {
	/// Lowers every global and routine of an already checked program.
	fn codegen_root(&mut self, program: &Program) -> Result<()>;

	fn verify(&self) -> Result<()>;

	/// Textual form of the lowered module
	fn to_ir(&self) -> String;

	fn write_ir(&self, path: &Path) -> Result<()>;
}

/// Machine representation of a simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
	/// `i64`
	Int,
	/// `double`
	Real,
	/// `i1`
	Bool,
}

impl Repr {
	#[must_use]
	pub const fn of_ty(ty: &Ty) -> Option<Self> {
		match ty {
			Ty::Int => Some(Self::Int),
			Ty::Real => Some(Self::Real),
			Ty::Bool => Some(Self::Bool),
			_ => None,
		}
	}
}

impl fmt::Display for Repr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Int => "integer",
			Self::Real => "real",
			Self::Bool => "boolean",
		})
	}
}
