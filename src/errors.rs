//! Errors reported by each pass
//!
//! All passes stop at their first error.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Unreadable or malformed syntax tree
	Input,
	Declaration,
	Resolution,
	Compatibility,
	Lowering,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Input => "input",
			Self::Declaration => "declaration",
			Self::Resolution => "resolution",
			Self::Compatibility => "type",
			Self::Lowering => "lowering",
		})
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("no input file given")]
	NoInput,
	#[error("cannot access file: {0}")]
	Io(#[from] std::io::Error),
	#[error("malformed syntax tree: {0}")]
	Input(#[from] serde_json::Error),

	#[error(transparent)]
	Type(#[from] ty::TypeError),
	#[cfg(feature = "llvm")]
	#[error(transparent)]
	Codegen(#[from] codegen::CodegenError),
}

impl Error {
	#[must_use]
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::NoInput | Self::Io(_) | Self::Input(_) => ErrorKind::Input,
			Self::Type(err) => err.kind(),
			#[cfg(feature = "llvm")]
			Self::Codegen(_) => ErrorKind::Lowering,
		}
	}
}

pub mod ty {
	use super::ErrorKind;
	use crate::{session::Symbol, ty::Ty};

	#[derive(Debug, Clone, PartialEq, thiserror::Error)]
	pub enum TypeError {
		#[error("variable `{name}` has neither a type nor an initial value")]
		UnderSpecifiedDeclaration { name: Symbol },
		#[error("parameter `{param}` of routine `{routine}` has no type")]
		UntypedParameter { routine: Symbol, param: Symbol },
		#[error("variable `{name}` is declared as {declared} but initialized with {found}")]
		DeclarationTypeMismatch {
			name: Symbol,
			declared: Ty,
			found: Ty,
		},
		#[error("array size must be an integer, found {found}")]
		ArraySizeNotInt { found: Ty },
		#[error("record field `{field}` is declared twice")]
		DuplicateField { field: Symbol },

		#[error("`{0}` is not declared")]
		UndeclaredName(Symbol),
		#[error("routine `{0}` is not declared")]
		UndeclaredRoutine(Symbol),
		#[error("`{0}` is not a routine")]
		NotCallable(Symbol),
		#[error("`{0}` cannot be assigned to")]
		NotAssignable(Symbol),
		#[error("`{name}` has type {found} which has no fields, cannot access `{field}`")]
		NotARecord {
			name: Symbol,
			field: Symbol,
			found: Ty,
		},
		#[error("`{name}` has no field `{field}`")]
		UnknownField { name: Symbol, field: Symbol },
		#[error("`{0}` is not an array and cannot be indexed")]
		NotIndexable(Symbol),

		#[error("index into `{name}` must be an integer, found {found}")]
		IndexNotInt { name: Symbol, found: Ty },
		#[error("operator `{op}` cannot be applied to {found}")]
		InvalidOperand { op: String, found: Ty },
		#[error("`{construct}` condition must be a simple type, found {found}")]
		InvalidCondition { construct: &'static str, found: Ty },
		#[error("cannot print a value of type {found}")]
		NotPrintable { found: Ty },
		#[error("cannot assign {value} to `{name}` of type {target}")]
		AssignmentTypeMismatch {
			name: Symbol,
			target: Ty,
			value: Ty,
		},

		#[error("routine `{routine}` is applied to too many arguments")]
		NotAFunction { routine: Symbol },
		#[error("routine `{routine}` is applied to too few arguments")]
		ArgumentCountMismatch { routine: Symbol },
		#[error("argument {position} of `{routine}` expects {expected}, found {found}")]
		ArgumentTypeMismatch {
			routine: Symbol,
			position: usize,
			expected: Ty,
			found: Ty,
		},
		#[error("routine `{routine}` returns {first} and {other}")]
		InconsistentReturnTypes { routine: Symbol, first: Ty, other: Ty },
		#[error("routine `{routine}` is declared to return {declared} but returns {inferred}")]
		ReturnTypeMismatch {
			routine: Symbol,
			declared: Ty,
			inferred: Ty,
		},
	}

	impl TypeError {
		#[must_use]
		pub const fn kind(&self) -> ErrorKind {
			match self {
				Self::UnderSpecifiedDeclaration { .. }
				| Self::UntypedParameter { .. }
				| Self::DeclarationTypeMismatch { .. }
				| Self::ArraySizeNotInt { .. }
				| Self::DuplicateField { .. } => ErrorKind::Declaration,
				Self::UndeclaredName(_)
				| Self::UndeclaredRoutine(_)
				| Self::NotCallable(_)
				| Self::NotAssignable(_)
				| Self::NotAFunction { .. }
				| Self::ArgumentCountMismatch { .. }
				| Self::ArgumentTypeMismatch { .. } => ErrorKind::Resolution,
				Self::NotARecord { .. }
				| Self::UnknownField { .. }
				| Self::NotIndexable(_)
				| Self::IndexNotInt { .. }
				| Self::InvalidOperand { .. }
				| Self::InvalidCondition { .. }
				| Self::NotPrintable { .. }
				| Self::AssignmentTypeMismatch { .. }
				| Self::InconsistentReturnTypes { .. }
				| Self::ReturnTypeMismatch { .. } => ErrorKind::Compatibility,
			}
		}
	}
}

#[cfg(feature = "llvm")]
pub mod codegen {
	use inkwell::builder::BuilderError;

	#[derive(Debug, thiserror::Error)]
	pub enum CodegenError {
		#[error("`{0}` was not type checked")]
		Unchecked(String),
		#[error("`{0}` has no storage")]
		UndeclaredName(String),
		#[error("routine `{0}` is not declared")]
		UndeclaredRoutine(String),
		#[error("routine `{0}` is defined twice")]
		RoutineRedefined(String),

		#[error("global `{0}` must be a simple type")]
		AggregateGlobal(String),
		#[error("initializer of global `{0}` is not a constant")]
		NonConstantInitializer(String),
		#[error("cannot allocate `{name}` of type {ty}")]
		UnsupportedStorage { name: String, ty: String },
		#[error("parameter `{param}` of `{routine}` must be a simple type")]
		UnsupportedParameter { routine: String, param: String },
		#[error("routine `{0}` must return a simple type")]
		UnsupportedReturn(String),

		#[error("`{0}` is an aggregate and cannot be used as a value")]
		AggregateValue(String),
		#[error("`{0}` is a parameter and has no address")]
		NotAddressable(String),
		#[error("`{name}` has no field `{field}`")]
		UnknownField { name: String, field: String },
		#[error("`{0}` is not an array")]
		NotIndexable(String),
		#[error("cannot convert {from} to {to}")]
		UnsupportedCast { from: String, to: String },
		#[error("operator `{op}` cannot be lowered for {found}")]
		InvalidOperand { op: String, found: String },
		#[error("`{construct}` condition cannot be {found}")]
		InvalidCondition { construct: &'static str, found: String },
		#[error("cannot print a value of type {0}")]
		NotPrintable(String),
		#[error("routine `{0}` yields no value")]
		VoidValue(String),
		#[error("routine `{0}` must return a value")]
		ReturnValueMissing(String),
		#[error("routine `{routine}` takes {expected} arguments, {found} given")]
		ArgumentCountMismatch {
			routine: String,
			expected: usize,
			found: usize,
		},

		#[error("intrinsic `{0}` is unavailable")]
		MissingIntrinsic(&'static str),
		#[error("basic block is detached from its function")]
		DetachedBlock,
		#[error("no function is being lowered")]
		OutsideFunction,
		#[error("invalid module: {0}")]
		InvalidModule(String),
		#[error("cannot write module: {0}")]
		Emit(String),
		#[error(transparent)]
		Builder(#[from] BuilderError),
	}
}
