//! Type model and type checking

use std::fmt;

use serde::Deserialize;

use crate::{
	ast::Expr,
	errors::ty::TypeError,
	resolve::Environment,
	session::{SessionCtx, Symbol},
};

mod typeck;

type Result<T> = std::result::Result<T, TypeError>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Ty {
	Int,
	Real,
	Bool,
	/// Result of a routine that never returns a value
	Empty,

	Array {
		elem: Box<Ty>,
		size: Box<Expr>,
	},
	Record {
		fields: Vec<Field>,
	},
	/// Curried routine type, one parameter per arrow
	Function {
		from: Box<Ty>,
		to: Box<Ty>,
	},
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Field {
	pub name: Symbol,
	pub ty: Ty,
}

impl Field {
	#[must_use]
	pub fn new(name: &str, ty: Ty) -> Self {
		Self {
			name: Symbol::intern(name),
			ty,
		}
	}
}

impl Ty {
	#[must_use]
	pub fn array(elem: Self, size: Expr) -> Self {
		Self::Array {
			elem: Box::new(elem),
			size: Box::new(size),
		}
	}

	#[must_use]
	pub const fn record(fields: Vec<Field>) -> Self {
		Self::Record { fields }
	}

	/// Folds parameter types into `p1 -> (p2 -> ... -> ret)`
	#[must_use]
	pub fn curried<I>(params: I, ret: Self) -> Self
	where
		I: IntoIterator<Item = Self>,
		I::IntoIter: DoubleEndedIterator,
	{
		params.into_iter().rev().fold(ret, |to, from| Self::Function {
			from: Box::new(from),
			to: Box::new(to),
		})
	}

	/// Int, Real and Bool
	#[must_use]
	pub const fn is_simple(&self) -> bool {
		matches!(self, Self::Int | Self::Real | Self::Bool)
	}

	#[must_use]
	pub fn field(&self, name: Symbol) -> Option<&Self> {
		match self {
			Self::Record { fields } => fields.iter().find(|f| f.name == name).map(|f| &f.ty),
			_ => None,
		}
	}
}

impl fmt::Display for Ty {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int => f.write_str("integer"),
			Self::Real => f.write_str("real"),
			Self::Bool => f.write_str("boolean"),
			Self::Empty => f.write_str("empty"),
			Self::Array { elem, .. } => write!(f, "array of {elem}"),
			Self::Record { fields } => {
				f.write_str("record {")?;
				for (i, field) in fields.iter().enumerate() {
					if i != 0 {
						f.write_str(",")?;
					}
					write!(f, " {}: {}", field.name, field.ty)?;
				}
				f.write_str(" }")
			}
			Self::Function { from, to } => write!(f, "({from} -> {to})"),
		}
	}
}

/// How strictly two types are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equality {
	/// Simple types are interchangeable, a warning is emitted
	Loose,
	Exact,
}

/// Checks a [`Program`](crate::ast::Program) and records resolved types on its nodes.
#[derive(Debug)]
pub struct TyCtx<'scx> {
	scx: &'scx SessionCtx,

	env: Environment,
	/// Types of the return statements met in the routine being checked
	returns: Vec<Ty>,
}

impl<'scx> TyCtx<'scx> {
	#[must_use]
	pub fn new(scx: &'scx SessionCtx) -> Self {
		Self {
			scx,
			env: Environment::default(),
			returns: Vec::new(),
		}
	}
}

impl TyCtx<'_> {
	/// Runs `f` in a nested scope. Bindings pushed inside are dropped on exit, even on error.
	fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		let mark = self.env.len();
		let res = f(self);
		self.env.truncate(mark);
		res
	}
}

/// Unification
impl TyCtx<'_> {
	fn ty_equal(&self, expected: &Ty, actual: &Ty, equality: Equality) -> bool {
		let equality = if self.scx.options.strict_types {
			Equality::Exact
		} else {
			equality
		};

		match (expected, actual) {
			(Ty::Int, Ty::Int) | (Ty::Real, Ty::Real) | (Ty::Bool, Ty::Bool) | (Ty::Empty, Ty::Empty) => {
				true
			}
			(a, b) if a.is_simple() && b.is_simple() => {
				if equality == Equality::Loose {
					tracing::warn!(%expected, %actual, "implicit cast between simple types");
				}
				equality == Equality::Loose
			}
			(Ty::Array { elem: a, .. }, Ty::Array { elem: b, .. }) => self.ty_equal(a, b, equality),
			(Ty::Record { fields: a }, Ty::Record { fields: b }) => {
				a.len() == b.len()
					&& a.iter()
						.zip(b)
						.all(|(a, b)| self.ty_equal(&a.ty, &b.ty, equality))
			}
			(Ty::Function { from: fa, to: ta }, Ty::Function { from: fb, to: tb }) => {
				self.ty_equal(fa, fb, equality) && self.ty_equal(ta, tb, equality)
			}
			_ => false,
		}
	}
}
