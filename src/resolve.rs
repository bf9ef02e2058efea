//! Name resolution for the type checker
//!
//! Scopes are a single ordered list of bindings: lookups walk it from the end, so the most
//! recent binding of a name shadows older ones. Leaving a scope truncates the list back to
//! its length on entry.

use crate::{session::Symbol, ty::Ty};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
	Variable,
	Parameter,
	Routine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
	pub name: Symbol,
	pub ty: Ty,
	pub kind: BindingKind,
}

#[derive(Debug, Default)]
pub struct Environment {
	bindings: Vec<Binding>,
}

impl Environment {
	pub fn bind(&mut self, name: Symbol, ty: Ty, kind: BindingKind) {
		tracing::trace!(%name, %ty, ?kind, "bind");
		self.bindings.push(Binding { name, ty, kind });
	}

	#[must_use]
	pub fn lookup(&self, name: Symbol) -> Option<&Binding> {
		self.bindings.iter().rev().find(|b| b.name == name)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}

	pub fn truncate(&mut self, len: usize) {
		self.bindings.truncate(len);
	}

	pub fn clear(&mut self) {
		self.bindings.clear();
	}
}
