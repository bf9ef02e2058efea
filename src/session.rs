//! Common data shared by every pass

use std::{fmt, path::PathBuf, process, sync::LazyLock};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer};
use string_interner::{StringInterner, Symbol as _, backend::StringBackend, symbol::SymbolU32};

use crate::errors::Error;

static INTERNER: LazyLock<RwLock<StringInterner<StringBackend>>> = LazyLock::new(RwLock::default);

/// An interned name. Cheap to copy, compare and hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(SymbolU32);

impl Symbol {
	#[must_use]
	pub fn intern(symbol: &str) -> Self {
		Self(INTERNER.write().get_or_intern(symbol))
	}

	#[must_use]
	pub fn resolve(self) -> String {
		INTERNER
			.read()
			.resolve(self.0)
			.map_or_else(|| format!("#{}", self.0.to_usize()), ToOwned::to_owned)
	}
}

impl From<&str> for Symbol {
	fn from(value: &str) -> Self {
		Self::intern(value)
	}
}

impl fmt::Debug for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "i`{}`", self.resolve())
	}
}

impl fmt::Display for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.resolve())
	}
}

impl<'de> Deserialize<'de> for Symbol {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let name = String::deserialize(deserializer)?;
		Ok(Self::intern(&name))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PrintKind {
	/// Deserialized syntax tree
	Ast,
	/// Backend IR, one function at a time
	#[value(name = "bir")]
	BackendIr,
}

#[derive(Debug, Clone)]
pub struct Options {
	pub input: Option<PathBuf>,
	pub output: PathBuf,
	pub print: Vec<PrintKind>,

	/// Compare simple types exactly instead of casting between them
	pub strict_types: bool,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			input: None,
			output: PathBuf::from("ir.ll"),
			print: Vec::new(),
			strict_types: false,
		}
	}
}

#[derive(Debug, Default)]
pub struct SessionCtx {
	pub options: Options,
}

impl SessionCtx {
	#[must_use]
	pub const fn new(options: Options) -> Self {
		Self { options }
	}

	/// Reports the error that stopped the pipeline and exits.
	pub fn emit_fatal(&self, error: &Error) -> ! {
		tracing::debug!(?error, "aborting compilation");
		eprintln!("error[{}]: {error}", error.kind());
		process::exit(1)
	}
}
