//! Syntax tree handed over by the parser
//!
//! Every node deserializes from JSON so the front-end can live in another process.
//! Declarations are kept in source order.

use std::{cell::OnceCell, collections::HashMap, fmt};

use serde::Deserialize;

use crate::{session::Symbol, ty::Ty};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Program {
	#[serde(default)]
	pub variables: Vec<VarDecl>,
	/// Named type aliases, validated but never substituted
	#[serde(default)]
	pub types: HashMap<Symbol, Ty>,
	#[serde(default)]
	pub routines: Vec<RoutineDecl>,
}

impl Program {
	#[must_use]
	pub fn new(variables: Vec<VarDecl>, routines: Vec<RoutineDecl>) -> Self {
		Self {
			variables,
			types: HashMap::new(),
			routines,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VarDecl {
	pub name: Symbol,
	pub ty: Option<Ty>,
	pub init: Option<Expr>,
}

impl VarDecl {
	#[must_use]
	pub fn new(name: &str, ty: Option<Ty>, init: Option<Expr>) -> Self {
		Self {
			name: Symbol::intern(name),
			ty,
			init,
		}
	}

	#[must_use]
	pub fn typed(name: &str, ty: Ty) -> Self {
		Self::new(name, Some(ty), None)
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoutineDecl {
	pub name: Symbol,
	#[serde(default)]
	pub params: Vec<VarDecl>,
	/// Declared return type, inferred from the body when absent
	#[serde(default)]
	pub ret: Option<Ty>,
	pub body: Body,

	#[serde(skip)]
	resolved_ret: OnceCell<Ty>,
}

impl RoutineDecl {
	#[must_use]
	pub fn new(name: &str, params: Vec<VarDecl>, ret: Option<Ty>, body: Body) -> Self {
		Self {
			name: Symbol::intern(name),
			params,
			ret,
			body,
			resolved_ret: OnceCell::new(),
		}
	}

	/// Return type settled by the type checker
	#[must_use]
	pub fn resolved_ret(&self) -> Option<&Ty> {
		self.resolved_ret.get()
	}

	pub(crate) fn set_resolved_ret(&self, ty: Ty) {
		_ = self.resolved_ret.set(ty);
	}
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Body {
	#[serde(default)]
	pub decls: Vec<VarDecl>,
	#[serde(default)]
	pub stmts: Vec<Stmt>,
}

impl Body {
	#[must_use]
	pub const fn new(decls: Vec<VarDecl>, stmts: Vec<Stmt>) -> Self {
		Self { decls, stmts }
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Stmt {
	Assign(Assignment),
	Call(Call),
	Return(Option<Expr>),
	Print {
		arg: PrintArg,
		#[serde(default)]
		newline: bool,
	},
	If {
		cond: Expr,
		conseq: Body,
		#[serde(default)]
		altern: Option<Body>,
	},
	While {
		cond: Expr,
		body: Body,
	},
	For {
		var: VarDecl,
		cond: Expr,
		step: Assignment,
		body: Body,
	},
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Assignment {
	pub target: Identifier,
	pub value: Expr,
}

impl Assignment {
	#[must_use]
	pub const fn new(target: Identifier, value: Expr) -> Self {
		Self { target, value }
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Call {
	pub callee: Symbol,
	#[serde(default)]
	pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum PrintArg {
	Expr(Expr),
	Str(String),
}

/// A variable reference, optionally narrowed through record fields and a final index.
///
/// `p.pos.x` is `{ name: p, fields: [pos, x] }` and `a[i]` is `{ name: a, index: i }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Identifier {
	pub name: Symbol,
	#[serde(default)]
	pub fields: Vec<Symbol>,
	#[serde(default)]
	pub index: Option<Box<Expr>>,
}

impl Identifier {
	#[must_use]
	pub fn new(name: &str) -> Self {
		Self {
			name: Symbol::intern(name),
			fields: Vec::new(),
			index: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: &str) -> Self {
		self.fields.push(Symbol::intern(field));
		self
	}

	#[must_use]
	pub fn index(mut self, index: Expr) -> Self {
		self.index = Some(Box::new(index));
		self
	}
}

impl fmt::Display for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name)?;
		for field in &self.fields {
			write!(f, ".{field}")?;
		}
		if self.index.is_some() {
			f.write_str("[..]")?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ExprKind")]
pub struct Expr {
	pub kind: ExprKind,
	ty: OnceCell<Ty>,
}

impl Expr {
	#[must_use]
	pub const fn new(kind: ExprKind) -> Self {
		Self {
			kind,
			ty: OnceCell::new(),
		}
	}

	/// Type resolved by the checker, `None` before checking
	#[must_use]
	pub fn ty(&self) -> Option<&Ty> {
		self.ty.get()
	}

	pub(crate) fn set_ty(&self, ty: Ty) {
		_ = self.ty.set(ty);
	}

	#[must_use]
	pub const fn int(value: i64) -> Self {
		Self::new(ExprKind::Literal(Literal::Int(value)))
	}

	#[must_use]
	pub const fn real(value: f64) -> Self {
		Self::new(ExprKind::Literal(Literal::Real(value)))
	}

	#[must_use]
	pub const fn bool(value: bool) -> Self {
		Self::new(ExprKind::Literal(Literal::Bool(value)))
	}

	#[must_use]
	pub fn var(name: &str) -> Self {
		Self::new(ExprKind::Identifier(Identifier::new(name)))
	}

	#[must_use]
	pub const fn ident(ident: Identifier) -> Self {
		Self::new(ExprKind::Identifier(ident))
	}

	#[must_use]
	pub fn unary(op: UnaryOp, operand: Self) -> Self {
		Self::new(ExprKind::Unary {
			op,
			operand: Box::new(operand),
		})
	}

	#[must_use]
	pub fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
		Self::new(ExprKind::Binary {
			op,
			lhs: Box::new(lhs),
			rhs: Box::new(rhs),
		})
	}

	#[must_use]
	pub fn call(callee: &str, args: Vec<Self>) -> Self {
		Self::new(ExprKind::Call(Call {
			callee: Symbol::intern(callee),
			args,
		}))
	}
}

impl From<ExprKind> for Expr {
	fn from(kind: ExprKind) -> Self {
		Self::new(kind)
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum ExprKind {
	Literal(Literal),
	Identifier(Identifier),
	Unary {
		op: UnaryOp,
		operand: Box<Expr>,
	},
	Binary {
		op: BinaryOp,
		lhs: Box<Expr>,
		rhs: Box<Expr>,
	},
	Call(Call),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum Literal {
	Int(i64),
	Real(f64),
	Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnaryOp {
	Neg,
	Not,
}

impl fmt::Display for UnaryOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Neg => "-",
			Self::Not => "not",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BinaryOp {
	Plus,
	Minus,
	Mul,
	Div,
	Mod,

	And,
	Or,
	Xor,

	Eq,
	Ne,
	Lt,
	Gt,
	Le,
	Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
	/// `+ - * /` over numbers
	Arithmetic,
	/// `%`, integers only
	Modulo,
	/// `and or xor` over booleans
	Logical,
	/// comparisons over numbers, yields a boolean
	Relational,
}

impl BinaryOp {
	#[must_use]
	pub const fn class(self) -> OpClass {
		match self {
			Self::Plus | Self::Minus | Self::Mul | Self::Div => OpClass::Arithmetic,
			Self::Mod => OpClass::Modulo,
			Self::And | Self::Or | Self::Xor => OpClass::Logical,
			Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge => OpClass::Relational,
		}
	}
}

impl fmt::Display for BinaryOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Plus => "+",
			Self::Minus => "-",
			Self::Mul => "*",
			Self::Div => "/",
			Self::Mod => "%",
			Self::And => "and",
			Self::Or => "or",
			Self::Xor => "xor",
			Self::Eq => "=",
			Self::Ne => "/=",
			Self::Lt => "<",
			Self::Gt => ">",
			Self::Le => "<=",
			Self::Ge => ">=",
		})
	}
}
