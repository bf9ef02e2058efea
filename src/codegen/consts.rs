//! Compile-time evaluation of global initializers

use crate::{
	ast::{BinaryOp, Expr, ExprKind, Literal, OpClass, UnaryOp},
	ty::Ty,
};

use super::Repr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Const {
	Int(i64),
	Real(f64),
	Bool(bool),
}

impl Const {
	#[must_use]
	pub const fn repr(self) -> Repr {
		match self {
			Self::Int(_) => Repr::Int,
			Self::Real(_) => Repr::Real,
			Self::Bool(_) => Repr::Bool,
		}
	}

	/// Same conversions as the ones emitted at run time
	#[must_use]
	#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
	pub fn convert(self, to: Repr) -> Self {
		match (self, to) {
			(Self::Int(v), Repr::Real) => Self::Real(v as f64),
			(Self::Int(v), Repr::Bool) => Self::Bool(v != 0),
			(Self::Real(v), Repr::Int) => Self::Int(v.round() as i64),
			(Self::Real(v), Repr::Bool) => Self::Bool(v != 0.0),
			(Self::Bool(v), Repr::Int) => Self::Int(i64::from(v)),
			(Self::Bool(v), Repr::Real) => Self::Real(f64::from(u8::from(v))),
			(value, _) => value,
		}
	}

	const fn as_bool(self) -> Option<bool> {
		match self {
			Self::Bool(v) => Some(v),
			_ => None,
		}
	}
}

impl From<Literal> for Const {
	fn from(lit: Literal) -> Self {
		match lit {
			Literal::Int(v) => Self::Int(v),
			Literal::Real(v) => Self::Real(v),
			Literal::Bool(v) => Self::Bool(v),
		}
	}
}

/// Folds `expr` into a constant, `None` when it depends on run-time values.
#[must_use]
pub fn const_eval(expr: &Expr) -> Option<Const> {
	match &expr.kind {
		ExprKind::Literal(lit) => Some(Const::from(*lit)),
		ExprKind::Unary { op, operand } => match (op, const_eval(operand)?) {
			(UnaryOp::Neg, Const::Int(v)) => Some(Const::Int(v.wrapping_neg())),
			(UnaryOp::Neg, Const::Real(v)) => Some(Const::Real(-v)),
			(UnaryOp::Not, Const::Bool(v)) => Some(Const::Bool(!v)),
			_ => None,
		},
		ExprKind::Binary { op, lhs, rhs } => {
			let lhs = const_eval(lhs)?;
			let rhs = const_eval(rhs)?;
			eval_binary(*op, lhs, rhs, expr.ty())
		}
		ExprKind::Identifier(_) | ExprKind::Call(_) => None,
	}
}

/// `result` is the type resolved by the checker, which may widen simple operands to `Real`
fn eval_binary(op: BinaryOp, lhs: Const, rhs: Const, result: Option<&Ty>) -> Option<Const> {
	match op.class() {
		OpClass::Logical => {
			let (lhs, rhs) = (lhs.as_bool()?, rhs.as_bool()?);
			Some(Const::Bool(match op {
				BinaryOp::And => lhs && rhs,
				BinaryOp::Or => lhs || rhs,
				_ => lhs ^ rhs,
			}))
		}
		OpClass::Modulo => match (lhs, rhs) {
			(Const::Int(lhs), Const::Int(rhs)) => lhs.checked_rem(rhs).map(Const::Int),
			_ => None,
		},
		OpClass::Arithmetic | OpClass::Relational => {
			let real = matches!(result, Some(Ty::Real))
				|| matches!(lhs, Const::Real(_))
				|| matches!(rhs, Const::Real(_));
			let to = if real { Repr::Real } else { Repr::Int };
			match (lhs.convert(to), rhs.convert(to)) {
				(Const::Int(lhs), Const::Int(rhs)) => int_binary(op, lhs, rhs),
				(Const::Real(lhs), Const::Real(rhs)) => real_binary(op, lhs, rhs),
				_ => None,
			}
		}
	}
}

fn int_binary(op: BinaryOp, lhs: i64, rhs: i64) -> Option<Const> {
	Some(match op {
		BinaryOp::Plus => Const::Int(lhs.wrapping_add(rhs)),
		BinaryOp::Minus => Const::Int(lhs.wrapping_sub(rhs)),
		BinaryOp::Mul => Const::Int(lhs.wrapping_mul(rhs)),
		BinaryOp::Div => Const::Int(lhs.checked_div(rhs)?),
		BinaryOp::Eq => Const::Bool(lhs == rhs),
		BinaryOp::Ne => Const::Bool(lhs != rhs),
		BinaryOp::Lt => Const::Bool(lhs < rhs),
		BinaryOp::Gt => Const::Bool(lhs > rhs),
		BinaryOp::Le => Const::Bool(lhs <= rhs),
		BinaryOp::Ge => Const::Bool(lhs >= rhs),
		BinaryOp::Mod | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => return None,
	})
}

#[expect(clippy::float_cmp)]
fn real_binary(op: BinaryOp, lhs: f64, rhs: f64) -> Option<Const> {
	Some(match op {
		BinaryOp::Plus => Const::Real(lhs + rhs),
		BinaryOp::Minus => Const::Real(lhs - rhs),
		BinaryOp::Mul => Const::Real(lhs * rhs),
		BinaryOp::Div => Const::Real(lhs / rhs),
		BinaryOp::Eq => Const::Bool(lhs == rhs),
		BinaryOp::Ne => Const::Bool(lhs != rhs),
		BinaryOp::Lt => Const::Bool(lhs < rhs),
		BinaryOp::Gt => Const::Bool(lhs > rhs),
		BinaryOp::Le => Const::Bool(lhs <= rhs),
		BinaryOp::Ge => Const::Bool(lhs >= rhs),
		BinaryOp::Mod | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => return None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn folds_mixed_arithmetic() {
		let expr = Expr::binary(
			BinaryOp::Plus,
			Expr::int(2),
			Expr::binary(BinaryOp::Mul, Expr::real(1.5), Expr::int(2)),
		);
		assert_eq!(const_eval(&expr), Some(Const::Real(5.0)));
	}

	#[test]
	fn folds_negation_and_logic() {
		let expr = Expr::unary(UnaryOp::Neg, Expr::int(7));
		assert_eq!(const_eval(&expr), Some(Const::Int(-7)));

		let expr = Expr::binary(
			BinaryOp::Xor,
			Expr::bool(true),
			Expr::unary(UnaryOp::Not, Expr::bool(true)),
		);
		assert_eq!(const_eval(&expr), Some(Const::Bool(true)));

		let expr = Expr::binary(BinaryOp::Lt, Expr::int(1), Expr::real(0.5));
		assert_eq!(const_eval(&expr), Some(Const::Bool(false)));
	}

	#[test]
	fn runtime_values_are_not_constant() {
		assert_eq!(const_eval(&Expr::var("n")), None);
		assert_eq!(const_eval(&Expr::call("f", vec![])), None);
		let div = Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0));
		assert_eq!(const_eval(&div), None);
	}

	#[test]
	fn follows_resolved_result_type() {
		let expr = Expr::binary(BinaryOp::Div, Expr::bool(true), Expr::int(2));
		assert_eq!(const_eval(&expr), Some(Const::Int(0)));

		expr.set_ty(Ty::Real);
		assert_eq!(const_eval(&expr), Some(Const::Real(0.5)));
	}

	#[test]
	fn conversions_round_reals() {
		assert_eq!(Const::Real(2.5).convert(Repr::Int), Const::Int(3));
		assert_eq!(Const::Real(-1.4).convert(Repr::Int), Const::Int(-1));
		assert_eq!(Const::Bool(true).convert(Repr::Real), Const::Real(1.0));
		assert_eq!(Const::Int(0).convert(Repr::Bool), Const::Bool(false));
	}
}
