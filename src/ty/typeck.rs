use std::{collections::HashSet, mem};

use super::{Equality, Result, Ty, TyCtx};
use crate::{
	ast::{
		Assignment, BinaryOp, Body, Call, Expr, ExprKind, Identifier, Literal, OpClass, PrintArg,
		Program, RoutineDecl, Stmt, UnaryOp, VarDecl,
	},
	errors::ty::TypeError,
	resolve::BindingKind,
};

/// Items
impl TyCtx<'_> {
	/// Checks the whole program in source order, leaving the environment empty.
	pub fn check_root(&mut self, program: &Program) -> Result<()> {
		tracing::trace!("check_root");
		let res = self.check_items(program);
		self.env.clear();
		self.returns.clear();
		res
	}

	fn check_items(&mut self, program: &Program) -> Result<()> {
		for var in &program.variables {
			self.check_var_decl(var, BindingKind::Variable)?;
		}

		for ty in program.types.values() {
			self.check_ty_wf(ty)?;
		}

		for routine in &program.routines {
			self.check_routine(routine)?;
		}

		Ok(())
	}

	#[tracing::instrument(level = "trace", skip_all, fields(name = %routine.name))]
	fn check_routine(&mut self, routine: &RoutineDecl) -> Result<()> {
		let mut params = Vec::with_capacity(routine.params.len());
		for param in &routine.params {
			let ty = param.ty.clone().ok_or(TypeError::UntypedParameter {
				routine: routine.name,
				param: param.name,
			})?;
			params.push(ty);
		}

		// declared signatures are visible to their own body
		if let Some(ret) = &routine.ret {
			self.check_ty_wf(ret)?;
			let sig = Ty::curried(params.clone(), ret.clone());
			self.env.bind(routine.name, sig, BindingKind::Routine);
		}

		let outer_returns = mem::take(&mut self.returns);
		let res = self.with_scope(|tcx| {
			for param in &routine.params {
				tcx.check_var_decl(param, BindingKind::Parameter)?;
			}
			tcx.check_body(&routine.body)
		});
		let returns = mem::replace(&mut self.returns, outer_returns);
		res?;

		let mut returns = returns.into_iter();
		let inferred = returns.next().unwrap_or(Ty::Empty);
		for other in returns {
			if !self.ty_equal(&inferred, &other, Equality::Loose) {
				return Err(TypeError::InconsistentReturnTypes {
					routine: routine.name,
					first: inferred,
					other,
				});
			}
		}

		let resolved = match &routine.ret {
			Some(declared) => {
				if !self.ty_equal(declared, &inferred, Equality::Exact) {
					return Err(TypeError::ReturnTypeMismatch {
						routine: routine.name,
						declared: declared.clone(),
						inferred,
					});
				}
				declared.clone()
			}
			None => {
				let sig = Ty::curried(params, inferred.clone());
				self.env.bind(routine.name, sig, BindingKind::Routine);
				inferred
			}
		};

		tracing::debug!(name = %routine.name, ret = %resolved, "resolved routine");
		routine.set_resolved_ret(resolved);
		Ok(())
	}

	fn check_var_decl(&mut self, decl: &VarDecl, kind: BindingKind) -> Result<()> {
		// sizes are typed in place so the generator finds them resolved
		if let Some(declared) = &decl.ty {
			self.check_ty_wf(declared)?;
		}

		let ty = match (&decl.ty, &decl.init) {
			(Some(declared), Some(init)) => {
				let found = self.check_expr(init)?;
				if !self.ty_equal(declared, &found, Equality::Loose) {
					return Err(TypeError::DeclarationTypeMismatch {
						name: decl.name,
						declared: declared.clone(),
						found,
					});
				}
				declared.clone()
			}
			(Some(declared), None) => declared.clone(),
			(None, Some(init)) => self.check_expr(init)?,
			(None, None) => {
				return Err(TypeError::UnderSpecifiedDeclaration { name: decl.name });
			}
		};

		self.env.bind(decl.name, ty, kind);
		Ok(())
	}

	/// Array sizes must be integers and record fields unique
	fn check_ty_wf(&mut self, ty: &Ty) -> Result<()> {
		match ty {
			Ty::Int | Ty::Real | Ty::Bool | Ty::Empty => Ok(()),
			Ty::Array { elem, size } => {
				let found = self.check_expr(size)?;
				if found != Ty::Int {
					return Err(TypeError::ArraySizeNotInt { found });
				}
				self.check_ty_wf(elem)
			}
			Ty::Record { fields } => {
				let mut seen = HashSet::new();
				for field in fields {
					if !seen.insert(field.name) {
						return Err(TypeError::DuplicateField { field: field.name });
					}
					self.check_ty_wf(&field.ty)?;
				}
				Ok(())
			}
			Ty::Function { from, to } => {
				self.check_ty_wf(from)?;
				self.check_ty_wf(to)
			}
		}
	}
}

/// Statements
impl TyCtx<'_> {
	fn check_body(&mut self, body: &Body) -> Result<()> {
		self.with_scope(|tcx| {
			for decl in &body.decls {
				tcx.check_var_decl(decl, BindingKind::Variable)?;
			}
			for stmt in &body.stmts {
				tcx.check_stmt(stmt)?;
			}
			Ok(())
		})
	}

	fn check_stmt(&mut self, stmt: &Stmt) -> Result<()> {
		match stmt {
			Stmt::Assign(assign) => self.check_assignment(assign),
			Stmt::Call(call) => self.check_call(call).map(drop),
			Stmt::Return(value) => {
				if let Some(value) = value {
					let ty = self.check_expr(value)?;
					self.returns.push(ty);
				}
				Ok(())
			}
			Stmt::Print { arg, .. } => match arg {
				PrintArg::Expr(expr) => {
					let found = self.check_expr(expr)?;
					if found.is_simple() {
						Ok(())
					} else {
						Err(TypeError::NotPrintable { found })
					}
				}
				PrintArg::Str(_) => Ok(()),
			},
			Stmt::If {
				cond,
				conseq,
				altern,
			} => {
				self.check_condition(cond, "if")?;
				self.check_body(conseq)?;
				if let Some(altern) = altern {
					self.check_body(altern)?;
				}
				Ok(())
			}
			Stmt::While { cond, body } => {
				self.check_condition(cond, "while")?;
				self.check_body(body)
			}
			Stmt::For {
				var,
				cond,
				step,
				body,
			} => self.with_scope(|tcx| {
				tcx.check_var_decl(var, BindingKind::Variable)?;
				tcx.check_condition(cond, "for")?;
				tcx.check_assignment(step)?;
				tcx.check_body(body)
			}),
		}
	}

	fn check_assignment(&mut self, assign: &Assignment) -> Result<()> {
		let name = assign.target.name;
		match self.env.lookup(name).map(|b| b.kind) {
			Some(BindingKind::Variable) | None => {}
			Some(BindingKind::Parameter | BindingKind::Routine) => {
				return Err(TypeError::NotAssignable(name));
			}
		}

		let target = self.check_identifier(&assign.target)?;
		let value = self.check_expr(&assign.value)?;
		if !self.ty_equal(&target, &value, Equality::Loose) {
			return Err(TypeError::AssignmentTypeMismatch {
				name,
				target,
				value,
			});
		}
		Ok(())
	}

	fn check_condition(&mut self, cond: &Expr, construct: &'static str) -> Result<()> {
		let found = self.check_expr(cond)?;
		if found.is_simple() {
			Ok(())
		} else {
			Err(TypeError::InvalidCondition { construct, found })
		}
	}
}

/// Expressions
impl TyCtx<'_> {
	fn check_expr(&mut self, expr: &Expr) -> Result<Ty> {
		let ty = match &expr.kind {
			ExprKind::Literal(lit) => match lit {
				Literal::Int(_) => Ty::Int,
				Literal::Real(_) => Ty::Real,
				Literal::Bool(_) => Ty::Bool,
			},
			ExprKind::Identifier(ident) => self.check_identifier(ident)?,
			ExprKind::Unary { op, operand } => {
				let found = self.check_expr(operand)?;
				let accepted = match op {
					UnaryOp::Neg => matches!(found, Ty::Int | Ty::Real),
					UnaryOp::Not => found == Ty::Bool,
				};
				if !accepted {
					return Err(TypeError::InvalidOperand {
						op: op.to_string(),
						found,
					});
				}
				found
			}
			ExprKind::Binary { op, lhs, rhs } => {
				let lhs = self.check_expr(lhs)?;
				let rhs = self.check_expr(rhs)?;
				Self::check_binary(*op, lhs, rhs)?
			}
			ExprKind::Call(call) => self.check_call(call)?,
		};

		expr.set_ty(ty.clone());
		Ok(ty)
	}

	fn check_binary(op: BinaryOp, lhs: Ty, rhs: Ty) -> Result<Ty> {
		let accepts = |ty: &Ty| match op.class() {
			OpClass::Arithmetic => ty.is_simple(),
			OpClass::Modulo => *ty == Ty::Int,
			OpClass::Logical => *ty == Ty::Bool,
			OpClass::Relational => matches!(ty, Ty::Int | Ty::Real),
		};

		for found in [&lhs, &rhs] {
			if !accepts(found) {
				return Err(TypeError::InvalidOperand {
					op: op.to_string(),
					found: found.clone(),
				});
			}
		}

		Ok(match op.class() {
			OpClass::Arithmetic if lhs == Ty::Int && rhs == Ty::Int => Ty::Int,
			OpClass::Arithmetic => Ty::Real,
			OpClass::Modulo => Ty::Int,
			OpClass::Logical | OpClass::Relational => Ty::Bool,
		})
	}

	fn check_identifier(&mut self, ident: &Identifier) -> Result<Ty> {
		let binding = self
			.env
			.lookup(ident.name)
			.ok_or(TypeError::UndeclaredName(ident.name))?;

		let mut ty = binding.ty.clone();
		for &field in &ident.fields {
			if !matches!(ty, Ty::Record { .. }) {
				return Err(TypeError::NotARecord {
					name: ident.name,
					field,
					found: ty,
				});
			}
			ty = ty.field(field).cloned().ok_or(TypeError::UnknownField {
				name: ident.name,
				field,
			})?;
		}

		if let Some(index) = &ident.index {
			let found = self.check_expr(index)?;
			if found != Ty::Int {
				return Err(TypeError::IndexNotInt {
					name: ident.name,
					found,
				});
			}
			ty = match ty {
				Ty::Array { elem, .. } => *elem,
				_ => return Err(TypeError::NotIndexable(ident.name)),
			};
		}

		Ok(ty)
	}

	/// Applies the arguments one by one to the curried routine type
	fn check_call(&mut self, call: &Call) -> Result<Ty> {
		let binding = self
			.env
			.lookup(call.callee)
			.ok_or(TypeError::UndeclaredRoutine(call.callee))?;
		if binding.kind != BindingKind::Routine {
			return Err(TypeError::NotCallable(call.callee));
		}

		let mut ty = binding.ty.clone();
		for (position, arg) in call.args.iter().enumerate() {
			let Ty::Function { from, to } = ty else {
				return Err(TypeError::NotAFunction {
					routine: call.callee,
				});
			};
			let found = self.check_expr(arg)?;
			if !self.ty_equal(&from, &found, Equality::Loose) {
				return Err(TypeError::ArgumentTypeMismatch {
					routine: call.callee,
					position,
					expected: *from,
					found,
				});
			}
			ty = *to;
		}

		if matches!(ty, Ty::Function { .. }) {
			return Err(TypeError::ArgumentCountMismatch {
				routine: call.callee,
			});
		}
		Ok(ty)
	}
}
