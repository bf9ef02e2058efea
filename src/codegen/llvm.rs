use std::{collections::HashMap, path::Path};

use inkwell::{
	AddressSpace, FloatPredicate, IntPredicate,
	basic_block::BasicBlock,
	builder::Builder,
	context::Context,
	intrinsics::Intrinsic,
	module::{Linkage, Module},
	targets::TargetMachine,
	types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum},
	values::{BasicMetadataValueEnum, BasicValueEnum, FloatValue, FunctionValue, IntValue, PointerValue},
};

use super::{
	CodeGenBackend, Repr, Result,
	consts::{self, Const},
};
use crate::{
	ast::{
		Assignment, BinaryOp, Body, Call, Expr, ExprKind, Identifier, OpClass, PrintArg, Program,
		RoutineDecl, Stmt, UnaryOp, VarDecl,
	},
	errors::codegen::CodegenError,
	session::{PrintKind, SessionCtx, Symbol},
	ty::Ty,
};

/// Where a name lives at run time
#[derive(Debug, Clone)]
enum Storage<'ctx> {
	Slot {
		ptr: PointerValue<'ctx>,
		repr: Repr,
	},
	Array {
		ptr: PointerValue<'ctx>,
		elem: Repr,
	},
	/// One storage per field, in declaration order
	Record(Vec<(Symbol, Storage<'ctx>)>),
	/// Parameters are used as SSA values directly
	Param {
		value: BasicValueEnum<'ctx>,
		repr: Repr,
	},
}

enum Place<'ctx> {
	Address { ptr: PointerValue<'ctx>, repr: Repr },
	Value(BasicValueEnum<'ctx>),
}

#[derive(Debug, Clone)]
struct Signature<'ctx> {
	value: FunctionValue<'ctx>,
	params: Vec<Repr>,
	ret: Option<Repr>,
}

#[derive(Debug, Clone, Copy)]
struct Formats<'ctx> {
	int: PointerValue<'ctx>,
	real: PointerValue<'ctx>,
	str: PointerValue<'ctx>,
	newline: PointerValue<'ctx>,
}

pub struct Generator<'scx, 'ctx> {
	scx: &'scx SessionCtx,

	ctx: &'ctx Context,
	builder: Builder<'ctx>,
	module: Module<'ctx>,

	globals: HashMap<Symbol, Storage<'ctx>>,
	locals: HashMap<Symbol, Storage<'ctx>>,
	routines: HashMap<Symbol, Signature<'ctx>>,

	/// Routine being lowered
	current: Option<(Symbol, Signature<'ctx>)>,
	formats: Option<Formats<'ctx>>,
}

impl<'scx, 'ctx> Generator<'scx, 'ctx> {
	pub fn new(scx: &'scx SessionCtx, ctx: &'ctx Context, name: &str) -> Self {
		let module = ctx.create_module(name);
		module.set_triple(&TargetMachine::get_default_triple());

		Self {
			scx,

			ctx,
			builder: ctx.create_builder(),
			module,

			globals: HashMap::new(),
			locals: HashMap::new(),
			routines: HashMap::new(),

			current: None,
			formats: None,
		}
	}
}

impl<'ctx> CodeGenBackend for Generator<'_, 'ctx> {
	fn codegen_root(&mut self, program: &Program) -> Result<()> {
		for var in &program.variables {
			self.codegen_global(var)?;
		}

		// every signature is known before the first body is lowered
		for routine in &program.routines {
			self.declare_routine(routine)?;
		}
		for routine in &program.routines {
			self.define_routine(routine)?;
		}

		Ok(())
	}

	fn verify(&self) -> Result<()> {
		self.module
			.verify()
			.map_err(|err| CodegenError::InvalidModule(err.to_string()))
	}

	fn to_ir(&self) -> String {
		self.module.print_to_string().to_string()
	}

	fn write_ir(&self, path: &Path) -> Result<()> {
		self.module
			.print_to_file(path)
			.map_err(|err| CodegenError::Emit(err.to_string()))
	}
}

/// Items
impl<'ctx> Generator<'_, 'ctx> {
	fn codegen_global(&mut self, decl: &VarDecl) -> Result<()> {
		let name = decl.name.resolve();
		let ty = decl
			.ty
			.as_ref()
			.or_else(|| decl.init.as_ref().and_then(Expr::ty))
			.ok_or_else(|| CodegenError::Unchecked(name.clone()))?;
		let repr = Repr::of_ty(ty).ok_or_else(|| CodegenError::AggregateGlobal(name.clone()))?;

		let init = match &decl.init {
			Some(init) => consts::const_eval(init)
				.ok_or_else(|| CodegenError::NonConstantInitializer(name.clone()))?
				.convert(repr),
			None => Const::Int(0).convert(repr),
		};

		let global = self.module.add_global(self.llvm_ty(repr), None, &name);
		global.set_linkage(Linkage::External);
		global.set_initializer(&self.const_value(init));
		tracing::debug!(%name, ?init, "emitted global");

		self.globals.insert(
			decl.name,
			Storage::Slot {
				ptr: global.as_pointer_value(),
				repr,
			},
		);
		Ok(())
	}

	fn declare_routine(&mut self, routine: &RoutineDecl) -> Result<()> {
		let name = routine.name.resolve();
		if self.routines.contains_key(&routine.name) {
			return Err(CodegenError::RoutineRedefined(name));
		}

		let params = routine
			.params
			.iter()
			.map(|param| {
				param.ty.as_ref().and_then(Repr::of_ty).ok_or_else(|| {
					CodegenError::UnsupportedParameter {
						routine: name.clone(),
						param: param.name.resolve(),
					}
				})
			})
			.collect::<Result<Vec<_>>>()?;
		let ret = match routine
			.resolved_ret()
			.ok_or_else(|| CodegenError::Unchecked(name.clone()))?
		{
			Ty::Empty => None,
			ty => Some(Repr::of_ty(ty).ok_or_else(|| CodegenError::UnsupportedReturn(name.clone()))?),
		};

		let param_tys = params
			.iter()
			.map(|&repr| self.llvm_ty(repr).into())
			.collect::<Vec<BasicMetadataTypeEnum>>();
		let fn_ty = match ret {
			Some(repr) => self.llvm_ty(repr).fn_type(&param_tys, false),
			None => self.ctx.void_type().fn_type(&param_tys, false),
		};
		let value = self
			.module
			.add_function(&name, fn_ty, Some(Linkage::External));

		// set arguments name
		for (arg, param) in value.get_param_iter().zip(&routine.params) {
			let param = param.name.resolve();
			match arg {
				BasicValueEnum::IntValue(arg) => arg.set_name(&param),
				BasicValueEnum::FloatValue(arg) => arg.set_name(&param),
				_ => {}
			}
		}

		self.routines
			.insert(routine.name, Signature { value, params, ret });
		Ok(())
	}

	#[tracing::instrument(level = "trace", skip_all, fields(name = %routine.name))]
	fn define_routine(&mut self, routine: &RoutineDecl) -> Result<()> {
		let sig = self
			.routines
			.get(&routine.name)
			.cloned()
			.ok_or_else(|| CodegenError::UndeclaredRoutine(routine.name.resolve()))?;

		let entry = self.ctx.append_basic_block(sig.value, "entry");
		self.builder.position_at_end(entry);

		self.locals.clear();
		for ((param, value), &repr) in routine
			.params
			.iter()
			.zip(sig.value.get_param_iter())
			.zip(&sig.params)
		{
			self.locals.insert(param.name, Storage::Param { value, repr });
		}
		self.current = Some((routine.name, sig.clone()));

		self.codegen_body(&routine.body)?;

		// falling off the end
		if !self.is_terminated() {
			match sig.ret {
				Some(repr) => self.builder.build_return(Some(&self.zero(repr)))?,
				None => self.builder.build_return(None)?,
			};
		}
		self.current = None;

		if !sig.value.verify(false) {
			tracing::warn!(name = %routine.name, "emitted function is invalid");
		}
		if self.scx.options.print.contains(&PrintKind::BackendIr) {
			sig.value.print_to_stderr();
		}

		Ok(())
	}
}

/// Storage
impl<'ctx> Generator<'_, 'ctx> {
	fn codegen_local(&mut self, decl: &VarDecl) -> Result<()> {
		let name = decl.name.resolve();
		let ty = decl
			.ty
			.as_ref()
			.or_else(|| decl.init.as_ref().and_then(Expr::ty))
			.ok_or_else(|| CodegenError::Unchecked(name.clone()))?;

		// the initializer cannot see the variable it initializes
		let init = match &decl.init {
			Some(init) => Some(self.codegen_expr(init)?),
			None => None,
		};

		let storage = self.alloc_storage(&name, ty)?;
		if let Some(value) = init {
			let Storage::Slot { ptr, repr } = storage else {
				return Err(CodegenError::AggregateValue(name));
			};
			let value = self.coerce(value, repr)?;
			self.builder.build_store(ptr, value)?;
		}

		self.locals.insert(decl.name, storage);
		Ok(())
	}

	fn alloc_storage(&mut self, name: &str, ty: &Ty) -> Result<Storage<'ctx>> {
		if let Some(repr) = Repr::of_ty(ty) {
			let ptr = self.entry_alloca(self.llvm_ty(repr), name)?;
			return Ok(Storage::Slot { ptr, repr });
		}

		let unsupported = || CodegenError::UnsupportedStorage {
			name: name.to_owned(),
			ty: ty.to_string(),
		};

		match ty {
			Ty::Array { elem, size } => {
				let elem = Repr::of_ty(elem).ok_or_else(unsupported)?;
				let size = self.codegen_expr(size)?;
				let size = self.coerce(size, Repr::Int)?.into_int_value();
				let ptr = self
					.builder
					.build_array_alloca(self.llvm_ty(elem), size, name)?;
				Ok(Storage::Array { ptr, elem })
			}
			Ty::Record { fields } => {
				let mut storages = Vec::with_capacity(fields.len());
				for field in fields {
					let storage = self.alloc_storage(&format!("{name}.{}", field.name), &field.ty)?;
					storages.push((field.name, storage));
				}
				Ok(Storage::Record(storages))
			}
			_ => Err(unsupported()),
		}
	}

	/// Allocas in the entry block are hoisted out of every loop
	fn entry_alloca(&self, ty: BasicTypeEnum<'ctx>, name: &str) -> Result<PointerValue<'ctx>> {
		let entry = self
			.current_fn()?
			.get_first_basic_block()
			.ok_or(CodegenError::DetachedBlock)?;

		let builder = self.ctx.create_builder();
		match entry.get_first_instruction() {
			Some(first) => builder.position_before(&first),
			None => builder.position_at_end(entry),
		}
		Ok(builder.build_alloca(ty, name)?)
	}

	fn lookup(&self, name: Symbol) -> Result<Storage<'ctx>> {
		self.locals
			.get(&name)
			.or_else(|| self.globals.get(&name))
			.cloned()
			.ok_or_else(|| CodegenError::UndeclaredName(name.resolve()))
	}

	fn codegen_place(&mut self, ident: &Identifier) -> Result<Place<'ctx>> {
		let mut storage = self.lookup(ident.name)?;
		for &field in &ident.fields {
			let unknown = || CodegenError::UnknownField {
				name: ident.name.resolve(),
				field: field.resolve(),
			};
			let Storage::Record(fields) = storage else {
				return Err(unknown());
			};
			storage = fields
				.into_iter()
				.find_map(|(name, storage)| (name == field).then_some(storage))
				.ok_or_else(unknown)?;
		}

		match (storage, &ident.index) {
			(Storage::Array { ptr, elem }, Some(index)) => {
				let index = self.codegen_expr(index)?;
				let index = self.coerce(index, Repr::Int)?.into_int_value();
				#[allow(unsafe_code)]
				let ptr = unsafe {
					self.builder.build_gep(ptr, &[index], "elemptr")?
				};
				Ok(Place::Address { ptr, repr: elem })
			}
			(_, Some(_)) => Err(CodegenError::NotIndexable(ident.to_string())),
			(Storage::Slot { ptr, repr }, None) => Ok(Place::Address { ptr, repr }),
			(Storage::Param { value, .. }, None) => Ok(Place::Value(value)),
			(Storage::Array { .. } | Storage::Record(_), None) => {
				Err(CodegenError::AggregateValue(ident.to_string()))
			}
		}
	}
}

/// Statements
impl<'ctx> Generator<'_, 'ctx> {
	/// Lowers a body in its own scope, stopping at the first terminator.
	fn codegen_body(&mut self, body: &Body) -> Result<()> {
		let outer = self.locals.clone();

		for decl in &body.decls {
			self.codegen_local(decl)?;
		}
		for (i, stmt) in body.stmts.iter().enumerate() {
			if self.is_terminated() {
				tracing::trace!(skipped = body.stmts.len() - i, "unreachable statements");
				break;
			}
			self.codegen_stmt(stmt)?;
		}

		self.locals = outer;
		Ok(())
	}

	fn codegen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
		match stmt {
			Stmt::Assign(assign) => self.codegen_assignment(assign),
			Stmt::Call(call) => self.codegen_call(call).map(drop),
			Stmt::Return(value) => self.codegen_return(value.as_ref()),
			Stmt::Print { arg, newline } => self.codegen_print(arg, *newline),
			Stmt::If {
				cond,
				conseq,
				altern,
			} => self.codegen_if(cond, conseq, altern.as_ref()),
			Stmt::While { cond, body } => self.codegen_loop("while", cond, body, None),
			Stmt::For {
				var,
				cond,
				step,
				body,
			} => {
				let outer = self.locals.clone();
				self.codegen_local(var)?;
				self.codegen_loop("for", cond, body, Some(step))?;
				self.locals = outer;
				Ok(())
			}
		}
	}

	fn codegen_assignment(&mut self, assign: &Assignment) -> Result<()> {
		let Place::Address { ptr, repr } = self.codegen_place(&assign.target)? else {
			return Err(CodegenError::NotAddressable(assign.target.to_string()));
		};

		let value = self.codegen_expr(&assign.value)?;
		let value = self.coerce(value, repr)?;
		self.builder.build_store(ptr, value)?;
		Ok(())
	}

	fn codegen_return(&mut self, value: Option<&Expr>) -> Result<()> {
		let (name, sig) = self.current.clone().ok_or(CodegenError::OutsideFunction)?;

		match (value, sig.ret) {
			(Some(value), Some(repr)) => {
				let value = self.codegen_expr(value)?;
				let value = self.coerce(value, repr)?;
				self.builder.build_return(Some(&value))?;
			}
			// returning the result of an empty routine
			(Some(value), None) => {
				match &value.kind {
					ExprKind::Call(call) => self.codegen_call(call).map(drop)?,
					_ => return Err(CodegenError::VoidValue(name.resolve())),
				}
				self.builder.build_return(None)?;
			}
			(None, None) => {
				self.builder.build_return(None)?;
			}
			(None, Some(_)) => return Err(CodegenError::ReturnValueMissing(name.resolve())),
		}
		Ok(())
	}

	fn codegen_print(&mut self, arg: &PrintArg, newline: bool) -> Result<()> {
		let formats = self.formats()?;
		let printf = self.printf();

		match arg {
			PrintArg::Expr(expr) => {
				let value = self.codegen_expr(expr)?;
				let repr = match expr.ty() {
					Some(ty) => Repr::of_ty(ty),
					None => repr_of(value),
				}
				.ok_or_else(|| {
					CodegenError::NotPrintable(expr.ty().map_or_else(
						|| "aggregate".to_owned(),
						ToString::to_string,
					))
				})?;

				let (format, value) = match repr {
					Repr::Int | Repr::Bool => (formats.int, self.coerce(value, Repr::Int)?),
					Repr::Real => (formats.real, self.coerce(value, Repr::Real)?),
				};
				self.builder
					.build_call(printf, &[format.into(), value.into()], "")?;
			}
			PrintArg::Str(text) => {
				let text = self.builder.build_global_string_ptr(text, "str")?;
				self.builder.build_call(
					printf,
					&[formats.str.into(), text.as_pointer_value().into()],
					"",
				)?;
			}
		}

		if newline {
			self.builder
				.build_call(printf, &[formats.newline.into()], "")?;
		}
		Ok(())
	}

	fn codegen_if(&mut self, cond: &Expr, conseq: &Body, altern: Option<&Body>) -> Result<()> {
		let cond = self.codegen_condition(cond, "if")?;

		let func = self.current_fn()?;
		let then_bb = self.ctx.append_basic_block(func, "then");
		let else_bb = altern.map(|_| self.ctx.append_basic_block(func, "else"));
		let endif_bb = self.ctx.append_basic_block(func, "endif");

		self.builder
			.build_conditional_branch(cond, then_bb, else_bb.unwrap_or(endif_bb))?;

		self.builder.position_at_end(then_bb);
		self.codegen_body(conseq)?;
		self.branch_if_open(endif_bb)?;

		if let (Some(else_bb), Some(altern)) = (else_bb, altern) {
			self.move_after_current(else_bb)?;
			self.builder.position_at_end(else_bb);
			self.codegen_body(altern)?;
			self.branch_if_open(endif_bb)?;
		}

		self.move_after_current(endif_bb)?;
		self.builder.position_at_end(endif_bb);
		Ok(())
	}

	/// `while` loops, and `for` loops when a step is given
	fn codegen_loop(
		&mut self,
		construct: &'static str,
		cond: &Expr,
		body: &Body,
		step: Option<&Assignment>,
	) -> Result<()> {
		let func = self.current_fn()?;
		let cond_bb = self.ctx.append_basic_block(func, &format!("{construct}.cond"));
		let body_bb = self.ctx.append_basic_block(func, &format!("{construct}.body"));
		let end_bb = self.ctx.append_basic_block(func, &format!("{construct}.end"));

		self.builder.build_unconditional_branch(cond_bb)?;
		self.builder.position_at_end(cond_bb);
		let cond = self.codegen_condition(cond, construct)?;
		self.builder
			.build_conditional_branch(cond, body_bb, end_bb)?;

		self.builder.position_at_end(body_bb);
		self.codegen_body(body)?;
		if let Some(step) = step
			&& !self.is_terminated()
		{
			self.codegen_assignment(step)?;
		}
		self.branch_if_open(cond_bb)?;

		self.move_after_current(end_bb)?;
		self.builder.position_at_end(end_bb);
		Ok(())
	}

	/// Booleans as is, integers against zero
	fn codegen_condition(&mut self, cond: &Expr, construct: &'static str) -> Result<IntValue<'ctx>> {
		let value = self.codegen_expr(cond)?;
		match repr_of(value) {
			Some(Repr::Bool) => Ok(value.into_int_value()),
			Some(Repr::Int) => Ok(self.builder.build_int_compare(
				IntPredicate::NE,
				value.into_int_value(),
				self.ctx.i64_type().const_zero(),
				"cond",
			)?),
			repr => Err(CodegenError::InvalidCondition {
				construct,
				found: describe(repr),
			}),
		}
	}
}

/// Expressions
impl<'ctx> Generator<'_, 'ctx> {
	fn codegen_expr(&mut self, expr: &Expr) -> Result<BasicValueEnum<'ctx>> {
		match &expr.kind {
			ExprKind::Literal(lit) => Ok(self.const_value(Const::from(*lit))),
			ExprKind::Identifier(ident) => match self.codegen_place(ident)? {
				Place::Address { ptr, repr } => {
					Ok(self.builder.build_load(ptr, &ident.name.resolve())?)
				}
				Place::Value(value) => Ok(value),
			},
			ExprKind::Unary { op, operand } => {
				let operand = self.codegen_expr(operand)?;
				self.codegen_unary(*op, operand)
			}
			ExprKind::Binary { op, lhs, rhs } => {
				let lhs = self.codegen_expr(lhs)?;
				let rhs = self.codegen_expr(rhs)?;
				self.codegen_binary(*op, lhs, rhs, expr.ty())
			}
			ExprKind::Call(call) => self
				.codegen_call(call)?
				.ok_or_else(|| CodegenError::VoidValue(call.callee.resolve())),
		}
	}

	fn codegen_unary(&self, op: UnaryOp, value: BasicValueEnum<'ctx>) -> Result<BasicValueEnum<'ctx>> {
		let value = match (op, repr_of(value)) {
			(UnaryOp::Neg, Some(Repr::Int)) => self
				.builder
				.build_int_neg(value.into_int_value(), "negtmp")?
				.into(),
			(UnaryOp::Neg, Some(Repr::Real)) => self
				.builder
				.build_float_neg(value.into_float_value(), "negtmp")?
				.into(),
			(UnaryOp::Not, Some(Repr::Bool)) => self
				.builder
				.build_not(value.into_int_value(), "nottmp")?
				.into(),
			(op, repr) => {
				return Err(CodegenError::InvalidOperand {
					op: op.to_string(),
					found: describe(repr),
				});
			}
		};
		Ok(value)
	}

	/// `ty` is the result type settled by the checker, arithmetic is carried out in it
	fn codegen_binary(
		&self,
		op: BinaryOp,
		lhs: BasicValueEnum<'ctx>,
		rhs: BasicValueEnum<'ctx>,
		ty: Option<&Ty>,
	) -> Result<BasicValueEnum<'ctx>> {
		let (lrepr, rrepr) = (repr_of(lhs), repr_of(rhs));
		let expect_both = |repr: Repr| {
			for found in [lrepr, rrepr] {
				if found != Some(repr) {
					return Err(CodegenError::InvalidOperand {
						op: op.to_string(),
						found: describe(found),
					});
				}
			}
			Ok(())
		};

		match op.class() {
			OpClass::Logical => {
				expect_both(Repr::Bool)?;
				self.int_binary(op, lhs.into_int_value(), rhs.into_int_value())
			}
			OpClass::Modulo => {
				expect_both(Repr::Int)?;
				self.int_binary(op, lhs.into_int_value(), rhs.into_int_value())
			}
			OpClass::Arithmetic | OpClass::Relational => {
				let real = matches!(ty, Some(Ty::Real))
					|| lrepr == Some(Repr::Real)
					|| rrepr == Some(Repr::Real);
				if real {
					let lhs = self.coerce(lhs, Repr::Real)?.into_float_value();
					let rhs = self.coerce(rhs, Repr::Real)?.into_float_value();
					self.real_binary(op, lhs, rhs)
				} else {
					let lhs = self.coerce(lhs, Repr::Int)?.into_int_value();
					let rhs = self.coerce(rhs, Repr::Int)?.into_int_value();
					self.int_binary(op, lhs, rhs)
				}
			}
		}
	}

	fn int_binary(
		&self,
		op: BinaryOp,
		lhs: IntValue<'ctx>,
		rhs: IntValue<'ctx>,
	) -> Result<BasicValueEnum<'ctx>> {
		let b = &self.builder;
		let cmp = |pred| b.build_int_compare(pred, lhs, rhs, "cmptmp");
		let value = match op {
			BinaryOp::Plus => b.build_int_add(lhs, rhs, "addtmp")?,
			BinaryOp::Minus => b.build_int_sub(lhs, rhs, "subtmp")?,
			BinaryOp::Mul => b.build_int_mul(lhs, rhs, "multmp")?,
			BinaryOp::Div => b.build_int_signed_div(lhs, rhs, "divtmp")?,
			BinaryOp::Mod => b.build_int_signed_rem(lhs, rhs, "modtmp")?,

			BinaryOp::And => b.build_and(lhs, rhs, "andtmp")?,
			BinaryOp::Or => b.build_or(lhs, rhs, "ortmp")?,
			BinaryOp::Xor => b.build_xor(lhs, rhs, "xortmp")?,

			BinaryOp::Eq => cmp(IntPredicate::EQ)?,
			BinaryOp::Ne => cmp(IntPredicate::NE)?,
			BinaryOp::Lt => cmp(IntPredicate::SLT)?,
			BinaryOp::Gt => cmp(IntPredicate::SGT)?,
			BinaryOp::Le => cmp(IntPredicate::SLE)?,
			BinaryOp::Ge => cmp(IntPredicate::SGE)?,
		};
		Ok(value.into())
	}

	fn real_binary(
		&self,
		op: BinaryOp,
		lhs: FloatValue<'ctx>,
		rhs: FloatValue<'ctx>,
	) -> Result<BasicValueEnum<'ctx>> {
		let b = &self.builder;
		let cmp = |pred| b.build_float_compare(pred, lhs, rhs, "cmptmp");
		let value: BasicValueEnum<'ctx> = match op {
			BinaryOp::Plus => b.build_float_add(lhs, rhs, "addtmp")?.into(),
			BinaryOp::Minus => b.build_float_sub(lhs, rhs, "subtmp")?.into(),
			BinaryOp::Mul => b.build_float_mul(lhs, rhs, "multmp")?.into(),
			BinaryOp::Div => b.build_float_div(lhs, rhs, "divtmp")?.into(),

			BinaryOp::Eq => cmp(FloatPredicate::UEQ)?.into(),
			BinaryOp::Ne => cmp(FloatPredicate::UNE)?.into(),
			BinaryOp::Lt => cmp(FloatPredicate::ULT)?.into(),
			BinaryOp::Gt => cmp(FloatPredicate::UGT)?.into(),
			BinaryOp::Le => cmp(FloatPredicate::ULE)?.into(),
			BinaryOp::Ge => cmp(FloatPredicate::UGE)?.into(),

			BinaryOp::Mod | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
				return Err(CodegenError::InvalidOperand {
					op: op.to_string(),
					found: Repr::Real.to_string(),
				});
			}
		};
		Ok(value)
	}

	fn codegen_call(&mut self, call: &Call) -> Result<Option<BasicValueEnum<'ctx>>> {
		let sig = self
			.routines
			.get(&call.callee)
			.cloned()
			.ok_or_else(|| CodegenError::UndeclaredRoutine(call.callee.resolve()))?;
		if sig.params.len() != call.args.len() {
			return Err(CodegenError::ArgumentCountMismatch {
				routine: call.callee.resolve(),
				expected: sig.params.len(),
				found: call.args.len(),
			});
		}

		let mut args: Vec<BasicMetadataValueEnum> = Vec::with_capacity(call.args.len());
		for (arg, &repr) in call.args.iter().zip(&sig.params) {
			let value = self.codegen_expr(arg)?;
			args.push(self.coerce(value, repr)?.into());
		}

		// void values cannot be named
		let name = if sig.ret.is_some() { "calltmp" } else { "" };
		let call = self.builder.build_call(sig.value, &args, name)?;
		Ok(call.try_as_basic_value().left())
	}
}

/// Conversions
impl<'ctx> Generator<'_, 'ctx> {
	fn coerce(&self, value: BasicValueEnum<'ctx>, to: Repr) -> Result<BasicValueEnum<'ctx>> {
		let from = repr_of(value).ok_or_else(|| CodegenError::UnsupportedCast {
			from: describe(None),
			to: to.to_string(),
		})?;

		let b = &self.builder;
		let (i64_ty, f64_ty) = (self.ctx.i64_type(), self.ctx.f64_type());
		let value = match (from, to) {
			(Repr::Int, Repr::Int) | (Repr::Real, Repr::Real) | (Repr::Bool, Repr::Bool) => value,

			(Repr::Int, Repr::Real) => b
				.build_signed_int_to_float(value.into_int_value(), f64_ty, "itof")?
				.into(),
			(Repr::Real, Repr::Int) => {
				let rounded = self.build_round(value.into_float_value())?;
				b.build_float_to_signed_int(rounded, i64_ty, "ftoi")?
					.into()
			}
			(Repr::Bool, Repr::Int) => b
				.build_int_z_extend(value.into_int_value(), i64_ty, "btoi")?
				.into(),
			(Repr::Int, Repr::Bool) => b
				.build_int_compare(
					IntPredicate::NE,
					value.into_int_value(),
					i64_ty.const_zero(),
					"itob",
				)?
				.into(),
			(Repr::Bool, Repr::Real) => b
				.build_unsigned_int_to_float(value.into_int_value(), f64_ty, "btof")?
				.into(),
			(Repr::Real, Repr::Bool) => b
				.build_float_compare(
					FloatPredicate::ONE,
					value.into_float_value(),
					f64_ty.const_zero(),
					"ftob",
				)?
				.into(),
		};

		Ok(value)
	}

	/// Rounds half away from zero
	fn build_round(&self, value: FloatValue<'ctx>) -> Result<FloatValue<'ctx>> {
		let round = Intrinsic::find("llvm.round")
			.and_then(|round| round.get_declaration(&self.module, &[self.ctx.f64_type().into()]))
			.ok_or(CodegenError::MissingIntrinsic("llvm.round"))?;

		let call = self.builder.build_call(round, &[value.into()], "round")?;
		call.try_as_basic_value()
			.left()
			.map(BasicValueEnum::into_float_value)
			.ok_or(CodegenError::MissingIntrinsic("llvm.round"))
	}
}

/// Helpers
impl<'ctx> Generator<'_, 'ctx> {
	fn llvm_ty(&self, repr: Repr) -> BasicTypeEnum<'ctx> {
		match repr {
			Repr::Int => self.ctx.i64_type().into(),
			Repr::Real => self.ctx.f64_type().into(),
			Repr::Bool => self.ctx.bool_type().into(),
		}
	}

	fn const_value(&self, value: Const) -> BasicValueEnum<'ctx> {
		match value {
			#[expect(clippy::cast_sign_loss)]
			Const::Int(v) => self.ctx.i64_type().const_int(v as u64, true).into(),
			Const::Real(v) => self.ctx.f64_type().const_float(v).into(),
			Const::Bool(v) => self.ctx.bool_type().const_int(u64::from(v), false).into(),
		}
	}

	fn zero(&self, repr: Repr) -> BasicValueEnum<'ctx> {
		self.const_value(Const::Int(0).convert(repr))
	}

	fn current_fn(&self) -> Result<FunctionValue<'ctx>> {
		self.current
			.as_ref()
			.map(|(_, sig)| sig.value)
			.ok_or(CodegenError::OutsideFunction)
	}

	fn is_terminated(&self) -> bool {
		self.builder
			.get_insert_block()
			.and_then(BasicBlock::get_terminator)
			.is_some()
	}

	fn branch_if_open(&self, target: BasicBlock<'ctx>) -> Result<()> {
		if !self.is_terminated() {
			self.builder.build_unconditional_branch(target)?;
		}
		Ok(())
	}

	/// Keeps blocks in the order control first reaches them
	fn move_after_current(&self, block: BasicBlock<'ctx>) -> Result<()> {
		let current = self
			.builder
			.get_insert_block()
			.ok_or(CodegenError::OutsideFunction)?;
		if current != block {
			block
				.move_after(current)
				.map_err(|()| CodegenError::DetachedBlock)?;
		}
		Ok(())
	}

	fn formats(&mut self) -> Result<Formats<'ctx>> {
		if let Some(formats) = self.formats {
			return Ok(formats);
		}

		let b = &self.builder;
		let formats = Formats {
			int: b.build_global_string_ptr("%lld", "fmt.int")?.as_pointer_value(),
			real: b.build_global_string_ptr("%f", "fmt.real")?.as_pointer_value(),
			str: b.build_global_string_ptr("%s", "fmt.str")?.as_pointer_value(),
			newline: b.build_global_string_ptr("\n", "fmt.newline")?.as_pointer_value(),
		};
		self.formats = Some(formats);
		Ok(formats)
	}

	fn printf(&self) -> FunctionValue<'ctx> {
		self.module.get_function("printf").unwrap_or_else(|| {
			#[allow(deprecated)]
			let format_ty = self.ctx.i8_type().ptr_type(AddressSpace::default());
			let fn_ty = self.ctx.i32_type().fn_type(&[format_ty.into()], true);
			self.module
				.add_function("printf", fn_ty, Some(Linkage::External))
		})
	}
}

fn repr_of(value: BasicValueEnum<'_>) -> Option<Repr> {
	match value {
		BasicValueEnum::FloatValue(_) => Some(Repr::Real),
		BasicValueEnum::IntValue(v) if v.get_type().get_bit_width() == 1 => Some(Repr::Bool),
		BasicValueEnum::IntValue(_) => Some(Repr::Int),
		_ => None,
	}
}

fn describe(repr: Option<Repr>) -> String {
	repr.map_or_else(|| "an aggregate".to_owned(), |repr| repr.to_string())
}
