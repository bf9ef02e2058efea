#![cfg(feature = "llvm")]

use cplus::{
	ast::{
		Assignment, BinaryOp, Body, Expr, Identifier, PrintArg, Program, RoutineDecl, Stmt, VarDecl,
	},
	codegen::{CodeGenBackend, Context, LlvmBackend},
	driver,
	errors::{Error, ErrorKind, codegen::CodegenError},
	session::SessionCtx,
	ty::{Field, Ty},
};

/// Checks, lowers and verifies the program
fn lower(program: &Program) -> Result<String, Error> {
	let scx = SessionCtx::default();
	driver::check(&scx, program)?;

	let context = Context::create();
	let mut backend = LlvmBackend::new(&scx, &context, "test");
	backend.codegen_root(program)?;
	backend.verify()?;
	Ok(backend.to_ir())
}

fn main_with(decls: Vec<VarDecl>, stmts: Vec<Stmt>) -> RoutineDecl {
	RoutineDecl::new("main", vec![], None, Body::new(decls, stmts))
}

fn assign(target: Identifier, value: Expr) -> Stmt {
	Stmt::Assign(Assignment::new(target, value))
}

fn print(expr: Expr) -> Stmt {
	Stmt::Print {
		arg: PrintArg::Expr(expr),
		newline: true,
	}
}

#[test]
fn global_and_main() {
	let program = Program::new(
		vec![VarDecl::new("n", Some(Ty::Int), Some(Expr::int(5)))],
		vec![main_with(vec![], vec![Stmt::Return(Some(Expr::binary(
			BinaryOp::Mul,
			Expr::var("n"),
			Expr::int(2),
		)))])],
	);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("@n = global i64 5"), "{ir}");
	assert!(ir.contains("define i64 @main()"), "{ir}");
	assert!(ir.contains("mul i64 %n, 2"), "{ir}");
	assert!(ir.contains("ret i64 %multmp"), "{ir}");
}

#[test]
fn global_initializers_are_folded() {
	let program = Program::new(
		vec![
			VarDecl::new(
				"ratio",
				Some(Ty::Real),
				Some(Expr::binary(BinaryOp::Div, Expr::int(3), Expr::real(2.0))),
			),
			VarDecl::new("count", Some(Ty::Int), Some(Expr::real(2.5))),
			VarDecl::typed("flag", Ty::Bool),
		],
		vec![],
	);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("@ratio = global double 1.500000e+00"), "{ir}");
	assert!(ir.contains("@count = global i64 3"), "{ir}");
	assert!(ir.contains("@flag = global i1 false"), "{ir}");
}

#[test]
fn folded_globals_match_local_values() {
	let half = || Expr::binary(BinaryOp::Div, Expr::bool(true), Expr::int(2));
	let program = Program::new(
		vec![VarDecl::new("g", Some(Ty::Real), Some(half()))],
		vec![main_with(
			vec![VarDecl::new("l", Some(Ty::Real), Some(half()))],
			vec![],
		)],
	);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("@g = global double 5.000000e-01"), "{ir}");
	assert!(ir.contains("store double 5.000000e-01, double* %l"), "{ir}");
}

#[test]
fn globals_must_be_simple_constants() {
	let program = Program::new(
		vec![VarDecl::typed("a", Ty::array(Ty::Int, Expr::int(4)))],
		vec![],
	);
	let err = lower(&program).unwrap_err();
	assert!(matches!(
		err,
		Error::Codegen(CodegenError::AggregateGlobal(_))
	));
	assert_eq!(err.kind(), ErrorKind::Lowering);

	let program = Program::new(
		vec![
			VarDecl::new("a", Some(Ty::Int), Some(Expr::int(1))),
			VarDecl::new("b", Some(Ty::Int), Some(Expr::var("a"))),
		],
		vec![],
	);
	assert!(matches!(
		lower(&program).unwrap_err(),
		Error::Codegen(CodegenError::NonConstantInitializer(_))
	));
}

#[test]
fn locals_live_on_the_stack() {
	let program = Program::new(vec![], vec![main_with(
		vec![VarDecl::new("x", Some(Ty::Int), Some(Expr::int(5)))],
		vec![Stmt::Return(Some(Expr::var("x")))],
	)]);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("%x = alloca i64"), "{ir}");
	assert!(ir.contains("store i64 5"), "{ir}");
	assert!(!ir.contains("@x"), "{ir}");
}

#[test]
fn record_fields_get_their_own_slot() {
	let point = Ty::record(vec![Field::new("x", Ty::Int), Field::new("y", Ty::Int)]);
	let program = Program::new(vec![], vec![main_with(
		vec![VarDecl::typed("p", point)],
		vec![assign(Identifier::new("p").field("x"), Expr::int(3))],
	)]);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("%p.x = alloca i64"), "{ir}");
	assert!(ir.contains("%p.y = alloca i64"), "{ir}");

	let stores = ir.lines().filter(|l| l.contains("store")).collect::<Vec<_>>();
	assert_eq!(stores.len(), 1, "{ir}");
	assert!(stores[0].contains("%p.x"), "{ir}");
}

#[test]
fn constant_out_of_range_index_still_lowers() {
	let program = Program::new(vec![], vec![main_with(
		vec![VarDecl::typed("a", Ty::array(Ty::Real, Expr::int(4)))],
		vec![
			assign(Identifier::new("a").index(Expr::int(10)), Expr::real(1.0)),
			print(Expr::ident(Identifier::new("a").index(Expr::int(10)))),
		],
	)]);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("alloca double, i64 4"), "{ir}");
	assert!(ir.contains("getelementptr double"), "{ir}");
}

#[test]
fn if_else_blocks_are_ordered() {
	let program = Program::new(
		vec![VarDecl::new("n", Some(Ty::Int), Some(Expr::int(2)))],
		vec![main_with(vec![], vec![
			Stmt::If {
				cond: Expr::var("n"),
				conseq: Body::new(vec![], vec![print(Expr::int(1))]),
				altern: Some(Body::new(vec![], vec![print(Expr::int(0))])),
			},
			print(Expr::var("n")),
		])],
	);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("icmp ne i64 %n, 0"), "{ir}");
	let then = ir.find("\nthen:").unwrap();
	let altern = ir.find("\nelse:").unwrap();
	let endif = ir.find("\nendif:").unwrap();
	assert!(then < altern && altern < endif, "{ir}");
}

#[test]
fn branches_that_return_skip_the_join() {
	let program = Program::new(vec![], vec![RoutineDecl::new(
		"sign",
		vec![VarDecl::typed("v", Ty::Int)],
		Some(Ty::Int),
		Body::new(vec![], vec![Stmt::If {
			cond: Expr::binary(BinaryOp::Lt, Expr::var("v"), Expr::int(0)),
			conseq: Body::new(vec![], vec![
				Stmt::Return(Some(Expr::int(-1))),
				print(Expr::var("v")),
			]),
			altern: Some(Body::new(vec![], vec![Stmt::Return(Some(Expr::int(1)))])),
		}]),
	)]);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("ret i64 -1"), "{ir}");
	assert!(ir.contains("ret i64 1"), "{ir}");
	// the statement after the first return is dropped
	assert!(!ir.contains("printf"), "{ir}");
}

#[test]
fn loops_lower_to_valid_blocks() {
	let program = Program::new(vec![], vec![main_with(
		vec![VarDecl::new("sum", Some(Ty::Int), Some(Expr::int(0)))],
		vec![
			Stmt::For {
				var: VarDecl::new("i", None, Some(Expr::int(0))),
				cond: Expr::binary(BinaryOp::Lt, Expr::var("i"), Expr::int(10)),
				step: Assignment::new(
					Identifier::new("i"),
					Expr::binary(BinaryOp::Plus, Expr::var("i"), Expr::int(1)),
				),
				body: Body::new(vec![], vec![assign(
					Identifier::new("sum"),
					Expr::binary(BinaryOp::Plus, Expr::var("sum"), Expr::var("i")),
				)]),
			},
			Stmt::While {
				cond: Expr::binary(BinaryOp::Gt, Expr::var("sum"), Expr::int(0)),
				body: Body::new(vec![], vec![assign(
					Identifier::new("sum"),
					Expr::binary(BinaryOp::Minus, Expr::var("sum"), Expr::int(7)),
				)]),
			},
			print(Expr::var("sum")),
		],
	)]);

	let ir = lower(&program).unwrap();
	for label in ["for.cond:", "for.body:", "for.end:", "while.cond:", "while.body:", "while.end:"] {
		assert!(ir.contains(label), "missing {label} in {ir}");
	}
	assert!(ir.find("for.end:").unwrap() < ir.find("while.cond:").unwrap(), "{ir}");
}

#[test]
fn mixed_arithmetic_converts() {
	let program = Program::new(vec![], vec![main_with(
		vec![
			VarDecl::new("i", Some(Ty::Int), Some(Expr::int(2))),
			VarDecl::new("r", Some(Ty::Real), Some(Expr::real(0.5))),
		],
		vec![
			print(Expr::binary(BinaryOp::Plus, Expr::var("i"), Expr::var("r"))),
			assign(Identifier::new("i"), Expr::var("r")),
			assign(Identifier::new("r"), Expr::var("i")),
		],
	)]);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("sitofp i64"), "{ir}");
	assert!(ir.contains("fadd double"), "{ir}");
	assert!(ir.contains("@llvm.round.f64"), "{ir}");
	assert!(ir.contains("fptosi double"), "{ir}");
}

#[test]
fn print_uses_printf_formats() {
	let program = Program::new(vec![], vec![main_with(vec![], vec![
		print(Expr::int(4)),
		print(Expr::real(0.25)),
		print(Expr::bool(true)),
		Stmt::Print {
			arg: PrintArg::Str("done".to_owned()),
			newline: false,
		},
	])]);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("declare i32 @printf(i8*, ...)"), "{ir}");
	assert!(ir.contains("c\"%lld\\00\""), "{ir}");
	assert!(ir.contains("c\"%f\\00\""), "{ir}");
	assert!(ir.contains("c\"%s\\00\""), "{ir}");
	assert!(ir.contains("c\"done\\00\""), "{ir}");
	assert_eq!(ir.matches("c\"%lld\\00\"").count(), 1, "{ir}");
}

#[test]
fn real_conditions_are_rejected() {
	let program = Program::new(vec![], vec![main_with(vec![], vec![Stmt::While {
		cond: Expr::real(1.0),
		body: Body::default(),
	}])]);

	assert!(matches!(
		lower(&program).unwrap_err(),
		Error::Codegen(CodegenError::InvalidCondition {
			construct: "while",
			..
		})
	));
}

#[test]
fn calls_pass_converted_arguments() {
	let scale = RoutineDecl::new(
		"scale",
		vec![VarDecl::typed("x", Ty::Real), VarDecl::typed("k", Ty::Int)],
		Some(Ty::Real),
		Body::new(vec![], vec![Stmt::Return(Some(Expr::binary(
			BinaryOp::Mul,
			Expr::var("x"),
			Expr::var("k"),
		)))]),
	);
	let program = Program::new(vec![], vec![
		scale,
		main_with(vec![], vec![print(Expr::call("scale", vec![Expr::int(3), Expr::int(2)]))]),
	]);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("define double @scale(double %x, i64 %k)"), "{ir}");
	assert!(ir.contains("call double @scale(double 3.000000e+00, i64 2)"), "{ir}");
}

#[test]
fn recursion_uses_the_declared_signature() {
	let fact = RoutineDecl::new(
		"fact",
		vec![VarDecl::typed("n", Ty::Int)],
		Some(Ty::Int),
		Body::new(vec![], vec![
			Stmt::If {
				cond: Expr::binary(BinaryOp::Le, Expr::var("n"), Expr::int(1)),
				conseq: Body::new(vec![], vec![Stmt::Return(Some(Expr::int(1)))]),
				altern: None,
			},
			Stmt::Return(Some(Expr::binary(
				BinaryOp::Mul,
				Expr::var("n"),
				Expr::call("fact", vec![Expr::binary(
					BinaryOp::Minus,
					Expr::var("n"),
					Expr::int(1),
				)]),
			))),
		]),
	);

	let ir = lower(&Program::new(vec![], vec![fact])).unwrap();
	assert!(ir.contains("call i64 @fact(i64 %subtmp)"), "{ir}");
}

#[test]
fn empty_routines_return_void() {
	let program = Program::new(vec![], vec![
		RoutineDecl::new("noop", vec![], None, Body::default()),
		main_with(vec![], vec![Stmt::Call(cplus::ast::Call {
			callee: "noop".into(),
			args: vec![],
		})]),
	]);

	let ir = lower(&program).unwrap();
	assert!(ir.contains("define void @noop()"), "{ir}");
	assert!(ir.contains("call void @noop()"), "{ir}");
	assert!(ir.contains("ret void"), "{ir}");
}

#[test]
fn compile_runs_the_checker_first() {
	let scx = SessionCtx::default();
	let program = Program::new(vec![], vec![main_with(vec![], vec![Stmt::Return(Some(
		Expr::var("missing"),
	))])]);

	assert!(matches!(
		driver::compile(&scx, &program).unwrap_err(),
		Error::Type(_)
	));
}
