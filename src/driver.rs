use std::fs;

#[cfg(feature = "llvm")]
use crate::codegen::{self, CodeGenBackend};
use crate::{
	Result, ast,
	errors::Error,
	session::{PrintKind, SessionCtx},
	ty,
};

pub fn pipeline(scx: &SessionCtx) -> Result<()> {
	let filename = scx.options.input.as_ref().ok_or(Error::NoInput)?;
	let source = fs::read_to_string(filename)?;

	let program = parse_program(&source)?;
	if scx.options.print.contains(&PrintKind::Ast) {
		println!("{program:#?}");
	}

	check(scx, &program)?;

	#[cfg(feature = "llvm")]
	{
		let context = codegen::Context::create();
		let mut backend = codegen::LlvmBackend::new(scx, &context, &module_name(scx));
		lower(&mut backend, &program)?;
		backend.write_ir(&scx.options.output)?;
		tracing::debug!(output = %scx.options.output.display(), "wrote module");
	}

	tracing::info!("Reached pipeline end successfully!");
	Ok(())
}

/// Reads a syntax tree serialized by the parser
pub fn parse_program(source: &str) -> Result<ast::Program> {
	Ok(serde_json::from_str(source)?)
}

/// Type checks the program, caching resolved types on its nodes
pub fn check(scx: &SessionCtx, program: &ast::Program) -> Result<()> {
	let mut tcx = ty::TyCtx::new(scx);
	tcx.check_root(program)?;
	Ok(())
}

/// Checks and lowers the program, returning the textual module
#[cfg(feature = "llvm")]
pub fn compile(scx: &SessionCtx, program: &ast::Program) -> Result<String> {
	check(scx, program)?;
	compile_checked(scx, program)
}

#[cfg(feature = "llvm")]
fn compile_checked(scx: &SessionCtx, program: &ast::Program) -> Result<String> {
	let context = codegen::Context::create();
	let mut backend = codegen::LlvmBackend::new(scx, &context, &module_name(scx));
	lower(&mut backend, program)
}

/// Named after the input file, falling back to the crate name for in-memory programs
#[cfg(feature = "llvm")]
fn module_name(scx: &SessionCtx) -> String {
	scx.options
		.input
		.as_deref()
		.and_then(|path| path.file_stem())
		.map_or_else(|| "cplus".to_owned(), |stem| stem.to_string_lossy().into_owned())
}

#[cfg(feature = "llvm")]
fn lower(backend: &mut dyn CodeGenBackend, program: &ast::Program) -> Result<String> {
	backend.codegen_root(program)?;

	// an invalid module is still emitted for inspection
	if let Err(err) = backend.verify() {
		tracing::warn!(%err, "module failed verification");
	}

	Ok(backend.to_ir())
}
