use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use cplus::{
	driver,
	session::{Options, PrintKind, SessionCtx},
};
use tracing_subscriber::{EnvFilter, FmtSubscriber, fmt::time};

#[derive(clap::Parser)]
#[command(version, about)]
struct Args {
	/// Syntax tree serialized as JSON by the parser
	pub path: PathBuf,

	/// Where to write the LLVM IR module
	#[clap(short, long, default_value = "ir.ll")]
	pub output: PathBuf,

	#[clap(long, value_enum)]
	pub print: Vec<PrintKind>,

	/// Reject implicit casts between integers, reals and booleans
	#[clap(long)]
	pub strict_types: bool,
}

impl From<Args> for Options {
	fn from(args: Args) -> Self {
		Self {
			input: Some(args.path),
			output: args.output,
			print: args.print,
			strict_types: args.strict_types,
		}
	}
}

fn main() -> ExitCode {
	FmtSubscriber::builder()
		.with_env_filter(EnvFilter::from_default_env())
		.with_timer(time::Uptime::default())
		.with_writer(std::io::stderr)
		.init();

	let args = Args::parse();
	let scx = SessionCtx::new(args.into());

	match driver::pipeline(&scx) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => scx.emit_fatal(&err),
	}
}
