extern crate clap;
use bench_compare::config::Config;
use bench_compare::{generate_report, write_report, Result};
use clap::{App, Arg};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

struct CompareArgs {
	output_file: Option<PathBuf>,
}

fn parse_args() -> CompareArgs {
	let matches = App::new("bench-compare")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Compares the latest contender and baseline benchmark results as markdown")
		.after_help(
			"Result directories are read from the file named by BENCH_COMPARE_CONFIG, \
			 or bench-compare.toml in the working directory.",
		)
		.arg(Arg::with_name("output")
			.value_name("FILE")
			.help("Write the report here (overwritten) instead of stdout")
			.index(1))
		.get_matches();
	CompareArgs {
		output_file: matches.value_of("output").map(|x| x.into()),
	}
}

fn init_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn run(args: &CompareArgs) -> Result<()> {
	let config = Config::discover()?;
	let report = generate_report(&config)?;
	match &args.output_file {
		Some(path) => {
			write_report(path, &report)?;
			eprintln!("Benchmark comparison written to {}", path.display());
		}
		None => {
			let stdout = std::io::stdout();
			let mut stdout = stdout.lock();
			if let Err(err) = stdout.write_all(report.as_bytes()).and_then(|_| stdout.flush()) {
				eprintln!("error: cannot write report to stdout: {}", err);
				process::exit(1);
			}
		}
	}
	Ok(())
}

fn main() {
	init_logging();
	let args = parse_args();
	if let Err(err) = run(&args) {
		eprintln!("error: {}", err);
		process::exit(1);
	}
}
