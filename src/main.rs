//! `wheelwright` CLI entrypoint.

use clap::Parser;
use std::io::Write;
use wheelwright::cli::Cli;
use wheelwright::commands::run;
use wheelwright::error::Result;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    let run_result = run(&cli, &mut stdout);
    let mut stderr = std::io::stderr();
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            if writeln!(stderr, "error: {err}").is_err() {
                // Nothing else can report it.
            }
            1
        }
    }
}
