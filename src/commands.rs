//! Subcommand implementations.
//!
//! Every command writes its report to the supplied writer so that tests can
//! capture it; errors are returned to `main`, which prints them.

use crate::cli::{Cli, Command, InfoArgs, PackArgs, UnpackArgs, VerifyArgs};
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::info::{WheelInfo, format_human, format_json};
use camino::Utf8Path;
use log::debug;
use std::io::Write;
use wheelwright_archive::naming::DistributionIdentity;
use wheelwright_archive::reader::WheelReader;
use wheelwright_archive::repack::{pack_directory, unpack_wheel};

const LOG_TARGET: &str = "wheelwright::commands";

/// Run the parsed command line, writing reports to `out`.
///
/// # Errors
///
/// Returns configuration, archive, and output errors.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Command::Pack(args) => pack(cli.config.as_deref(), args, out),
        Command::Unpack(args) => unpack(args, out),
        Command::Verify(args) => verify(args, out),
        Command::Info(args) => info(args, out),
    }
}

fn pack(config: Option<&Utf8Path>, args: &PackArgs, out: &mut dyn Write) -> Result<()> {
    let settings = Settings::load(config)?;
    let options = settings.writer_options()?;
    debug!(target: LOG_TARGET, "packing with {options:?}");
    let wheel = pack_directory(
        args.directory.as_std_path(),
        args.dest_dir.as_std_path(),
        args.build_number.as_deref(),
        options,
    )?;
    writeln!(out, "Repacked wheel as {}", wheel.display())?;
    Ok(())
}

fn unpack(args: &UnpackArgs, out: &mut dyn Write) -> Result<()> {
    require_wheel(&args.wheel)?;
    let destination = unpack_wheel(args.wheel.as_std_path(), args.dest.as_std_path())?;
    writeln!(out, "Unpacked to {}", destination.display())?;
    Ok(())
}

fn verify(args: &VerifyArgs, out: &mut dyn Write) -> Result<()> {
    for wheel in &args.wheels {
        require_wheel(wheel)?;
        let mut reader = WheelReader::open(wheel.as_std_path())?;
        reader.verify_all()?;
        writeln!(out, "{wheel}: OK")?;
    }
    Ok(())
}

fn info(args: &InfoArgs, out: &mut dyn Write) -> Result<()> {
    require_wheel(&args.wheel)?;
    let identity = DistributionIdentity::parse(args.wheel.as_str())?;
    let mut reader = WheelReader::open(args.wheel.as_std_path())?;
    let info = WheelInfo::collect(&identity, &mut reader)?;
    if args.json {
        writeln!(out, "{}", format_json(&info)?)?;
    } else {
        write!(out, "{}", format_human(&info, args.verbose))?;
    }
    Ok(())
}

fn require_wheel(path: &Utf8Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::WheelNotFound {
            path: path.to_owned(),
        })
    }
}
