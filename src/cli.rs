//! CLI argument definitions for `wheelwright`.
//!
//! Each subcommand is a thin wrapper over one archive operation; see
//! [`crate::commands`] for the behaviour.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Build, inspect, verify and unpack wheel archives.
#[derive(Parser, Debug)]
#[command(name = "wheelwright")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Unpack a wheel, edit it, and repack it with a new build number:\n",
    "    $ wheelwright unpack dist/pkg-1.0-py3-none-any.whl -d build\n",
    "    $ wheelwright pack build/pkg-1.0 -d dist --build-number 2\n\n",
    "  Check every entry against RECORD:\n",
    "    $ wheelwright verify dist/*.whl\n\n",
    "  Show metadata as JSON:\n",
    "    $ wheelwright info --json dist/pkg-1.0-py3-none-any.whl\n\n",
    "Set SOURCE_DATE_EPOCH to write reproducible entry timestamps.",
))]
pub struct Cli {
    /// Configuration file [default: ./wheelwright.toml when present].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Repack an unpacked wheel directory into a wheel file.
    Pack(PackArgs),

    /// Unpack a wheel into `<dest>/<name>-<version>`.
    Unpack(UnpackArgs),

    /// Verify every entry of one or more wheels against RECORD.
    Verify(VerifyArgs),

    /// Show information about a wheel.
    Info(InfoArgs),
}

/// Arguments for the pack command.
#[derive(Parser, Debug, Clone)]
pub struct PackArgs {
    /// Unpacked wheel directory.
    #[arg(value_name = "DIRECTORY")]
    pub directory: Utf8PathBuf,

    /// Directory to write the wheel into.
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
    pub dest_dir: Utf8PathBuf,

    /// Build number to set; an empty value removes the existing one.
    #[arg(long, value_name = "NUMBER")]
    pub build_number: Option<String>,
}

/// Arguments for the unpack command.
#[derive(Parser, Debug, Clone)]
pub struct UnpackArgs {
    /// Wheel file to unpack.
    #[arg(value_name = "WHEEL")]
    pub wheel: Utf8PathBuf,

    /// Directory to unpack into.
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
    pub dest: Utf8PathBuf,
}

/// Arguments for the verify command.
#[derive(Parser, Debug, Clone)]
pub struct VerifyArgs {
    /// Wheel files to verify.
    #[arg(value_name = "WHEEL", required = true)]
    pub wheels: Vec<Utf8PathBuf>,
}

/// Arguments for the info command.
#[derive(Parser, Debug, Clone)]
pub struct InfoArgs {
    /// Wheel file to describe.
    #[arg(value_name = "WHEEL")]
    pub wheel: Utf8PathBuf,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// List every file in the wheel.
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
