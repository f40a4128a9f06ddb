use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use cyflowrec_receiver::CollisionPolicy;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod doctor;
pub mod envinfo;
pub mod receive;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive files from the instrument and store them.
    Receive(ReceiveArgs),
    /// Check the serial device and storage directory.
    Doctor(DoctorArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Receive(args) => receive::run(args),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Envinfo(args) => envinfo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Collision policy as spelled on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CollisionArg {
    /// Overwrite the existing file.
    #[default]
    Replace,
    /// Keep the existing file and drop the incoming one.
    Drop,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::Replace => CollisionPolicy::Replace,
            CollisionArg::Drop => CollisionPolicy::Drop,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Serial device the instrument is connected to.
    #[arg(long, value_name = "PATH", env = "CYFLOWREC_PORT_DEV")]
    pub port_dev: PathBuf,
    /// Directory received files are stored in.
    #[arg(long, value_name = "PATH", env = "CYFLOWREC_STORAGE_DIR")]
    pub storage_dir: PathBuf,
    /// Create missing directories of the storage path.
    #[arg(long)]
    pub create_dirs: bool,
    /// What to do when a received file already exists.
    #[arg(
        long,
        value_name = "POLICY",
        default_value = "replace",
        env = "CYFLOWREC_ON_COLLISION"
    )]
    pub on_collision: CollisionArg,
    /// Serial line baud rate.
    #[arg(long, default_value_t = 9600, env = "CYFLOWREC_BAUD")]
    pub baud: u32,
    /// Silence that aborts a transfer in progress (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s", env = "CYFLOWREC_MESSAGE_TIMEOUT")]
    pub message_timeout: String,
    /// Use the device as is, without applying line settings.
    #[arg(long)]
    pub skip_line_setup: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Serial device to check.
    #[arg(long, value_name = "PATH", env = "CYFLOWREC_PORT_DEV")]
    pub port_dev: Option<PathBuf>,
    /// Storage directory to check.
    #[arg(long, value_name = "PATH", env = "CYFLOWREC_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
