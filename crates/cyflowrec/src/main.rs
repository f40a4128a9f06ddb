mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "cyflowrec",
    version,
    about = "Receives files sent by laboratory instruments over a serial line"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "CYFLOWREC_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::CollisionArg;

    #[test]
    fn parses_receive_subcommand() {
        let cli = Cli::try_parse_from([
            "cyflowrec",
            "receive",
            "--port-dev",
            "/dev/ttyS0",
            "--storage-dir",
            "/tmp/fcs",
            "--on-collision",
            "drop",
            "--create-dirs",
        ])
        .expect("receive args should parse");

        let Command::Receive(args) = cli.command else {
            panic!("expected receive subcommand");
        };
        assert_eq!(args.on_collision, CollisionArg::Drop);
        assert!(args.create_dirs);
        assert!(!args.skip_line_setup);
    }

    #[test]
    fn rejects_unknown_collision_policy() {
        let err = Cli::try_parse_from([
            "cyflowrec",
            "receive",
            "--port-dev",
            "/dev/ttyS0",
            "--storage-dir",
            "/tmp/fcs",
            "--on-collision",
            "rename",
        ])
        .expect_err("unknown policy should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cyflowrec",
            "doctor",
            "--format",
            "json",
            "--log-level",
            "warning",
        ])
        .expect("doctor args should parse");

        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert!(matches!(cli.command, Command::Doctor(_)));
    }
}
