mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mspwire", version, about = "MultiWii Serial Protocol inspection CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
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

    #[test]
    fn parses_replay_subcommand() {
        let cli = Cli::try_parse_from([
            "mspwire",
            "replay",
            "/tmp/capture.bin",
            "--api-version",
            "1.44.0",
            "--domain",
            "sensors",
        ])
        .expect("replay args should parse");

        let Command::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.api_version.to_string(), "1.44.0");
        assert_eq!(args.domain.as_deref(), Some("sensors"));
    }

    #[test]
    fn rejects_malformed_api_version() {
        let err = Cli::try_parse_from([
            "mspwire",
            "crunch",
            "SET_PID",
            "--api-version",
            "one.two",
        ])
        .expect_err("bad version should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "mspwire",
            "frames",
            "/tmp/capture.hex",
            "--hex",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("frames args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Frames(ref args) if args.hex));
    }
}
