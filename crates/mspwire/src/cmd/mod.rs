mod crunch;
mod frames;
mod replay;
mod version;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use mspwire_frame::{Frame, FrameError, FrameReader};
use mspwire_schema::ApiVersion;
use tracing::warn;

use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID};
use crate::output::{parse_hex, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split a capture into frames and list them.
    Frames(FramesArgs),
    /// Feed device replies from a capture through the engine and print the state.
    Replay(ReplayArgs),
    /// Encode a set request from a state snapshot.
    Crunch(CrunchArgs),
    /// Show version information.
    Version(VersionArgs),
}

#[derive(Args, Debug)]
pub struct FramesArgs {
    /// Capture file (raw serial bytes).
    pub capture: PathBuf,

    /// Capture holds hex text instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file (raw serial bytes).
    pub capture: PathBuf,

    /// API version to decode with until the capture negotiates one.
    #[arg(long, value_name = "X.Y.Z", env = "MSPWIRE_API_VERSION")]
    pub api_version: ApiVersion,

    /// Print one state domain instead of the whole store.
    #[arg(long, value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// Capture holds hex text instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct CrunchArgs {
    /// Message code, by name (`SET_PID`, `MSP_SET_PID`) or number.
    pub code: String,

    #[arg(long, value_name = "X.Y.Z", env = "MSPWIRE_API_VERSION")]
    pub api_version: ApiVersion,

    /// State snapshot (JSON) to encode from; defaults are used when absent.
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Frame as MSP v2 even when the code fits v1.
    #[arg(long)]
    pub v2: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Include build and feature details.
    #[arg(long)]
    pub extended: bool,
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Frames(args) => frames::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Crunch(args) => crunch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Load a capture file, decoding hex text when asked.
fn read_capture(path: &Path, hex: bool) -> CliResult<Vec<u8>> {
    let context = format!("read {}", path.display());
    if !hex {
        return std::fs::read(path).map_err(|err| io_error(&context, err));
    }
    let text = std::fs::read_to_string(path).map_err(|err| io_error(&context, err))?;
    parse_hex(&text).map_err(|err| CliError::new(DATA_INVALID, format!("{context}: {err}")))
}

/// Split capture bytes into frames, each paired with its starting offset.
fn split_frames(bytes: Vec<u8>) -> CliResult<Vec<(usize, Frame)>> {
    let mut reader = FrameReader::new(Cursor::new(bytes));
    let mut frames = Vec::new();
    loop {
        match reader.read_frame() {
            Ok(frame) => {
                let end = reader.get_ref().position() as usize - reader.buffered();
                frames.push((end - frame.wire_size(), frame));
            }
            Err(FrameError::ConnectionClosed) => {
                if reader.buffered() > 0 {
                    warn!(bytes = reader.buffered(), "capture ends inside a frame");
                }
                return Ok(frames);
            }
            Err(err) => return Err(frame_error("split capture", err)),
        }
    }
}
