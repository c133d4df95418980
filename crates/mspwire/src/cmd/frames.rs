use tracing::info;

use crate::cmd::{read_capture, split_frames, FramesArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_frames, FrameRow, OutputFormat};

pub fn run(args: FramesArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = read_capture(&args.capture, args.hex)?;
    let total = bytes.len();
    let rows: Vec<FrameRow> = split_frames(bytes)?
        .iter()
        .map(|(offset, frame)| FrameRow::new(*offset, frame))
        .collect();

    let bad = rows.iter().filter(|row| !row.crc_valid).count();
    info!(bytes = total, frames = rows.len(), bad_crc = bad, "capture split");
    print_frames(&rows, format);
    Ok(SUCCESS)
}
