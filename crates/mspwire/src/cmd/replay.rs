use mspwire_frame::{Direction, Frame};
use mspwire_peer::{Engine, MemorySink};
use mspwire_schema::MspCode;
use tracing::{debug, info, warn};

use crate::cmd::{read_capture, split_frames, ReplayArgs};
use crate::exit::{json_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_value, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = split_frames(read_capture(&args.capture, args.hex)?)?;

    let mut engine = Engine::new(MemorySink::new());
    engine.state_mut().config.api_version = args.api_version;

    let mut failed = 0usize;
    for (offset, frame) in &frames {
        if let Err(err) = replay_frame(&mut engine, frame) {
            warn!(offset, error = %err, "frame not applied");
            failed += 1;
        }
    }
    info!(
        frames = frames.len(),
        failed,
        api_version = %engine.api_version(),
        "replay finished"
    );

    let value = match args.domain.as_deref() {
        Some(domain) => engine.read_state(domain).ok_or_else(|| {
            CliError::new(
                USAGE,
                format!(
                    "unknown domain {domain:?}; expected one of: {}",
                    engine.state().domain_names().join(", ")
                ),
            )
        })?,
        None => serde_json::to_value(engine.state())
            .map_err(|err| json_error("serialize state", err))?,
    };
    print_value(&value, format);
    Ok(SUCCESS)
}

/// Replies go through the engine. Host batch requests are queued so their replies can be paired.
fn replay_frame(engine: &mut Engine<MemorySink>, frame: &Frame) -> mspwire_peer::Result<()> {
    if frame.direction != Direction::Request {
        return engine.on_frame(frame);
    }
    if frame.code != MspCode::MultipleMsp.value() {
        debug!(code = frame.code, "skipping host request");
        return Ok(());
    }

    let codes: Vec<MspCode> = frame
        .payload
        .iter()
        .filter_map(|&value| MspCode::from_value(value.into()))
        .collect();
    engine.queue_batch(&codes)?;
    engine.send_batch(None)?;
    Ok(())
}
