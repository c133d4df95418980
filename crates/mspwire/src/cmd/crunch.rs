use bytes::BytesMut;
use mspwire_frame::{encode_frame, Direction, Protocol};
use mspwire_peer::EngineError;
use mspwire_schema::{encode, FcState, MspCode};
use tracing::debug;

use crate::cmd::CrunchArgs;
use crate::exit::{engine_error, frame_error, io_error, json_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_crunch, protocol_name, to_hex, CrunchOutput, OutputFormat};

pub fn run(args: CrunchArgs, format: OutputFormat) -> CliResult<i32> {
    let code = parse_code(&args.code)?;

    let mut state = match &args.state {
        Some(path) => {
            let context = format!("read {}", path.display());
            let text = std::fs::read_to_string(path).map_err(|err| io_error(&context, err))?;
            serde_json::from_str::<FcState>(&text).map_err(|err| json_error(&context, err))?
        }
        None => FcState::default(),
    };
    state.config.api_version = args.api_version;

    let payload = encode(code, &state)
        .ok_or_else(|| engine_error("crunch", EngineError::NoEncoder(code)))?;

    let protocol = if args.v2 || !code.fits_v1() {
        Protocol::V2
    } else {
        Protocol::V1
    };
    let mut wire = BytesMut::new();
    encode_frame(protocol, Direction::Request, code.value(), &payload, &mut wire)
        .map_err(|err| frame_error("frame request", err))?;
    debug!(%code, len = payload.len(), "crunched");

    let out = CrunchOutput {
        code: code.value(),
        name: code.name(),
        protocol: protocol_name(protocol),
        payload_size: payload.len(),
        frame: to_hex(&wire),
    };
    print_crunch(&out, format);
    Ok(SUCCESS)
}

fn parse_code(text: &str) -> CliResult<MspCode> {
    let by_number = text.parse::<u16>().ok().and_then(MspCode::from_value);
    by_number
        .or_else(|| MspCode::from_name(text))
        .ok_or_else(|| CliError::new(USAGE, format!("unknown message code {text:?}")))
}
