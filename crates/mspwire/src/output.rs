use std::fmt::Write as _;
use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mspwire_frame::{Direction, Frame, Protocol};
use mspwire_schema::MspCode;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct FrameRow {
    pub offset: usize,
    pub code: u16,
    pub name: &'static str,
    pub direction: &'static str,
    pub protocol: &'static str,
    pub size: usize,
    pub crc_valid: bool,
}

impl FrameRow {
    pub fn new(offset: usize, frame: &Frame) -> Self {
        Self {
            offset,
            code: frame.code,
            name: MspCode::from_value(frame.code).map_or("UNKNOWN", MspCode::name),
            direction: direction_name(frame.direction),
            protocol: protocol_name(frame.protocol),
            size: frame.payload.len(),
            crc_valid: frame.crc_valid,
        }
    }
}

pub fn print_frames(rows: &[FrameRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for row in rows {
                println!("{}", to_json(row));
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OFFSET", "CODE", "NAME", "DIR", "PROTO", "SIZE", "CRC"]);
            for row in rows {
                table.add_row(vec![
                    row.offset.to_string(),
                    row.code.to_string(),
                    row.name.to_string(),
                    row.direction.to_string(),
                    row.protocol.to_string(),
                    row.size.to_string(),
                    crc_label(row.crc_valid).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "@{} {} ({}) dir={} proto={} size={} crc={}",
                    row.offset,
                    row.name,
                    row.code,
                    row.direction,
                    row.protocol,
                    row.size,
                    crc_label(row.crc_valid)
                );
            }
        }
    }
}

/// Print a state snapshot. Tables list one row per top-level field.
pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(value)),
        OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            match value {
                Value::Object(map) => {
                    for (key, field) in map {
                        table.add_row(vec![key.clone(), to_json(field)]);
                    }
                }
                other => {
                    table.add_row(vec!["value".to_string(), to_json(other)]);
                }
            }
            println!("{table}");
        }
    }
}

#[derive(Serialize)]
pub struct CrunchOutput {
    pub code: u16,
    pub name: &'static str,
    pub protocol: &'static str,
    pub payload_size: usize,
    pub frame: String,
}

pub fn print_crunch(out: &CrunchOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(out)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "NAME", "PROTO", "SIZE", "FRAME"])
                .add_row(vec![
                    out.code.to_string(),
                    out.name.to_string(),
                    out.protocol.to_string(),
                    out.payload_size.to_string(),
                    out.frame.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.frame),
    }
}

/// Lowercase hex, no separators.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Parse hex text, ignoring whitespace, `:` separators and `0x` prefixes.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<u8> = text
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|token| token.trim_start_matches("0x").trim_start_matches("0X"))
        .flat_map(str::bytes)
        .collect();

    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }
    digits
        .chunks(2)
        .map(|pair| -> Result<u8, String> {
            let hi = nibble(pair[0])?;
            let lo = nibble(pair[1])?;
            Ok(hi << 4 | lo)
        })
        .collect()
}

fn nibble(digit: u8) -> Result<u8, String> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(format!("invalid hex digit {:?}", other as char)),
    }
}

pub fn protocol_name(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::V1 => "v1",
        Protocol::V2 => "v2",
    }
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Request => "request",
        Direction::Response => "response",
        Direction::Error => "error",
    }
}

fn crc_label(valid: bool) -> &'static str {
    if valid {
        "ok"
    } else {
        "BAD"
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_accepts_common_capture_layouts() {
        assert_eq!(parse_hex("24 4d 3c").unwrap(), vec![0x24, 0x4d, 0x3c]);
        assert_eq!(parse_hex("24:4D:3C\n").unwrap(), vec![0x24, 0x4d, 0x3c]);
        assert_eq!(parse_hex("0x24,0x4d").unwrap(), vec![0x24, 0x4d]);
        assert!(parse_hex("24 4").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn hex_output_is_lowercase_and_packed() {
        assert_eq!(to_hex(&[0x24, 0x4d, 0xff]), "244dff");
    }

    #[test]
    fn frame_row_names_known_codes() {
        let row = FrameRow::new(3, &Frame::new(108, vec![0u8; 6]));
        assert_eq!(row.name, "MSP_ATTITUDE");
        assert_eq!(row.direction, "response");
        assert_eq!(row.size, 6);

        let unknown = FrameRow::new(0, &Frame::new(199, Vec::new()));
        assert_eq!(unknown.name, "UNKNOWN");
    }
}
