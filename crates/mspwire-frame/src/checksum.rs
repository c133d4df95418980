/// Polynomial for CRC-8/DVB-S2 used by MSP v2.
const DVB_S2_POLY: u8 = 0xD5;

/// Fold one byte into a running CRC-8/DVB-S2.
pub fn crc8_dvb_s2(crc: u8, byte: u8) -> u8 {
    let mut crc = crc ^ byte;
    for _ in 0..8 {
        crc = if crc & 0x80 != 0 {
            (crc << 1) ^ DVB_S2_POLY
        } else {
            crc << 1
        };
    }
    crc
}

/// CRC-8/DVB-S2 over a whole slice, starting from zero.
pub fn crc8_dvb_s2_slice(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |crc, &b| crc8_dvb_s2(crc, b))
}

/// MSP v1 checksum: XOR of every byte.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}
