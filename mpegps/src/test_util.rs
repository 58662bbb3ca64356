//! Builders for synthetic Program Stream units.

use crate::structs::start_code::{
    PACK_HEADER_CODE, PROGRAM_END_CODE, PROGRAM_STREAM_MAP_CODE, START_CODE_PREFIX,
    SYSTEM_HEADER_CODE,
};

pub const PROGRAM_END: [u8; 4] = [0x00, 0x00, 0x01, PROGRAM_END_CODE];

fn start_code(code: u8) -> Vec<u8> {
    let mut out = START_CODE_PREFIX.to_vec();
    out.push(code);
    out
}

fn with_length(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = start_code(code);
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn encode_timestamp(prefix: u8, value: u64) -> [u8; 5] {
    [
        (prefix << 4) | (((value >> 30) & 0x07) as u8) << 1 | 1,
        ((value >> 22) & 0xFF) as u8,
        (((value >> 15) & 0x7F) as u8) << 1 | 1,
        ((value >> 7) & 0xFF) as u8,
        ((value & 0x7F) as u8) << 1 | 1,
    ]
}

/// MPEG-2 pack header followed by `stuffing` bytes of `0xFF`.
pub fn mpeg2_pack_header(scr_base: u64, scr_extension: u16, mux_rate: u32, stuffing: u8) -> Vec<u8> {
    let mut out = start_code(PACK_HEADER_CODE);
    out.extend_from_slice(&[
        0x40 | (((scr_base >> 30) & 0x07) as u8) << 3 | 0x04 | ((scr_base >> 28) & 0x03) as u8,
        ((scr_base >> 20) & 0xFF) as u8,
        (((scr_base >> 15) & 0x1F) as u8) << 3 | 0x04 | ((scr_base >> 13) & 0x03) as u8,
        ((scr_base >> 5) & 0xFF) as u8,
        ((scr_base & 0x1F) as u8) << 3 | 0x04 | ((scr_extension >> 7) & 0x03) as u8,
        ((scr_extension & 0x7F) as u8) << 1 | 1,
    ]);
    let mux = (mux_rate << 2) | 0x03;
    out.extend_from_slice(&mux.to_be_bytes()[1..]);
    out.push(0xF8 | (stuffing & 0x07));
    out.extend(std::iter::repeat_n(0xFF, (stuffing & 0x07) as usize));
    out
}

pub fn mpeg1_pack_header(scr: u64, mux_rate: u32) -> Vec<u8> {
    let mut out = start_code(PACK_HEADER_CODE);
    out.extend_from_slice(&[
        0x20 | (((scr >> 30) & 0x07) as u8) << 1 | 1,
        ((scr >> 22) & 0xFF) as u8,
        (((scr >> 15) & 0x7F) as u8) << 1 | 1,
        ((scr >> 7) & 0xFF) as u8,
        ((scr & 0x7F) as u8) << 1 | 1,
    ]);
    let mux = 0x80_0000 | (mux_rate << 1) | 1;
    out.extend_from_slice(&mux.to_be_bytes()[1..]);
    out
}

/// System header payload with audio_bound 1, video_bound 1, fixed and
/// lock flags set and `(stream_id, scale, size_bound)` entries.
pub fn system_header_payload(rate_bound: u32, entries: &[(u8, bool, u16)]) -> Vec<u8> {
    let mut out = vec![
        0x80 | ((rate_bound >> 15) & 0x7F) as u8,
        ((rate_bound >> 7) & 0xFF) as u8,
        ((rate_bound & 0x7F) as u8) << 1 | 1,
        (1 << 2) | (1 << 1),
        0x80 | 0x40 | 0x20 | 1,
        0x7F,
    ];
    for &(stream_id, scale, size_bound) in entries {
        out.extend_from_slice(&[
            stream_id,
            0xC0 | (scale as u8) << 5 | ((size_bound >> 8) & 0x1F) as u8,
            (size_bound & 0xFF) as u8,
        ]);
    }
    out
}

pub fn system_header(rate_bound: u32, entries: &[(u8, bool, u16)]) -> Vec<u8> {
    with_length(SYSTEM_HEADER_CODE, &system_header_payload(rate_bound, entries))
}

/// Program stream map payload with `(stream_type, stream_id, info_length)`
/// entries whose descriptors are zero-filled, closed by CRC `0xDEADBEEF`.
pub fn program_stream_map_payload(version: u8, info: &[u8], entries: &[(u8, u8, u16)]) -> Vec<u8> {
    let mut out = vec![0xE0 | (version & 0x1F), 0xFF];
    out.extend_from_slice(&(info.len() as u16).to_be_bytes());
    out.extend_from_slice(info);

    let map_length: u16 = entries.iter().map(|&(_, _, len)| 4 + len).sum();
    out.extend_from_slice(&map_length.to_be_bytes());
    for &(stream_type, stream_id, info_length) in entries {
        out.extend_from_slice(&[stream_type, stream_id]);
        out.extend_from_slice(&info_length.to_be_bytes());
        out.extend(std::iter::repeat_n(0x00, info_length as usize));
    }

    out.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
    out
}

pub fn program_stream_map(version: u8, entries: &[(u8, u8, u16)]) -> Vec<u8> {
    with_length(
        PROGRAM_STREAM_MAP_CODE,
        &program_stream_map_payload(version, &[], entries),
    )
}

/// PES packet with an MPEG-2 optional header carrying the given timestamps
/// and `payload_len` zero bytes.
pub fn pes_packet(stream_id: u8, pts: Option<u64>, dts: Option<u64>, payload_len: usize) -> Vec<u8> {
    let (flags, fields) = match (pts, dts) {
        (Some(pts), Some(dts)) => {
            let mut fields = encode_timestamp(0b0011, pts).to_vec();
            fields.extend_from_slice(&encode_timestamp(0b0001, dts));
            (0b11u8, fields)
        }
        (Some(pts), None) => (0b10, encode_timestamp(0b0010, pts).to_vec()),
        _ => (0b00, Vec::new()),
    };

    let mut payload = vec![0x80, flags << 6, fields.len() as u8];
    payload.extend_from_slice(&fields);
    payload.extend(std::iter::repeat_n(0x00, payload_len));
    with_length(stream_id, &payload)
}

/// PES packet with `PES_packet_length` 0 followed by `payload` verbatim.
pub fn unbounded_pes_packet(stream_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = start_code(stream_id);
    out.extend_from_slice(&[0x00, 0x00]);
    out.extend_from_slice(payload);
    out
}
