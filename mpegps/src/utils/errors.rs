use std::fmt::{Display, Formatter};

/// Structural unit a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    PackHeader,
    SystemHeader,
    ProgramStreamMap,
    PesPacket,
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Unit::PackHeader => "pack header",
            Unit::SystemHeader => "system header",
            Unit::ProgramStreamMap => "program stream map",
            Unit::PesPacket => "PES packet",
        })
    }
}

/// Every anomaly the scanner can observe.
///
/// None of these abort a scan. They are rendered with [`Display`] into the
/// capped issue log of the result.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScanIssue {
    #[error("Marker bit mismatch in {unit} ({field}) at offset {offset}")]
    MarkerBit {
        unit: Unit,
        field: &'static str,
        offset: u64,
    },

    #[error("Truncated {unit} at offset {offset}: needs {needed} bytes, {available} available")]
    Truncated {
        unit: Unit,
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("Lost sync at offset {from}, resynced at offset {to} ({skipped} bytes skipped)")]
    Resynced { from: u64, to: u64, skipped: u64 },

    #[error("Lost sync at offset {from}, no further start code before end of file")]
    SyncLost { from: u64 },

    #[error("Invalid pack header at offset {offset}: unknown variant byte {byte:#04X}")]
    InvalidPackHeader { offset: u64, byte: u8 },

    #[error("Forbidden PTS_DTS_flags value 0b01 in stream {stream_id:#04X} at offset {offset}")]
    ForbiddenPtsDtsFlags { stream_id: u8, offset: u64 },

    #[error("Invalid {kind} marker bits in stream {stream_id:#04X} at offset {offset}")]
    InvalidTimestamp {
        kind: &'static str,
        stream_id: u8,
        offset: u64,
    },

    #[error(
        "{kind} field of stream {stream_id:#04X} exceeds the PES header at offset {offset} (header_data_length = {header_data_length})"
    )]
    TimestampOutsideHeader {
        kind: &'static str,
        stream_id: u8,
        offset: u64,
        header_data_length: u8,
    },

    #[error(
        "System header at offset {offset}: {trailing} trailing bytes after stream bound entries"
    )]
    SystemHeaderTrailingBytes { offset: u64, trailing: usize },

    #[error(
        "Program stream map at offset {offset}: elementary_stream_map_length {declared} exceeds available {available} bytes"
    )]
    MapLengthExceedsPayload {
        offset: u64,
        declared: u16,
        available: usize,
    },

    #[error(
        "Program stream map at offset {offset}: program_stream_info_length {declared} exceeds available {available} bytes"
    )]
    InfoLengthExceedsPayload {
        offset: u64,
        declared: u16,
        available: usize,
    },

    #[error(
        "Program stream map at offset {offset}: entry for stream {stream_id:#04X} runs past the declared map length"
    )]
    MapEntryOverrun { offset: u64, stream_id: u8 },

    #[error("Program stream map at offset {offset}: {trailing} trailing bytes in elementary stream map")]
    MapTrailingBytes { offset: u64, trailing: usize },

    #[error("Cannot decode {unit} at offset {offset}: {reason}")]
    Undecodable {
        unit: Unit,
        offset: u64,
        reason: String,
    },

    #[error("Read failed at offset {offset}: {reason}")]
    ReadFailed { offset: u64, reason: String },

    #[error("Scan cancelled at offset {offset}")]
    Cancelled { offset: u64 },

    #[error("Further issues omitted")]
    IssuesOmitted,
}
