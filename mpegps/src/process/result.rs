//! The immutable outcome of a scan.

use crate::structs::pes::StreamKind;
use crate::structs::program_stream_map::ProgramStreamMap;
use crate::structs::system_header::SystemHeader;

/// Everything a scan learned about a Program Stream.
///
/// Always produced, even for damaged input. Anomalies are listed in
/// [`issues`](Self::issues), capped with a trailing omission marker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ParseResult {
    pub file_size: u64,
    /// Cursor position when the scan stopped.
    pub bytes_scanned: u64,
    pub cancelled: bool,
    pub pack_headers: PackHeaderSummary,
    pub system_headers: SystemHeaderSummary,
    pub program_stream_maps: ProgramStreamMapSummary,
    pub pes: PesSummary,
    pub program_end_code_offset: Option<u64>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PackHeaderSummary {
    pub total_count: u64,
    pub mpeg1_count: u64,
    pub mpeg2_count: u64,
    pub invalid_count: u64,
    pub stuffing_bytes_total: u64,
    pub scr: ScrSummary,
    pub mux_rate: MuxRateSummary,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ScrSummary {
    pub count: u64,
    pub first_seconds: Option<f64>,
    pub last_seconds: Option<f64>,
    pub min_seconds: Option<f64>,
    pub max_seconds: Option<f64>,
    pub backwards_count: u64,
    pub duration_seconds: Option<f64>,
}

/// Mux rates in units of 50 bytes/s, with their byte rate equivalents.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MuxRateSummary {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub min_bytes_per_second: Option<u64>,
    pub max_bytes_per_second: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SystemHeaderSummary {
    pub total_count: u64,
    pub truncated_count: u64,
    pub length_total: u64,
    pub length_min: Option<u16>,
    pub length_max: Option<u16>,
    /// Full decode of the first system header only.
    pub first_header: Option<SystemHeader>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ProgramStreamMapSummary {
    pub total_count: u64,
    pub truncated_count: u64,
    pub first_map: Option<ProgramStreamMap>,
    /// Entries of every decoded map, sorted by stream type.
    pub stream_type_histogram: Vec<StreamTypeCount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StreamTypeCount {
    pub stream_type: u8,
    pub name: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PesSummary {
    pub total_packets: u64,
    /// Sum of `PES_packet_length` over all counted packets.
    pub total_declared_bytes: u64,
    /// Sorted by stream id.
    pub streams: Vec<StreamSummary>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StreamSummary {
    pub stream_id: u8,
    pub kind: StreamKind,
    pub packet_count: u64,
    pub packet_length_zero_count: u64,
    pub declared_bytes_total: u64,
    pub pts: PtsSummary,
    pub dts_count: u64,
}

/// PTS statistics in 90 kHz ticks.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PtsSummary {
    pub count: u64,
    pub first: Option<u64>,
    pub last: Option<u64>,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub backwards_count: u64,
    pub first_seconds: Option<f64>,
    pub last_seconds: Option<f64>,
    pub min_seconds: Option<f64>,
    pub max_seconds: Option<f64>,
    /// Present only for at least two samples that never went backwards.
    pub duration_seconds: Option<f64>,
}

impl ParseResult {
    /// Looks up a stream by id.
    pub fn stream(&self, stream_id: u8) -> Option<&StreamSummary> {
        self.pes
            .streams
            .binary_search_by_key(&stream_id, |s| s.stream_id)
            .ok()
            .map(|index| &self.pes.streams[index])
    }

    /// Whether the scan ran into no anomalies at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}
