//! Running statistics accumulated during a scan.

use std::collections::BTreeMap;

use log::warn;

use crate::process::result::{
    MuxRateSummary, PackHeaderSummary, ParseResult, PesSummary, ProgramStreamMapSummary,
    PtsSummary, ScrSummary, StreamSummary, StreamTypeCount, SystemHeaderSummary,
};
use crate::structs::pack_header::{PackHeader, PackVersion};
use crate::structs::pes::{PesHeader, StreamKind};
use crate::structs::program_stream_map::{ProgramStreamMap, stream_type_name};
use crate::structs::system_header::SystemHeader;
use crate::structs::timestamp::{pts_seconds, system_clock_seconds};
use crate::utils::errors::{ScanIssue, Unit};
use crate::utils::window::Interrupt;

/// Default cap on recorded issues.
pub const MAX_ISSUES: usize = 200;

/// Issue messages, capped at a fixed number plus one omission marker.
#[derive(Debug, Clone)]
pub struct IssueLog {
    entries: Vec<String>,
    capacity: usize,
    omitted: bool,
}

impl IssueLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            omitted: false,
        }
    }

    pub fn push(&mut self, issue: ScanIssue) {
        if self.omitted {
            return;
        }

        let issue = if self.entries.len() < self.capacity {
            issue
        } else {
            self.omitted = true;
            ScanIssue::IssuesOmitted
        };

        warn!("{issue}");
        self.entries.push(issue.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}

/// Samples of a monotonic clock, in ticks.
#[derive(Debug, Clone, Default)]
struct TimestampTrack {
    count: u64,
    first: Option<u64>,
    last: Option<u64>,
    min: Option<u64>,
    max: Option<u64>,
    backwards_count: u64,
}

impl TimestampTrack {
    fn push(&mut self, value: u64) {
        if self.last.is_some_and(|last| value < last) {
            self.backwards_count += 1;
        }

        self.count += 1;
        self.first.get_or_insert(value);
        self.last = Some(value);
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    /// Ticks between the first and last sample of a track that never went
    /// backwards and holds at least two samples.
    fn span(&self) -> Option<u64> {
        match (self.first, self.last) {
            (Some(first), Some(last))
                if self.count >= 2 && self.backwards_count == 0 && last >= first =>
            {
                Some(last - first)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct PackStats {
    total_count: u64,
    mpeg1_count: u64,
    mpeg2_count: u64,
    invalid_count: u64,
    stuffing_bytes_total: u64,
    /// In 27 MHz ticks.
    scr: TimestampTrack,
    mux_rate_min: Option<u32>,
    mux_rate_max: Option<u32>,
}

#[derive(Debug, Default)]
struct SystemHeaderStats {
    total_count: u64,
    truncated_count: u64,
    length_total: u64,
    length_min: Option<u16>,
    length_max: Option<u16>,
    first: Option<SystemHeader>,
}

#[derive(Debug, Default)]
struct MapStats {
    total_count: u64,
    truncated_count: u64,
    first: Option<ProgramStreamMap>,
    histogram: BTreeMap<u8, u64>,
}

#[derive(Debug)]
struct StreamStat {
    stream_id: u8,
    kind: StreamKind,
    packet_count: u64,
    packet_length_zero_count: u64,
    declared_bytes_total: u64,
    pts: TimestampTrack,
    dts_count: u64,
}

impl StreamStat {
    fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            kind: StreamKind::from_stream_id(stream_id),
            packet_count: 0,
            packet_length_zero_count: 0,
            declared_bytes_total: 0,
            pts: TimestampTrack::default(),
            dts_count: 0,
        }
    }

    fn summarize(self) -> StreamSummary {
        let pts = &self.pts;

        StreamSummary {
            stream_id: self.stream_id,
            kind: self.kind,
            packet_count: self.packet_count,
            packet_length_zero_count: self.packet_length_zero_count,
            declared_bytes_total: self.declared_bytes_total,
            pts: PtsSummary {
                count: pts.count,
                first: pts.first,
                last: pts.last,
                min: pts.min,
                max: pts.max,
                backwards_count: pts.backwards_count,
                first_seconds: pts.first.map(pts_seconds),
                last_seconds: pts.last.map(pts_seconds),
                min_seconds: pts.min.map(pts_seconds),
                max_seconds: pts.max.map(pts_seconds),
                duration_seconds: pts.span().map(pts_seconds),
            },
            dts_count: self.dts_count,
        }
    }
}

/// Mutable aggregate owned by a single scan and consumed by [`Self::finalize`].
#[derive(Debug)]
pub struct ScanState {
    file_size: u64,
    packs: PackStats,
    system_headers: SystemHeaderStats,
    maps: MapStats,
    streams: BTreeMap<u8, StreamStat>,
    total_packets: u64,
    total_declared_bytes: u64,
    program_end_code_offset: Option<u64>,
    issues: IssueLog,
    cancelled: bool,
}

impl ScanState {
    pub fn new(file_size: u64, max_issues: usize) -> Self {
        Self {
            file_size,
            packs: PackStats::default(),
            system_headers: SystemHeaderStats::default(),
            maps: MapStats::default(),
            streams: BTreeMap::new(),
            total_packets: 0,
            total_declared_bytes: 0,
            program_end_code_offset: None,
            issues: IssueLog::new(max_issues),
            cancelled: false,
        }
    }

    pub fn issue(&mut self, issue: ScanIssue) {
        self.issues.push(issue);
    }

    pub fn extend_issues(&mut self, issues: impl IntoIterator<Item = ScanIssue>) {
        for issue in issues {
            self.issues.push(issue);
        }
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// Records why a read came up short at `offset`.
    pub fn interrupted(&mut self, interrupt: Interrupt, offset: u64) {
        let issue = match interrupt {
            Interrupt::Cancelled => {
                self.cancelled = true;
                ScanIssue::Cancelled { offset }
            }
            Interrupt::Io(e) => ScanIssue::ReadFailed {
                offset,
                reason: e.to_string(),
            },
            Interrupt::ShortRead {
                offset: read_offset,
                expected,
                actual,
            } => ScanIssue::ReadFailed {
                offset,
                reason: format!(
                    "source returned {actual} of {expected} bytes requested at {read_offset}"
                ),
            },
        };

        self.issue(issue);
    }

    pub fn record_pack(&mut self, header: &PackHeader, stuffing_bytes: u64) {
        let packs = &mut self.packs;

        packs.total_count += 1;
        match header.version {
            PackVersion::Mpeg1 => packs.mpeg1_count += 1,
            PackVersion::Mpeg2 => packs.mpeg2_count += 1,
        }
        packs.stuffing_bytes_total += stuffing_bytes;
        packs.scr.push(header.scr_ticks());
        let rate = header.mux_rate;
        packs.mux_rate_min = Some(packs.mux_rate_min.map_or(rate, |m| m.min(rate)));
        packs.mux_rate_max = Some(packs.mux_rate_max.map_or(rate, |m| m.max(rate)));
    }

    pub fn record_invalid_pack(&mut self) {
        self.packs.total_count += 1;
        self.packs.invalid_count += 1;
    }

    /// Counts a system header of the given declared length. Only the first
    /// decoded header is retained.
    pub fn record_system_header(&mut self, length: u16, header: Option<SystemHeader>) {
        let stats = &mut self.system_headers;

        stats.total_count += 1;
        stats.length_total += length as u64;
        stats.length_min = Some(stats.length_min.map_or(length, |m| m.min(length)));
        stats.length_max = Some(stats.length_max.map_or(length, |m| m.max(length)));

        if stats.first.is_none() {
            stats.first = header;
        }
    }

    /// Counts a program stream map and folds its entries into the stream
    /// type histogram. Only the first decoded map is retained.
    pub fn record_program_stream_map(&mut self, map: Option<ProgramStreamMap>) {
        let stats = &mut self.maps;
        stats.total_count += 1;

        let Some(map) = map else {
            return;
        };

        for entry in &map.entries {
            *stats.histogram.entry(entry.stream_type).or_default() += 1;
        }

        if stats.first.is_none() {
            stats.first = Some(map);
        }
    }

    /// Counts a unit that ran past the end of the source.
    pub fn record_truncated(&mut self, unit: Unit) {
        match unit {
            Unit::SystemHeader => self.system_headers.truncated_count += 1,
            Unit::ProgramStreamMap => self.maps.truncated_count += 1,
            Unit::PackHeader | Unit::PesPacket => {}
        }
    }

    pub fn record_pes(&mut self, header: &PesHeader) {
        let stream = self
            .streams
            .entry(header.stream_id)
            .or_insert_with(|| StreamStat::new(header.stream_id));

        stream.packet_count += 1;
        stream.declared_bytes_total += header.packet_length as u64;
        if header.packet_length == 0 {
            stream.packet_length_zero_count += 1;
        }
        if let Some(pts) = header.pts {
            stream.pts.push(pts);
        }
        if header.dts.is_some() {
            stream.dts_count += 1;
        }

        self.total_packets += 1;
        self.total_declared_bytes += header.packet_length as u64;
    }

    pub fn record_program_end(&mut self, offset: u64) {
        self.program_end_code_offset.get_or_insert(offset);
    }

    /// Projects the accumulated statistics into a [`ParseResult`].
    pub fn finalize(self, bytes_scanned: u64) -> ParseResult {
        let packs = self.packs;
        let scr = &packs.scr;
        let system_headers = self.system_headers;
        let maps = self.maps;

        ParseResult {
            file_size: self.file_size,
            bytes_scanned,
            cancelled: self.cancelled,
            pack_headers: PackHeaderSummary {
                total_count: packs.total_count,
                mpeg1_count: packs.mpeg1_count,
                mpeg2_count: packs.mpeg2_count,
                invalid_count: packs.invalid_count,
                stuffing_bytes_total: packs.stuffing_bytes_total,
                scr: ScrSummary {
                    count: scr.count,
                    first_seconds: scr.first.map(system_clock_seconds),
                    last_seconds: scr.last.map(system_clock_seconds),
                    min_seconds: scr.min.map(system_clock_seconds),
                    max_seconds: scr.max.map(system_clock_seconds),
                    backwards_count: scr.backwards_count,
                    duration_seconds: scr.span().map(system_clock_seconds),
                },
                mux_rate: MuxRateSummary {
                    min: packs.mux_rate_min,
                    max: packs.mux_rate_max,
                    min_bytes_per_second: packs.mux_rate_min.map(bytes_per_second),
                    max_bytes_per_second: packs.mux_rate_max.map(bytes_per_second),
                },
            },
            system_headers: SystemHeaderSummary {
                total_count: system_headers.total_count,
                truncated_count: system_headers.truncated_count,
                length_total: system_headers.length_total,
                length_min: system_headers.length_min,
                length_max: system_headers.length_max,
                first_header: system_headers.first,
            },
            program_stream_maps: ProgramStreamMapSummary {
                total_count: maps.total_count,
                truncated_count: maps.truncated_count,
                first_map: maps.first,
                stream_type_histogram: maps
                    .histogram
                    .into_iter()
                    .map(|(stream_type, count)| StreamTypeCount {
                        stream_type,
                        name: stream_type_name(stream_type),
                        count,
                    })
                    .collect(),
            },
            pes: PesSummary {
                total_packets: self.total_packets,
                total_declared_bytes: self.total_declared_bytes,
                streams: self
                    .streams
                    .into_values()
                    .map(StreamStat::summarize)
                    .collect(),
            },
            program_end_code_offset: self.program_end_code_offset,
            issues: self.issues.into_vec(),
        }
    }
}

fn bytes_per_second(mux_rate: u32) -> u64 {
    mux_rate as u64 * crate::structs::pack_header::MUX_RATE_UNIT_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pes(stream_id: u8, pts: Option<u64>) -> PesHeader {
        PesHeader {
            stream_id,
            packet_length: 100,
            pts_dts_flags: pts.map(|_| 0b10),
            header_data_length: pts.map(|_| 5),
            pts,
            dts: None,
        }
    }

    #[test]
    fn issue_log_caps_with_single_marker() {
        let mut log = IssueLog::new(3);
        for offset in 0..10 {
            log.push(ScanIssue::SyncLost { from: offset });
        }

        let entries = log.into_vec();
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries[2],
            "Lost sync at offset 2, no further start code before end of file"
        );
        assert_eq!(entries[3], "Further issues omitted");
    }

    #[test]
    fn issue_log_at_capacity_has_no_marker() {
        let mut log = IssueLog::new(2);
        log.push(ScanIssue::Cancelled { offset: 1 });
        log.push(ScanIssue::Cancelled { offset: 2 });
        assert_eq!(log.len(), 2);
        assert!(!log.into_vec().contains(&"Further issues omitted".to_string()));
    }

    #[test]
    fn forward_pts_has_duration() {
        let mut state = ScanState::new(0, MAX_ISSUES);
        state.record_pes(&pes(0xE0, Some(90_000)));
        state.record_pes(&pes(0xE0, Some(180_000)));

        let result = state.finalize(0);
        let stream = result.stream(0xE0).unwrap();
        assert_eq!(stream.pts.count, 2);
        assert_eq!(stream.pts.backwards_count, 0);
        assert_eq!(stream.pts.duration_seconds, Some(1.0));
        assert_eq!(stream.pts.first_seconds, Some(1.0));
    }

    #[test]
    fn backwards_pts_has_no_duration() {
        let mut state = ScanState::new(0, MAX_ISSUES);
        state.record_pes(&pes(0xC0, Some(180_000)));
        state.record_pes(&pes(0xC0, Some(90_000)));

        let result = state.finalize(0);
        let stream = result.stream(0xC0).unwrap();
        assert_eq!(stream.pts.backwards_count, 1);
        assert_eq!(stream.pts.min, Some(90_000));
        assert_eq!(stream.pts.max, Some(180_000));
        assert_eq!(stream.pts.duration_seconds, None);
    }

    #[test]
    fn single_pts_has_no_duration() {
        let mut state = ScanState::new(0, MAX_ISSUES);
        state.record_pes(&pes(0xE0, Some(90_000)));
        state.record_pes(&pes(0xE0, None));

        let result = state.finalize(0);
        let stream = result.stream(0xE0).unwrap();
        assert_eq!(stream.packet_count, 2);
        assert_eq!(stream.pts.duration_seconds, None);
    }

    #[test]
    fn streams_are_sorted_by_id() {
        let mut state = ScanState::new(0, MAX_ISSUES);
        for id in [0xE0, 0xBD, 0xC1, 0xC0, 0xE0] {
            state.record_pes(&pes(id, None));
        }

        let result = state.finalize(0);
        let ids = result.pes.streams.iter().map(|s| s.stream_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![0xBD, 0xC0, 0xC1, 0xE0]);
        assert_eq!(result.pes.total_packets, 5);
        assert_eq!(result.pes.total_declared_bytes, 500);
        assert_eq!(result.pes.streams[0].kind, StreamKind::Private);
    }

    #[test]
    fn program_end_is_kept_once() {
        let mut state = ScanState::new(0, MAX_ISSUES);
        state.record_program_end(40);
        state.record_program_end(80);
        assert_eq!(state.finalize(0).program_end_code_offset, Some(40));
    }

    #[test]
    fn cancellation_marks_result() {
        let mut state = ScanState::new(10, MAX_ISSUES);
        state.interrupted(Interrupt::Cancelled, 4);

        let result = state.finalize(4);
        assert!(result.cancelled);
        assert_eq!(result.issues, vec!["Scan cancelled at offset 4".to_string()]);
    }
}
