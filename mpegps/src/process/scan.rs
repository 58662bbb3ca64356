//! The single-pass scan loop.

use log::{debug, trace};
use memchr::memmem;

use crate::process::result::ParseResult;
use crate::process::state::{MAX_ISSUES, ScanState};
use crate::structs::pack_header::{PACK_VARIANT_PROBE_LEN, PackHeader, PackVersion};
use crate::structs::pes::{PES_MAX_HEADER_LEN, PES_PREFIX_LEN, PesHeader};
use crate::structs::program_stream_map::ProgramStreamMap;
use crate::structs::start_code::{START_CODE_PREFIX, StartCode};
use crate::structs::system_header::SystemHeader;
use crate::utils::cancel::CancellationToken;
use crate::utils::errors::{ScanIssue, Unit};
use crate::utils::source::ByteSource;
use crate::utils::window::{ByteWindowReader, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};

const START_CODE_LEN: usize = 4;

/// Start code plus the 16-bit length field shared by system headers,
/// program stream maps and PES packets.
const LENGTH_PREFIX_LEN: usize = 6;

/// Tunables of a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Granularity of reads from the source.
    pub chunk_size: usize,
    /// Bytes read past each chunk.
    pub overlap: usize,
    /// Issues recorded before the omission marker.
    pub max_issues: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            max_issues: MAX_ISSUES,
        }
    }
}

/// Outcome of handling the unit at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Continue at the given offset, always past the current one.
    Advance(u64),
    /// End the scan with the cursor at the given offset.
    Stop(u64),
}

/// Walks a Program Stream once, front to back, and collects statistics.
///
/// # Example
///
/// ```rust
/// use mpegps::process::EXAMPLE_DATA;
/// use mpegps::process::scan::Scanner;
///
/// let result = Scanner::new(EXAMPLE_DATA).run();
///
/// assert_eq!(result.pack_headers.mpeg2_count, 1);
/// assert_eq!(result.pes.total_packets, 1);
/// assert_eq!(result.program_end_code_offset, Some(32));
/// assert!(result.is_clean());
/// ```
pub struct Scanner<S> {
    reader: ByteWindowReader<S>,
    options: ScanOptions,
}

impl<S: ByteSource> Scanner<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, ScanOptions::default())
    }

    pub fn with_options(source: S, options: ScanOptions) -> Self {
        Self {
            reader: ByteWindowReader::with_chunking(source, options.chunk_size, options.overlap),
            options,
        }
    }

    /// Stops the scan at the next read once `token` is cancelled. The result
    /// then carries `cancelled: true` and a single cancellation issue.
    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.reader.set_cancellation(token);
    }

    /// Installs a callback receiving `(offset, file_size)` whenever a new
    /// window of the source is read.
    pub fn set_progress(&mut self, progress: impl FnMut(u64, u64) + 'static) {
        self.reader.set_progress(progress);
    }

    /// Runs the scan to completion.
    pub fn run(mut self) -> ParseResult {
        let size = self.reader.size();
        let mut state = ScanState::new(size, self.options.max_issues);
        let mut cursor = 0;

        debug!("Scanning {size} bytes");

        loop {
            match self.step(cursor, &mut state) {
                Step::Advance(next) => {
                    debug_assert!(next > cursor, "cursor must advance");
                    cursor = next;
                }
                Step::Stop(at) => {
                    cursor = at;
                    break;
                }
            }
        }

        debug!(
            "Scan stopped at offset {cursor} of {size} after {} reads, {} issues",
            self.reader.reads(),
            state.issue_count()
        );

        state.finalize(cursor)
    }

    fn step(&mut self, offset: u64, state: &mut ScanState) -> Step {
        let Some(prefix) = self.reader.bytes(offset, START_CODE_LEN) else {
            // Fewer bytes left than a start code needs.
            return self.stop(state, offset);
        };

        match StartCode::classify(prefix) {
            Some(StartCode::PackHeader) => self.pack_header(offset, state),
            Some(StartCode::SystemHeader) => self.system_header(offset, state),
            Some(StartCode::ProgramStreamMap) => self.program_stream_map(offset, state),
            Some(StartCode::ProgramEnd) => {
                trace!("Program end code at {offset}");
                state.record_program_end(offset);
                Step::Stop(offset + START_CODE_LEN as u64)
            }
            Some(StartCode::Pes(stream_id)) => self.pes_packet(offset, stream_id, state),
            None => self.resync(offset, offset + 1, true, state),
        }
    }

    fn pack_header(&mut self, offset: u64, state: &mut ScanState) -> Step {
        let Some(probe) = self.reader.bytes(offset, PACK_VARIANT_PROBE_LEN) else {
            return self.truncated(state, Unit::PackHeader, offset, PACK_VARIANT_PROBE_LEN);
        };

        let byte = probe[PACK_VARIANT_PROBE_LEN - 1];
        let Some(version) = PackVersion::detect(byte) else {
            state.record_invalid_pack();
            state.issue(ScanIssue::InvalidPackHeader { offset, byte });
            return self.resync(offset, offset + 1, false, state);
        };

        let header_len = version.header_len();
        let Some(data) = self.reader.bytes(offset, header_len) else {
            return self.truncated(state, Unit::PackHeader, offset, header_len);
        };

        let mut issues = Vec::new();
        let decoded = PackHeader::read(data, offset, &mut issues);
        state.extend_issues(issues);

        let header = match decoded {
            Ok(header) => header,
            Err(e) => {
                state.issue(ScanIssue::Undecodable {
                    unit: Unit::PackHeader,
                    offset,
                    reason: e.to_string(),
                });
                return Step::Stop(offset);
            }
        };

        let body_end = offset + header_len as u64;
        let stuffing = match version {
            PackVersion::Mpeg2 => {
                let total = header.total_len();
                if !self.reader.ensure_bytes(offset, total) {
                    return self.truncated(state, Unit::PackHeader, offset, total);
                }
                header.stuffing_length as u64
            }
            PackVersion::Mpeg1 => self.stuffing_run(body_end),
        };

        state.record_pack(&header, stuffing);
        Step::Advance(body_end + stuffing)
    }

    /// Length of the run of `0xFF` bytes starting at `offset`.
    fn stuffing_run(&mut self, offset: u64) -> u64 {
        let mut end = offset;
        while self.reader.byte_at(end) == Some(0xFF) {
            end += 1;
        }
        end - offset
    }

    fn system_header(&mut self, offset: u64, state: &mut ScanState) -> Step {
        let Some(length) = self.length_field(offset) else {
            return self.truncated(state, Unit::SystemHeader, offset, LENGTH_PREFIX_LEN);
        };

        let total = LENGTH_PREFIX_LEN + length as usize;
        let Some(data) = self.reader.bytes(offset, total) else {
            return self.truncated(state, Unit::SystemHeader, offset, total);
        };

        let mut issues = Vec::new();
        let decoded = SystemHeader::read(&data[LENGTH_PREFIX_LEN..], offset, &mut issues);
        state.extend_issues(issues);

        let header = decoded
            .map_err(|e| {
                state.issue(ScanIssue::Undecodable {
                    unit: Unit::SystemHeader,
                    offset,
                    reason: e.to_string(),
                })
            })
            .ok();
        state.record_system_header(length, header);

        Step::Advance(offset + total as u64)
    }

    fn program_stream_map(&mut self, offset: u64, state: &mut ScanState) -> Step {
        let Some(length) = self.length_field(offset) else {
            return self.truncated(state, Unit::ProgramStreamMap, offset, LENGTH_PREFIX_LEN);
        };

        let total = LENGTH_PREFIX_LEN + length as usize;
        let Some(data) = self.reader.bytes(offset, total) else {
            return self.truncated(state, Unit::ProgramStreamMap, offset, total);
        };

        let mut issues = Vec::new();
        let decoded = ProgramStreamMap::read(&data[LENGTH_PREFIX_LEN..], offset, &mut issues);
        state.extend_issues(issues);

        let map = decoded
            .map_err(|e| {
                state.issue(ScanIssue::Undecodable {
                    unit: Unit::ProgramStreamMap,
                    offset,
                    reason: e.to_string(),
                })
            })
            .ok();
        state.record_program_stream_map(map);

        Step::Advance(offset + total as u64)
    }

    fn pes_packet(&mut self, offset: u64, stream_id: u8, state: &mut ScanState) -> Step {
        let Some(length) = self.length_field(offset) else {
            return self.truncated(state, Unit::PesPacket, offset, PES_PREFIX_LEN);
        };

        let total = PES_PREFIX_LEN + length as usize;
        if offset + total as u64 > self.reader.size() {
            return self.truncated(state, Unit::PesPacket, offset, total);
        }

        let header_len = total.min(PES_MAX_HEADER_LEN);
        let Some(data) = self.reader.bytes(offset, header_len) else {
            return self.truncated(state, Unit::PesPacket, offset, header_len);
        };

        let mut issues = Vec::new();
        let decoded = PesHeader::read(data, offset, &mut issues);
        state.extend_issues(issues);

        match decoded {
            Ok(header) => {
                trace!(
                    "PES packet for stream {stream_id:#04X} at {offset}: length {length}, PTS {:?}, DTS {:?}",
                    header.pts, header.dts
                );
                state.record_pes(&header);
            }
            Err(e) => state.issue(ScanIssue::Undecodable {
                unit: Unit::PesPacket,
                offset,
                reason: e.to_string(),
            }),
        }

        if length == 0 {
            debug!(
                "Unbounded PES packet for stream {stream_id:#04X} at {offset}, searching for the next start code"
            );
            return self.resync(offset, offset + PES_PREFIX_LEN as u64, false, state);
        }

        Step::Advance(offset + total as u64)
    }

    /// The 16-bit length following the start code at `offset`.
    fn length_field(&mut self, offset: u64) -> Option<u16> {
        let bytes = self.reader.bytes(offset, LENGTH_PREFIX_LEN)?;
        Some(u16::from_be_bytes([bytes[4], bytes[5]]))
    }

    /// Moves the cursor to the next recognized start code at or after `search_from`.
    ///
    /// With `report` set, the skip and a failure to find anything are
    /// recorded as issues.
    fn resync(
        &mut self,
        lost_at: u64,
        search_from: u64,
        report: bool,
        state: &mut ScanState,
    ) -> Step {
        match self.find_start_code(search_from) {
            Some(found) => {
                if report {
                    state.issue(ScanIssue::Resynced {
                        from: lost_at,
                        to: found,
                        skipped: found - lost_at,
                    });
                } else {
                    debug!("Resynced from {lost_at} to {found}");
                }
                Step::Advance(found)
            }
            None => {
                if let Some(interrupt) = self.reader.take_interrupt() {
                    state.interrupted(interrupt, lost_at);
                    return Step::Stop(lost_at);
                }

                if report {
                    state.issue(ScanIssue::SyncLost { from: lost_at });
                } else {
                    debug!("No start code after {lost_at}");
                }
                Step::Stop(self.reader.size())
            }
        }
    }

    /// Searches window by window, overlapping consecutive windows so a start
    /// code straddling their boundary is still found.
    fn find_start_code(&mut self, from: u64) -> Option<u64> {
        let size = self.reader.size();
        let span = self.options.chunk_size.max(START_CODE_LEN * 2) as u64;
        let mut pos = from;

        while pos + START_CODE_LEN as u64 <= size {
            let want = span.min(size - pos) as usize;
            let window = self.reader.bytes(pos, want)?;

            for hit in memmem::find_iter(window, &START_CODE_PREFIX) {
                match window.get(hit + START_CODE_PREFIX.len()) {
                    Some(&code) if StartCode::from_code(code).is_some() => {
                        return Some(pos + hit as u64);
                    }
                    Some(_) => {}
                    None => break,
                }
            }

            pos += (want - START_CODE_PREFIX.len()) as u64;
        }

        None
    }

    /// Ends the scan, recording an interrupted read if there was one.
    fn stop(&mut self, state: &mut ScanState, offset: u64) -> Step {
        if let Some(interrupt) = self.reader.take_interrupt() {
            state.interrupted(interrupt, offset);
        }
        Step::Stop(offset)
    }

    /// Ends the scan on a unit that needs `needed` bytes the source cannot supply.
    fn truncated(
        &mut self,
        state: &mut ScanState,
        unit: Unit,
        offset: u64,
        needed: usize,
    ) -> Step {
        if let Some(interrupt) = self.reader.take_interrupt() {
            state.interrupted(interrupt, offset);
            return Step::Stop(offset);
        }

        state.record_truncated(unit);
        state.issue(ScanIssue::Truncated {
            unit,
            offset,
            needed: needed as u64,
            available: self.reader.size().saturating_sub(offset),
        });
        Step::Stop(offset)
    }
}

/// Scans `source` with default options.
pub fn scan<S: ByteSource>(source: S) -> ParseResult {
    Scanner::new(source).run()
}
