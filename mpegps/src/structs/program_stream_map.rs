//! Program stream map structures.
//!
//! ```text
//! current_next_indicator reserved(2) program_stream_map_version(5)
//! reserved(7) marker
//! program_stream_info_length(16) descriptor bytes...
//! elementary_stream_map_length(16)
//! { stream_type(8) elementary_stream_id(8) elementary_stream_info_length(16) descriptors... } ...
//! CRC_32
//! ```

use anyhow::{Result, ensure};
use log::trace;

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{ScanIssue, Unit};

/// Smallest payload holding the fixed fields and the CRC.
pub const PROGRAM_STREAM_MAP_MIN_LEN: usize = 10;

pub const ELEMENTARY_STREAM_ENTRY_LEN: usize = 4;

const CRC_LEN: usize = 4;

/// Human-readable name of an ISO/IEC 13818-1 `stream_type`.
pub fn stream_type_name(stream_type: u8) -> &'static str {
    match stream_type {
        0x01 => "MPEG-1 video",
        0x02 => "MPEG-2 video",
        0x03 => "MPEG-1 audio",
        0x04 => "MPEG-2 audio",
        0x05 => "Private sections",
        0x06 => "Private PES data",
        0x0F => "AAC (ADTS)",
        0x10 => "MPEG-4 visual",
        0x11 => "AAC (LATM)",
        0x1B => "H.264/AVC",
        0x24 => "H.265/HEVC",
        0x80 => "LPCM (user private)",
        0x81 => "AC-3 (user private)",
        0x82 => "DTS (user private)",
        0x83 => "TrueHD (user private)",
        0x84 | 0x87 => "E-AC-3 (user private)",
        0x90 => "PGS subtitles (user private)",
        0x80..=0xFF => "User private",
        _ => "Reserved",
    }
}

/// One entry of the elementary stream map. Descriptors are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ElementaryStreamEntry {
    pub stream_type: u8,
    pub stream_type_name: &'static str,
    pub elementary_stream_id: u8,
    pub info_length: u16,
}

/// A decoded program stream map.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ProgramStreamMap {
    pub map_length: u16,
    pub current_next_indicator: bool,
    pub version: u8,
    pub program_stream_info_length: u16,
    pub elementary_stream_map_length: u16,
    pub entries: Vec<ElementaryStreamEntry>,
    pub crc32: u32,
}

impl ProgramStreamMap {
    /// Decodes the payload that follows the 16-bit map length.
    ///
    /// Entries are collected until the declared elementary stream map length
    /// or the payload runs out, whichever comes first. Overruns are reported
    /// through `issues`.
    pub fn read(payload: &[u8], offset: u64, issues: &mut Vec<ScanIssue>) -> Result<Self> {
        ensure!(
            payload.len() >= PROGRAM_STREAM_MAP_MIN_LEN,
            "payload of {} bytes is shorter than the minimum {PROGRAM_STREAM_MAP_MIN_LEN}",
            payload.len()
        );

        let body_len = payload.len() - CRC_LEN;
        let crc32 = u32::from_be_bytes([
            payload[body_len],
            payload[body_len + 1],
            payload[body_len + 2],
            payload[body_len + 3],
        ]);

        let reader = &mut BsIoSliceReader::from_slice(&payload[..body_len]);

        let current_next_indicator = reader.get()?;
        reader.skip_n(2)?;
        let version = reader.get_n(5)?;
        reader.skip_n(7)?;
        if !reader.marker()? {
            issues.push(ScanIssue::MarkerBit {
                unit: Unit::ProgramStreamMap,
                field: "program_stream_map marker",
                offset,
            });
        }

        let program_stream_info_length: u16 = reader.get_n(16)?;
        // Leave room for elementary_stream_map_length.
        let info_room = reader.available_bytes()?.saturating_sub(2);
        let mut map = Self {
            map_length: payload.len() as u16,
            current_next_indicator,
            version,
            program_stream_info_length,
            elementary_stream_map_length: 0,
            entries: Vec::new(),
            crc32,
        };

        if program_stream_info_length as u64 > info_room {
            issues.push(ScanIssue::InfoLengthExceedsPayload {
                offset,
                declared: program_stream_info_length,
                available: info_room as usize,
            });
            return Ok(map);
        }
        reader.skip_bytes(program_stream_info_length as u64)?;

        map.elementary_stream_map_length = reader.get_n(16)?;
        let available = reader.available_bytes()?;
        let mut remaining = map.elementary_stream_map_length as u64;
        if remaining > available {
            issues.push(ScanIssue::MapLengthExceedsPayload {
                offset,
                declared: map.elementary_stream_map_length,
                available: available as usize,
            });
            remaining = available;
        }

        while remaining >= ELEMENTARY_STREAM_ENTRY_LEN as u64 {
            let stream_type = reader.get_n(8)?;
            let elementary_stream_id = reader.get_n(8)?;
            let info_length: u16 = reader.get_n(16)?;
            remaining -= ELEMENTARY_STREAM_ENTRY_LEN as u64;

            map.entries.push(ElementaryStreamEntry {
                stream_type,
                stream_type_name: stream_type_name(stream_type),
                elementary_stream_id,
                info_length,
            });

            if info_length as u64 > remaining {
                issues.push(ScanIssue::MapEntryOverrun {
                    offset,
                    stream_id: elementary_stream_id,
                });
                remaining = 0;
                break;
            }

            reader.skip_bytes(info_length as u64)?;
            remaining -= info_length as u64;
        }

        if remaining > 0 {
            issues.push(ScanIssue::MapTrailingBytes {
                offset,
                trailing: remaining as usize,
            });
        }

        trace!(
            "Program stream map at {offset}: version {}, {} entries",
            map.version,
            map.entries.len()
        );

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::program_stream_map_payload;

    #[test]
    fn decodes_entries() -> Result<()> {
        let payload = program_stream_map_payload(3, &[0xAA; 6], &[(0x02, 0xE0, 3), (0x04, 0xC0, 0)]);
        let mut issues = Vec::new();

        let map = ProgramStreamMap::read(&payload, 0, &mut issues)?;
        assert!(issues.is_empty());
        assert!(map.current_next_indicator);
        assert_eq!(map.version, 3);
        assert_eq!(map.program_stream_info_length, 6);
        assert_eq!(map.elementary_stream_map_length, 11);
        assert_eq!(map.entries.len(), 2);
        assert_eq!(map.entries[0].stream_type_name, "MPEG-2 video");
        assert_eq!(map.entries[0].info_length, 3);
        assert_eq!(map.entries[1].elementary_stream_id, 0xC0);
        assert_eq!(map.crc32, 0xDEAD_BEEF);

        Ok(())
    }

    #[test]
    fn declared_length_exceeds_payload() -> Result<()> {
        let mut payload = program_stream_map_payload(0, &[], &[(0x1B, 0xE0, 0), (0x0F, 0xC0, 0)]);
        // elementary_stream_map_length lives right after the empty info block.
        payload[4] = 0x00;
        payload[5] = 0x40;
        let mut issues = Vec::new();

        let map = ProgramStreamMap::read(&payload, 7, &mut issues)?;
        assert_eq!(map.entries.len(), 2);
        assert_eq!(
            issues,
            vec![ScanIssue::MapLengthExceedsPayload {
                offset: 7,
                declared: 0x40,
                available: 8
            }]
        );

        Ok(())
    }

    #[test]
    fn entry_info_overruns_map() -> Result<()> {
        let mut payload = program_stream_map_payload(0, &[], &[(0x1B, 0xE0, 0), (0x0F, 0xC0, 0)]);
        // First entry claims 200 descriptor bytes.
        payload[8] = 0x00;
        payload[9] = 200;
        let mut issues = Vec::new();

        let map = ProgramStreamMap::read(&payload, 0, &mut issues)?;
        assert_eq!(map.entries.len(), 1);
        assert!(matches!(
            issues.as_slice(),
            [ScanIssue::MapEntryOverrun {
                stream_id: 0xE0,
                ..
            }]
        ));

        Ok(())
    }

    #[test]
    fn info_length_exceeds_payload() -> Result<()> {
        let mut payload = program_stream_map_payload(0, &[], &[]);
        payload[2] = 0x01;
        let mut issues = Vec::new();

        let map = ProgramStreamMap::read(&payload, 0, &mut issues)?;
        assert!(map.entries.is_empty());
        assert_eq!(issues.len(), 1);

        Ok(())
    }

    #[test]
    fn names() {
        assert_eq!(stream_type_name(0x1B), "H.264/AVC");
        assert_eq!(stream_type_name(0x81), "AC-3 (user private)");
        assert_eq!(stream_type_name(0xC7), "User private");
        assert_eq!(stream_type_name(0x30), "Reserved");
    }
}
