//! System header structures.
//!
//! The payload following `00 00 01 BB header_length` is laid out as:
//!
//! ```text
//! marker rate_bound(22) marker
//! audio_bound(6) fixed_flag CSPS_flag
//! system_audio_lock_flag system_video_lock_flag marker video_bound(5)
//! packet_rate_restriction_flag reserved(7)
//! { stream_id(8) '11' P-STD_buffer_bound_scale P-STD_buffer_size_bound(13) } ...
//! ```

use anyhow::{Result, ensure};
use log::trace;

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{ScanIssue, Unit};

/// Fixed part of the payload preceding the stream bound entries.
pub const SYSTEM_HEADER_FIXED_LEN: usize = 6;

pub const STREAM_BOUND_ENTRY_LEN: usize = 3;

/// One P-STD buffer bound entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StreamBound {
    pub stream_id: u8,
    /// Whether the entry carried the mandatory `11` bits.
    pub valid: bool,
    pub buffer_bound_scale: Option<bool>,
    pub buffer_size_bound: Option<u16>,
    /// Buffer size in bytes, `size_bound × 1024` when scaled, else `× 128`.
    pub buffer_size_bytes: Option<u32>,
}

impl StreamBound {
    fn read(entry: &[u8]) -> Self {
        let stream_id = entry[0];

        if entry[1] >> 6 != 0b11 {
            return Self {
                stream_id,
                valid: false,
                buffer_bound_scale: None,
                buffer_size_bound: None,
                buffer_size_bytes: None,
            };
        }

        let scale = entry[1] & 0x20 != 0;
        let size_bound = (((entry[1] & 0x1F) as u16) << 8) | entry[2] as u16;
        let unit = if scale { 1024 } else { 128 };

        Self {
            stream_id,
            valid: true,
            buffer_bound_scale: Some(scale),
            buffer_size_bound: Some(size_bound),
            buffer_size_bytes: Some(size_bound as u32 * unit),
        }
    }
}

/// A decoded system header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SystemHeader {
    pub header_length: u16,
    /// Upper bound of the mux rate in units of 50 bytes/s.
    pub rate_bound: u32,
    pub audio_bound: u8,
    pub fixed_flag: bool,
    pub csps_flag: bool,
    pub system_audio_lock_flag: bool,
    pub system_video_lock_flag: bool,
    pub video_bound: u8,
    pub packet_rate_restriction_flag: bool,
    pub stream_bounds: Vec<StreamBound>,
}

impl SystemHeader {
    /// Decodes the payload that follows the 16-bit header length.
    ///
    /// `offset` is the absolute position of the start code, used for
    /// diagnostics only.
    pub fn read(payload: &[u8], offset: u64, issues: &mut Vec<ScanIssue>) -> Result<Self> {
        ensure!(
            payload.len() >= SYSTEM_HEADER_FIXED_LEN,
            "payload of {} bytes is shorter than the fixed {SYSTEM_HEADER_FIXED_LEN}",
            payload.len()
        );

        let reader = &mut BsIoSliceReader::from_slice(&payload[..SYSTEM_HEADER_FIXED_LEN]);

        let mut check = |ok: bool, field: &'static str| {
            if !ok {
                issues.push(ScanIssue::MarkerBit {
                    unit: Unit::SystemHeader,
                    field,
                    offset,
                });
            }
        };

        check(reader.marker()?, "rate_bound leading marker");
        let rate_bound = reader.get_n(22)?;
        check(reader.marker()?, "rate_bound trailing marker");
        let audio_bound = reader.get_n(6)?;
        let fixed_flag = reader.get()?;
        let csps_flag = reader.get()?;
        let system_audio_lock_flag = reader.get()?;
        let system_video_lock_flag = reader.get()?;
        check(reader.marker()?, "video_bound marker");
        let video_bound = reader.get_n(5)?;
        let packet_rate_restriction_flag = reader.get()?;
        check(reader.marker_n(7)?, "reserved bits");

        let entries = &payload[SYSTEM_HEADER_FIXED_LEN..];
        let trailing = entries.len() % STREAM_BOUND_ENTRY_LEN;
        if trailing != 0 {
            issues.push(ScanIssue::SystemHeaderTrailingBytes { offset, trailing });
        }

        let stream_bounds = entries
            .chunks_exact(STREAM_BOUND_ENTRY_LEN)
            .map(StreamBound::read)
            .collect::<Vec<_>>();

        trace!(
            "System header at {offset}: rate_bound {rate_bound}, audio_bound {audio_bound}, video_bound {video_bound}, {} stream bounds",
            stream_bounds.len()
        );

        Ok(Self {
            header_length: payload.len() as u16,
            rate_bound,
            audio_bound,
            fixed_flag,
            csps_flag,
            system_audio_lock_flag,
            system_video_lock_flag,
            video_bound,
            packet_rate_restriction_flag,
            stream_bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::system_header_payload;

    #[test]
    fn decodes_flags_and_bounds() -> Result<()> {
        let payload = system_header_payload(
            0x3F_FFFF,
            &[(0xE0, true, 232), (0xC0, false, 32)],
        );
        let mut issues = Vec::new();

        let header = SystemHeader::read(&payload, 0, &mut issues)?;
        assert!(issues.is_empty());
        assert_eq!(header.header_length, 12);
        assert_eq!(header.rate_bound, 0x3F_FFFF);
        assert_eq!(header.audio_bound, 1);
        assert_eq!(header.video_bound, 1);
        assert!(header.fixed_flag);
        assert!(!header.csps_flag);
        assert!(header.system_audio_lock_flag);
        assert!(header.system_video_lock_flag);
        assert!(!header.packet_rate_restriction_flag);

        assert_eq!(header.stream_bounds.len(), 2);
        assert_eq!(header.stream_bounds[0].stream_id, 0xE0);
        assert_eq!(header.stream_bounds[0].buffer_size_bytes, Some(232 * 1024));
        assert_eq!(header.stream_bounds[1].buffer_bound_scale, Some(false));
        assert_eq!(header.stream_bounds[1].buffer_size_bytes, Some(32 * 128));

        Ok(())
    }

    #[test]
    fn invalid_entries_and_trailing_bytes() -> Result<()> {
        let mut payload = system_header_payload(1000, &[(0xE0, true, 10)]);
        payload[7] &= 0x3F;
        payload.push(0xBD);
        let mut issues = Vec::new();

        let header = SystemHeader::read(&payload, 42, &mut issues)?;
        assert_eq!(
            issues,
            vec![ScanIssue::SystemHeaderTrailingBytes {
                offset: 42,
                trailing: 1
            }]
        );
        assert_eq!(header.stream_bounds.len(), 1);
        assert!(!header.stream_bounds[0].valid);
        assert_eq!(header.stream_bounds[0].buffer_size_bytes, None);

        Ok(())
    }

    #[test]
    fn marker_mismatches() -> Result<()> {
        let mut payload = system_header_payload(1000, &[]);
        payload[0] &= 0x7F;
        payload[4] &= !0x20;
        payload[5] = 0x00;
        let mut issues = Vec::new();

        let header = SystemHeader::read(&payload, 0, &mut issues)?;
        assert_eq!(header.rate_bound, 1000);
        assert_eq!(issues.len(), 3);

        Ok(())
    }

    #[test]
    fn too_short() {
        let mut issues = Vec::new();
        assert!(SystemHeader::read(&[0x80, 0x01], 0, &mut issues).is_err());
    }
}
