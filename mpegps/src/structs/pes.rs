//! PES packet headers.
//!
//! Only the parts needed for statistics are decoded: the stream id, the
//! declared packet length and, when the MPEG-2 optional header is present,
//! the PTS and DTS.

use std::fmt::{Display, Formatter};

use anyhow::{Result, ensure};

use crate::structs::timestamp::{TIMESTAMP_LEN, read_timestamp};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::ScanIssue;

/// Start code plus `PES_packet_length`.
pub const PES_PREFIX_LEN: usize = 6;

/// Flag bytes and `PES_header_data_length` of the optional header.
pub const PES_OPTIONAL_HEADER_LEN: usize = 3;

/// Largest possible span from the start code to the end of the optional header.
pub const PES_MAX_HEADER_LEN: usize = PES_PREFIX_LEN + PES_OPTIONAL_HEADER_LEN + 255;

const PTS_OFFSET: usize = PES_PREFIX_LEN + PES_OPTIONAL_HEADER_LEN;
const DTS_OFFSET: usize = PTS_OFFSET + TIMESTAMP_LEN;

/// Category of an elementary stream, derived from its stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum StreamKind {
    Video,
    Audio,
    Private,
    Padding,
    Other,
}

impl StreamKind {
    pub fn from_stream_id(stream_id: u8) -> Self {
        match stream_id {
            0xE0..=0xEF => Self::Video,
            0xC0..=0xDF => Self::Audio,
            0xBD | 0xBF => Self::Private,
            0xBE => Self::Padding,
            _ => Self::Other,
        }
    }
}

impl Display for StreamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Private => "private",
            Self::Padding => "padding",
            Self::Other => "other",
        })
    }
}

/// The decoded leading part of a PES packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PesHeader {
    pub stream_id: u8,
    pub packet_length: u16,
    /// `PTS_DTS_flags`, when an optional header is present.
    pub pts_dts_flags: Option<u8>,
    pub header_data_length: Option<u8>,
    pub pts: Option<u64>,
    pub dts: Option<u64>,
}

impl PesHeader {
    /// Decodes the header from `data`, which starts at the start code and
    /// spans at least [`PES_PREFIX_LEN`] bytes. Timestamps are only looked
    /// for within `data`, the declared packet length and the declared
    /// header data length.
    pub fn read(data: &[u8], offset: u64, issues: &mut Vec<ScanIssue>) -> Result<Self> {
        ensure!(
            data.len() >= PES_PREFIX_LEN,
            "PES header needs {PES_PREFIX_LEN} bytes, {} available",
            data.len()
        );

        let stream_id = data[3];
        let packet_length = u16::from_be_bytes([data[4], data[5]]);

        let mut header = Self {
            stream_id,
            packet_length,
            pts_dts_flags: None,
            header_data_length: None,
            pts: None,
            dts: None,
        };

        if (packet_length as usize) < PES_OPTIONAL_HEADER_LEN || data.len() < PTS_OFFSET {
            return Ok(header);
        }

        let reader = &mut BsIoSliceReader::from_slice(&data[PES_PREFIX_LEN..PTS_OFFSET]);
        if reader.get_n::<u8>(2)? != 0b10 {
            return Ok(header);
        }
        reader.skip_n(6)?;
        let flags: u8 = reader.get_n(2)?;
        reader.skip_n(6)?;
        let header_data_length: u8 = reader.get_n(8)?;

        header.pts_dts_flags = Some(flags);
        header.header_data_length = Some(header_data_length);

        let header_end = (PTS_OFFSET + header_data_length as usize)
            .min(PES_PREFIX_LEN + packet_length as usize)
            .min(data.len());

        let mut timestamp = |kind: &'static str, at: usize| -> Option<u64> {
            if at + TIMESTAMP_LEN > header_end {
                issues.push(ScanIssue::TimestampOutsideHeader {
                    kind,
                    stream_id,
                    offset,
                    header_data_length,
                });
                return None;
            }

            let value = read_timestamp(&data[at..at + TIMESTAMP_LEN]);
            if value.is_none() {
                issues.push(ScanIssue::InvalidTimestamp {
                    kind,
                    stream_id,
                    offset,
                });
            }
            value
        };

        match flags {
            0b10 => header.pts = timestamp("PTS", PTS_OFFSET),
            0b11 => {
                header.pts = timestamp("PTS", PTS_OFFSET);
                header.dts = timestamp("DTS", DTS_OFFSET);
            }
            0b01 => issues.push(ScanIssue::ForbiddenPtsDtsFlags { stream_id, offset }),
            _ => {}
        }

        Ok(header)
    }
}
