//! Pack header structures.
//!
//! ## MPEG-2 (ISO/IEC 13818-1), 14 bytes plus stuffing
//!
//! ```text
//! 00 00 01 BA
//! '01' SCR[32..30] marker SCR[29..15] marker SCR[14..0] marker
//! SCR_ext(9) marker program_mux_rate(22) marker marker
//! reserved(5) pack_stuffing_length(3)
//! ```
//!
//! ## MPEG-1 (ISO/IEC 11172-1), 12 bytes
//!
//! ```text
//! 00 00 01 BA
//! '0010' SCR[32..30] marker SCR[29..15] marker SCR[14..0] marker
//! marker mux_rate(22) marker
//! ```

use std::fmt::{Display, Formatter};

use anyhow::Result;
use log::trace;

use crate::structs::timestamp::system_clock_seconds;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{ScanIssue, Unit};

pub const MPEG2_PACK_HEADER_LEN: usize = 14;
pub const MPEG1_PACK_HEADER_LEN: usize = 12;

/// Mux rate is expressed in units of 50 bytes per second.
pub const MUX_RATE_UNIT_BYTES: u64 = 50;

/// Bytes needed to tell the two layouts apart.
pub const PACK_VARIANT_PROBE_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum PackVersion {
    Mpeg1,
    Mpeg2,
}

impl PackVersion {
    /// Identifies the layout from the byte following the start code.
    pub fn detect(byte: u8) -> Option<Self> {
        if byte >> 6 == 0b01 {
            Some(Self::Mpeg2)
        } else if byte >> 4 == 0b0010 {
            Some(Self::Mpeg1)
        } else {
            None
        }
    }

    /// Fixed header length, excluding stuffing.
    pub fn header_len(&self) -> usize {
        match self {
            Self::Mpeg1 => MPEG1_PACK_HEADER_LEN,
            Self::Mpeg2 => MPEG2_PACK_HEADER_LEN,
        }
    }
}

impl Display for PackVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Mpeg1 => "MPEG-1",
            Self::Mpeg2 => "MPEG-2",
        })
    }
}

/// A decoded pack header.
#[derive(Debug, Clone, PartialEq)]
pub struct PackHeader {
    pub version: PackVersion,
    /// 33-bit SCR base in 90 kHz ticks.
    pub scr_base: u64,
    /// 9-bit SCR extension in 27 MHz ticks, always 0 for MPEG-1.
    pub scr_extension: u16,
    /// 22-bit mux rate in units of 50 bytes/s.
    pub mux_rate: u32,
    /// Declared stuffing length, MPEG-2 only.
    pub stuffing_length: u8,
}

impl PackHeader {
    /// Decodes a pack header from `data`, which must begin with the start
    /// code and hold at least the fixed header length for its version.
    ///
    /// Marker bit mismatches are pushed to `issues` and decoding carries on
    /// with the values read.
    pub fn read(data: &[u8], offset: u64, issues: &mut Vec<ScanIssue>) -> Result<Self> {
        let Some(version) = data.get(4).copied().and_then(PackVersion::detect) else {
            anyhow::bail!(ScanIssue::InvalidPackHeader {
                offset,
                byte: data.get(4).copied().unwrap_or(0),
            });
        };

        let header_len = version.header_len();
        anyhow::ensure!(
            data.len() >= header_len,
            "{version} pack header needs {header_len} bytes, {} available",
            data.len()
        );

        let reader = &mut BsIoSliceReader::from_slice(&data[..header_len]);
        reader.skip_n(32)?;

        let mut check = |ok: bool, field: &'static str| {
            if !ok {
                issues.push(ScanIssue::MarkerBit {
                    unit: Unit::PackHeader,
                    field,
                    offset,
                });
            }
        };

        let header = match version {
            PackVersion::Mpeg2 => {
                reader.skip_n(2)?;
                let scr_base = read_scr(reader, &mut check)?;
                let scr_extension = reader.get_n(9)?;
                check(reader.marker()?, "SCR_extension marker");
                let mux_rate = reader.get_n(22)?;
                check(reader.marker_n(2)?, "program_mux_rate markers");
                reader.skip_n(5)?;
                let stuffing_length = reader.get_n(3)?;

                Self {
                    version,
                    scr_base,
                    scr_extension,
                    mux_rate,
                    stuffing_length,
                }
            }
            PackVersion::Mpeg1 => {
                reader.skip_n(4)?;
                let scr_base = read_scr(reader, &mut check)?;
                check(reader.marker()?, "mux_rate leading marker");
                let mux_rate = reader.get_n(22)?;
                check(reader.marker()?, "mux_rate trailing marker");

                Self {
                    version,
                    scr_base,
                    scr_extension: 0,
                    mux_rate,
                    stuffing_length: 0,
                }
            }
        };

        trace!(
            "{} pack header at {offset}: SCR {:.6}s, mux rate {}, stuffing {}",
            header.version,
            header.scr_seconds(),
            header.mux_rate,
            header.stuffing_length
        );

        Ok(header)
    }

    /// SCR in 27 MHz ticks.
    pub fn scr_ticks(&self) -> u64 {
        self.scr_base * 300 + self.scr_extension as u64
    }

    pub fn scr_seconds(&self) -> f64 {
        system_clock_seconds(self.scr_ticks())
    }

    pub fn mux_rate_bytes_per_second(&self) -> u64 {
        self.mux_rate as u64 * MUX_RATE_UNIT_BYTES
    }

    /// Size of the unit including declared stuffing. MPEG-1 stuffing is not
    /// declared and has to be measured by the caller.
    pub fn total_len(&self) -> usize {
        self.version.header_len() + self.stuffing_length as usize
    }
}

fn read_scr(
    reader: &mut BsIoSliceReader,
    check: &mut impl FnMut(bool, &'static str),
) -> std::io::Result<u64> {
    let top: u64 = reader.get_n(3)?;
    check(reader.marker()?, "SCR[32..30] marker");
    let mid: u64 = reader.get_n(15)?;
    check(reader.marker()?, "SCR[29..15] marker");
    let low: u64 = reader.get_n(15)?;
    check(reader.marker()?, "SCR[14..0] marker");

    Ok((top << 30) | (mid << 15) | low)
}
