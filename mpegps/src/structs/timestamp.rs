//! 33-bit PTS/DTS timestamps.
//!
//! ```text
//! byte 0: prefix(4) ts[32..30] marker
//! byte 1: ts[29..22]
//! byte 2: ts[21..15] marker
//! byte 3: ts[14..7]
//! byte 4: ts[6..0] marker
//! ```

use log::trace;

use crate::utils::bitstream_io::BsIoSliceReader;

/// PTS/DTS clock rate.
pub const PTS_CLOCK_HZ: u64 = 90_000;

/// System clock rate used by the SCR (base × 300 + extension).
pub const SYSTEM_CLOCK_HZ: u64 = 27_000_000;

pub const TIMESTAMP_LEN: usize = 5;

/// Decodes a 33-bit timestamp from the first five bytes of `data`.
///
/// Returns `None` when fewer than five bytes are given or any of the three
/// marker bits is clear.
pub fn read_timestamp(data: &[u8]) -> Option<u64> {
    if data.len() < TIMESTAMP_LEN {
        return None;
    }

    let reader = &mut BsIoSliceReader::from_slice(&data[..TIMESTAMP_LEN]);
    let value = read_fields(reader).ok()??;

    trace!("Timestamp {value} ({:.6}s)", pts_seconds(value));
    Some(value)
}

fn read_fields(reader: &mut BsIoSliceReader) -> std::io::Result<Option<u64>> {
    reader.skip_n(4)?;

    let top: u64 = reader.get_n(3)?;
    if !reader.marker()? {
        return Ok(None);
    }
    let mid: u64 = reader.get_n(15)?;
    if !reader.marker()? {
        return Ok(None);
    }
    let low: u64 = reader.get_n(15)?;
    if !reader.marker()? {
        return Ok(None);
    }

    Ok(Some((top << 30) | (mid << 15) | low))
}

#[inline(always)]
pub fn pts_seconds(ticks: u64) -> f64 {
    ticks as f64 / PTS_CLOCK_HZ as f64
}

#[inline(always)]
pub fn system_clock_seconds(ticks: u64) -> f64 {
    ticks as f64 / SYSTEM_CLOCK_HZ as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::encode_timestamp;

    #[test]
    fn decodes_known_value() {
        assert_eq!(read_timestamp(&[0x21, 0x00, 0x05, 0xBF, 0x21]), Some(90_000));
        assert_eq!(pts_seconds(90_000), 1.0);
    }

    #[test]
    fn full_range() {
        for value in [0, 1, 0x7FFF, 0x8000, 1 << 30, (1 << 33) - 1] {
            let bytes = encode_timestamp(0b0010, value);
            assert_eq!(read_timestamp(&bytes), Some(value));
        }
    }

    #[test]
    fn rejects_missing_markers() {
        let good = encode_timestamp(0b0011, 123_456);

        for (index, mask) in [(0, 0xFE), (2, 0xFE), (4, 0xFE)] {
            let mut bad = good;
            bad[index] &= mask;
            assert_eq!(read_timestamp(&bad), None, "marker in byte {index}");
        }

        assert_eq!(read_timestamp(&good[..4]), None);
    }
}
