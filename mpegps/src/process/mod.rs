/// Immutable scan output.
///
/// Provides [`ParseResult`](result::ParseResult) and the per-unit summaries
/// nested inside it.
pub mod result;

/// Single-pass scanning.
///
/// Provides the [`Scanner`](scan::Scanner) driving a
/// [`ByteWindowReader`](crate::utils::window::ByteWindowReader) over a
/// [`ByteSource`](crate::utils::source::ByteSource), and the [`scan`](scan::scan)
/// shorthand.
pub mod scan;

/// Running statistics and the capped issue log.
pub mod state;

/// A minimal Program Stream: an MPEG-2 pack header, one video PES packet
/// carrying a PTS of one second, and the program end code at offset 32.
pub const EXAMPLE_DATA: &[u8] = &[
    0x00, 0x00, 0x01, 0xBA, 0x44, 0x00, 0x04, 0x00, 0x04, 0x01, 0x00, 0x4E, 0x23, 0xF8, 0x00, 0x00,
    0x01, 0xE0, 0x00, 0x0C, 0x80, 0x80, 0x05, 0x21, 0x00, 0x05, 0xBF, 0x21, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x01, 0xB9,
];
