#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! A Program Stream is a sequence of units, each introduced by the start code
//! prefix `00 00 01` and a one-byte code:
//!
//! - `0xBA` pack header carrying the SCR and mux rate (MPEG-1 or MPEG-2 layout)
//! - `0xBB` system header with rate and buffer bounds
//! - `0xBC` program stream map listing the elementary streams
//! - `0xBD..=0xF8` PES packets carrying elementary stream data
//! - `0xB9` program end code
//!
//! ### Damaged Input
//!
//! Nothing in a scan fails. Conformance problems, truncation and loss of sync
//! are collected as issues, capped at 200 plus one omission marker, and the
//! scan either carries on or stops where it cannot safely continue.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mpegps::utils::source::ReaderSource;
//!
//! let source = ReaderSource::open("movie.mpg")?;
//! let result = mpegps::scan(source);
//!
//! for stream in &result.pes.streams {
//!     println!(
//!         "{:#04X} {}: {} packets, duration {:?}",
//!         stream.stream_id, stream.kind, stream.packet_count, stream.pts.duration_seconds
//!     );
//! }
//!
//! for issue in &result.issues {
//!     eprintln!("{issue}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Scanning and its results.
///
/// 1. **Scan Loop** ([`process::scan`]): Walks the stream and resynchronizes
///    after corruption.
///
/// 2. **State** ([`process::state`]): Running statistics and the capped issue log.
///
/// 3. **Result** ([`process::result`]): The immutable report.
pub mod process;

/// Data structures representing Program Stream components.
///
/// - **Start Codes** ([`structs::start_code`]): Unit classification
/// - **Pack Headers** ([`structs::pack_header`]): SCR and mux rate
/// - **System Headers** ([`structs::system_header`]): Rate and buffer bounds
/// - **Program Stream Maps** ([`structs::program_stream_map`]): Stream types
/// - **PES Packets** ([`structs::pes`]): Stream ids and timestamps
/// - **Timestamps** ([`structs::timestamp`]): 33-bit PTS/DTS
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Byte Sources** ([`utils::source`]): Random access input
/// - **Byte Windows** ([`utils::window`]): Bounded lazy reads
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **Cancellation** ([`utils::cancel`]): Cooperative scan abort
/// - **Error Handling** ([`utils::errors`]): Issue types
pub mod utils;

#[cfg(test)]
mod test_util;

pub use process::result::ParseResult;
pub use process::scan::scan;
pub use structs::start_code::is_program_stream;
