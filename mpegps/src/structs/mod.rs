//! Data structures representing Program Stream components.
//!
//! Each decoder interprets a region of bytes that the scanner has already
//! made available and returns a typed record, pushing any conformance
//! diagnostics instead of failing.

pub mod pack_header;
pub mod pes;
pub mod program_stream_map;
pub mod start_code;
pub mod system_header;
pub mod timestamp;
