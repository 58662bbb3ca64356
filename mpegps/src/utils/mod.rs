//! Utility functions and supporting infrastructure.
//!
//! Provides the byte source abstraction, the lazily materialized byte window,
//! bit-level reading, cancellation and the diagnostic taxonomy used by the
//! scanner.

pub mod bitstream_io;
pub mod cancel;
pub mod errors;
pub mod source;
pub mod window;
