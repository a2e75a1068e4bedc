//! Output decoding.
//!
//! Child processes write bytes in whatever encoding their locale uses.
//! This module turns those bytes into text without ever failing:
//!
//! ```
//! use script_glue::output::ByteDecoder;
//!
//! let decoded = ByteDecoder::decode(b"plain ascii");
//! assert_eq!(decoded.text, "plain ascii");
//!
//! // Bytes no candidate accepts still produce text
//! let decoded = ByteDecoder::decode(b"bad \xff byte");
//! assert!(decoded.lossy);
//! ```

mod decoder;

pub use decoder::{candidates, trim_line_terminator, ByteDecoder, Decoded};
