//! Best-effort decoding of raw process output.

use std::borrow::Cow;

use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_8};

/// Candidate encodings, tried in order.
///
/// `SHIFT_JIS` is the WHATWG Shift_JIS decoder, which already covers the
/// Windows-31J (cp932) extensions.
pub fn candidates() -> [&'static Encoding; 3] {
    [UTF_8, SHIFT_JIS, EUC_JP]
}

/// Text produced by [`ByteDecoder::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<'a> {
    /// Decoded text.
    pub text: Cow<'a, str>,
    /// Encoding that produced `text`.
    pub encoding: &'static Encoding,
    /// True when no candidate decoded cleanly and replacement characters
    /// were substituted.
    pub lossy: bool,
}

impl<'a> Decoded<'a> {
    /// Take ownership of the text.
    pub fn into_string(self) -> String {
        self.text.into_owned()
    }
}

/// Multi-codec decoder for output lines of unknown encoding.
pub struct ByteDecoder;

impl ByteDecoder {
    /// Decode `bytes` with the first candidate that accepts them, falling
    /// back to lossy UTF-8.
    ///
    /// Never fails: undecodable bytes become U+FFFD.
    pub fn decode(bytes: &[u8]) -> Decoded<'_> {
        for encoding in candidates() {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                return Decoded {
                    text,
                    encoding,
                    lossy: false,
                };
            }
        }

        Decoded {
            text: String::from_utf8_lossy(bytes),
            encoding: UTF_8,
            lossy: true,
        }
    }

    /// Decode and take ownership of the text.
    pub fn decode_to_string(bytes: &[u8]) -> String {
        Self::decode(bytes).into_string()
    }
}

/// Remove trailing `\n` and `\r` bytes.
pub fn trim_line_terminator(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = bytes {
        bytes = rest;
    }
    bytes
}
