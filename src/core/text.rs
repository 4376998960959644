//! # Text Codecs
//!
//! Character encodings and escaping transforms used by the string opcodes.
//!
//! The legacy text opcodes carry their argument on a single newline-terminated
//! line, so the text has to be escaped first:
//! - `STRING` takes a quoted, printable-escaped literal ([`ascii_repr`])
//! - `UNICODE` takes a raw-unicode-escaped line ([`raw_unicode_escape`])
//!
//! The counted opcodes take raw bytes in a caller-chosen [`TextEncoding`].

use crate::error::{AssemblerError, Result};
use std::str::FromStr;

/// Text encodings accepted by the `STRING`/`BINSTRING`/`SHORT_BINSTRING` emitters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Ascii,
    Latin1,
    Utf8,
    /// UTF-16 with a little-endian byte order mark
    Utf16,
    Utf16Le,
    Utf16Be,
    /// UTF-32 with a little-endian byte order mark
    Utf32,
    Utf32Le,
    Utf32Be,
}

impl TextEncoding {
    /// Canonical codec name
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16 => "utf-16",
            TextEncoding::Utf16Le => "utf-16-le",
            TextEncoding::Utf16Be => "utf-16-be",
            TextEncoding::Utf32 => "utf-32",
            TextEncoding::Utf32Le => "utf-32-le",
            TextEncoding::Utf32Be => "utf-32-be",
        }
    }

    /// Encode `text` in this encoding.
    ///
    /// # Errors
    /// Returns `AssemblerError::InvalidArgument` if a character cannot be
    /// represented (only possible for `ascii` and `latin-1`)
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Ascii => self.encode_narrow(text, 0x7f),
            TextEncoding::Latin1 => self.encode_narrow(text, 0xff),
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Utf16 => {
                let mut out = vec![0xff, 0xfe];
                out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
                Ok(out)
            }
            TextEncoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            TextEncoding::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            TextEncoding::Utf32 => {
                let mut out = vec![0xff, 0xfe, 0x00, 0x00];
                out.extend(text.chars().flat_map(|c| u32::from(c).to_le_bytes()));
                Ok(out)
            }
            TextEncoding::Utf32Le => Ok(text
                .chars()
                .flat_map(|c| u32::from(c).to_le_bytes())
                .collect()),
            TextEncoding::Utf32Be => Ok(text
                .chars()
                .flat_map(|c| u32::from(c).to_be_bytes())
                .collect()),
        }
    }

    fn encode_narrow(self, text: &str, max: u32) -> Result<Vec<u8>> {
        text.chars()
            .enumerate()
            .map(|(pos, c)| {
                let code = u32::from(c);
                if code <= max {
                    Ok(code as u8)
                } else {
                    Err(AssemblerError::InvalidArgument(format!(
                        "'{}' codec can't encode character U+{code:04X} in position {pos}",
                        self.name()
                    )))
                }
            })
            .collect()
    }
}

impl FromStr for TextEncoding {
    type Err = AssemblerError;

    /// Resolve an encoding name. Lookup is case-insensitive and treats `_`
    /// and spaces as `-`.
    fn from_str(name: &str) -> Result<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        let encoding = match normalized.as_str() {
            "ascii" | "us-ascii" | "646" => TextEncoding::Ascii,
            "latin-1" | "latin1" | "latin" | "l1" | "iso-8859-1" | "iso8859-1" | "8859"
            | "cp819" => TextEncoding::Latin1,
            "utf-8" | "utf8" | "u8" | "utf" => TextEncoding::Utf8,
            "utf-16" | "utf16" | "u16" => TextEncoding::Utf16,
            "utf-16-le" | "utf-16le" | "utf16le" => TextEncoding::Utf16Le,
            "utf-16-be" | "utf-16be" | "utf16be" => TextEncoding::Utf16Be,
            "utf-32" | "utf32" | "u32" => TextEncoding::Utf32,
            "utf-32-le" | "utf-32le" | "utf32le" => TextEncoding::Utf32Le,
            "utf-32-be" | "utf-32be" | "utf32be" => TextEncoding::Utf32Be,
            _ => return Err(AssemblerError::LookupError(name.to_string())),
        };
        Ok(encoding)
    }
}

/// Printable-escaped, double-quoted literal of `text`.
///
/// `\` and `"` are backslash-escaped, tab/newline/carriage return use their
/// short escapes, remaining control characters and everything up to 0xFF
/// outside printable ASCII use `\xNN`, other BMP characters `\uNNNN` and
/// astral characters `\UNNNNNNNN`. Hex digits are lowercase.
pub fn ascii_repr(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' '..='~' => out.push(c),
            _ => {
                let code = u32::from(c);
                let escape = match code {
                    0..=0xff => format!("\\x{code:02x}"),
                    0x100..=0xffff => format!("\\u{code:04x}"),
                    _ => format!("\\U{code:08x}"),
                };
                out.push_str(&escape);
            }
        }
    }
    out.push('"');
    out
}

/// Raw-unicode-escape transform: characters up to 0xFF become one byte,
/// BMP characters `\uXXXX`, astral characters `\UXXXXXXXX`.
///
/// Backslashes are not escaped; callers that need a lossless line must
/// substitute them first.
pub fn raw_unicode_escape(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        let code = u32::from(c);
        match code {
            0..=0xff => out.push(code as u8),
            0x100..=0xffff => out.extend_from_slice(format!("\\u{code:04x}").as_bytes()),
            _ => out.extend_from_slice(format!("\\U{code:08x}").as_bytes()),
        }
    }
    out
}

/// UTF-8 bytes of `text` with surrogate-pass semantics.
///
/// A Rust `str` cannot contain lone surrogates, so this is plain UTF-8.
#[inline]
pub fn utf8_surrogatepass(text: &str) -> &[u8] {
    text.as_bytes()
}
