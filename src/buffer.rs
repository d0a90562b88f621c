//! Value-semantic byte buffers backed by arena slots.
//!
//! A buffer is addressed by a [`BufferId`]. Every operation that may grow a
//! buffer takes the handle as `&mut BufferId` and rebinds it when the content
//! is promoted to a larger size class; the old id is dead afterwards. On
//! failure the handle and its content are left exactly as they were.
//!
//! ```rust
//! use pooldoc::{Arena, ArenaConfig, SizeClass};
//!
//! let mut arena = Arena::new(ArenaConfig::small())?;
//! let mut buf = arena.buffer_create()?;
//! arena.buffer_append_str(&mut buf, "aaaaaaaaaaaaaaaaaaaa")?;
//! assert_eq!(buf.class(), SizeClass::B256);
//! assert_eq!(arena.buffer_len(buf)?, 20);
//! # Ok::<(), pooldoc::PooldocError>(())
//! ```

use crate::arena::{Arena, BufferId, SizeClass};
use crate::error::{ParseErrorKind, PooldocError, Result};

/// Byte emitted for `\uXXXX` escapes and numeric entities above 0x7F.
pub const REPLACEMENT_BYTE: u8 = b'?';

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

const NAMED_ENTITIES: &[(&[u8], u8)] = &[
    (b"&lt;", b'<'),
    (b"&gt;", b'>'),
    (b"&amp;", b'&'),
    (b"&quot;", b'"'),
    (b"&apos;", b'\''),
];

fn hex_value(byte: u8) -> Option<u32> {
    (byte as char).to_digit(16)
}

/// Narrows a decoded code point to the single byte the codecs can carry.
fn narrow(code: u32) -> u8 {
    u8::try_from(code).ok().filter(|b| b.is_ascii()).unwrap_or(REPLACEMENT_BYTE)
}

/// Decodes the JSON escape starting at `bytes[at]` (a backslash).
///
/// Returns the decoded byte and the number of input bytes consumed, or `None`
/// if the sequence is not one of the recognized forms.
pub(crate) fn decode_json_escape(bytes: &[u8], at: usize) -> Option<(u8, usize)> {
    let decoded = match *bytes.get(at + 1)? {
        b'"' => b'"',
        b'\\' => b'\\',
        b'/' => b'/',
        b'b' => 0x08,
        b'f' => 0x0C,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'u' => {
            let digits = bytes.get(at + 2..at + 6)?;
            let code = digits
                .iter()
                .try_fold(0u32, |acc, b| Some(acc * 16 + hex_value(*b)?))?;
            return Some((narrow(code), 6));
        }
        _ => return None,
    };
    Some((decoded, 2))
}

/// Decodes the XML entity starting at `bytes[at]` (an ampersand).
pub(crate) fn decode_xml_entity(bytes: &[u8], at: usize) -> Option<(u8, usize)> {
    let rest = bytes.get(at..)?;
    for &(name, byte) in NAMED_ENTITIES {
        if rest.starts_with(name) {
            return Some((byte, name.len()));
        }
    }
    let body = rest.strip_prefix(b"&#")?;
    let end = body.iter().take(10).position(|&b| b == b';')?;
    let (digits, radix) = match body[..end].split_first() {
        Some((b'x' | b'X', hex)) => (hex, 16),
        _ => (&body[..end], 10),
    };
    if digits.is_empty() {
        return None;
    }
    let code = digits.iter().try_fold(0u32, |acc, b| {
        let digit = (*b as char).to_digit(radix)?;
        acc.checked_mul(radix)?.checked_add(digit)
    })?;
    Some((narrow(code), end + 3))
}

/// True if `bytes` is exactly a JSON number lexeme:
/// `-?digits(.digits)?([eE][+-]?digits)?`.
pub(crate) fn is_json_number(bytes: &[u8]) -> bool {
    fn digits(bytes: &[u8], mut i: usize) -> usize {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    }

    let mut i = usize::from(bytes.first() == Some(&b'-'));
    let end = digits(bytes, i);
    if end == i {
        return false;
    }
    i = end;
    if bytes.get(i) == Some(&b'.') {
        let end = digits(bytes, i + 1);
        if end == i + 1 {
            return false;
        }
        i = end;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let end = digits(bytes, i);
        if end == i {
            return false;
        }
        i = end;
    }
    i == bytes.len()
}

/// True if `bytes` is emitted unquoted by the JSON serializer.
pub(crate) fn is_json_primitive(bytes: &[u8]) -> bool {
    matches!(bytes, b"null" | b"true" | b"false") || is_json_number(bytes)
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

impl Arena {
    // --- Creation ---

    /// Allocates an empty buffer in the 16-byte class.
    pub fn buffer_create(&mut self) -> Result<BufferId> {
        self.buffer_alloc(SizeClass::B16.capacity())
    }

    /// Allocates a buffer in `src`'s class holding a copy of its bytes.
    pub fn buffer_create_from(&mut self, src: BufferId) -> Result<BufferId> {
        let (src_off, len) = self.buffer_span(src)?;
        let dst = self.buffer_alloc(src.capacity())?;
        let (dst_off, _) = self.buffer_span(dst)?;
        self.region_copy(src_off, len, dst_off)?;
        self.set_buffer_len(dst, len)?;
        Ok(dst)
    }

    /// Allocates the smallest buffer holding `bytes` and copies them in.
    pub fn buffer_create_from_bytes(&mut self, bytes: &[u8]) -> Result<BufferId> {
        let dst = self.buffer_alloc(bytes.len())?;
        let (dst_off, _) = self.buffer_span(dst)?;
        self.region_write(dst_off, bytes)?;
        self.set_buffer_len(dst, bytes.len())?;
        Ok(dst)
    }

    /// [`Arena::buffer_create_from_bytes`] for text.
    pub fn buffer_create_from_str(&mut self, s: &str) -> Result<BufferId> {
        self.buffer_create_from_bytes(s.as_bytes())
    }

    /// Returns the buffer to the 16-byte class with size 0.
    pub fn buffer_clean(&mut self, buf: &mut BufferId) -> Result<()> {
        self.buffer_realloc(buf, SizeClass::B16.capacity())
    }

    /// Releases the buffer. The handle is dead afterwards.
    pub fn buffer_destroy(&mut self, buf: BufferId) -> Result<()> {
        self.buffer_free(buf)
    }

    // --- Access ---

    /// The current content of a live buffer.
    pub fn buffer_bytes(&self, buf: BufferId) -> Result<&[u8]> {
        let (offset, len) = self.buffer_span(buf)?;
        self.region_slice(offset, len)
    }

    /// Current size in bytes.
    pub fn buffer_len(&self, buf: BufferId) -> Result<usize> {
        self.buffer_span(buf).map(|(_, len)| len)
    }

    /// Capacity of the slot currently backing the buffer.
    pub fn buffer_capacity(&self, buf: BufferId) -> Result<usize> {
        self.buffer_span(buf).map(|_| buf.capacity())
    }

    // --- Growth ---

    /// Ensures `buf` can hold `needed` bytes, promoting it if necessary.
    ///
    /// Content is preserved. The larger slot is taken before the old one is
    /// released, so failure leaves `buf` untouched.
    fn buffer_reserve(&mut self, buf: &mut BufferId, needed: usize) -> Result<()> {
        let (old_off, len) = self.buffer_span(*buf)?;
        if needed <= buf.capacity() {
            return Ok(());
        }
        let fresh = self.buffer_alloc(needed)?;
        let (new_off, _) = self.buffer_span(fresh)?;
        self.region_copy(old_off, len, new_off)?;
        self.set_buffer_len(fresh, len)?;
        if let Err(e) = self.buffer_free(*buf) {
            self.buffer_free(fresh)?;
            return Err(e);
        }
        tracing::trace!(from = ?*buf, to = ?fresh, needed, "buffer promoted");
        *buf = fresh;
        Ok(())
    }

    /// Appends `len` region bytes starting at `from`.
    ///
    /// The source range must not lie inside `dst`'s own slot, since a
    /// promotion would release it.
    fn append_region(&mut self, dst: &mut BufferId, from: usize, len: usize) -> Result<()> {
        if len == 0 {
            return self.buffer_span(*dst).map(|_| ());
        }
        let (_, dst_len) = self.buffer_span(*dst)?;
        self.buffer_reserve(dst, dst_len + len)?;
        let (dst_off, _) = self.buffer_span(*dst)?;
        self.region_copy(from, len, dst_off + dst_len)?;
        self.set_buffer_len(*dst, dst_len + len)
    }

    // --- Copy / append ---

    /// Makes `dst` an equal copy of `src`, reallocating `dst` if required.
    pub fn buffer_copy(&mut self, dst: &mut BufferId, src: BufferId) -> Result<()> {
        if *dst == src {
            return self.buffer_span(src).map(|_| ());
        }
        let (src_off, len) = self.buffer_span(src)?;
        self.buffer_span(*dst)?;
        if len > dst.capacity() {
            self.buffer_realloc(dst, len)?;
        }
        let (dst_off, _) = self.buffer_span(*dst)?;
        self.region_copy(src_off, len, dst_off)?;
        self.set_buffer_len(*dst, len)
    }

    /// Replaces the content of `dst` with `bytes`.
    pub fn buffer_copy_bytes(&mut self, dst: &mut BufferId, bytes: &[u8]) -> Result<()> {
        self.buffer_span(*dst)?;
        if bytes.len() > dst.capacity() {
            self.buffer_realloc(dst, bytes.len())?;
        }
        let (dst_off, _) = self.buffer_span(*dst)?;
        self.region_write(dst_off, bytes)?;
        self.set_buffer_len(*dst, bytes.len())
    }

    /// Replaces the content of `dst` with `s`.
    pub fn buffer_copy_str(&mut self, dst: &mut BufferId, s: &str) -> Result<()> {
        self.buffer_copy_bytes(dst, s.as_bytes())
    }

    /// Appends the content of `src` to `dst`. `src` may be `dst` itself.
    pub fn buffer_append(&mut self, dst: &mut BufferId, src: BufferId) -> Result<()> {
        if *dst != src {
            let (src_off, len) = self.buffer_span(src)?;
            return self.append_region(dst, src_off, len);
        }
        let (_, len) = self.buffer_span(src)?;
        if len == 0 {
            return Ok(());
        }
        // After a promotion the source bytes live at the start of the new slot.
        self.buffer_reserve(dst, len * 2)?;
        let (dst_off, _) = self.buffer_span(*dst)?;
        self.region_copy(dst_off, len, dst_off + len)?;
        self.set_buffer_len(*dst, len * 2)
    }

    /// Appends external bytes.
    pub fn buffer_append_bytes(&mut self, dst: &mut BufferId, bytes: &[u8]) -> Result<()> {
        let (_, dst_len) = self.buffer_span(*dst)?;
        if bytes.is_empty() {
            return Ok(());
        }
        self.buffer_reserve(dst, dst_len + bytes.len())?;
        let (dst_off, _) = self.buffer_span(*dst)?;
        self.region_write(dst_off + dst_len, bytes)?;
        self.set_buffer_len(*dst, dst_len + bytes.len())
    }

    /// Appends text.
    pub fn buffer_append_str(&mut self, dst: &mut BufferId, s: &str) -> Result<()> {
        self.buffer_append_bytes(dst, s.as_bytes())
    }

    /// Appends a single byte.
    pub fn buffer_append_byte(&mut self, dst: &mut BufferId, byte: u8) -> Result<()> {
        self.buffer_append_bytes(dst, &[byte])
    }

    // --- Comparison / search ---

    /// Byte-wise equality of two buffers.
    pub fn buffer_equal(&self, a: BufferId, b: BufferId) -> Result<bool> {
        Ok(self.buffer_bytes(a)? == self.buffer_bytes(b)?)
    }

    /// Byte-wise equality against text.
    pub fn buffer_equal_str(&self, a: BufferId, s: &str) -> Result<bool> {
        Ok(self.buffer_bytes(a)? == s.as_bytes())
    }

    /// First occurrence of `needle` at or after `from`.
    ///
    /// An empty needle, or `from` past the end, yields `None`.
    pub fn buffer_find(&self, haystack: BufferId, needle: BufferId, from: usize) -> Result<Option<usize>> {
        Ok(find_bytes(self.buffer_bytes(haystack)?, self.buffer_bytes(needle)?, from))
    }

    /// [`Arena::buffer_find`] with a text needle.
    pub fn buffer_find_str(&self, haystack: BufferId, needle: &str, from: usize) -> Result<Option<usize>> {
        Ok(find_bytes(self.buffer_bytes(haystack)?, needle.as_bytes(), from))
    }

    /// First occurrence of `byte` at or after `from`.
    pub fn buffer_find_byte(&self, haystack: BufferId, byte: u8, from: usize) -> Result<Option<usize>> {
        Ok(find_bytes(self.buffer_bytes(haystack)?, &[byte], from))
    }

    /// Parses the whole buffer as a decimal `i64` with an optional leading `-`.
    ///
    /// # Errors
    /// `Parse { kind: InvalidInteger, offset }` pointing at the first offending
    /// byte (or the end, for empty input and a lone `-`). Overflow is reported
    /// at the digit that overflowed.
    pub fn buffer_parse_int(&self, buf: BufferId) -> Result<i64> {
        let bytes = self.buffer_bytes(buf)?;
        let negative = bytes.first() == Some(&b'-');
        let start = usize::from(negative);
        if bytes.len() == start {
            return Err(PooldocError::parse(ParseErrorKind::InvalidInteger, start));
        }
        let mut value: i64 = 0;
        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if !b.is_ascii_digit() {
                return Err(PooldocError::parse(ParseErrorKind::InvalidInteger, i));
            }
            let digit = i64::from(b - b'0');
            // Accumulate negatively so i64::MIN parses.
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_sub(digit))
                .ok_or_else(|| PooldocError::parse(ParseErrorKind::InvalidInteger, i))?;
        }
        if negative {
            Ok(value)
        } else {
            value
                .checked_neg()
                .ok_or_else(|| PooldocError::parse(ParseErrorKind::InvalidInteger, bytes.len() - 1))
        }
    }

    // --- Escaping ---

    /// Appends the JSON-escaped content of `src` to `out` (no quotes).
    pub(crate) fn write_json_escaped(&mut self, out: &mut BufferId, src: BufferId) -> Result<()> {
        let (src_off, len) = self.buffer_span(src)?;
        let mut run = 0;
        for i in 0..len {
            let byte = self.region_slice(src_off + i, 1)?[0];
            let short: &[u8] = match byte {
                b'"' => b"\\\"",
                b'\\' => b"\\\\",
                0x08 => b"\\b",
                0x0C => b"\\f",
                b'\n' => b"\\n",
                b'\r' => b"\\r",
                b'\t' => b"\\t",
                b if b < 0x20 => &[],
                _ => continue,
            };
            self.append_region(out, src_off + run, i - run)?;
            if short.is_empty() {
                let unicode = [
                    b'\\',
                    b'u',
                    b'0',
                    b'0',
                    HEX_DIGITS[usize::from(byte >> 4)],
                    HEX_DIGITS[usize::from(byte & 0x0F)],
                ];
                self.buffer_append_bytes(out, &unicode)?;
            } else {
                self.buffer_append_bytes(out, short)?;
            }
            run = i + 1;
        }
        self.append_region(out, src_off + run, len - run)
    }

    /// Appends the XML-escaped content of `src` to `out`.
    ///
    /// Control bytes other than tab, LF and CR are dropped.
    pub(crate) fn write_xml_escaped(&mut self, out: &mut BufferId, src: BufferId) -> Result<()> {
        let (src_off, len) = self.buffer_span(src)?;
        let mut run = 0;
        for i in 0..len {
            let byte = self.region_slice(src_off + i, 1)?[0];
            let entity: &[u8] = match byte {
                b'<' => b"&lt;",
                b'>' => b"&gt;",
                b'&' => b"&amp;",
                b'"' => b"&quot;",
                b'\'' => b"&apos;",
                b'\t' | b'\n' | b'\r' => continue,
                b if b < 0x20 => &[],
                _ => continue,
            };
            self.append_region(out, src_off + run, i - run)?;
            self.buffer_append_bytes(out, entity)?;
            run = i + 1;
        }
        self.append_region(out, src_off + run, len - run)
    }

    /// Runs `fill` into a fresh buffer sized like `buf`, then swaps it in.
    ///
    /// `buf` is only released once the replacement is complete.
    fn buffer_rewrite(
        &mut self,
        buf: &mut BufferId,
        fill: impl FnOnce(&mut Self, &mut BufferId, BufferId) -> Result<()>,
    ) -> Result<()> {
        let (_, len) = self.buffer_span(*buf)?;
        let mut out = self.buffer_alloc(len)?;
        if let Err(e) = fill(self, &mut out, *buf) {
            if let Err(cleanup) = self.buffer_free(out) {
                tracing::warn!(error = %cleanup, "failed to release scratch buffer");
            }
            return Err(e);
        }
        if let Err(e) = self.buffer_free(*buf) {
            self.buffer_free(out)?;
            return Err(e);
        }
        *buf = out;
        Ok(())
    }

    /// Replaces the content with its JSON-escaped form (no surrounding quotes).
    ///
    /// `"`, `\`, and the control bytes with short forms are escaped as
    /// `\"`, `\\`, `\b`, `\f`, `\n`, `\r`, `\t`; other bytes below 0x20 become
    /// `\u00XX`. `/` is left alone.
    pub fn buffer_escape_json(&mut self, buf: &mut BufferId) -> Result<()> {
        self.buffer_rewrite(buf, |arena, out, src| arena.write_json_escaped(out, src))
    }

    /// Decodes JSON escapes in place.
    ///
    /// Unknown or truncated escapes are kept literally. `\uXXXX` above 0x7F
    /// becomes [`REPLACEMENT_BYTE`].
    pub fn buffer_unescape_json(&mut self, buf: &mut BufferId) -> Result<()> {
        self.buffer_rewrite(buf, |arena, out, src| {
            let (src_off, len) = arena.buffer_span(src)?;
            let mut i = 0;
            while i < len {
                let decoded = {
                    let bytes = arena.region_slice(src_off, len)?;
                    if bytes[i] == b'\\' { decode_json_escape(bytes, i) } else { None }
                };
                match decoded {
                    Some((byte, consumed)) => {
                        arena.buffer_append_byte(out, byte)?;
                        i += consumed;
                    }
                    None => {
                        arena.append_region(out, src_off + i, 1)?;
                        i += 1;
                    }
                }
            }
            Ok(())
        })
    }

    /// Replaces `<`, `>`, `&`, `"`, `'` with their named entities and drops
    /// control bytes other than tab, LF and CR.
    pub fn buffer_escape_xml(&mut self, buf: &mut BufferId) -> Result<()> {
        self.buffer_rewrite(buf, |arena, out, src| arena.write_xml_escaped(out, src))
    }

    /// Decodes the five named entities and `&#NN;` / `&#xHH;` references.
    ///
    /// Unknown entities are kept literally; code points above 0x7F become
    /// [`REPLACEMENT_BYTE`].
    pub fn buffer_unescape_xml(&mut self, buf: &mut BufferId) -> Result<()> {
        self.buffer_rewrite(buf, |arena, out, src| {
            let (src_off, len) = arena.buffer_span(src)?;
            let mut run = 0;
            let mut i = 0;
            while i < len {
                let decoded = {
                    let bytes = arena.region_slice(src_off, len)?;
                    if bytes[i] == b'&' { decode_xml_entity(bytes, i) } else { None }
                };
                if let Some((byte, consumed)) = decoded {
                    arena.append_region(out, src_off + run, i - run)?;
                    arena.buffer_append_byte(out, byte)?;
                    i += consumed;
                    run = i;
                } else {
                    i += 1;
                }
            }
            arena.append_region(out, src_off + run, len - run)
        })
    }

    /// Appends XML character data from outside the arena, decoding entities.
    pub(crate) fn append_xml_text(&mut self, dst: &mut BufferId, text: &[u8]) -> Result<()> {
        let mut run = 0;
        let mut i = 0;
        while i < text.len() {
            let decoded = if text[i] == b'&' { decode_xml_entity(text, i) } else { None };
            if let Some((byte, consumed)) = decoded {
                self.buffer_append_bytes(dst, &text[run..i])?;
                self.buffer_append_byte(dst, byte)?;
                i += consumed;
                run = i;
            } else {
                i += 1;
            }
        }
        self.buffer_append_bytes(dst, &text[run..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_grammar() {
        for ok in ["0", "-1", "1.5", "-1.5e+10", "2E3", "007", "1e-2"] {
            assert!(is_json_number(ok.as_bytes()), "{ok}");
        }
        for bad in ["", "-", "1.", ".5", "1e", "1e+", "+1", "1x", "0x10", "--1"] {
            assert!(!is_json_number(bad.as_bytes()), "{bad}");
        }
    }

    #[test]
    fn json_escape_forms() {
        assert_eq!(decode_json_escape(br"\n", 0), Some((b'\n', 2)));
        assert_eq!(decode_json_escape(br"\u0041", 0), Some((b'A', 6)));
        assert_eq!(decode_json_escape(br"\u00e9", 0), Some((REPLACEMENT_BYTE, 6)));
        assert_eq!(decode_json_escape(br"\u00", 0), None);
        assert_eq!(decode_json_escape(br"\q", 0), None);
        assert_eq!(decode_json_escape(br"\", 0), None);
    }

    #[test]
    fn xml_entity_forms() {
        assert_eq!(decode_xml_entity(b"&amp;", 0), Some((b'&', 5)));
        assert_eq!(decode_xml_entity(b"&#65;", 0), Some((b'A', 5)));
        assert_eq!(decode_xml_entity(b"&#x41;", 0), Some((b'A', 6)));
        assert_eq!(decode_xml_entity(b"&#233;", 0), Some((REPLACEMENT_BYTE, 6)));
        assert_eq!(decode_xml_entity(b"&#;", 0), None);
        assert_eq!(decode_xml_entity(b"&nbsp;", 0), None);
        assert_eq!(decode_xml_entity(b"& x", 0), None);
    }

    #[test]
    fn find_edges() {
        assert_eq!(find_bytes(b"abcabc", b"bc", 0), Some(1));
        assert_eq!(find_bytes(b"abcabc", b"bc", 2), Some(4));
        assert_eq!(find_bytes(b"abc", b"", 0), None);
        assert_eq!(find_bytes(b"abc", b"c", 3), None);
        assert_eq!(find_bytes(b"ab", b"abc", 0), None);
    }
}
