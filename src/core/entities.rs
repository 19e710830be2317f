//! XML Entity Decoding and Escaping
//!
//! Handles the five predefined entities, a handful of common HTML entities,
//! and numeric character references (`&#123;` / `&#x7B;`).
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode text content, rejecting character references that are not XML characters
pub fn decode_text_strict(input: &[u8]) -> Result<Cow<'_, [u8]>, &'static str> {
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }

    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;
    while let Some(amp) = memchr(b'&', &input[pos..]) {
        result.extend_from_slice(&input[pos..pos + amp]);
        pos += amp;
        let semi = memchr(b';', &input[pos..]).ok_or("Unterminated entity reference")?;
        let entity = &input[pos + 1..pos + semi];
        match decode_entity(entity, true) {
            Some(decoded) => result.extend_from_slice(decoded.encode_utf8(&mut [0; 4]).as_bytes()),
            None if entity.first() == Some(&b'#') => return Err("Invalid character reference"),
            None => return Err("Undefined entity reference"),
        }
        pos += semi + 1;
    }
    result.extend_from_slice(&input[pos..]);
    Ok(Cow::Owned(result))
}

/// Decode all entity references in the input; unknown ones are kept verbatim
pub fn decode_entities(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &input[pos..]) {
        result.extend_from_slice(&input[pos..pos + amp]);
        pos += amp;

        let decoded = memchr(b';', &input[pos..])
            .and_then(|semi| decode_entity(&input[pos + 1..pos + semi], false).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                result.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
                pos += semi + 1;
            }
            None => {
                result.push(b'&');
                pos += 1;
            }
        }
    }
    result.extend_from_slice(&input[pos..]);
    result
}

/// Decode a single entity body (without `&` and `;`)
fn decode_entity(entity: &[u8], strict: bool) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix(b"#") {
        return decode_numeric_entity(numeric, strict);
    }

    let c = match entity {
        b"lt" => '<',
        b"gt" => '>',
        b"amp" => '&',
        b"quot" => '"',
        b"apos" => '\'',
        _ if strict => return None,
        b"nbsp" => '\u{00A0}',
        b"copy" => '\u{00A9}',
        b"reg" => '\u{00AE}',
        b"trade" => '\u{2122}',
        b"mdash" => '\u{2014}',
        b"ndash" => '\u{2013}',
        b"hellip" => '\u{2026}',
        _ => return None,
    };
    Some(c)
}

fn decode_numeric_entity(entity: &[u8], strict: bool) -> Option<char> {
    let text = std::str::from_utf8(entity).ok()?;
    let codepoint = match text.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => text.parse::<u32>().ok()?,
    };

    if strict && !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Append `text` to `buf`, escaping markup characters for element content
pub fn escape_text_into(text: &str, buf: &mut String) {
    escape_into(text, buf, false);
}

/// Append `value` to `buf`, escaping it for a double-quoted attribute
pub fn escape_attribute_into(value: &str, buf: &mut String) {
    escape_into(value, buf, true);
}

fn escape_into(text: &str, buf: &mut String, attribute: bool) {
    let bytes = text.as_bytes();
    // Fast path: nothing to escape
    if memchr3(b'<', b'>', b'&', bytes).is_none()
        && (!attribute || !bytes.iter().any(|&b| matches!(b, b'"' | b'\n' | b'\t' | b'\r')))
    {
        buf.push_str(text);
        return;
    }

    for c in text.chars() {
        match c {
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '&' => buf.push_str("&amp;"),
            '"' if attribute => buf.push_str("&quot;"),
            '\n' if attribute => buf.push_str("&#10;"),
            '\t' if attribute => buf.push_str("&#9;"),
            '\r' if attribute => buf.push_str("&#13;"),
            _ => buf.push(c),
        }
    }
}
