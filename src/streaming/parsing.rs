//! Zero-allocation start-tag inspection.
//!
//! Records are never decoded as a whole; these helpers look only at the
//! leading start tag of a raw element to classify it and pull out single
//! attribute values.

use memchr::memchr;

#[inline(always)]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Tag name of a start or end tag (`<vehicle id=..>` -> `vehicle`).
///
/// Returns an empty slice if `tag` does not start with `<`.
#[inline]
pub fn tag_name(tag: &[u8]) -> &[u8] {
    let Some(rest) = tag.strip_prefix(b"<") else {
        return &[];
    };
    let rest = rest.strip_prefix(b"/").unwrap_or(rest);
    let end = rest
        .iter()
        .position(|&b| is_space(b) || b == b'/' || b == b'>')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Find the raw value of attribute `name` in the start tag at the beginning
/// of `element`.
///
/// Scanning stops at the end of the start tag, so attributes of nested
/// children are never matched. Entity references are not expanded.
pub fn find_attribute<'a>(element: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let name_len = tag_name(element).len();
    if name_len == 0 {
        return None;
    }
    // '<' + optional '/' is never present on a start tag
    let mut pos = 1 + name_len;

    loop {
        while pos < element.len() && is_space(element[pos]) {
            pos += 1;
        }
        match element.get(pos) {
            None | Some(b'/') | Some(b'>') => return None,
            _ => {}
        }

        let attr_start = pos;
        while pos < element.len() && !is_space(element[pos]) && element[pos] != b'=' {
            if element[pos] == b'>' {
                return None;
            }
            pos += 1;
        }
        let attr = &element[attr_start..pos];

        while pos < element.len() && is_space(element[pos]) {
            pos += 1;
        }
        if element.get(pos) != Some(&b'=') {
            return None;
        }
        pos += 1;
        while pos < element.len() && is_space(element[pos]) {
            pos += 1;
        }

        let quote = *element.get(pos)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = pos + 1;
        let value_len = memchr(quote, &element[value_start..])?;
        let value = &element[value_start..value_start + value_len];

        if attr == name {
            return Some(value);
        }
        pos = value_start + value_len + 1;
    }
}

/// Parse a departure time.
///
/// Surrounding whitespace is allowed; NaN is rejected because it has no
/// place in a total order.
#[inline]
pub fn parse_depart(raw: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(raw).ok()?.trim();
    let value: f64 = s.parse().ok()?;
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}
