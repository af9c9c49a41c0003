//! Delimiter framing for outgoing and incoming messages.

/// Strip one trailing line terminator (`"\r\n"`, `"\n"` or `"\r"`).
pub fn chomp(text: &[u8]) -> &[u8] {
    text.strip_suffix(b"\r\n")
        .or_else(|| text.strip_suffix(b"\n"))
        .or_else(|| text.strip_suffix(b"\r"))
        .unwrap_or(text)
}

/// Strip one trailing `delimiter` from `data`, if present.
pub fn trim_delimiter<'a>(data: &'a [u8], delimiter: &[u8]) -> &'a [u8] {
    if delimiter.is_empty() {
        return data;
    }
    data.strip_suffix(delimiter).unwrap_or(data)
}

/// Length of `text` once framed with `delimiter`.
pub fn framed_len(text: &[u8], delimiter: &[u8]) -> usize {
    unterminated(text, delimiter).len() + delimiter.len()
}

/// Write `text` followed by exactly one `delimiter` into `out`, returning
/// the number of bytes written. `out` must hold at least
/// [`framed_len`] bytes.
pub fn frame_into(text: &[u8], delimiter: &[u8], out: &mut [u8]) -> usize {
    let body = unterminated(text, delimiter);
    let len = body.len() + delimiter.len();
    out[..body.len()].copy_from_slice(body);
    out[body.len()..len].copy_from_slice(delimiter);
    len
}

/// `text` without its terminator: one line ending is chomped, then one
/// trailing `delimiter` if the text still ends with it.
fn unterminated<'a>(text: &'a [u8], delimiter: &[u8]) -> &'a [u8] {
    let body = chomp(text);
    body.strip_suffix(delimiter).unwrap_or(body)
}
