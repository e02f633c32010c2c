//! C-style escaping for variable-length string values in text dumps.

/// Escapes `data` so it prints on one line with no whitespace.
///
/// Control characters with a C escape use it, printable bytes other than
/// space are copied, and everything else becomes `\` plus three octal digits.
pub fn bin_to_esc(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &b in data {
        match b {
            0x07 => out.push_str("\\a"),
            0x08 => out.push_str("\\b"),
            0x0C => out.push_str("\\f"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x0B => out.push_str("\\v"),
            b'\'' => out.push_str("\\'"),
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'?' => out.push_str("\\?"),
            b'!'..=b'~' => out.push(char::from(b)),
            _ => {
                out.push('\\');
                out.push(char::from(b'0' + ((b >> 6) & 7)));
                out.push(char::from(b'0' + ((b >> 3) & 7)));
                out.push(char::from(b'0' + (b & 7)));
            }
        }
    }
    out
}

/// Reverses [`bin_to_esc`]. Also accepts `\xHH`; unknown escapes yield the
/// escaped character itself.
pub fn esc_to_bin(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        let b = text[i];
        i += 1;
        if b != b'\\' || i >= text.len() {
            out.push(b);
            continue;
        }
        let e = text[i];
        i += 1;
        match e {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0B),
            b'x' | b'X' => {
                let mut value = 0u8;
                let mut digits = 0;
                while digits < 2 {
                    let Some(d) = text.get(i).and_then(|&c| char::from(c).to_digit(16)) else {
                        break;
                    };
                    value = (value << 4) | d as u8;
                    i += 1;
                    digits += 1;
                }
                out.push(value);
            }
            b'0'..=b'7' => {
                let mut value = u32::from(e - b'0');
                let mut digits = 1;
                while digits < 3 {
                    match text.get(i).copied() {
                        Some(c @ b'0'..=b'7') => {
                            value = (value << 3) | u32::from(c - b'0');
                            i += 1;
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                out.push(value as u8);
            }
            other => out.push(other),
        }
    }
    out
}
