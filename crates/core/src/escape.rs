//! Path quoting schemes used inside the archive's record files
//!
//! Two schemes are in use:
//! - Metadata quoting (mirror metadata and file statistics): backslash and
//!   newline are written as `\\` and `\n`, everything else is raw.
//! - Octal escaping (ACL and extended attribute markers): non-printable
//!   bytes, backslash and `=` are written as `\ooo`.

/// Quote a raw path for mirror metadata / statistics records
pub fn quote_path(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for &b in raw {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out
}

/// Reverse [`quote_path`]. Returns `None` on a dangling or unknown escape.
pub fn unquote_path(quoted: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(quoted.len());
    let mut iter = quoted.iter();
    while let Some(&b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next()? {
            b'\\' => out.push(b'\\'),
            b'n' => out.push(b'\n'),
            _ => return None,
        }
    }
    Some(out)
}

fn needs_octal(b: u8) -> bool {
    b == b'\\' || b == b'=' || !(0x20..=0x7e).contains(&b)
}

/// Octal-escape a raw path for ACL / extended attribute markers
pub fn octal_escape(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for &b in raw {
        if needs_octal(b) {
            out.extend_from_slice(format!("\\{:03o}", b).as_bytes());
        } else {
            out.push(b);
        }
    }
    out
}

/// Reverse [`octal_escape`]. Accepts any three-digit octal escape.
pub fn octal_unescape(escaped: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(escaped.len());
    let mut i = 0;
    while i < escaped.len() {
        let b = escaped[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        let digits = escaped.get(i + 1..i + 4)?;
        let mut value: u32 = 0;
        for &d in digits {
            if !(b'0'..=b'7').contains(&d) {
                return None;
            }
            value = value * 8 + u32::from(d - b'0');
        }
        out.push(u8::try_from(value).ok()?);
        i += 4;
    }
    Some(out)
}

/// Human-readable rendering, as shown in plan listings and logs
pub fn display_quoted(raw: &[u8]) -> String {
    String::from_utf8_lossy(&quote_path(raw)).into_owned()
}
