use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns.
///
/// CJK characters and most emoji take two columns; combining marks take none.
///
/// ```
/// use rreader::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("한국어"), 6);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates a string to at most `max_width` columns, appending `...` when
/// something was cut.
///
/// Widths of 3 or less leave no room for an ellipsis, so the result is simply
/// the longest prefix that fits. Returns `Cow::Borrowed` when the input fits.
///
/// ```
/// use rreader::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("세계 뉴스 속보", 7), "세계...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width <= ELLIPSIS_WIDTH {
        return Cow::Owned(s[..prefix_end(s, max_width)].to_string());
    }

    let cut = prefix_end(s, max_width - ELLIPSIS_WIDTH);
    Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
}

/// Fits `s` into exactly `width` columns: truncated if too long, padded with
/// spaces if too short. Used for the fixed-width source column.
///
/// ```
/// use rreader::util::fit_to_width;
///
/// assert_eq!(fit_to_width("HN", 5), "HN   ");
/// assert_eq!(fit_to_width("The Verge", 6), "The...");
/// ```
pub fn fit_to_width(s: &str, width: usize) -> String {
    let truncated = truncate_to_width(s, width);
    let used = display_width(&truncated);
    let mut out = String::with_capacity(truncated.len() + width.saturating_sub(used));
    out.push_str(&truncated);
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(used)));
    out
}

/// Byte index of the end of the longest prefix of `s` that fits in `width`
/// columns. Never splits a code point.
fn prefix_end(s: &str, width: usize) -> usize {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            return idx;
        }
        used += w;
    }
    s.len()
}

#[inline]
fn is_stripped_control(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Strip terminal control characters and ANSI escape sequences from text.
///
/// Feed titles, author names and translated text all reach the terminal, so
/// anything that could move the cursor or retitle the window is removed:
/// C0 controls and DEL, CSI sequences (`ESC [` .. final byte), OSC sequences
/// (`ESC ]` .. BEL or `ESC \`) and bare ESC. Tab, newline and carriage return
/// survive. Clean input is returned borrowed.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    if !bytes.iter().copied().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        match bytes[i] {
            0x1b if bytes.get(i + 1) == Some(&b'[') => {
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            }
            0x1b if bytes.get(i + 1) == Some(&b']') => {
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b if is_stripped_control(b) => i += 1,
            _ => {
                let start = i;
                while i < len && !is_stripped_control(bytes[i]) {
                    i += 1;
                }
                // Only ASCII bytes stop the run, so the slice stays on char
                // boundaries.
                out.push_str(&s[start..i]);
            }
        }
    }

    Cow::Owned(out)
}
