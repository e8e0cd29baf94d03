//! Generated file preamble
//!
//! Every generated file starts with two comment lines (one of them carries a
//! generation timestamp) followed by one empty line. The timestamp changes
//! from one run to the next, so only the shape of the preamble is checked;
//! the remainder must equal the expected body exactly.

/// Return the body that follows a well-formed preamble
pub fn strip_preamble(content: &[u8]) -> Option<&[u8]> {
    let rest = comment_line(content)?;
    let rest = comment_line(rest)?;
    match rest {
        [b'\n', body @ ..] => Some(body),
        _ => None,
    }
}

/// Whether `content` is a preamble followed by exactly `expected`
pub fn has_expected_content(content: &[u8], expected: &[u8]) -> bool {
    strip_preamble(content) == Some(expected)
}

fn comment_line(input: &[u8]) -> Option<&[u8]> {
    match input {
        [b'#', ..] => {
            let end = input.iter().position(|&b| b == b'\n')?;
            Some(&input[end + 1..])
        }
        _ => None,
    }
}
