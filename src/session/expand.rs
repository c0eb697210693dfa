use thiserror::Error;

use crate::editor::Event;

/// Characters besides whitespace that end a token.
const DELIMITERS: &[char] = &['<', '>', '(', ')', '[', ']', '"', '\''];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("selection starts at {offset} but the window holds {len} characters")]
    OutOfRange { offset: usize, len: usize },
}

pub fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || DELIMITERS.contains(&c)
}

/// Grow the selection of `event` to the token around its start offset.
///
/// Offsets count characters. The token runs from just after the nearest
/// delimiter left of `q0` (or the start of `content`) up to the nearest
/// delimiter at or after `q0` (or the end). On error the event is left as it
/// was.
pub fn expand(event: &mut Event, content: &str) -> Result<(), ExpandError> {
    let chars: Vec<char> = content.chars().collect();
    let start = event.q0;
    if start > chars.len() {
        return Err(ExpandError::OutOfRange {
            offset: start,
            len: chars.len(),
        });
    }

    let r = chars[start..]
        .iter()
        .position(|&c| is_delimiter(c))
        .map_or(chars.len(), |i| start + i);

    // No delimiter on the left means the token starts the document.
    let l = chars[..start]
        .iter()
        .rposition(|&c| is_delimiter(c))
        .map_or(0, |i| i + 1);

    event.q0 = l;
    event.q1 = r;
    event.text = chars[l..r].iter().collect();
    Ok(())
}
