//! Hex rendering used in log lines and by the CLI.

/// Format bytes as upper-case, space-separated hex (`44 58 01`).
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Errors from [`parse_hex`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// A character other than a hex digit or whitespace was found.
    #[error("invalid hex digit {found:?} at position {position}")]
    InvalidDigit { found: char, position: usize },
}

/// Parse hex text, ignoring whitespace. An odd digit count is padded with a
/// leading `0`, so `"4 58"` parses as `04 58`.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let trimmed = text.trim_start();
    let offset = text.len() - trimmed.len();
    let (body, offset) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(rest) => (rest, offset + 2),
        None => (trimmed, offset),
    };

    let mut nibbles = Vec::with_capacity(body.len());
    for (index, ch) in body.char_indices() {
        if ch.is_whitespace() {
            continue;
        }
        let nibble = ch.to_digit(16).ok_or(HexError::InvalidDigit {
            found: ch,
            position: offset + index,
        })?;
        nibbles.push(nibble as u8);
    }
    if nibbles.len() % 2 != 0 {
        nibbles.insert(0, 0);
    }

    Ok(nibbles
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}
