//! Parser for the `a=b,c=d` remap batch text.
//!
//! Items are separated by `,` and each item is split on `=`.  An item that
//! does not split into exactly two parts is dropped here; items whose parts
//! are not single characters are passed through so that
//! [`KeyTranslator::remap`](super::KeyTranslator::remap) can count them as
//! rejected.  No whitespace is trimmed, because a space is a valid key.

use super::RemapError;

/// Splits `text` into `(input, output)` pairs.
///
/// # Errors
///
/// Returns [`RemapError::EmptyBatch`] if `text` is empty or only whitespace.
///
/// # Examples
///
/// ```rust
/// use keyrelay_core::keymap::parse_mapping_batch;
///
/// let pairs = parse_mapping_batch("a=z,b=y").unwrap();
/// assert_eq!(pairs, vec![("a".to_string(), "z".to_string()), ("b".to_string(), "y".to_string())]);
/// ```
pub fn parse_mapping_batch(text: &str) -> Result<Vec<(String, String)>, RemapError> {
    if text.trim().is_empty() {
        return Err(RemapError::EmptyBatch);
    }

    let pairs = text
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(input), Some(output), None) => Some((input.to_string(), output.to_string())),
                _ => None,
            }
        })
        .collect();
    Ok(pairs)
}
