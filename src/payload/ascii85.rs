//! Ascii85 (btoa / Adobe alphabet)
//!
//! Characters `!` through `u` carry base-85 digits; `z` abbreviates a group
//! of four zero bytes. Framing delimiters are handled by the caller.

use crate::utils::PayloadError;

const OFFSET: u8 = b'!';

/// Encode bytes without delimiters
pub fn encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len().div_ceil(4) * 5);

    for chunk in input.chunks(4) {
        if chunk.len() == 4 && chunk.iter().all(|&b| b == 0) {
            out.push('z');
            continue;
        }

        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(group);

        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = (value % 85) as u8 + OFFSET;
            value /= 85;
        }

        for &digit in &digits[..chunk.len() + 1] {
            out.push(char::from(digit));
        }
    }

    out
}

fn invalid(message: impl Into<String>) -> PayloadError {
    PayloadError::Invalid {
        message: message.into(),
    }
}

fn decode_group(digits: &[u8; 5]) -> Result<[u8; 4], PayloadError> {
    let value = digits
        .iter()
        .fold(0u64, |acc, &d| acc * 85 + u64::from(d - OFFSET));
    let value = u32::try_from(value).map_err(|_| invalid("ascii85 group overflows 32 bits"))?;
    Ok(value.to_be_bytes())
}

/// Decode Ascii85 text, ignoring whitespace
pub fn decode(input: &str) -> Result<Vec<u8>, PayloadError> {
    let mut out = Vec::with_capacity(input.len() / 5 * 4);
    let mut group = [0u8; 5];
    let mut count = 0;

    for (position, byte) in input.bytes().enumerate() {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0c => continue,
            b'z' if count == 0 => out.extend_from_slice(&[0; 4]),
            b'z' => {
                return Err(invalid(format!(
                    "'z' inside an ascii85 group at offset {}",
                    position
                )))
            }
            b'!'..=b'u' => {
                group[count] = byte;
                count += 1;
                if count == 5 {
                    out.extend_from_slice(&decode_group(&group)?);
                    count = 0;
                }
            }
            other => {
                return Err(invalid(format!(
                    "illegal ascii85 character {:?} at offset {}",
                    char::from(other),
                    position
                )))
            }
        }
    }

    match count {
        0 => {}
        1 => return Err(invalid("truncated ascii85 group")),
        n => {
            for slot in group.iter_mut().skip(n) {
                *slot = b'u';
            }
            let bytes = decode_group(&group)?;
            out.extend_from_slice(&bytes[..n - 1]);
        }
    }

    Ok(out)
}
