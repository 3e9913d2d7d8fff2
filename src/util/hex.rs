//! Converting octet sequences to hex strings.

use std::fmt;


/// Returns a value that displays `src` as upper case hex digits.
///
/// If `sep` is given, it is placed between each pair of digits.
pub fn display(src: &[u8], sep: Option<char>) -> impl fmt::Display + '_ {
    Display { src, sep }
}

/// Encodes a octet sequence as a lower case hex string.
pub fn encode_lower(src: &[u8]) -> String {
    let mut res = String::with_capacity(src.len() * 2);
    for &ch in src {
        res.push(char::from(LOWER_DIGITS[usize::from(ch >> 4)]));
        res.push(char::from(LOWER_DIGITS[usize::from(ch & 0x0F)]));
    }
    res
}

const DIGITS: &[u8] = b"0123456789ABCDEF";
const LOWER_DIGITS: &[u8] = b"0123456789abcdef";


//------------ Display -------------------------------------------------------

struct Display<'a> {
    src: &'a [u8],
    sep: Option<char>,
}

impl<'a> fmt::Display for Display<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, &ch) in self.src.iter().enumerate() {
            if i > 0 {
                if let Some(sep) = self.sep {
                    write!(f, "{}", sep)?;
                }
            }
            write!(
                f, "{}{}",
                char::from(DIGITS[usize::from(ch >> 4)]),
                char::from(DIGITS[usize::from(ch & 0x0F)]),
            )?;
        }
        Ok(())
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_and_encode() {
        assert_eq!(display(b"\x01\xab", None).to_string(), "01AB");
        assert_eq!(display(b"\x01\xab", Some(':')).to_string(), "01:AB");
        assert_eq!(display(b"", Some(':')).to_string(), "");
        assert_eq!(encode_lower(b"\x01\xab\xff"), "01abff");
    }
}
