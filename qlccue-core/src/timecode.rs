//! `MM:SS.mmm` timecodes

use crate::ParseError;

/// Converts a `MM:SS.mmm` timecode to milliseconds.
///
/// The format is fixed: two digits of minutes, two of seconds and three of
/// milliseconds. Anything else, including surrounding whitespace, is rejected.
pub fn decode(timecode: &str) -> Result<u64, ParseError> {
    let bytes = timecode.as_bytes();
    let well_formed = bytes.len() == 9
        && bytes[2] == b':'
        && bytes[5] == b'.'
        && [0, 1, 3, 4, 6, 7, 8]
            .iter()
            .all(|&i| bytes[i].is_ascii_digit());

    if !well_formed {
        return Err(ParseError::InvalidTimecode(timecode.to_string()));
    }

    let digits = |range: std::ops::Range<usize>| -> u64 {
        bytes[range]
            .iter()
            .fold(0, |acc, b| acc * 10 + u64::from(b - b'0'))
    };

    let minutes = digits(0..2);
    let seconds = digits(3..5);
    let millis = digits(6..9);

    Ok(minutes * 60_000 + seconds * 1_000 + millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        assert_eq!(decode("02:03.450").unwrap(), 123_450);
        assert_eq!(decode("00:00.000").unwrap(), 0);
        assert_eq!(decode("00:05.000").unwrap(), 5_000);
        assert_eq!(decode("99:59.999").unwrap(), 5_999_999);
    }

    #[test]
    fn test_decode_rejects_other_shapes() {
        for bad in ["2:3.45", "02:03", "02:03.45", "02.03:450", " 02:03.450", "0a:03.450", ""] {
            assert!(
                matches!(decode(bad), Err(ParseError::InvalidTimecode(ref s)) if s == bad),
                "{bad:?} should be rejected"
            );
        }
    }
}
