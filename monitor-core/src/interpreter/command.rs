//! Single-letter command decoding.
//!
//! The first byte of a completed line selects the command. The offset
//! argument follows C `atoi` rules: leading whitespace and an optional sign
//! are accepted, the longest digit prefix is used, and anything unparseable
//! yields zero.

use winnow::combinator::opt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

/// Commands accepted over the serial link.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `b`: enable streaming.
    Begin,
    /// `s`: disable streaming.
    Stop,
    /// `o <int>`: set the calibration offset. `None` when the line has no
    /// space, in which case the offset is left alone.
    SetOffset(Option<i32>),
    /// `O`: print the calibration offset.
    QueryOffset,
    /// Any other selector byte.
    Unknown(u8),
}

impl Command {
    /// Decodes a completed line.
    #[must_use]
    pub fn parse(line: &[u8]) -> Self {
        match line.first().copied().unwrap_or(0) {
            b'b' => Command::Begin,
            b's' => Command::Stop,
            b'o' => Command::SetOffset(
                line.contains(&b' ')
                    .then(|| leading_integer(line.get(2..).unwrap_or_default())),
            ),
            b'O' => Command::QueryOffset,
            other => Command::Unknown(other),
        }
    }
}

type PResult<O> = Result<O, ErrMode<ContextError>>;

/// Parses the integer at the start of `bytes`, returning 0 when there is none.
/// Values outside `i32` saturate.
#[must_use]
pub fn leading_integer(bytes: &[u8]) -> i32 {
    let mut input = bytes;
    integer_prefix.parse_next(&mut input).unwrap_or(0)
}

fn integer_prefix(input: &mut &[u8]) -> PResult<i32> {
    (
        take_while(0.., is_c_space),
        opt(one_of([b'+', b'-'])),
        take_while(0.., |byte: u8| byte.is_ascii_digit()),
    )
        .map(|(_, sign, digits)| saturating_value(digits, sign == Some(b'-')))
        .parse_next(input)
}

fn is_c_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

fn saturating_value(digits: &[u8], negative: bool) -> i32 {
    // One past `i32::MAX` so `i32::MIN` is reachable.
    let limit = i64::from(i32::MAX) + 1;
    let magnitude = digits.iter().fold(0_i64, |acc, digit| {
        (acc * 10 + i64::from(digit - b'0')).min(limit)
    });

    let signed = if negative { -magnitude } else { magnitude };
    i32::try_from(signed).unwrap_or(if negative { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_map_to_commands() {
        assert_eq!(Command::parse(b"b\n"), Command::Begin);
        assert_eq!(Command::parse(b"s\n"), Command::Stop);
        assert_eq!(Command::parse(b"O\n"), Command::QueryOffset);
        assert_eq!(Command::parse(b"x\n"), Command::Unknown(b'x'));
        assert_eq!(Command::parse(b"\n"), Command::Unknown(b'\n'));
    }

    #[test]
    fn only_first_byte_selects() {
        assert_eq!(Command::parse(b"begin\n"), Command::Begin);
        assert_eq!(Command::parse(b"stop now\n"), Command::Stop);
    }

    #[test]
    fn offset_requires_a_space() {
        assert_eq!(Command::parse(b"o\n"), Command::SetOffset(None));
        assert_eq!(Command::parse(b"o12\n"), Command::SetOffset(None));
        assert_eq!(Command::parse(b"o 12\n"), Command::SetOffset(Some(12)));
        assert_eq!(Command::parse(b"o -7\n"), Command::SetOffset(Some(-7)));
    }

    #[test]
    fn offset_argument_starts_at_third_byte() {
        // Space found later in the line, but parsing still starts after `o?`.
        assert_eq!(Command::parse(b"o10 x\n"), Command::SetOffset(Some(0)));
        assert_eq!(Command::parse(b"ox 42\n"), Command::SetOffset(Some(42)));
    }

    #[test]
    fn leading_integer_follows_atoi() {
        assert_eq!(leading_integer(b"10\n"), 10);
        assert_eq!(leading_integer(b"  +15"), 15);
        assert_eq!(leading_integer(b"\t-3abc"), -3);
        assert_eq!(leading_integer(b"12abc"), 12);
        assert_eq!(leading_integer(b"abc"), 0);
        assert_eq!(leading_integer(b"-"), 0);
        assert_eq!(leading_integer(b"- 5"), 0);
        assert_eq!(leading_integer(b""), 0);
    }

    #[test]
    fn leading_integer_saturates() {
        assert_eq!(leading_integer(b"2147483647"), i32::MAX);
        assert_eq!(leading_integer(b"-2147483648"), i32::MIN);
        assert_eq!(leading_integer(b"99999999999999999999"), i32::MAX);
        assert_eq!(leading_integer(b"-99999999999999999999"), i32::MIN);
    }
}
