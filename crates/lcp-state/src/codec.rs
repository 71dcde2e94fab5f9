//! # Status Codec: One-Hot Persistence
//!
//! The persisted form of a [`Status`] is an integer with exactly one bit
//! set. Bit `i`, counted from the least significant bit, stands for the
//! status at index `i` of [`Status::ALL`]:
//!
//! | status    | bit | value |
//! |-----------|-----|-------|
//! | ready     | 0   | 1     |
//! | active    | 1   | 2     |
//! | revoked   | 2   | 4     |
//! | returned  | 3   | 8     |
//! | cancelled | 4   | 16    |
//! | expired   | 5   | 32    |
//!
//! Decoding anything that is not exactly one of these values (zero bits,
//! several bits, a bit beyond index 5, negative) yields `None`. That is an
//! integrity signal for the reader to log, not an error.
//!
//! This module is the only place the integer form appears.

use crate::status::Status;

/// Encode a status as its one-hot integer.
pub fn encode(status: Status) -> i64 {
    let index = match status {
        Status::Ready => 0,
        Status::Active => 1,
        Status::Revoked => 2,
        Status::Returned => 3,
        Status::Cancelled => 4,
        Status::Expired => 5,
    };
    1i64 << index
}

/// Decode a one-hot integer. `None` unless exactly one known bit is set.
pub fn decode(bits: i64) -> Option<Status> {
    if bits <= 0 || bits.count_ones() != 1 {
        return None;
    }
    Status::ALL.get(bits.trailing_zeros() as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_table() {
        assert_eq!(encode(Status::Ready), 1);
        assert_eq!(encode(Status::Active), 2);
        assert_eq!(encode(Status::Revoked), 4);
        assert_eq!(encode(Status::Returned), 8);
        assert_eq!(encode(Status::Cancelled), 16);
        assert_eq!(encode(Status::Expired), 32);
    }

    #[test]
    fn test_decode_table() {
        assert_eq!(decode(1), Some(Status::Ready));
        assert_eq!(decode(2), Some(Status::Active));
        assert_eq!(decode(32), Some(Status::Expired));
    }

    #[test]
    fn test_decode_zero_bits() {
        assert_eq!(decode(0), None);
    }

    #[test]
    fn test_decode_multiple_bits() {
        assert_eq!(decode(3), None);
        assert_eq!(decode(0b101000), None);
        assert_eq!(decode(63), None);
    }

    #[test]
    fn test_decode_unknown_bit() {
        assert_eq!(decode(64), None);
        assert_eq!(decode(1 << 40), None);
    }

    #[test]
    fn test_decode_negative() {
        assert_eq!(decode(-1), None);
        assert_eq!(decode(i64::MIN), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn roundtrip(idx in 0usize..6) {
            let status = Status::ALL[idx];
            prop_assert_eq!(decode(encode(status)), Some(status));
            prop_assert_eq!(encode(status).count_ones(), 1);
        }

        #[test]
        fn decode_only_accepts_the_six_values(bits in any::<i64>()) {
            let valid = [1i64, 2, 4, 8, 16, 32];
            prop_assert_eq!(decode(bits).is_some(), valid.contains(&bits));
        }
    }
}
