//! Millisecond timestamps carried by RTMP chunks.
//!
//! Timestamps are 32 bit values from an arbitrary epoch and a long lived stream will overflow
//! them, so arithmetic wraps at 2<sup>32</sup>.  Two timestamps are considered adjacent when they
//! are within 2<sup>31</sup> - 1 milliseconds of each other, which lets a value just past the wrap
//! compare as later than one just before it.
//!
//! ```
//! use streamkit_rtmp::time::RtmpTimestamp;
//!
//! let before_wrap = RtmpTimestamp::new(0xFFFF_FFF0);
//! let after_wrap = before_wrap + 0x20;
//!
//! assert_eq!(after_wrap, 0x10);
//! assert!(after_wrap > before_wrap);
//! assert_eq!(after_wrap.delta_since(before_wrap), 0x20);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

const MAX_ADJACENT_DISTANCE: u32 = 0x7FFF_FFFF;

#[derive(Eq, PartialEq, Debug, Copy, Clone, Default, Hash)]
pub struct RtmpTimestamp {
    pub value: u32,
}

impl RtmpTimestamp {
    pub fn new(value: u32) -> Self {
        RtmpTimestamp { value }
    }

    /// Number of milliseconds from `earlier` to this timestamp, accounting for wraparound
    pub fn delta_since(self, earlier: RtmpTimestamp) -> u32 {
        self.value.wrapping_sub(earlier.value)
    }
}

impl From<u32> for RtmpTimestamp {
    fn from(value: u32) -> Self {
        RtmpTimestamp::new(value)
    }
}

impl fmt::Display for RtmpTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.value)
    }
}

impl Add for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: RtmpTimestamp) -> RtmpTimestamp {
        self + other.value
    }
}

impl Add<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: u32) -> RtmpTimestamp {
        RtmpTimestamp::new(self.value.wrapping_add(other))
    }
}

impl Sub for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: RtmpTimestamp) -> RtmpTimestamp {
        self - other.value
    }
}

impl Sub<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: u32) -> RtmpTimestamp {
        RtmpTimestamp::new(self.value.wrapping_sub(other))
    }
}

impl PartialOrd for RtmpTimestamp {
    fn partial_cmp(&self, other: &RtmpTimestamp) -> Option<Ordering> {
        Some(wrapping_compare(self.value, other.value))
    }
}

impl PartialEq<u32> for RtmpTimestamp {
    fn eq(&self, other: &u32) -> bool {
        self.value == *other
    }
}

impl PartialOrd<u32> for RtmpTimestamp {
    fn partial_cmp(&self, other: &u32) -> Option<Ordering> {
        Some(wrapping_compare(self.value, *other))
    }
}

fn wrapping_compare(left: u32, right: u32) -> Ordering {
    let distance = if left > right { left - right } else { right - left };
    if distance <= MAX_ADJACENT_DISTANCE {
        left.cmp(&right)
    } else {
        right.cmp(&left)
    }
}

#[cfg(test)]
mod tests {
    use super::RtmpTimestamp;

    #[test]
    fn addition_wraps_past_u32_max() {
        let time = RtmpTimestamp::new(u32::max_value()) + RtmpTimestamp::new(60);

        assert_eq!(time, 59);
    }

    #[test]
    fn subtraction_wraps_below_zero() {
        let time = RtmpTimestamp::new(0) - 50;

        assert_eq!(time, u32::max_value() - 49);
    }

    #[test]
    fn delta_across_wrap_is_small_and_positive() {
        let first = RtmpTimestamp::new(0xFFFF_FFF0);
        let second = RtmpTimestamp::new(0x0000_0010);

        assert_eq!(second.delta_since(first), 0x20);
        assert!(second > first, "timestamp after the wrap should compare as later");
    }

    #[test]
    fn distant_values_compare_in_reverse() {
        let early = RtmpTimestamp::new(10_000);
        let late = RtmpTimestamp::new(4_000_000_000);
        let middle = RtmpTimestamp::new(3_000_000_000);

        assert!(early > late, "10000 should be after 4000000000 once wrapped");
        assert!(middle < late);
    }

    #[test]
    fn can_compare_against_plain_numbers() {
        let time = RtmpTimestamp::new(50);

        assert!(time < 60);
        assert!(time > 20);

        let time = time + 20;
        assert_eq!(time, 70);
        assert_eq!(time.to_string(), "70ms");
    }
}
