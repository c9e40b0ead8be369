use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Number of fingers on a hand, and so the width of every code.
pub const CODE_WIDTH: usize = 5;

/// Largest value representable in `CODE_WIDTH` bits.
pub const MAX_CODE: u8 = (1 << CODE_WIDTH) - 1;

pub type Bits = [u8; CODE_WIDTH];

/// Convert a decimal in [0, 31] to its bits, most significant first.
///
/// Values above 31 are truncated to their low five bits.
pub fn decimal_to_binary_array(decimal: u8) -> Bits {
    let mut bits = [0u8; CODE_WIDTH];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (decimal >> (CODE_WIDTH - 1 - i)) & 1;
    }
    bits
}

/// Interpret bits (most significant first) as an unsigned number.
pub fn binary_array_to_decimal(bits: &Bits) -> u8 {
    bits.iter().fold(0, |acc, bit| (acc << 1) | (bit & 1))
}

/// A 5-bit value bound to a menu item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Code(u8);

impl Code {
    pub fn new(value: u8) -> Option<Self> {
        (value <= MAX_CODE).then_some(Self(value))
    }

    pub fn from_bits(bits: Bits) -> Self {
        Self(binary_array_to_decimal(&bits))
    }

    /// Parse a pattern shown by the player, e.g. `"01001"`.
    pub fn parse_shown(shown: &str) -> Result<Self> {
        let shown = shown.trim();
        if shown.chars().count() != CODE_WIDTH {
            return Err(GameError::InvalidSubmission(format!(
                "expected {} bits, got {:?}",
                CODE_WIDTH, shown
            )));
        }

        let mut bits = [0u8; CODE_WIDTH];
        for (bit, c) in bits.iter_mut().zip(shown.chars()) {
            *bit = match c {
                '0' => 0,
                '1' => 1,
                other => {
                    return Err(GameError::InvalidSubmission(format!(
                        "{:?} is not a binary digit",
                        other
                    )))
                }
            };
        }

        Ok(Self::from_bits(bits))
    }

    pub fn decimal(&self) -> u8 {
        self.0
    }

    pub fn bits(&self) -> Bits {
        decimal_to_binary_array(self.0)
    }

    pub fn binary_string(&self) -> String {
        self.bits().iter().join("")
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary_string())
    }
}

impl TryFrom<u8> for Code {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Code::new(value).ok_or_else(|| format!("code {} exceeds {}", value, MAX_CODE))
    }
}

impl From<Code> for u8 {
    fn from(code: Code) -> Self {
        code.0
    }
}
