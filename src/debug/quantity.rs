//! Exact Kubernetes quantity arithmetic
//!
//! Quantities are parsed into an integer count of nano-units so that
//! `500m`, `0.5` and `1` compare exactly, without float rounding or unit
//! confusion between decimal and binary suffixes.

use crate::error::{DiagError, Result};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const NANOS_PER_UNIT: i128 = 1_000_000_000;

/// A parsed quantity, stored as nano-units rounded up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedQuantity {
    nanos: i128,
}

impl ParsedQuantity {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| DiagError::InvalidQuantity {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty quantity"));
        }

        let (negative, unsigned) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let number_end = unsigned
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(number_end);

        let (whole, fraction) = match number.split_once('.') {
            Some((w, f)) => (w, f),
            None => (number, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("missing digits"));
        }
        if fraction.contains('.') {
            return Err(invalid("more than one decimal point"));
        }

        let digits = format!("{whole}{fraction}");
        let mantissa: i128 = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| invalid("too many digits"))?
        };

        let scale = Scale::from_suffix(suffix).ok_or_else(|| invalid("unknown suffix"))?;

        let mut numerator = mantissa
            .checked_mul(NANOS_PER_UNIT)
            .ok_or_else(|| invalid("value out of range"))?;
        let mut denominator = pow10(fraction.len() as u32).ok_or_else(|| invalid("too many fraction digits"))?;

        match scale {
            Scale::Binary(shift) => {
                numerator = numerator
                    .checked_mul(1i128 << shift)
                    .ok_or_else(|| invalid("value out of range"))?;
            }
            Scale::Decimal(exp) if exp >= 0 => {
                let factor = pow10(exp as u32).ok_or_else(|| invalid("exponent out of range"))?;
                numerator = numerator
                    .checked_mul(factor)
                    .ok_or_else(|| invalid("value out of range"))?;
            }
            Scale::Decimal(exp) => {
                let factor = pow10(exp.unsigned_abs()).ok_or_else(|| invalid("exponent out of range"))?;
                denominator = denominator
                    .checked_mul(factor)
                    .ok_or_else(|| invalid("exponent out of range"))?;
            }
        }

        // Round up, matching the API server's treatment of sub-nano precision.
        let nanos = numerator
            .checked_add(denominator - 1)
            .ok_or_else(|| invalid("value out of range"))?
            / denominator;
        Ok(Self {
            nanos: if negative { -nanos } else { nanos },
        })
    }

    /// Value in milli-units, rounded up (CPU millicores)
    pub fn milli_value(&self) -> i128 {
        div_ceil(self.nanos, 1_000_000)
    }

    /// Value in whole units, rounded up
    pub fn value(&self) -> i128 {
        div_ceil(self.nanos, NANOS_PER_UNIT)
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }
}

impl FromStr for ParsedQuantity {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&Quantity> for ParsedQuantity {
    type Error = DiagError;

    fn try_from(q: &Quantity) -> Result<Self> {
        Self::parse(&q.0)
    }
}

impl PartialOrd for ParsedQuantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParsedQuantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl fmt::Display for ParsedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos % NANOS_PER_UNIT == 0 {
            write!(f, "{}", self.nanos / NANOS_PER_UNIT)
        } else {
            write!(f, "{}m", self.milli_value())
        }
    }
}

enum Scale {
    /// Power of two shift (Ki = 10, Mi = 20, ...)
    Binary(u32),
    /// Power of ten exponent (m = -3, k = 3, e6 = 6, ...)
    Decimal(i32),
}

impl Scale {
    fn from_suffix(suffix: &str) -> Option<Self> {
        let scale = match suffix {
            "" => Scale::Decimal(0),
            "n" => Scale::Decimal(-9),
            "u" => Scale::Decimal(-6),
            "m" => Scale::Decimal(-3),
            "k" => Scale::Decimal(3),
            "M" => Scale::Decimal(6),
            "G" => Scale::Decimal(9),
            "T" => Scale::Decimal(12),
            "P" => Scale::Decimal(15),
            "E" => Scale::Decimal(18),
            "Ki" => Scale::Binary(10),
            "Mi" => Scale::Binary(20),
            "Gi" => Scale::Binary(30),
            "Ti" => Scale::Binary(40),
            "Pi" => Scale::Binary(50),
            "Ei" => Scale::Binary(60),
            _ => {
                let exponent = suffix
                    .strip_prefix('e')
                    .or_else(|| suffix.strip_prefix('E'))?;
                Scale::Decimal(exponent.parse().ok()?)
            }
        };
        Some(scale)
    }
}

fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

fn div_ceil(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    if value % divisor > 0 {
        quotient + 1
    } else {
        quotient
    }
}

/// True when `used` has reached or passed `hard`
pub fn quota_exceeded(used: &Quantity, hard: &Quantity) -> Result<bool> {
    Ok(ParsedQuantity::try_from(used)? >= ParsedQuantity::try_from(hard)?)
}
