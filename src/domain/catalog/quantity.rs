//! Resource quantities as they appear in plan resource maps.
//!
//! Plans describe resources with Kubernetes-style quantity strings such as
//! `"2"`, `"500m"` or `"4Gi"`. Aggregating several contracts means summing
//! those strings per resource name, so they are parsed into an exact
//! fixed-point value (nano precision) and printed back canonically.
//!
//! ```text
//! "4Gi" + "1Gi"  = "5Gi"
//! "500m" + "1"   = "1500m"
//! "1Gi" + "512Mi" = "1536Mi"
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const NANOS_PER_UNIT: i128 = 1_000_000_000;

const BINARY_SUFFIXES: [&str; 7] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

/// Decimal SI suffixes ordered from largest to smallest power of ten.
const DECIMAL_SUFFIXES: [(i32, &str); 10] = [
    (18, "E"),
    (15, "P"),
    (12, "T"),
    (9, "G"),
    (6, "M"),
    (3, "k"),
    (0, ""),
    (-3, "m"),
    (-6, "u"),
    (-9, "n"),
];

/// Errors produced while parsing or combining quantities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("quantity '{input}' has an invalid number")]
    InvalidNumber { input: String },

    #[error("quantity '{input}' has an unknown suffix '{suffix}'")]
    UnknownSuffix { input: String, suffix: String },

    #[error("quantity '{input}' is out of range")]
    OutOfRange { input: String },
}

/// How a quantity was written, which decides how it is printed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityFormat {
    /// `k`, `M`, `m`, ... or no suffix.
    DecimalSi,
    /// `Ki`, `Mi`, `Gi`, ...
    BinarySi,
    /// `e3`, `E-2`, ...
    DecimalExponent,
}

enum Scale {
    Binary(u32),
    Decimal(i32),
}

/// Exact resource quantity.
#[derive(Debug, Clone, Copy)]
pub struct Quantity {
    nanos: i128,
    format: QuantityFormat,
}

impl Quantity {
    /// Parses a quantity string.
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }

        let split = number_end(s);
        let (number, suffix) = s.split_at(split);
        if number.is_empty() {
            return Err(QuantityError::InvalidNumber {
                input: input.to_string(),
            });
        }
        let (scale, format) = parse_suffix(suffix).ok_or_else(|| QuantityError::UnknownSuffix {
            input: input.to_string(),
            suffix: suffix.to_string(),
        })?;

        let invalid_number = || QuantityError::InvalidNumber {
            input: input.to_string(),
        };
        let out_of_range = || QuantityError::OutOfRange {
            input: input.to_string(),
        };

        let (negative, unsigned) = match number.as_bytes().first() {
            Some(b'-') => (true, &number[1..]),
            Some(b'+') => (false, &number[1..]),
            _ => (false, number),
        };
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (unsigned, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid_number());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid_number());
        }

        let digits = format!("{}{}", int_part, frac_part);
        let digits = digits.trim_start_matches('0');
        if digits.len() > 30 {
            return Err(out_of_range());
        }
        let mantissa: i128 = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| invalid_number())?
        };

        let frac_digits = u32::try_from(frac_part.len()).map_err(|_| out_of_range())?;
        let mut numerator = mantissa;
        let mut denominator = pow10(frac_digits).ok_or_else(out_of_range)?;

        match scale {
            Scale::Binary(power) => {
                let factor = NANOS_PER_UNIT
                    .checked_mul(pow1024(power).ok_or_else(out_of_range)?)
                    .ok_or_else(out_of_range)?;
                numerator = numerator.checked_mul(factor).ok_or_else(out_of_range)?;
            }
            Scale::Decimal(exponent) => {
                let shift = exponent + 9;
                if shift >= 0 {
                    let factor = pow10(shift as u32).ok_or_else(out_of_range)?;
                    numerator = numerator.checked_mul(factor).ok_or_else(out_of_range)?;
                } else {
                    let factor = pow10(shift.unsigned_abs()).ok_or_else(out_of_range)?;
                    denominator = denominator.checked_mul(factor).ok_or_else(out_of_range)?;
                }
            }
        }

        // Sub-nano remainders round up.
        let mut nanos = numerator / denominator;
        if numerator % denominator != 0 {
            nanos += 1;
        }
        if negative {
            nanos = -nanos;
        }

        Ok(Self { nanos, format })
    }

    /// Zero in the given format.
    pub fn zero(format: QuantityFormat) -> Self {
        Self { nanos: 0, format }
    }

    /// The format used when printing this quantity.
    pub fn format(&self) -> QuantityFormat {
        self.format
    }

    /// Sums two quantities, keeping the format of `self`.
    ///
    /// Returns `None` on overflow.
    pub fn checked_add(&self, other: &Quantity) -> Option<Quantity> {
        Some(Quantity {
            nanos: self.nanos.checked_add(other.nanos)?,
            format: self.format,
        })
    }

    /// Whole units, rounded up.
    pub fn ceil_units(&self) -> i128 {
        let units = self.nanos / NANOS_PER_UNIT;
        if self.nanos % NANOS_PER_UNIT > 0 {
            units + 1
        } else {
            units
        }
    }

    fn fmt_decimal(&self, f: &mut fmt::Formatter<'_>, exponent_style: bool) -> fmt::Result {
        for (exponent, suffix) in DECIMAL_SUFFIXES {
            // exponent + 9 is always in 0..=27
            let Some(divisor) = pow10((exponent + 9) as u32) else {
                continue;
            };
            if self.nanos % divisor == 0 {
                let value = self.nanos / divisor;
                return if exponent_style && exponent != 0 {
                    write!(f, "{}e{}", value, exponent)
                } else if exponent_style {
                    write!(f, "{}", value)
                } else {
                    write!(f, "{}{}", value, suffix)
                };
            }
        }
        write!(f, "{}n", self.nanos)
    }

    fn fmt_binary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos % NANOS_PER_UNIT != 0 {
            return self.fmt_decimal(f, false);
        }
        let units = self.nanos / NANOS_PER_UNIT;
        for power in (1..BINARY_SUFFIXES.len() as u32).rev() {
            if let Some(divisor) = pow1024(power) {
                if units % divisor == 0 {
                    return write!(f, "{}{}", units / divisor, BINARY_SUFFIXES[power as usize]);
                }
            }
        }
        write!(f, "{}", units)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return write!(f, "0");
        }
        match self.format {
            QuantityFormat::BinarySi => self.fmt_binary(f),
            QuantityFormat::DecimalSi => self.fmt_decimal(f, false),
            QuantityFormat::DecimalExponent => self.fmt_decimal(f, true),
        }
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Quantity::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn number_end(s: &str) -> usize {
    s.char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '+' || *c == '-'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn parse_suffix(suffix: &str) -> Option<(Scale, QuantityFormat)> {
    if let Some(power) = BINARY_SUFFIXES
        .iter()
        .skip(1)
        .position(|candidate| *candidate == suffix)
    {
        return Some((Scale::Binary(power as u32 + 1), QuantityFormat::BinarySi));
    }
    if let Some((exponent, _)) = DECIMAL_SUFFIXES.iter().find(|(_, s)| *s == suffix) {
        return Some((Scale::Decimal(*exponent), QuantityFormat::DecimalSi));
    }
    let exponent = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))?;
    let exponent: i32 = exponent.parse().ok()?;
    Some((Scale::Decimal(exponent), QuantityFormat::DecimalExponent))
}

fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

fn pow1024(exp: u32) -> Option<i128> {
    1024i128.checked_pow(exp)
}
