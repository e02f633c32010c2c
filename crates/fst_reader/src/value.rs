//! Values handed to callers.

use std::fmt;

use fst_common::bin_to_esc;

/// A value borrowed from decoded block data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
    /// One state character per bit, most significant first.
    Bits(&'a [u8]),
    /// A real value.
    Real(f64),
    /// A variable-length value.
    Bytes(&'a [u8]),
}

impl Value<'_> {
    /// Copies the value out of the block buffers.
    pub fn to_owned(&self) -> OwnedValue {
        match *self {
            Self::Bits(b) => OwnedValue::Bits(b.to_vec()),
            Self::Real(r) => OwnedValue::Real(r),
            Self::Bytes(b) => OwnedValue::Bytes(b.to_vec()),
        }
    }
}

/// An owned value, as returned by random access.
#[derive(Clone, Debug, PartialEq)]
pub enum OwnedValue {
    /// One state character per bit, most significant first.
    Bits(Vec<u8>),
    /// A real value.
    Real(f64),
    /// A variable-length value.
    Bytes(Vec<u8>),
}

impl OwnedValue {
    /// Borrows the value.
    pub fn as_value(&self) -> Value<'_> {
        match self {
            Self::Bits(b) => Value::Bits(b),
            Self::Real(r) => Value::Real(*r),
            Self::Bytes(b) => Value::Bytes(b),
        }
    }
}

impl fmt::Display for OwnedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::Real(r) => f.write_str(&format_real(*r)),
            Self::Bytes(b) => f.write_str(&bin_to_esc(b)),
        }
    }
}

/// Formats a real with 16 significant digits, switching to exponent form
/// for very large or small magnitudes, as `%.16g` does.
pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let sci = format!("{value:.15e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if !(-4..16).contains(&exp) {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (15 - exp) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reals_format_like_g16() {
        assert_eq!(format_real(3.5), "3.5");
        assert_eq!(format_real(0.1), "0.1");
        assert_eq!(format_real(-2.0), "-2");
        assert_eq!(format_real(1e20), "1e+20");
        assert_eq!(format_real(1.25e-7), "1.25e-07");
        assert_eq!(format_real(0.0), "0");
        assert_eq!(format_real(123456.0), "123456");
        assert_eq!(format_real(f64::NAN), "nan");
    }

    #[test]
    fn owned_values_display() {
        assert_eq!(OwnedValue::Bits(b"01x".to_vec()).to_string(), "01x");
        assert_eq!(OwnedValue::Real(2.5).to_string(), "2.5");
        assert_eq!(OwnedValue::Bytes(b"a\nb".to_vec()).to_string(), "a\\nb");
    }
}
