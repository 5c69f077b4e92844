//! Exact decimal parsing and encoding.
//!
//! Values are held as arbitrary-precision [`BigDecimal`]s, so neither the digit count nor the
//! exponent of the input text is bounded by a machine integer.

use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Signed, Zero};

use crate::schema::DecimalSpec;

use super::ValueError;

/// Parse decimal text (plain or scientific notation) without rounding.
pub(crate) fn parse_exact(text: &str) -> Result<BigDecimal, ValueError> {
    let t = text.trim();
    if t.is_empty() {
        return Err(ValueError::Parse("expected a decimal number".to_string()));
    }
    BigDecimal::from_str(t).map_err(|e| ValueError::Parse(format!("expected a decimal number: {e}")))
}

/// Unscaled integer of `value` at exactly `scale` fractional digits.
///
/// Fails if a non-zero digit would be dropped, or if the result needs more than `precision`
/// digits. Both checks run on the normalized value, before any rescaling, so text such as
/// `1e999999999` is refused without materializing its digits. Messages never render `value`
/// for the same reason.
pub(crate) fn unscaled_at(
    value: &BigDecimal,
    scale: u32,
    precision: u32,
) -> Result<BigInt, ValueError> {
    if value.is_zero() {
        return Ok(BigInt::zero());
    }
    let (digits, exponent) = value.normalized().into_bigint_and_exponent();
    let scale = i64::from(scale);
    if exponent > scale {
        return Err(ValueError::Arithmetic(format!(
            "more than {scale} fractional digits"
        )));
    }

    let needed = digit_len(&digits) as i128 + i128::from(scale) - i128::from(exponent);
    if needed > i128::from(precision) {
        return Err(ValueError::Arithmetic(format!(
            "needs {needed} digits, precision is {precision}"
        )));
    }

    let rescaled = value.with_scale(scale);
    if &rescaled != value {
        return Err(ValueError::Arithmetic(format!(
            "cannot be represented at scale {scale}"
        )));
    }
    Ok(rescaled.into_bigint_and_exponent().0)
}

fn digit_len(n: &BigInt) -> usize {
    n.magnitude().to_string().len()
}

/// Parse, rescale and encode a decimal for the given logical type.
///
/// The result is the big-endian two's-complement unscaled value, sign-extended to
/// [`DecimalSpec::wire_width`] bytes.
pub(crate) fn encode(spec: &DecimalSpec, text: &str) -> Result<Vec<u8>, ValueError> {
    let value = parse_exact(text)?;
    let unscaled = unscaled_at(&value, spec.scale, spec.precision)?;

    let bytes = unscaled.to_signed_bytes_be();
    let width = spec.wire_width();
    if bytes.len() > width {
        return Err(ValueError::Arithmetic(format!(
            "{} does not fit in {width} bytes",
            text.trim()
        )));
    }
    let fill = if unscaled.is_negative() { 0xFF } else { 0x00 };
    let mut out = vec![fill; width - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// Parse text into an integer of at most `max_digits` digits, tolerating a zero fractional
/// part (`"10.0"`).
pub(crate) fn parse_integral(text: &str, max_digits: u32) -> Result<BigInt, ValueError> {
    let value = parse_exact(text)?;
    let t = text.trim();
    if value.normalized().as_bigint_and_exponent().1 > 0 {
        return Err(ValueError::Arithmetic(format!("{t} is not an integer")));
    }
    unscaled_at(&value, 0, max_digits)
        .map_err(|_| ValueError::Arithmetic(format!("{t} is out of range")))
}
