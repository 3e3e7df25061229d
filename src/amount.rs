//! Checked 256-bit arithmetic for token amounts and weights.
//!
//! Every operation that could wrap surfaces an [`ArithmeticError`] so a
//! failing calculation aborts the surrounding operation instead of
//! silently producing a wrong allocation.

use alloy::primitives::{I256, U256};
use rust_decimal::Decimal;

/// Fixed-point scale for ratio views: 18 decimals.
const RATIO_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("arithmetic overflow: {lhs} {operation} {rhs}")]
pub struct ArithmeticError {
    pub operation: String,
    pub lhs: U256,
    pub rhs: U256,
}

impl ArithmeticError {
    fn new(operation: &str, lhs: U256, rhs: U256) -> Self {
        Self {
            operation: operation.to_string(),
            lhs,
            rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatioError {
    #[error("ratio denominator is zero")]
    DivisionByZero,
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error("ratio {numerator}/{denominator} does not fit in a decimal")]
    OutOfRange { numerator: U256, denominator: U256 },
}

pub(crate) fn checked_add(lhs: U256, rhs: U256) -> Result<U256, ArithmeticError> {
    lhs.checked_add(rhs)
        .ok_or_else(|| ArithmeticError::new("+", lhs, rhs))
}

pub(crate) fn checked_sub(lhs: U256, rhs: U256) -> Result<U256, ArithmeticError> {
    lhs.checked_sub(rhs)
        .ok_or_else(|| ArithmeticError::new("-", lhs, rhs))
}

pub(crate) fn checked_sum(values: impl IntoIterator<Item = U256>) -> Result<U256, ArithmeticError> {
    values
        .into_iter()
        .try_fold(U256::ZERO, |sum, value| checked_add(sum, value))
}

/// `value * numerator / denominator`, truncating toward zero.
///
/// A zero denominator yields zero: with nothing weighted, nothing is
/// targeted.
pub(crate) fn mul_div(
    value: U256,
    numerator: U256,
    denominator: U256,
) -> Result<U256, ArithmeticError> {
    if denominator.is_zero() {
        return Ok(U256::ZERO);
    }

    let product = value
        .checked_mul(numerator)
        .ok_or_else(|| ArithmeticError::new("*", value, numerator))?;

    Ok(product / denominator)
}

/// `target - actual` as a signed amount.
pub(crate) fn signed_difference(target: U256, actual: U256) -> Result<I256, ArithmeticError> {
    if target >= actual {
        let difference = target - actual;
        I256::try_from(difference).map_err(|_| ArithmeticError::new("-", target, actual))
    } else {
        let difference = actual - target;
        I256::try_from(difference)
            .map(|positive| -positive)
            .map_err(|_| ArithmeticError::new("-", target, actual))
    }
}

/// `numerator / denominator` truncated to 18 decimals.
pub(crate) fn ratio(numerator: U256, denominator: U256) -> Result<Decimal, RatioError> {
    if denominator.is_zero() {
        return Err(RatioError::DivisionByZero);
    }

    let scale = U256::from(10u64).pow(U256::from(RATIO_DECIMALS));
    let scaled = numerator
        .checked_mul(scale)
        .ok_or_else(|| ArithmeticError::new("*", numerator, scale))?
        / denominator;

    let out_of_range = || RatioError::OutOfRange {
        numerator,
        denominator,
    };

    let mantissa = i128::try_from(scaled).map_err(|_| out_of_range())?;

    Decimal::try_from_i128_with_scale(mantissa, RATIO_DECIMALS)
        .map(|decimal| decimal.normalize())
        .map_err(|_| out_of_range())
}
