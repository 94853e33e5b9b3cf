use soroban_sdk::{Env, I256};

use crate::Error;

/// 1.0 in 18-decimal fixed point
pub const DECIMAL_PRECISION: i128 = 1_000_000_000_000_000_000;
/// Nominal ICR is `collateral * 1e20 / debt`
pub const NICR_PRECISION: i128 = 100_000_000_000_000_000_000;
/// Stability pool rescale factor applied when P would lose precision
pub const SCALE_FACTOR: i128 = 1_000_000_000;
pub const BASIS_POINTS: i128 = 10_000;
pub const SECONDS_PER_YEAR: u64 = 31_536_000; // 365 days
pub const SECONDS_IN_ONE_MINUTE: u64 = 60;
/// Per-minute base rate decay, 12 hour half-life
pub const MINUTE_DECAY_FACTOR: i128 = 999_037_758_833_783_000;
/// 1000 years; decay is effectively total beyond this
pub const MAX_DECAY_MINUTES: u64 = 525_600_000;
/// Divisor applied to the issued or redeemed fraction when bumping the base rate
pub const BETA: i128 = 2;
/// 5%
pub const MAX_BORROWING_FEE: i128 = DECIMAL_PRECISION / 100 * 5;
/// Liquidators receive collateral / 200 (0.5%)
pub const PERCENT_DIVISOR: i128 = 200;
/// Highest interest rate governance may set, in basis points
pub const MAX_INTEREST_RATE: u32 = 10_000;

/// `a * b / denominator`, rounded down, with a 256-bit intermediate.
pub fn mul_div(env: &Env, a: i128, b: i128, denominator: i128) -> Result<i128, Error> {
    if denominator == 0 {
        return Err(Error::ArithmeticError);
    }
    I256::from_i128(env, a)
        .mul(&I256::from_i128(env, b))
        .div(&I256::from_i128(env, denominator))
        .to_i128()
        .ok_or(Error::ArithmeticError)
}

/// `(amount * 1e18 + carry) / denominator` as `(quotient, remainder)`.
///
/// Used by accumulators that feed the truncation remainder into the next update.
pub fn div_with_carry(
    env: &Env,
    amount: i128,
    carry: i128,
    denominator: i128,
) -> Result<(i128, i128), Error> {
    mul_div_with_carry(env, amount, DECIMAL_PRECISION, carry, denominator)
}

/// `(a * b + carry) / denominator` as `(quotient, remainder)`, with a 256-bit intermediate.
pub fn mul_div_with_carry(
    env: &Env,
    a: i128,
    b: i128,
    carry: i128,
    denominator: i128,
) -> Result<(i128, i128), Error> {
    if denominator <= 0 {
        return Err(Error::ArithmeticError);
    }
    let denominator = I256::from_i128(env, denominator);
    let numerator = I256::from_i128(env, a)
        .mul(&I256::from_i128(env, b))
        .add(&I256::from_i128(env, carry));
    let quotient = numerator.div(&denominator);
    let remainder = numerator.sub(&quotient.mul(&denominator));
    Ok((
        quotient.to_i128().ok_or(Error::ArithmeticError)?,
        remainder.to_i128().ok_or(Error::ArithmeticError)?,
    ))
}

pub fn add(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_add(b).ok_or(Error::ArithmeticError)
}

pub fn sub(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_sub(b).ok_or(Error::ArithmeticError)
}

pub fn mul(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_mul(b).ok_or(Error::ArithmeticError)
}

/// Collateral value over debt at `price`, 1e18-scaled. Debt-free positions are infinitely collateralized.
pub fn compute_cr(env: &Env, collateral: i128, debt: i128, price: i128) -> Result<i128, Error> {
    if debt > 0 {
        mul_div(env, collateral, price, debt)
    } else {
        Ok(i128::MAX)
    }
}

/// Price-independent ordering key, `collateral * 1e20 / debt`.
pub fn compute_nominal_cr(env: &Env, collateral: i128, debt: i128) -> Result<i128, Error> {
    if debt > 0 {
        mul_div(env, collateral, NICR_PRECISION, debt)
    } else {
        Ok(i128::MAX)
    }
}

/// Fixed point multiply, rounding half up.
pub fn dec_mul(x: i128, y: i128) -> Result<i128, Error> {
    Ok(add(mul(x, y)?, DECIMAL_PRECISION / 2)? / DECIMAL_PRECISION)
}

/// `base ^ minutes` by exponentiation by squaring. `base` is a 1e18-scaled factor <= 1.
pub fn dec_pow(base: i128, minutes: u64) -> Result<i128, Error> {
    let mut n = minutes.min(MAX_DECAY_MINUTES);
    if n == 0 {
        return Ok(DECIMAL_PRECISION);
    }
    let mut x = base;
    let mut y = DECIMAL_PRECISION;
    while n > 1 {
        if n % 2 == 0 {
            x = dec_mul(x, x)?;
            n /= 2;
        } else {
            y = dec_mul(x, y)?;
            x = dec_mul(x, x)?;
            n = (n - 1) / 2;
        }
    }
    dec_mul(x, y)
}
