use soroban_sdk::{Address, Env, Vec, contracttype};

use crate::{
    Error,
    math::{self, BASIS_POINTS, SECONDS_PER_YEAR},
    storage::{self, DataKey, RATES},
    trove_manager::Trove,
};

/// Aggregate principal and interest of every trove sharing one interest rate.
///
/// Interest is only moved into `interest` when a trove settles, so the stored
/// fields always equal the sums over the bucket's troves. What has accrued
/// since each trove's last settlement follows from `weighted_settle_time`.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InterestRateBucket {
    pub principal: i128,
    pub interest: i128,
    /// Sum of each trove's principal times its last settlement time
    pub weighted_settle_time: i128,
    /// Sum of the troves' carried sub-unit interest
    pub interest_remainder: i128,
    pub last_updated_time: u64,
}

pub trait IsInterestRateManager {
    /// Bucket totals at `rate`, with interest projected to the current time
    fn get_interest_rate_bucket(env: &Env, rate: u32) -> Result<InterestRateBucket, Error>;

    /// Every rate that has ever held principal
    fn get_active_interest_rates(env: &Env) -> Vec<u32>;

    /// Interest owed by a trove, projected to the current time
    fn get_accrued_interest(env: &Env, borrower: Address) -> Result<i128, Error>;

    /// Simple interest on `principal` at `rate` bps between two timestamps
    fn calculate_interest_owed(
        env: &Env,
        principal: i128,
        rate: u32,
        from: u64,
        to: u64,
    ) -> Result<i128, Error>;

    /// Settle a trove's accrued interest into its record and its bucket
    fn settle_interest(env: &Env, borrower: Address) -> Result<i128, Error>;
}

/// Denominator of the simple interest formula
const YEAR_BASIS_POINTS: i128 = SECONDS_PER_YEAR as i128 * BASIS_POINTS;

/// `principal * rate * (to - from) / (SECONDS_PER_YEAR * BASIS_POINTS)`, rounded down.
pub fn calculate_interest_owed(
    env: &Env,
    principal: i128,
    rate: u32,
    from: u64,
    to: u64,
) -> Result<i128, Error> {
    if to <= from || principal == 0 || rate == 0 {
        return Ok(0);
    }
    let elapsed = i128::from(to - from);
    math::mul_div(
        env,
        principal,
        math::mul(i128::from(rate), elapsed)?,
        YEAR_BASIS_POINTS,
    )
}

/// Interest on `principal` over `elapsed` seconds plus `carry`, as `(whole units, new carry)`.
fn accrue(
    env: &Env,
    principal: i128,
    rate: u32,
    elapsed: u64,
    carry: i128,
) -> Result<(i128, i128), Error> {
    math::mul_div_with_carry(
        env,
        principal,
        math::mul(i128::from(rate), i128::from(elapsed))?,
        carry,
        YEAR_BASIS_POINTS,
    )
}

pub fn active_rates(env: &Env) -> Vec<u32> {
    env.storage()
        .instance()
        .get(&RATES)
        .unwrap_or_else(|| Vec::new(env))
}

pub fn get_bucket(env: &Env, rate: u32) -> InterestRateBucket {
    storage::get_persistent(env, &DataKey::RateBucket(rate)).unwrap_or_default()
}

fn set_bucket(env: &Env, rate: u32, bucket: &mut InterestRateBucket) {
    let mut rates = active_rates(env);
    if !rates.contains(rate) {
        rates.push_back(rate);
        env.storage().instance().set(&RATES, &rates);
    }
    bucket.last_updated_time = env.ledger().timestamp();
    storage::set_persistent(env, &DataKey::RateBucket(rate), bucket);
}

/// Bucket with the interest its troves would hold if all of them settled now. Read only.
pub fn projected_bucket(env: &Env, rate: u32) -> Result<InterestRateBucket, Error> {
    let mut bucket = get_bucket(env, rate);
    let now = i128::from(env.ledger().timestamp());
    let principal_seconds = math::sub(
        math::mul(bucket.principal, now)?,
        bucket.weighted_settle_time,
    )?;
    let (pending, _) = math::mul_div_with_carry(
        env,
        principal_seconds,
        i128::from(rate),
        bucket.interest_remainder,
        YEAR_BASIS_POINTS,
    )?;
    bucket.interest = math::add(bucket.interest, pending)?;
    Ok(bucket)
}

/// Principal plus interest across all buckets, projected to now.
pub fn total_active_debt(env: &Env) -> Result<i128, Error> {
    let mut total = 0i128;
    for rate in active_rates(env).iter() {
        let bucket = projected_bucket(env, rate)?;
        total = math::add(total, math::add(bucket.principal, bucket.interest)?)?;
    }
    Ok(total)
}

// Principal changes always follow a settlement, so the trove's settle time is now.
pub fn add_principal(env: &Env, rate: u32, amount: i128) -> Result<(), Error> {
    let now = i128::from(env.ledger().timestamp());
    let mut bucket = get_bucket(env, rate);
    bucket.principal = math::add(bucket.principal, amount)?;
    bucket.weighted_settle_time =
        math::add(bucket.weighted_settle_time, math::mul(amount, now)?)?;
    set_bucket(env, rate, &mut bucket);
    Ok(())
}

pub fn remove_principal(env: &Env, rate: u32, amount: i128) -> Result<(), Error> {
    let now = i128::from(env.ledger().timestamp());
    let mut bucket = get_bucket(env, rate);
    if amount > bucket.principal {
        return Err(Error::ArithmeticError);
    }
    bucket.principal -= amount;
    bucket.weighted_settle_time =
        math::sub(bucket.weighted_settle_time, math::mul(amount, now)?)?;
    set_bucket(env, rate, &mut bucket);
    Ok(())
}

pub fn remove_interest(env: &Env, rate: u32, amount: i128) -> Result<(), Error> {
    let mut bucket = get_bucket(env, rate);
    if amount > bucket.interest {
        return Err(Error::ArithmeticError);
    }
    bucket.interest -= amount;
    set_bucket(env, rate, &mut bucket);
    Ok(())
}

/// Interest owed by `trove` including what accrued since its last settlement. Read only.
pub fn projected_trove_interest(env: &Env, trove: &Trove) -> Result<i128, Error> {
    let elapsed = env
        .ledger()
        .timestamp()
        .saturating_sub(trove.last_interest_update_time);
    let (accrued, _) = accrue(
        env,
        trove.principal,
        trove.interest_rate,
        elapsed,
        trove.interest_remainder,
    )?;
    math::add(trove.interest_owed, accrued)
}

/// Move accrued interest into the trove record and its bucket. The sub-unit
/// remainder stays with the trove, so settling often accrues the same total
/// as settling once. A second call at the same timestamp is a no-op.
pub fn settle_trove_interest(env: &Env, trove: &mut Trove) -> Result<i128, Error> {
    let now = env.ledger().timestamp();
    let elapsed = now.saturating_sub(trove.last_interest_update_time);
    if elapsed == 0 {
        return Ok(0);
    }
    let (accrued, remainder) = accrue(
        env,
        trove.principal,
        trove.interest_rate,
        elapsed,
        trove.interest_remainder,
    )?;

    let mut bucket = get_bucket(env, trove.interest_rate);
    bucket.interest = math::add(bucket.interest, accrued)?;
    bucket.interest_remainder = math::add(
        bucket.interest_remainder,
        remainder - trove.interest_remainder,
    )?;
    bucket.weighted_settle_time = math::add(
        bucket.weighted_settle_time,
        math::mul(trove.principal, i128::from(elapsed))?,
    )?;
    set_bucket(env, trove.interest_rate, &mut bucket);

    trove.interest_owed = math::add(trove.interest_owed, accrued)?;
    trove.interest_remainder = remainder;
    trove.last_interest_update_time = now;
    Ok(accrued)
}

/// Add a settled trove's balances to the bucket at its rate.
fn attach(env: &Env, trove: &Trove) -> Result<(), Error> {
    add_principal(env, trove.interest_rate, trove.principal)?;
    let mut bucket = get_bucket(env, trove.interest_rate);
    bucket.interest = math::add(bucket.interest, trove.interest_owed)?;
    bucket.interest_remainder = math::add(bucket.interest_remainder, trove.interest_remainder)?;
    set_bucket(env, trove.interest_rate, &mut bucket);
    Ok(())
}

/// Take a settled trove's balances out of the bucket at its rate.
fn detach(env: &Env, trove: &Trove) -> Result<(), Error> {
    remove_principal(env, trove.interest_rate, trove.principal)?;
    remove_interest(env, trove.interest_rate, trove.interest_owed)?;
    let mut bucket = get_bucket(env, trove.interest_rate);
    bucket.interest_remainder = math::sub(bucket.interest_remainder, trove.interest_remainder)?;
    set_bucket(env, trove.interest_rate, &mut bucket);
    Ok(())
}

/// Split a repayment into (interest, principal), interest first.
pub fn split_repayment(trove: &Trove, amount: i128) -> Result<(i128, i128), Error> {
    if amount < 0 {
        return Err(Error::ValueNotPositive);
    }
    if amount > trove.debt()? {
        return Err(Error::RepaymentExceedsDebt);
    }
    let interest_paid = amount.min(trove.interest_owed);
    Ok((interest_paid, amount - interest_paid))
}

/// Apply a repayment to a settled trove and its bucket, interest first.
pub fn apply_repayment(env: &Env, trove: &mut Trove, amount: i128) -> Result<(i128, i128), Error> {
    let (interest_paid, principal_paid) = split_repayment(trove, amount)?;
    trove.interest_owed -= interest_paid;
    trove.principal -= principal_paid;
    remove_interest(env, trove.interest_rate, interest_paid)?;
    remove_principal(env, trove.interest_rate, principal_paid)?;
    Ok((interest_paid, principal_paid))
}

/// Move a settled trove to `new_rate`, carrying its principal and interest between buckets.
pub fn move_trove_to_rate(env: &Env, trove: &mut Trove, new_rate: u32) -> Result<(), Error> {
    if trove.interest_rate == new_rate {
        return Ok(());
    }
    detach(env, trove)?;
    trove.interest_rate = new_rate;
    attach(env, trove)
}

/// Take a closing trove's balances out of its bucket.
pub fn remove_trove(env: &Env, trove: &Trove) -> Result<(), Error> {
    detach(env, trove)
}
