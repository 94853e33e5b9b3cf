use soroban_sdk::{Address, Env, token::TokenClient};

use crate::{
    Error,
    index_types::{Burn, Mint},
    math,
    storage::{self, Allowance, DataKey, ProtocolStorage, SUPPLY, Txn},
};

pub fn balance(env: &Env, id: &Address) -> i128 {
    storage::get_persistent(env, &DataKey::Balance(id.clone())).unwrap_or(0)
}

fn set_balance(env: &Env, id: &Address, amount: i128) {
    storage::set_persistent(env, &DataKey::Balance(id.clone()), &amount);
}

pub fn total_supply(env: &Env) -> i128 {
    env.storage().instance().get(&SUPPLY).unwrap_or(0)
}

fn set_total_supply(env: &Env, amount: i128) {
    env.storage().instance().set(&SUPPLY, &amount);
}

// Mint stable, internal only as every unit in circulation is backed by trove debt
pub fn mint(env: &Env, to: &Address, amount: i128) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    set_balance(env, to, math::add(balance(env, to), amount)?);
    set_total_supply(env, math::add(total_supply(env), amount)?);
    Mint {
        to: to.clone(),
        amount,
    }
    .publish(env);
    Ok(())
}

pub fn burn(env: &Env, from: &Address, amount: i128) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    let current = balance(env, from);
    if current < amount {
        return Err(Error::InsufficientBalance);
    }
    set_balance(env, from, current - amount);
    set_total_supply(env, math::sub(total_supply(env), amount)?);
    Burn {
        from: from.clone(),
        amount,
    }
    .publish(env);
    Ok(())
}

pub fn transfer(env: &Env, from: &Address, to: &Address, amount: i128) -> Result<(), Error> {
    if amount == 0 || from == to {
        return Ok(());
    }
    let from_balance = balance(env, from);
    if from_balance < amount {
        return Err(Error::InsufficientBalance);
    }
    set_balance(env, from, from_balance - amount);
    set_balance(env, to, math::add(balance(env, to), amount)?);
    Ok(())
}

pub fn allowance(env: &Env, from: &Address, spender: &Address) -> i128 {
    let allowance: Option<Allowance> =
        storage::get_persistent(env, &DataKey::Allowance(Txn(from.clone(), spender.clone())));
    match allowance {
        Some(a) if env.ledger().sequence() <= a.live_until_ledger => a.amount,
        _ => 0,
    }
}

pub fn set_allowance(
    env: &Env,
    from: &Address,
    spender: &Address,
    amount: i128,
    live_until_ledger: u32,
) -> Result<(), Error> {
    if amount < 0 {
        return Err(Error::ValueNotPositive);
    }
    if amount > 0 && live_until_ledger < env.ledger().sequence() {
        return Err(Error::InvalidLedgerSequence);
    }
    storage::set_persistent(
        env,
        &DataKey::Allowance(Txn(from.clone(), spender.clone())),
        &Allowance {
            amount,
            live_until_ledger,
        },
    );
    Ok(())
}

pub fn spend_allowance(
    env: &Env,
    from: &Address,
    spender: &Address,
    amount: i128,
) -> Result<(), Error> {
    let key = DataKey::Allowance(Txn(from.clone(), spender.clone()));
    let current = allowance(env, from, spender);
    if current < amount {
        return Err(Error::InsufficientAllowance);
    }
    let Some(mut stored) = storage::get_persistent::<Allowance>(env, &key) else {
        return Err(Error::InsufficientAllowance);
    };
    stored.amount = current - amount;
    storage::set_persistent(env, &key, &stored);
    Ok(())
}

// Collateral lives in an external Stellar Asset Contract
fn collateral(env: &Env) -> TokenClient<'_> {
    TokenClient::new(env, &ProtocolStorage::get_state(env).collateral_token)
}

pub fn receive_collateral(env: &Env, from: &Address, amount: i128) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    collateral(env)
        .try_transfer(from, &env.current_contract_address(), &amount)
        .map_err(|_| Error::CollateralTransferFailed)?
        .map_err(|_| Error::CollateralTransferFailed)
}

pub fn send_collateral(env: &Env, to: &Address, amount: i128) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    collateral(env)
        .try_transfer(&env.current_contract_address(), to, &amount)
        .map_err(|_| Error::CollateralTransferFailed)?
        .map_err(|_| Error::CollateralTransferFailed)
}
