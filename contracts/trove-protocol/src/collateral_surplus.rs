use soroban_sdk::{Address, Env};

use crate::{
    Error,
    index_types::SurplusUpdated,
    math,
    storage::{self, DataKey},
    token,
    trove_manager::SystemState,
};

pub fn get(env: &Env, owner: &Address) -> i128 {
    storage::get_persistent(env, &DataKey::SurplusCollateral(owner.clone())).unwrap_or(0)
}

fn set(env: &Env, owner: &Address, amount: i128) {
    let key = DataKey::SurplusCollateral(owner.clone());
    if amount == 0 {
        storage::remove_persistent(env, &key);
    } else {
        storage::set_persistent(env, &key, &amount);
    }
    SurplusUpdated {
        owner: owner.clone(),
        amount,
    }
    .publish(env);
}

/// Credit collateral left over from a closed trove to its former owner.
/// The collateral itself stays in the contract until claimed.
pub fn account(env: &Env, owner: &Address, amount: i128) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    set(env, owner, math::add(get(env, owner), amount)?);

    let mut state = SystemState::get_state(env);
    state.surplus_collateral = math::add(state.surplus_collateral, amount)?;
    SystemState::set_state(env, &state);
    Ok(())
}

/// Pay out everything `owner` has accumulated.
pub fn claim(env: &Env, owner: &Address) -> Result<i128, Error> {
    let amount = get(env, owner);
    if amount <= 0 {
        return Err(Error::NoCollateralToClaim);
    }
    set(env, owner, 0);

    let mut state = SystemState::get_state(env);
    state.surplus_collateral = math::sub(state.surplus_collateral, amount)?;
    SystemState::set_state(env, &state);

    token::send_collateral(env, owner, amount)?;
    Ok(amount)
}
