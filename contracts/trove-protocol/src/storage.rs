use soroban_sdk::{
    Address, Env, IntoVal, String, Symbol, TryFromVal, Val, contracttype, symbol_short,
};

use crate::governance::GovernedParam;

pub(crate) const ADMIN_KEY: Symbol = symbol_short!("ADMIN");

// Instance storage
pub(crate) const STORAGE: Symbol = symbol_short!("STORAGE");
pub(crate) const SYSTEM: Symbol = symbol_short!("SYSTEM");
pub(crate) const POOL: Symbol = symbol_short!("POOL");
pub(crate) const FEES: Symbol = symbol_short!("FEES");
pub(crate) const SORTED: Symbol = symbol_short!("SORTED");
pub(crate) const RATES: Symbol = symbol_short!("RATES");
pub(crate) const SUPPLY: Symbol = symbol_short!("SUPPLY");

// Persistent storage keys
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    /// Stable token balance of an account
    Balance(Address),
    /// Stable token allowance granted by `Txn.0` to `Txn.1`
    Allowance(Txn),
    /// Trove record; each address holds at most one active trove
    Trove(Address),
    /// Sorted list node of an active trove
    Node(Address),
    /// Aggregate ledger of all troves at an interest rate (bps)
    RateBucket(u32),
    /// Stability pool deposit and snapshots
    Deposit(Address),
    /// Stability pool collateral sum S for an (epoch, scale) pair
    EpochScaleSum(EpochScale),
    /// Collateral claimable by the former owner of a closed trove
    SurplusCollateral(Address),
    /// Time-locked governed parameter
    Parameter(GovernedParam),
}

#[contracttype]
#[derive(Clone)]
pub struct Txn(pub Address, pub Address);

#[contracttype]
#[derive(Clone)]
pub struct EpochScale(pub u64, pub u64);

#[contracttype]
#[derive(Clone)]
pub struct Allowance {
    pub amount: i128,
    pub live_until_ledger: u32,
}

/// Deployment configuration handed to the constructor.
///
/// Ratios are 1e18-scaled (1.1e18 is 110%). Everything from `min_net_debt`
/// onward seeds the governed parameters and may later change through
/// the time-locked proposal flow.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolConfig {
    /// Minimum collateral ratio of an individual trove
    pub mcr: i128,
    /// Total collateral ratio below which the system is in recovery mode
    pub ccr: i128,
    /// Stable amount reserved at open and paid to liquidators
    pub gas_compensation: i128,
    pub min_net_debt: i128,
    /// Borrowing fee floor, 1e18-scaled
    pub borrowing_rate: i128,
    /// Redemption fee floor, 1e18-scaled
    pub redemption_rate: i128,
    /// Interest rate for new troves and refinancing, in basis points
    pub interest_rate: u32,
    /// Share of the borrowing fee charged on refinance, 0..=100
    pub refinancing_fee_percentage: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolStorage {
    /// Name of the stable token
    pub name: String,
    /// Symbol of the stable token
    pub symbol: String,
    /// Number of decimal places for stable token amounts
    pub decimals: u32,
    /// Stellar Asset Contract of the collateral
    pub collateral_token: Address,
    /// SEP-40 oracle quoting the collateral
    pub price_feed: Address,
    /// Oracle symbol of the collateral
    pub collateral_asset: Symbol,
    /// Receives borrowing fees, redemption fees and paid interest
    pub fee_recipient: Address,
    pub mcr: i128,
    pub ccr: i128,
    pub gas_compensation: i128,
}

impl ProtocolStorage {
    /// Get current state of the contract
    pub(crate) fn get_state(env: &Env) -> ProtocolStorage {
        env.storage().instance().get(&STORAGE).unwrap()
    }

    pub(crate) fn set_state(env: &Env, storage: &ProtocolStorage) {
        env.storage().instance().set(&STORAGE, storage);
    }
}

pub(crate) fn get_persistent<V>(env: &Env, key: &DataKey) -> Option<V>
where
    V: TryFromVal<Env, Val>,
{
    env.storage().persistent().get(key)
}

/// Write a persistent entry and extend its TTL to the maximum.
pub(crate) fn set_persistent<V>(env: &Env, key: &DataKey, value: &V)
where
    V: IntoVal<Env, Val>,
{
    env.storage().persistent().set(key, value);
    let ttl = env.storage().max_ttl();
    env.storage().persistent().extend_ttl(key, ttl, ttl);
}

pub(crate) fn remove_persistent(env: &Env, key: &DataKey) {
    env.storage().persistent().remove(key);
}
