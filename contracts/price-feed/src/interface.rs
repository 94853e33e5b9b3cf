use soroban_sdk::{Address, Env, Symbol, Vec, contracttype};

/// An asset the feed can quote, as defined by SEP-40.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub enum Asset {
    /// Stellar Classic or Soroban token contract
    Stellar(Address),
    /// Off-chain ticker such as `XLM` or `USD`
    Other(Symbol),
}

/// One recorded price and the ledger time it applies to.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct PriceData {
    pub price: i128,
    pub timestamp: u64,
}

/// Read side of the feed. Method names follow SEP-40 so any SEP-40
/// consumer, the trove protocol included, can call it unchanged.
pub trait PriceSource {
    fn assets(env: &Env) -> Vec<Asset>;

    /// Quote currency every price is expressed in
    fn base(env: &Env) -> Asset;

    /// Fixed-point decimals of `PriceData::price`
    fn decimals(env: &Env) -> u32;

    /// Expected seconds between updates
    fn resolution(env: &Env) -> u32;

    /// Newest record for `asset`, `None` if it was never priced
    fn lastprice(env: &Env, asset: Asset) -> Option<PriceData>;

    /// Record published for exactly `timestamp`
    fn price(env: &Env, asset: Asset, timestamp: u64) -> Option<PriceData>;

    /// Up to `records` entries, newest first
    fn prices(env: &Env, asset: Asset, records: u32) -> Option<Vec<PriceData>>;
}

/// Write side of the feed, gated on the admin set at construction.
pub trait PricePublisher {
    /// Start quoting `assets`. Panics with `AssetAlreadyExists` on a duplicate.
    fn add_assets(env: &Env, assets: Vec<Asset>);

    /// Append `price` to the history of `asset`. Timestamps may not go backwards.
    fn set_asset_price(env: &Env, asset: Asset, price: i128, timestamp: u64);
}
