use soroban_sdk::{
    Address, Env, Map, Symbol, Vec, contract, contractimpl, contracttype, log, panic_with_error,
    symbol_short,
};

use crate::error::Error;
use crate::interface::{Asset, PriceData, PricePublisher, PriceSource};

const ADMIN_KEY: Symbol = symbol_short!("ADMIN");
const STORAGE: Symbol = symbol_short!("STORAGE");

#[contracttype]
#[derive(Clone, Debug)]
pub struct PriceFeedStorage {
    assets: Vec<Asset>,
    base: Asset,
    decimals: u32,
    resolution: u32,
}

impl PriceFeedStorage {
    pub fn get_state(env: &Env) -> PriceFeedStorage {
        env.storage().instance().get(&STORAGE).unwrap()
    }

    pub fn set_state(env: &Env, storage: &PriceFeedStorage) {
        env.storage().instance().set(&STORAGE, &storage);
    }
}

#[contracttype]
enum DataKey {
    /// Price history of an asset, keyed by timestamp
    Prices(Asset),
}

#[contract]
pub struct PriceFeed;

#[contractimpl]
impl PriceFeed {
    pub fn __constructor(
        env: &Env,
        admin: Address,
        assets: Vec<Asset>,
        base: Asset,
        decimals: u32,
        resolution: u32,
    ) {
        env.storage().instance().set(&ADMIN_KEY, &admin);
        PriceFeedStorage::set_state(
            env,
            &PriceFeedStorage {
                assets: assets.clone(),
                base,
                decimals,
                resolution,
            },
        );
        for asset in assets.into_iter() {
            Self::set_history(env, asset, &Map::new(env));
        }
    }

    /// Address allowed to publish prices
    pub fn admin(env: &Env) -> Address {
        env.storage().instance().get(&ADMIN_KEY).unwrap()
    }

    fn require_admin(env: &Env) {
        Self::admin(env).require_auth();
    }

    fn get_history(env: &Env, asset: Asset) -> Option<Map<u64, i128>> {
        env.storage().persistent().get(&DataKey::Prices(asset))
    }

    fn set_history(env: &Env, asset: Asset, history: &Map<u64, i128>) {
        let key = DataKey::Prices(asset);
        env.storage().persistent().set(&key, history);
        let ttl = env.storage().max_ttl();
        env.storage().persistent().extend_ttl(&key, ttl, ttl);
    }
}

#[contractimpl]
impl PricePublisher for PriceFeed {
    fn add_assets(env: &Env, assets: Vec<Asset>) {
        Self::require_admin(env);
        let mut state = PriceFeedStorage::get_state(env);
        for asset in assets.iter() {
            if state.assets.contains(&asset) {
                panic_with_error!(env, Error::AssetAlreadyExists);
            }
            state.assets.push_back(asset.clone());
            Self::set_history(env, asset, &Map::new(env));
        }
        PriceFeedStorage::set_state(env, &state);
    }

    fn set_asset_price(env: &Env, asset: Asset, price: i128, timestamp: u64) {
        Self::require_admin(env);
        if price <= 0 {
            panic_with_error!(env, Error::InvalidPrice);
        }
        let mut history = Self::get_history(env, asset.clone())
            .unwrap_or_else(|| panic_with_error!(env, Error::AssetNotFound));
        if let Some(latest) = history.keys().last() {
            if timestamp < latest {
                panic_with_error!(env, Error::StaleTimestamp);
            }
        }
        history.set(timestamp, price);
        Self::set_history(env, asset, &history);
        log!(env, "price recorded {} at {}", price, timestamp);
    }
}

#[contractimpl]
impl PriceSource for PriceFeed {
    fn assets(env: &Env) -> Vec<Asset> {
        PriceFeedStorage::get_state(env).assets
    }

    fn base(env: &Env) -> Asset {
        PriceFeedStorage::get_state(env).base
    }

    fn decimals(env: &Env) -> u32 {
        PriceFeedStorage::get_state(env).decimals
    }

    fn lastprice(env: &Env, asset: Asset) -> Option<PriceData> {
        let history = Self::get_history(env, asset)?;
        let timestamp = history.keys().last()?;
        let price = history.get(timestamp)?;
        Some(PriceData { price, timestamp })
    }

    fn price(env: &Env, asset: Asset, timestamp: u64) -> Option<PriceData> {
        let history = Self::get_history(env, asset)?;
        let price = history.get(timestamp)?;
        Some(PriceData { price, timestamp })
    }

    fn prices(env: &Env, asset: Asset, records: u32) -> Option<Vec<PriceData>> {
        let history = Self::get_history(env, asset)?;
        let mut prices = Vec::new(env);
        history
            .keys()
            .iter()
            .rev()
            .take(records as usize)
            .for_each(|timestamp| {
                prices.push_back(PriceData {
                    price: history.get_unchecked(timestamp),
                    timestamp,
                })
            });
        Some(prices)
    }

    fn resolution(env: &Env) -> u32 {
        PriceFeedStorage::get_state(env).resolution
    }
}
