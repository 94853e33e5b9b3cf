use soroban_sdk::{Address, Env, Symbol, contractclient, contracttype};

use crate::{Error, storage::ProtocolStorage};

/// Quoted asset definition (SEP-40 compatible)
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub enum Asset {
    /// Can be a Stellar Classic or Soroban asset
    Stellar(Address),
    /// For any external tokens/assets/symbols
    Other(Symbol),
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct PriceData {
    pub price: i128,    // asset price at given point in time
    pub timestamp: u64, // recording timestamp
}

/// The slice of SEP-40 the protocol reads.
#[contractclient(name = "PriceFeedClient")]
pub trait PriceFeedInterface {
    fn lastprice(env: Env, asset: Asset) -> Option<PriceData>;
    fn decimals(env: Env) -> u32;
}

/// Latest collateral price from the feed, in stable units per collateral unit scaled to 1e18.
pub fn fetch_price(env: &Env) -> Result<i128, Error> {
    let state = ProtocolStorage::get_state(env);
    let client = PriceFeedClient::new(env, &state.price_feed);

    let data = match client.try_lastprice(&Asset::Other(state.collateral_asset)) {
        Ok(Ok(Some(data))) => data,
        _ => return Err(Error::PriceUnavailable),
    };
    let decimals = match client.try_decimals() {
        Ok(Ok(decimals)) => decimals,
        _ => return Err(Error::OracleDecimalsFetchFailed),
    };
    normalize_price(data.price, decimals)
}

fn normalize_price(price: i128, decimals: u32) -> Result<i128, Error> {
    if price <= 0 {
        return Err(Error::InvalidPrice);
    }
    if decimals <= 18 {
        let factor = 10i128.pow(18 - decimals);
        price.checked_mul(factor).ok_or(Error::ArithmeticError)
    } else {
        let factor = 10i128
            .checked_pow(decimals - 18)
            .ok_or(Error::ArithmeticError)?;
        let scaled = price / factor;
        if scaled == 0 {
            return Err(Error::InvalidPrice);
        }
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DECIMAL_PRECISION;

    #[test]
    fn normalizes_feed_decimals() {
        assert_eq!(normalize_price(2_00000000000000, 14), Ok(2 * DECIMAL_PRECISION));
        assert_eq!(normalize_price(7, 18), Ok(7));
        assert_eq!(normalize_price(5_000, 21), Ok(5));
        assert_eq!(normalize_price(0, 14), Err(Error::InvalidPrice));
        assert_eq!(normalize_price(999, 21), Err(Error::InvalidPrice));
    }
}
