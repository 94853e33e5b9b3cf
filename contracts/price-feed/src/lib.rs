#![no_std]

mod error;
mod interface;
pub mod price_feed;

pub use error::Error;
pub use interface::{Asset, PriceData, PricePublisher, PriceSource};
pub use price_feed::{PriceFeed, PriceFeedClient};

mod test;
