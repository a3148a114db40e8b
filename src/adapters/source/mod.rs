pub mod html;
pub mod marketplace;

pub use marketplace::{Marketplace, MarketplaceSource};
