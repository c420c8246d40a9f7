use marginscout_common::{config::DiscoveryConfig, RawListing};
use tracing::debug;

/// Cheap numeric screen applied to every raw listing before anything
/// costs money. Price band, sales floor, and rating floor; all bounds
/// inclusive.
#[derive(Debug, Clone)]
pub struct BasicFilter {
    config: DiscoveryConfig,
}

impl BasicFilter {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn passes(&self, listing: &RawListing) -> bool {
        let cfg = &self.config;
        if listing.unit_price < cfg.min_price || listing.unit_price > cfg.max_price {
            debug!(url = %listing.source_url, price = listing.unit_price, "Listing outside price band");
            return false;
        }
        if listing.sales_count < cfg.min_sales_count {
            debug!(url = %listing.source_url, sales = listing.sales_count, "Listing below sales floor");
            return false;
        }
        if listing.seller_rating < cfg.min_seller_rating {
            debug!(url = %listing.source_url, rating = listing.seller_rating, "Seller below rating floor");
            return false;
        }
        true
    }

    pub fn filter(&self, listings: Vec<RawListing>) -> Vec<RawListing> {
        listings.into_iter().filter(|l| self.passes(l)).collect()
    }
}
