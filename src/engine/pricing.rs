//! Price resolution across heterogeneous offer sources.
//!
//! Three distinct questions, three distinct answers — these must not be
//! unified because they serve different purposes in the pipeline:
//! the cheapest way to acquire an item, the raw player-market listing
//! price, a conservative estimate of achievable resale value, and the
//! best vendor buyback. A returned price of 0 always means
//! "unknown / no qualifying offer", never "free".

use crate::types::Item;

/// Sentinel buyback name when no vendor will buy an item.
pub const NO_BUYER: &str = "Nobody";

/// Cheapest acquisition price: minimum across the item's buy offers,
/// excluding the scavenger market. Returns 0 if no qualifying offer
/// exists (the item cannot be bought).
pub fn cheapest_buy_price(item: &Item) -> i64 {
    item.buy_offers
        .iter()
        .filter(|o| !o.is_scav_market())
        .map(|o| o.price)
        .min()
        .unwrap_or(0)
}

/// Raw player-market listing price, or 0 when the item has no active
/// market offer. Display/risk-flag input only — never use this as a
/// resale estimate (see [`safe_market_price`]).
pub fn market_price(item: &Item) -> i64 {
    item.buy_offers
        .iter()
        .find(|o| o.is_market())
        .map(|o| o.price)
        .unwrap_or(0)
}

/// Conservative market resale price.
///
/// Returns 0 unless the item has both an active market offer and a
/// non-zero 24h average. A single listed offer can be a stale or
/// manipulated outlier, so the result is the minimum of the current
/// offer, the 24h average, and the last recorded low — considering only
/// strictly positive candidates.
pub fn safe_market_price(item: &Item) -> i64 {
    let current = item
        .buy_offers
        .iter()
        .filter(|o| o.is_market())
        .map(|o| o.price)
        .min();

    let Some(current) = current else {
        return 0;
    };

    match item.avg_24h_price {
        Some(avg) if avg > 0 => {}
        _ => return 0,
    }

    [Some(current), item.avg_24h_price, item.last_low_price]
        .into_iter()
        .flatten()
        .filter(|p| *p > 0)
        .min()
        .unwrap_or(0)
}

/// Best vendor buyback for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buyback {
    pub price: i64,
    pub trader_name: String,
}

/// Highest sell-offer price among vendors, excluding both the player
/// market and the scavenger market. Returns price 0 and the [`NO_BUYER`]
/// sentinel when nobody qualifies. The trader name is capitalized for
/// display.
pub fn best_vendor_buyback(item: &Item) -> Buyback {
    let mut best = Buyback {
        price: 0,
        trader_name: NO_BUYER.to_string(),
    };

    for offer in &item.sell_offers {
        if offer.is_market() || offer.is_scav_market() {
            continue;
        }
        if offer.price > best.price {
            best.price = offer.price;
            best.trader_name = capitalize(&offer.source);
        }
    }

    best
}

/// Uppercase the first character of a vendor identifier for display.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
