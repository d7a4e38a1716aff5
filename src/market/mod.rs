//! Snapshot ingestion and per-snapshot market state.
//!
//! `MarketContext` replaces the raw snapshot's loose collections with
//! the state one evaluation pass reads: flattened cash offers, barters,
//! the trader reset table, and the currency conversion rates. A new
//! snapshot builds a whole new context, so a running evaluation never
//! observes a partial update.

pub mod client;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::types::{Barter, CashOffer, Currency, Item, MarketSnapshot, TraderResetTable};

// ---------------------------------------------------------------------------
// Currency rates
// ---------------------------------------------------------------------------

/// Fallback conversion rates, used until a snapshot provides real ones.
const DEFAULT_RATE_USD: i64 = 145;
const DEFAULT_RATE_EUR: i64 = 158;

/// Currency item names as they appear in the snapshot catalog.
const USD_ITEM_NAME: &str = "Dollars";
const EUR_ITEM_NAME: &str = "Euros";

/// Designated vendors whose buy offers define the conversion rates.
const USD_VENDOR: &str = "peacekeeper";
const EUR_VENDOR: &str = "skier";

/// USD/EUR → rouble conversion rates held between snapshots.
/// When a snapshot lacks the designated vendor offer, the previous rate
/// is retained rather than reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyRates {
    pub usd: i64,
    pub eur: i64,
}

impl Default for CurrencyRates {
    fn default() -> Self {
        Self {
            usd: DEFAULT_RATE_USD,
            eur: DEFAULT_RATE_EUR,
        }
    }
}

impl CurrencyRates {
    /// Derive updated rates from the snapshot's designated currency
    /// items, keeping the current value for anything missing.
    pub fn updated_from(&self, currencies: &[Item]) -> Self {
        let mut next = *self;

        if let Some(rate) = designated_offer(currencies, USD_ITEM_NAME, USD_VENDOR) {
            next.usd = rate;
        } else {
            debug!(retained = self.usd, "No USD rate in snapshot, keeping previous");
        }

        if let Some(rate) = designated_offer(currencies, EUR_ITEM_NAME, EUR_VENDOR) {
            next.eur = rate;
        } else {
            debug!(retained = self.eur, "No EUR rate in snapshot, keeping previous");
        }

        next
    }

    /// Convert a cash offer price to roubles.
    pub fn to_roubles(&self, price: i64, currency: Currency) -> i64 {
        match currency {
            Currency::Rub => price,
            Currency::Usd => price * self.usd,
            Currency::Eur => price * self.eur,
        }
    }
}

fn designated_offer(currencies: &[Item], item_name: &str, vendor: &str) -> Option<i64> {
    currencies
        .iter()
        .find(|c| c.name == item_name)?
        .buy_offers
        .iter()
        .find(|o| o.source == vendor)
        .map(|o| o.price)
}

// ---------------------------------------------------------------------------
// Market context
// ---------------------------------------------------------------------------

/// Everything one evaluation pass reads, derived atomically from a
/// single snapshot. Mutated only by [`MarketContext::ingest`]; the
/// engine treats it as read-only.
#[derive(Debug, Clone, Default)]
pub struct MarketContext {
    pub rates: CurrencyRates,
    pub reset_table: TraderResetTable,
    pub barters: Vec<Barter>,
    pub cash_offers: Vec<CashOffer>,
    /// When the underlying snapshot was ingested.
    pub ingested_at: Option<DateTime<Utc>>,
}

impl MarketContext {
    /// Build a fresh context from a snapshot, carrying over the previous
    /// currency rates as the fallback for missing designated offers.
    pub fn ingest(snapshot: &MarketSnapshot, previous_rates: CurrencyRates) -> Self {
        let rates = previous_rates.updated_from(&snapshot.currencies);

        let mut reset_table = TraderResetTable::new();
        for trader in &snapshot.traders {
            match trader.reset_time {
                Some(ts) => {
                    reset_table.insert(trader.name.clone(), ts);
                }
                None => {
                    debug!(trader = %trader.name, "Trader has no reset timestamp");
                }
            }
        }

        let mut cash_offers = Vec::new();
        let mut skipped = 0usize;
        for trader in &snapshot.traders {
            for offer in &trader.cash_offers {
                if offer.item.is_none() {
                    skipped += 1;
                    continue;
                }
                cash_offers.push(CashOffer {
                    trader: trader.name.clone(),
                    item: offer.item.clone(),
                    price: offer.price,
                    currency: Currency::from_code(offer.currency.as_deref()),
                    min_level: offer.min_trader_level.unwrap_or(1),
                    buy_limit: offer.buy_limit,
                });
            }
        }
        if skipped > 0 {
            warn!(skipped, "Cash offers with missing item data skipped");
        }

        info!(
            traders = snapshot.traders.len(),
            barters = snapshot.barters.len(),
            cash_offers = cash_offers.len(),
            rate_usd = rates.usd,
            rate_eur = rates.eur,
            "Snapshot ingested"
        );

        Self {
            rates,
            reset_table,
            barters: snapshot.barters.clone(),
            cash_offers,
            ingested_at: Some(Utc::now()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CashOfferNode, Offer, TraderNode};

    fn currency_item(name: &str, vendor: &str, price: i64) -> Item {
        Item {
            name: name.to_string(),
            buy_offers: vec![Offer {
                source: vendor.to_string(),
                price,
            }],
            ..Item::default()
        }
    }

    #[test]
    fn test_rates_updated_from_designated_offers() {
        let currencies = vec![
            currency_item("Dollars", "peacekeeper", 142),
            currency_item("Euros", "skier", 160),
        ];
        let rates = CurrencyRates::default().updated_from(&currencies);
        assert_eq!(rates.usd, 142);
        assert_eq!(rates.eur, 160);
    }

    #[test]
    fn test_rates_retained_when_offer_absent() {
        let previous = CurrencyRates { usd: 150, eur: 163 };

        // Dollars present but sold by the wrong vendor; Euros absent.
        let currencies = vec![currency_item("Dollars", "therapist", 999)];
        let rates = previous.updated_from(&currencies);
        assert_eq!(rates.usd, 150);
        assert_eq!(rates.eur, 163);
    }

    #[test]
    fn test_rates_conversion() {
        let rates = CurrencyRates { usd: 145, eur: 158 };
        assert_eq!(rates.to_roubles(100, Currency::Rub), 100);
        assert_eq!(rates.to_roubles(100, Currency::Usd), 14_500);
        assert_eq!(rates.to_roubles(10, Currency::Eur), 1_580);
    }

    #[test]
    fn test_ingest_builds_reset_table_and_flattens_offers() {
        let snapshot = MarketSnapshot {
            currencies: vec![currency_item("Dollars", "peacekeeper", 140)],
            traders: vec![
                TraderNode {
                    name: "prapor".to_string(),
                    reset_time: "2026-08-30T12:00:00Z".parse().ok(),
                    cash_offers: vec![CashOfferNode {
                        item: Some(Item {
                            name: "Grenade".to_string(),
                            ..Item::default()
                        }),
                        price: 12_000,
                        currency: None,
                        min_trader_level: Some(2),
                        buy_limit: Some(3),
                    }],
                },
                TraderNode {
                    name: "peacekeeper".to_string(),
                    reset_time: None,
                    cash_offers: vec![CashOfferNode {
                        // Missing nested item — must be skipped, not fatal.
                        item: None,
                        price: 80,
                        currency: Some("USD".to_string()),
                        min_trader_level: None,
                        buy_limit: None,
                    }],
                },
            ],
            barters: Vec::new(),
        };

        let ctx = MarketContext::ingest(&snapshot, CurrencyRates::default());

        assert_eq!(ctx.rates.usd, 140);
        assert_eq!(ctx.rates.eur, DEFAULT_RATE_EUR);
        assert_eq!(ctx.reset_table.len(), 1);
        assert!(ctx.reset_table.contains_key("prapor"));
        assert_eq!(ctx.cash_offers.len(), 1);
        let offer = &ctx.cash_offers[0];
        assert_eq!(offer.trader, "prapor");
        assert_eq!(offer.currency, Currency::Rub);
        assert_eq!(offer.min_level, 2);
        assert!(ctx.ingested_at.is_some());
    }

    #[test]
    fn test_ingest_replaces_previous_state_wholesale() {
        let first = MarketSnapshot {
            currencies: Vec::new(),
            traders: vec![TraderNode {
                name: "prapor".to_string(),
                reset_time: "2026-08-30T12:00:00Z".parse().ok(),
                cash_offers: Vec::new(),
            }],
            barters: Vec::new(),
        };
        let ctx = MarketContext::ingest(&first, CurrencyRates::default());

        let second = MarketSnapshot {
            currencies: Vec::new(),
            traders: vec![TraderNode {
                name: "skier".to_string(),
                reset_time: "2026-08-30T13:00:00Z".parse().ok(),
                cash_offers: Vec::new(),
            }],
            barters: Vec::new(),
        };
        let ctx2 = MarketContext::ingest(&second, ctx.rates);

        assert!(!ctx2.reset_table.contains_key("prapor"));
        assert!(ctx2.reset_table.contains_key("skier"));
    }
}
