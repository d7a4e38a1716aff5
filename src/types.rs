//! Shared types for the FLIPSCAN scanner.
//!
//! These types form the data model used across all modules. The item,
//! barter, and trader shapes deserialize directly from the upstream
//! GraphQL snapshot payload; the remaining types are engine inputs and
//! outputs that the market, engine, and scheduler modules share without
//! circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Offers & items
// ---------------------------------------------------------------------------

/// A single buy or sell offer attached to an item.
///
/// `source` is a vendor identifier, or the special player-market source
/// ("fleaMarket" upstream). Prices are unit roubles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub source: String,
    pub price: i64,
}

impl Offer {
    /// Whether this offer comes from the player market.
    pub fn is_market(&self) -> bool {
        self.source.to_lowercase().contains("flea")
    }

    /// Whether this offer comes from the scavenger market (Fence).
    /// Excluded as both an acquisition source and a buyback target.
    pub fn is_scav_market(&self) -> bool {
        self.source.to_lowercase().contains("fence")
    }
}

/// An item from the snapshot catalog.
///
/// `avg_24h_price` and `last_low_price` may be absent or zero, both
/// meaning "no recent market data".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub name: String,
    pub icon_link: Option<String>,
    pub wiki_link: Option<String>,
    pub base_price: i64,
    #[serde(rename = "avg24hPrice")]
    pub avg_24h_price: Option<i64>,
    pub last_low_price: Option<i64>,
    #[serde(rename = "buyFor")]
    pub buy_offers: Vec<Offer>,
    #[serde(rename = "sellFor")]
    pub sell_offers: Vec<Offer>,
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (base: {} ₽ | avg24h: {} ₽)",
            self.name,
            self.base_price,
            self.avg_24h_price.unwrap_or(0),
        )
    }
}

// ---------------------------------------------------------------------------
// Barters & cash offers
// ---------------------------------------------------------------------------

/// One item-with-count entry in a barter's required or reward list.
/// The nested item may be missing in the upstream payload; such entries
/// are tolerated and skipped rather than failing the whole pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub item: Option<Item>,
    pub count: i64,
}

/// Reference to a trader by name, as nested inside a barter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderRef {
    pub name: String,
}

/// A barter recipe: hand over the required items, receive the rewards.
/// Gated by trader loyalty level and an optional purchase limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Barter {
    pub trader: TraderRef,
    pub level: i64,
    #[serde(default)]
    pub buy_limit: Option<i64>,
    #[serde(rename = "requiredItems")]
    pub required: Vec<Ingredient>,
    #[serde(rename = "rewardItems")]
    pub rewards: Vec<Ingredient>,
}

impl Barter {
    /// The primary reward item. A barter with no resolvable first reward
    /// is unusable.
    pub fn primary_reward(&self) -> Option<&Item> {
        self.rewards.first().and_then(|r| r.item.as_ref())
    }
}

/// A cash offer as nested under a trader in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashOfferNode {
    pub item: Option<Item>,
    pub price: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub min_trader_level: Option<i64>,
    #[serde(default)]
    pub buy_limit: Option<i64>,
}

/// A cash offer flattened with its owning trader's name.
#[derive(Debug, Clone)]
pub struct CashOffer {
    pub trader: String,
    pub item: Option<Item>,
    pub price: i64,
    pub currency: Currency,
    pub min_level: i64,
    pub buy_limit: Option<i64>,
}

/// Currencies a cash offer may be denominated in. USD and EUR convert to
/// roubles via the snapshot-derived rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Rub,
    Usd,
    Eur,
}

impl Currency {
    /// Parse an upstream currency code, defaulting to roubles.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("USD") => Currency::Usd,
            Some("EUR") => Currency::Eur,
            _ => Currency::Rub,
        }
    }

    /// Display symbol for ingredient labels.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Rub => "₽",
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A trader as returned by the snapshot: identity, next inventory reset,
/// and the cash offers it currently carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderNode {
    pub name: String,
    #[serde(default)]
    pub reset_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cash_offers: Vec<CashOfferNode>,
}

/// The full market snapshot handed over by the fetch layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub currencies: Vec<Item>,
    #[serde(default)]
    pub traders: Vec<TraderNode>,
    #[serde(default)]
    pub barters: Vec<Barter>,
}

/// Mapping from trader name to its next reset timestamp. Replaced
/// wholesale on every snapshot ingestion; read-only elsewhere.
pub type TraderResetTable = HashMap<String, DateTime<Utc>>;

// ---------------------------------------------------------------------------
// Engine inputs
// ---------------------------------------------------------------------------

/// Disposal strategy for an evaluated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Sell on the player market (tax applies).
    Market,
    /// Sell back to the best-paying vendor.
    Vendor,
    /// Below the profit bar, but cheaper than market value — keep for use.
    Keep,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Market => write!(f, "MARKET"),
            Strategy::Vendor => write!(f, "VENDOR"),
            Strategy::Keep => write!(f, "KEEP"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "market" => Ok(Strategy::Market),
            "vendor" => Ok(Strategy::Vendor),
            "keep" => Ok(Strategy::Keep),
            _ => Err(anyhow::anyhow!("Unknown strategy: {s}")),
        }
    }
}

/// Ranking mode selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    /// Descending total potential profit (profit × purchase limit).
    Total,
    /// Descending unit profit.
    Unit,
    /// Descending return on investment percentage.
    Roi,
    /// Ascending total cost.
    Cost,
}

impl std::str::FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "total" => Ok(SortMode::Total),
            "unit" => Ok(SortMode::Unit),
            "roi" => Ok(SortMode::Roi),
            "cost" => Ok(SortMode::Cost),
            _ => Err(anyhow::anyhow!("Unknown sort mode: {s}")),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Total => write!(f, "total"),
            SortMode::Unit => write!(f, "unit"),
            SortMode::Roi => write!(f, "roi"),
            SortMode::Cost => write!(f, "cost"),
        }
    }
}

/// Parameters for one evaluation pass. Same snapshot + same parameters
/// must always yield the same ordered output.
#[derive(Debug, Clone)]
pub struct EvalParams {
    pub player_level: i64,
    /// `None` = all traders.
    pub trader: Option<String>,
    /// Case-insensitive substring filter on item names.
    pub search: String,
    /// Minimum unit profit for MARKET/VENDOR; KEEP uses half of it.
    pub min_profit: i64,
    /// Restrict results to a single strategy tab, if set.
    pub tab: Option<Strategy>,
    pub sort: SortMode,
    pub favorites_only: bool,
}

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            player_level: 71,
            trader: None,
            search: String::new(),
            min_profit: 0,
            tab: None,
            sort: SortMode::Total,
            favorites_only: false,
        }
    }
}

/// Persisted user preferences: favorited item names and permanently
/// hidden item names. Consumed read-only by the evaluator as filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub favorites: HashSet<String>,
    #[serde(default)]
    pub hidden: HashSet<String>,
}

// ---------------------------------------------------------------------------
// Engine outputs
// ---------------------------------------------------------------------------

/// How a candidate is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityKind {
    Barter,
    Purchase,
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpportunityKind::Barter => write!(f, "BARTER"),
            OpportunityKind::Purchase => write!(f, "BUY"),
        }
    }
}

/// One evaluated, profitable candidate ready for ranking and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub item_name: String,
    pub icon_link: Option<String>,
    pub wiki_link: Option<String>,
    pub kind: OpportunityKind,
    pub trader: String,
    pub level: i64,
    pub buy_limit: Option<i64>,
    /// Acquisition cost in roubles (ingredients or converted cash price).
    pub total_cost: i64,
    /// Human-readable acquisition description ("3x Bolts", "DIRECT BUY: 80 $").
    pub ingredients: Vec<String>,
    /// Safe market resale revenue summed over all reward units.
    pub market_revenue: i64,
    /// Raw market listing price of the primary item (display only).
    pub unit_market_price: i64,
    /// Player-market tax on the intended sale.
    pub tax: i64,
    /// Best vendor buyback summed over all reward units.
    pub vendor_revenue: i64,
    pub vendor_name: String,
    pub strategy: Strategy,
    /// Unit profit under the chosen strategy.
    pub unit_profit: i64,
    /// Unit profit × purchase limit (limit floored to 1).
    pub total_potential_profit: i64,
    /// Set when the current market listing looks inflated vs the 24h average.
    pub risky: bool,
}

impl Opportunity {
    /// Purchase limit floored to 1 for total-profit projections.
    pub fn safe_limit(&self) -> i64 {
        match self.buy_limit {
            Some(l) if l > 0 => l,
            _ => 1,
        }
    }

    /// Return on investment as a percentage of acquisition cost.
    /// Cost is guaranteed positive by the evaluator; guarded anyway.
    pub fn roi_pct(&self) -> f64 {
        if self.total_cost <= 0 {
            return 0.0;
        }
        self.unit_profit as f64 / self.total_cost as f64 * 100.0
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} via {} (LL{}) — {} | cost {} ₽ | +{} ₽/unit ({:.0}% ROI){}",
            self.kind,
            self.item_name,
            self.trader,
            self.level,
            self.strategy,
            self.total_cost,
            self.unit_profit,
            self.roi_pct(),
            if self.risky { " ⚠" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Urgency level of a trader reset countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    Normal,
    /// Under ten minutes to go.
    Warning,
    /// Reset timestamp passed — inventory refresh in progress.
    Critical,
    /// Trader absent from the reset table.
    Unknown,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Normal => write!(f, "normal"),
            Urgency::Warning => write!(f, "warning"),
            Urgency::Critical => write!(f, "critical"),
            Urgency::Unknown => write!(f, "unknown"),
        }
    }
}

/// Rendered countdown state for one trader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    pub label: String,
    pub urgency: Urgency,
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

impl Item {
    /// Helper to build a test item with sensible defaults.
    #[cfg(test)]
    pub fn sample(name: &str, base_price: i64) -> Self {
        Item {
            name: name.to_string(),
            icon_link: None,
            wiki_link: None,
            base_price,
            avg_24h_price: Some(base_price),
            last_low_price: Some(base_price),
            buy_offers: vec![
                Offer {
                    source: "fleaMarket".to_string(),
                    price: base_price,
                },
                Offer {
                    source: "prapor".to_string(),
                    price: base_price / 2,
                },
            ],
            sell_offers: vec![Offer {
                source: "therapist".to_string(),
                price: base_price / 3,
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
