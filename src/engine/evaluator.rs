//! Per-candidate opportunity evaluation.
//!
//! Walks every barter recipe and cash offer in the market context,
//! resolves acquisition cost and disposal revenue, applies the market
//! tax, and classifies each surviving candidate into a disposal
//! strategy. Candidates that cannot be priced are dropped, never
//! reported as errors — an unknown-cost trade cannot be evaluated.
//!
//! Evaluation is pure with respect to the held context: the same
//! snapshot and parameters always produce the same ordered output.

use tracing::{debug, info};

use crate::engine::pricing::{
    best_vendor_buyback, cheapest_buy_price, market_price, safe_market_price, NO_BUYER,
};
use crate::engine::ranker;
use crate::engine::tax::market_tax;
use crate::market::MarketContext;
use crate::types::{
    Barter, CashOffer, EvalParams, Item, Opportunity, OpportunityKind, Prefs, Strategy,
};

// ---------------------------------------------------------------------------
// Strategy classification
// ---------------------------------------------------------------------------

/// Classify a candidate's computed profit figures into a strategy.
///
/// Rules are evaluated in this exact priority order; the first match
/// wins:
/// 1. `Market` — market profit strictly beats vendor profit, clears
///    `min_profit`, and there is market revenue to realize.
/// 2. `Vendor` — vendor profit strictly beats market profit and clears
///    `min_profit`.
/// 3. `Keep` — neither sale qualifies, but acquiring is still cheaper
///    than market value by at least half of `min_profit`. Avoiding a
///    net loss while retaining a usable item has standalone value, so
///    the bar is relaxed. At `min_profit = 0` the bar is 0: any
///    non-negative economy keeps (legacy behavior, preserved).
///
/// Returns `None` when no rule matches — no opportunity is emitted.
pub fn classify(
    profit_market: i64,
    profit_vendor: i64,
    market_revenue: i64,
    total_cost: i64,
    min_profit: i64,
) -> Option<Strategy> {
    if profit_market > profit_vendor && profit_market >= min_profit && market_revenue > 0 {
        return Some(Strategy::Market);
    }
    if profit_vendor > profit_market && profit_vendor >= min_profit {
        return Some(Strategy::Vendor);
    }
    let economy = market_revenue - total_cost;
    if economy >= min_profit / 2 && market_revenue > 0 {
        return Some(Strategy::Keep);
    }
    None
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Evaluates a market context into an ordered list of opportunities.
///
/// Borrows the context and user preferences read-only for the duration
/// of one pass.
pub struct Evaluator<'a> {
    ctx: &'a MarketContext,
    prefs: &'a Prefs,
}

/// Resolved acquisition and disposal figures for one candidate, before
/// tax and classification.
struct Candidate<'a> {
    item: &'a Item,
    kind: OpportunityKind,
    trader: String,
    level: i64,
    buy_limit: Option<i64>,
    total_cost: i64,
    ingredients: Vec<String>,
    market_revenue: i64,
    vendor_revenue: i64,
    vendor_name: String,
    reward_count: i64,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a MarketContext, prefs: &'a Prefs) -> Self {
        Self { ctx, prefs }
    }

    /// Run one full evaluation pass: gate, price, classify, and rank
    /// every barter and cash offer under the given parameters.
    pub fn evaluate(&self, params: &EvalParams) -> Vec<Opportunity> {
        let mut opportunities = Vec::new();

        for barter in &self.ctx.barters {
            if let Some(candidate) = self.barter_candidate(barter, params) {
                if let Some(opp) = self.finish(candidate, params) {
                    opportunities.push(opp);
                }
            }
        }

        for offer in &self.ctx.cash_offers {
            if let Some(candidate) = self.cash_candidate(offer, params) {
                if let Some(opp) = self.finish(candidate, params) {
                    opportunities.push(opp);
                }
            }
        }

        ranker::rank(&mut opportunities, params.sort);

        info!(
            barters = self.ctx.barters.len(),
            cash_offers = self.ctx.cash_offers.len(),
            opportunities = opportunities.len(),
            min_profit = params.min_profit,
            sort = %params.sort,
            "Evaluation pass complete"
        );

        opportunities
    }

    // -- Gating ------------------------------------------------------------

    /// Common candidate gate: player level, trader filter, excluded
    /// traders, name search, favorites, and the hidden list.
    fn is_valid_candidate(&self, item: &Item, trader: &str, level: i64, params: &EvalParams) -> bool {
        if level > params.player_level {
            return false;
        }
        if let Some(wanted) = &params.trader {
            if !trader.eq_ignore_ascii_case(wanted) {
                return false;
            }
        }
        // Ref trades in arena currency and Fence resells player loot;
        // neither is a usable acquisition source.
        if trader.eq_ignore_ascii_case("ref") || trader.eq_ignore_ascii_case("fence") {
            return false;
        }
        if !params.search.is_empty()
            && !item.name.to_lowercase().contains(&params.search.to_lowercase())
        {
            return false;
        }
        if params.favorites_only && !self.prefs.favorites.contains(&item.name) {
            return false;
        }
        if self.prefs.hidden.contains(&item.name) {
            return false;
        }
        true
    }

    // -- Candidate construction --------------------------------------------

    /// Resolve a barter into a priced candidate, or `None` when gated
    /// out or unpriceable.
    fn barter_candidate(&self, barter: &'a Barter, params: &EvalParams) -> Option<Candidate<'a>> {
        let primary = barter.primary_reward()?;

        if !self.is_valid_candidate(primary, &barter.trader.name, barter.level, params) {
            return None;
        }

        let mut total_cost = 0i64;
        let mut ingredients = Vec::with_capacity(barter.required.len());
        for req in &barter.required {
            let Some(item) = &req.item else {
                debug!(reward = %primary.name, "Barter ingredient missing item data, rejecting");
                return None;
            };
            let unit = cheapest_buy_price(item);
            if unit == 0 {
                debug!(
                    reward = %primary.name,
                    ingredient = %item.name,
                    "Barter ingredient has no resolvable price, rejecting"
                );
                return None;
            }
            total_cost += unit * req.count;
            ingredients.push(format!("{}x {}", req.count, item.name));
        }

        if total_cost == 0 {
            return None;
        }

        let (market_revenue, vendor_revenue, vendor_name, reward_count) =
            self.reward_revenue(&barter.rewards);

        Some(Candidate {
            item: primary,
            kind: OpportunityKind::Barter,
            trader: barter.trader.name.clone(),
            level: barter.level,
            buy_limit: barter.buy_limit,
            total_cost,
            ingredients,
            market_revenue,
            vendor_revenue,
            vendor_name,
            reward_count,
        })
    }

    /// Resolve a cash offer into a priced candidate. A direct purchase
    /// always has exactly one reward unit.
    fn cash_candidate(&self, offer: &'a CashOffer, params: &EvalParams) -> Option<Candidate<'a>> {
        let item = offer.item.as_ref()?;

        if !self.is_valid_candidate(item, &offer.trader, offer.min_level, params) {
            return None;
        }

        let total_cost = self.ctx.rates.to_roubles(offer.price, offer.currency);
        if total_cost == 0 {
            return None;
        }

        let buyback = best_vendor_buyback(item);
        let vendor_name = if buyback.price > 0 {
            buyback.trader_name.clone()
        } else {
            NO_BUYER.to_string()
        };

        Some(Candidate {
            item,
            kind: OpportunityKind::Purchase,
            trader: offer.trader.clone(),
            level: offer.min_level,
            buy_limit: offer.buy_limit,
            total_cost,
            ingredients: vec![format!(
                "DIRECT BUY: {} {}",
                offer.price,
                offer.currency.symbol()
            )],
            market_revenue: safe_market_price(item),
            vendor_revenue: buyback.price,
            vendor_name,
            reward_count: 1,
        })
    }

    /// Sum market and vendor revenue across all reward units, taking
    /// the vendor name from the first reward with a positive buyback.
    /// Reward entries with missing item data contribute nothing.
    fn reward_revenue(&self, rewards: &[crate::types::Ingredient]) -> (i64, i64, String, i64) {
        let mut market_revenue = 0i64;
        let mut vendor_revenue = 0i64;
        let mut vendor_name: Option<String> = None;
        let mut reward_count = 0i64;

        for reward in rewards {
            let Some(item) = &reward.item else {
                continue;
            };
            reward_count += reward.count;
            market_revenue += safe_market_price(item) * reward.count;
            let buyback = best_vendor_buyback(item);
            vendor_revenue += buyback.price * reward.count;
            if vendor_name.is_none() && buyback.price > 0 {
                vendor_name = Some(buyback.trader_name);
            }
        }

        (
            market_revenue,
            vendor_revenue,
            vendor_name.unwrap_or_else(|| NO_BUYER.to_string()),
            reward_count,
        )
    }

    // -- Tax, profit, classification ---------------------------------------

    /// Compute tax and profits for a priced candidate, classify it, and
    /// emit the opportunity — or `None` when no disposal path qualifies
    /// or the current strategy tab filters it out.
    fn finish(&self, c: Candidate<'a>, params: &EvalParams) -> Option<Opportunity> {
        let reward_count = c.reward_count.max(1);
        let avg_unit_revenue = c.market_revenue as f64 / reward_count as f64;
        let tax = market_tax(c.item.base_price, avg_unit_revenue, reward_count);

        let profit_market = c.market_revenue - tax - c.total_cost;
        let profit_vendor = c.vendor_revenue - c.total_cost;

        // No viable disposal path at all.
        if c.market_revenue == 0 && profit_vendor < 0 {
            return None;
        }

        let strategy = classify(
            profit_market,
            profit_vendor,
            c.market_revenue,
            c.total_cost,
            params.min_profit,
        )?;

        if let Some(tab) = params.tab {
            if strategy != tab {
                return None;
            }
        }

        let unit_market = market_price(c.item);
        let avg_24h = c.item.avg_24h_price.unwrap_or(0);
        let risky = unit_market > 0 && avg_24h > 0 && unit_market > avg_24h * 2;

        let buy_limit = c.buy_limit;
        let safe_limit = match buy_limit {
            Some(l) if l > 0 => l,
            _ => 1,
        };
        let (unit_profit, total_potential_profit) = match strategy {
            Strategy::Market => (profit_market, profit_market * safe_limit),
            Strategy::Vendor => (profit_vendor, profit_vendor * safe_limit),
            // KEEP reports the market profit per unit but projects the
            // raw economy (revenue minus cost, before tax) over the limit.
            Strategy::Keep => (profit_market, (c.market_revenue - c.total_cost) * safe_limit),
        };

        Some(Opportunity {
            item_name: c.item.name.clone(),
            icon_link: c.item.icon_link.clone(),
            wiki_link: c.item.wiki_link.clone(),
            kind: c.kind,
            trader: c.trader,
            level: c.level,
            buy_limit,
            total_cost: c.total_cost,
            ingredients: c.ingredients,
            market_revenue: c.market_revenue,
            unit_market_price: unit_market,
            tax,
            vendor_revenue: c.vendor_revenue,
            vendor_name: c.vendor_name,
            strategy,
            unit_profit,
            total_potential_profit,
            risky,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
