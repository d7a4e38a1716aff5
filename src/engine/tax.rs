//! Player-market transaction tax.
//!
//! The tax pivots on the item's game-defined base price: listing at the
//! base value costs a flat 10%, and the cost grows exponentially (base 4
//! on the decimal log of the price ratio) the further the ask price
//! strays from base value — in either direction. Overpricing and
//! underpricing are penalized symmetrically in magnitude.
//!
//! Tax is computed against the *average* unit resale price across all
//! reward units of a transaction, not per reward item.

/// Compute the market tax for listing `quantity` units at `unit_ask`
/// each, given the item's reference `base_price`.
///
/// Returns 0 for degenerate inputs (zero/negative base or ask price)
/// rather than producing non-finite results.
pub fn market_tax(base_price: i64, unit_ask: f64, quantity: i64) -> i64 {
    if base_price <= 0 || !(unit_ask > 0.0) {
        return 0;
    }

    let base = base_price as f64;
    let ratio = unit_ask / base;
    let exponent = if unit_ask >= base {
        ratio.log10()
    } else {
        (1.0 / ratio).log10()
    };
    let factor = 4f64.powf(exponent);

    let unit_tax = base * 0.05 * factor + unit_ask * 0.05 * factor;
    (unit_tax * quantity as f64).round() as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_at_base_price_is_ten_percent() {
        // factor == 1 at par, so tax = round(base × 0.10 × qty)
        assert_eq!(market_tax(1000, 1000.0, 1), 100);
        assert_eq!(market_tax(1000, 1000.0, 3), 300);
        assert_eq!(market_tax(24233, 24233.0, 1), 4847);
    }

    #[test]
    fn test_tax_penalty_factor_symmetric_around_base() {
        // Listing at k× base and at base/k share the same exponential
        // penalty factor; only the ask-price term differs.
        for k in [1.5, 2.0, 3.0, 10.0] {
            let base = 10_000i64;
            let over = market_tax(base, base as f64 * k, 2);
            let under = market_tax(base, base as f64 / k, 2);
            assert!(over > 0 && under > 0);
            let factor = 4f64.powf(k.log10());
            let expected_over =
                ((base as f64 * 0.05 * factor + base as f64 * k * 0.05 * factor) * 2.0).round()
                    as i64;
            let expected_under =
                ((base as f64 * 0.05 * factor + base as f64 / k * 0.05 * factor) * 2.0).round()
                    as i64;
            assert_eq!(over, expected_over);
            assert_eq!(under, expected_under);
        }
    }

    #[test]
    fn test_tax_grows_with_distance_from_base() {
        let at_par = market_tax(1000, 1000.0, 1);
        let above = market_tax(1000, 3000.0, 1);
        let far_above = market_tax(1000, 10_000.0, 1);
        assert!(above > at_par);
        assert!(far_above > above);

        let below = market_tax(1000, 300.0, 1);
        assert!(below > at_par / 2, "underpricing is penalized too: {below}");
    }

    #[test]
    fn test_tax_scales_with_quantity() {
        let one = market_tax(1000, 1500.0, 1);
        let five = market_tax(1000, 1500.0, 5);
        // Rounded once at the end, so 5× the unrounded unit tax
        assert!((five - one * 5).abs() <= 3);
    }

    #[test]
    fn test_tax_degenerate_inputs() {
        assert_eq!(market_tax(0, 1000.0, 1), 0);
        assert_eq!(market_tax(-5, 1000.0, 1), 0);
        assert_eq!(market_tax(1000, 0.0, 1), 0);
        assert_eq!(market_tax(1000, -10.0, 1), 0);
        assert_eq!(market_tax(1000, f64::NAN, 1), 0);
    }
}
