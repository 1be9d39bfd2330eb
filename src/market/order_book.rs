// =============================================================================
// Quote Merge — collapse a raw order-book snapshot into sorted price levels
// =============================================================================
//
// The exchange's order-book endpoint returns each side as a flat list of
// (price, quantity) pairs, unsorted and with duplicate prices. A single
// logical price level can therefore appear multiple times in one snapshot;
// its quantities must be summed, never overwritten.
// =============================================================================

use serde::{Deserialize, Serialize};

/// One raw resting order on one side of the book, as handed over by the
/// exchange client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub quantity: f64,
}

/// One merged price level: unique price, aggregated quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

/// Merge a raw quote list for one side into sorted, unique price levels.
///
/// * Quantities at identical prices are summed across all occurrences
///   (order-independent: the sum is the same for any input permutation).
/// * Entries with non-positive price or non-positive quantity are dropped —
///   they are malformed feed noise and would otherwise poison the cumulative
///   depth pass.
/// * The result is sorted by price ascending.
///
/// Pure function; an empty input yields an empty side.
pub fn merge_quotes(quotes: &[Quote]) -> Vec<PriceLevel> {
    let mut sorted: Vec<&Quote> = quotes
        .iter()
        .filter(|q| q.price > 0.0 && q.quantity > 0.0)
        .collect();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut levels: Vec<PriceLevel> = Vec::with_capacity(sorted.len());
    for quote in sorted {
        match levels.last_mut() {
            Some(last) if last.price == quote.price => {
                last.quantity += quote.quantity;
            }
            _ => levels.push(PriceLevel {
                price: quote.price,
                quantity: quote.quantity,
            }),
        }
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(price: f64, quantity: f64) -> Quote {
        Quote { price, quantity }
    }

    #[test]
    fn duplicate_prices_are_summed() {
        let levels = merge_quotes(&[q(10.0, 1.0), q(10.0, 2.0), q(11.0, 5.0)]);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, 10.0);
        assert!((levels[0].quantity - 3.0).abs() < f64::EPSILON);
        assert_eq!(levels[1].price, 11.0);
        assert!((levels[1].quantity - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn merge_is_order_independent() {
        let a = merge_quotes(&[q(10.0, 1.0), q(11.0, 5.0), q(10.0, 2.0)]);
        let b = merge_quotes(&[q(11.0, 5.0), q(10.0, 2.0), q(10.0, 1.0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn result_is_sorted_ascending() {
        let levels = merge_quotes(&[q(3.0, 1.0), q(1.0, 1.0), q(2.0, 1.0)]);
        let prices: Vec<f64> = levels.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn non_positive_entries_are_dropped() {
        let levels = merge_quotes(&[
            q(0.0, 5.0),
            q(-1.0, 5.0),
            q(2.0, 0.0),
            q(2.0, -3.0),
            q(2.0, 4.0),
        ]);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, 2.0);
        assert!((levels[0].quantity - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_input_yields_empty_side() {
        assert!(merge_quotes(&[]).is_empty());
    }

    #[test]
    fn triple_duplicate_sums_exactly() {
        let levels = merge_quotes(&[q(5.0, 0.5), q(5.0, 0.25), q(5.0, 0.25)]);
        assert_eq!(levels.len(), 1);
        assert!((levels[0].quantity - 1.0).abs() < f64::EPSILON);
    }
}
