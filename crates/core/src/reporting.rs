use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::liquidation::LiquidationEntry;
use crate::domain::user::UserContext;
use crate::visibility::filter_entries;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationSummary {
    pub total_value: Decimal,
    pub total_quantity: Decimal,
    pub unique_distributors: usize,
    pub unique_retailers: usize,
    pub total_entries: usize,
}

/// Aggregate the entries visible to `viewer`. Missing numeric fields count as
/// zero; blank distributor/retailer identifiers are ignored in the distinct
/// counts. Deterministic for a given input.
pub fn summarize(
    entries: &[LiquidationEntry],
    viewer: &UserContext,
    subordinate_ids: &[String],
) -> LiquidationSummary {
    let visible = filter_entries(entries, viewer, subordinate_ids);

    let mut total_value = Decimal::ZERO;
    let mut total_quantity = Decimal::ZERO;
    let mut distributors: HashSet<&str> = HashSet::new();
    let mut retailers: HashSet<&str> = HashSet::new();

    for entry in &visible {
        total_value += entry.total_value.unwrap_or(Decimal::ZERO);
        total_quantity += entry.quantity.unwrap_or(Decimal::ZERO);

        if let Some(distributor_id) = entry.distributor_id.as_deref() {
            if !distributor_id.trim().is_empty() {
                distributors.insert(distributor_id.trim());
            }
        }
        if let Some(retailer_id) = entry.retailer_id.as_deref() {
            if !retailer_id.trim().is_empty() {
                retailers.insert(retailer_id.trim());
            }
        }
    }

    LiquidationSummary {
        total_value,
        total_quantity,
        unique_distributors: distributors.len(),
        unique_retailers: retailers.len(),
        total_entries: visible.len(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::liquidation::{LiquidationEntry, StockMetric};
    use crate::domain::user::UserContext;

    use super::summarize;

    fn entry(id: &str, distributor: Option<&str>, retailer: Option<&str>) -> LiquidationEntry {
        LiquidationEntry {
            id: id.to_string(),
            distributor_id: distributor.map(str::to_string),
            distributor_name: None,
            retailer_id: retailer.map(str::to_string),
            territory: Some("North Delhi".to_string()),
            region: None,
            zone: Some("North".to_string()),
            state: Some("Delhi".to_string()),
            submitted_by: "U1".to_string(),
            submitted_by_role: "MDO".to_string(),
            opening_stock: StockMetric::default(),
            ytd_net_sales: StockMetric::default(),
            liquidated: StockMetric::default(),
            balance_stock: StockMetric::default(),
            total_value: Some(Decimal::new(1_000, 0)),
            quantity: Some(Decimal::new(40, 0)),
            recorded_at: Utc::now(),
        }
    }

    fn vp() -> UserContext {
        UserContext {
            id: "U-VP".to_string(),
            role_code: "VP".to_string(),
            territory: None,
            zone: None,
            state: None,
        }
    }

    #[test]
    fn sums_and_counts_over_visible_entries() {
        let entries = vec![
            entry("1", Some("D-1"), Some("R-1")),
            entry("2", Some("D-1"), Some("R-2")),
            entry("3", Some("D-2"), None),
        ];

        let summary = summarize(&entries, &vp(), &[]);
        assert_eq!(summary.total_entries, 3);
        assert_eq!(summary.total_value, Decimal::new(3_000, 0));
        assert_eq!(summary.total_quantity, Decimal::new(120, 0));
        assert_eq!(summary.unique_distributors, 2);
        assert_eq!(summary.unique_retailers, 2);
    }

    #[test]
    fn missing_numeric_fields_count_as_zero() {
        let mut sparse = entry("1", Some("D-1"), None);
        sparse.total_value = None;
        sparse.quantity = None;
        let entries = vec![sparse, entry("2", Some("D-2"), Some("R-1"))];

        let summary = summarize(&entries, &vp(), &[]);
        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.total_value, Decimal::new(1_000, 0));
        assert_eq!(summary.total_quantity, Decimal::new(40, 0));
    }

    #[test]
    fn blank_identifiers_do_not_inflate_distinct_counts() {
        let entries = vec![
            entry("1", Some("  "), Some("")),
            entry("2", Some("D-1 "), Some("R-1")),
            entry("3", Some(" D-1"), Some("R-1")),
        ];

        let summary = summarize(&entries, &vp(), &[]);
        assert_eq!(summary.unique_distributors, 1);
        assert_eq!(summary.unique_retailers, 1);
    }

    #[test]
    fn aggregation_respects_viewer_scope() {
        let mut foreign = entry("2", Some("D-9"), Some("R-9"));
        foreign.territory = Some("Nagpur Rural".to_string());
        foreign.state = Some("Maharashtra".to_string());
        foreign.zone = Some("West".to_string());
        foreign.submitted_by = "U2".to_string();
        let entries = vec![entry("1", Some("D-1"), Some("R-1")), foreign];

        let mdo = UserContext {
            id: "U1".to_string(),
            role_code: "MDO".to_string(),
            territory: Some("North Delhi".to_string()),
            zone: Some("North".to_string()),
            state: Some("Delhi".to_string()),
        };

        let summary = summarize(&entries, &mdo, &[]);
        assert_eq!(summary.total_entries, 1);
        assert_eq!(summary.unique_distributors, 1);
        assert_eq!(summary.total_value, Decimal::new(1_000, 0));
    }
}
