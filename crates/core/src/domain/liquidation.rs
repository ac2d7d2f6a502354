use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Paired volume/value measurement used for every stock figure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMetric {
    pub volume: Decimal,
    pub value: Decimal,
}

impl StockMetric {
    pub fn new(volume: Decimal, value: Decimal) -> Self {
        Self { volume, value }
    }
}

/// Per-distributor stock position for one reporting period. Entries are
/// immutable-per-fetch snapshots; this crate only filters and aggregates them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiquidationEntry {
    pub id: String,
    pub distributor_id: Option<String>,
    pub distributor_name: Option<String>,
    pub retailer_id: Option<String>,
    pub territory: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub state: Option<String>,
    pub submitted_by: String,
    pub submitted_by_role: String,
    pub opening_stock: StockMetric,
    pub ytd_net_sales: StockMetric,
    pub liquidated: StockMetric,
    pub balance_stock: StockMetric,
    pub total_value: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub recorded_at: DateTime<Utc>,
}
