use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use fieldline_core::domain::liquidation::{LiquidationEntry, StockMetric};

use super::{LiquidationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLiquidationRepository {
    pool: DbPool,
}

impl SqlLiquidationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|e| RepositoryError::Decode(format!("column `{field}`: {e}")))
}

fn get_text(row: &sqlx::sqlite::SqliteRow, field: &str) -> Result<String, RepositoryError> {
    row.try_get(field).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn get_opt_text(
    row: &sqlx::sqlite::SqliteRow,
    field: &str,
) -> Result<Option<String>, RepositoryError> {
    row.try_get(field).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<LiquidationEntry, RepositoryError> {
    let recorded_at_str = get_text(row, "recorded_at")?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    let total_value = get_opt_text(row, "total_value")?
        .map(|raw| parse_decimal("total_value", &raw))
        .transpose()?;
    let quantity =
        get_opt_text(row, "quantity")?.map(|raw| parse_decimal("quantity", &raw)).transpose()?;

    Ok(LiquidationEntry {
        id: get_text(row, "id")?,
        distributor_id: get_opt_text(row, "distributor_id")?,
        distributor_name: get_opt_text(row, "distributor_name")?,
        retailer_id: get_opt_text(row, "retailer_id")?,
        territory: get_opt_text(row, "territory")?,
        region: get_opt_text(row, "region")?,
        zone: get_opt_text(row, "zone")?,
        state: get_opt_text(row, "state")?,
        submitted_by: get_text(row, "submitted_by")?,
        submitted_by_role: get_text(row, "submitted_by_role")?,
        opening_stock: StockMetric::new(
            parse_decimal("opening_volume", &get_text(row, "opening_volume")?)?,
            parse_decimal("opening_value", &get_text(row, "opening_value")?)?,
        ),
        ytd_net_sales: StockMetric::new(
            parse_decimal("ytd_volume", &get_text(row, "ytd_volume")?)?,
            parse_decimal("ytd_value", &get_text(row, "ytd_value")?)?,
        ),
        liquidated: StockMetric::new(
            parse_decimal("liquidated_volume", &get_text(row, "liquidated_volume")?)?,
            parse_decimal("liquidated_value", &get_text(row, "liquidated_value")?)?,
        ),
        balance_stock: StockMetric::new(
            parse_decimal("balance_volume", &get_text(row, "balance_volume")?)?,
            parse_decimal("balance_value", &get_text(row, "balance_value")?)?,
        ),
        total_value,
        quantity,
        recorded_at,
    })
}

#[async_trait::async_trait]
impl LiquidationRepository for SqlLiquidationRepository {
    async fn list_current(&self) -> Result<Vec<LiquidationEntry>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, distributor_id, distributor_name, retailer_id, territory, region, zone,
                    state, submitted_by, submitted_by_role, opening_volume, opening_value,
                    ytd_volume, ytd_value, liquidated_volume, liquidated_value, balance_volume,
                    balance_value, total_value, quantity, recorded_at
             FROM liquidation_entry ORDER BY recorded_at DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    /// The liquidation table always holds one externally refreshed snapshot:
    /// replacing it swaps the whole table inside one transaction.
    async fn replace_snapshot(
        &self,
        entries: Vec<LiquidationEntry>,
    ) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM liquidation_entry").execute(&mut *tx).await?;

        for entry in &entries {
            sqlx::query(
                "INSERT INTO liquidation_entry (id, distributor_id, distributor_name, retailer_id,
                     territory, region, zone, state, submitted_by, submitted_by_role,
                     opening_volume, opening_value, ytd_volume, ytd_value, liquidated_volume,
                     liquidated_value, balance_volume, balance_value, total_value, quantity,
                     recorded_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&entry.id)
            .bind(&entry.distributor_id)
            .bind(&entry.distributor_name)
            .bind(&entry.retailer_id)
            .bind(&entry.territory)
            .bind(&entry.region)
            .bind(&entry.zone)
            .bind(&entry.state)
            .bind(&entry.submitted_by)
            .bind(&entry.submitted_by_role)
            .bind(entry.opening_stock.volume.to_string())
            .bind(entry.opening_stock.value.to_string())
            .bind(entry.ytd_net_sales.volume.to_string())
            .bind(entry.ytd_net_sales.value.to_string())
            .bind(entry.liquidated.volume.to_string())
            .bind(entry.liquidated.value.to_string())
            .bind(entry.balance_stock.volume.to_string())
            .bind(entry.balance_stock.value.to_string())
            .bind(entry.total_value.map(|value| value.to_string()))
            .bind(entry.quantity.map(|value| value.to_string()))
            .bind(entry.recorded_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(entries.len())
    }
}
