use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. Sequences are ordered oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// An open position held at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
}

/// The order the trading loop intends to place if the pipeline agrees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedOrder {
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Limit price. None = market order.
    pub price: Option<Decimal>,
}

/// Portfolio snapshot handed to the risk officer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioContext {
    pub symbol: String,
    pub cash_balance: Decimal,
    pub total_equity: Decimal,
    #[serde(default)]
    pub open_positions: Vec<PositionSnapshot>,
    pub proposed_order: Option<ProposedOrder>,
    /// Free-form extras (drawdown, exposure limits, venue notes).
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl PortfolioContext {
    /// Notional value of the proposed order, when it carries a limit price.
    pub fn proposed_notional(&self) -> Option<Decimal> {
        let order = self.proposed_order.as_ref()?;
        order.price.map(|p| p * order.quantity)
    }
}
