use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_alpaca_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_alpaca_str())
    }
}

impl FromStr for OrderSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => bail!("unknown order side '{}', expected buy or sell", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_alpaca_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_alpaca_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
    Opg,
    Cls,
    Ioc,
    Fok,
}

impl TimeInForce {
    pub fn as_alpaca_str(&self) -> &'static str {
        match self {
            TimeInForce::Day => "day",
            TimeInForce::Gtc => "gtc",
            TimeInForce::Opg => "opg",
            TimeInForce::Cls => "cls",
            TimeInForce::Ioc => "ioc",
            TimeInForce::Fok => "fok",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_alpaca_str())
    }
}

impl FromStr for TimeInForce {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(TimeInForce::Day),
            "gtc" => Ok(TimeInForce::Gtc),
            "opg" => Ok(TimeInForce::Opg),
            "cls" => Ok(TimeInForce::Cls),
            "ioc" => Ok(TimeInForce::Ioc),
            "fok" => Ok(TimeInForce::Fok),
            other => bail!(
                "unknown time_in_force '{}', expected one of day/gtc/opg/cls/ioc/fok",
                other
            ),
        }
    }
}

/// A single order for the brokerage, built once and submitted at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    #[serde(rename = "qty", serialize_with = "qty_4dp")]
    pub quantity: f64,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
}

fn qty_4dp<S: Serializer>(qty: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.4}", qty))
}

impl OrderRequest {
    pub fn new(
        symbol: &str,
        quantity: f64,
        side: OrderSide,
        order_type: OrderType,
        time_in_force: TimeInForce,
    ) -> Result<Self> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            bail!("order symbol is empty");
        }
        if !quantity.is_finite() || quantity < 0.0 {
            bail!("order quantity must be a non-negative number, got {}", quantity);
        }
        if order_type == OrderType::Limit {
            bail!("limit orders need a limit price; use OrderRequest::limit");
        }
        Ok(Self {
            symbol,
            quantity,
            side,
            order_type,
            time_in_force,
            limit_price: None,
        })
    }

    pub fn market_buy(symbol: &str, quantity: f64, time_in_force: TimeInForce) -> Result<Self> {
        Self::new(
            symbol,
            quantity,
            OrderSide::Buy,
            OrderType::Market,
            time_in_force,
        )
    }

    pub fn limit(
        symbol: &str,
        quantity: f64,
        side: OrderSide,
        limit_price: f64,
        time_in_force: TimeInForce,
    ) -> Result<Self> {
        if !limit_price.is_finite() || limit_price <= 0.0 {
            bail!("limit price must be positive, got {}", limit_price);
        }
        let mut order = Self::new(symbol, quantity, side, OrderType::Market, time_in_force)?;
        order.order_type = OrderType::Limit;
        order.limit_price = Some(limit_price);
        Ok(order)
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.4} {} {} {}",
            self.side, self.quantity, self.symbol, self.order_type, self.time_in_force
        )?;
        if let Some(px) = self.limit_price {
            write!(f, " @ {:.2}", px)?;
        }
        Ok(())
    }
}

/// The brokerage's echo of a created order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
    pub symbol: String,
    pub qty: Option<f64>,
    pub filled_avg_price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_body_uses_alpaca_field_names() {
        let order = OrderRequest::market_buy("voo", 0.25, TimeInForce::Day).unwrap();
        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "symbol": "VOO",
                "qty": "0.2500",
                "side": "buy",
                "type": "market",
                "time_in_force": "day",
            })
        );
    }

    #[test]
    fn limit_order_carries_price() {
        let order =
            OrderRequest::limit("VOO", 1.0, OrderSide::Sell, 512.5, TimeInForce::Gtc).unwrap();
        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["type"], "limit");
        assert_eq!(body["limit_price"], 512.5);
        assert_eq!(body["time_in_force"], "gtc");
    }

    #[test]
    fn rejects_negative_and_non_finite_quantity() {
        assert!(OrderRequest::market_buy("VOO", -0.1, TimeInForce::Day).is_err());
        assert!(OrderRequest::market_buy("VOO", f64::NAN, TimeInForce::Day).is_err());
        assert!(OrderRequest::market_buy("  ", 1.0, TimeInForce::Day).is_err());
    }

    #[test]
    fn parses_side_and_tif() {
        assert_eq!("BUY".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("gtc".parse::<TimeInForce>().unwrap(), TimeInForce::Gtc);
        assert!("hold".parse::<OrderSide>().is_err());
        assert!("week".parse::<TimeInForce>().is_err());
    }
}
