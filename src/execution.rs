use std::sync::Arc;

use async_trait::async_trait;

use crate::alpaca::AlpacaRestClient;
use crate::error::SourceError;
use crate::model::order::{OrderAck, OrderRequest};

/// Places one order per call. No idempotency key is attached, so a second
/// call for the same run double-submits.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, SourceError>;
}

pub struct AlpacaSubmitter {
    client: Arc<AlpacaRestClient>,
}

impl AlpacaSubmitter {
    pub fn new(client: Arc<AlpacaRestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrderSubmitter for AlpacaSubmitter {
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, SourceError> {
        self.client.place_order(order).await
    }
}

/// Logs the order instead of sending it.
pub struct DryRunSubmitter;

#[async_trait]
impl OrderSubmitter for DryRunSubmitter {
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, SourceError> {
        tracing::info!(stage = "submit", order = %order, "Dry run: order not sent");
        Ok(OrderAck {
            id: "dry-run".to_string(),
            status: "dry_run".to_string(),
            symbol: order.symbol.clone(),
            qty: Some(order.quantity),
            filled_avg_price: None,
        })
    }
}
