//! `get_shipping_quotes` 工具。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{BrokerError, Result};
use crate::protocol::ContextualUpdate;
use crate::rates::{QuoteRequest, RateProvider};

use super::{Tool, ToolOutput};

/// 查询承运商报价并向会话推送报价就绪通知。
///
/// 成功时发出两条 contextual update：`quote_ready` 供 UI 渲染，
/// `get_shipping_quotes_result` 供语音端播报。
pub struct GetShippingQuotes {
    provider: Arc<dyn RateProvider>,
}

impl GetShippingQuotes {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for GetShippingQuotes {
    fn name(&self) -> &str {
        "get_shipping_quotes"
    }

    async fn invoke(&self, parameters: Value) -> Result<ToolOutput> {
        let request: QuoteRequest = serde_json::from_value(parameters)
            .map_err(|err| BrokerError::InvalidParameters(format!("get_shipping_quotes: {err}")))?;
        request.validate()?;

        let quotes = self.provider.rates(&request).await?;
        if quotes.is_empty() {
            return Err(BrokerError::ToolExecution(format!(
                "no rates available from {} to {}",
                request.from_zip, request.to_zip
            )));
        }

        info!(
            from_zip = %request.from_zip,
            to_zip = %request.to_zip,
            count = quotes.len(),
            "shipping quotes produced"
        );

        let cheapest = &quotes[0];
        let summary = format!(
            "Found {} options from {} to {}. Cheapest is {} {} at ${:.2}, arriving in {}.",
            quotes.len(),
            request.from_zip,
            request.to_zip,
            cheapest.carrier,
            cheapest.service,
            cheapest.price,
            cheapest.eta
        );

        let result = serde_json::to_value(&quotes)?;
        Ok(ToolOutput::new(result.clone())
            .with_update(ContextualUpdate::new(
                "quote_ready",
                json!({
                    "all_options": result,
                    "cheapest": cheapest,
                }),
            ))
            .with_update(ContextualUpdate::new(
                "get_shipping_quotes_result",
                json!({
                    "summary": summary,
                    "option_count": quotes.len(),
                }),
            )))
    }
}
