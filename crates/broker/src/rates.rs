//! 报价来源抽象与内置实现。
//!
//! `RateProvider` 屏蔽真实承运商 API 与内置价格表的差异：
//! 配置了 `rates.upstream_url` 时走 HTTP 上游，否则使用确定性的
//! 内置价格表。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RatesConfig;
use crate::error::{BrokerError, Result};

/// 单条报价。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub carrier: String,
    pub service: String,
    pub price: f64,
    pub eta: String,
}

/// 报价请求参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub from_zip: String,
    pub to_zip: String,
    /// 实际重量（磅）。
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub pickup_requested: bool,
}

impl QuoteRequest {
    /// 基础参数校验。
    pub fn validate(&self) -> Result<()> {
        validate_zip(&self.from_zip)?;
        validate_zip(&self.to_zip)?;
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(BrokerError::InvalidParameters(format!(
                "weight must be positive, got {}",
                self.weight
            )));
        }
        Ok(())
    }

    /// 计费重量：实际重量与体积重量（立方英寸/139）取大者。
    pub fn billable_weight(&self) -> f64 {
        let dimensional = self
            .dimensions
            .as_ref()
            .and_then(Dimensions::volume)
            .map(|volume| volume / 139.0)
            .unwrap_or(0.0);
        self.weight.max(dimensional)
    }
}

/// 包裹尺寸。开发客户端同时使用对象形式与 `"12x10x8"` 紧凑形式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimensions {
    Sized { length: f64, width: f64, height: f64 },
    Packed(String),
}

impl Dimensions {
    /// 体积（立方英寸）；紧凑形式无法解析时为 None。
    pub fn volume(&self) -> Option<f64> {
        match self {
            Self::Sized {
                length,
                width,
                height,
            } => Some(length * width * height),
            Self::Packed(raw) => {
                let mut parts = raw.split('x').map(|part| part.trim().parse::<f64>());
                match (parts.next(), parts.next(), parts.next(), parts.next()) {
                    (Some(Ok(l)), Some(Ok(w)), Some(Ok(h)), None) => Some(l * w * h),
                    _ => None,
                }
            }
        }
    }
}

/// 报价来源抽象接口。
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// 返回按价格升序排列的报价列表。
    async fn rates(&self, request: &QuoteRequest) -> Result<Vec<Quote>>;
}

/// 根据配置选择报价来源。
pub fn provider_from_config(config: &RatesConfig) -> Arc<dyn RateProvider> {
    match &config.upstream_url {
        Some(url) => {
            info!(upstream_url = %url, "using HTTP rate provider");
            Arc::new(HttpRateProvider::new(url.clone()))
        }
        None => {
            info!("using built-in table rate provider");
            Arc::new(TableRateProvider)
        }
    }
}

/// 内置确定性价格表。
///
/// 价格由计费重量与邮编区位差共同决定，仅作为真实承运商报价的
/// 开发替身。
pub struct TableRateProvider;

#[async_trait]
impl RateProvider for TableRateProvider {
    async fn rates(&self, request: &QuoteRequest) -> Result<Vec<Quote>> {
        request.validate()?;

        let zone = zip_zone(&request.from_zip, &request.to_zip);
        let base = 6.50 + 0.55 * request.billable_weight();
        let zone_factor = 1.0 + 0.15 * zone as f64;
        let pickup_fee = if request.pickup_requested { 3.50 } else { 0.0 };
        let ground_days = zone.max(1);

        let mut quotes = vec![
            Quote {
                carrier: "UPS".to_string(),
                service: "Ground".to_string(),
                price: round_cents(base * zone_factor + pickup_fee),
                eta: format!("{}-{} business days", ground_days, ground_days + 2),
            },
            Quote {
                carrier: "USPS".to_string(),
                service: "Priority Mail".to_string(),
                price: round_cents(base * zone_factor * 1.35 + pickup_fee),
                eta: "1-3 business days".to_string(),
            },
            Quote {
                carrier: "FedEx".to_string(),
                service: "2Day".to_string(),
                price: round_cents(base * zone_factor * 1.8 + pickup_fee),
                eta: "2 business days".to_string(),
            },
            Quote {
                carrier: "UPS".to_string(),
                service: "Next Day Air".to_string(),
                price: round_cents(base * zone_factor * 3.1 + pickup_fee),
                eta: "1 business day".to_string(),
            },
        ];
        quotes.sort_by(|a, b| a.price.total_cmp(&b.price));

        Ok(quotes)
    }
}

/// 通过 HTTP 上游获取报价。
pub struct HttpRateProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpRateProvider {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn rates(&self, request: &QuoteRequest) -> Result<Vec<Quote>> {
        request.validate()?;

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|err| BrokerError::Upstream(format!("rate request failed: {err}")))?
            .error_for_status()
            .map_err(|err| BrokerError::Upstream(format!("rate upstream rejected: {err}")))?;

        let mut quotes: Vec<Quote> = response
            .json()
            .await
            .map_err(|err| BrokerError::Upstream(format!("invalid rate response: {err}")))?;
        quotes.sort_by(|a, b| a.price.total_cmp(&b.price));

        Ok(quotes)
    }
}

fn validate_zip(zip: &str) -> Result<()> {
    if zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(BrokerError::InvalidParameters(format!(
            "invalid zip code: {zip:?}"
        )))
    }
}

/// 邮编区位差的粗略替身：首位数字之差。
fn zip_zone(from: &str, to: &str) -> u32 {
    let first = |zip: &str| zip.bytes().next().unwrap_or(b'0') - b'0';
    first(from).abs_diff(first(to)) as u32
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
