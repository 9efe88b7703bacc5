//! Yahoo Finance 行情接口实现
//!
//! 对接 https://query1.finance.yahoo.com
//! - v8/finance/chart/<symbol>：5 分钟K线
//! - v7/finance/quote：市值，需要会话 cookie 和 crumb
//!
//! crumb 获取流程：先访问 fc.yahoo.com 拿到 cookie（由 cookie store 保存），
//! 再请求 v1/test/getcrumb。crumb 缓存到下一次 quote 失败为止

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

use super::MarketDataSource;
use crate::config::{ApiConfig, DataConfig};
use crate::error::{FetchError, FetchResult};
use crate::models::Candle;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// 单次 quote 请求最多携带的股票数量
const QUOTE_CHUNK: usize = 50;

/// Yahoo Finance 数据源
pub struct YahooFinanceSource {
    /// HTTP 客户端（开启 cookie store）
    client: Client,
    /// 接口根地址（以 / 结尾）
    base_url: Url,
    /// 获取会话 cookie 的地址
    consent_url: Url,
    /// 美元兑卢比汇率
    usd_inr_rate: f64,
    /// 缓存的 crumb
    crumb: Mutex<Option<String>>,
}

impl YahooFinanceSource {
    pub fn new(data: &DataConfig, api: &ApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(api.timeout_secs))
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let mut base = data.yahoo_base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            consent_url: Url::parse(&data.yahoo_consent_url)?,
            usd_inr_rate: data.usd_inr_rate,
            crumb: Mutex::new(None),
        })
    }

    fn chart_url(&self, symbol: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> FetchResult<Url> {
        let mut url = self.base_url.join("v8/finance/chart/")?.join(symbol)?;
        url.query_pairs_mut()
            .append_pair("period1", &from.timestamp().to_string())
            .append_pair("period2", &to.timestamp().to_string())
            .append_pair("interval", "5m")
            .append_pair("includePrePost", "false");
        Ok(url)
    }

    fn quote_url(&self, symbols: &[String], crumb: &str) -> FetchResult<Url> {
        let mut url = self.base_url.join("v7/finance/quote")?;
        url.query_pairs_mut()
            .append_pair("symbols", &symbols.join(","))
            .append_pair("crumb", crumb);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> FetchResult<String> {
        log::debug!("请求 Yahoo 接口: {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Api(format!("HTTP {}", response.status())));
        }

        Ok(response.text().await?)
    }

    /// 获取 crumb，已缓存时直接返回
    async fn crumb(&self) -> FetchResult<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // 这个地址通常返回 404，只需要它设置的 cookie
        if let Err(e) = self.client.get(self.consent_url.clone()).send().await {
            log::debug!("访问 {} 失败: {}", self.consent_url, e);
        }

        let text = self.get_json(self.base_url.join("v1/test/getcrumb")?).await?;
        let crumb = text.trim();
        if crumb.is_empty() || crumb.contains('<') || crumb.contains(' ') {
            return Err(FetchError::Api(format!("invalid crumb: {:?}", crumb)));
        }

        log::info!("获取 Yahoo crumb 成功");
        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn quote_chunk(&self, symbols: &[String], crumb: &str) -> FetchResult<HashMap<String, f64>> {
        let url = self.quote_url(symbols, crumb)?;
        let text = self.get_json(url).await?;
        parse_quote_response(&text, self.usd_inr_rate)
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn intraday_candles(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> FetchResult<Vec<Candle>> {
        let url = self.chart_url(symbol, from, to)?;
        let text = self.get_json(url).await?;
        parse_chart_response(&text)
    }

    /// 分批请求市值，单批失败只跳过这一批
    ///
    /// 全部失败时返回最后一个错误
    async fn market_caps(&self, symbols: &[String]) -> FetchResult<HashMap<String, f64>> {
        let crumb = self.crumb().await?;
        let mut caps = HashMap::new();
        let mut last_error = None;

        for (i, chunk) in symbols.chunks(QUOTE_CHUNK).enumerate() {
            match self.quote_chunk(chunk, &crumb).await {
                Ok(chunk_caps) => caps.extend(chunk_caps),
                Err(e) => {
                    log::warn!("获取第 {} 批市值失败（{} 只）: {}", i + 1, chunk.len(), e);
                    last_error = Some(e);
                }
            }
        }

        if last_error.is_some() {
            // crumb 可能已过期，下次重新获取
            *self.crumb.lock().await = None;
        }

        match last_error {
            Some(e) if caps.is_empty() => Err(e),
            _ => Ok(caps),
        }
    }
}

// ==================== 响应结构 ====================

#[derive(Debug, Deserialize)]
struct YahooError {
    code: Option<String>,
    description: Option<String>,
}

impl YahooError {
    fn message(&self) -> String {
        format!(
            "{}: {}",
            self.code.as_deref().unwrap_or("error"),
            self.description.as_deref().unwrap_or("")
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteBody,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(default)]
    result: Vec<QuoteItem>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteItem {
    symbol: String,
    currency: Option<String>,
    market_cap: Option<f64>,
    regular_market_price: Option<f64>,
    shares_outstanding: Option<f64>,
}

impl QuoteItem {
    /// 市值（卢比）：优先使用 marketCap，缺失时用 价格 × 总股本
    fn market_cap_inr(&self, usd_inr_rate: f64) -> Option<f64> {
        let cap = self.market_cap.filter(|c| *c > 0.0).or_else(|| {
            match (self.regular_market_price, self.shares_outstanding) {
                (Some(price), Some(shares)) if price > 0.0 && shares > 0.0 => Some(price * shares),
                _ => None,
            }
        })?;

        match self.currency.as_deref() {
            Some("USD") => Some(cap * usd_inr_rate),
            _ => Some(cap),
        }
    }
}

// ==================== 解析函数 ====================

/// 解析 chart 接口响应，丢弃成交量为空的K线
fn parse_chart_response(text: &str) -> FetchResult<Vec<Candle>> {
    let envelope: ChartEnvelope = serde_json::from_str(text)?;

    if let Some(err) = envelope.chart.error {
        return Err(FetchError::Api(err.message()));
    }

    let result = envelope
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| FetchError::Parse("chart result is empty".to_string()))?;

    let volumes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.volume)
        .unwrap_or_default();

    let mut candles: Vec<Candle> = result
        .timestamp
        .iter()
        .zip(volumes)
        .filter_map(|(ts, volume)| {
            let volume = volume.filter(|v| *v >= 0.0)?;
            let timestamp = Utc.timestamp_opt(*ts, 0).single()?;
            Some(Candle::new(timestamp, volume.round() as u64))
        })
        .collect();

    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

/// 解析 quote 接口响应
fn parse_quote_response(text: &str, usd_inr_rate: f64) -> FetchResult<HashMap<String, f64>> {
    let envelope: QuoteEnvelope = serde_json::from_str(text)?;

    if let Some(err) = envelope.quote_response.error {
        return Err(FetchError::Api(err.message()));
    }

    Ok(envelope
        .quote_response
        .result
        .into_iter()
        .filter_map(|item| {
            let cap = item.market_cap_inr(usd_inr_rate)?;
            Some((item.symbol, cap))
        })
        .collect())
}
