//! 股票池
//!
//! 按优先级提供待扫描的 NSE/BSE 股票：
//! 1. 配置文件中显式指定的代码
//! 2. NSE 上市公司列表（EQUITY_L.csv），内存缓存 24 小时
//! 3. 内置的大盘股列表

use anyhow::{anyhow, bail, Result};
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::{AppConfig, DataSourceKind};
use crate::models::{Exchange, Security};
use crate::services::market_data::SampleSource;

/// 列表缓存有效期
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// NSE 下载失败时使用的股票
const DEFAULT_SYMBOLS: &[(&str, &str)] = &[
    ("RELIANCE.NS", "Reliance Industries"),
    ("TCS.NS", "Tata Consultancy Services"),
    ("HDFCBANK.NS", "HDFC Bank"),
    ("INFY.NS", "Infosys"),
    ("ICICIBANK.NS", "ICICI Bank"),
    ("HINDUNILVR.NS", "Hindustan Unilever"),
    ("SBIN.NS", "State Bank of India"),
    ("BHARTIARTL.NS", "Bharti Airtel"),
    ("ITC.NS", "ITC Limited"),
    ("KOTAKBANK.NS", "Kotak Mahindra Bank"),
    ("LT.NS", "Larsen & Toubro"),
    ("BAJFINANCE.NS", "Bajaj Finance"),
    ("AXISBANK.NS", "Axis Bank"),
    ("ASIANPAINT.NS", "Asian Paints"),
    ("MARUTI.NS", "Maruti Suzuki"),
    ("TITAN.NS", "Titan Company"),
    ("SUNPHARMA.NS", "Sun Pharmaceutical"),
    ("ULTRACEMCO.NS", "UltraTech Cement"),
    ("TATASTEEL.NS", "Tata Steel"),
    ("NTPC.NS", "NTPC Limited"),
];

/// 股票池来源
#[derive(Debug, Clone)]
enum UniverseSource {
    /// 固定列表（配置或演示数据）
    Fixed(Vec<Security>),
    /// 从 NSE 下载
    NseList { url: String, client: Client },
}

/// 股票池提供者
pub struct UniverseProvider {
    source: UniverseSource,
    cache: Mutex<Option<(Instant, Vec<Security>)>>,
}

impl UniverseProvider {
    /// 根据配置创建股票池
    ///
    /// 配置了代码但没有一个合法时返回错误，启动应当终止
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if !config.universe.symbols.is_empty() {
            let securities: Vec<Security> = config
                .universe
                .symbols
                .iter()
                .filter_map(|raw| {
                    let symbol = raw.trim().to_uppercase();
                    let security = to_security(&symbol, &symbol);
                    if security.is_none() {
                        log::warn!("忽略无效的股票代码: {:?}", raw);
                    }
                    security
                })
                .collect();

            if securities.is_empty() {
                bail!("股票池为空：universe.symbols 中没有合法的 NSE/BSE 代码");
            }
            return Ok(Self::fixed(securities));
        }

        if config.data.source == DataSourceKind::Sample {
            let securities = SampleSource::securities()
                .filter_map(|(symbol, name)| to_security(symbol, name))
                .collect();
            return Ok(Self::fixed(securities));
        }

        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .connect_timeout(Duration::from_secs(config.api.connect_timeout_secs))
            .build()?;

        Ok(Self {
            source: UniverseSource::NseList {
                url: config.universe.nse_list_url.clone(),
                client,
            },
            cache: Mutex::new(None),
        })
    }

    /// 固定股票池
    pub fn fixed(securities: Vec<Security>) -> Self {
        Self {
            source: UniverseSource::Fixed(securities),
            cache: Mutex::new(None),
        }
    }

    /// 获取股票池
    pub async fn securities(&self) -> Vec<Security> {
        let (url, client) = match &self.source {
            UniverseSource::Fixed(list) => return list.clone(),
            UniverseSource::NseList { url, client } => (url, client),
        };

        let mut cache = self.cache.lock().await;
        if let Some((fetched_at, list)) = cache.as_ref() {
            if fetched_at.elapsed() < CACHE_TTL {
                return list.clone();
            }
        }

        let list = match fetch_nse_list(client, url).await {
            Ok(list) if !list.is_empty() => {
                log::info!("从 NSE 获取股票列表成功，共 {} 只", list.len());
                list
            }
            Ok(_) => {
                log::warn!("NSE 股票列表为空，使用内置列表");
                default_securities()
            }
            Err(e) => {
                log::warn!("获取 NSE 股票列表失败: {}，使用内置列表", e);
                default_securities()
            }
        };

        // 内置列表同样缓存，避免每个周期都等待下载超时
        *cache = Some((Instant::now(), list.clone()));
        list
    }
}

/// 内置股票列表
pub fn default_securities() -> Vec<Security> {
    DEFAULT_SYMBOLS
        .iter()
        .filter_map(|(symbol, name)| to_security(symbol, name))
        .collect()
}

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9&-]+\.(NS|BO)$").unwrap())
}

/// 校验代码格式并识别交易所
fn to_security(symbol: &str, name: &str) -> Option<Security> {
    if !symbol_pattern().is_match(symbol) {
        return None;
    }
    Some(Security {
        symbol: symbol.to_string(),
        name: name.to_string(),
        exchange: Exchange::from_symbol(symbol)?,
    })
}

async fn fetch_nse_list(client: &Client, url: &str) -> Result<Vec<Security>> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(anyhow!("获取 NSE 股票列表失败: {}", response.status()));
    }

    let text = response.text().await?;
    parse_equity_list(&text)
}

/// 解析 NSE EQUITY_L.csv
///
/// 只使用 SYMBOL 和 NAME OF COMPANY 两列，代码追加 .NS 后缀
fn parse_equity_list(text: &str) -> Result<Vec<Security>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_uppercase()).collect();
    let symbol_idx = headers
        .iter()
        .position(|h| h == "SYMBOL")
        .ok_or_else(|| anyhow!("CSV 缺少 SYMBOL 列"))?;
    let name_idx = headers
        .iter()
        .position(|h| h == "NAME OF COMPANY")
        .ok_or_else(|| anyhow!("CSV 缺少 NAME OF COMPANY 列"))?;

    let pattern = symbol_pattern();
    let mut securities = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(symbol), Some(name)) = (record.get(symbol_idx), record.get(name_idx)) else {
            continue;
        };

        let symbol = format!("{}{}", symbol.to_uppercase(), Exchange::Nse.suffix());
        if !pattern.is_match(&symbol) {
            log::debug!("跳过无法识别的代码: {}", symbol);
            continue;
        }

        securities.push(Security {
            symbol,
            name: name.to_string(),
            exchange: Exchange::Nse,
        });
    }

    Ok(securities)
}
