//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API Key（为空则不启用认证）
    #[serde(default)]
    pub api_key: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 筛选配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// 自动刷新间隔（秒）
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// 是否自动刷新
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    /// 最小放量倍数
    #[serde(default = "default_min_spike_ratio")]
    pub min_spike_ratio: f64,
    /// 最小市值（亿卢比 crore）
    #[serde(default = "default_min_market_cap_crore")]
    pub min_market_cap_crore: f64,
    /// 返回前 N 只股票
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

/// 抓取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// 同时进行的请求数
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// 每批股票数量
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 批次之间的暂停时间（毫秒），避免触发限流
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
}

/// 数据源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// Yahoo Finance 实时接口
    Yahoo,
    /// 内置演示数据
    Sample,
}

/// 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_source")]
    pub source: DataSourceKind,
    /// Yahoo Finance 接口地址
    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,
    /// 获取 Yahoo 会话 cookie 的地址，之后才能申请 crumb
    #[serde(default = "default_yahoo_consent_url")]
    pub yahoo_consent_url: String,
    /// 美元兑卢比汇率，市值以美元报价时使用
    #[serde(default = "default_usd_inr_rate")]
    pub usd_inr_rate: f64,
}

/// 股票池配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// 显式指定的股票代码（为空则从 NSE 下载列表）
    #[serde(default)]
    pub symbols: Vec<String>,
    /// NSE 上市公司列表 CSV 地址
    #[serde(default = "default_nse_list_url")]
    pub nse_list_url: String,
}

/// 交易日历配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketConfig {
    /// 交易所假日（YYYY-MM-DD）
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub screener: ScreenerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub universe: UniverseConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_refresh_interval() -> u64 { 300 }
fn default_true() -> bool { true }
fn default_min_spike_ratio() -> f64 { 10.0 }
fn default_min_market_cap_crore() -> f64 { 1000.0 }
fn default_top_n() -> usize { 10 }
fn default_concurrency() -> usize { 5 }
fn default_batch_size() -> usize { 10 }
fn default_batch_pause_ms() -> u64 { 1000 }
fn default_source() -> DataSourceKind { DataSourceKind::Yahoo }
fn default_yahoo_base_url() -> String { "https://query1.finance.yahoo.com".to_string() }
fn default_yahoo_consent_url() -> String { "https://fc.yahoo.com".to_string() }
fn default_usd_inr_rate() -> f64 { 83.0 }
fn default_nse_list_url() -> String {
    "https://archives.nseindia.com/content/equities/EQUITY_L.csv".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: default_refresh_interval(),
            auto_refresh: true,
            min_spike_ratio: default_min_spike_ratio(),
            min_market_cap_crore: default_min_market_cap_crore(),
            top_n: default_top_n(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            yahoo_base_url: default_yahoo_base_url(),
            yahoo_consent_url: default_yahoo_consent_url(),
            usd_inr_rate: default_usd_inr_rate(),
        }
    }
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            nse_list_url: default_nse_list_url(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("读取配置文件 {} 失败: {}", path.display(), e))?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow!("解析配置文件 {} 失败: {}", path.display(), e))?;
        Ok(config)
    }

    /// 查找配置文件：SCREENER_CONFIG 环境变量优先，其次 config.json、config/config.json
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = env::var("SCREENER_CONFIG") {
            return Some(PathBuf::from(path));
        }

        ["config.json", "config/config.json"]
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }

    /// 加载配置，找不到配置文件时使用默认值
    ///
    /// 配置文件存在但无法解析时直接返回错误，不回退到默认值
    pub fn load() -> Result<(Self, Option<PathBuf>)> {
        let path = Self::locate();
        let mut config = match &path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };

        if let Ok(key) = env::var("API_KEY") {
            config.api.api_key = key;
        }

        config.validate()?;
        Ok((config, path))
    }

    /// 校验配置，任何错误都应终止启动
    pub fn validate(&self) -> Result<()> {
        if self.screener.refresh_interval_seconds == 0 {
            bail!("screener.refresh_interval_seconds 必须为正整数");
        }
        if self.screener.top_n == 0 {
            bail!("screener.top_n 必须大于 0");
        }
        if !(self.screener.min_spike_ratio > 0.0) {
            bail!("screener.min_spike_ratio 必须大于 0");
        }
        if self.fetch.concurrency == 0 || self.fetch.batch_size == 0 {
            bail!("fetch.concurrency 和 fetch.batch_size 必须大于 0");
        }
        if self.universe.symbols.iter().all(|s| s.trim().is_empty())
            && !self.universe.symbols.is_empty()
        {
            bail!("universe.symbols 已配置但全部为空，股票池为空");
        }
        if !(self.data.usd_inr_rate > 0.0) {
            bail!("data.usd_inr_rate 必须大于 0");
        }
        url::Url::parse(&self.data.yahoo_base_url)
            .map_err(|e| anyhow!("data.yahoo_base_url 无效: {}", e))?;
        url::Url::parse(&self.data.yahoo_consent_url)
            .map_err(|e| anyhow!("data.yahoo_consent_url 无效: {}", e))?;
        Ok(())
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 最小市值（卢比）
    pub fn min_market_cap(&self) -> f64 {
        self.screener.min_market_cap_crore * 1e7
    }
}
