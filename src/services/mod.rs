//! 业务逻辑服务模块
//!
//! 封装数据获取和处理逻辑

pub mod fetcher;       // 行情抓取
pub mod market_data;   // 行情数据源
pub mod market_hours;  // 交易时间
pub mod pipeline;      // 刷新流程
pub mod scheduler;     // 定时刷新
pub mod screener;      // 放量筛选
pub mod universe;      // 股票池
