//! 印度股票放量筛选服务
//!
//! 定时扫描 NSE/BSE 股票的 5 分钟成交量，筛选出相对前一交易日放量的大盘股，
//! 通过网页看板和 JSON 接口展示
//! 数据来源：Yahoo Finance、NSE 上市公司列表

mod config;     // 配置
mod error;      // 错误类型
mod handlers;   // HTTP 请求处理器
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::middleware::ApiKeyMiddleware;
use crate::services::pipeline::Pipeline;
use crate::services::scheduler::{DashboardState, RefreshScheduler};

fn startup_error(e: anyhow::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
}

/// 应用程序入口
#[actix_web::main]
async fn main() -> io::Result<()> {
    // 配置错误属于不可恢复错误，直接终止启动
    let (config, config_path) = match AppConfig::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("配置加载失败: {}", e);
            return Err(startup_error(e));
        }
    };

    // 初始化日志系统，RUST_LOG 优先于配置文件
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));

    match &config_path {
        Some(path) => log::info!("从 {} 加载配置成功", path.display()),
        None => log::info!("未找到配置文件，使用默认配置"),
    }
    if config.api.api_key.is_empty() {
        log::warn!("未设置 API Key，接口不启用认证");
    }

    let source = services::market_data::from_config(&config).map_err(startup_error)?;
    let pipeline = Pipeline::from_config(&config, source).map_err(|e| {
        log::error!("启动失败: {}", e);
        startup_error(e)
    })?;

    let refresh_interval = Duration::from_secs(config.screener.refresh_interval_seconds);
    let state = web::Data::new(DashboardState::new(Arc::new(pipeline), refresh_interval));

    let scheduler = if config.screener.auto_refresh {
        log::info!("自动刷新已启用，间隔 {} 秒", refresh_interval.as_secs());
        Some(RefreshScheduler::new(refresh_interval).spawn(state.clone().into_inner()))
    } else {
        log::info!("自动刷新已关闭，通过 POST /api/v1/screener/refresh 手动刷新");
        None
    };

    log::info!("启动放量筛选服务，监听 {}", config.bind_addr());

    let api_key = config.api.api_key.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(ApiKeyMiddleware::new(api_key.clone())) // API Key 认证
            .wrap(Logger::default()) // 请求日志
            .configure(handlers::config) // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    let result = server.bind(config.bind_addr())?.run().await;

    // 服务停止后放弃正在进行的刷新
    if let Some(handle) = scheduler {
        handle.abort();
    }
    result
}
