//! 定时刷新
//!
//! `RefreshScheduler` 按固定间隔触发刷新，`DashboardState` 只保存最近一次结果

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::models::{CycleReport, MarketStatus};
use crate::services::pipeline::Pipeline;

/// 看板共享状态
pub struct DashboardState {
    pipeline: Arc<Pipeline>,
    latest: RwLock<Option<CycleReport>>,
    /// 保证同一时间只有一个刷新周期
    running: Mutex<()>,
    refresh_interval: Duration,
}

impl DashboardState {
    pub fn new(pipeline: Arc<Pipeline>, refresh_interval: Duration) -> Self {
        Self {
            pipeline,
            latest: RwLock::new(None),
            running: Mutex::new(()),
            refresh_interval,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// 最近一次刷新结果
    pub async fn latest(&self) -> Option<CycleReport> {
        self.latest.read().await.clone()
    }

    /// 当前市场状态
    pub fn market_status(&self, now: &DateTime<Utc>) -> MarketStatus {
        self.pipeline.calendar().status(now)
    }

    /// 立即刷新
    ///
    /// 已有刷新正在进行时返回 None
    pub async fn refresh(&self, now: DateTime<Utc>) -> Option<CycleReport> {
        let _guard = self.running.try_lock().ok()?;
        let report = self.pipeline.run_cycle(now).await;
        *self.latest.write().await = Some(report.clone());
        Some(report)
    }

    /// 占住刷新锁，模拟正在进行的刷新
    #[cfg(test)]
    pub(crate) async fn hold_refresh(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.running.lock().await
    }
}

/// 定时刷新器
pub struct RefreshScheduler {
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// 启动后台任务，第一次刷新立即执行
    ///
    /// 丢弃返回的 JoinHandle 不会停止任务，需要时调用 abort()
    pub fn spawn(self, state: Arc<DashboardState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if state.refresh(Utc::now()).await.is_none() {
                    log::info!("上一次刷新尚未结束，跳过本次定时刷新");
                }
            }
        })
    }
}
