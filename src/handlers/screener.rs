use actix_web::{web, HttpResponse, Result};
use chrono::Utc;

use crate::models::{ApiResponse, CycleReport};
use crate::services::scheduler::DashboardState;

/// 最近一次筛选结果
pub async fn get_latest(state: web::Data<DashboardState>) -> Result<HttpResponse> {
    match state.latest().await {
        Some(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        None => {
            let response = ApiResponse::<CycleReport>::error("尚未完成任何刷新，请稍后再试");
            Ok(HttpResponse::NotFound().json(response))
        }
    }
}

/// 立即刷新
pub async fn refresh_now(state: web::Data<DashboardState>) -> Result<HttpResponse> {
    match state.refresh(Utc::now()).await {
        Some(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        None => {
            let response = ApiResponse::<CycleReport>::error("刷新正在进行中");
            Ok(HttpResponse::Conflict().json(response))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/screener")
            .route("", web::get().to(get_latest))
            .route("/refresh", web::post().to(refresh_now)),
    );
}
