use actix_web::{web, HttpResponse, Result};
use chrono::Utc;
use chrono_tz::Asia::Kolkata;

use crate::models::{ApiResponse, MarketStatusInfo};
use crate::services::scheduler::DashboardState;

/// 当前市场开闭状态
pub async fn get_market_status(state: web::Data<DashboardState>) -> Result<HttpResponse> {
    let now = Utc::now();
    let info = MarketStatusInfo {
        status: state.market_status(&now),
        now_ist: now.with_timezone(&Kolkata).to_rfc3339(),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(info)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/market").route("/status", web::get().to(get_market_status)));
}
