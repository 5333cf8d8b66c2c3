use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static STATUS_UPDATE_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_status_update_count() {
    STATUS_UPDATE_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub admin_requests_total: u64,
    pub admin_errors_total: u64,
    pub status_updates_total: u64,
}

impl MetricsResponse {
    pub fn collect() -> Self {
        MetricsResponse {
            admin_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
            admin_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
            status_updates_total: STATUS_UPDATE_COUNT.load(Ordering::Relaxed),
        }
    }

    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP admin_requests_total Total number of admin API requests\n\
             # TYPE admin_requests_total counter\n\
             admin_requests_total {}\n\
             \n\
             # HELP admin_errors_total Total number of admin API errors\n\
             # TYPE admin_errors_total counter\n\
             admin_errors_total {}\n\
             \n\
             # HELP status_updates_total Confirmed user status updates\n\
             # TYPE status_updates_total counter\n\
             status_updates_total {}\n",
            self.admin_requests_total, self.admin_errors_total, self.status_updates_total
        )
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Counters in Prometheus text format")
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(MetricsResponse::collect().to_prometheus())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prometheus_text_lists_every_counter() {
        let text = MetricsResponse {
            admin_requests_total: 7,
            admin_errors_total: 1,
            status_updates_total: 2,
        }
        .to_prometheus();

        assert!(text.contains("admin_requests_total 7\n"));
        assert!(text.contains("admin_errors_total 1\n"));
        assert!(text.contains("status_updates_total 2\n"));
    }
}
