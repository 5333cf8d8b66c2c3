use actix_web::{web, Either, HttpResponse, Responder};
use actix_web_lab::sse::{self, Sse};
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::sync::watch;

use crate::api::metrics;
use crate::jobs::StatsState;
use crate::services::auth_service::Claims;
use crate::state::AppState;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// GET /api/v1/admin/stats - Contadores do painel
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "Stats",
    responses(
        (status = 200, description = "Latest live counters", body = StatsState),
        (status = 303, description = "Not signed in as admin; redirected to login")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_stats(state: web::Data<AppState>) -> HttpResponse {
    metrics::increment_request_count();
    HttpResponse::Ok().json(state.stats_snapshot().await)
}

/// GET /api/v1/admin/stats/stream - Server-Sent Events
///
/// One `stats` event right away, then one per store change. Connected
/// clients follow the new subscription after `POST /stats/restart`; the
/// stream ends when the monitor dies without a replacement or on unmount.
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats/stream",
    tag = "Stats",
    responses(
        (status = 200, description = "text/event-stream of StatsState values"),
        (status = 503, description = "Stats monitor is not running")
    ),
    security(("bearer_auth" = []))
)]
pub async fn stream_stats(state: web::Data<AppState>) -> Either<impl Responder, HttpResponse> {
    metrics::increment_request_count();

    let receiver = state.stats.lock().await.as_ref().map(|monitor| monitor.watch());
    let Some(receiver) = receiver else {
        return Either::Right(HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "success": false,
            "error": "Stats monitor is not running"
        })));
    };

    let events = stats_updates(state, receiver)
        .map(|stats| sse::Data::new_json(&stats).map(|data| sse::Event::from(data.event("stats"))));

    Either::Left(Sse::from_stream(events).with_keep_alive(KEEP_ALIVE))
}

/// POST /api/v1/admin/stats/restart - Nova assinatura
///
/// Open `/stats/stream` connections switch to the new subscription.
#[utoipa::path(
    post,
    path = "/api/v1/admin/stats/restart",
    tag = "Stats",
    responses(
        (status = 200, description = "Subscription restarted", body = StatsState)
    ),
    security(("bearer_auth" = []))
)]
pub async fn restart_stats(state: web::Data<AppState>, admin: web::ReqData<Claims>) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("🔄 Restarting stats monitor (requested by {})", admin.sub);

    state.restart_stats().await;
    HttpResponse::Ok().json(state.stats_snapshot().await)
}

/// Current value first, then every change. When the monitor is replaced
/// the stream moves over to the new one.
fn stats_updates(
    state: web::Data<AppState>,
    receiver: watch::Receiver<StatsState>,
) -> impl Stream<Item = StatsState> {
    futures::stream::unfold((state, receiver, true), |(state, mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            let next = state.stats.lock().await.as_ref().map(|monitor| monitor.watch());
            match next {
                // monitor novo (restart): segue a nova assinatura
                Some(next) if next.has_changed().is_ok() => receiver = next,
                _ => return None,
            }
        }
        let stats = receiver.borrow_and_update().clone();
        Some((stats, (state, receiver, false)))
    })
}
