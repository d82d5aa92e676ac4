//! Prometheus metrics endpoint.

use crate::server::StreamRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<StreamRelay>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&relay),
    )
}

fn render(relay: &StreamRelay) -> String {
    let m = relay.metrics();

    // Gauges
    let channels = relay.total_channels();
    let readers = relay.total_readers();
    let sessions = relay.rate_limits().session_keys_count();

    // Counters
    let chats = m.chats_total.load(Ordering::Relaxed);
    let created = m.channels_created.load(Ordering::Relaxed);
    let events = m.events_buffered.load(Ordering::Relaxed);
    let producer_errors = m.producer_errors.load(Ordering::Relaxed);
    let opened = m.streams_opened.load(Ordering::Relaxed);
    let completed = m.streams_completed.load(Ordering::Relaxed);
    let abandoned = m.streams_abandoned.load(Ordering::Relaxed);
    let timed_out = m.streams_timed_out.load(Ordering::Relaxed);
    let not_found = m.not_found.load(Ordering::Relaxed);
    let reaped = m.channels_reaped.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);

    format!(
        r#"# HELP agentcast_relay_channels_active Number of live channels
# TYPE agentcast_relay_channels_active gauge
agentcast_relay_channels_active {channels}

# HELP agentcast_relay_readers_active Number of attached readers
# TYPE agentcast_relay_readers_active gauge
agentcast_relay_readers_active {readers}

# HELP agentcast_relay_rate_limited_sessions Number of session ids tracked by the rate limiter
# TYPE agentcast_relay_rate_limited_sessions gauge
agentcast_relay_rate_limited_sessions {sessions}

# HELP agentcast_relay_info Server information
# TYPE agentcast_relay_info gauge
agentcast_relay_info{{version="{version}"}} 1

# HELP agentcast_relay_chats_total Total chat requests accepted
# TYPE agentcast_relay_chats_total counter
agentcast_relay_chats_total {chats}

# HELP agentcast_relay_channels_created_total Total channels created
# TYPE agentcast_relay_channels_created_total counter
agentcast_relay_channels_created_total {created}

# HELP agentcast_relay_events_buffered_total Total events appended to channel logs
# TYPE agentcast_relay_events_buffered_total counter
agentcast_relay_events_buffered_total {events}

# HELP agentcast_relay_producer_errors_total Total producers that failed while draining
# TYPE agentcast_relay_producer_errors_total counter
agentcast_relay_producer_errors_total {producer_errors}

# HELP agentcast_relay_streams_opened_total Total readers attached
# TYPE agentcast_relay_streams_opened_total counter
agentcast_relay_streams_opened_total {opened}

# HELP agentcast_relay_streams_completed_total Total readers that received the terminal marker
# TYPE agentcast_relay_streams_completed_total counter
agentcast_relay_streams_completed_total {completed}

# HELP agentcast_relay_streams_abandoned_total Total readers that disconnected early
# TYPE agentcast_relay_streams_abandoned_total counter
agentcast_relay_streams_abandoned_total {abandoned}

# HELP agentcast_relay_streams_timed_out_total Total readers closed without a terminal marker
# TYPE agentcast_relay_streams_timed_out_total counter
agentcast_relay_streams_timed_out_total {timed_out}

# HELP agentcast_relay_not_found_total Total lookups of unknown channels
# TYPE agentcast_relay_not_found_total counter
agentcast_relay_not_found_total {not_found}

# HELP agentcast_relay_channels_reaped_total Total idle channels removed by cleanup
# TYPE agentcast_relay_channels_reaped_total counter
agentcast_relay_channels_reaped_total {reaped}

# HELP agentcast_relay_rate_limit_hits_total Total rate limit and capacity rejections
# TYPE agentcast_relay_rate_limit_hits_total counter
agentcast_relay_rate_limit_hits_total {rate_limits}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn render_includes_gauges_and_counters() {
        let relay = StreamRelay::with_echo_agent(Config::default());
        relay.metrics().not_found.fetch_add(3, Ordering::Relaxed);

        let body = render(&relay);
        assert!(body.contains("# TYPE agentcast_relay_channels_active gauge"));
        assert!(body.contains("agentcast_relay_channels_active 0\n"));
        assert!(body.contains("agentcast_relay_not_found_total 3\n"));
        assert!(body.contains(&format!(
            "agentcast_relay_info{{version=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION")
        )));
    }
}
