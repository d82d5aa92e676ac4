//! Background cleanup task for abandoned channels.
//!
//! A channel normally leaves the registry when a reader receives its terminal
//! marker. Channels nobody ever reads (or whose readers all disconnected)
//! would otherwise live forever; this task drops those that have had no
//! reader and no activity for `channel_ttl_secs`.

use crate::config::CleanupConfig;
use crate::server::StreamRelay;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn a background cleanup task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task(
    relay: Arc<StreamRelay>,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_secs = config.interval_secs;
        let ttl = Duration::from_secs(config.channel_ttl_secs);
        tracing::info!(
            "Cleanup task started (interval: {}s, ttl: {}s)",
            interval_secs,
            config.channel_ttl_secs
        );

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;
            run_once(&relay, ttl).await;
        }
    })
}

/// One cleanup pass. Returns the number of channels reaped.
pub async fn run_once(relay: &StreamRelay, ttl: Duration) -> usize {
    let reaped = relay.registry().reap_idle(ttl).await;
    relay.rate_limits().shrink();

    if reaped > 0 {
        tracing::info!(
            "Cleanup: reaped {} idle channels ({} live)",
            reaped,
            relay.total_channels()
        );
    } else {
        tracing::debug!("Cleanup: no idle channels");
    }
    reaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::atomic::Ordering;
    use stream_types::ChatRequest;

    fn test_relay() -> Arc<StreamRelay> {
        let mut config = Config::default();
        config.agent.token_delay_ms = 0;
        Arc::new(StreamRelay::with_echo_agent(config))
    }

    fn chat() -> ChatRequest {
        ChatRequest {
            message: "nobody reads this".to_string(),
            session_id: "s1".to_string(),
            timeline: 0.0,
        }
    }

    #[tokio::test]
    async fn run_once_reaps_unread_channels() {
        let relay = test_relay();
        relay.start_chat(&chat()).unwrap();

        assert_eq!(run_once(&relay, Duration::from_secs(3600)).await, 0);
        assert_eq!(run_once(&relay, Duration::ZERO).await, 1);
        assert_eq!(relay.total_channels(), 0);
        assert_eq!(relay.metrics().channels_reaped.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn cleanup_task_reaps_on_interval() {
        let relay = test_relay();
        relay.start_chat(&chat()).unwrap();

        let config = CleanupConfig {
            interval_secs: 1,
            channel_ttl_secs: 0,
            enabled: true,
        };
        let handle = spawn_cleanup_task(Arc::clone(&relay), config);

        // The first tick fires immediately.
        for _ in 0..100 {
            if relay.total_channels() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(relay.total_channels(), 0);
    }

    #[tokio::test]
    async fn cleanup_task_disabled() {
        let relay = test_relay();
        let config = CleanupConfig {
            interval_secs: 1,
            channel_ttl_secs: 0,
            enabled: false,
        };

        let handle = spawn_cleanup_task(relay, config);

        // Task should complete immediately when disabled
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("Task should complete when disabled")
            .expect("Task should not panic");
    }
}
