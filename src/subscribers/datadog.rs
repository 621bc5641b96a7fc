//! # DatadogSubscriber: lifecycle event dispatcher
//!
//! Translates one [`ProcessEvent`] into a fixed set of backend calls.
//!
//! ## Dispatch table
//! ```text
//! delete             event "was deleted"
//! exit               event "is <status>" (warning, aggregated by name-uptime)
//!                    timing pm2.processes.uptime
//!                    check  app.is_ok CRITICAL   (only if exit code != 0)
//! restart / reload   event "was restarted" / "was reloaded" (success)
//!                    check  app.is_ok OK
//!                    gauge  pm2.processes.restart
//! restart overlimit  event "has exceeded the restart limit" (error, aggregated)
//! start              event "was manually started" (success), check OK
//! stop               event "was manually stopped" (error),   check WARNING
//! anything else      nothing (logged at info)
//! ```
//!
//! Every call carries the event tags (`application`, `instance`, `status`,
//! optional `branch` and `version`); see [`TagSet::for_event`].

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::info;

use crate::events::{EventKind, ProcessEvent};
use crate::statsd::{
    AlertType, CheckOptions, CheckStatus, EventOptions, MetricsSink, CHECK_APP_OK,
    METRIC_RESTART, METRIC_UPTIME,
};
use crate::subscribers::Subscribe;
use crate::tags::{manifest, TagSet};

/// Wall-clock source, milliseconds since the Unix epoch.
pub type Clock = fn() -> u64;

fn system_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Subscriber forwarding lifecycle events to a [`MetricsSink`].
pub struct DatadogSubscriber {
    sink: Arc<dyn MetricsSink>,
    clock: Clock,
}

impl DatadogSubscriber {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            sink,
            clock: system_clock,
        }
    }

    /// Replaces the wall clock used to compute exit uptimes.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Emits the backend calls for one event.
    ///
    /// Returns the recognized kind, or `None` when the event was ignored.
    pub async fn dispatch(&self, ev: &ProcessEvent) -> Option<EventKind> {
        let process = &ev.process;
        let version = match &process.pm_cwd {
            Some(dir) => manifest::read_version(dir).await,
            None => None,
        };
        let tags = TagSet::for_event(process, version.as_deref());
        let tag_list = tags.to_strings();

        info!(event = %ev.event, status = %process.status, tags = ?tag_list, "received event");

        let Some(kind) = ev.kind() else {
            info!(event = %ev.event, status = %process.status, tags = ?tag_list, "ignoring event");
            return None;
        };

        let name = &process.name;
        let at = ev.at_secs();
        let check_opts = CheckOptions::at(at);
        let sink = self.sink.as_ref();

        match kind {
            EventKind::Delete => {
                sink.event(
                    &format!("PM2 process '{name}' was deleted"),
                    None,
                    &EventOptions::at(at),
                    &tags,
                );
            }
            EventKind::Exit => {
                sink.event(
                    &format!("PM2 process '{name}' is {}", process.status),
                    None,
                    &EventOptions::at(at)
                        .aggregate(aggregation_key(ev))
                        .alert(AlertType::Warning),
                    &tags,
                );
                let uptime = process.uptime_ms((self.clock)());
                sink.timing(METRIC_UPTIME, Duration::from_millis(uptime), &tags);

                if process.exit_code != Some(0) {
                    sink.check(CHECK_APP_OK, CheckStatus::Critical, &check_opts, &tags);
                }
            }
            EventKind::Restart | EventKind::Reload => {
                let verb = if kind == EventKind::Restart {
                    "restarted"
                } else {
                    "reloaded"
                };
                sink.event(
                    &format!("PM2 process '{name}' was {verb}"),
                    None,
                    &EventOptions::at(at).alert(AlertType::Success),
                    &tags,
                );
                sink.check(CHECK_APP_OK, CheckStatus::Ok, &check_opts, &tags);
                sink.gauge(METRIC_RESTART, process.restart_time as f64, &tags);
            }
            EventKind::RestartOverlimit => {
                sink.event(
                    &format!("PM2 process '{name}' has exceeded the restart limit"),
                    None,
                    &EventOptions::at(at)
                        .aggregate(aggregation_key(ev))
                        .alert(AlertType::Error),
                    &tags,
                );
            }
            EventKind::Start => {
                sink.event(
                    &format!("PM2 process '{name}' was manually started"),
                    None,
                    &EventOptions::at(at).alert(AlertType::Success),
                    &tags,
                );
                sink.check(CHECK_APP_OK, CheckStatus::Ok, &check_opts, &tags);
            }
            EventKind::Stop => {
                sink.event(
                    &format!("PM2 process '{name}' was manually stopped"),
                    None,
                    &EventOptions::at(at).alert(AlertType::Error),
                    &tags,
                );
                sink.check(CHECK_APP_OK, CheckStatus::Warning, &check_opts, &tags);
            }
        }
        Some(kind)
    }
}

/// `<name>-<pm_uptime>`: groups every event of one process run.
fn aggregation_key(ev: &ProcessEvent) -> String {
    format!("{}-{}", ev.process.name, ev.process.pm_uptime)
}

#[async_trait]
impl Subscribe for DatadogSubscriber {
    async fn on_event(&self, event: &ProcessEvent) {
        self.dispatch(event).await;
    }

    fn name(&self) -> &'static str {
        "datadog"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statsd::recorder::{Call, RecordingSink};

    const NOW_MS: u64 = 1_700_000_060_000;
    const UPTIME_MS: u64 = 1_700_000_000_000;

    fn fixed_clock() -> u64 {
        NOW_MS
    }

    fn event(name: &str, process: serde_json::Value) -> ProcessEvent {
        let mut process = process;
        let obj = process.as_object_mut().unwrap();
        obj.entry("name").or_insert("api".into());
        obj.entry("NODE_APP_INSTANCE").or_insert(1.into());
        obj.entry("pm_uptime").or_insert(UPTIME_MS.into());
        serde_json::from_value(serde_json::json!({
            "at": 1_700_000_050_000u64,
            "event": name,
            "process": process,
        }))
        .unwrap()
    }

    fn subscriber() -> (Arc<RecordingSink>, DatadogSubscriber) {
        let sink = Arc::new(RecordingSink::default());
        let sub = DatadogSubscriber::new(sink.clone()).with_clock(fixed_clock);
        (sink, sub)
    }

    fn base_tags(status: &str) -> Vec<String> {
        vec![
            "application:api".to_string(),
            "instance:1".to_string(),
            format!("status:{status}"),
        ]
    }

    #[tokio::test]
    async fn stop_emits_error_event_and_warning_check() {
        let (sink, sub) = subscriber();
        let kind = sub
            .dispatch(&event("stop", serde_json::json!({"status": "stopped"})))
            .await;
        assert_eq!(kind, Some(EventKind::Stop));

        let tags = base_tags("stopped");
        assert_eq!(
            sink.calls(),
            vec![
                Call::Event {
                    title: "PM2 process 'api' was manually stopped".into(),
                    opts: EventOptions::at(1_700_000_050).alert(AlertType::Error),
                    tags: tags.clone(),
                },
                Call::Check {
                    name: CHECK_APP_OK.into(),
                    status: CheckStatus::Warning,
                    opts: CheckOptions::at(1_700_000_050),
                    tags,
                },
            ]
        );
    }

    #[tokio::test]
    async fn failed_exit_emits_event_timing_and_critical_check() {
        let (sink, sub) = subscriber();
        sub.dispatch(&event(
            "exit",
            serde_json::json!({"status": "errored", "exit_code": 1}),
        ))
        .await;

        let tags = base_tags("errored");
        assert_eq!(
            sink.calls(),
            vec![
                Call::Event {
                    title: "PM2 process 'api' is errored".into(),
                    opts: EventOptions::at(1_700_000_050)
                        .aggregate(format!("api-{UPTIME_MS}"))
                        .alert(AlertType::Warning),
                    tags: tags.clone(),
                },
                Call::Timing {
                    name: METRIC_UPTIME.into(),
                    duration: Duration::from_millis(NOW_MS - UPTIME_MS),
                    tags: tags.clone(),
                },
                Call::Check {
                    name: CHECK_APP_OK.into(),
                    status: CheckStatus::Critical,
                    opts: CheckOptions::at(1_700_000_050),
                    tags,
                },
            ]
        );
    }

    #[tokio::test]
    async fn clean_exit_skips_the_check() {
        let (sink, sub) = subscriber();
        sub.dispatch(&event(
            "exit",
            serde_json::json!({"status": "stopped", "exit_code": 0}),
        ))
        .await;

        let names: Vec<_> = sink.calls().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["PM2 process 'api' is stopped", METRIC_UPTIME]);
    }

    #[tokio::test]
    async fn exit_without_code_is_critical() {
        let (sink, sub) = subscriber();
        sub.dispatch(&event("exit", serde_json::json!({"status": "stopped"})))
            .await;
        assert!(matches!(
            sink.calls().last(),
            Some(Call::Check { status: CheckStatus::Critical, .. })
        ));
    }

    #[tokio::test]
    async fn restart_and_reload_share_their_calls() {
        for (name, title) in [
            ("restart", "PM2 process 'api' was restarted"),
            ("reload", "PM2 process 'api' was reloaded"),
        ] {
            let (sink, sub) = subscriber();
            sub.dispatch(&event(
                name,
                serde_json::json!({"status": "online", "restart_time": 4}),
            ))
            .await;

            let tags = base_tags("online");
            assert_eq!(
                sink.calls(),
                vec![
                    Call::Event {
                        title: title.into(),
                        opts: EventOptions::at(1_700_000_050).alert(AlertType::Success),
                        tags: tags.clone(),
                    },
                    Call::Check {
                        name: CHECK_APP_OK.into(),
                        status: CheckStatus::Ok,
                        opts: CheckOptions::at(1_700_000_050),
                        tags: tags.clone(),
                    },
                    Call::Gauge {
                        name: METRIC_RESTART.into(),
                        value: 4.0,
                        tags,
                    },
                ]
            );
        }
    }

    #[tokio::test]
    async fn overlimit_start_and_delete() {
        let (sink, sub) = subscriber();
        sub.dispatch(&event(
            "restart overlimit",
            serde_json::json!({"status": "errored"}),
        ))
        .await;
        assert_eq!(
            sink.take(),
            vec![Call::Event {
                title: "PM2 process 'api' has exceeded the restart limit".into(),
                opts: EventOptions::at(1_700_000_050)
                    .aggregate(format!("api-{UPTIME_MS}"))
                    .alert(AlertType::Error),
                tags: base_tags("errored"),
            }]
        );

        sub.dispatch(&event("start", serde_json::json!({"status": "online"})))
            .await;
        let calls = sink.take();
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            &calls[0],
            Call::Event { opts, .. } if opts.alert_type == Some(AlertType::Success)
        ));
        assert!(matches!(
            &calls[1],
            Call::Check { status: CheckStatus::Ok, .. }
        ));

        sub.dispatch(&event("delete", serde_json::json!({"status": "stopped"})))
            .await;
        assert_eq!(
            sink.take(),
            vec![Call::Event {
                title: "PM2 process 'api' was deleted".into(),
                opts: EventOptions::at(1_700_000_050),
                tags: base_tags("stopped"),
            }]
        );
    }

    #[tokio::test]
    async fn unknown_event_emits_nothing() {
        let (sink, sub) = subscriber();
        for name in ["online", "exception", "Stop", ""] {
            let kind = sub
                .dispatch(&event(name, serde_json::json!({"status": "online"})))
                .await;
            assert_eq!(kind, None);
        }
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn branch_and_version_tags_flow_into_every_call() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"version": "3.2.1"}"#).unwrap();

        let (sink, sub) = subscriber();
        sub.dispatch(&event(
            "start",
            serde_json::json!({
                "status": "online",
                "pm_cwd": dir.path(),
                "versioning": {"branch": "release"},
            }),
        ))
        .await;

        let calls = sink.calls();
        assert_eq!(calls.len(), 2);
        for call in calls {
            assert!(call.tags().contains(&"branch:release".to_string()));
            assert!(call.tags().contains(&"version:3.2.1".to_string()));
        }
    }

    #[tokio::test]
    async fn missing_manifest_and_detached_head_add_no_tags() {
        let dir = tempfile::tempdir().unwrap();

        let (sink, sub) = subscriber();
        sub.dispatch(&event(
            "stop",
            serde_json::json!({
                "status": "stopped",
                "pm_cwd": dir.path(),
                "versioning": {"branch": "HEAD"},
            }),
        ))
        .await;

        for call in sink.calls() {
            assert_eq!(call.tags(), base_tags("stopped").as_slice());
        }
    }

    #[tokio::test]
    async fn every_recognized_kind_emits_at_least_one_event() {
        for kind in EventKind::ALL {
            let (sink, sub) = subscriber();
            let got = sub
                .dispatch(&event(kind.as_str(), serde_json::json!({"status": "online"})))
                .await;
            assert_eq!(got, Some(kind));
            assert!(matches!(sink.calls().first(), Some(Call::Event { .. })));
        }
    }

    #[tokio::test]
    async fn unrecognized_status_reaches_title_and_tags() {
        let (sink, sub) = subscriber();
        sub.dispatch(&event(
            "exit",
            serde_json::json!({"status": "sleeping", "exit_code": 0}),
        ))
        .await;

        let calls = sink.calls();
        assert_eq!(calls[0].name(), "PM2 process 'api' is sleeping");
        for call in &calls {
            assert_eq!(call.tags(), base_tags("sleeping").as_slice());
        }
    }
}
