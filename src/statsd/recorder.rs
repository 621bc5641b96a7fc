//! In-memory [`MetricsSink`] used by tests.

use std::sync::Mutex;
use std::time::Duration;

use super::{CheckOptions, CheckStatus, EventOptions, MetricsSink};
use crate::tags::TagSet;

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Event {
        title: String,
        opts: EventOptions,
        tags: Vec<String>,
    },
    Check {
        name: String,
        status: CheckStatus,
        opts: CheckOptions,
        tags: Vec<String>,
    },
    Gauge {
        name: String,
        value: f64,
        tags: Vec<String>,
    },
    Timing {
        name: String,
        duration: Duration,
        tags: Vec<String>,
    },
}

impl Call {
    pub(crate) fn name(&self) -> &str {
        match self {
            Call::Event { title, .. } => title,
            Call::Check { name, .. } | Call::Gauge { name, .. } | Call::Timing { name, .. } => name,
        }
    }

    pub(crate) fn tags(&self) -> &[String] {
        match self {
            Call::Event { tags, .. }
            | Call::Check { tags, .. }
            | Call::Gauge { tags, .. }
            | Call::Timing { tags, .. } => tags,
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    calls: Mutex<Vec<Call>>,
}

impl RecordingSink {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MetricsSink for RecordingSink {
    fn event(&self, title: &str, _text: Option<&str>, opts: &EventOptions, tags: &TagSet) {
        self.record(Call::Event {
            title: title.to_string(),
            opts: opts.clone(),
            tags: tags.to_strings(),
        });
    }

    fn check(&self, name: &str, status: CheckStatus, opts: &CheckOptions, tags: &TagSet) {
        self.record(Call::Check {
            name: name.to_string(),
            status,
            opts: opts.clone(),
            tags: tags.to_strings(),
        });
    }

    fn gauge(&self, name: &str, value: f64, tags: &TagSet) {
        self.record(Call::Gauge {
            name: name.to_string(),
            value,
            tags: tags.to_strings(),
        });
    }

    fn timing(&self, name: &str, duration: Duration, tags: &TagSet) {
        self.record(Call::Timing {
            name: name.to_string(),
            duration,
            tags: tags.to_strings(),
        });
    }
}
