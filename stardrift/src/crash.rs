//! Breadcrumb trail and crash reports. Every session gets a bounded
//! ring of recent events; a process-wide ring catches everything else.
//! Panics anywhere in the process are recorded to a report file and
//! the server keeps running.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use stardrift_core::time::unix_ms;

const GLOBAL_RING_CAPACITY: usize = 256;
const SESSION_RING_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct CrashEvent {
    pub at: u64,
    pub kind: String,
    pub detail: String,
}

pub struct CrashReporter {
    report_dir: PathBuf,
    global: Mutex<VecDeque<CrashEvent>>,
    sessions: Mutex<HashMap<u64, VecDeque<CrashEvent>>>,
}

impl CrashReporter {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            global: Mutex::new(VecDeque::with_capacity(GLOBAL_RING_CAPACITY)),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn begin_session(&self, client_id: u64) {
        self.sessions
            .lock()
            .insert(client_id, VecDeque::with_capacity(SESSION_RING_CAPACITY));
    }

    pub fn end_session(&self, client_id: u64) {
        self.sessions.lock().remove(&client_id);
    }

    /// Record a breadcrumb. `session` scopes it to one connection's
    /// ring; it always lands in the global ring too.
    pub fn record(&self, session: Option<u64>, kind: &str, detail: impl Into<String>) {
        let event = CrashEvent {
            at: unix_ms(),
            kind: kind.to_string(),
            detail: detail.into(),
        };
        if let Some(client_id) = session {
            if let Some(ring) = self.sessions.lock().get_mut(&client_id) {
                push_ring(ring, event.clone(), SESSION_RING_CAPACITY);
            }
        }
        push_ring(&mut self.global.lock(), event, GLOBAL_RING_CAPACITY);
    }

    pub fn recent_global(&self) -> Vec<CrashEvent> {
        self.global.lock().iter().cloned().collect()
    }

    /// Dump a structured report file. Failures to write are logged and
    /// swallowed; reporting must never take the server down.
    pub fn write_report(&self, reason: &str, detail: &str) {
        #[derive(Serialize)]
        struct Report<'r> {
            at: u64,
            reason: &'r str,
            detail: &'r str,
            recent_events: Vec<CrashEvent>,
        }

        let report = Report {
            at: unix_ms(),
            reason,
            detail,
            recent_events: self.recent_global(),
        };
        let name = format!("crash-{}.json", report.at);
        let path = self.report_dir.join(name);
        if let Err(err) = std::fs::create_dir_all(&self.report_dir) {
            log::error!("crash report dir unavailable: {err}");
            return;
        }
        match serde_json::to_vec_pretty(&report) {
            Ok(body) => {
                if let Err(err) = std::fs::write(&path, body) {
                    log::error!("failed to write crash report {}: {err}", path.display());
                } else {
                    log::warn!("crash report written to {}", path.display());
                }
            }
            Err(err) => log::error!("failed to serialize crash report: {err}"),
        }
    }
}

fn push_ring(ring: &mut VecDeque<CrashEvent>, event: CrashEvent, capacity: usize) {
    while ring.len() >= capacity {
        ring.pop_front();
    }
    ring.push_back(event);
}

/// Route panics from any task into a report file. Tokio isolates task
/// panics, so the process stays up; this makes sure they leave a trace.
pub fn install_panic_hook(reporter: Arc<CrashReporter>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        reporter.write_report("panic", &info.to_string());
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ring_is_bounded() {
        let reporter = CrashReporter::new("/tmp/stardrift-test-reports");
        reporter.begin_session(1);
        for i in 0..(SESSION_RING_CAPACITY + 10) {
            reporter.record(Some(1), "test", format!("event {i}"));
        }
        let sessions = reporter.sessions.lock();
        assert_eq!(sessions.get(&1).unwrap().len(), SESSION_RING_CAPACITY);
    }

    #[test]
    fn global_ring_keeps_newest() {
        let reporter = CrashReporter::new("/tmp/stardrift-test-reports");
        for i in 0..(GLOBAL_RING_CAPACITY + 5) {
            reporter.record(None, "test", format!("event {i}"));
        }
        let events = reporter.recent_global();
        assert_eq!(events.len(), GLOBAL_RING_CAPACITY);
        assert!(events.last().unwrap().detail.ends_with("260"));
    }

    #[test]
    fn recording_to_unknown_session_still_hits_global() {
        let reporter = CrashReporter::new("/tmp/stardrift-test-reports");
        reporter.record(Some(99), "test", "orphan event");
        assert_eq!(reporter.recent_global().len(), 1);
    }
}
