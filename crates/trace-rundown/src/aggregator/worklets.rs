//! Auction worklet lifecycle pairing.
//!
//! A worklet announces itself with "running in process" and "done with
//! process" events sharing a `target` token. The pid on those events is the
//! emitting process; the worklet's own process is in `args.data.pid`. Each
//! worklet process has two named threads (a utility "control" thread and the
//! v8 helper thread running the worklet) found via `thread_name` metadata.
//!
//! A capture window may hold only one half of the pair, so either half alone
//! is enough to emit a worklet. Without both named threads the worklet cannot
//! be placed and is dropped.

use super::index::KeyedCorrelationIndex;
use crate::parser::schema::{ThreadDescriptor, WorkletLifecycle, WorkletProcessEvent, WorkletType};
use crate::utils::config::EngineConfig;
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Running,
    Done,
}

/// Buffers worklet halves and thread names until the stream is exhausted
#[derive(Debug, Clone)]
pub struct WorkletTracker {
    utility_thread_name: String,
    v8_helper_thread_name: String,
    utility_threads: KeyedCorrelationIndex<u64, ThreadDescriptor>,
    v8_helper_threads: KeyedCorrelationIndex<u64, ThreadDescriptor>,
    running: Vec<WorkletProcessEvent>,
    done: Vec<WorkletProcessEvent>,
}

impl WorkletTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            utility_thread_name: config.utility_thread_name.clone(),
            v8_helper_thread_name: config.v8_helper_thread_name.clone(),
            utility_threads: KeyedCorrelationIndex::new(),
            v8_helper_threads: KeyedCorrelationIndex::new(),
            running: Vec::new(),
            done: Vec::new(),
        }
    }

    /// Keep a thread name if it is one of the two worklet thread names
    ///
    /// # Returns
    /// `true` if the thread was recorded
    pub fn record_thread_name(&mut self, thread: ThreadDescriptor) -> bool {
        if thread.name == self.utility_thread_name {
            self.utility_threads.set(thread.pid, thread);
            true
        } else if thread.name == self.v8_helper_thread_name {
            self.v8_helper_threads.set(thread.pid, thread);
            true
        } else {
            false
        }
    }

    pub fn record_running(&mut self, event: WorkletProcessEvent) {
        self.running.push(event);
    }

    pub fn record_done(&mut self, event: WorkletProcessEvent) {
        self.done.push(event);
    }

    pub fn pending_events(&self) -> usize {
        self.running.len() + self.done.len()
    }

    /// Pair the buffered halves into worklets
    ///
    /// "Running" halves are visited before "done" halves, each in arrival
    /// order; the half that creates a worklet supplies its base fields.
    pub fn pair(&self) -> Vec<WorkletLifecycle> {
        let mut worklets: Vec<WorkletLifecycle> = Vec::new();
        let mut by_target: HashMap<&str, usize> = HashMap::new();
        let mut dropped = 0usize;

        let halves = self
            .running
            .iter()
            .map(|e| (Half::Running, e))
            .chain(self.done.iter().map(|e| (Half::Done, e)));

        for (half, event) in halves {
            let pid = event.data.pid;
            let (Some(utility_thread), Some(v8_helper_thread)) =
                (self.utility_threads.get(&pid), self.v8_helper_threads.get(&pid))
            else {
                // The trace is incomplete and the worklet cannot be placed
                dropped += 1;
                continue;
            };

            if let Some(&position) = by_target.get(event.data.target.as_str()) {
                set_half(&mut worklets[position], half, event);
                continue;
            }

            let mut worklet = WorkletLifecycle {
                cat: event.cat.clone(),
                tid: event.tid,
                ts: event.ts,
                pid,
                host: event.data.host.clone(),
                target: event.data.target.clone(),
                worklet_type: event
                    .data
                    .worklet_type
                    .parse()
                    .unwrap_or(WorkletType::Unknown),
                running_in_process_event: None,
                done_with_process_event: None,
                utility_thread: utility_thread.clone(),
                v8_helper_thread: v8_helper_thread.clone(),
            };
            set_half(&mut worklet, half, event);

            by_target.insert(event.data.target.as_str(), worklets.len());
            worklets.push(worklet);
        }

        if dropped > 0 {
            debug!(
                "Dropped {} worklet events without named utility and v8 helper threads",
                dropped
            );
        }

        worklets
    }

    pub fn clear(&mut self) {
        self.utility_threads.clear();
        self.v8_helper_threads.clear();
        self.running.clear();
        self.done.clear();
    }
}

fn set_half(worklet: &mut WorkletLifecycle, half: Half, event: &WorkletProcessEvent) {
    match half {
        Half::Running => worklet.running_in_process_event = Some(event.clone()),
        Half::Done => worklet.done_with_process_event = Some(event.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::WorkletProcessData;

    fn process_event(target: &str, pid: u64, ts: f64) -> WorkletProcessEvent {
        WorkletProcessEvent {
            cat: "fledge".to_string(),
            pid: 1,
            tid: 2,
            ts,
            data: WorkletProcessData {
                host: "https://ads.example".to_string(),
                pid,
                target: target.to_string(),
                worklet_type: "seller".to_string(),
            },
        }
    }

    fn thread(pid: u64, tid: u64, name: &str) -> ThreadDescriptor {
        ThreadDescriptor {
            pid,
            tid,
            name: name.to_string(),
        }
    }

    fn tracker_with_threads(pid: u64) -> WorkletTracker {
        let config = EngineConfig::default();
        let mut tracker = WorkletTracker::new(&config);
        assert!(tracker.record_thread_name(thread(pid, 1, &config.utility_thread_name)));
        assert!(tracker.record_thread_name(thread(pid, 2, &config.v8_helper_thread_name)));
        tracker
    }

    #[test]
    fn test_unrelated_thread_names_are_ignored() {
        let mut tracker = WorkletTracker::new(&EngineConfig::default());
        assert!(!tracker.record_thread_name(thread(1, 1, "CrRendererMain")));
    }

    #[test]
    fn test_done_only_worklet_is_emitted() {
        let mut tracker = tracker_with_threads(50);
        tracker.record_done(process_event("tok", 50, 9.0));

        let worklets = tracker.pair();
        assert_eq!(worklets.len(), 1);
        assert!(worklets[0].running_in_process_event.is_none());
        assert!(worklets[0].done_with_process_event.is_some());
        assert_eq!(worklets[0].worklet_type, WorkletType::Seller);
        assert_eq!(worklets[0].ts, 9.0);
    }

    #[test]
    fn test_base_fields_come_from_running_half() {
        let mut tracker = tracker_with_threads(50);
        tracker.record_done(process_event("tok", 50, 9.0));
        tracker.record_running(process_event("tok", 50, 3.0));

        let worklets = tracker.pair();
        assert_eq!(worklets.len(), 1);
        assert_eq!(worklets[0].ts, 3.0);
        assert_eq!(worklets[0].pid, 50);
        assert_eq!(worklets[0].utility_thread.tid, 1);
        assert_eq!(worklets[0].v8_helper_thread.tid, 2);
    }

    #[test]
    fn test_second_running_half_updates_in_place() {
        let mut tracker = tracker_with_threads(50);
        tracker.record_running(process_event("tok", 50, 3.0));
        tracker.record_done(process_event("tok", 50, 9.0));
        tracker.record_running(process_event("tok", 50, 4.0));

        let worklets = tracker.pair();
        assert_eq!(worklets.len(), 1);
        assert_eq!(worklets[0].running_in_process_event.as_ref().unwrap().ts, 4.0);
        assert_eq!(worklets[0].done_with_process_event.as_ref().unwrap().ts, 9.0);
    }

    #[test]
    fn test_missing_helper_thread_drops_worklet() {
        let config = EngineConfig::default();
        let mut tracker = WorkletTracker::new(&config);
        tracker.record_thread_name(thread(50, 1, &config.utility_thread_name));
        tracker.record_running(process_event("tok", 50, 3.0));

        assert!(tracker.pair().is_empty());
        assert_eq!(tracker.pending_events(), 1);
    }
}
