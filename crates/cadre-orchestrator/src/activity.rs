use crate::types::{ActivityKind, AgentActivity, AgentId};
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::broadcast;

const DEFAULT_HISTORY: usize = 100;
const DEFAULT_WORKING_WINDOW_SECS: u64 = 30;
const CHANNEL_CAPACITY: usize = 256;

/// Per-agent outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    /// Steps that finished with output.
    pub completed: u32,
    /// Steps that failed.
    pub failed: u32,
}

#[derive(Default)]
struct AgentLog {
    events: VecDeque<AgentActivity>,
    stats: AgentStats,
}

/// Append-only activity log per agent with a broadcast feed.
///
/// Purely observational; nothing in scheduling reads from it.
pub struct ActivityTracker {
    logs: Mutex<HashMap<AgentId, AgentLog>>,
    history: usize,
    working_window: Duration,
    tx: broadcast::Sender<AgentActivity>,
}

impl ActivityTracker {
    /// Tracker with the default history cap and working window.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_HISTORY, DEFAULT_WORKING_WINDOW_SECS)
    }

    /// `history` events are kept per agent; an agent counts as working for
    /// `working_window_secs` after a non-terminal event. Windows too large
    /// to represent saturate.
    pub fn with_limits(history: usize, working_window_secs: u64) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            logs: Mutex::new(HashMap::new()),
            history: history.max(1),
            working_window: window(working_window_secs),
            tx,
        }
    }

    /// Record an activity, evicting the agent's oldest entry past the cap.
    pub fn log(&self, activity: AgentActivity) {
        {
            let mut logs = self.logs.lock();
            let log = logs.entry(activity.agent_id.clone()).or_default();
            match activity.kind {
                ActivityKind::Completed => log.stats.completed += 1,
                ActivityKind::Failed => log.stats.failed += 1,
                _ => {}
            }
            log.events.push_back(activity.clone());
            while log.events.len() > self.history {
                log.events.pop_front();
            }
        }
        // No subscribers is fine.
        let _ = self.tx.send(activity);
    }

    /// Live feed of every logged activity. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentActivity> {
        self.tx.subscribe()
    }

    /// Number of live feed receivers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Most recent activities of one agent, newest first.
    pub fn agent_activities(&self, agent_id: &str, limit: usize) -> Vec<AgentActivity> {
        let logs = self.logs.lock();
        logs.get(agent_id)
            .map(|log| log.events.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent activities across all agents, newest first.
    pub fn recent_activities(&self, limit: usize) -> Vec<AgentActivity> {
        let logs = self.logs.lock();
        let mut all: Vec<AgentActivity> = logs
            .values()
            .flat_map(|log| log.events.iter().cloned())
            .collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit);
        all
    }

    /// Whether the agent's latest activity is non-terminal and recent.
    pub fn is_agent_working(&self, agent_id: &str) -> bool {
        let logs = self.logs.lock();
        let Some(last) = logs.get(agent_id).and_then(|log| log.events.back()) else {
            return false;
        };
        !last.kind.is_terminal() && Utc::now() - last.timestamp <= self.working_window
    }

    /// Outcome counters; these survive history eviction.
    pub fn agent_stats(&self, agent_id: &str) -> AgentStats {
        let logs = self.logs.lock();
        logs.get(agent_id).map(|log| log.stats).unwrap_or_default()
    }

    /// Forget an agent's history and counters.
    pub fn clear_agent(&self, agent_id: &str) {
        self.logs.lock().remove(agent_id);
    }
}

/// Seconds to a window, saturating at the largest representable span.
fn window(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn activity(agent: &str, kind: ActivityKind, msg: &str) -> AgentActivity {
        AgentActivity::new(agent, Uuid::new_v4(), kind, msg)
    }

    #[test]
    fn test_history_is_capped_fifo() {
        let tracker = ActivityTracker::with_limits(3, 30);
        for i in 0..5 {
            tracker.log(activity("writer", ActivityKind::Progress, &format!("tick {i}")));
        }
        let events = tracker.agent_activities("writer", 10);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].message, "tick 4");
        assert_eq!(events[2].message, "tick 2");
    }

    #[test]
    fn test_agent_activities_limit_and_isolation() {
        let tracker = ActivityTracker::new();
        tracker.log(activity("a", ActivityKind::Started, "a1"));
        tracker.log(activity("a", ActivityKind::Thinking, "a2"));
        tracker.log(activity("b", ActivityKind::Started, "b1"));
        assert_eq!(tracker.agent_activities("a", 1)[0].message, "a2");
        assert_eq!(tracker.agent_activities("b", 10).len(), 1);
        assert!(tracker.agent_activities("c", 10).is_empty());
    }

    #[test]
    fn test_working_heuristic() {
        let tracker = ActivityTracker::new();
        assert!(!tracker.is_agent_working("a"));
        tracker.log(activity("a", ActivityKind::Executing, "calling"));
        assert!(tracker.is_agent_working("a"));
        tracker.log(activity("a", ActivityKind::Completed, "done"));
        assert!(!tracker.is_agent_working("a"));
    }

    #[test]
    fn test_stale_activity_is_not_working() {
        let tracker = ActivityTracker::with_limits(10, 30);
        let mut stale = activity("a", ActivityKind::Thinking, "old");
        stale.timestamp = Utc::now() - Duration::seconds(120);
        tracker.log(stale);
        assert!(!tracker.is_agent_working("a"));
    }

    #[test]
    fn test_oversized_window_saturates() {
        let tracker = ActivityTracker::with_limits(10, 10_000_000_000_000_000);
        let mut old = activity("a", ActivityKind::Thinking, "long ago");
        old.timestamp = Utc::now() - Duration::days(365);
        tracker.log(old);
        assert!(tracker.is_agent_working("a"));

        let tracker = ActivityTracker::with_limits(10, u64::MAX);
        tracker.log(activity("b", ActivityKind::Executing, "now"));
        assert!(tracker.is_agent_working("b"));
    }

    #[test]
    fn test_stats_count_outcomes() {
        let tracker = ActivityTracker::with_limits(1, 30);
        tracker.log(activity("a", ActivityKind::Completed, "ok"));
        tracker.log(activity("a", ActivityKind::Failed, "err"));
        tracker.log(activity("a", ActivityKind::Completed, "ok"));
        // counters survive eviction
        assert_eq!(
            tracker.agent_stats("a"),
            AgentStats {
                completed: 2,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_subscribe_receives_and_drop_unsubscribes() {
        let tracker = ActivityTracker::new();
        let mut rx = tracker.subscribe();
        assert_eq!(tracker.subscriber_count(), 1);
        tracker.log(activity("a", ActivityKind::Started, "go"));
        let got = rx.recv().await.unwrap();
        assert_eq!(got.message, "go");
        drop(rx);
        assert_eq!(tracker.subscriber_count(), 0);
        tracker.log(activity("a", ActivityKind::Completed, "no listeners"));
    }

    #[test]
    fn test_recent_activities_across_agents() {
        let tracker = ActivityTracker::new();
        tracker.log(activity("a", ActivityKind::Started, "first"));
        tracker.log(activity("b", ActivityKind::Started, "second"));
        let recent = tracker.recent_activities(5);
        assert_eq!(recent.len(), 2);
        tracker.clear_agent("a");
        assert_eq!(tracker.recent_activities(5).len(), 1);
    }
}
