use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const REVEAL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const URGENT_THRESHOLD_MS: i64 = 10_000;
pub const FEEDBACK_DURATION: Duration = Duration::from_secs(2);

/// A countdown that reached zero or jumped back up crossed a rotation boundary.
pub fn rotated(previous_ms: i64, current_ms: i64) -> bool {
    current_ms <= 0 || current_ms > previous_ms
}

pub fn whole_seconds(ms: i64) -> i64 {
    (ms.max(0) + 999) / 1000
}

#[derive(Debug, Clone)]
pub struct RevealState {
    pub uuid: String,
    pub code: Option<String>,
    pub remaining_ms: i64,
    last_input: Instant,
    feedback: Option<(String, Instant)>,
}

impl RevealState {
    pub fn new(uuid: String, code: Option<String>, remaining_ms: i64, now: Instant) -> Self {
        Self {
            uuid,
            code,
            remaining_ms,
            last_input: now,
            feedback: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_input = now;
    }

    pub fn idle_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_input) >= REVEAL_IDLE_TIMEOUT
    }

    pub fn urgent(&self) -> bool {
        self.remaining_ms < URGENT_THRESHOLD_MS
    }

    pub fn set_feedback(&mut self, text: String, now: Instant) {
        self.feedback = Some((text, now + FEEDBACK_DURATION));
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_ref().map(|(text, _)| text.as_str())
    }

    /// Drops feedback whose display time is over. Returns true if it did.
    pub fn expire_feedback(&mut self, now: Instant) -> bool {
        match &self.feedback {
            Some((_, until)) if now >= *until => {
                self.feedback = None;
                true
            }
            _ => false,
        }
    }

    /// Feeds one countdown sample. On rotation the code is taken from
    /// `codes`; returns true when something visible changed.
    pub fn observe(&mut self, remaining_ms: i64, codes: &HashMap<String, String>) -> bool {
        let mut changed = whole_seconds(remaining_ms) != whole_seconds(self.remaining_ms);
        if rotated(self.remaining_ms, remaining_ms) {
            let fresh = codes.get(&self.uuid).cloned();
            if fresh != self.code {
                self.code = fresh;
                changed = true;
            }
        }
        self.remaining_ms = remaining_ms;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(code: &str) -> HashMap<String, String> {
        HashMap::from([("u1".to_string(), code.to_string())])
    }

    #[test]
    fn rotation_is_detected_by_wraparound_or_zero() {
        assert!(!rotated(20_000, 19_000));
        assert!(rotated(500, 29_800));
        assert!(rotated(500, 0));
        assert!(!rotated(500, 500));
    }

    #[test]
    fn same_second_and_same_code_is_not_a_change() {
        let now = Instant::now();
        let mut state = RevealState::new("u1".into(), Some("111111".into()), 20_900, now);
        assert!(!state.observe(20_100, &codes("111111")));
        assert!(state.observe(19_900, &codes("111111")));
    }

    #[test]
    fn code_is_replaced_after_rotation() {
        let now = Instant::now();
        let mut state = RevealState::new("u1".into(), Some("111111".into()), 400, now);
        assert!(state.observe(29_600, &codes("222222")));
        assert_eq!(state.code.as_deref(), Some("222222"));
        assert!(!state.urgent());
    }

    #[test]
    fn unchanged_code_is_kept_without_rotation() {
        let now = Instant::now();
        let mut state = RevealState::new("u1".into(), Some("111111".into()), 15_000, now);
        state.observe(14_000, &codes("999999"));
        assert_eq!(state.code.as_deref(), Some("111111"));
    }

    #[test]
    fn idle_timeout_and_touch() {
        let start = Instant::now();
        let mut state = RevealState::new("u1".into(), None, 30_000, start);
        assert!(!state.idle_expired(start + Duration::from_secs(59)));
        state.touch(start + Duration::from_secs(30));
        assert!(!state.idle_expired(start + Duration::from_secs(89)));
        assert!(state.idle_expired(start + Duration::from_secs(90)));
    }

    #[test]
    fn feedback_expires_after_display_time() {
        let start = Instant::now();
        let mut state = RevealState::new("u1".into(), None, 30_000, start);
        state.set_feedback("OTP copied to clipboard!".into(), start);
        assert!(!state.expire_feedback(start + Duration::from_millis(1_999)));
        assert_eq!(state.feedback(), Some("OTP copied to clipboard!"));
        assert!(state.expire_feedback(start + FEEDBACK_DURATION));
        assert_eq!(state.feedback(), None);
    }

    #[test]
    fn urgency_threshold() {
        let now = Instant::now();
        let mut state = RevealState::new("u1".into(), None, 10_000, now);
        assert!(!state.urgent());
        state.observe(9_999, &HashMap::new());
        assert!(state.urgent());
    }
}
