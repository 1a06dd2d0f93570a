//! Client side brute-force guard for the login form.
//!
//! Failed attempts and the lockout expiry live in local storage so they survive
//! reloads and are shared between tabs (last write wins). This only slows down an
//! honest client; the auth provider must enforce its own limits.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::TimelineError;

/// String key/value storage that outlives the page, e.g. `window.localStorage`.
pub trait LocalStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-process [`LocalStore`], used by the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

impl<S: LocalStore + ?Sized> LocalStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) {
        (**self).set(key, value);
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key);
    }
}

/// Thresholds, lockout lengths and storage keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitPolicy {
    pub attempts_key: String,
    pub lockout_key: String,
    /// From this many failures on, the error message shows the count.
    pub warn_threshold: u32,
    pub soft_threshold: u32,
    pub hard_threshold: u32,
    pub soft_lockout_secs: i64,
    pub hard_lockout_secs: i64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            attempts_key: "login_attempts".to_string(),
            lockout_key: "login_lockout_until".to_string(),
            warn_threshold: 3,
            soft_threshold: 5,
            hard_threshold: 10,
            soft_lockout_secs: 30,
            hard_lockout_secs: 5 * 60,
        }
    }
}

impl RateLimitPolicy {
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.attempts_key.is_empty() || self.lockout_key.is_empty() {
            return Err(TimelineError::InvalidConfig(
                "rate limit storage keys must not be empty".to_string(),
            ));
        }
        if !(self.warn_threshold <= self.soft_threshold && self.soft_threshold < self.hard_threshold)
        {
            return Err(TimelineError::InvalidConfig(format!(
                "rate limit thresholds must satisfy warn <= soft < hard ({} / {} / {})",
                self.warn_threshold, self.soft_threshold, self.hard_threshold
            )));
        }
        if self.soft_lockout_secs <= 0 || self.hard_lockout_secs <= 0 {
            return Err(TimelineError::InvalidConfig(
                "lockout durations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the login form stands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Normal,
    /// Failed often enough to show the count, not yet locked.
    Warned,
    SoftLocked,
    HardLocked,
}

impl GuardState {
    pub fn allows_submit(self) -> bool {
        matches!(self, GuardState::Normal | GuardState::Warned)
    }
}

/// An active lockout window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lockout {
    pub until: DateTime<Utc>,
    pub attempts: u32,
    pub hard: bool,
}

impl Lockout {
    pub fn state(&self) -> GuardState {
        if self.hard {
            GuardState::HardLocked
        } else {
            GuardState::SoftLocked
        }
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.until - now).max(Duration::zero())
    }

    /// Message shown when the page is reopened during a lockout.
    pub fn reload_message(&self, now: DateTime<Utc>) -> String {
        if self.hard {
            let minutes = (self.remaining(now).num_milliseconds() + 59_999) / 60_000;
            format!(
                "Too many failed attempts. Please wait {minutes} minute(s) before trying again."
            )
        } else {
            "Multiple failed attempts. Please wait before trying again.".to_string()
        }
    }
}

/// Result of one countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Countdown {
    Running { label: String, seconds_left: i64 },
    Expired,
}

/// What the form should show after a rejected login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureOutcome {
    pub attempts: u32,
    pub state: GuardState,
    pub lockout: Option<Lockout>,
    pub message: String,
}

/// Failed-login counter and lockout window over a [`LocalStore`].
#[derive(Debug, Clone)]
pub struct LoginGuard<S> {
    store: S,
    policy: RateLimitPolicy,
}

impl<S: LocalStore> LoginGuard<S> {
    pub fn new(store: S, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persisted failure count; unreadable values count as zero.
    pub fn attempts(&self) -> u32 {
        self.store
            .get(&self.policy.attempts_key)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    fn stored_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.store.get(&self.policy.lockout_key)?;
        let millis: i64 = raw.trim().parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    /// Current lockout, clearing the stored expiry once it has passed.
    pub fn active_lockout(&mut self, now: DateTime<Utc>) -> Option<Lockout> {
        let until = match self.stored_expiry() {
            Some(until) => until,
            None => {
                if self.store.get(&self.policy.lockout_key).is_some() {
                    self.store.remove(&self.policy.lockout_key);
                }
                return None;
            }
        };
        if now >= until {
            debug!(%until, "login lockout expired");
            self.store.remove(&self.policy.lockout_key);
            return None;
        }
        let attempts = self.attempts();
        Some(Lockout {
            until,
            attempts,
            hard: attempts >= self.policy.hard_threshold,
        })
    }

    pub fn state(&mut self, now: DateTime<Utc>) -> GuardState {
        self.active_lockout(now)
            .map_or(GuardState::Normal, |lockout| lockout.state())
    }

    /// Gate run before contacting the auth provider.
    pub fn check(&mut self, now: DateTime<Utc>) -> Result<(), Lockout> {
        match self.active_lockout(now) {
            Some(lockout) => Err(lockout),
            None => Ok(()),
        }
    }

    /// Counts one rejected login and arms a lockout when a threshold is reached.
    ///
    /// `provider_message` is the mapped auth error; lockout messages replace it.
    pub fn record_failure(&mut self, now: DateTime<Utc>, provider_message: &str) -> FailureOutcome {
        let attempts = self.attempts().saturating_add(1);
        self.store
            .set(&self.policy.attempts_key, &attempts.to_string());

        let policy = &self.policy;
        let (state, duration, message) = if attempts >= policy.hard_threshold {
            (
                GuardState::HardLocked,
                Some(Duration::seconds(policy.hard_lockout_secs)),
                format!(
                    "Too many failed login attempts ({attempts}). Account locked for {} for security.",
                    describe_duration(policy.hard_lockout_secs)
                ),
            )
        } else if attempts >= policy.soft_threshold {
            (
                GuardState::SoftLocked,
                Some(Duration::seconds(policy.soft_lockout_secs)),
                format!(
                    "Multiple failed attempts ({attempts}). Please wait {} before trying again.",
                    describe_duration(policy.soft_lockout_secs)
                ),
            )
        } else if attempts >= policy.warn_threshold {
            (
                GuardState::Warned,
                None,
                format!("{provider_message} ({attempts} failed attempts)"),
            )
        } else {
            (GuardState::Normal, None, provider_message.to_string())
        };

        let lockout = duration.map(|duration| {
            let until = now + duration;
            self.store
                .set(&self.policy.lockout_key, &until.timestamp_millis().to_string());
            info!(attempts, %until, ?state, "login locked out");
            Lockout {
                until,
                attempts,
                hard: state == GuardState::HardLocked,
            }
        });

        FailureOutcome {
            attempts,
            state,
            lockout,
            message,
        }
    }

    /// Successful login: forget every failure.
    pub fn record_success(&mut self) {
        self.store.remove(&self.policy.attempts_key);
        self.store.remove(&self.policy.lockout_key);
    }

    /// Lockout still running after a reload, if any.
    pub fn restore(&mut self, now: DateTime<Utc>) -> Option<Lockout> {
        let lockout = self.active_lockout(now)?;
        info!(until = %lockout.until, attempts = lockout.attempts, "restored login lockout");
        Some(lockout)
    }

    /// Once-per-second countdown; clears the lockout when it reaches zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Countdown {
        match self.active_lockout(now) {
            Some(lockout) => {
                let seconds_left = (lockout.remaining(now).num_milliseconds() + 999) / 1000;
                Countdown::Running {
                    label: countdown_label(seconds_left),
                    seconds_left,
                }
            }
            None => Countdown::Expired,
        }
    }
}

/// "Locked (4:05)" or "Locked (12s)".
pub fn countdown_label(seconds_left: i64) -> String {
    let minutes = seconds_left / 60;
    let seconds = seconds_left % 60;
    if minutes > 0 {
        format!("Locked ({minutes}:{seconds:02})")
    } else {
        format!("Locked ({seconds}s)")
    }
}

fn describe_duration(secs: i64) -> String {
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        format!("{minutes} minute{}", if minutes == 1 { "" } else { "s" })
    } else {
        format!("{secs} seconds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn guard() -> LoginGuard<MemoryStore> {
        LoginGuard::new(MemoryStore::default(), RateLimitPolicy::default())
    }

    #[test]
    fn four_failures_stay_unlocked() {
        let mut guard = guard();
        let now = start();
        let mut last = None;
        for _ in 0..4 {
            last = Some(guard.record_failure(now, "Incorrect password. Please try again."));
        }
        let last = last.unwrap();
        assert_eq!(last.state, GuardState::Warned);
        assert_eq!(
            last.message,
            "Incorrect password. Please try again. (4 failed attempts)"
        );
        assert_eq!(guard.state(now), GuardState::Normal);
        assert!(guard.check(now).is_ok());
    }

    #[test]
    fn fifth_failure_soft_locks_then_expires() {
        let mut guard = guard();
        let now = start();
        for _ in 0..4 {
            guard.record_failure(now, "x");
        }
        let fifth = guard.record_failure(now, "x");
        assert_eq!(fifth.state, GuardState::SoftLocked);
        let lockout = fifth.lockout.unwrap();
        assert_eq!(lockout.until - now, Duration::seconds(30));
        assert_eq!(
            fifth.message,
            "Multiple failed attempts (5). Please wait 30 seconds before trying again."
        );
        assert!(guard.check(now + Duration::seconds(29)).is_err());

        let later = now + Duration::seconds(31);
        assert_eq!(guard.tick(later), Countdown::Expired);
        assert_eq!(guard.state(later), GuardState::Normal);
        assert_eq!(guard.attempts(), 5);
    }

    #[test]
    fn tenth_failure_hard_locks_for_five_minutes() {
        let mut guard = guard();
        let mut now = start();
        for _ in 0..9 {
            // Wait out each soft lockout as a user would.
            now += Duration::seconds(31);
            guard.record_failure(now, "x");
        }
        now += Duration::seconds(31);
        let tenth = guard.record_failure(now, "x");
        assert_eq!(tenth.state, GuardState::HardLocked);
        assert_eq!(tenth.lockout.unwrap().until - now, Duration::minutes(5));
        assert!(tenth.message.contains("locked for 5 minutes"));
        assert_eq!(guard.state(now + Duration::minutes(4)), GuardState::HardLocked);
    }

    #[test]
    fn success_clears_everything() {
        let mut guard = guard();
        let now = start();
        for _ in 0..5 {
            guard.record_failure(now, "x");
        }
        guard.record_success();
        assert_eq!(guard.attempts(), 0);
        assert_eq!(guard.state(now), GuardState::Normal);
    }

    #[test]
    fn lockout_survives_reload() {
        let mut guard = guard();
        let now = start();
        for _ in 0..10 {
            guard.record_failure(now, "x");
        }
        let store = guard.into_store();

        let mut reloaded = LoginGuard::new(store, RateLimitPolicy::default());
        let lockout = reloaded.restore(now + Duration::seconds(90)).unwrap();
        assert!(lockout.hard);
        assert_eq!(
            lockout.reload_message(now + Duration::seconds(90)),
            "Too many failed attempts. Please wait 4 minute(s) before trying again."
        );
    }

    #[test]
    fn countdown_formats_minutes_and_seconds() {
        let mut guard = guard();
        let now = start();
        for _ in 0..10 {
            guard.record_failure(now, "x");
        }
        match guard.tick(now + Duration::milliseconds(55_500)) {
            Countdown::Running { label, seconds_left } => {
                assert_eq!(seconds_left, 245);
                assert_eq!(label, "Locked (4:05)");
            }
            Countdown::Expired => panic!("lockout ended early"),
        }
        assert_eq!(countdown_label(12), "Locked (12s)");
    }

    #[test]
    fn garbage_in_storage_reads_as_unlocked() {
        let mut store = MemoryStore::default();
        store.set("login_attempts", "many");
        store.set("login_lockout_until", "soon");
        let mut guard = LoginGuard::new(&mut store, RateLimitPolicy::default());
        assert_eq!(guard.attempts(), 0);
        assert_eq!(guard.state(start()), GuardState::Normal);
        assert_eq!(store.get("login_lockout_until"), None);
    }

    #[test]
    fn policy_rejects_inverted_thresholds() {
        let policy = RateLimitPolicy {
            soft_threshold: 12,
            ..RateLimitPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
