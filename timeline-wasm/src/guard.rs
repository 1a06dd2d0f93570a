//! Login brute-force guard exposed to the login page.

use chrono::{DateTime, Utc};
use serde::Serialize;
use timeline_core::rate_limit::{self, Countdown, GuardState, Lockout};
use timeline_core::{AuthFailure, RateLimitPolicy};
use wasm_bindgen::prelude::*;

use crate::read_config;

#[cfg(target_arch = "wasm32")]
mod browser {
    use timeline_core::LocalStore;
    use wasm_bindgen::JsValue;
    use web_sys::{console, Storage};

    /// `window.localStorage`. Write failures (quota, private mode) are logged only.
    pub struct BrowserStorage(pub Storage);

    impl BrowserStorage {
        pub fn open() -> Result<Self, JsValue> {
            let window = web_sys::window().ok_or_else(|| JsValue::from_str("Không có window"))?;
            let storage = window
                .local_storage()?
                .ok_or_else(|| JsValue::from_str("localStorage không khả dụng"))?;
            Ok(Self(storage))
        }
    }

    impl LocalStore for BrowserStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get_item(key).ok().flatten()
        }

        fn set(&mut self, key: &str, value: &str) {
            if let Err(err) = self.0.set_item(key, value) {
                console::error_1(&err);
            }
        }

        fn remove(&mut self, key: &str) {
            if let Err(err) = self.0.remove_item(key) {
                console::error_1(&err);
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
type PageStore = browser::BrowserStorage;

#[cfg(not(target_arch = "wasm32"))]
type PageStore = timeline_core::MemoryStore;

#[cfg(target_arch = "wasm32")]
fn open_store() -> Result<PageStore, JsValue> {
    browser::BrowserStorage::open()
}

#[cfg(not(target_arch = "wasm32"))]
fn open_store() -> Result<PageStore, JsValue> {
    Ok(PageStore::default())
}

/// What the login button and error line should show.
#[derive(Debug, Serialize, PartialEq)]
struct GuardView {
    state: GuardState,
    allowed: bool,
    attempts: u32,
    /// Button label, e.g. "Locked (0:27)"; absent when unlocked.
    label: Option<String>,
    message: Option<String>,
    /// Epoch milliseconds when the lockout ends.
    locked_until: Option<i64>,
}

#[wasm_bindgen]
pub struct LoginGuard {
    inner: rate_limit::LoginGuard<PageStore>,
}

#[wasm_bindgen]
impl LoginGuard {
    /// `config` is the same partial config the other exports take; only its
    /// `rate_limit` section matters here.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<JsValue>) -> Result<LoginGuard, JsValue> {
        let cfg = read_config(config)?;
        Ok(Self::with_store(open_store()?, cfg.rate_limit))
    }

    /// Page load: rebuilds a lockout that was running before the reload.
    pub fn restore(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.restore_view(Utc::now()))
    }

    /// Call before contacting the auth provider; `allowed: false` means stop.
    pub fn check(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.check_view(Utc::now()))
    }

    /// Records a rejected login given the provider's error code.
    pub fn record_failure(&mut self, code: &str) -> Result<JsValue, JsValue> {
        to_js(&self.failure_view(Utc::now(), code))
    }

    pub fn record_success(&mut self) {
        self.inner.record_success();
    }

    /// Once per second while locked. `label` is `None` once the lockout is over.
    pub fn tick(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.tick_view(Utc::now()))
    }
}

impl LoginGuard {
    fn with_store(store: PageStore, policy: RateLimitPolicy) -> Self {
        Self {
            inner: rate_limit::LoginGuard::new(store, policy),
        }
    }

    fn restore_view(&mut self, now: DateTime<Utc>) -> GuardView {
        match self.inner.restore(now) {
            Some(lockout) => GuardView {
                message: Some(lockout.reload_message(now)),
                ..locked_view(&lockout, now)
            },
            None => self.idle_view(),
        }
    }

    fn check_view(&mut self, now: DateTime<Utc>) -> GuardView {
        match self.inner.check(now) {
            Ok(()) => self.idle_view(),
            Err(lockout) => locked_view(&lockout, now),
        }
    }

    fn failure_view(&mut self, now: DateTime<Utc>, code: &str) -> GuardView {
        let failure = AuthFailure::from_code(code);
        let outcome = self.inner.record_failure(now, &failure.to_string());
        GuardView {
            state: outcome.state,
            allowed: outcome.state.allows_submit(),
            attempts: outcome.attempts,
            label: outcome.lockout.map(|lockout| seconds_label(&lockout, now)),
            message: Some(outcome.message),
            locked_until: outcome.lockout.map(|lockout| lockout.until.timestamp_millis()),
        }
    }

    fn tick_view(&mut self, now: DateTime<Utc>) -> GuardView {
        match self.inner.tick(now) {
            Countdown::Running { label, .. } => match self.inner.active_lockout(now) {
                Some(lockout) => GuardView {
                    label: Some(label),
                    ..locked_view(&lockout, now)
                },
                None => self.idle_view(),
            },
            Countdown::Expired => self.idle_view(),
        }
    }

    fn idle_view(&self) -> GuardView {
        GuardView {
            state: GuardState::Normal,
            allowed: true,
            attempts: self.inner.attempts(),
            label: None,
            message: None,
            locked_until: None,
        }
    }
}

fn locked_view(lockout: &Lockout, now: DateTime<Utc>) -> GuardView {
    GuardView {
        state: lockout.state(),
        allowed: false,
        attempts: lockout.attempts,
        label: Some(seconds_label(lockout, now)),
        message: None,
        locked_until: Some(lockout.until.timestamp_millis()),
    }
}

fn seconds_label(lockout: &Lockout, now: DateTime<Utc>) -> String {
    rate_limit::countdown_label((lockout.remaining(now).num_milliseconds() + 999) / 1000)
}

fn to_js(view: &GuardView) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(view)
        .map_err(|err| JsValue::from_str(&format!("Không serialize trạng thái: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn guard() -> LoginGuard {
        LoginGuard::with_store(PageStore::default(), RateLimitPolicy::default())
    }

    fn fail(guard: &mut LoginGuard, times: u32, now: DateTime<Utc>) -> GuardView {
        let mut last = guard.idle_view();
        for _ in 0..times {
            last = guard.failure_view(now, "auth/wrong-password");
        }
        last
    }

    #[test]
    fn idle_view_reports_stored_attempts() {
        let mut guard = guard();
        fail(&mut guard, 1, start());
        let view = guard.idle_view();
        assert_eq!(view.attempts, 1);
        assert!(view.allowed);
        assert_eq!(view.state, GuardState::Normal);
    }

    #[test]
    fn warned_failures_still_allow_submitting() {
        let mut guard = guard();
        let third = fail(&mut guard, 3, start());
        assert_eq!(third.state, GuardState::Warned);
        assert!(third.allowed);
        assert_eq!(third.label, None);
        assert_eq!(third.locked_until, None);
        assert!(third.message.unwrap().contains("(3 failed attempts)"));
        assert!(guard.check_view(start()).allowed);
    }

    #[test]
    fn fifth_failure_locks_and_ticks_down() {
        let mut guard = guard();
        let now = start();
        let fifth = fail(&mut guard, 5, now);
        assert_eq!(fifth.state, GuardState::SoftLocked);
        assert!(!fifth.allowed);
        assert_eq!(fifth.label.as_deref(), Some("Locked (30s)"));
        assert_eq!(
            fifth.locked_until,
            Some((now + Duration::seconds(30)).timestamp_millis())
        );

        let blocked = guard.check_view(now + Duration::seconds(1));
        assert!(!blocked.allowed);
        assert_eq!(blocked.state, GuardState::SoftLocked);

        let tick = guard.tick_view(now + Duration::seconds(18));
        assert_eq!(tick.state, GuardState::SoftLocked);
        assert!(!tick.allowed);
        assert_eq!(tick.label.as_deref(), Some("Locked (12s)"));

        let expired = guard.tick_view(now + Duration::seconds(31));
        assert_eq!(expired.state, GuardState::Normal);
        assert!(expired.allowed);
        assert_eq!(expired.label, None);
        assert_eq!(expired.attempts, 5);
    }

    #[test]
    fn tenth_failure_hard_locks_and_survives_a_reload() {
        let mut guard = guard();
        let now = start();
        let tenth = fail(&mut guard, 10, now);
        assert_eq!(tenth.state, GuardState::HardLocked);
        assert!(!tenth.allowed);
        assert_eq!(tenth.label.as_deref(), Some("Locked (5:00)"));

        let tick = guard.tick_view(now + Duration::seconds(55));
        assert_eq!(tick.state, GuardState::HardLocked);
        assert_eq!(tick.label.as_deref(), Some("Locked (4:05)"));

        let store = guard.inner.into_store();
        let mut reloaded = LoginGuard::with_store(store, RateLimitPolicy::default());
        let restored = reloaded.restore_view(now + Duration::seconds(90));
        assert_eq!(restored.state, GuardState::HardLocked);
        assert!(!restored.allowed);
        assert_eq!(restored.attempts, 10);
        assert_eq!(restored.label.as_deref(), Some("Locked (3:30)"));
        assert_eq!(
            restored.message.as_deref(),
            Some("Too many failed attempts. Please wait 4 minute(s) before trying again.")
        );
    }

    #[test]
    fn configured_policy_drives_the_thresholds() {
        let policy = RateLimitPolicy {
            soft_threshold: 2,
            soft_lockout_secs: 90,
            warn_threshold: 1,
            ..RateLimitPolicy::default()
        };
        let mut guard = LoginGuard::with_store(PageStore::default(), policy);
        let second = fail(&mut guard, 2, start());
        assert_eq!(second.state, GuardState::SoftLocked);
        assert_eq!(second.label.as_deref(), Some("Locked (1:30)"));
    }

    #[test]
    fn success_clears_the_lockout() {
        let mut guard = guard();
        fail(&mut guard, 5, start());
        guard.record_success();
        let view = guard.check_view(start());
        assert!(view.allowed);
        assert_eq!(view.attempts, 0);
        assert_eq!(guard.restore_view(start()), guard.idle_view());
    }
}
