use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of "now" for ticket timestamps, expiry and reissue decisions.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Clock frozen at `at` (tests, replay tooling).
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}
