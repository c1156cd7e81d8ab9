//! Task ID generation.
//!
//! IDs look like `task/<YYYYMMDDHHMMSS>`. Resolution is one second, so the
//! generator remembers the last timestamp it handed out and waits for the
//! clock to move on before issuing another. Uniqueness holds within one
//! process only.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::debug;

pub const TASK_ID_PREFIX: &str = "task/";
pub const ID_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

const SAME_SECOND_WAIT: Duration = Duration::from_secs(1);

/// Time source for the generator
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
    fn sleep(&self, duration: Duration);
}

/// Wall clock in local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct IdGenerator {
    clock: Box<dyn Clock>,
    last_issued: Mutex<Option<String>>,
}

impl IdGenerator {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last_issued: Mutex::new(None),
        }
    }

    pub fn system() -> Self {
        Self::new(SystemClock)
    }

    /// The process-wide generator used by default repositories
    pub fn shared() -> Arc<IdGenerator> {
        static SHARED: OnceLock<Arc<IdGenerator>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(IdGenerator::system()))
            .clone()
    }

    /// Issue the next ID, blocking while the clock is still in the last issued second
    pub fn next_id(&self) -> String {
        let mut last = self
            .last_issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut stamp = self.stamp();
        while last.as_deref() == Some(stamp.as_str()) {
            debug!(stamp = %stamp, "id timestamp already issued, waiting for next second");
            self.clock.sleep(SAME_SECOND_WAIT);
            stamp = self.stamp();
        }

        *last = Some(stamp.clone());
        format!("{TASK_ID_PREFIX}{stamp}")
    }

    fn stamp(&self) -> String {
        self.clock.now().format(ID_TIME_FORMAT).to_string()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self
            .last_issued
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None);
        f.debug_struct("IdGenerator")
            .field("last_issued", &last)
            .finish_non_exhaustive()
    }
}

/// File stem for an ID: `task/20240101120000_1` -> `20240101120000_1`
pub fn file_stem(id: &str) -> String {
    id.strip_prefix(TASK_ID_PREFIX)
        .unwrap_or(id)
        .replace(['/', '\\'], "_")
}
