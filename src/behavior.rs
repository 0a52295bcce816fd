//! Post-parse behaviors.
//!
//! Behaviors run in registration order, exactly once per parse, after body
//! matching. Each may mutate the result; a failure flips `matched` and
//! records a behavior error. The first failure stops the chain.

use crate::result::ParseResult;
use crate::token::Value;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct BehaviorError {
    pub reason: String,
}

impl BehaviorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A hook that validates or mutates a parse result.
pub trait Behavior: Send + Sync {
    fn name(&self) -> &str;
    fn operate(&self, result: &mut ParseResult) -> Result<(), BehaviorError>;
}

/// Fill a missing main-arg slot with a fixed value.
pub struct SetDefault {
    pub slot: String,
    pub value: Value,
}

impl Behavior for SetDefault {
    fn name(&self) -> &str {
        "set_default"
    }

    fn operate(&self, result: &mut ParseResult) -> Result<(), BehaviorError> {
        if !result.main_args.contains_key(&self.slot) && !result.other_args.contains_key(&self.slot)
        {
            result.main_args.insert(self.slot.clone(), self.value.clone());
        }
        Ok(())
    }
}

/// Reject results where two mutually exclusive paths are both present.
pub struct Exclusion {
    pub left: String,
    pub right: String,
}

impl Behavior for Exclusion {
    fn name(&self) -> &str {
        "exclusion"
    }

    fn operate(&self, result: &mut ParseResult) -> Result<(), BehaviorError> {
        if result.find(&self.left) && result.find(&self.right) {
            return Err(BehaviorError::new(format!(
                "{} and {} are mutually exclusive",
                self.left, self.right
            )));
        }
        Ok(())
    }
}

/// Reject parses arriving faster than the configured interval.
pub struct CoolDown {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl CoolDown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }
}

impl Behavior for CoolDown {
    fn name(&self) -> &str {
        "cool_down"
    }

    fn operate(&self, _result: &mut ParseResult) -> Result<(), BehaviorError> {
        let now = Instant::now();
        let mut last = self
            .last
            .lock()
            .map_err(|_| BehaviorError::new("cool_down state poisoned"))?;
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.interval {
                return Err(BehaviorError::new("command is cooling down"));
            }
        }
        *last = Some(now);
        Ok(())
    }
}
