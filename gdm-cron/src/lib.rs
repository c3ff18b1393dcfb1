//! Background scheduler for the rule engine.
//!
//! [`CronRuntime`] invokes a [`ScheduleHook`] immediately and then on a fixed
//! interval. [`RuleScheduleHook`] is the hook that enables and disables rules
//! as their activation windows open and close.

mod error;
mod hook;
mod runtime;

pub use error::CronError;
pub use hook::RuleScheduleHook;
pub use runtime::{CronRun, CronRuntime, ScheduleHook};
