// Tests for the cron runtime driving rule activation windows on a shared store.
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use gdm_cron::{CronRuntime, RuleScheduleHook, ScheduleHook};
use gdm_rules::{Rule, RuleStatus, RuleStore, Schedule, Slot};

fn scheduled_rule(id: u64, status: RuleStatus, schedule: Schedule) -> Rule {
    let mut rule = Rule::new(id, format!("scheduled {id}"));
    rule.applies_to.insert(Slot::LongDescription);
    rule.status = status;
    rule.schedule = schedule;
    rule
}

#[tokio::test]
async fn runtime_applies_transitions_on_first_tick() {
    let now = Utc::now();
    let store = RuleStore::with_rules(vec![
        scheduled_rule(
            1,
            RuleStatus::Deshabilitada,
            Schedule::window(Some(now - ChronoDuration::minutes(5)), None),
        ),
        scheduled_rule(
            2,
            RuleStatus::Habilitada,
            Schedule::window(None, Some(now - ChronoDuration::minutes(1))),
        ),
        scheduled_rule(3, RuleStatus::Deshabilitada, Schedule::default()),
    ])
    .expect("rules seed");

    let mut runtime = CronRuntime::new();
    runtime
        .start(Arc::new(RuleScheduleHook::new(store.clone())), Duration::from_secs(3600))
        .expect("runtime starts");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let runs = runtime.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].changed, 2);
    runtime.shutdown().await;

    let status = |id| store.get(id).map(|entry| entry.rule.status);
    assert_eq!(status(1), Some(RuleStatus::Habilitada));
    assert_eq!(status(2), Some(RuleStatus::Deshabilitada));
    assert_eq!(status(3), Some(RuleStatus::Deshabilitada));
}

#[tokio::test]
async fn hook_is_idempotent_within_one_window() {
    let now = Utc::now();
    let store = RuleStore::with_rules(vec![scheduled_rule(
        1,
        RuleStatus::Deshabilitada,
        Schedule::window(Some(now - ChronoDuration::hours(1)), Some(now + ChronoDuration::hours(1))),
    )])
    .expect("rules seed");
    let hook = RuleScheduleHook::new(store.clone());

    assert_eq!(hook.run(now).await, Ok(1));
    assert_eq!(hook.run(now + ChronoDuration::minutes(10)).await, Ok(0));
    assert_eq!(store.history(1).len(), 2);
    assert!(store
        .get(1)
        .and_then(|entry| entry.rule.schedule.fired_at)
        .is_some());
}
