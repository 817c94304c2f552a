//! Tests for audit sink

use prometheus_task_pool::core::{
    build_audit_event, AuditSink, InMemoryAuditSink, JobAction, JobId, JobOutcome,
};

#[test]
fn test_in_memory_audit_sink() {
    let sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(&JobId::new("job1"), 2, "pool1", JobAction::Submitted);
    sink.record(event);
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].job_id.as_str(), "job1");
    assert_eq!(events[0].priority, 2);
    assert_eq!(events[0].action, JobAction::Submitted);
}

#[test]
fn test_audit_sink_overflow() {
    let sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(&JobId::new("job1"), 0, "pool1", JobAction::Submitted));
    sink.record(build_audit_event(&JobId::new("job2"), 0, "pool1", JobAction::Submitted));
    sink.record(build_audit_event(&JobId::new("job3"), 0, "pool1", JobAction::Submitted));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].job_id.as_str(), "job2"); // First one popped
    assert_eq!(events[1].job_id.as_str(), "job3");
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        &JobId::new("job1"),
        -1,
        "pool1",
        JobAction::Finished(JobOutcome::Failed("boom".into())),
    );

    assert_eq!(event.job_id, JobId::new("job1"));
    assert_eq!(event.priority, -1);
    assert_eq!(event.pool, "pool1");
    assert_eq!(event.action, JobAction::Finished(JobOutcome::Failed("boom".into())));
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_ids_with_filters_by_action() {
    let sink = InMemoryAuditSink::new(10);
    sink.record(build_audit_event(&JobId::new("a"), 0, "p", JobAction::Started));
    sink.record(build_audit_event(&JobId::new("b"), 0, "p", JobAction::Rejected));
    sink.record(build_audit_event(&JobId::new("c"), 0, "p", JobAction::Started));

    assert_eq!(sink.ids_with(&JobAction::Started), vec!["a", "c"]);
    assert_eq!(sink.ids_with(&JobAction::Rejected), vec!["b"]);
}
