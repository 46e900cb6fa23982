//! 准入检查、入口包装与闸门自观测。

use std::time::Duration;

use weir_core::observability::metrics::contract::memory_limiter as keys;
use weir_core::test_stubs::{RecordingConsumer, ScriptedProbe, recording_telemetry};
use weir_core::{
    Batch, CallContext, Cancellation, ComponentId, CreateSettings, ErrorCategory, GateMonitor,
    LogsData, Refusal, WeirError,
};

use super::{HARD, SOFT, scripted_monitor, thresholds};

#[test]
fn limited_gate_refuses_with_context() {
    let probe = ScriptedProbe::new([950]);
    let mut monitor = scripted_monitor(&probe);
    let gate = monitor.gate();
    assert!(gate.check_admission().is_ok(), "首个周期之前放行");

    monitor.tick();
    let err = gate.check_admission().expect_err("Limited 时拒绝");
    assert!(err.is_resource_exhausted());
    assert!(err.is_retryable(), "资源耗尽可在退避后重试");
    assert_eq!(err.category(), ErrorCategory::ResourceExhausted);
    match err {
        WeirError::ResourceExhausted(refusal) => assert_eq!(
            refusal,
            Refusal {
                last_usage: 950,
                hard_limit: HARD,
                soft_limit: SOFT,
            }
        ),
        other => panic!("期望 ResourceExhausted，实际为 {other:?}"),
    }

    let _ = gate.check_admission();
    assert_eq!(gate.refusal_count(), 2);
}

#[test]
fn admitted_checks_are_not_counted() {
    let probe = ScriptedProbe::new([100]);
    let mut monitor = scripted_monitor(&probe);
    let gate = monitor.gate();
    monitor.tick();
    for _ in 0..10 {
        gate.check_admission().expect("Normal 放行");
    }
    assert_eq!(gate.refusal_count(), 0);
}

#[test]
fn guard_blocks_batches_without_forwarding() {
    let probe = ScriptedProbe::new([950, 700]);
    let mut monitor = scripted_monitor(&probe);
    let downstream = RecordingConsumer::<LogsData>::new("pipeline");
    let entry = monitor.gate().guard(downstream.handle());
    let ctx = CallContext::default();

    entry.consume(&ctx, Batch::synthesize(3)).expect("初始放行");
    monitor.tick();
    let err = entry
        .consume(&ctx, Batch::synthesize(3))
        .expect_err("Limited 时拒绝");
    assert!(err.is_resource_exhausted());
    monitor.tick();
    entry.consume(&ctx, Batch::synthesize(3)).expect("回落后放行");

    assert_eq!(downstream.count(), 2, "被拒绝的批次不会到达下游");
}

#[test]
fn guard_checks_context_before_the_gate() {
    let probe = ScriptedProbe::new([950]);
    let mut monitor = scripted_monitor(&probe);
    monitor.tick();
    let gate = monitor.gate();
    let downstream = RecordingConsumer::<LogsData>::mutating("pipeline");
    let entry = gate.guard(downstream.handle());
    assert!(entry.mutates_data(), "包装沿用下游能力");

    let cancellation = Cancellation::new();
    cancellation.cancel();
    let ctx = CallContext::builder().with_cancellation(cancellation).build();
    let err = entry
        .consume(&ctx, Batch::synthesize(1))
        .expect_err("已取消");
    assert!(matches!(err, WeirError::Cancelled));
    assert_eq!(gate.refusal_count(), 0, "取消的调用不计入拒绝");
}

#[test]
fn gate_reports_its_metrics() {
    let (telemetry, meters, _) = recording_telemetry();
    let settings = CreateSettings::new(ComponentId::with_name("memory_limiter", "edge"), telemetry);
    let probe = ScriptedProbe::from_steps([Some(950), None]);
    let mut monitor = GateMonitor::new(thresholds(Duration::from_secs(1)), probe, &settings);
    let gate = monitor.gate();

    monitor.tick();
    let _ = gate.check_admission();
    let _ = gate.check_admission();
    monitor.tick();

    assert_eq!(meters.scopes(), vec![keys::SCOPE]);
    assert_eq!(meters.counter_total(keys::REFUSED_TOTAL.name), 2);
    assert_eq!(meters.counter_total(keys::RECLAIM_TOTAL.name), 1);
    assert_eq!(meters.counter_total(keys::MEASUREMENT_FAILURES.name), 1);
    assert_eq!(meters.last_gauge(keys::USAGE_BYTES.name), Some(950.0));
    assert_eq!(meters.last_gauge(keys::STATE.name), Some(0.0));
    assert_eq!(
        meters.counter_total_with(keys::TRANSITIONS_TOTAL.name, keys::ATTR_STATE, "limited"),
        1
    );
    assert_eq!(
        meters.counter_total_with(keys::TRANSITIONS_TOTAL.name, keys::ATTR_STATE, "normal"),
        1
    );
    assert!(
        meters
            .records()
            .iter()
            .all(|record| record.has_text(keys::ATTR_COMPONENT, "memory_limiter/edge"))
    );
}
