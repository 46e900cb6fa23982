//! 错误、取消与自观测沿连接器的传播。

use weir_core::connector::builtin;
use weir_core::observability::metrics::contract::connector as keys;
use weir_core::test_stubs::RecordingConsumer;
use weir_core::{
    Batch, CallContext, Cancellation, Connector, LogsData, MetricsData, SignalKind, SignalPair,
    TracesData, WeirError,
};

use super::{recorded_settings, settings};

#[test]
fn single_downstream_failure_propagates_unchanged() {
    let metrics = RecordingConsumer::<MetricsData>::failing("exporter", "exporter.rejected");
    let factory = builtin::example_factory();
    let connector = Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "fail"))
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Metrics), metrics.handle())
        .build()
        .expect("构建成功");

    let err = connector
        .traces()
        .expect("traces 入口存在")
        .consume(&CallContext::default(), Batch::synthesize(1))
        .expect_err("下游失败必须返回错误");
    assert!(matches!(err, WeirError::Downstream(_)));
    assert_eq!(err.code(), "exporter.rejected");
    assert_eq!(metrics.count(), 1, "失败的下游仍收到了批次");
}

#[test]
fn failures_on_several_routes_are_aggregated() {
    let metrics = RecordingConsumer::<MetricsData>::failing("metrics", "metrics.down");
    let logs = RecordingConsumer::<LogsData>::failing("logs", "logs.down");
    let traces = RecordingConsumer::<TracesData>::new("traces");
    let factory = builtin::example_factory();
    let connector = Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "multi"))
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Metrics), metrics.handle())
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Logs), logs.handle())
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Traces), traces.handle())
        .build()
        .expect("构建成功");

    let err = connector
        .traces()
        .expect("traces 入口存在")
        .consume(&CallContext::default(), Batch::synthesize(2))
        .expect_err("两条路径失败");
    match err {
        WeirError::FanOut(aggregate) => {
            let mut codes: Vec<_> = aggregate.errors().iter().map(WeirError::code).collect();
            codes.sort_unstable();
            assert_eq!(codes, vec!["logs.down", "metrics.down"]);
        }
        other => panic!("期望聚合错误，实际为 {other:?}"),
    }
    assert_eq!(traces.count(), 1, "成功的路径不受其他路径失败影响");
}

#[test]
fn cancelled_context_stops_before_any_forwarding() {
    let metrics = RecordingConsumer::<MetricsData>::new("metrics");
    let factory = builtin::example_factory();
    let connector = Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "cancel"))
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Metrics), metrics.handle())
        .build()
        .expect("构建成功");

    let cancellation = Cancellation::new();
    cancellation.cancel();
    let ctx = CallContext::builder().with_cancellation(cancellation).build();
    let err = connector
        .traces()
        .expect("traces 入口存在")
        .consume(&ctx, Batch::synthesize(4))
        .expect_err("已取消的上下文不得转发");
    assert!(matches!(err, WeirError::Cancelled));
    assert_eq!(metrics.count(), 0);
}

#[test]
fn forwards_are_counted_and_traced_per_pair() {
    let (settings, meters, tracers) = recorded_settings(builtin::EXAMPLE_TYPE);
    let metrics = RecordingConsumer::<MetricsData>::new("metrics");
    let logs = RecordingConsumer::<LogsData>::failing("logs", "logs.down");
    let factory = builtin::example_factory();
    let connector = Connector::builder(&factory, settings)
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Metrics), metrics.handle())
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Logs), logs.handle())
        .build()
        .expect("构建成功");
    let entry = connector.traces().expect("traces 入口存在");

    let _ = entry.consume(&CallContext::default(), Batch::synthesize(3));
    let _ = entry.consume(&CallContext::default(), Batch::synthesize(5));

    assert_eq!(
        meters.counter_total_with(keys::BATCHES_TOTAL.name, keys::ATTR_PAIR, "traces->metrics"),
        2
    );
    assert_eq!(
        meters.counter_total_with(keys::BATCHES_TOTAL.name, keys::ATTR_OUTCOME, keys::OUTCOME_ERROR),
        2,
        "traces->logs 的两次失败都应计入 error"
    );
    assert_eq!(meters.scopes(), vec![keys::SCOPE]);

    let mut samples = meters.histogram_samples(keys::BATCH_ITEMS.name);
    samples.sort_by(f64::total_cmp);
    assert_eq!(samples, vec![3.0, 3.0, 5.0, 5.0]);

    let spans = tracers.spans();
    assert_eq!(spans.len(), 4);
    assert!(spans.iter().all(|span| span.name == keys::SPAN_FORWARD));
    let failed: Vec<_> = spans.iter().filter(|span| span.error.is_some()).collect();
    assert_eq!(failed.len(), 2);
    assert!(failed
        .iter()
        .all(|span| span.error.as_ref().map(|(code, _)| *code) == Some("logs.down")));
}
