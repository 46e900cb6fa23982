//! 分发性质：每个已绑定的信号对只把数据送到自己的下游，且跨种类合成是确定性的。

use weir_core::connector::builtin::{self, MUTATION_MARKER_KEY};
use weir_core::test_stubs::{RECORDER_MARK_KEY, RecordingConsumer};
use weir_core::{
    Batch, CallContext, Connector, FanOut, LogsData, MetricsData, SignalData, SignalKind,
    SignalPair, StabilityLevel, TracesData,
};

use super::{mutating_config, settings, span_metrics_factory};

/// 按源种类下标排列的九个下游：`traces[i]` 接收源为 `SignalKind::ALL[i]`、目标为 traces 的数据。
struct Sinks {
    traces: [RecordingConsumer<TracesData>; 3],
    metrics: [RecordingConsumer<MetricsData>; 3],
    logs: [RecordingConsumer<LogsData>; 3],
}

impl Sinks {
    fn new() -> Self {
        Self {
            traces: SignalKind::ALL.map(|source| RecordingConsumer::new(format!("{source}->traces"))),
            metrics: SignalKind::ALL
                .map(|source| RecordingConsumer::new(format!("{source}->metrics"))),
            logs: SignalKind::ALL.map(|source| RecordingConsumer::new(format!("{source}->logs"))),
        }
    }

    fn items(&self, pair: SignalPair) -> usize {
        let source = pair.source.index();
        match pair.destination {
            SignalKind::Traces => self.traces[source].items(),
            SignalKind::Metrics => self.metrics[source].items(),
            SignalKind::Logs => self.logs[source].items(),
        }
    }
}

fn full_matrix(sinks: &Sinks) -> Connector {
    let factory = builtin::example_factory();
    let mut builder = Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "matrix"));
    for source in SignalKind::ALL {
        let index = source.index();
        builder = builder
            .route(
                SignalPair::new(source, SignalKind::Traces),
                sinks.traces[index].handle(),
            )
            .route(
                SignalPair::new(source, SignalKind::Metrics),
                sinks.metrics[index].handle(),
            )
            .route(
                SignalPair::new(source, SignalKind::Logs),
                sinks.logs[index].handle(),
            );
    }
    builder.build().expect("example 连接器支持全部九个信号对")
}

#[test]
fn every_pair_delivers_only_to_its_bound_consumer() {
    let sinks = Sinks::new();
    let connector = full_matrix(&sinks);
    assert_eq!(connector.pairs().len(), 9);
    assert!(!connector.capabilities().mutates_data);

    let ctx = CallContext::default();
    connector
        .traces()
        .expect("traces 入口存在")
        .consume(&ctx, Batch::synthesize(2))
        .expect("traces 分发成功");
    connector
        .metrics()
        .expect("metrics 入口存在")
        .consume(&ctx, Batch::synthesize(3))
        .expect("metrics 分发成功");
    connector
        .logs()
        .expect("logs 入口存在")
        .consume(&ctx, Batch::synthesize(4))
        .expect("logs 分发成功");

    for pair in SignalPair::all() {
        let expected = match pair.source {
            SignalKind::Traces => 2,
            SignalKind::Metrics => 3,
            SignalKind::Logs => 4,
        };
        assert_eq!(
            sinks.items(pair),
            expected,
            "{pair} 的下游应恰好收到源批次的条目数"
        );
    }
}

#[test]
fn unused_sources_see_no_traffic() {
    let sinks = Sinks::new();
    let connector = full_matrix(&sinks);
    connector
        .logs()
        .expect("logs 入口存在")
        .consume(&CallContext::default(), Batch::synthesize(5))
        .expect("logs 分发成功");

    for pair in SignalPair::all() {
        let expected = if pair.source == SignalKind::Logs { 5 } else { 0 };
        assert_eq!(sinks.items(pair), expected, "{pair} 不应收到其他源的数据");
    }
}

#[test]
fn traces_to_metrics_only_connector_exposes_only_traces_entry() {
    let factory = span_metrics_factory(StabilityLevel::Alpha);
    let metrics = RecordingConsumer::<MetricsData>::new("metrics pipeline");
    let connector = Connector::builder(&factory, settings("spanmetrics", "only"))
        .route(
            SignalPair::new(SignalKind::Traces, SignalKind::Metrics),
            metrics.handle(),
        )
        .build()
        .expect("traces->metrics 合法");

    assert!(connector.metrics().is_err(), "未订阅 metrics 源");
    assert!(connector.logs().is_err(), "未订阅 logs 源");

    connector
        .traces()
        .expect("traces 入口存在")
        .consume(&CallContext::default(), Batch::synthesize(10))
        .expect("转发成功");
    assert_eq!(metrics.count(), 1);
    assert_eq!(metrics.items(), 10, "10 个 Span 应换算为 10 个指标");
}

#[test]
fn cross_kind_synthesis_is_deterministic() {
    let run = || {
        let logs = RecordingConsumer::<LogsData>::new("logs");
        let factory = builtin::example_factory();
        let connector = Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "det"))
            .route(SignalPair::new(SignalKind::Metrics, SignalKind::Logs), logs.handle())
            .build()
            .expect("metrics->logs 合法");
        connector
            .metrics()
            .expect("metrics 入口存在")
            .consume(&CallContext::default(), Batch::synthesize(6))
            .expect("转发成功");
        logs.batches()
            .iter()
            .map(Batch::snapshot)
            .collect::<Vec<_>>()
    };

    let first = run();
    assert_eq!(first, run(), "相同输入必须产生相等输出");
    assert_eq!(first, vec![LogsData::synthesize(6)]);
}

#[test]
fn same_kind_passthrough_forwards_the_original_instance() {
    let traces = RecordingConsumer::<TracesData>::new("traces");
    let factory = builtin::forward_factory();
    let connector = Connector::builder(&factory, settings(builtin::FORWARD_TYPE, "plain"))
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Traces), traces.handle())
        .build()
        .expect("forward 支持 traces->traces");

    let batch = Batch::<TracesData>::synthesize(3);
    connector
        .traces()
        .expect("traces 入口存在")
        .consume(&CallContext::default(), batch.clone())
        .expect("转发成功");

    let received = traces.batches();
    assert_eq!(received.len(), 1);
    assert!(
        Batch::same_instance(&received[0], &batch),
        "只读转发无需克隆"
    );
}

#[test]
fn mutating_configuration_marks_every_route_and_stamps_data() {
    let traces = RecordingConsumer::<TracesData>::new("traces");
    let factory = builtin::example_factory();
    let connector = Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "stamp"))
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Traces), traces.handle())
        .build_with_config(&mutating_config())
        .expect("构建成功");
    assert!(connector.capabilities().mutates_data);
    assert!(connector.traces().expect("traces 入口存在").mutates_data());

    connector
        .traces()
        .expect("traces 入口存在")
        .consume(&CallContext::default(), Batch::synthesize(2))
        .expect("转发成功");
    let stamped = traces.batches()[0].snapshot();
    assert!(stamped.spans.iter().all(|span| {
        span.attributes.get(MUTATION_MARKER_KEY).map(String::as_str) == Some("example/stamp")
    }));
}

#[test]
fn instance_named_mutate_declares_mutation() {
    let metrics = RecordingConsumer::<MetricsData>::new("metrics");
    let factory = builtin::example_factory();
    let connector = Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "mutate"))
        .route(SignalPair::new(SignalKind::Logs, SignalKind::Metrics), metrics.handle())
        .build()
        .expect("构建成功");
    assert!(connector.capabilities().mutates_data);
}

#[test]
fn passthrough_into_mutator_inherits_mutation_and_survives_fan_out() {
    let writer = RecordingConsumer::<TracesData>::mutating("writer");
    let factory = builtin::forward_factory();
    let connector = Connector::builder(&factory, settings(builtin::FORWARD_TYPE, "relay"))
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Traces), writer.handle())
        .build()
        .expect("forward 支持 traces->traces");
    let entry = connector.traces().expect("traces 入口存在");
    assert!(entry.mutates_data(), "原实例直达修改型下游，入口必须声明修改");
    assert!(connector.capabilities().mutates_data);

    let first_reader = RecordingConsumer::<TracesData>::new("first");
    let second_reader = RecordingConsumer::<TracesData>::new("second");
    let routed = FanOut::build([first_reader.handle(), entry, second_reader.handle()])
        .expect("三个分支");

    let batch = Batch::<TracesData>::synthesize(4);
    routed
        .consume(&CallContext::default(), batch.clone())
        .expect("修改型分支拿到独占实例，不会遇到只读拒绝");

    let written = writer.batches();
    assert_eq!(written.len(), 1);
    assert!(!Batch::same_instance(&written[0], &batch));
    assert!(
        batch
            .snapshot()
            .spans
            .iter()
            .all(|span| !span.attributes.contains_key(RECORDER_MARK_KEY)),
        "读者看不到修改"
    );
    assert_eq!(first_reader.items(), 4);
    assert_eq!(second_reader.items(), 4);
}

#[test]
fn entry_handles_declare_the_connector_capability() {
    let traces = RecordingConsumer::<TracesData>::new("traces");
    let metrics = RecordingConsumer::<MetricsData>::new("metrics");
    let factory = builtin::example_factory();
    let connector = Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "split"))
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Traces), traces.handle())
        .route(SignalPair::new(SignalKind::Traces, SignalKind::Metrics), metrics.handle())
        .build_with_config(&mutating_config())
        .expect("构建成功");

    let entry = connector.traces().expect("traces 入口存在");
    assert!(connector.capabilities().mutates_data);
    assert_eq!(entry.capabilities(), connector.capabilities());

    let sinks = Sinks::new();
    let matrix = full_matrix(&sinks);
    for capabilities in [
        matrix.traces().expect("traces 入口").capabilities(),
        matrix.metrics().expect("metrics 入口").capabilities(),
        matrix.logs().expect("logs 入口").capabilities(),
    ] {
        assert_eq!(capabilities, matrix.capabilities());
    }
}
