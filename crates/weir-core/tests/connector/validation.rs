//! 装配期校验：任何配置错误都在 `build` 或获取入口时暴露，绝不拖到第一批数据到达。

use tracing_test::traced_test;
use weir_core::connector::builtin;
use weir_core::test_stubs::RecordingConsumer;
use weir_core::{
    ConfigurationError, Connector, LogsData, MetricsData, SignalKind, SignalPair, StabilityLevel,
    TracesData, WeirError,
};

use super::{settings, span_metrics_factory};

fn configuration_error(result: Result<Connector, WeirError>) -> ConfigurationError {
    match result {
        Err(WeirError::Configuration(err)) => err,
        Err(other) => panic!("期望配置错误，实际为 {other:?}"),
        Ok(connector) => panic!("期望构建失败，实际得到 {connector:?}"),
    }
}

#[test]
fn connector_without_routes_is_rejected() {
    let factory = builtin::example_factory();
    let err = configuration_error(
        Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "empty")).build(),
    );
    assert!(matches!(err, ConfigurationError::EmptyConnector { .. }));
}

#[test]
fn unsupported_pair_is_rejected_at_build() {
    let factory = span_metrics_factory(StabilityLevel::Beta);
    let traces = RecordingConsumer::<TracesData>::new("traces");
    let err = configuration_error(
        Connector::builder(&factory, settings("spanmetrics", "bad"))
            .route(SignalPair::new(SignalKind::Logs, SignalKind::Traces), traces.handle())
            .build(),
    );
    assert_eq!(
        err,
        ConfigurationError::UnsupportedPair {
            connector: "spanmetrics/bad".into(),
            pair: SignalPair::new(SignalKind::Logs, SignalKind::Traces),
        }
    );
    assert_eq!(traces.count(), 0);
}

#[test]
fn forward_connector_rejects_cross_kind_pairs() {
    let factory = builtin::forward_factory();
    let logs = RecordingConsumer::<LogsData>::new("logs");
    let err = configuration_error(
        Connector::builder(&factory, settings(builtin::FORWARD_TYPE, "x"))
            .route(SignalPair::new(SignalKind::Traces, SignalKind::Logs), logs.handle())
            .build(),
    );
    assert!(matches!(err, ConfigurationError::UnsupportedPair { .. }));
}

#[test]
fn destination_of_wrong_kind_is_rejected() {
    let factory = builtin::example_factory();
    let logs = RecordingConsumer::<LogsData>::new("logs");
    let err = configuration_error(
        Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "mismatch"))
            .route(
                SignalPair::new(SignalKind::Traces, SignalKind::Metrics),
                logs.handle(),
            )
            .build(),
    );
    assert_eq!(
        err,
        ConfigurationError::ConsumerKindMismatch {
            connector: "example/mismatch".into(),
            pair: SignalPair::new(SignalKind::Traces, SignalKind::Metrics),
            actual: SignalKind::Logs,
        }
    );
}

#[test]
fn duplicate_pair_is_rejected() {
    let factory = builtin::example_factory();
    let metrics = RecordingConsumer::<MetricsData>::new("metrics");
    let pair = SignalPair::new(SignalKind::Traces, SignalKind::Metrics);
    let err = configuration_error(
        Connector::builder(&factory, settings(builtin::EXAMPLE_TYPE, "dup"))
            .route(pair, metrics.handle())
            .route(pair, metrics.handle())
            .build(),
    );
    assert!(matches!(err, ConfigurationError::DuplicateRoute { .. }));
}

#[test]
fn missing_entry_point_names_the_source_kind() {
    let factory = span_metrics_factory(StabilityLevel::Beta);
    let metrics = RecordingConsumer::<MetricsData>::new("metrics");
    let connector = Connector::builder(&factory, settings("spanmetrics", "entry"))
        .route(
            SignalPair::new(SignalKind::Traces, SignalKind::Metrics),
            metrics.handle(),
        )
        .build()
        .expect("合法装配");

    match connector.logs() {
        Err(WeirError::Configuration(ConfigurationError::MissingEntryPoint { kind, .. })) => {
            assert_eq!(kind, SignalKind::Logs);
        }
        other => panic!("期望 MissingEntryPoint，实际为 {other:?}"),
    }
    assert!(connector.supports(SignalPair::new(SignalKind::Traces, SignalKind::Metrics)));
    assert!(!connector.supports(SignalPair::new(SignalKind::Logs, SignalKind::Metrics)));
}

#[test]
fn factory_reports_stability_per_pair() {
    let factory = span_metrics_factory(StabilityLevel::Alpha);
    assert_eq!(
        factory.stability(SignalPair::new(SignalKind::Traces, SignalKind::Metrics)),
        Some(StabilityLevel::Alpha)
    );
    assert_eq!(
        factory.stability(SignalPair::new(SignalKind::Metrics, SignalKind::Traces)),
        None
    );
    assert_eq!(factory.type_name(), "spanmetrics");
}

#[traced_test]
#[test]
fn deprecated_pair_logs_a_warning_at_build() {
    let factory = span_metrics_factory(StabilityLevel::Deprecated);
    let metrics = RecordingConsumer::<MetricsData>::new("metrics");
    Connector::builder(&factory, settings("spanmetrics", "old"))
        .route(
            SignalPair::new(SignalKind::Traces, SignalKind::Metrics),
            metrics.handle(),
        )
        .build()
        .expect("已弃用的信号对仍可装配");

    assert!(logs_contain("connector route is deprecated"));
}
