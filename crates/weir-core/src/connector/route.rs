//! 转发路径的自观测包装：每次转发计数、记录条目数并开启一个 Span。

use std::sync::Arc;

use crate::component::CreateSettings;
use crate::consumer::{Consumer, ConsumerHandle};
use crate::contract::CallContext;
use crate::data::{Batch, SignalData};
use crate::error::WeirError;
use crate::observability::metrics::contract::connector as keys;
use crate::observability::{Counter, Histogram, KeyValue, Tracer};
use crate::signal::SignalPair;

/// 单条转发路径共享的仪表与追踪器。
#[derive(Clone)]
pub(crate) struct RouteTelemetry {
    connector: Arc<str>,
    pair_label: Arc<str>,
    batches: Arc<dyn Counter>,
    items: Arc<dyn Histogram>,
    tracer: Arc<dyn Tracer>,
}

impl RouteTelemetry {
    /// 在 `weir/connector` 作用域下创建一次仪表，供全部转发路径复用。
    pub(crate) fn scope(settings: &CreateSettings) -> Self {
        let meter = settings.telemetry.meter_provider.meter(keys::SCOPE);
        Self {
            connector: Arc::from(settings.id.to_string()),
            pair_label: Arc::from(""),
            batches: meter.counter(&keys::BATCHES_TOTAL),
            items: meter.histogram(&keys::BATCH_ITEMS),
            tracer: settings.telemetry.tracer_provider.tracer(keys::SCOPE),
        }
    }

    /// 绑定到具体信号对。
    pub(crate) fn for_pair(&self, pair: SignalPair) -> Self {
        Self {
            pair_label: Arc::from(pair.to_string()),
            ..self.clone()
        }
    }
}

/// 带自观测的转发路径。
pub(crate) struct Instrumented<S: SignalData> {
    inner: ConsumerHandle<S>,
    telemetry: RouteTelemetry,
}

impl<S: SignalData> Instrumented<S> {
    /// 包装转发路径，能力描述沿用被包装者。
    pub(crate) fn wrap(inner: ConsumerHandle<S>, telemetry: RouteTelemetry) -> ConsumerHandle<S> {
        let capabilities = inner.capabilities();
        ConsumerHandle::new(Instrumented { inner, telemetry }, capabilities)
    }
}

impl<S: SignalData> Consumer<S> for Instrumented<S> {
    fn consume(&self, ctx: &CallContext, batch: Batch<S>) -> Result<(), WeirError> {
        ctx.ensure_active()?;
        let telemetry = &self.telemetry;
        let base = [
            KeyValue::new(keys::ATTR_CONNECTOR, telemetry.connector.as_ref()),
            KeyValue::new(keys::ATTR_PAIR, telemetry.pair_label.as_ref()),
        ];
        let mut span = telemetry.tracer.start_span(keys::SPAN_FORWARD, &base);
        telemetry.items.record(batch.item_count() as f64, &base);

        let result = self.inner.consume(ctx, batch);
        match &result {
            Ok(()) => {
                let [connector, pair] = base;
                let attributes = [
                    connector,
                    pair,
                    KeyValue::new(keys::ATTR_OUTCOME, keys::OUTCOME_SUCCESS),
                ];
                telemetry.batches.increment(&attributes);
            }
            Err(err) => {
                span.record_error(err.code(), &err.to_string());
                let [connector, pair] = base;
                let attributes = [
                    connector,
                    pair,
                    KeyValue::new(keys::ATTR_OUTCOME, keys::OUTCOME_ERROR),
                    KeyValue::new(keys::ATTR_ERROR_CODE, err.code()),
                ];
                telemetry.batches.increment(&attributes);
                tracing::debug!(
                    connector = %telemetry.connector,
                    pair = %telemetry.pair_label,
                    code = err.code(),
                    "connector forward failed"
                );
            }
        }
        span.end();
        result
    }
}
