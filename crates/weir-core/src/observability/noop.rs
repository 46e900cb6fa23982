//! 空操作的仪表与追踪实现，作为未接入后端时的降级选择。

use std::sync::Arc;

use super::attributes::{AttributeSet, KeyValue};
use super::metrics::{Counter, Gauge, Histogram, InstrumentDescriptor, Meter, MeterProvider};
use super::trace::{ActiveSpan, Tracer, TracerProvider};

/// 丢弃全部指标的提供者。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMeterProvider;

/// 丢弃全部 Span 的提供者。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracerProvider;

#[derive(Debug, Default)]
struct NoopInstrument;

impl Counter for NoopInstrument {
    fn add(&self, _value: u64, _attributes: AttributeSet<'_>) {}
}

impl Gauge for NoopInstrument {
    fn set(&self, _value: f64, _attributes: AttributeSet<'_>) {}
}

impl Histogram for NoopInstrument {
    fn record(&self, _value: f64, _attributes: AttributeSet<'_>) {}
}

impl Meter for NoopInstrument {
    fn counter(&self, _descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Counter> {
        Arc::new(NoopInstrument)
    }

    fn gauge(&self, _descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Gauge> {
        Arc::new(NoopInstrument)
    }

    fn histogram(&self, _descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Histogram> {
        Arc::new(NoopInstrument)
    }
}

impl MeterProvider for NoopMeterProvider {
    fn meter(&self, _scope: &'static str) -> Arc<dyn Meter> {
        Arc::new(NoopInstrument)
    }
}

struct NoopSpan;

impl ActiveSpan for NoopSpan {
    fn set_attribute(&mut self, _attribute: KeyValue<'static>) {}

    fn record_error(&mut self, _code: &'static str, _message: &str) {}

    fn end(self: Box<Self>) {}
}

impl Tracer for NoopInstrument {
    fn start_span(&self, _name: &'static str, _attributes: AttributeSet<'_>) -> Box<dyn ActiveSpan> {
        Box::new(NoopSpan)
    }
}

impl TracerProvider for NoopTracerProvider {
    fn tracer(&self, _scope: &'static str) -> Arc<dyn Tracer> {
        Arc::new(NoopInstrument)
    }
}
