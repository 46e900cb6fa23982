use std::sync::Arc;

use parking_lot::Mutex;

use crate::component::TelemetrySettings;
use crate::observability::{
    ActiveSpan, AttributeSet, Counter, Gauge, Histogram, InstrumentDescriptor, KeyValue, Meter,
    MeterProvider, MetricAttributeValue, OwnedAttributeSet, Tracer, TracerProvider,
};

/// 仪表类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    Gauge,
    Histogram,
}

/// 一次指标写入。
#[derive(Clone, Debug, PartialEq)]
pub struct MetricRecord {
    pub scope: &'static str,
    pub name: String,
    pub kind: InstrumentKind,
    pub value: f64,
    pub attributes: OwnedAttributeSet,
}

impl MetricRecord {
    /// 属性 `key` 是否等于文本 `value`。
    pub fn has_text(&self, key: &str, value: &str) -> bool {
        matches!(self.attributes.get(key), Some(MetricAttributeValue::Text(text)) if text == value)
    }
}

type MetricLog = Arc<Mutex<Vec<MetricRecord>>>;

/// 记录全部指标写入的提供者。
#[derive(Clone, Default)]
pub struct RecordingMeterProvider {
    records: MetricLog,
}

impl RecordingMeterProvider {
    /// 创建空记录。
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部写入的快照，按写入顺序。
    pub fn records(&self) -> Vec<MetricRecord> {
        self.records.lock().clone()
    }

    /// 指定名称计数器的累计值。
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counter_total_where(name, |_| true)
    }

    /// 指定名称且属性 `key = value` 的计数器累计值。
    pub fn counter_total_with(&self, name: &str, key: &str, value: &str) -> u64 {
        self.counter_total_where(name, |record| record.has_text(key, value))
    }

    fn counter_total_where(&self, name: &str, filter: impl Fn(&MetricRecord) -> bool) -> u64 {
        self.records
            .lock()
            .iter()
            .filter(|record| {
                record.kind == InstrumentKind::Counter && record.name == name && filter(record)
            })
            .map(|record| record.value as u64)
            .sum()
    }

    /// 指定名称瞬时值仪表的最后一次写入。
    pub fn last_gauge(&self, name: &str) -> Option<f64> {
        self.records
            .lock()
            .iter()
            .rev()
            .find(|record| record.kind == InstrumentKind::Gauge && record.name == name)
            .map(|record| record.value)
    }

    /// 指定名称直方图的全部样本。
    pub fn histogram_samples(&self, name: &str) -> Vec<f64> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.kind == InstrumentKind::Histogram && record.name == name)
            .map(|record| record.value)
            .collect()
    }

    /// 出现过的作用域名称（去重，按首次出现顺序）。
    pub fn scopes(&self) -> Vec<&'static str> {
        let mut scopes = Vec::new();
        for record in self.records.lock().iter() {
            if !scopes.contains(&record.scope) {
                scopes.push(record.scope);
            }
        }
        scopes
    }
}

impl MeterProvider for RecordingMeterProvider {
    fn meter(&self, scope: &'static str) -> Arc<dyn Meter> {
        Arc::new(RecordingMeter {
            scope,
            records: Arc::clone(&self.records),
        })
    }
}

struct RecordingMeter {
    scope: &'static str,
    records: MetricLog,
}

impl RecordingMeter {
    fn instrument(
        &self,
        descriptor: &InstrumentDescriptor<'_>,
        kind: InstrumentKind,
    ) -> RecordingInstrument {
        RecordingInstrument {
            scope: self.scope,
            name: descriptor.name.to_string(),
            kind,
            records: Arc::clone(&self.records),
        }
    }
}

impl Meter for RecordingMeter {
    fn counter(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Counter> {
        Arc::new(self.instrument(descriptor, InstrumentKind::Counter))
    }

    fn gauge(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Gauge> {
        Arc::new(self.instrument(descriptor, InstrumentKind::Gauge))
    }

    fn histogram(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Histogram> {
        Arc::new(self.instrument(descriptor, InstrumentKind::Histogram))
    }
}

struct RecordingInstrument {
    scope: &'static str,
    name: String,
    kind: InstrumentKind,
    records: MetricLog,
}

impl RecordingInstrument {
    fn push(&self, value: f64, attributes: AttributeSet<'_>) {
        self.records.lock().push(MetricRecord {
            scope: self.scope,
            name: self.name.clone(),
            kind: self.kind,
            value,
            attributes: OwnedAttributeSet::from_borrowed(attributes),
        });
    }
}

impl Counter for RecordingInstrument {
    fn add(&self, value: u64, attributes: AttributeSet<'_>) {
        self.push(value as f64, attributes);
    }
}

impl Gauge for RecordingInstrument {
    fn set(&self, value: f64, attributes: AttributeSet<'_>) {
        self.push(value, attributes);
    }
}

impl Histogram for RecordingInstrument {
    fn record(&self, value: f64, attributes: AttributeSet<'_>) {
        self.push(value, attributes);
    }
}

/// 一个已结束的 Span。
#[derive(Clone, Debug, PartialEq)]
pub struct SpanRecord {
    pub scope: &'static str,
    pub name: &'static str,
    pub attributes: OwnedAttributeSet,
    pub error: Option<(&'static str, String)>,
}

type SpanLog = Arc<Mutex<Vec<SpanRecord>>>;

/// 记录全部已结束 Span 的提供者。
#[derive(Clone, Default)]
pub struct RecordingTracerProvider {
    spans: SpanLog,
}

impl RecordingTracerProvider {
    /// 创建空记录。
    pub fn new() -> Self {
        Self::default()
    }

    /// 已结束 Span 的快照，按结束顺序。
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().clone()
    }
}

impl TracerProvider for RecordingTracerProvider {
    fn tracer(&self, scope: &'static str) -> Arc<dyn Tracer> {
        Arc::new(RecordingTracer {
            scope,
            spans: Arc::clone(&self.spans),
        })
    }
}

struct RecordingTracer {
    scope: &'static str,
    spans: SpanLog,
}

impl Tracer for RecordingTracer {
    fn start_span(&self, name: &'static str, attributes: AttributeSet<'_>) -> Box<dyn ActiveSpan> {
        Box::new(RecordingSpan {
            record: Some(SpanRecord {
                scope: self.scope,
                name,
                attributes: OwnedAttributeSet::from_borrowed(attributes),
                error: None,
            }),
            spans: Arc::clone(&self.spans),
        })
    }
}

struct RecordingSpan {
    record: Option<SpanRecord>,
    spans: SpanLog,
}

impl ActiveSpan for RecordingSpan {
    fn set_attribute(&mut self, attribute: KeyValue<'static>) {
        if let Some(record) = self.record.as_mut() {
            record.attributes.push_owned(attribute.key, attribute.value);
        }
    }

    fn record_error(&mut self, code: &'static str, message: &str) {
        if let Some(record) = self.record.as_mut() {
            record.error = Some((code, message.to_string()));
        }
    }

    fn end(mut self: Box<Self>) {
        if let Some(record) = self.record.take() {
            self.spans.lock().push(record);
        }
    }
}

impl Drop for RecordingSpan {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.spans.lock().push(record);
        }
    }
}

/// 以记录型提供者组装自观测设置，同时返回两个提供者供断言。
pub fn recording_telemetry() -> (
    TelemetrySettings,
    RecordingMeterProvider,
    RecordingTracerProvider,
) {
    let meters = RecordingMeterProvider::new();
    let tracers = RecordingTracerProvider::new();
    let settings = TelemetrySettings::new(Arc::new(meters.clone()), Arc::new(tracers.clone()));
    (settings, meters, tracers)
}
