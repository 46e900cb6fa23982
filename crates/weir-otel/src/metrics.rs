//! 指标桥接：把 weir 的仪表契约映射到 OpenTelemetry Metrics API。
//!
//! # 教案式说明
//! - **意图（Why）**：weir-core 只依赖对象安全的 [`MeterProvider`] 契约，而 OpenTelemetry 的
//!   `MeterProvider` 带泛型方法、无法做成 trait object；这里以闭包捕获具体提供者，抹平两者差异；
//! - **逻辑（How）**：计数器与直方图直接映射为同步仪表；瞬时值仪表映射为 `ObservableGauge`，
//!   写入先落在本地单元格，由 SDK 采集时的回调读出；
//! - **契约（What）**：作用域名称原样作为 OpenTelemetry Meter 名称，描述符的说明与单位一并传递。

use std::sync::Arc;

use opentelemetry::KeyValue as OtelKeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{
    Counter as OtelCounter, Histogram as OtelHistogram, Meter as OtelMeter, Unit,
};
use parking_lot::Mutex;
use weir_core::observability::{
    AttributeSet, Counter, Gauge, Histogram, InstrumentDescriptor, Meter, MeterProvider,
};

use crate::attributes::to_otel_attributes;

type MeterFactory = dyn Fn(&'static str) -> OtelMeter + Send + Sync;

/// OpenTelemetry 版本的 [`MeterProvider`]。
#[derive(Clone)]
pub struct OtelMeterProvider {
    factory: Arc<MeterFactory>,
}

impl OtelMeterProvider {
    /// 使用 `opentelemetry::global` 中注册的提供者；未注册时为空操作。
    pub fn global() -> Self {
        Self {
            factory: Arc::new(|scope: &'static str| global::meter(scope)),
        }
    }

    /// 包装具体的 OpenTelemetry 提供者。
    pub fn new<P>(provider: P) -> Self
    where
        P: opentelemetry::metrics::MeterProvider + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move |scope: &'static str| {
                provider.versioned_meter(
                    scope,
                    Some(env!("CARGO_PKG_VERSION")),
                    None::<&'static str>,
                    None,
                )
            }),
        }
    }
}

impl MeterProvider for OtelMeterProvider {
    fn meter(&self, scope: &'static str) -> Arc<dyn Meter> {
        Arc::new(OtelScopedMeter {
            meter: (self.factory)(scope),
        })
    }
}

struct OtelScopedMeter {
    meter: OtelMeter,
}

impl Meter for OtelScopedMeter {
    fn counter(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Counter> {
        let mut builder = self.meter.u64_counter(descriptor.name.to_string());
        if let Some(description) = descriptor.description {
            builder = builder.with_description(description.to_string());
        }
        if let Some(unit) = descriptor.unit {
            builder = builder.with_unit(Unit::new(unit.to_string()));
        }
        Arc::new(CounterBridge(builder.init()))
    }

    fn gauge(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Gauge> {
        let cell = Arc::new(GaugeCell::default());
        let readings = Arc::clone(&cell);
        let mut builder = self
            .meter
            .f64_observable_gauge(descriptor.name.to_string())
            .with_callback(move |observer| {
                for (attributes, value) in readings.snapshot() {
                    observer.observe(value, &attributes);
                }
            });
        if let Some(description) = descriptor.description {
            builder = builder.with_description(description.to_string());
        }
        if let Some(unit) = descriptor.unit {
            builder = builder.with_unit(Unit::new(unit.to_string()));
        }
        // 回调注册后由 SDK 持有。
        let _ = builder.init();
        cell
    }

    fn histogram(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Histogram> {
        let mut builder = self.meter.f64_histogram(descriptor.name.to_string());
        if let Some(description) = descriptor.description {
            builder = builder.with_description(description.to_string());
        }
        if let Some(unit) = descriptor.unit {
            builder = builder.with_unit(Unit::new(unit.to_string()));
        }
        Arc::new(HistogramBridge(builder.init()))
    }
}

struct CounterBridge(OtelCounter<u64>);

impl Counter for CounterBridge {
    fn add(&self, value: u64, attributes: AttributeSet<'_>) {
        self.0.add(value, &to_otel_attributes(attributes));
    }
}

struct HistogramBridge(OtelHistogram<f64>);

impl Histogram for HistogramBridge {
    fn record(&self, value: f64, attributes: AttributeSet<'_>) {
        self.0.record(value, &to_otel_attributes(attributes));
    }
}

/// 瞬时值的本地单元格：每个属性组合保留最后一次写入。
#[derive(Default)]
struct GaugeCell {
    readings: Mutex<Vec<(Vec<OtelKeyValue>, f64)>>,
}

impl GaugeCell {
    fn snapshot(&self) -> Vec<(Vec<OtelKeyValue>, f64)> {
        self.readings.lock().clone()
    }
}

impl Gauge for GaugeCell {
    fn set(&self, value: f64, attributes: AttributeSet<'_>) {
        let attributes = to_otel_attributes(attributes);
        let mut readings = self.readings.lock();
        match readings.iter_mut().find(|(known, _)| *known == attributes) {
            Some((_, slot)) => *slot = value,
            None => readings.push((attributes, value)),
        }
    }
}
