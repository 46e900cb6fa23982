//! 测试桩集合：记录型自观测提供者、脚本化探针、记录型消费者与计数回收钩子。
//!
//! # 设计定位（Why）
//! - 单元测试与集成测试都需要断言“发出了哪些指标与 Span”“下游收到了哪个批次实例”，
//!   统一出口避免每个测试文件重复定义桩类型；
//! - 空操作实现位于 [`crate::observability::noop`]，这里只放带记录能力的实现。
//!
//! # 契约说明（What）
//! - 所有桩类型都是 `Clone`，克隆共享同一份记录，测试可以先交出一个副本再用另一个副本断言；
//! - 桩对象只用于测试与演示，不做任何 I/O。

pub mod consumer;
pub mod observability;
pub mod probe;

pub use consumer::{CountingReclaimer, RECORDER_MARK_KEY, RecordingConsumer};
pub use observability::{
    InstrumentKind, MetricRecord, RecordingMeterProvider, RecordingTracerProvider, SpanRecord,
    recording_telemetry,
};
pub use probe::ScriptedProbe;
