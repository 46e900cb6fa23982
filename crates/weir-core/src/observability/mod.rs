//! 自观测契约模块：指标、追踪与属性建模。
//!
//! # 设计背景（Why）
//! - 数据面组件需要上报自身状态（闸门状态、拒绝次数、转发批次），但核心 crate 不绑定任何后端；
//! - 契约以对象安全 trait 表达，后端（如 `weir-otel` 的 OpenTelemetry 桥接）在装配时注入。
//!
//! # 模块概览（How）
//! - [`attributes`]：键值对建模；
//! - [`metrics`]：计数器、瞬时值仪表、直方图与作用域化的 [`MeterProvider`]，以及指标命名契约；
//! - [`trace`]：Span 与 [`TracerProvider`]；
//! - [`noop`]：未接入后端时的空操作实现。
//!
//! # 使用契约（What）
//! - 提供者只经由 [`TelemetrySettings`](crate::TelemetrySettings) 传入，禁止读取隐式全局。

pub mod attributes;
pub mod metrics;
pub mod noop;
pub mod trace;

pub use attributes::{AttributeKey, AttributeSet, KeyValue, MetricAttributeValue, OwnedAttributeSet};
pub use metrics::{Counter, Gauge, Histogram, InstrumentDescriptor, Meter, MeterProvider};
pub use noop::{NoopMeterProvider, NoopTracerProvider};
pub use trace::{ActiveSpan, Tracer, TracerProvider};
