#![deny(unsafe_code)]
#![doc = "weir-core: 遥测数据面的跨信号路由与内存压力准入。"]
#![doc = ""]
#![doc = "== 模块总览 =="]
#![doc = "1. `signal`/`data`：信号种类、批次容器与确定性合成。"]
#![doc = "2. `consumer`/`fanout`：带能力描述符的消费者句柄，以及按 `mutates_data` 决定共享或克隆的扇出路由器。"]
#![doc = "3. `connector`：以 (源, 目标) 为键、构建期校验完毕的 3×3 转发注册表。"]
#![doc = "4. `limiter`：单写者、滞回双阈值的内存压力闸门与入口准入包装。"]
#![doc = ""]
#![doc = "自观测（指标、追踪）全部经由显式传入的 [`TelemetrySettings`] 获取，绝不读取隐式全局。"]

pub mod component;
pub mod connector;
pub mod consumer;
pub mod contract;
pub mod data;
pub mod error;
pub mod fanout;
pub mod limiter;
pub mod observability;
pub mod signal;
pub mod test_stubs;

mod sync;

pub use component::{ComponentId, CreateSettings, TelemetrySettings};
pub use connector::{Connector, ConnectorBuilder, ConnectorFactory};
pub use consumer::{AnyConsumer, Capabilities, Consumer, ConsumerHandle, consumer_fn};
pub use contract::{CallContext, Cancellation, ContractStateMachine, Deadline, StateAdvance};
pub use data::{Batch, LogsData, MetricsData, SignalData, TracesData};
pub use error::{
    AggregateError, ConfigurationError, DownstreamError, ErrorCategory, Refusal, WeirError,
};
pub use fanout::FanOut;
#[cfg(feature = "tokio")]
pub use limiter::MemoryLimiter;
pub use limiter::{
    AdmissionGuard, GateMonitor, GateState, GateThresholds, MemoryGate, MemoryLimiterConfig,
    Reclaimer, UsageProbe,
};
pub use signal::{SignalKind, SignalPair, StabilityLevel};

/// 统一结果别名，错误类型默认为 [`WeirError`]。
pub type Result<T, E = WeirError> = core::result::Result<T, E>;
