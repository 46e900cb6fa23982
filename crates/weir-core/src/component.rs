use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::observability::{MeterProvider, NoopMeterProvider, NoopTracerProvider, TracerProvider};

/// 组件标识：类型名加可选实例名，显示为 `type` 或 `type/name`。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentId {
    type_name: Cow<'static, str>,
    name: Option<Cow<'static, str>>,
}

impl ComponentId {
    /// 仅含类型名的标识。
    pub fn new(type_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
        }
    }

    /// 带实例名的标识。
    pub fn with_name(
        type_name: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            name: Some(name.into()),
        }
    }

    /// 组件类型名。
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// 实例名。
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/{}", self.type_name, name),
            None => f.write_str(&self.type_name),
        }
    }
}

/// 自观测提供者集合。
///
/// # 教案式说明
/// - **意图 (Why)**：组件的指标与 Span 必须能在测试中被替换和断言，因此提供者作为构造参数显式传入；
/// - **契约 (What)**：克隆只复制 `Arc`；[`noop`](Self::noop) 返回丢弃全部数据的实现。
#[derive(Clone)]
pub struct TelemetrySettings {
    pub meter_provider: Arc<dyn MeterProvider>,
    pub tracer_provider: Arc<dyn TracerProvider>,
}

impl TelemetrySettings {
    /// 以给定提供者构造。
    pub fn new(
        meter_provider: Arc<dyn MeterProvider>,
        tracer_provider: Arc<dyn TracerProvider>,
    ) -> Self {
        Self {
            meter_provider,
            tracer_provider,
        }
    }

    /// 丢弃全部自观测数据。
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopMeterProvider), Arc::new(NoopTracerProvider))
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for TelemetrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetrySettings").finish_non_exhaustive()
    }
}

/// 组件构造参数。
#[derive(Clone, Debug)]
pub struct CreateSettings {
    pub id: ComponentId,
    pub telemetry: TelemetrySettings,
}

impl CreateSettings {
    /// 构造参数。
    pub fn new(id: ComponentId, telemetry: TelemetrySettings) -> Self {
        Self { id, telemetry }
    }
}
