use std::sync::Arc;

use opentelemetry::KeyValue as OtelKeyValue;
use opentelemetry::trace::{Span as _, Status, Tracer as _, TracerProvider as _};
use opentelemetry_sdk::trace::{Span, Tracer, TracerProvider};
use weir_core::observability::metrics::contract::connector::ATTR_ERROR_CODE;
use weir_core::observability::{self, ActiveSpan, AttributeSet, KeyValue};

use crate::attributes::{to_otel_attributes, to_otel_key_value};

/// OpenTelemetry 版本的 [`observability::TracerProvider`]。
///
/// # 教案式说明
/// - **意图（Why）**：连接器的每次转发都会开启一个 Span，接入 SDK 后这些 Span 直接进入导出管线；
/// - **逻辑（How）**：作用域名称作为 instrumentation scope 传给 SDK，Span 属性逐条映射；
/// - **契约（What）**：[`ActiveSpan::record_error`] 同时写入 `error.code` 属性与 `Error` 状态。
#[derive(Clone)]
pub struct OtelTracerProvider {
    provider: TracerProvider,
}

impl OtelTracerProvider {
    /// 包装 SDK 的追踪器提供者。
    pub fn new(provider: TracerProvider) -> Self {
        Self { provider }
    }
}

impl observability::TracerProvider for OtelTracerProvider {
    fn tracer(&self, scope: &'static str) -> Arc<dyn observability::Tracer> {
        Arc::new(OtelScopedTracer {
            tracer: self.provider.versioned_tracer(
                scope,
                Some(env!("CARGO_PKG_VERSION")),
                None::<&'static str>,
                None,
            ),
        })
    }
}

struct OtelScopedTracer {
    tracer: Tracer,
}

impl observability::Tracer for OtelScopedTracer {
    fn start_span(&self, name: &'static str, attributes: AttributeSet<'_>) -> Box<dyn ActiveSpan> {
        let mut builder = self.tracer.span_builder(name);
        builder.attributes = Some(to_otel_attributes(attributes));
        Box::new(OtelActiveSpan {
            span: self.tracer.build(builder),
        })
    }
}

/// 持有 SDK Span；丢弃时由 SDK 负责结束。
struct OtelActiveSpan {
    span: Span,
}

impl ActiveSpan for OtelActiveSpan {
    fn set_attribute(&mut self, attribute: KeyValue<'static>) {
        self.span.set_attribute(to_otel_key_value(&attribute));
    }

    fn record_error(&mut self, code: &'static str, message: &str) {
        self.span.set_attribute(OtelKeyValue::new(ATTR_ERROR_CODE, code));
        self.span.set_status(Status::error(message.to_string()));
    }

    fn end(mut self: Box<Self>) {
        self.span.end();
    }
}
