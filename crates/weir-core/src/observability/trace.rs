use std::sync::Arc;

use super::attributes::{AttributeSet, KeyValue};

/// 已开启的 Span。
///
/// # 契约说明（What）
/// - 由 [`Tracer::start_span`] 创建，调用 [`end`](ActiveSpan::end) 结束；
/// - 未显式结束即被丢弃时，实现应按已结束处理。
pub trait ActiveSpan: Send {
    /// 追加属性。
    fn set_attribute(&mut self, attribute: KeyValue<'static>);

    /// 记录错误状态。
    fn record_error(&mut self, code: &'static str, message: &str);

    /// 结束 Span。
    fn end(self: Box<Self>);
}

/// 追踪器：在某一作用域下开启 Span。
pub trait Tracer: Send + Sync + 'static {
    /// 开启新的 Span。
    fn start_span(&self, name: &'static str, attributes: AttributeSet<'_>) -> Box<dyn ActiveSpan>;
}

/// 追踪器提供者：按作用域名称分发 [`Tracer`]。
pub trait TracerProvider: Send + Sync + 'static {
    /// 获取指定作用域的追踪器。
    fn tracer(&self, scope: &'static str) -> Arc<dyn Tracer>;
}
