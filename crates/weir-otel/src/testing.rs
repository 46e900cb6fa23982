//! 测试辅助：收集已导出 Span 的内存导出器。

use std::sync::Arc;

use futures_util::future::BoxFuture;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use parking_lot::Mutex;

/// 把导出的 Span 追加到内存缓冲的导出器。
///
/// # 教案式说明
/// - **意图（Why）**：只保留“收集已完成 Span 供断言”这一能力，避免为测试启用 SDK 的 `testing`
///   特性及其附带的异步运行时依赖；
/// - **契约（What）**：克隆共享同一缓冲；`shutdown` 清空缓冲。
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemorySpanExporter {
    /// 已导出 Span 的快照。
    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    /// 清空缓冲。
    pub fn reset(&self) {
        self.spans.lock().clear();
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&mut self, mut batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        self.spans.lock().append(&mut batch);
        Box::pin(async { Ok(()) })
    }

    fn shutdown(&mut self) {
        self.reset();
    }
}
