use opentelemetry_sdk::Resource;
use weir_core::observability::AttributeSet;

use crate::attributes::to_otel_attributes;

/// 根据 weir 的属性集合构造 OpenTelemetry `Resource`。
///
/// # 教案式说明
/// - **意图（Why）**：宿主用与自观测相同的属性类型描述进程（服务名、部署环境），避免两套标签模型；
/// - **逻辑（How）**：逐条映射为 OpenTelemetry 的 `KeyValue`，再交给 [`Resource::new`]；
/// - **契约（What）**：
///   - 返回的 `Resource` 不包含 schema URL；
///   - 重复键保留最后一次出现的值。
pub fn resource_from_attrs(attrs: AttributeSet<'_>) -> Resource {
    Resource::new(to_otel_attributes(attrs))
}
