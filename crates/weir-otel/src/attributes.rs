//! weir 属性模型到 OpenTelemetry 属性的映射。

use opentelemetry::{KeyValue as OtelKeyValue, Value};
use weir_core::observability::{AttributeSet, KeyValue, MetricAttributeValue};

pub(crate) fn to_otel_value(value: &MetricAttributeValue<'_>) -> Value {
    match value {
        MetricAttributeValue::Text(text) => Value::from(text.to_string()),
        MetricAttributeValue::Bool(flag) => Value::Bool(*flag),
        MetricAttributeValue::F64(number) => Value::F64(*number),
        MetricAttributeValue::I64(number) => Value::I64(*number),
        other => Value::from(format!("{other:?}")),
    }
}

pub(crate) fn to_otel_key_value(attribute: &KeyValue<'_>) -> OtelKeyValue {
    OtelKeyValue::new(attribute.key.to_string(), to_otel_value(&attribute.value))
}

pub(crate) fn to_otel_attributes(attributes: AttributeSet<'_>) -> Vec<OtelKeyValue> {
    attributes.iter().map(to_otel_key_value).collect()
}
