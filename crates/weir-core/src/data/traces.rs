use std::collections::BTreeMap;

use crate::consumer::{AnyConsumer, ConsumerHandle};
use crate::data::SignalData;
use crate::signal::SignalKind;

/// 合成数据使用的固定起始时间（Unix 纳秒）。
const SYNTHETIC_EPOCH_NANOS: u64 = 1_581_452_772_000_000_000;

/// 单个 Span。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub trace_id: [u8; 16],
    pub span_id: [u8; 8],
    pub name: String,
    pub start_unix_nanos: u64,
    pub end_unix_nanos: u64,
    pub attributes: BTreeMap<String, String>,
}

/// 链路追踪批次载荷。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TracesData {
    pub spans: Vec<Span>,
}

impl TracesData {
    /// 以 Span 列表构造载荷。
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }
}

impl SignalData for TracesData {
    const KIND: SignalKind = SignalKind::Traces;

    fn item_count(&self) -> usize {
        self.spans.len()
    }

    fn synthesize(count: usize) -> Self {
        let spans = (0..count)
            .map(|index| {
                let seq = index as u64;
                let mut trace_id = [0u8; 16];
                trace_id[8..].copy_from_slice(&(seq + 1).to_be_bytes());
                Span {
                    trace_id,
                    span_id: (seq + 1).to_be_bytes(),
                    name: format!("operation-{index}"),
                    start_unix_nanos: SYNTHETIC_EPOCH_NANOS + seq * 1_000,
                    end_unix_nanos: SYNTHETIC_EPOCH_NANOS + seq * 1_000 + 500,
                    attributes: BTreeMap::from([(
                        "resource-attr".to_string(),
                        "resource-attr-val-1".to_string(),
                    )]),
                }
            })
            .collect();
        Self { spans }
    }

    fn stamp_attribute(&mut self, key: &str, value: &str) {
        for span in &mut self.spans {
            span.attributes.insert(key.to_string(), value.to_string());
        }
    }

    fn into_any(handle: ConsumerHandle<Self>) -> AnyConsumer {
        AnyConsumer::Traces(handle)
    }

    fn from_any(any: AnyConsumer) -> Result<ConsumerHandle<Self>, AnyConsumer> {
        match any {
            AnyConsumer::Traces(handle) => Ok(handle),
            other => Err(other),
        }
    }
}
