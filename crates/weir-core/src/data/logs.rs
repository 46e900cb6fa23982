use std::collections::BTreeMap;

use crate::consumer::{AnyConsumer, ConsumerHandle};
use crate::data::SignalData;
use crate::signal::SignalKind;

const SYNTHETIC_EPOCH_NANOS: u64 = 1_581_452_774_000_000_000;

/// 单条日志记录。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp_unix_nanos: u64,
    pub severity_text: String,
    pub body: String,
    pub attributes: BTreeMap<String, String>,
}

/// 日志批次载荷。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogsData {
    pub records: Vec<LogRecord>,
}

impl LogsData {
    /// 以日志记录构造载荷。
    pub fn new(records: Vec<LogRecord>) -> Self {
        Self { records }
    }
}

impl SignalData for LogsData {
    const KIND: SignalKind = SignalKind::Logs;

    fn item_count(&self) -> usize {
        self.records.len()
    }

    fn synthesize(count: usize) -> Self {
        let records = (0..count)
            .map(|index| LogRecord {
                timestamp_unix_nanos: SYNTHETIC_EPOCH_NANOS + index as u64 * 1_000,
                severity_text: if index % 2 == 0 { "Info" } else { "Warning" }.to_string(),
                body: format!("This is a log message #{index}"),
                attributes: BTreeMap::from([("app".to_string(), "server".to_string())]),
            })
            .collect();
        Self { records }
    }

    fn stamp_attribute(&mut self, key: &str, value: &str) {
        for record in &mut self.records {
            record.attributes.insert(key.to_string(), value.to_string());
        }
    }

    fn into_any(handle: ConsumerHandle<Self>) -> AnyConsumer {
        AnyConsumer::Logs(handle)
    }

    fn from_any(any: AnyConsumer) -> Result<ConsumerHandle<Self>, AnyConsumer> {
        match any {
            AnyConsumer::Logs(handle) => Ok(handle),
            other => Err(other),
        }
    }
}
