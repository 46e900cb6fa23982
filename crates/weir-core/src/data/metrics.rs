use std::collections::BTreeMap;

use crate::consumer::{AnyConsumer, ConsumerHandle};
use crate::data::SignalData;
use crate::signal::SignalKind;

const SYNTHETIC_EPOCH_NANOS: u64 = 1_581_452_773_000_000_000;

/// 指标数据点。
#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint {
    pub timestamp_unix_nanos: u64,
    pub value: f64,
    pub attributes: BTreeMap<String, String>,
}

/// 单个指标及其数据点。
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    pub points: Vec<DataPoint>,
}

/// 指标批次载荷；条目数量按指标个数计。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsData {
    pub metrics: Vec<Metric>,
}

impl MetricsData {
    /// 以指标列表构造载荷。
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self { metrics }
    }

    /// 全部数据点数量。
    pub fn point_count(&self) -> usize {
        self.metrics.iter().map(|metric| metric.points.len()).sum()
    }
}

impl SignalData for MetricsData {
    const KIND: SignalKind = SignalKind::Metrics;

    fn item_count(&self) -> usize {
        self.metrics.len()
    }

    fn synthesize(count: usize) -> Self {
        let metrics = (0..count)
            .map(|index| Metric {
                name: format!("counter-int-{index}"),
                unit: "1".to_string(),
                points: vec![DataPoint {
                    timestamp_unix_nanos: SYNTHETIC_EPOCH_NANOS + index as u64 * 1_000,
                    value: index as f64 + 1.0,
                    attributes: BTreeMap::from([(
                        "label-1".to_string(),
                        "label-value-1".to_string(),
                    )]),
                }],
            })
            .collect();
        Self { metrics }
    }

    fn stamp_attribute(&mut self, key: &str, value: &str) {
        for point in self
            .metrics
            .iter_mut()
            .flat_map(|metric| metric.points.iter_mut())
        {
            point.attributes.insert(key.to_string(), value.to_string());
        }
    }

    fn into_any(handle: ConsumerHandle<Self>) -> AnyConsumer {
        AnyConsumer::Metrics(handle)
    }

    fn from_any(any: AnyConsumer) -> Result<ConsumerHandle<Self>, AnyConsumer> {
        match any {
            AnyConsumer::Metrics(handle) => Ok(handle),
            other => Err(other),
        }
    }
}
