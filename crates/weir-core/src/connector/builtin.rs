//! 内置连接器：`example`（九个信号对全部实现）与 `forward`（仅同种类转发）。
//!
//! # 行为说明（What）
//! - 同种类信号对原样转发；配置为修改型时，先为每个条目写入 [`MUTATION_MARKER_KEY`] 再转发；
//! - 跨种类信号对按输入条目数确定性地合成目标种类批次，输入批次保持不变（修改型配置同样先写标记）；
//! - 配置 `mutates_data = true` 或实例名为 `mutate` 时，全部转发路径声明为修改型；
//! - 同种类转发把原实例交给下游，因此下游为修改型时该路径同样声明为修改型；跨种类路径交出的是新批次，
//!   不受下游能力影响。

use std::marker::PhantomData;

use serde::Deserialize;

use crate::component::CreateSettings;
use crate::consumer::{Capabilities, Consumer, ConsumerHandle};
use crate::contract::CallContext;
use crate::data::{Batch, SignalData};
use crate::error::{ConfigurationError, WeirError};
use crate::signal::StabilityLevel;

use super::ConnectorFactory;

/// `example` 连接器类型名。
pub const EXAMPLE_TYPE: &str = "example";
/// `forward` 连接器类型名。
pub const FORWARD_TYPE: &str = "forward";
/// 修改型转发写入的属性键。
pub const MUTATION_MARKER_KEY: &str = "weir.connector.mutated_by";
/// 实例名为该值时视为修改型。
pub const MUTATING_INSTANCE_NAME: &str = "mutate";

/// 内置连接器配置。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExampleConnectorConfig {
    /// 是否就地修改经过的批次。
    pub mutates_data: bool,
}

impl ExampleConnectorConfig {
    /// 从 TOML 文本解析。
    pub fn from_toml_str(text: &str) -> Result<Self, WeirError> {
        toml::from_str(text).map_err(|err| {
            ConfigurationError::Malformed {
                reason: err.to_string().into(),
            }
            .into()
        })
    }
}

/// 实现全部九个信号对的 `example` 连接器工厂。
pub fn example_factory() -> ConnectorFactory<ExampleConnectorConfig> {
    let stability = StabilityLevel::Development;
    ConnectorFactory::new(EXAMPLE_TYPE, ExampleConnectorConfig::default)
        .with_traces_to_traces(passthrough, stability)
        .with_traces_to_metrics(convert, stability)
        .with_traces_to_logs(convert, stability)
        .with_metrics_to_traces(convert, stability)
        .with_metrics_to_metrics(passthrough, stability)
        .with_metrics_to_logs(convert, stability)
        .with_logs_to_traces(convert, stability)
        .with_logs_to_metrics(convert, stability)
        .with_logs_to_logs(passthrough, stability)
}

/// 仅实现同种类转发的 `forward` 连接器工厂。
pub fn forward_factory() -> ConnectorFactory<ExampleConnectorConfig> {
    let stability = StabilityLevel::Development;
    ConnectorFactory::new(FORWARD_TYPE, ExampleConnectorConfig::default)
        .with_traces_to_traces(passthrough, stability)
        .with_metrics_to_metrics(passthrough, stability)
        .with_logs_to_logs(passthrough, stability)
}

fn mutates(settings: &CreateSettings, config: &ExampleConnectorConfig) -> bool {
    config.mutates_data || settings.id.name() == Some(MUTATING_INSTANCE_NAME)
}

fn passthrough<D: SignalData>(
    settings: &CreateSettings,
    config: &ExampleConnectorConfig,
    next: ConsumerHandle<D>,
) -> Result<ConsumerHandle<D>, WeirError> {
    let marker = mutates(settings, config).then(|| settings.id.to_string());
    // 原实例直接交给下游，下游的修改能力随之上浮。
    let capabilities = Capabilities::new(marker.is_some()).union(next.capabilities());
    Ok(ConsumerHandle::new(Passthrough { next, marker }, capabilities))
}

fn convert<S: SignalData, T: SignalData>(
    settings: &CreateSettings,
    config: &ExampleConnectorConfig,
    next: ConsumerHandle<T>,
) -> Result<ConsumerHandle<S>, WeirError> {
    let marker = mutates(settings, config).then(|| settings.id.to_string());
    let capabilities = Capabilities::new(marker.is_some());
    Ok(ConsumerHandle::new(
        Convert {
            next,
            marker,
            _source: PhantomData,
        },
        capabilities,
    ))
}

fn stamp<D: SignalData>(batch: &Batch<D>, marker: Option<&str>) -> Result<(), WeirError> {
    match marker {
        Some(value) => batch.mutate(|data| data.stamp_attribute(MUTATION_MARKER_KEY, value)),
        None => Ok(()),
    }
}

struct Passthrough<D: SignalData> {
    next: ConsumerHandle<D>,
    marker: Option<String>,
}

impl<D: SignalData> Consumer<D> for Passthrough<D> {
    fn consume(&self, ctx: &CallContext, batch: Batch<D>) -> Result<(), WeirError> {
        stamp(&batch, self.marker.as_deref())?;
        self.next.consume(ctx, batch)
    }
}

struct Convert<S, T: SignalData> {
    next: ConsumerHandle<T>,
    marker: Option<String>,
    _source: PhantomData<fn(S)>,
}

impl<S: SignalData, T: SignalData> Consumer<S> for Convert<S, T> {
    fn consume(&self, ctx: &CallContext, batch: Batch<S>) -> Result<(), WeirError> {
        stamp(&batch, self.marker.as_deref())?;
        let converted = Batch::<T>::synthesize(batch.item_count());
        self.next.consume(ctx, converted)
    }
}
