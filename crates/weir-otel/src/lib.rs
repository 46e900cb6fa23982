//! weir-otel：把 weir-core 的自观测契约接到 OpenTelemetry 与 `tracing` 生态。
//!
//! # 教案式说明
//! - **意图（Why）**：weir-core 只定义对象安全的仪表与追踪契约，不绑定任何后端；宿主进程调用一次
//!   [`install`] 即可获得结构化日志、OpenTelemetry Span 导出，以及可直接交给组件的
//!   [`TelemetrySettings`]；
//! - **逻辑（How）**：
//!   1. 构建 SDK `TracerProvider` 并注册到 `opentelemetry::global`；
//!   2. 以 `fmt + EnvFilter + OpenTelemetry` 三层组装 `tracing` Subscriber 并设为全局默认；
//!   3. 用 [`OtelMeterProvider`] 与 [`OtelTracerProvider`] 组装 [`TelemetrySettings`]；
//! - **契约（What）**：安装只允许一次；`RUST_LOG` 未设置时日志级别默认 `info`。

mod attributes;
pub mod metrics;
pub mod resource;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod trace;

use std::sync::{Arc, OnceLock};

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{self as sdk_trace, TracerProvider};
use tracing::dispatcher;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use weir_core::TelemetrySettings;
use weir_core::observability::AttributeSet;

pub use metrics::OtelMeterProvider;
pub use resource::resource_from_attrs;
pub use trace::OtelTracerProvider;

/// 安装状态的全局缓存，确保 `install` 仅执行一次。
static INSTALL_STATE: OnceLock<InstallState> = OnceLock::new();

/// 安装过程可能出现的错误。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `install` 被重复调用。
    #[error("weir-otel 已完成安装，禁止重复调用 install")]
    AlreadyInstalled,
    /// 外部提前设置了全局 `tracing` Subscriber。
    #[error("全局 tracing Subscriber 已存在，weir-otel 无法覆盖")]
    SubscriberAlreadySet,
    /// 设置全局 Subscriber 失败的底层错误。
    #[error("设置 tracing 全局 Subscriber 失败: {0}")]
    SetGlobalSubscriber(#[from] dispatcher::SetGlobalDefaultError),
}

struct InstallState {
    provider: TracerProvider,
    telemetry: TelemetrySettings,
}

/// 零配置安装入口，等价于不带资源属性的 [`install_with_resource`]。
pub fn install() -> Result<TelemetrySettings, Error> {
    install_with_resource(&[])
}

/// 以给定资源属性安装 OpenTelemetry 与 `tracing` 全局设施。
///
/// # 契约说明（What）
/// - 多次调用返回 [`Error::AlreadyInstalled`]；外部已设置 Subscriber 时返回
///   [`Error::SubscriberAlreadySet`]；
/// - 成功时返回的 [`TelemetrySettings`] 可直接放入组件的 `CreateSettings`；
///   指标走 `opentelemetry::global` 中注册的 MeterProvider，未注册时为空操作。
pub fn install_with_resource(resource: AttributeSet<'_>) -> Result<TelemetrySettings, Error> {
    if INSTALL_STATE.get().is_some() {
        return Err(Error::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(Error::SubscriberAlreadySet);
    }

    let state = install_impl(resource_from_attrs(resource))?;
    let telemetry = state.telemetry.clone();
    INSTALL_STATE
        .set(state)
        .map_err(|_| Error::AlreadyInstalled)?;
    Ok(telemetry)
}

/// 已安装时返回同一份 [`TelemetrySettings`]。
pub fn installed() -> Option<TelemetrySettings> {
    INSTALL_STATE.get().map(|state| state.telemetry.clone())
}

/// 刷新已结束但尚未导出的 Span。
pub fn force_flush() {
    if let Some(state) = INSTALL_STATE.get() {
        for result in state.provider.force_flush() {
            if let Err(err) = result {
                tracing::warn!(error = %err, "span flush failed");
            }
        }
    }
}

fn install_impl(resource: Resource) -> Result<InstallState, Error> {
    let provider = build_tracer_provider(resource);
    global::set_tracer_provider(provider.clone());

    let tracer = provider.versioned_tracer(
        "weir",
        Some(env!("CARGO_PKG_VERSION")),
        None::<&'static str>,
        None,
    );
    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer));
    tracing::subscriber::set_global_default(subscriber)?;

    let telemetry = TelemetrySettings::new(
        Arc::new(OtelMeterProvider::global()),
        Arc::new(OtelTracerProvider::new(provider.clone())),
    );
    Ok(InstallState {
        provider,
        telemetry,
    })
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn build_tracer_provider(resource: Resource) -> TracerProvider {
    #[allow(unused_mut)]
    let mut builder = TracerProvider::builder().with_config(
        sdk_trace::config()
            .with_sampler(sdk_trace::Sampler::AlwaysOn)
            .with_resource(Resource::default().merge(&resource)),
    );

    #[cfg(feature = "test-util")]
    {
        builder = builder.with_simple_exporter(in_memory_exporter().clone());
    }

    builder.build()
}

#[cfg(feature = "test-util")]
fn in_memory_exporter() -> &'static testing::InMemorySpanExporter {
    static EXPORTER: OnceLock<testing::InMemorySpanExporter> = OnceLock::new();
    EXPORTER.get_or_init(testing::InMemorySpanExporter::default)
}

/// 安装后由全局提供者导出的 Span。
#[cfg(feature = "test-util")]
pub fn finished_spans() -> Vec<opentelemetry_sdk::export::trace::SpanData> {
    force_flush();
    in_memory_exporter().finished_spans()
}
