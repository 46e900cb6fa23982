//! 内存闸门集成测试。
//!
//! - `hysteresis`：双阈值滞回、测量失败放行、回收钩子时序；
//! - `admission`：准入拒绝、入口包装与自观测；
//! - `lifecycle`：配置解析与后台监控任务的启动、关闭、重启。

mod admission;
mod hysteresis;

use std::time::Duration;

use weir_core::test_stubs::ScriptedProbe;
use weir_core::{ComponentId, CreateSettings, GateMonitor, GateThresholds, TelemetrySettings};

pub(crate) const SOFT: u64 = 750;
pub(crate) const HARD: u64 = 900;

pub(crate) fn settings() -> CreateSettings {
    CreateSettings::new(
        ComponentId::new("memory_limiter"),
        TelemetrySettings::noop(),
    )
}

pub(crate) fn thresholds(interval: Duration) -> GateThresholds {
    GateThresholds::new(SOFT, HARD, interval).expect("750 < 900 且周期非零")
}

/// 以 750/900 阈值与脚本化探针构造写者。
pub(crate) fn scripted_monitor(probe: &ScriptedProbe) -> GateMonitor {
    GateMonitor::new(thresholds(Duration::from_secs(1)), probe.clone(), &settings())
}
