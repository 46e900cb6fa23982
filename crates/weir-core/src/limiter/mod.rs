//! # limiter 模块说明
//!
//! ## 角色定位（Why）
//! - 在数据进入管线之前保护进程自身的内存预算：占用越过硬阈值后拒绝新数据，回落到软阈值以下才恢复；
//! - 双阈值滞回避免在单一阈值附近来回抖动。
//!
//! ## 核心契约（What）
//! - 状态只有 [`GateState::Normal`]（放行）与 [`GateState::Limited`]（拒绝）；
//! - 唯一写者是 [`GateMonitor`]，状态只在一次监控周期（tick）内变化；
//! - 读者 [`MemoryGate`] 的准入检查为 O(1)、无锁、无 I/O，`Limited` 时返回可恢复的
//!   [`WeirError::ResourceExhausted`](crate::WeirError::ResourceExhausted)；
//! - 测量失败时按放行处理（fail open），记录告警并计数。
//!
//! ## 模块结构（How）
//! - [`gate`]：共享状态单元、读者与写者；
//! - [`config`]：可反序列化的阈值配置；
//! - [`probe`]：内存占用测量；
//! - [`ingress`]：入口准入包装；
//! - `monitor`（`tokio` 特性）：按固定周期驱动写者的后台任务与组件生命周期。

pub mod config;
pub mod gate;
pub mod ingress;
#[cfg(feature = "tokio")]
pub mod monitor;
pub mod probe;

use std::fmt;
use std::time::Duration;

use crate::error::ConfigurationError;

pub use config::MemoryLimiterConfig;
pub use gate::{GateMonitor, MemoryGate, NoopReclaimer, Reclaimer, UsageSample};
pub use ingress::AdmissionGuard;
#[cfg(feature = "tokio")]
pub use monitor::MemoryLimiter;
pub use probe::{ProcessRssProbe, UsageProbe};

/// 闸门状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GateState {
    /// 放行。
    Normal = 0,
    /// 拒绝新数据。
    Limited = 1,
}

impl GateState {
    pub(crate) const fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => GateState::Limited,
            _ => GateState::Normal,
        }
    }

    /// 稳定的小写名称。
    pub const fn as_str(self) -> &'static str {
        match self {
            GateState::Normal => "normal",
            GateState::Limited => "limited",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 闸门阈值，构造后不可变。
///
/// # 契约说明（What）
/// - `soft_limit < hard_limit`，单位字节；
/// - `check_interval > 0`，即监控周期。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateThresholds {
    soft_limit: u64,
    hard_limit: u64,
    check_interval: Duration,
}

impl GateThresholds {
    /// 校验并构造阈值。
    pub fn new(
        soft_limit: u64,
        hard_limit: u64,
        check_interval: Duration,
    ) -> Result<Self, ConfigurationError> {
        if soft_limit >= hard_limit {
            return Err(ConfigurationError::InvalidLimits {
                reason: format!(
                    "soft limit {soft_limit} must be strictly below hard limit {hard_limit}"
                )
                .into(),
            });
        }
        if check_interval.is_zero() {
            return Err(ConfigurationError::InvalidCheckInterval);
        }
        Ok(Self {
            soft_limit,
            hard_limit,
            check_interval,
        })
    }

    /// 软阈值：`Limited` 状态下占用回落到该值及以下时恢复放行。
    pub fn soft_limit(&self) -> u64 {
        self.soft_limit
    }

    /// 硬阈值：`Normal` 状态下占用达到该值及以上时开始拒绝。
    pub fn hard_limit(&self) -> u64 {
        self.hard_limit
    }

    /// 监控周期。
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// 纯函数形式的状态转移：给定当前状态与测得占用，返回下一状态。
    pub fn next_state(&self, current: GateState, usage: u64) -> GateState {
        match current {
            GateState::Normal if usage >= self.hard_limit => GateState::Limited,
            GateState::Limited if usage <= self.soft_limit => GateState::Normal,
            unchanged => unchanged,
        }
    }
}
