use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigurationError, WeirError};

use super::GateThresholds;
use super::probe::UsageProbe;

const MIB: u64 = 1024 * 1024;
/// 未配置峰值余量时，取硬阈值的五分之一。
const DEFAULT_SPIKE_DIVISOR: u64 = 5;

/// 内存闸门配置。
///
/// # 契约说明（What）
/// - `check_interval_ms` 必须大于 0；
/// - 绝对形式（`limit_mib`/`spike_limit_mib`）与百分比形式（`limit_percentage`/`spike_limit_percentage`）
///   二选一，且必须设置其一；0 表示未设置；
/// - 百分比不超过 100，峰值余量必须严格小于上限；
/// - 硬阈值 = 上限，软阈值 = 上限 − 峰值余量；未设置峰值余量时取上限的 20%；
/// - 百分比形式需要探针报告系统总内存，否则解析阈值时返回 [`WeirError::MeasurementUnavailable`]。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryLimiterConfig {
    pub check_interval_ms: u64,
    pub limit_mib: u64,
    pub spike_limit_mib: u64,
    pub limit_percentage: u32,
    pub spike_limit_percentage: u32,
}

impl MemoryLimiterConfig {
    /// 从 TOML 文本解析并校验。
    pub fn from_toml_str(text: &str) -> Result<Self, WeirError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigurationError::Malformed {
            reason: err.to_string().into(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 监控周期。
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// 校验字段组合，不访问探针。
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.check_interval_ms == 0 {
            return Err(ConfigurationError::InvalidCheckInterval);
        }
        let absolute = self.limit_mib > 0 || self.spike_limit_mib > 0;
        let percentage = self.limit_percentage > 0 || self.spike_limit_percentage > 0;
        match (absolute, percentage) {
            (true, true) => Err(invalid(
                "absolute and percentage limits are mutually exclusive",
            )),
            (false, false) => Err(invalid("either limit_mib or limit_percentage must be set")),
            (true, false) => {
                if self.limit_mib == 0 {
                    return Err(invalid("spike_limit_mib requires limit_mib"));
                }
                if self.spike_limit_mib >= self.limit_mib {
                    return Err(invalid("spike_limit_mib must be smaller than limit_mib"));
                }
                Ok(())
            }
            (false, true) => {
                if self.limit_percentage == 0 {
                    return Err(invalid("spike_limit_percentage requires limit_percentage"));
                }
                if self.limit_percentage > 100 {
                    return Err(invalid("limit_percentage must not exceed 100"));
                }
                if self.spike_limit_percentage >= self.limit_percentage {
                    return Err(invalid(
                        "spike_limit_percentage must be smaller than limit_percentage",
                    ));
                }
                Ok(())
            }
        }
    }

    /// 解析为闸门阈值。
    pub fn thresholds(&self, probe: &mut dyn UsageProbe) -> Result<GateThresholds, WeirError> {
        self.validate()?;
        let (hard, spike) = if self.limit_mib > 0 {
            let hard = mib_to_bytes(self.limit_mib)?;
            let spike = match self.spike_limit_mib {
                0 => hard / DEFAULT_SPIKE_DIVISOR,
                mib => mib_to_bytes(mib)?,
            };
            (hard, spike)
        } else {
            let total = probe.total_memory()?;
            let hard = percent_of(total, self.limit_percentage);
            let spike = match self.spike_limit_percentage {
                0 => hard / DEFAULT_SPIKE_DIVISOR,
                percentage => percent_of(total, percentage),
            };
            (hard, spike)
        };
        let soft = hard.saturating_sub(spike);
        Ok(GateThresholds::new(soft, hard, self.check_interval())?)
    }
}

fn invalid(reason: &'static str) -> ConfigurationError {
    ConfigurationError::InvalidLimits {
        reason: reason.into(),
    }
}

fn mib_to_bytes(mib: u64) -> Result<u64, ConfigurationError> {
    mib.checked_mul(MIB)
        .ok_or_else(|| invalid("limit does not fit in 64 bits"))
}

fn percent_of(total: u64, percentage: u32) -> u64 {
    let bytes = u128::from(total) * u128::from(percentage) / 100;
    u64::try_from(bytes).unwrap_or(u64::MAX)
}
