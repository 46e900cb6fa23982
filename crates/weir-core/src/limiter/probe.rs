use crate::error::WeirError;

/// 内存占用探针。
///
/// # 契约说明（What）
/// - `sample` 返回当前进程占用（字节）；无法测量时返回 [`WeirError::MeasurementUnavailable`]；
/// - `total_memory` 返回系统总内存（字节），百分比形式的阈值配置依赖它；
/// - 探针只被唯一写者调用，因此以 `&mut self` 推进内部状态。
pub trait UsageProbe: Send + 'static {
    /// 测量当前占用。
    fn sample(&mut self) -> Result<u64, WeirError>;

    /// 系统总内存。
    fn total_memory(&mut self) -> Result<u64, WeirError> {
        Err(WeirError::measurement_unavailable(
            "probe does not report total memory",
        ))
    }
}

impl<P: UsageProbe + ?Sized> UsageProbe for Box<P> {
    fn sample(&mut self) -> Result<u64, WeirError> {
        (**self).sample()
    }

    fn total_memory(&mut self) -> Result<u64, WeirError> {
        (**self).total_memory()
    }
}

/// 读取 `/proc` 的常驻内存探针。
///
/// 占用取 `/proc/self/status` 的 `VmRSS`，总内存取 `/proc/meminfo` 的 `MemTotal`；
/// 其他平台一律报告测量不可用，闸门随之按放行处理。
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRssProbe;

impl ProcessRssProbe {
    const STATUS_PATH: &'static str = "/proc/self/status";
    const MEMINFO_PATH: &'static str = "/proc/meminfo";

    fn read_field(path: &'static str, field: &'static str) -> Result<u64, WeirError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            WeirError::measurement_unavailable(format!("cannot read {path}: {err}"))
        })?;
        parse_kib_field(&text, field).ok_or_else(|| {
            WeirError::measurement_unavailable(format!("{path} has no usable `{field}` entry"))
        })
    }
}

impl UsageProbe for ProcessRssProbe {
    fn sample(&mut self) -> Result<u64, WeirError> {
        Self::read_field(Self::STATUS_PATH, "VmRSS")
    }

    fn total_memory(&mut self) -> Result<u64, WeirError> {
        Self::read_field(Self::MEMINFO_PATH, "MemTotal")
    }
}

/// 解析 `Field:   1234 kB` 形式的行，返回字节数。
pub(crate) fn parse_kib_field(text: &str, field: &str) -> Option<u64> {
    text.lines().find_map(|line| {
        let rest = line.strip_prefix(field)?.strip_prefix(':')?;
        let mut parts = rest.split_whitespace();
        let value: u64 = parts.next()?.parse().ok()?;
        match parts.next() {
            Some("kB") | None => value.checked_mul(1024),
            Some(_) => None,
        }
    })
}
