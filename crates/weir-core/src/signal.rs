use core::fmt;

/// 遥测信号种类。
///
/// # 设计背景（Why）
/// - 连接器路由矩阵以 `(源, 目标)` 信号种类为键，需要一个可作为数组下标的稳定枚举；
/// - 种类在批次生命周期内不可变，转换总是生成新批次。
///
/// # 契约说明（What）
/// - [`SignalKind::index`] 返回 `0..SignalKind::COUNT` 内的稳定下标，供固定尺寸表使用；
/// - [`SignalKind::ALL`] 的顺序与下标一致。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKind {
    /// 链路追踪 Span。
    Traces,
    /// 指标数据点。
    Metrics,
    /// 日志记录。
    Logs,
}

impl SignalKind {
    /// 信号种类数量，即路由矩阵的边长。
    pub const COUNT: usize = 3;

    /// 全部信号种类，顺序与 [`index`](Self::index) 一致。
    pub const ALL: [SignalKind; SignalKind::COUNT] =
        [SignalKind::Traces, SignalKind::Metrics, SignalKind::Logs];

    /// 固定尺寸注册表中的下标。
    pub const fn index(self) -> usize {
        match self {
            SignalKind::Traces => 0,
            SignalKind::Metrics => 1,
            SignalKind::Logs => 2,
        }
    }

    /// 稳定的小写名称，用于日志与指标标签。
    pub const fn as_str(self) -> &'static str {
        match self {
            SignalKind::Traces => "traces",
            SignalKind::Metrics => "metrics",
            SignalKind::Logs => "logs",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 有向信号对 `(source, destination)`，九种组合之一。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalPair {
    pub source: SignalKind,
    pub destination: SignalKind,
}

impl SignalPair {
    /// 构造信号对。
    pub const fn new(source: SignalKind, destination: SignalKind) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// 按 `source` 优先的顺序枚举全部九个组合。
    pub fn all() -> impl Iterator<Item = SignalPair> {
        SignalKind::ALL.into_iter().flat_map(|source| {
            SignalKind::ALL
                .into_iter()
                .map(move |destination| SignalPair::new(source, destination))
        })
    }

    /// 是否为同种类转发（如 traces→traces）。
    pub const fn is_same_kind(&self) -> bool {
        self.source.index() == self.destination.index()
    }
}

impl fmt::Display for SignalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.destination)
    }
}

/// 组件在某个信号对上的稳定性等级，由连接器工厂逐对声明。
///
/// # 契约说明（What）
/// - 等级仅用于构建期提示：`Deprecated`/`Unmaintained` 会在装配时输出告警日志；
/// - 等级不影响运行时转发行为。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StabilityLevel {
    Undefined,
    Unmaintained,
    Deprecated,
    Development,
    Alpha,
    Beta,
    Stable,
}

impl StabilityLevel {
    /// 稳定的小写名称。
    pub const fn as_str(self) -> &'static str {
        match self {
            StabilityLevel::Undefined => "undefined",
            StabilityLevel::Unmaintained => "unmaintained",
            StabilityLevel::Deprecated => "deprecated",
            StabilityLevel::Development => "development",
            StabilityLevel::Alpha => "alpha",
            StabilityLevel::Beta => "beta",
            StabilityLevel::Stable => "stable",
        }
    }

    /// 装配时是否应提示使用者迁移。
    pub const fn warrants_warning(self) -> bool {
        matches!(
            self,
            StabilityLevel::Deprecated | StabilityLevel::Unmaintained
        )
    }
}

impl fmt::Display for StabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
