//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义数据面对外暴露的错误语义：装配期配置错误、下游失败、扇出聚合、准入拒绝、测量不可用与取消；
//! - 每个错误都携带稳定错误码与 [`ErrorCategory`]，上游据此决定重试、退避或放弃，而无需解析字符串。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 [`thiserror::Error`]，满足 `Send + Sync + 'static`；
//! - 连接器与扇出路由器从不吞掉错误：下游错误原样返回，多分支失败合并为 [`AggregateError`]；
//! - 任何“预期中的压力或下游失败”都以错误值沿数据调用链返回，不会触发 panic。

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::signal::{SignalKind, SignalPair};

/// 稳定错误码，遵循 `<领域>.<语义>` 命名。
pub mod codes {
    /// 装配期配置错误。
    pub const CONFIGURATION: &str = "weir.configuration";
    /// 下游消费者处理失败。
    pub const DOWNSTREAM: &str = "weir.downstream";
    /// 扇出多分支失败的聚合。
    pub const FANOUT_AGGREGATE: &str = "weir.fanout.aggregate";
    /// 内存闸门拒绝准入。
    pub const RESOURCE_EXHAUSTED: &str = "weir.resource_exhausted";
    /// 本轮无法测量内存占用。
    pub const MEASUREMENT_UNAVAILABLE: &str = "weir.measurement_unavailable";
    /// 调用上下文已取消。
    pub const CANCELLED: &str = "weir.cancelled";
    /// 调用上下文截止时间已过。
    pub const DEADLINE_EXCEEDED: &str = "weir.deadline_exceeded";
    /// 试图修改只读批次。
    pub const READ_ONLY_BATCH: &str = "weir.read_only_batch";
}

/// 错误分类，驱动上游的自动化处置策略。
///
/// # 契约说明（What）
/// - `Retryable`：上游可稍后重试（如测量暂不可用）；
/// - `ResourceExhausted`：准入被拒，上游应退避后重试；
/// - `NonRetryable`：重试无意义，通常是装配或契约违规；
/// - `Aggregate`：多分支失败，需逐个检查 [`AggregateError::errors`]；
/// - `Cancelled`/`Timeout`：调用被取消或超时；
/// - `Downstream`：下游自定义错误，其分类由下游错误码决定。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    Retryable,
    ResourceExhausted,
    NonRetryable,
    Aggregate,
    Cancelled,
    Timeout,
    Downstream,
}

/// weir 数据面的顶层错误。
///
/// # 教案式说明
/// - **意图 (Why)**：数据面只有一条调用链，数据与错误沿同一链路返回；统一枚举让扇出与连接器可以
///   不加区分地传播任何失败。
/// - **契约 (What)**：
///   - `Configuration` 只应在装配期出现，运行时遇到即意味着装配校验遗漏；
///   - `ResourceExhausted` 可恢复，调用方必须停止向下游转发并让上游退避；
///   - `Downstream` 原样保留下游给出的错误码与底层原因。
/// - **设计权衡 (Trade-offs)**：未实现 `Clone`，以便 `Downstream` 持有任意底层 `source`；
///   需要重复观察错误时请记录 [`code`](Self::code) 与 `Display` 输出。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WeirError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Downstream(#[from] DownstreamError),
    #[error(transparent)]
    FanOut(#[from] AggregateError),
    #[error("data refused: {0}")]
    ResourceExhausted(Refusal),
    #[error("memory usage unavailable: {0}")]
    MeasurementUnavailable(Cow<'static, str>),
    #[error("call context cancelled")]
    Cancelled,
    #[error("call context deadline exceeded")]
    DeadlineExceeded,
    #[error("batch of {kind} is shared read-only and must not be mutated")]
    ReadOnlyBatch { kind: SignalKind },
}

impl WeirError {
    /// 便捷构造下游错误。
    pub fn downstream(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        WeirError::Downstream(DownstreamError::new(code, message))
    }

    /// 便捷构造测量不可用错误。
    pub fn measurement_unavailable(reason: impl Into<Cow<'static, str>>) -> Self {
        WeirError::MeasurementUnavailable(reason.into())
    }

    /// 稳定错误码；下游错误返回其自身的码值。
    pub fn code(&self) -> &'static str {
        match self {
            WeirError::Configuration(_) => codes::CONFIGURATION,
            WeirError::Downstream(err) => err.code(),
            WeirError::FanOut(_) => codes::FANOUT_AGGREGATE,
            WeirError::ResourceExhausted(_) => codes::RESOURCE_EXHAUSTED,
            WeirError::MeasurementUnavailable(_) => codes::MEASUREMENT_UNAVAILABLE,
            WeirError::Cancelled => codes::CANCELLED,
            WeirError::DeadlineExceeded => codes::DEADLINE_EXCEEDED,
            WeirError::ReadOnlyBatch { .. } => codes::READ_ONLY_BATCH,
        }
    }

    /// 结构化分类。
    pub fn category(&self) -> ErrorCategory {
        match self {
            WeirError::Configuration(_) | WeirError::ReadOnlyBatch { .. } => {
                ErrorCategory::NonRetryable
            }
            WeirError::Downstream(_) => ErrorCategory::Downstream,
            WeirError::FanOut(_) => ErrorCategory::Aggregate,
            WeirError::ResourceExhausted(_) => ErrorCategory::ResourceExhausted,
            WeirError::MeasurementUnavailable(_) => ErrorCategory::Retryable,
            WeirError::Cancelled => ErrorCategory::Cancelled,
            WeirError::DeadlineExceeded => ErrorCategory::Timeout,
        }
    }

    /// 上游是否应在退避后重试同一批次。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Retryable | ErrorCategory::ResourceExhausted
        )
    }

    /// 是否为准入拒绝。
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, WeirError::ResourceExhausted(_))
    }
}

/// 装配期配置错误，全部应在管线构建阶段暴露。
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// 连接器工厂未实现该信号对。
    #[error("connector `{connector}` does not implement {pair}")]
    UnsupportedPair {
        connector: Cow<'static, str>,
        pair: SignalPair,
    },
    /// 连接器未订阅该源信号，不存在对应入口。
    #[error("connector `{connector}` has no entry point for {kind}")]
    MissingEntryPoint {
        connector: Cow<'static, str>,
        kind: SignalKind,
    },
    /// 绑定的下游消费者种类与信号对目标不符。
    #[error("route {pair} of `{connector}` was bound to a {actual} consumer")]
    ConsumerKindMismatch {
        connector: Cow<'static, str>,
        pair: SignalPair,
        actual: SignalKind,
    },
    /// 同一信号对被重复绑定。
    #[error("route {pair} of `{connector}` is bound more than once")]
    DuplicateRoute {
        connector: Cow<'static, str>,
        pair: SignalPair,
    },
    /// 连接器未绑定任何信号对。
    #[error("connector `{connector}` has no routes")]
    EmptyConnector { connector: Cow<'static, str> },
    /// 扇出路由器没有任何消费者。
    #[error("fan-out of {kind} requires at least one consumer")]
    EmptyFanOut { kind: SignalKind },
    /// 闸门阈值非法。
    #[error("invalid memory limits: {reason}")]
    InvalidLimits { reason: Cow<'static, str> },
    /// 检查周期非法。
    #[error("check interval must be greater than zero")]
    InvalidCheckInterval,
    /// 配置文本无法解析。
    #[error("malformed configuration: {reason}")]
    Malformed { reason: Cow<'static, str> },
    /// 组件需要 Tokio 运行时但调用方不在运行时上下文内。
    #[error("component `{component}` must be started inside a tokio runtime")]
    NoRuntime { component: Cow<'static, str> },
    /// 组件重复启动。
    #[error("component `{component}` is already started")]
    AlreadyStarted { component: Cow<'static, str> },
}

/// 下游消费者的处理失败，沿调用链原样传播。
///
/// # 契约说明（What）
/// - `code`：下游自定义的稳定码值，推荐 `<组件>.<语义>`；
/// - `source`：可选底层原因，通过 [`std::error::Error::source`] 暴露。
#[derive(Debug)]
pub struct DownstreamError {
    code: &'static str,
    message: Cow<'static, str>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl DownstreamError {
    /// 构造下游错误。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// 附带底层原因。
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 人类可读描述。
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DownstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for DownstreamError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn StdError + 'static))
    }
}

/// 扇出多个分支失败后的聚合错误，按分支调用顺序保存。
///
/// # 契约说明（What）
/// - 仅在两个及以上分支失败时构造；单个失败由 [`aggregate`] 原样返回；
/// - `Display` 以 `; ` 连接各分支错误，便于单行日志检索。
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<WeirError>,
}

impl AggregateError {
    /// 已失败的分支错误，顺序与分支调用顺序一致。
    pub fn errors(&self) -> &[WeirError] {
        &self.errors
    }

    /// 取出全部分支错误。
    pub fn into_errors(self) -> Vec<WeirError> {
        self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fan-out branches failed: ", self.errors.len())?;
        for (index, err) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl StdError for AggregateError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.errors
            .first()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

/// 将分支结果合并为单个结果：全部成功为 `Ok`，单个失败原样返回，多个失败聚合。
pub fn aggregate(errors: Vec<WeirError>) -> Result<(), WeirError> {
    let mut errors = errors;
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(WeirError::FanOut(AggregateError { errors })),
    }
}

/// 准入拒绝时的现场快照。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Refusal {
    /// 最近一次测量到的占用。
    pub last_usage: u64,
    /// 触发拒绝的硬阈值。
    pub hard_limit: u64,
    /// 恢复准入所需降到的软阈值。
    pub soft_limit: u64,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory limiter is limited (usage {} >= hard limit {}, resumes at or below {})",
            self.last_usage, self.hard_limit, self.soft_limit
        )
    }
}
