use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::WeirError;
use crate::sync::{AtomicBool, Ordering};

/// 取消原语，统一表达数据调用链的可中断性契约。
///
/// # 设计背景（Why）
/// - 接收端关闭或上游放弃时，扇出与连接器需要尽快停止向下游转发，避免无意义的处理；
/// - 数据调用是同步的，因此以轻量原子位而非 Future 取消来表达。
///
/// # 逻辑解析（How）
/// - 内部使用 [`AtomicBool`] 表达取消状态，并通过 [`Arc`] 支持多方共享；
/// - `cancel` 在首次成功设置取消位时返回 `true`，后续重复调用返回 `false`；
/// - `child` 生成共享同一原子位的派生实例。
///
/// # 契约说明（What）
/// - **后置条件**：一旦 `cancel` 成功，所有持有同一令牌的调用方都能观察到取消。
///
/// # 设计取舍与风险（Trade-offs）
/// - 不提供回调注册，已进入下游的调用不会被强制打断；组件只在转发前检查取消位。
#[derive(Clone, Debug)]
pub struct Cancellation {
    inner: Arc<CancellationState>,
}

#[derive(Debug)]
struct CancellationState {
    flag: AtomicBool,
}

impl Cancellation {
    /// 创建处于“未取消”状态的取消令牌。
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState {
                flag: AtomicBool::new(false),
            }),
        }
    }

    /// 查询当前是否已被标记取消。
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// 将当前令牌标记为取消。
    ///
    /// 返回值为 `true` 表示本次调用首次触发取消；返回 `false` 表示之前已被取消。
    pub fn cancel(&self) -> bool {
        self.inner
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 派生共享同一原子位的子令牌。
    pub fn child(&self) -> Self {
        self.clone()
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// 截止原语，描述一次数据调用的最迟完成时间。
///
/// # 契约说明（What）
/// - `Deadline` 可以为空，代表调用方未施加超时；
/// - `is_expired` 基于调用时提供的当前时间判断，测试可注入任意时间点。
///
/// # 风险提示（Trade-offs）
/// - 截止时间不会自动驱动取消，组件在转发前经由 [`CallContext::ensure_active`] 检查。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Deadline {
    instant: Option<Instant>,
}

impl Deadline {
    /// 创建未设置截止时间的实例。
    pub const fn none() -> Self {
        Self { instant: None }
    }

    /// 根据绝对时间点构造截止时间。
    pub fn at(instant: Instant) -> Self {
        Self {
            instant: Some(instant),
        }
    }

    /// 基于当前时间点加持续时间生成截止时间；溢出时视为无截止。
    pub fn with_timeout(now: Instant, timeout: Duration) -> Self {
        Self {
            instant: now.checked_add(timeout),
        }
    }

    /// 返回内部时间点。
    pub fn instant(&self) -> Option<Instant> {
        self.instant
    }

    /// 判断是否已经超时。
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.instant {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// 状态推进结果，配合 [`ContractStateMachine`] 描述状态转换效果。
///
/// # 设计目标（Why）
/// - 让状态机实现者在返回值中明确指示“是否发生状态跃迁”，上层据此记录日志或指标；
/// - 区分 `Noop` 与 `Transition`，避免上层重复记录。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateAdvance<S>
where
    S: Copy + Eq,
{
    /// 状态未变化。
    Noop { state: S },
    /// 状态发生跃迁。
    Transition { from: S, to: S },
}

impl<S> StateAdvance<S>
where
    S: Copy + Eq,
{
    /// 推进后的状态。
    pub fn state(&self) -> S {
        match self {
            StateAdvance::Noop { state } => *state,
            StateAdvance::Transition { to, .. } => *to,
        }
    }

    /// 是否发生跃迁。
    pub fn is_transition(&self) -> bool {
        matches!(self, StateAdvance::Transition { .. })
    }
}

/// 最小状态机接口，约束内存闸门等组件如何驱动内部状态。
///
/// # 契约说明（What）
/// - `state()`：返回当前状态快照；
/// - `on_signal(signal)`：根据输入信号推进状态，返回 [`StateAdvance`]；
/// - 接口本身不规定同步策略，`&mut self` 意味着同一时刻只有一个推进者。
///
/// # 风险提示（Trade-offs）
/// - 返回 `Noop` 时务必保持状态未变，否则会破坏日志与度量的一致性。
pub trait ContractStateMachine {
    /// 状态枚举类型。
    type State: Copy + Eq;
    /// 驱动状态的信号。
    type Signal;

    /// 读取当前状态。
    fn state(&self) -> Self::State;

    /// 根据输入信号推进状态，并返回跃迁结果。
    fn on_signal(&mut self, signal: &Self::Signal) -> StateAdvance<Self::State>;
}

/// 数据调用上下文，沿扇出与连接器传递取消与截止信息。
///
/// # 契约说明（What）
/// - 克隆成本为常数（内部 [`Arc`]），扇出的每个分支共享同一上下文；
/// - 组件在转发前调用 [`ensure_active`](Self::ensure_active)，已取消或超时即返回错误而不转发。
#[derive(Clone, Debug)]
pub struct CallContext {
    inner: Arc<CallContextInner>,
}

#[derive(Debug)]
struct CallContextInner {
    cancellation: Cancellation,
    deadline: Deadline,
}

impl CallContext {
    /// 创建上下文构建器。
    pub fn builder() -> CallContextBuilder {
        CallContextBuilder::default()
    }

    /// 获取取消原语。
    pub fn cancellation(&self) -> &Cancellation {
        &self.inner.cancellation
    }

    /// 查询截止时间。
    pub fn deadline(&self) -> Deadline {
        self.inner.deadline
    }

    /// 在 `now` 时刻检查上下文是否仍然有效。
    pub fn ensure_active_at(&self, now: Instant) -> Result<(), WeirError> {
        if self.inner.cancellation.is_cancelled() {
            return Err(WeirError::Cancelled);
        }
        if self.inner.deadline.is_expired(now) {
            return Err(WeirError::DeadlineExceeded);
        }
        Ok(())
    }

    /// 以当前时间检查上下文是否仍然有效。
    pub fn ensure_active(&self) -> Result<(), WeirError> {
        if self.inner.deadline.instant().is_none() {
            return if self.inner.cancellation.is_cancelled() {
                Err(WeirError::Cancelled)
            } else {
                Ok(())
            };
        }
        self.ensure_active_at(Instant::now())
    }
}

impl Default for CallContext {
    fn default() -> Self {
        CallContext::builder().build()
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deadline = match self.deadline().instant() {
            Some(instant) => format!("{instant:?}"),
            None => "none".to_string(),
        };
        write!(
            f,
            "CallContext{{cancelled={}, deadline={}}}",
            self.cancellation().is_cancelled(),
            deadline
        )
    }
}

/// `CallContext` 构建器。
#[derive(Default)]
pub struct CallContextBuilder {
    cancellation: Cancellation,
    deadline: Deadline,
}

impl CallContextBuilder {
    /// 设置取消原语。
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// 设置截止时间。
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// 构建上下文。
    pub fn build(self) -> CallContext {
        CallContext {
            inner: Arc::new(CallContextInner {
                cancellation: self.cancellation,
                deadline: self.deadline,
            }),
        }
    }
}
