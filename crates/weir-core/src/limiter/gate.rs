use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::component::{ComponentId, CreateSettings};
use crate::consumer::ConsumerHandle;
use crate::contract::{ContractStateMachine, StateAdvance};
use crate::data::SignalData;
use crate::error::{Refusal, WeirError};
use crate::observability::metrics::contract::memory_limiter as keys;
use crate::observability::{Counter, Gauge, KeyValue};
use crate::sync::{AtomicU8, AtomicU64, Ordering};

use super::ingress::AdmissionGuard;
use super::probe::UsageProbe;
use super::{GateState, GateThresholds};

/// 进入 `Limited` 时触发的尽力回收钩子。
///
/// # 契约说明（What）
/// - 在新状态发布之后、同一监控周期内调用一次；
/// - 实现不得阻塞过久，也不得回调闸门本身。
pub trait Reclaimer: Send + Sync + 'static {
    /// 执行一次尽力回收。
    fn reclaim(&self);
}

impl<F> Reclaimer for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn reclaim(&self) {
        self()
    }
}

/// 不做任何事的回收钩子。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReclaimer;

impl Reclaimer for NoopReclaimer {
    fn reclaim(&self) {}
}

/// 一次监控周期的测量结果，即状态机的输入信号。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsageSample {
    /// 测得的占用（字节）。
    Measured(u64),
    /// 无法测量及其原因。
    Unavailable(Cow<'static, str>),
}

struct GateTelemetry {
    attributes: [KeyValue<'static>; 1],
    state: Arc<dyn Gauge>,
    usage: Arc<dyn Gauge>,
    refused: Arc<dyn Counter>,
    reclaims: Arc<dyn Counter>,
    failures: Arc<dyn Counter>,
    transitions: Arc<dyn Counter>,
}

impl GateTelemetry {
    fn new(settings: &CreateSettings) -> Self {
        let meter = settings.telemetry.meter_provider.meter(keys::SCOPE);
        Self {
            attributes: [KeyValue::new(keys::ATTR_COMPONENT, settings.id.to_string())],
            state: meter.gauge(&keys::STATE),
            usage: meter.gauge(&keys::USAGE_BYTES),
            refused: meter.counter(&keys::REFUSED_TOTAL),
            reclaims: meter.counter(&keys::RECLAIM_TOTAL),
            failures: meter.counter(&keys::MEASUREMENT_FAILURES),
            transitions: meter.counter(&keys::TRANSITIONS_TOTAL),
        }
    }
}

/// 读者与写者共享的状态单元。
///
/// 所有字段都是独立原子量：读者任何时刻看到的状态值都是完整的枚举值，计数器单调递增。
struct GateCell {
    id: ComponentId,
    thresholds: GateThresholds,
    state: AtomicU8,
    last_usage: AtomicU64,
    refusals: AtomicU64,
    reclaims: AtomicU64,
    measurement_failures: AtomicU64,
    telemetry: GateTelemetry,
}

impl GateCell {
    fn state(&self) -> GateState {
        GateState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// 闸门读者，克隆成本为一次引用计数。
///
/// # 教案式说明
/// - **意图 (Why)**：入口组件在每个批次上询问“现在能否接收”，这一步处在热路径上；
/// - **契约 (What)**：
///   - [`check_admission`](Self::check_admission) 只读取原子量，O(1)、不加锁、不做 I/O；
///   - `Limited` 时递增拒绝计数并返回 [`WeirError::ResourceExhausted`]，携带拒绝现场；
///   - 状态可能落后于真实占用至多一个监控周期；
/// - **风险提示 (Trade-offs)**：拒绝计数的自观测计数器由注入的后端实现，后端应保证非阻塞。
#[derive(Clone)]
pub struct MemoryGate {
    cell: Arc<GateCell>,
}

impl MemoryGate {
    /// 当前状态。
    pub fn state(&self) -> GateState {
        self.cell.state()
    }

    /// 是否放行。
    pub fn is_admitting(&self) -> bool {
        self.state() == GateState::Normal
    }

    /// 准入检查。
    pub fn check_admission(&self) -> Result<(), WeirError> {
        let cell = &self.cell;
        if cell.state() == GateState::Normal {
            return Ok(());
        }
        cell.refusals.fetch_add(1, Ordering::Relaxed);
        cell.telemetry
            .refused
            .increment(&cell.telemetry.attributes);
        Err(WeirError::ResourceExhausted(Refusal {
            last_usage: cell.last_usage.load(Ordering::Acquire),
            hard_limit: cell.thresholds.hard_limit(),
            soft_limit: cell.thresholds.soft_limit(),
        }))
    }

    /// 以准入检查包装下游消费者。
    pub fn guard<D: SignalData>(&self, next: ConsumerHandle<D>) -> ConsumerHandle<D> {
        AdmissionGuard::wrap(self.clone(), next)
    }

    /// 最近一次测得的占用（字节）。
    pub fn last_usage(&self) -> u64 {
        self.cell.last_usage.load(Ordering::Acquire)
    }

    /// 累计拒绝次数。
    pub fn refusal_count(&self) -> u64 {
        self.cell.refusals.load(Ordering::Relaxed)
    }

    /// 累计回收请求次数。
    pub fn reclamation_count(&self) -> u64 {
        self.cell.reclaims.load(Ordering::Relaxed)
    }

    /// 累计测量失败次数。
    pub fn measurement_failures(&self) -> u64 {
        self.cell.measurement_failures.load(Ordering::Relaxed)
    }

    /// 阈值配置。
    pub fn thresholds(&self) -> GateThresholds {
        self.cell.thresholds
    }

    /// 组件标识。
    pub fn id(&self) -> &ComponentId {
        &self.cell.id
    }
}

impl fmt::Debug for MemoryGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryGate")
            .field("id", &self.cell.id)
            .field("state", &self.state())
            .field("last_usage", &self.last_usage())
            .field("thresholds", &self.cell.thresholds)
            .finish()
    }
}

/// 闸门唯一写者。
///
/// # 教案式说明
/// - **意图 (Why)**：状态只能由一个推进者修改，读者之间无需协调；该类型不实现 `Clone`，
///   所有权本身就是“唯一写者”的证明；
/// - **契约 (What)**：
///   - [`tick`](Self::tick) 采样一次并推进状态，返回 [`StateAdvance`]；
///   - `Normal` 且占用 ≥ 硬阈值 → `Limited`；`Limited` 且占用 ≤ 软阈值 → `Normal`；其余保持；
///   - 测量失败 → 进入或保持 `Normal`，记录 `warn` 日志并递增失败计数；
///   - 进入 `Limited` 时，先发布新状态，再调用一次 [`Reclaimer`]；
/// - **实现 (How)**：状态以 `Release` 写入、读者以 `Acquire` 读取；`last_usage` 在状态之前写入，
///   因此读者看到 `Limited` 时必然也能看到触发它的那次测量。
pub struct GateMonitor {
    cell: Arc<GateCell>,
    probe: Box<dyn UsageProbe>,
    reclaimer: Arc<dyn Reclaimer>,
}

impl GateMonitor {
    /// 构造写者，初始状态为 `Normal`。
    pub fn new(
        thresholds: GateThresholds,
        probe: impl UsageProbe,
        settings: &CreateSettings,
    ) -> Self {
        let telemetry = GateTelemetry::new(settings);
        telemetry
            .state
            .set(GateState::Normal.as_u8().into(), &telemetry.attributes);
        Self {
            cell: Arc::new(GateCell {
                id: settings.id.clone(),
                thresholds,
                state: AtomicU8::new(GateState::Normal.as_u8()),
                last_usage: AtomicU64::new(0),
                refusals: AtomicU64::new(0),
                reclaims: AtomicU64::new(0),
                measurement_failures: AtomicU64::new(0),
                telemetry,
            }),
            probe: Box::new(probe),
            reclaimer: Arc::new(NoopReclaimer),
        }
    }

    /// 设置回收钩子。
    pub fn with_reclaimer(mut self, reclaimer: impl Reclaimer) -> Self {
        self.reclaimer = Arc::new(reclaimer);
        self
    }

    /// 派生读者。
    pub fn gate(&self) -> MemoryGate {
        MemoryGate {
            cell: Arc::clone(&self.cell),
        }
    }

    /// 阈值配置。
    pub fn thresholds(&self) -> GateThresholds {
        self.cell.thresholds
    }

    /// 执行一次监控周期：采样并推进状态。
    pub fn tick(&mut self) -> StateAdvance<GateState> {
        let sample = match self.probe.sample() {
            Ok(usage) => UsageSample::Measured(usage),
            Err(err) => UsageSample::Unavailable(err.to_string().into()),
        };
        self.on_signal(&sample)
    }

    fn publish(&self, from: GateState, to: GateState) -> StateAdvance<GateState> {
        if from == to {
            return StateAdvance::Noop { state: from };
        }
        let cell = &self.cell;
        let telemetry = &cell.telemetry;
        cell.state.store(to.as_u8(), Ordering::Release);
        telemetry.state.set(to.as_u8().into(), &telemetry.attributes);
        let [component] = &telemetry.attributes;
        telemetry.transitions.increment(&[
            component.clone(),
            KeyValue::new(keys::ATTR_STATE, to.as_str()),
        ]);

        match to {
            GateState::Limited => {
                tracing::warn!(
                    component = %cell.id,
                    usage = cell.last_usage.load(Ordering::Relaxed),
                    hard_limit = cell.thresholds.hard_limit(),
                    "memory usage reached the hard limit; refusing data"
                );
                cell.reclaims.fetch_add(1, Ordering::Relaxed);
                telemetry.reclaims.increment(&telemetry.attributes);
                self.reclaimer.reclaim();
            }
            GateState::Normal => {
                tracing::info!(
                    component = %cell.id,
                    usage = cell.last_usage.load(Ordering::Relaxed),
                    soft_limit = cell.thresholds.soft_limit(),
                    "memory usage is back below the soft limit; admitting data"
                );
            }
        }
        StateAdvance::Transition { from, to }
    }
}

impl ContractStateMachine for GateMonitor {
    type State = GateState;
    type Signal = UsageSample;

    fn state(&self) -> GateState {
        self.cell.state()
    }

    fn on_signal(&mut self, signal: &UsageSample) -> StateAdvance<GateState> {
        let from = self.cell.state();
        let to = match signal {
            UsageSample::Measured(usage) => {
                self.cell.last_usage.store(*usage, Ordering::Release);
                self.cell
                    .telemetry
                    .usage
                    .set(*usage as f64, &self.cell.telemetry.attributes);
                self.cell.thresholds.next_state(from, *usage)
            }
            UsageSample::Unavailable(reason) => {
                self.cell
                    .measurement_failures
                    .fetch_add(1, Ordering::Relaxed);
                self.cell
                    .telemetry
                    .failures
                    .increment(&self.cell.telemetry.attributes);
                tracing::warn!(
                    component = %self.cell.id,
                    reason = %reason,
                    "memory usage unavailable; failing open"
                );
                GateState::Normal
            }
        };
        self.publish(from, to)
    }
}

impl fmt::Debug for GateMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateMonitor")
            .field("id", &self.cell.id)
            .field("state", &self.cell.state())
            .field("thresholds", &self.cell.thresholds)
            .finish_non_exhaustive()
    }
}
