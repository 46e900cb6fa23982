//! 内存闸门组件：在 Tokio 运行时上以固定周期驱动唯一写者。

use std::fmt;
use std::mem;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::component::{ComponentId, CreateSettings};
use crate::error::{ConfigurationError, WeirError};

use super::config::MemoryLimiterConfig;
use super::gate::{GateMonitor, MemoryGate};
use super::probe::UsageProbe;

/// 监控任务被异常终止后，写者无法回收时返回的错误码。
pub const MONITOR_LOST: &str = "weir.memory_limiter.monitor_lost";

enum Slot {
    Idle(GateMonitor),
    Running {
        stop: oneshot::Sender<()>,
        task: JoinHandle<GateMonitor>,
    },
    Transitioning,
    Lost,
}

/// 内存闸门组件。
///
/// # 教案式说明
/// - **意图 (Why)**：把“唯一写者 + 周期驱动”封装为可启动、可关闭、可重启的组件；
/// - **契约 (What)**：
///   - [`start`](Self::start) 在当前 Tokio 运行时上派生监控任务，首个周期立即执行，之后每
///     `check_interval` 执行一次，错过的周期直接跳过；
///   - 不在运行时上下文内调用 `start`，或重复调用，均返回配置错误；
///   - [`shutdown`](Self::shutdown) 停止任务并收回写者，之后可再次 `start`；
///   - 读者 [`MemoryGate`] 在整个生命周期内保持有效，关闭后状态冻结在最后一次周期的结果；
/// - **实现 (How)**：写者在 `Idle` 与 `Running` 槽位之间移动；状态切换期间槽位暂记为
///   `Transitioning`，锁只在同步段内持有，从不跨越 `.await`。
pub struct MemoryLimiter {
    id: ComponentId,
    gate: MemoryGate,
    slot: Mutex<Slot>,
}

impl MemoryLimiter {
    /// 以现成的写者构造组件。
    pub fn new(monitor: GateMonitor) -> Self {
        let gate = monitor.gate();
        Self {
            id: gate.id().clone(),
            gate,
            slot: Mutex::new(Slot::Idle(monitor)),
        }
    }

    /// 以配置与探针构造组件；百分比形式的阈值经由同一探针读取系统总内存。
    pub fn from_config(
        config: &MemoryLimiterConfig,
        mut probe: impl UsageProbe,
        settings: &CreateSettings,
    ) -> Result<Self, WeirError> {
        let thresholds = config.thresholds(&mut probe)?;
        tracing::info!(
            component = %settings.id,
            hard_limit = thresholds.hard_limit(),
            soft_limit = thresholds.soft_limit(),
            check_interval_ms = config.check_interval_ms,
            "memory limiter configured"
        );
        Ok(Self::new(GateMonitor::new(thresholds, probe, settings)))
    }

    /// 读者句柄。
    pub fn gate(&self) -> MemoryGate {
        self.gate.clone()
    }

    /// 监控任务是否在运行。
    pub fn is_running(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Running { .. })
    }

    /// 在当前 Tokio 运行时上启动监控任务。
    pub fn start(&self) -> Result<(), WeirError> {
        let handle = Handle::try_current().map_err(|_| ConfigurationError::NoRuntime {
            component: self.id.to_string().into(),
        })?;
        let mut slot = self.slot.lock();
        match mem::replace(&mut *slot, Slot::Transitioning) {
            Slot::Idle(monitor) => {
                let (stop, stopped) = oneshot::channel();
                let task = handle.spawn(run(monitor, stopped));
                *slot = Slot::Running { stop, task };
                tracing::debug!(component = %self.id, "memory limiter monitor started");
                Ok(())
            }
            Slot::Lost => {
                *slot = Slot::Lost;
                Err(monitor_lost(&self.id))
            }
            other => {
                *slot = other;
                Err(ConfigurationError::AlreadyStarted {
                    component: self.id.to_string().into(),
                }
                .into())
            }
        }
    }

    /// 停止监控任务并收回写者；未启动时为空操作。
    pub async fn shutdown(&self) -> Result<(), WeirError> {
        let running = {
            let mut slot = self.slot.lock();
            match mem::replace(&mut *slot, Slot::Transitioning) {
                Slot::Running { stop, task } => (stop, task),
                other => {
                    *slot = other;
                    return Ok(());
                }
            }
        };
        let (stop, task) = running;
        let _ = stop.send(());
        match task.await {
            Ok(monitor) => {
                *self.slot.lock() = Slot::Idle(monitor);
                tracing::debug!(component = %self.id, "memory limiter monitor stopped");
                Ok(())
            }
            Err(err) => {
                *self.slot.lock() = Slot::Lost;
                tracing::error!(component = %self.id, error = %err, "memory limiter monitor lost");
                Err(monitor_lost(&self.id))
            }
        }
    }
}

impl fmt::Debug for MemoryLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLimiter")
            .field("id", &self.id)
            .field("gate", &self.gate)
            .field("running", &self.is_running())
            .finish()
    }
}

fn monitor_lost(id: &ComponentId) -> WeirError {
    WeirError::downstream(
        MONITOR_LOST,
        format!("monitor task of `{id}` terminated abnormally"),
    )
}

async fn run(mut monitor: GateMonitor, mut stopped: oneshot::Receiver<()>) -> GateMonitor {
    let mut ticker = time::interval(monitor.thresholds().check_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = &mut stopped => break,
            _ = ticker.tick() => {
                monitor.tick();
            }
        }
    }
    monitor
}
