use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::WeirError;
use crate::limiter::UsageProbe;

#[derive(Default)]
struct Script {
    pending: VecDeque<Option<u64>>,
    last: Option<Option<u64>>,
    total_memory: Option<u64>,
    calls: usize,
}

/// 按脚本返回占用的探针。
///
/// # 契约说明（What）
/// - 每次 `sample` 依次取出脚本中的一步；`None` 表示该周期测量失败；
/// - 脚本耗尽后重复最后一步；空脚本始终失败；
/// - 克隆共享同一脚本，测试可在探针移交给写者后继续追加步骤或查询调用次数。
#[derive(Clone, Default)]
pub struct ScriptedProbe {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProbe {
    /// 以一串占用值构造。
    pub fn new(usages: impl IntoIterator<Item = u64>) -> Self {
        Self::from_steps(usages.into_iter().map(Some))
    }

    /// 以可能失败的步骤构造。
    pub fn from_steps(steps: impl IntoIterator<Item = Option<u64>>) -> Self {
        let probe = Self::default();
        probe.script.lock().pending.extend(steps);
        probe
    }

    /// 设置报告的系统总内存。
    pub fn with_total_memory(self, total: u64) -> Self {
        self.script.lock().total_memory = Some(total);
        self
    }

    /// 追加一步。
    pub fn push(&self, step: Option<u64>) {
        self.script.lock().pending.push_back(step);
    }

    /// `sample` 被调用的次数。
    pub fn calls(&self) -> usize {
        self.script.lock().calls
    }
}

impl UsageProbe for ScriptedProbe {
    fn sample(&mut self) -> Result<u64, WeirError> {
        let mut script = self.script.lock();
        script.calls += 1;
        let step = match script.pending.pop_front() {
            Some(step) => {
                script.last = Some(step);
                step
            }
            None => script.last.flatten(),
        };
        step.ok_or_else(|| WeirError::measurement_unavailable("scripted measurement failure"))
    }

    fn total_memory(&mut self) -> Result<u64, WeirError> {
        self.script
            .lock()
            .total_memory
            .ok_or_else(|| WeirError::measurement_unavailable("scripted probe has no total"))
    }
}
