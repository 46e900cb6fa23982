use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::consumer::{Capabilities, Consumer, ConsumerHandle};
use crate::contract::CallContext;
use crate::data::{Batch, SignalData};
use crate::error::WeirError;
use crate::limiter::Reclaimer;

/// 修改型记录消费者写入的属性键。
pub const RECORDER_MARK_KEY: &str = "recorded_by";

struct Behaviour {
    label: String,
    mutate: bool,
    fail_code: Option<&'static str>,
}

/// 记录收到的批次实例的消费者。
///
/// # 契约说明（What）
/// - 保存收到的批次句柄本身（而非快照），测试可以用 [`Batch::same_instance`] 判断别名；
/// - [`mutating`](Self::mutating) 版本在记录前为每个条目写入 `recorded_by = label`，
///   并以修改型能力注册；若批次只读则修改失败、错误原样返回；
/// - [`failing`](Self::failing) 版本记录批次后返回指定错误码的下游错误。
pub struct RecordingConsumer<D: SignalData> {
    behaviour: Arc<Behaviour>,
    batches: Arc<Mutex<Vec<Batch<D>>>>,
}

impl<D: SignalData> Clone for RecordingConsumer<D> {
    fn clone(&self) -> Self {
        Self {
            behaviour: Arc::clone(&self.behaviour),
            batches: Arc::clone(&self.batches),
        }
    }
}

impl<D: SignalData> RecordingConsumer<D> {
    /// 只读记录者。
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_behaviour(label.into(), false, None)
    }

    /// 修改型记录者。
    pub fn mutating(label: impl Into<String>) -> Self {
        Self::with_behaviour(label.into(), true, None)
    }

    /// 总是失败的只读记录者。
    pub fn failing(label: impl Into<String>, code: &'static str) -> Self {
        Self::with_behaviour(label.into(), false, Some(code))
    }

    fn with_behaviour(label: String, mutate: bool, fail_code: Option<&'static str>) -> Self {
        Self {
            behaviour: Arc::new(Behaviour {
                label,
                mutate,
                fail_code,
            }),
            batches: Arc::default(),
        }
    }

    /// 带能力描述的句柄。
    pub fn handle(&self) -> ConsumerHandle<D> {
        ConsumerHandle::new(self.clone(), Capabilities::new(self.behaviour.mutate))
    }

    /// 收到的批次句柄，按到达顺序。
    pub fn batches(&self) -> Vec<Batch<D>> {
        self.batches.lock().clone()
    }

    /// 收到的批次数。
    pub fn count(&self) -> usize {
        self.batches.lock().len()
    }

    /// 收到的条目总数。
    pub fn items(&self) -> usize {
        self.batches.lock().iter().map(Batch::item_count).sum()
    }
}

impl<D: SignalData> Consumer<D> for RecordingConsumer<D> {
    fn consume(&self, _ctx: &CallContext, batch: Batch<D>) -> Result<(), WeirError> {
        if self.behaviour.mutate {
            let label = self.behaviour.label.as_str();
            batch.mutate(|data| data.stamp_attribute(RECORDER_MARK_KEY, label))?;
        }
        self.batches.lock().push(batch);
        match self.behaviour.fail_code {
            Some(code) => Err(WeirError::downstream(
                code,
                format!("{} rejected the batch", self.behaviour.label),
            )),
            None => Ok(()),
        }
    }
}

/// 统计被调用次数的回收钩子。
#[derive(Clone, Debug, Default)]
pub struct CountingReclaimer {
    calls: Arc<AtomicU64>,
}

impl CountingReclaimer {
    /// 创建计数为零的钩子。
    pub fn new() -> Self {
        Self::default()
    }

    /// 被调用次数。
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reclaimer for CountingReclaimer {
    fn reclaim(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}
