//! # data 模块说明
//!
//! ## 角色定位（Why）
//! - 为三种信号提供统一的批次容器 [`Batch`]，让扇出路由器在“共享同一实例”与“深拷贝”之间做出可观察的选择；
//! - 通过 [`SignalData`] 约束每种载荷的条目计数与确定性合成，供跨种类连接器使用。
//!
//! ## 核心契约（What）
//! - `Batch::clone` 只复制句柄，多个句柄指向同一实例；[`Batch::deep_clone`] 才产生独立实例；
//! - 实例一旦被 [`Batch::mark_read_only`] 标记即不可逆，之后的 [`Batch::mutate`] 一律失败；
//! - 批次的信号种类由载荷类型静态决定，转换总是产生新批次。
//!
//! ## 实现策略（How）
//! - 载荷放在 `Arc<Shared<D>>` 中，以 `parking_lot::RwLock` 保护读写；只读标记为独立原子位，
//!   读取路径不需要获取写锁。

mod logs;
mod metrics;
mod traces;

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::consumer::{AnyConsumer, ConsumerHandle};
use crate::error::WeirError;
use crate::signal::SignalKind;
use crate::sync::{AtomicBool, Ordering};

pub use logs::{LogRecord, LogsData};
pub use metrics::{DataPoint, Metric, MetricsData};
pub use traces::{Span, TracesData};

/// 某一信号种类的批次载荷。
///
/// # 契约说明（What）
/// - `KIND`：载荷所属信号种类，决定批次能进入哪条管线；
/// - `item_count`：条目数量（Span 数、指标数、日志条数），跨种类合成以此为输入；
/// - `synthesize(count)`：确定性地生成 `count` 个条目，相同输入必须得到相等输出；
/// - `stamp_attribute`：就地为每个条目写入一个属性，用于演示与检验“修改型”消费者；
/// - `into_any`/`from_any`：在类型擦除的 [`AnyConsumer`] 与具体句柄之间转换，连接器装配时使用。
pub trait SignalData: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// 载荷所属信号种类。
    const KIND: SignalKind;

    /// 条目数量。
    fn item_count(&self) -> usize;

    /// 确定性地合成 `count` 个条目。
    fn synthesize(count: usize) -> Self;

    /// 为每个条目写入属性 `key = value`，已存在时覆盖。
    fn stamp_attribute(&mut self, key: &str, value: &str);

    /// 将具体句柄擦除为 [`AnyConsumer`]。
    fn into_any(handle: ConsumerHandle<Self>) -> AnyConsumer;

    /// 尝试从 [`AnyConsumer`] 还原具体句柄，种类不符时原样退回。
    fn from_any(any: AnyConsumer) -> Result<ConsumerHandle<Self>, AnyConsumer>;
}

struct Shared<D> {
    read_only: AtomicBool,
    data: RwLock<D>,
}

/// 遥测批次句柄。
///
/// # 教案式说明
/// - **意图 (Why)**：扇出时“按引用传递”与“深拷贝”必须可区分，测试才能证明两个分支从不共享
///   一个可能被修改的实例；
/// - **契约 (What)**：
///   - `clone()` 共享实例，[`same_instance`](Self::same_instance) 对其返回 `true`；
///   - [`deep_clone`](Self::deep_clone) 返回内容相等、实例独立且未标记只读的新批次；
///   - [`mutate`](Self::mutate) 在只读实例上返回 [`WeirError::ReadOnlyBatch`]；
/// - **风险提示 (Trade-offs)**：读写锁只保护单次闭包调用，闭包内不得再次获取同一批次的锁。
pub struct Batch<D> {
    shared: Arc<Shared<D>>,
}

impl<D> Clone for Batch<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: SignalData> Batch<D> {
    /// 以载荷构造新批次。
    pub fn new(data: D) -> Self {
        Self {
            shared: Arc::new(Shared {
                read_only: AtomicBool::new(false),
                data: RwLock::new(data),
            }),
        }
    }

    /// 合成包含 `count` 个条目的批次。
    pub fn synthesize(count: usize) -> Self {
        Self::new(D::synthesize(count))
    }

    /// 批次的信号种类。
    pub fn kind(&self) -> SignalKind {
        D::KIND
    }

    /// 两个句柄是否指向同一实例。
    pub fn same_instance(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.shared, &b.shared)
    }

    /// 深拷贝出独立实例；新实例不继承只读标记。
    pub fn deep_clone(&self) -> Self {
        Self::new(self.shared.data.read().clone())
    }

    /// 将实例标记为只读，不可撤销。
    pub fn mark_read_only(&self) {
        self.shared.read_only.store(true, Ordering::Release);
    }

    /// 实例是否已标记只读。
    pub fn is_read_only(&self) -> bool {
        self.shared.read_only.load(Ordering::Acquire)
    }

    /// 以只读方式访问载荷。
    pub fn read<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.shared.data.read())
    }

    /// 以可写方式访问载荷；只读实例返回错误且不调用闭包。
    pub fn mutate<R>(&self, f: impl FnOnce(&mut D) -> R) -> Result<R, WeirError> {
        if self.is_read_only() {
            return Err(WeirError::ReadOnlyBatch { kind: D::KIND });
        }
        Ok(f(&mut self.shared.data.write()))
    }

    /// 条目数量。
    pub fn item_count(&self) -> usize {
        self.shared.data.read().item_count()
    }

    /// 复制出载荷快照。
    pub fn snapshot(&self) -> D {
        self.shared.data.read().clone()
    }
}

impl<D: SignalData> From<D> for Batch<D> {
    fn from(data: D) -> Self {
        Batch::new(data)
    }
}

impl<D: SignalData> fmt::Debug for Batch<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("kind", &D::KIND)
            .field("items", &self.item_count())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}
