//! # consumer 模块说明
//!
//! ## 角色定位（Why）
//! - 管线中的每一级都以“消费者句柄”出现：扇出路由器、连接器入口、准入包装与导出端都实现同一接口；
//! - 能力描述符 [`Capabilities`] 在构造句柄时一次性附着，扇出路由器只读取它来决定共享还是克隆。
//!
//! ## 核心契约（What）
//! - [`Consumer::consume`] 在调用方线程上同步执行，不排队、不缓冲；
//! - 声明 `mutates_data = false` 的消费者不得修改收到的批次（共享实例会被标记只读，违规修改将返回错误）；
//! - 句柄克隆只增加引用计数，能力值在句柄生命周期内不可变。

use std::fmt;
use std::sync::Arc;

use crate::contract::CallContext;
use crate::data::{Batch, LogsData, MetricsData, SignalData, TracesData};
use crate::error::WeirError;
use crate::signal::SignalKind;

/// 消费者能力描述符。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// 消费者是否会就地修改收到的批次。
    pub mutates_data: bool,
}

impl Capabilities {
    /// 只读消费者。
    pub const READ_ONLY: Capabilities = Capabilities {
        mutates_data: false,
    };
    /// 会修改批次的消费者。
    pub const MUTATES: Capabilities = Capabilities { mutates_data: true };

    /// 以布尔值构造。
    pub const fn new(mutates_data: bool) -> Self {
        Self { mutates_data }
    }

    /// 合并两组能力：任一方会修改即视为会修改。
    pub const fn union(self, other: Capabilities) -> Capabilities {
        Capabilities {
            mutates_data: self.mutates_data || other.mutates_data,
        }
    }
}

/// 某一信号种类的消费者。
///
/// # 契约说明（What）
/// - **前置条件**：调用方已确认 `ctx` 仍然有效，或接受实现方在入口处检查；
/// - **后置条件**：返回 `Ok(())` 表示批次已被完整处理；错误沿调用链原样返回给上游；
/// - 实现必须是 `Send + Sync`，同一实例会被多个上游线程并发调用。
pub trait Consumer<D: SignalData>: Send + Sync + 'static {
    /// 同步消费一个批次。
    fn consume(&self, ctx: &CallContext, batch: Batch<D>) -> Result<(), WeirError>;
}

/// 带能力描述符的消费者句柄。
pub struct ConsumerHandle<D: SignalData> {
    consumer: Arc<dyn Consumer<D>>,
    capabilities: Capabilities,
}

impl<D: SignalData> ConsumerHandle<D> {
    /// 以具体消费者与能力描述构造句柄。
    pub fn new(consumer: impl Consumer<D>, capabilities: Capabilities) -> Self {
        Self {
            consumer: Arc::new(consumer),
            capabilities,
        }
    }

    /// 以已共享的消费者构造句柄。
    pub fn from_arc(consumer: Arc<dyn Consumer<D>>, capabilities: Capabilities) -> Self {
        Self {
            consumer,
            capabilities,
        }
    }

    /// 能力描述符。
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// 是否会修改批次。
    pub fn mutates_data(&self) -> bool {
        self.capabilities.mutates_data
    }

    /// 以另一组能力描述重新发布同一消费者。
    ///
    /// 只应用于放宽声明（只读 → 修改型）：把修改型消费者声明为只读会让上游共享本该独占的实例。
    pub fn with_capabilities(self, capabilities: Capabilities) -> Self {
        Self {
            consumer: self.consumer,
            capabilities,
        }
    }

    /// 句柄对应的信号种类。
    pub fn kind(&self) -> SignalKind {
        D::KIND
    }

    /// 两个句柄是否指向同一消费者实例。
    pub fn same_consumer(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.consumer, &b.consumer)
    }

    /// 将批次交给消费者。
    pub fn consume(&self, ctx: &CallContext, batch: Batch<D>) -> Result<(), WeirError> {
        self.consumer.consume(ctx, batch)
    }
}

impl<D: SignalData> Clone for ConsumerHandle<D> {
    fn clone(&self) -> Self {
        Self {
            consumer: Arc::clone(&self.consumer),
            capabilities: self.capabilities,
        }
    }
}

impl<D: SignalData> fmt::Debug for ConsumerHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerHandle")
            .field("kind", &D::KIND)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// 以闭包实现的消费者。
pub struct ConsumerFn<F> {
    func: F,
}

impl<D, F> Consumer<D> for ConsumerFn<F>
where
    D: SignalData,
    F: Fn(&CallContext, Batch<D>) -> Result<(), WeirError> + Send + Sync + 'static,
{
    fn consume(&self, ctx: &CallContext, batch: Batch<D>) -> Result<(), WeirError> {
        (self.func)(ctx, batch)
    }
}

/// 由闭包快速构造消费者句柄。
pub fn consumer_fn<D, F>(capabilities: Capabilities, func: F) -> ConsumerHandle<D>
where
    D: SignalData,
    F: Fn(&CallContext, Batch<D>) -> Result<(), WeirError> + Send + Sync + 'static,
{
    ConsumerHandle::new(ConsumerFn { func }, capabilities)
}

/// 类型擦除后的消费者句柄，连接器装配时按目标种类绑定。
#[derive(Clone, Debug)]
pub enum AnyConsumer {
    Traces(ConsumerHandle<TracesData>),
    Metrics(ConsumerHandle<MetricsData>),
    Logs(ConsumerHandle<LogsData>),
}

impl AnyConsumer {
    /// 句柄的信号种类。
    pub fn kind(&self) -> SignalKind {
        match self {
            AnyConsumer::Traces(_) => SignalKind::Traces,
            AnyConsumer::Metrics(_) => SignalKind::Metrics,
            AnyConsumer::Logs(_) => SignalKind::Logs,
        }
    }

    /// 句柄的能力描述符。
    pub fn capabilities(&self) -> Capabilities {
        match self {
            AnyConsumer::Traces(handle) => handle.capabilities(),
            AnyConsumer::Metrics(handle) => handle.capabilities(),
            AnyConsumer::Logs(handle) => handle.capabilities(),
        }
    }
}

impl<D: SignalData> From<ConsumerHandle<D>> for AnyConsumer {
    fn from(handle: ConsumerHandle<D>) -> Self {
        D::into_any(handle)
    }
}
