//! # fanout 模块说明
//!
//! ## 角色定位（Why）
//! - 一个批次需要交给多个下游时，必须在“共享同一实例”与“深拷贝”之间取舍：
//!   共享省内存，但任何会修改数据的下游都不能与其他分支共享实例；
//! - 路由器只依据每个句柄的 [`Capabilities`] 做决定，不了解下游的具体实现。
//!
//! ## 分发策略（How）
//! 1. 存在修改型消费者时，除最后一个外都拿到深拷贝；最后一个仅在“没有只读消费者且批次尚未只读”时
//!    拿到原实例，否则同样拿到深拷贝；
//! 2. 若有两个及以上只读消费者共享原实例，先将其标记为只读；
//! 3. 只读消费者全部拿到原实例。
//!
//! ## 核心契约（What）
//! - 任意两个分支不会共享一个其中一方可能修改的实例；
//! - 无论前面的分支是否失败，每个分支都会被调用；
//! - 全部成功返回 `Ok`，单个失败原样返回，多个失败合并为 [`AggregateError`](crate::AggregateError)，
//!   顺序与调用顺序一致（先修改型、后只读，各自保持注册顺序）；
//! - 路由器自身报告 `mutates_data = false`：它从不修改批次，修改型分支拿到的实例与上游无关。

use crate::consumer::{Capabilities, Consumer, ConsumerHandle};
use crate::contract::CallContext;
use crate::data::{Batch, SignalData};
use crate::error::{self, ConfigurationError, WeirError};

/// 按能力描述符分发批次的扇出路由器。
pub struct FanOut<D: SignalData> {
    mutating: Vec<ConsumerHandle<D>>,
    read_only: Vec<ConsumerHandle<D>>,
}

impl<D: SignalData> FanOut<D> {
    /// 为一组消费者构造分发入口。
    ///
    /// # 契约说明（What）
    /// - 空集合返回 [`ConfigurationError::EmptyFanOut`]；
    /// - 仅一个消费者时直接返回该消费者本身，不额外包装，也不做任何克隆：该消费者为修改型时，
    ///   上游必须按其修改型能力交出独占实例；若上游违约交来已只读的批次，修改会以
    ///   [`WeirError::ReadOnlyBatch`] 失败并原样返回，批次不会被静默丢弃；
    /// - 其余情况返回只读能力的路由器句柄。
    pub fn build(
        consumers: impl IntoIterator<Item = ConsumerHandle<D>>,
    ) -> Result<ConsumerHandle<D>, WeirError> {
        let mut consumers: Vec<_> = consumers.into_iter().collect();
        match consumers.len() {
            0 => Err(ConfigurationError::EmptyFanOut { kind: D::KIND }.into()),
            1 => Ok(consumers.remove(0)),
            _ => {
                let (mutating, read_only) = consumers
                    .into_iter()
                    .partition(|handle: &ConsumerHandle<D>| handle.mutates_data());
                Ok(ConsumerHandle::new(
                    FanOut {
                        mutating,
                        read_only,
                    },
                    Capabilities::READ_ONLY,
                ))
            }
        }
    }

    fn dispatch(&self, ctx: &CallContext, batch: Batch<D>) -> Vec<WeirError> {
        let mut errors = Vec::new();
        let mut record = |result: Result<(), WeirError>| {
            if let Err(err) = result {
                errors.push(err);
            }
        };

        if let Some((last, rest)) = self.mutating.split_last() {
            for handle in rest {
                record(handle.consume(ctx, batch.deep_clone()));
            }
            let last_batch = if self.read_only.is_empty() && !batch.is_read_only() {
                batch.clone()
            } else {
                batch.deep_clone()
            };
            record(last.consume(ctx, last_batch));
        }

        if self.read_only.len() > 1 {
            batch.mark_read_only();
        }
        for handle in &self.read_only {
            record(handle.consume(ctx, batch.clone()));
        }
        errors
    }
}

impl<D: SignalData> Consumer<D> for FanOut<D> {
    fn consume(&self, ctx: &CallContext, batch: Batch<D>) -> Result<(), WeirError> {
        ctx.ensure_active()?;
        error::aggregate(self.dispatch(ctx, batch))
    }
}
