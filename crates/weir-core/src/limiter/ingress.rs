use crate::consumer::{Consumer, ConsumerHandle};
use crate::contract::CallContext;
use crate::data::{Batch, SignalData};
use crate::error::WeirError;

use super::gate::MemoryGate;

/// 入口准入包装：先检查调用上下文，再询问闸门，放行后才转发给下游。
///
/// # 契约说明（What）
/// - 闸门处于 `Limited` 时返回 [`WeirError::ResourceExhausted`]，批次不会到达下游；
/// - 包装后的句柄沿用下游的能力描述，对扇出策略透明。
pub struct AdmissionGuard<D: SignalData> {
    gate: MemoryGate,
    next: ConsumerHandle<D>,
}

impl<D: SignalData> AdmissionGuard<D> {
    /// 包装下游消费者。
    pub fn wrap(gate: MemoryGate, next: ConsumerHandle<D>) -> ConsumerHandle<D> {
        let capabilities = next.capabilities();
        ConsumerHandle::new(AdmissionGuard { gate, next }, capabilities)
    }
}

impl<D: SignalData> Consumer<D> for AdmissionGuard<D> {
    fn consume(&self, ctx: &CallContext, batch: Batch<D>) -> Result<(), WeirError> {
        ctx.ensure_active()?;
        self.gate.check_admission()?;
        self.next.consume(ctx, batch)
    }
}
