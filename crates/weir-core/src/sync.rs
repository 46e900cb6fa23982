//! 原子原语切换层。
//!
//! 常规构建使用 `std` 原子类型；以 `--cfg weir_loom` 构建时换成 Loom 的实现，
//! 让模型检查能够穷举闸门状态单元的读写交错。

#[cfg(not(weir_loom))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

#[cfg(weir_loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
