use std::sync::Arc;

use super::attributes::AttributeSet;

/// 指标仪表的元数据描述。
///
/// # 设计背景（Why）
/// - 吸收 OpenTelemetry Instrument Descriptor 的设计，统一指标名称、描述与单位的声明方式；
/// - 常量形式声明，组件与测试引用同一份描述，避免名称漂移。
///
/// # 契约说明（What）
/// - `name` 遵循 `weir.<component>.<metric>` 命名并保持全局唯一；
/// - `unit` 遵循 UCUM 或惯用单位（如 `By`、`{batch}`）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstrumentDescriptor<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub unit: Option<&'a str>,
}

impl<'a> InstrumentDescriptor<'a> {
    /// 构造元数据描述。
    pub const fn new(name: &'a str) -> Self {
        Self {
            name,
            description: None,
            unit: None,
        }
    }

    /// 附加说明文本。
    pub const fn with_description(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }

    /// 附加单位信息。
    pub const fn with_unit(mut self, unit: &'a str) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// 单调递增计数器。
///
/// # 契约说明（What）
/// - 实现必须线程安全；后端不可用时应丢弃数据而非阻塞热路径。
pub trait Counter: Send + Sync {
    /// 累加指标值。
    fn add(&self, value: u64, attributes: AttributeSet<'_>);

    /// 累加 1 的便捷方法。
    fn increment(&self, attributes: AttributeSet<'_>) {
        self.add(1, attributes);
    }
}

/// 记录瞬时值的仪表，后写覆盖先写。
pub trait Gauge: Send + Sync {
    /// 直接设置数值。
    fn set(&self, value: f64, attributes: AttributeSet<'_>);
}

/// 直方图指标。
pub trait Histogram: Send + Sync {
    /// 记录样本值。
    fn record(&self, value: f64, attributes: AttributeSet<'_>);
}

/// 某一仪表作用域下的仪表工厂。
///
/// # 契约说明（What）
/// - **前置条件**：调用方在创建仪表前需提供符合规范的 [`InstrumentDescriptor`]；
/// - **后置条件**：返回的仪表实例应可长期持有；组件在构造期一次性创建并缓存。
///
/// # 风险提示（Trade-offs）
/// - 后端初始化失败时，建议返回空操作仪表，而非 panic。
pub trait Meter: Send + Sync + 'static {
    /// 获取或创建单调递增计数器。
    fn counter(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Counter>;

    /// 获取或创建瞬时值仪表。
    fn gauge(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Gauge>;

    /// 获取或创建直方图。
    fn histogram(&self, descriptor: &InstrumentDescriptor<'_>) -> Arc<dyn Histogram>;
}

/// 仪表提供者：按作用域名称分发 [`Meter`]。
///
/// # 契约说明（What）
/// - 作用域名称是稳定契约，例如内存闸门固定使用 `weir/memorylimiter`；
/// - 提供者经由 [`TelemetrySettings`](crate::TelemetrySettings) 显式传入组件，不存在隐式全局实例。
pub trait MeterProvider: Send + Sync + 'static {
    /// 获取指定作用域的仪表工厂。
    fn meter(&self, scope: &'static str) -> Arc<dyn Meter>;
}

/// 指标契约命名空间。
///
/// # 使用方式（How）
/// - 组件创建仪表时引用这里的常量；测试按同一常量断言，保证“代码即契约”。
pub mod contract {
    use super::InstrumentDescriptor;

    /// 内存闸门指标契约。
    pub mod memory_limiter {
        use super::InstrumentDescriptor;

        /// 仪表作用域。
        pub const SCOPE: &str = "weir/memorylimiter";

        /// 闸门状态：0 = Normal，1 = Limited。
        pub const STATE: InstrumentDescriptor<'static> =
            InstrumentDescriptor::new("weir.memory_limiter.state")
                .with_description("内存闸门当前状态，0 表示放行，1 表示拒绝")
                .with_unit("1");

        /// 累计拒绝次数。
        pub const REFUSED_TOTAL: InstrumentDescriptor<'static> =
            InstrumentDescriptor::new("weir.memory_limiter.refused_total")
                .with_description("闸门处于 Limited 时拒绝的准入检查次数")
                .with_unit("{refusal}");

        /// 累计回收请求次数。
        pub const RECLAIM_TOTAL: InstrumentDescriptor<'static> =
            InstrumentDescriptor::new("weir.memory_limiter.reclaim_total")
                .with_description("进入 Limited 时发起的尽力回收次数")
                .with_unit("{reclaim}");

        /// 最近一次测量到的内存占用。
        pub const USAGE_BYTES: InstrumentDescriptor<'static> =
            InstrumentDescriptor::new("weir.memory_limiter.usage_bytes")
                .with_description("监控周期最近一次测得的内存占用")
                .with_unit("By");

        /// 测量失败次数。
        pub const MEASUREMENT_FAILURES: InstrumentDescriptor<'static> =
            InstrumentDescriptor::new("weir.memory_limiter.measurement_failures")
                .with_description("无法测量内存占用而按放行处理的周期数")
                .with_unit("{tick}");

        /// 状态跃迁次数。
        pub const TRANSITIONS_TOTAL: InstrumentDescriptor<'static> =
            InstrumentDescriptor::new("weir.memory_limiter.transitions_total")
                .with_description("闸门状态跃迁次数，按目标状态分组")
                .with_unit("{transition}");

        /// 标签：组件标识。
        pub const ATTR_COMPONENT: &str = "component.id";
        /// 标签：跃迁目标状态。
        pub const ATTR_STATE: &str = "state";
    }

    /// 连接器指标契约。
    pub mod connector {
        use super::InstrumentDescriptor;

        /// 仪表作用域。
        pub const SCOPE: &str = "weir/connector";

        /// 转发批次数。
        pub const BATCHES_TOTAL: InstrumentDescriptor<'static> =
            InstrumentDescriptor::new("weir.connector.batches_total")
                .with_description("连接器各信号对转发的批次数，按结果分组")
                .with_unit("{batch}");

        /// 单批条目数分布。
        pub const BATCH_ITEMS: InstrumentDescriptor<'static> =
            InstrumentDescriptor::new("weir.connector.batch_items")
                .with_description("进入连接器的批次条目数")
                .with_unit("{item}");

        /// Span 名称：一次转发。
        pub const SPAN_FORWARD: &str = "weir.connector.forward";

        /// 标签：连接器标识。
        pub const ATTR_CONNECTOR: &str = "connector.id";
        /// 标签：信号对，如 `traces->metrics`。
        pub const ATTR_PAIR: &str = "signal.pair";
        /// 标签：转发结果。
        pub const ATTR_OUTCOME: &str = "outcome";
        /// 标签：错误码。
        pub const ATTR_ERROR_CODE: &str = "error.code";

        /// 标签值：成功。
        pub const OUTCOME_SUCCESS: &str = "success";
        /// 标签值：失败。
        pub const OUTCOME_ERROR: &str = "error";
    }
}
