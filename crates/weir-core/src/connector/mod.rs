//! # connector 模块说明
//!
//! ## 角色定位（Why）
//! - 连接器同时是一条管线的终点与另一条管线的起点，可在三种信号之间任意转换或转发；
//! - 九种 (源, 目标) 组合以固定的 3×3 注册表表达，装配期一次性校验，运行期只读。
//!
//! ## 核心契约（What）
//! - 工厂 [`ConnectorFactory`] 声明支持的信号对、各自的稳定性等级与默认配置；
//! - [`ConnectorBuilder::build`] 在装配期发现全部配置错误：空绑定、不支持的信号对、目标种类不符、重复绑定；
//! - 构建结果 [`Connector`] 为每个订阅的源种类暴露恰好一个入口，请求不存在的入口立即返回
//!   [`ConfigurationError::MissingEntryPoint`]，而非等到第一批数据到达；
//! - 同一源种类转发到多个目标时，入口经由 [`FanOut`] 分发到各条转发路径；
//! - 转发在调用方线程同步执行，下游错误原样返回。
//!
//! ## 实现策略（How）
//! - 工厂注册表保存类型擦除后的构造闭包：闭包内部把 [`AnyConsumer`] 还原为目标种类句柄，
//!   调用具体构造函数，再包上 [`route::Instrumented`] 自观测层；
//! - 连接器整体的 `mutates_data` 为全部转发路径能力的逻辑或，每个入口句柄都声明同一能力，
//!   上游无论通过 [`Connector::capabilities`] 还是入口句柄判断，结论一致。

pub mod builtin;
mod route;

use std::fmt;

use crate::component::{ComponentId, CreateSettings};
use crate::consumer::{AnyConsumer, Capabilities, ConsumerHandle};
use crate::data::{LogsData, MetricsData, SignalData, TracesData};
use crate::error::{ConfigurationError, WeirError};
use crate::fanout::FanOut;
use crate::signal::{SignalKind, SignalPair, StabilityLevel};

use route::{Instrumented, RouteTelemetry};

/// 具体转发路径的构造函数：给定目标种类 `T` 的下游句柄，返回源种类 `S` 的入口句柄。
pub type CreateFn<C, S, T> =
    fn(&CreateSettings, &C, ConsumerHandle<T>) -> Result<ConsumerHandle<S>, WeirError>;

type ErasedCreate<C> = Box<
    dyn Fn(&CreateSettings, &C, AnyConsumer, &RouteTelemetry) -> Result<AnyConsumer, WeirError>
        + Send
        + Sync,
>;

struct Registration<C> {
    create: ErasedCreate<C>,
    stability: StabilityLevel,
}

/// 连接器工厂。
///
/// # 教案式说明
/// - **意图 (Why)**：工厂是连接器的唯一装配入口，声明“能做什么”，具体绑定由 [`Connector::builder`] 完成；
/// - **契约 (What)**：
///   - `type_name`：连接器类型名，出现在日志与错误中；
///   - `default_config`：未显式提供配置时使用；
///   - 九个 `with_<源>_to_<目标>` 方法各注册一个信号对，重复注册以后者为准；
/// - **设计权衡 (Trade-offs)**：构造函数使用 `fn` 指针而非闭包，工厂因此可以作为静态定义复用。
pub struct ConnectorFactory<C> {
    type_name: &'static str,
    default_config: fn() -> C,
    table: [[Option<Registration<C>>; SignalKind::COUNT]; SignalKind::COUNT],
}

impl<C: Send + Sync + 'static> ConnectorFactory<C> {
    /// 创建尚未注册任何信号对的工厂。
    pub fn new(type_name: &'static str, default_config: fn() -> C) -> Self {
        Self {
            type_name,
            default_config,
            table: Default::default(),
        }
    }

    /// 连接器类型名。
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 生成默认配置。
    pub fn default_config(&self) -> C {
        (self.default_config)()
    }

    /// 是否支持该信号对。
    pub fn supports(&self, pair: SignalPair) -> bool {
        self.registration(pair).is_some()
    }

    /// 信号对的稳定性等级；不支持时返回 `None`。
    pub fn stability(&self, pair: SignalPair) -> Option<StabilityLevel> {
        self.registration(pair).map(|registration| registration.stability)
    }

    /// 全部已支持的信号对，按源优先的固定顺序。
    pub fn supported_pairs(&self) -> Vec<SignalPair> {
        SignalPair::all().filter(|pair| self.supports(*pair)).collect()
    }

    pub fn with_traces_to_traces(
        self,
        create: CreateFn<C, TracesData, TracesData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    pub fn with_traces_to_metrics(
        self,
        create: CreateFn<C, TracesData, MetricsData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    pub fn with_traces_to_logs(
        self,
        create: CreateFn<C, TracesData, LogsData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    pub fn with_metrics_to_traces(
        self,
        create: CreateFn<C, MetricsData, TracesData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    pub fn with_metrics_to_metrics(
        self,
        create: CreateFn<C, MetricsData, MetricsData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    pub fn with_metrics_to_logs(
        self,
        create: CreateFn<C, MetricsData, LogsData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    pub fn with_logs_to_traces(
        self,
        create: CreateFn<C, LogsData, TracesData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    pub fn with_logs_to_metrics(
        self,
        create: CreateFn<C, LogsData, MetricsData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    pub fn with_logs_to_logs(
        self,
        create: CreateFn<C, LogsData, LogsData>,
        stability: StabilityLevel,
    ) -> Self {
        self.register(create, stability)
    }

    /// 注册任意信号对；九个具名方法都委托到这里。
    pub fn register<S: SignalData, T: SignalData>(
        mut self,
        create: CreateFn<C, S, T>,
        stability: StabilityLevel,
    ) -> Self {
        let erased = move |settings: &CreateSettings,
                           config: &C,
                           destination: AnyConsumer,
                           telemetry: &RouteTelemetry|
              -> Result<AnyConsumer, WeirError> {
            let destination = T::from_any(destination).map_err(|other| {
                ConfigurationError::ConsumerKindMismatch {
                    connector: settings.id.to_string().into(),
                    pair: SignalPair::new(S::KIND, T::KIND),
                    actual: other.kind(),
                }
            })?;
            let created = create(settings, config, destination)?;
            Ok(S::into_any(Instrumented::wrap(created, telemetry.clone())))
        };
        self.table[S::KIND.index()][T::KIND.index()] = Some(Registration {
            create: Box::new(erased),
            stability,
        });
        self
    }

    fn registration(&self, pair: SignalPair) -> Option<&Registration<C>> {
        self.table[pair.source.index()][pair.destination.index()].as_ref()
    }
}

impl<C> fmt::Debug for ConnectorFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let supported: Vec<String> = SignalPair::all()
            .filter(|pair| self.table[pair.source.index()][pair.destination.index()].is_some())
            .map(|pair| pair.to_string())
            .collect();
        f.debug_struct("ConnectorFactory")
            .field("type_name", &self.type_name)
            .field("supported", &supported)
            .finish()
    }
}

/// 已装配的连接器。
///
/// # 契约说明（What）
/// - 构造完成后不可重新配置；所有字段只读，可在线程间自由共享；
/// - 每个订阅的源种类对应一个入口，通过 [`entry`](Self::entry) 或 `traces()/metrics()/logs()` 获取。
pub struct Connector {
    id: ComponentId,
    type_name: &'static str,
    entries: [Option<AnyConsumer>; SignalKind::COUNT],
    pairs: Vec<SignalPair>,
    capabilities: Capabilities,
}

impl Connector {
    /// 以工厂与构造参数开始装配。
    pub fn builder<C: Send + Sync + 'static>(
        factory: &ConnectorFactory<C>,
        settings: CreateSettings,
    ) -> ConnectorBuilder<'_, C> {
        ConnectorBuilder {
            factory,
            settings,
            routes: Vec::new(),
        }
    }

    /// 组件标识。
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// 连接器类型名。
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 已绑定的信号对，按源优先的固定顺序。
    pub fn pairs(&self) -> &[SignalPair] {
        &self.pairs
    }

    /// 是否绑定了该信号对。
    pub fn supports(&self, pair: SignalPair) -> bool {
        self.pairs.contains(&pair)
    }

    /// 连接器整体能力：任一转发路径会修改数据即为会修改。
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// 源种类 `S` 的入口。
    pub fn entry<S: SignalData>(&self) -> Result<ConsumerHandle<S>, WeirError> {
        let missing = || ConfigurationError::MissingEntryPoint {
            connector: self.id.to_string().into(),
            kind: S::KIND,
        };
        let entry = self.entries[S::KIND.index()].clone().ok_or_else(missing)?;
        S::from_any(entry).map_err(|_| missing().into())
    }

    /// 链路追踪入口。
    pub fn traces(&self) -> Result<ConsumerHandle<TracesData>, WeirError> {
        self.entry()
    }

    /// 指标入口。
    pub fn metrics(&self) -> Result<ConsumerHandle<MetricsData>, WeirError> {
        self.entry()
    }

    /// 日志入口。
    pub fn logs(&self) -> Result<ConsumerHandle<LogsData>, WeirError> {
        self.entry()
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("id", &self.id)
            .field("pairs", &self.pairs)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// 连接器装配器：逐条绑定 (信号对, 下游消费者) 后一次性校验并构建。
pub struct ConnectorBuilder<'f, C> {
    factory: &'f ConnectorFactory<C>,
    settings: CreateSettings,
    routes: Vec<(SignalPair, AnyConsumer)>,
}

impl<C: Send + Sync + 'static> ConnectorBuilder<'_, C> {
    /// 绑定一个信号对及其目标种类的下游消费者。
    pub fn route(mut self, pair: SignalPair, consumer: impl Into<AnyConsumer>) -> Self {
        self.routes.push((pair, consumer.into()));
        self
    }

    /// 使用工厂默认配置构建。
    pub fn build(self) -> Result<Connector, WeirError> {
        let config = self.factory.default_config();
        self.build_with_config(&config)
    }

    /// 使用给定配置构建。
    ///
    /// # 契约说明（What）
    /// - 先完成全部校验再调用任何构造函数，校验失败时不会留下半装配的转发路径；
    /// - `Deprecated`/`Unmaintained` 信号对以 `warn` 级别日志提示。
    pub fn build_with_config(self, config: &C) -> Result<Connector, WeirError> {
        let ConnectorBuilder {
            factory,
            settings,
            routes,
        } = self;
        validate_routes(factory, &settings.id, &routes)?;

        let telemetry = RouteTelemetry::scope(&settings);
        let mut per_source: [Vec<AnyConsumer>; SignalKind::COUNT] = Default::default();
        let mut pairs = Vec::with_capacity(routes.len());
        let mut capabilities = Capabilities::READ_ONLY;

        for (pair, destination) in routes {
            let registration = factory.registration(pair).ok_or_else(|| {
                ConfigurationError::UnsupportedPair {
                    connector: settings.id.to_string().into(),
                    pair,
                }
            })?;
            if registration.stability.warrants_warning() {
                tracing::warn!(
                    connector = %settings.id,
                    pair = %pair,
                    stability = %registration.stability,
                    "connector route is {}; consider migrating",
                    registration.stability
                );
            }
            let entry = (registration.create)(
                &settings,
                config,
                destination,
                &telemetry.for_pair(pair),
            )?;
            capabilities = capabilities.union(entry.capabilities());
            per_source[pair.source.index()].push(entry);
            pairs.push(pair);
        }
        pairs.sort();

        let [traces, metrics, logs] = per_source;
        let entries = [
            assemble::<TracesData>(&settings.id, traces, capabilities)?,
            assemble::<MetricsData>(&settings.id, metrics, capabilities)?,
            assemble::<LogsData>(&settings.id, logs, capabilities)?,
        ];

        tracing::debug!(
            connector = %settings.id,
            routes = pairs.len(),
            mutates_data = capabilities.mutates_data,
            "connector assembled"
        );

        Ok(Connector {
            id: settings.id,
            type_name: factory.type_name(),
            entries,
            pairs,
            capabilities,
        })
    }
}

fn validate_routes<C: Send + Sync + 'static>(
    factory: &ConnectorFactory<C>,
    id: &ComponentId,
    routes: &[(SignalPair, AnyConsumer)],
) -> Result<(), ConfigurationError> {
    if routes.is_empty() {
        return Err(ConfigurationError::EmptyConnector {
            connector: id.to_string().into(),
        });
    }
    let mut seen = [[false; SignalKind::COUNT]; SignalKind::COUNT];
    for (pair, consumer) in routes {
        if !factory.supports(*pair) {
            return Err(ConfigurationError::UnsupportedPair {
                connector: id.to_string().into(),
                pair: *pair,
            });
        }
        if consumer.kind() != pair.destination {
            return Err(ConfigurationError::ConsumerKindMismatch {
                connector: id.to_string().into(),
                pair: *pair,
                actual: consumer.kind(),
            });
        }
        let slot = &mut seen[pair.source.index()][pair.destination.index()];
        if *slot {
            return Err(ConfigurationError::DuplicateRoute {
                connector: id.to_string().into(),
                pair: *pair,
            });
        }
        *slot = true;
    }
    Ok(())
}

/// 组装单个源种类的入口：多条路径经由扇出，入口统一声明连接器整体能力。
fn assemble<S: SignalData>(
    id: &ComponentId,
    routes: Vec<AnyConsumer>,
    capabilities: Capabilities,
) -> Result<Option<AnyConsumer>, WeirError> {
    if routes.is_empty() {
        return Ok(None);
    }
    let handles = routes
        .into_iter()
        .map(|any| {
            S::from_any(any).map_err(|other| ConfigurationError::ConsumerKindMismatch {
                connector: id.to_string().into(),
                pair: SignalPair::new(S::KIND, other.kind()),
                actual: other.kind(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let entry = FanOut::build(handles)?.with_capabilities(capabilities);
    Ok(Some(S::into_any(entry)))
}
