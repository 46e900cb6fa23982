use std::borrow::Cow;

/// 观测性属性键。
///
/// # 契约说明（What）
/// - `Cow::Borrowed` 与 `Cow::Owned` 均可；键名需保持低基数、点分小写命名（如 `signal.pair`）。
pub type AttributeKey<'a> = Cow<'a, str>;

/// 单个属性键值对，指标与 Span 共享同一建模方式。
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue<'a> {
    pub key: AttributeKey<'a>,
    pub value: MetricAttributeValue<'a>,
}

impl<'a> KeyValue<'a> {
    /// 构建新的属性键值对。
    pub fn new(
        key: impl Into<AttributeKey<'a>>,
        value: impl Into<MetricAttributeValue<'a>>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// 转为拥有所有权的形式。
    pub fn into_owned(self) -> KeyValue<'static> {
        KeyValue {
            key: Cow::Owned(self.key.into_owned()),
            value: self.value.into_owned(),
        }
    }
}

/// 属性集合的借用视图。
///
/// # 契约说明（What）
/// - 实现方不得缓存该引用超出调用栈范围；需要保留时先转为 [`OwnedAttributeSet`]。
pub type AttributeSet<'a> = &'a [KeyValue<'a>];

/// 属性值的统一枚举。
///
/// # 风险提示（Trade-offs）
/// - 未区分有符号与无符号整型，统一折叠为 `i64`；超出范围的 `u64` 执行饱和转换。
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum MetricAttributeValue<'a> {
    Text(Cow<'a, str>),
    Bool(bool),
    F64(f64),
    I64(i64),
}

impl<'a> From<&'a str> for MetricAttributeValue<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for MetricAttributeValue<'_> {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

impl<'a> From<Cow<'a, str>> for MetricAttributeValue<'a> {
    fn from(value: Cow<'a, str>) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for MetricAttributeValue<'_> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for MetricAttributeValue<'_> {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<i64> for MetricAttributeValue<'_> {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u64> for MetricAttributeValue<'_> {
    fn from(value: u64) -> Self {
        MetricAttributeValue::I64(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for MetricAttributeValue<'_> {
    fn from(value: usize) -> Self {
        MetricAttributeValue::I64(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl MetricAttributeValue<'_> {
    /// 将属性值转化为拥有所有权的形式。
    pub fn into_owned(self) -> MetricAttributeValue<'static> {
        match self {
            MetricAttributeValue::Text(text) => {
                MetricAttributeValue::Text(Cow::Owned(text.into_owned()))
            }
            MetricAttributeValue::Bool(value) => MetricAttributeValue::Bool(value),
            MetricAttributeValue::F64(value) => MetricAttributeValue::F64(value),
            MetricAttributeValue::I64(value) => MetricAttributeValue::I64(value),
        }
    }

    /// 文本值的借用视图。
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetricAttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// 拥有所有权的属性集合，供记录型实现暂存标签。
#[derive(Default, Clone, Debug, PartialEq)]
pub struct OwnedAttributeSet {
    entries: Vec<KeyValue<'static>>,
}

impl OwnedAttributeSet {
    /// 创建空的属性集合。
    pub fn new() -> Self {
        Self::default()
    }

    /// 复制借用视图中的全部键值对。
    pub fn from_borrowed(borrowed: AttributeSet<'_>) -> Self {
        Self {
            entries: borrowed.iter().cloned().map(KeyValue::into_owned).collect(),
        }
    }

    /// 追加一条键值对。
    pub fn push_owned(
        &mut self,
        key: impl Into<AttributeKey<'static>>,
        value: impl Into<MetricAttributeValue<'static>>,
    ) {
        self.entries.push(KeyValue::new(key, value));
    }

    /// 按键查找属性值。
    pub fn get(&self, key: &str) -> Option<&MetricAttributeValue<'static>> {
        self.entries
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| &kv.value)
    }

    /// 以切片形式访问属性集合。
    pub fn as_slice(&self) -> AttributeSet<'_> {
        self.entries.as_slice()
    }
}
