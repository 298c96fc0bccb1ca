use std::fmt;

/// 指标值：数值型参与均值聚合，文本型只进入原始序列
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Numeric(f64),
    Text(String),
}

impl MetricValue {
    /// 解析原始字符串，有限数值归为 Numeric，其余原样保留为 Text
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => MetricValue::Numeric(v),
            _ => MetricValue::Text(raw.to_string()),
        }
    }

    /// 数值视图，文本值返回 None
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            MetricValue::Numeric(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Numeric(v) => write!(f, "{}", v),
            MetricValue::Text(s) => write!(f, "{}", s),
        }
    }
}
