use tracing::debug;

use vigil_types::MetricValue;

/// 状态文本中的一行：`name:value`；段落标题行没有值
#[derive(Debug, Clone, PartialEq)]
pub struct StatusField {
    pub name: String,
    pub value: Option<String>,
}

/// 把一份多行状态文本解析为有序的字段序列，每个非空行一条。
/// 值末尾的回车符会被去掉；没有冒号或右侧为空的行值为 None
pub fn parse_status(blob: &str) -> Vec<StatusField> {
    let mut fields = Vec::new();
    for line in blob.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        match line.split_once(':') {
            Some((name, value)) => {
                let value = value.trim_end_matches('\r');
                fields.push(StatusField {
                    name: name.to_string(),
                    value: (!value.is_empty()).then(|| value.to_string()),
                });
            }
            None => fields.push(StatusField {
                name: line.to_string(),
                value: None,
            }),
        }
    }
    fields
}

/// 展开逗号分隔的子字段列表。
/// `db0 -> keys=37,expires=2` 变为 `db0:keys -> 37` 和 `db0:expires -> 2`；
/// 普通标量在原名下原样通过；没有值的标题行被丢弃
pub fn expand_fields(fields: Vec<StatusField>) -> Vec<(String, MetricValue)> {
    let mut expanded = Vec::new();
    for field in fields {
        let Some(value) = field.value else {
            continue;
        };

        if value.contains('=') {
            for part in value.split(',') {
                match part.split_once('=') {
                    Some((sub_name, sub_value)) => expanded.push((
                        format!("{}:{}", field.name, sub_name),
                        MetricValue::parse(sub_value),
                    )),
                    None => {
                        // 残缺的子字段跳过，不影响同一行的其余字段
                        debug!(field = %field.name, part = %part, "Skipping malformed sub-field");
                    }
                }
            }
        } else {
            expanded.push((field.name, MetricValue::parse(&value)));
        }
    }
    expanded
}
