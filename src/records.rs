use log::debug;
use regex::Regex;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// 根域名在面板中的主机名
pub const APEX_HOSTNAME: &str = "@";

// DNS 页面中内嵌的记录列表: "dataSource":{"data":[...]}
static DATA_SOURCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""dataSource"\s*:\s*\{\s*"data"\s*:\s*(\[(?:[^"\]]|"(?:[^"\\]|\\.)*")*\])"#)
        .expect("valid dataSource pattern")
});

// ========== 记录结构 ==========

/// 面板中的一条 DNS 记录
///
/// 字段按读取顺序保存，提交时按同样的顺序输出。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DnsRecord {
    fields: Vec<(String, String)>,
}

impl DnsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 修改已有字段；字段不存在时追加到末尾
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    pub fn hostname(&self) -> Option<&str> {
        self.get("hostname")
    }

    pub fn record_type(&self) -> Option<&str> {
        self.get("type")
    }

    pub fn target(&self) -> Option<&str> {
        self.get("target")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DnsRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = DnsRecord::new();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

impl Serialize for DnsRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DnsRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = DnsRecord;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a dns record object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<DnsRecord, A::Error> {
        let mut record = DnsRecord::new();
        while let Some(key) = map.next_key::<String>()? {
            if record.get(&key).is_some() {
                return Err(de::Error::custom(format_args!("duplicate field `{key}`")));
            }
            let value: Value = map.next_value()?;
            let text = scalar_text(value)
                .ok_or_else(|| de::Error::custom(format_args!("field `{key}` is not a scalar")))?;
            record.fields.push((key, text));
        }
        Ok(record)
    }
}

/// 标量 JSON 值转为面板使用的文本；嵌套的数组或对象返回 None
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

// ========== 编解码 ==========

/// 从 DNS 管理页面的 HTML 中截取记录列表的 JSON 数组
pub fn extract(html: &str) -> Option<&str> {
    DATA_SOURCE_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// 解析 JSON 数组形式的记录列表
pub fn decode(json: &str) -> Result<Vec<DnsRecord>> {
    let records: Vec<DnsRecord> =
        serde_json::from_str(json).map_err(|e| Error::malformed(e.to_string()))?;

    let mut ids = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        match record.id() {
            Some(id) if !id.is_empty() => {
                if !ids.insert(id) {
                    return Err(Error::malformed(format!("duplicate record id '{id}'")));
                }
            }
            _ => return Err(Error::malformed(format!("record #{index} has no id"))),
        }
    }
    debug!("decoded {} dns records", records.len());
    Ok(records)
}

/// 编码为面板提交使用的格式: records[<id>][<key>]=<value>
///
/// 值原样输出，不做任何转义，这是面板解析器能接受的格式。
pub fn encode(records: &[DnsRecord]) -> String {
    let mut segments = Vec::new();
    for record in records {
        let id = record.id().unwrap_or_default();
        for (key, value) in record.fields() {
            segments.push(format!("records[{id}][{key}]={value}"));
        }
    }
    segments.join("&")
}

// ========== 记录修改 ==========

/// 空子域名表示根域名 `@`
pub fn normalize_hostname(subdomain: &str) -> &str {
    if subdomain.is_empty() {
        APEX_HOSTNAME
    } else {
        subdomain
    }
}

/// 把主机名和类型都匹配的记录指向新的目标，返回修改的条数
pub fn apply_update(
    records: &mut [DnsRecord],
    hostname: &str,
    record_type: &str,
    new_target: &str,
) -> usize {
    let mut updated = 0;
    for record in records.iter_mut() {
        if record.hostname() != Some(hostname) || record.record_type() != Some(record_type) {
            continue;
        }
        record.set("target", new_target);
        record.set("modified", "1");
        updated += 1;
    }
    updated
}
