//! 通知模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 地理定向通知
///
/// `cells` 为目标地理格子的键；`start` 仅作记录，调度器只依据 `end` 判断是否过期。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub cells: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        cells: Vec<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            cells,
            start,
            end,
        }
    }

    /// 以当前时间判断是否已过期
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// `now >= end` 即视为过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }

    /// 从 JSON 文件加载通知列表
    pub fn load_all(path: &std::path::Path) -> anyhow::Result<Vec<Self>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
