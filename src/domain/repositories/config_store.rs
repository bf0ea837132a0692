// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// 存储错误类型
///
/// 不同后端的错误统一为字符串消息，不向上层泄露后端细节
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 文件读写错误
    #[error("storage I/O error: {0}")]
    Io(String),
    /// 数据库查询错误
    #[error("storage query error: {0}")]
    Query(String),
    /// 存储内容无法解析
    #[error("malformed stored data: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        StoreError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

/// 记录种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// 爬虫类型
    CrawlerTypes,
    /// 爬虫实例
    CrawlerInstances,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::CrawlerTypes, RecordKind::CrawlerInstances];

    /// 文件后端使用的文件名
    pub fn file_name(self) -> &'static str {
        match self {
            RecordKind::CrawlerTypes => "crawler-types.json",
            RecordKind::CrawlerInstances => "crawlers.json",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordKind::CrawlerTypes => write!(f, "crawler_types"),
            RecordKind::CrawlerInstances => write!(f, "crawler_instances"),
        }
    }
}

/// 记录的 `id` 字段
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// 配置存储特质
///
/// 记录为带字符串 `id` 的 JSON 对象。无论底层是关系型数据库还是 JSON 文件，
/// 读写语义保持一致。
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// 读取某类记录的全部内容
    async fn read_all(&self, kind: RecordKind) -> Result<Vec<Value>, StoreError>;

    /// 用给定集合整体替换某类记录
    async fn write_all(&self, kind: RecordKind, records: Vec<Value>) -> Result<(), StoreError>;

    /// 按 `id` 插入或替换单条记录
    async fn upsert(&self, kind: RecordKind, record: Value) -> Result<(), StoreError>;

    /// 仅当 `id` 不存在时插入，返回是否写入
    ///
    /// 已存在的记录保持不变，用于不允许覆盖的创建操作
    async fn insert_new(&self, kind: RecordKind, record: Value) -> Result<bool, StoreError>;

    /// 按 `id` 查找单条记录
    async fn find(&self, kind: RecordKind, id: &str) -> Result<Option<Value>, StoreError> {
        let records = self.read_all(kind).await?;
        Ok(records.into_iter().find(|r| record_id(r) == Some(id)))
    }

    /// 按 `id` 删除记录，返回记录是否存在
    async fn remove(&self, kind: RecordKind, id: &str) -> Result<bool, StoreError>;

    /// 后端名称，用于日志
    fn backend_name(&self) -> &'static str;
}
