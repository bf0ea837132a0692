// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::repositories::config_store::{record_id, ConfigStore, RecordKind, StoreError};

/// 文件存储
///
/// 每种记录保存为数据目录下的一个 JSON 数组文件，每次修改整体重写。
/// 同一种记录的修改通过独立的互斥锁串行执行，进程内的并发写入不会互相覆盖。
pub struct FileStore {
    data_dir: PathBuf,
    writers: HashMap<RecordKind, Mutex<()>>,
}

impl FileStore {
    /// 创建新的文件存储
    ///
    /// # 参数
    ///
    /// * `data_dir` - 数据目录，首次写入时自动创建
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            writers: RecordKind::ALL
                .into_iter()
                .map(|kind| (kind, Mutex::new(())))
                .collect(),
        }
    }

    /// 数据目录
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, kind: RecordKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    async fn read_file(&self, kind: RecordKind) -> Result<Vec<Value>, StoreError> {
        let path = self.path_for(kind);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        match serde_json::from_slice::<Value>(&raw)? {
            Value::Array(records) => Ok(records),
            _ => Err(StoreError::Malformed(format!(
                "{} does not contain a JSON array",
                path.display()
            ))),
        }
    }

    /// 先写临时文件再重命名，读者不会看到写了一半的文件
    async fn write_file(&self, kind: RecordKind, records: &[Value]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).await?;
        let path = self.path_for(kind);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(records)?;
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), count = records.len(), "Wrote record file");
        Ok(())
    }

    fn writer(&self, kind: RecordKind) -> &Mutex<()> {
        // Every kind is inserted in `new`.
        &self.writers[&kind]
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn read_all(&self, kind: RecordKind) -> Result<Vec<Value>, StoreError> {
        self.read_file(kind).await
    }

    async fn write_all(&self, kind: RecordKind, records: Vec<Value>) -> Result<(), StoreError> {
        let _guard = self.writer(kind).lock().await;
        self.write_file(kind, &records).await
    }

    async fn upsert(&self, kind: RecordKind, record: Value) -> Result<(), StoreError> {
        let id = record_id(&record)
            .ok_or_else(|| StoreError::Malformed("record has no id".to_string()))?
            .to_string();

        let _guard = self.writer(kind).lock().await;
        let mut records = self.read_file(kind).await?;
        match records
            .iter_mut()
            .find(|r| record_id(r) == Some(id.as_str()))
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.write_file(kind, &records).await
    }

    async fn insert_new(&self, kind: RecordKind, record: Value) -> Result<bool, StoreError> {
        let id = record_id(&record)
            .ok_or_else(|| StoreError::Malformed("record has no id".to_string()))?
            .to_string();

        let _guard = self.writer(kind).lock().await;
        let mut records = self.read_file(kind).await?;
        if records.iter().any(|r| record_id(r) == Some(id.as_str())) {
            return Ok(false);
        }
        records.push(record);
        self.write_file(kind, &records).await?;
        Ok(true)
    }

    async fn remove(&self, kind: RecordKind, id: &str) -> Result<bool, StoreError> {
        let _guard = self.writer(kind).lock().await;
        let mut records = self.read_file(kind).await?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Ok(false);
        }
        self.write_file(kind, &records).await?;
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
