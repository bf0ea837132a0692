// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::models::managed_process::ManagedProcess;

/// 进程退出信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// 退出码，被信号终止时为 `None`
    pub code: Option<i32>,
    /// 终止信号（仅 Unix）
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// 无法获取退出状态时使用
    pub fn unknown() -> Self {
        Self {
            code: None,
            signal: None,
        }
    }
}

/// 进程句柄
///
/// 退出信息由回收任务在 `wait()` 返回后写入，此时进程已被回收
#[derive(Debug)]
pub struct ProcessHandle {
    pub process: ManagedProcess,
    exit_rx: watch::Receiver<Option<ExitInfo>>,
}

impl ProcessHandle {
    pub fn new(process: ManagedProcess, exit_rx: watch::Receiver<Option<ExitInfo>>) -> Self {
        Self { process, exit_rx }
    }

    pub fn pid(&self) -> u32 {
        self.process.pid
    }

    pub fn service_id(&self) -> &str {
        &self.process.service_id
    }

    pub fn exit_info(&self) -> Option<ExitInfo> {
        *self.exit_rx.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.exit_info().is_some()
    }

    /// 在超时时间内等待进程退出并被回收
    pub async fn wait_exit(&self, timeout: Duration) -> Option<ExitInfo> {
        let mut rx = self.exit_rx.clone();
        let result = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(info)) => *info,
            _ => self.exit_info(),
        };
        result
    }
}

/// 进程注册表
///
/// 服务ID到存活进程句柄的映射，由进程监管器独占。注册表只是缓存，
/// 监管器重启后内容丢失，不能作为进程是否存活的唯一依据。
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    handles: DashMap<String, Arc<ProcessHandle>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service_id: &str) -> Option<Arc<ProcessHandle>> {
        self.handles.get(service_id).map(|h| h.value().clone())
    }

    pub fn insert(&self, handle: Arc<ProcessHandle>) {
        self.handles.insert(handle.service_id().to_string(), handle);
    }

    /// 仅当登记的进程号仍为 `pid` 时移除，避免误删同一服务的新进程
    pub fn remove_if_pid(&self, service_id: &str, pid: u32) -> bool {
        self.handles
            .remove_if(service_id, |_, handle| handle.pid() == pid)
            .is_some()
    }

    pub fn service_ids(&self) -> Vec<String> {
        self.handles.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
