// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 受监管进程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// 运行中
    #[default]
    Running,
    /// 已停止
    Stopped,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessStatus::Running => write!(f, "running"),
            ProcessStatus::Stopped => write!(f, "stopped"),
        }
    }
}

impl FromStr for ProcessStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ProcessStatus::Running),
            "stopped" => Ok(ProcessStatus::Stopped),
            _ => Err(()),
        }
    }
}

/// 受监管进程
///
/// 进程监管器为某个服务启动的操作系统进程。内存中的条目在进程退出或
/// 被停止时移除；若配置了关系型存储，对应的审计记录会保留下来。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedProcess {
    /// 服务ID
    pub service_id: String,
    /// 进程号
    pub pid: u32,
    /// 可执行命令
    pub command: String,
    /// 命令参数
    pub args: Vec<String>,
    /// 进程状态
    pub status: ProcessStatus,
    /// 启动时间
    pub start_time: DateTime<Utc>,
    /// 停止时间
    pub stop_time: Option<DateTime<Utc>>,
    /// 审计记录ID（仅关系型存储）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

/// 存活判定来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessSource {
    /// 内存中跟踪的句柄，经零信号探测确认
    Tracked,
    /// 进程表启发式扫描
    Detected,
    /// 未发现存活进程
    None,
}

/// 服务状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub id: String,
    pub running: bool,
    pub pid: Option<u32>,
    pub source: LivenessSource,
    pub optional: bool,
    pub command: String,
    pub start_time: Option<DateTime<Utc>>,
}

impl ServiceStatus {
    /// 未运行的服务状态
    pub fn stopped(id: &str, command: String, optional: bool) -> Self {
        Self {
            id: id.to_string(),
            running: false,
            pid: None,
            source: LivenessSource::None,
            optional,
            command,
            start_time: None,
        }
    }
}
