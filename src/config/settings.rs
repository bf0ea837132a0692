// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含服务器、存储、数据库、认证、进程监管、生命周期与服务目录等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 持久化后端配置
    pub storage: StorageSettings,
    /// 数据库配置（仅关系型后端使用）
    pub database: DatabaseSettings,
    /// 进程控制接口认证配置
    #[serde(default)]
    pub auth: AuthSettings,
    /// 进程监管配置
    pub supervisor: SupervisorSettings,
    /// 爬虫实例生命周期配置
    pub lifecycle: LifecycleSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
    /// 受监管服务目录
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 持久化后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 每种记录一个 JSON 数组文件
    File,
    /// 关系型数据库（JSON 列）
    Postgres,
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 存储后端 (file, postgres)
    pub backend: StorageBackend,
    /// 文件后端数据目录
    pub data_dir: PathBuf,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: Option<String>,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 认证配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    /// 进程控制接口共享密钥，未设置时接口开放
    pub service_token: Option<String>,
}

/// 进程监管配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSettings {
    /// 启动后判定立即退出的等待时间（毫秒）
    pub start_grace_ms: u64,
    /// SIGTERM 之后升级为 SIGKILL 前的等待时间（毫秒）
    pub stop_grace_ms: u64,
    /// SIGKILL 之后等待进程回收的时间（毫秒）
    pub kill_wait_ms: u64,
}

impl SupervisorSettings {
    pub fn start_grace(&self) -> Duration {
        Duration::from_millis(self.start_grace_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn kill_wait(&self) -> Duration {
        Duration::from_millis(self.kill_wait_ms)
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            start_grace_ms: 400,
            stop_grace_ms: 1500,
            kill_wait_ms: 1000,
        }
    }
}

/// 生命周期配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleSettings {
    /// 是否拒绝非法的状态迁移（如对空闲实例执行暂停）
    pub strict_transitions: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            strict_transitions: true,
        }
    }
}

/// 指标导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// Prometheus 监听地址
    pub listen_addr: String,
}

/// 受监管服务定义
///
/// 服务目录是静态配置，不属于运行期可变状态
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceDefinition {
    /// 服务ID
    pub id: String,
    /// 可执行命令
    pub command: String,
    /// 命令参数
    #[serde(default)]
    pub args: Vec<String>,
    /// 工作目录
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// 是否为可选服务
    #[serde(default)]
    pub optional: bool,
}

impl ServiceDefinition {
    /// 完整命令行，用于日志与进程表匹配
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载内置默认值、`config/default`、`config/{APP_ENVIRONMENT}` 与
    /// `CRAWLPLANE__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.backend", "file")?
            .set_default("storage.data_dir", "./data")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("supervisor.start_grace_ms", 400)?
            .set_default("supervisor.stop_grace_ms", 1500)?
            .set_default("supervisor.kill_wait_ms", 1000)?
            .set_default("lifecycle.strict_transitions", true)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("CRAWLPLANE").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// 校验跨字段约束
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "storage.backend = \"postgres\" requires database.url".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for service in &self.services {
            if service.id.trim().is_empty() || service.command.trim().is_empty() {
                return Err(ConfigError::Message(
                    "every service needs a non-empty id and command".to_string(),
                ));
            }
            if !seen.insert(service.id.as_str()) {
                return Err(ConfigError::Message(format!(
                    "duplicate service id: {}",
                    service.id
                )));
            }
        }
        Ok(())
    }
}
