// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use futures::future::join_all;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use super::probe::ProcessProbe;
use super::registry::{ExitInfo, ProcessHandle, ProcessRegistry};
use crate::config::settings::{ServiceDefinition, SupervisorSettings};
use crate::domain::models::managed_process::{
    LivenessSource, ManagedProcess, ProcessStatus, ServiceStatus,
};
use crate::domain::repositories::process_run_repository::ProcessRunRepository;
use crate::utils::errors::ControlError;

/// 终止方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    /// SIGTERM
    Graceful,
    /// SIGKILL
    Forced,
}

/// 进程监管器
///
/// 为静态服务目录中的服务启动、跟踪与终止操作系统进程。
/// 注册表与探测器通过构造函数注入，多个监管器之间互不影响。
pub struct ProcessSupervisor {
    catalog: Vec<ServiceDefinition>,
    registry: Arc<ProcessRegistry>,
    probe: Arc<dyn ProcessProbe>,
    runs: Option<Arc<dyn ProcessRunRepository>>,
    settings: SupervisorSettings,
    spawn_lock: Mutex<()>,
}

impl ProcessSupervisor {
    /// 创建新的进程监管器
    ///
    /// # 参数
    ///
    /// * `catalog` - 服务目录
    /// * `registry` - 进程注册表
    /// * `probe` - 存活探测器
    /// * `runs` - 审计记录仓库，仅关系型后端提供
    /// * `settings` - 宽限期配置
    pub fn new(
        catalog: Vec<ServiceDefinition>,
        registry: Arc<ProcessRegistry>,
        probe: Arc<dyn ProcessProbe>,
        runs: Option<Arc<dyn ProcessRunRepository>>,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            catalog,
            registry,
            probe,
            runs,
            settings,
            spawn_lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &[ServiceDefinition] {
        &self.catalog
    }

    fn definition(&self, id: &str) -> Result<&ServiceDefinition, ControlError> {
        self.catalog
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ControlError::not_found("service", id))
    }

    fn is_tracked_alive(&self, handle: &ProcessHandle) -> bool {
        !handle.has_exited() && self.probe.is_alive(handle.pid())
    }

    /// 启动服务
    ///
    /// 已跟踪且未退出的进程直接返回（幂等）。新进程在启动宽限期内退出时
    /// 返回 `ImmediateExit`，并从注册表中移除。
    ///
    /// # 返回值
    ///
    /// * `Ok(ManagedProcess)` - 正在运行的进程
    /// * `Err(ControlError)` - 服务未知、启动失败或立即退出
    pub async fn start(&self, id: &str) -> Result<ManagedProcess, ControlError> {
        let definition = self.definition(id)?.clone();

        let handle = {
            let _guard = self.spawn_lock.lock().await;
            if let Some(existing) = self.registry.get(id) {
                if self.is_tracked_alive(&existing) {
                    debug!(service = id, pid = existing.pid(), "Service already running");
                    return Ok(existing.process.clone());
                }
                self.registry.remove_if_pid(id, existing.pid());
            }
            self.spawn(&definition).await?
        };

        if let Some(exit) = handle.wait_exit(self.settings.start_grace()).await {
            self.registry.remove_if_pid(id, handle.pid());
            metrics::counter!("service_start_failures_total").increment(1);
            error!(
                service = id,
                pid = handle.pid(),
                exit_code = ?exit.code,
                signal = ?exit.signal,
                "Service exited during start grace period"
            );
            return Err(ControlError::ImmediateExit {
                service: id.to_string(),
                code: exit.code,
                signal: exit.signal,
            });
        }

        Ok(handle.process.clone())
    }

    async fn spawn(&self, definition: &ServiceDefinition) -> Result<Arc<ProcessHandle>, ControlError> {
        let spawn_failed = |reason: String| ControlError::SpawnFailed {
            service: definition.id.clone(),
            reason,
        };

        let mut command = build_command(definition);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = command.spawn().map_err(|e| spawn_failed(e.to_string()))?;
        let pid = child
            .id()
            .ok_or_else(|| spawn_failed("process exited before its pid was read".to_string()))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(definition.id.clone(), stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(definition.id.clone(), stderr, true));
        }

        let mut process = ManagedProcess {
            service_id: definition.id.clone(),
            pid,
            command: definition.command.clone(),
            args: definition.args.clone(),
            status: ProcessStatus::Running,
            start_time: Utc::now(),
            stop_time: None,
            run_id: None,
        };
        if let Some(runs) = &self.runs {
            match runs.record_start(&process).await {
                Ok(run_id) => process.run_id = Some(run_id),
                Err(e) => warn!(service = %definition.id, "Failed to persist service run: {}", e),
            }
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        let handle = Arc::new(ProcessHandle::new(process, exit_rx));
        self.registry.insert(handle.clone());
        tokio::spawn(reap(
            child,
            handle.clone(),
            exit_tx,
            self.registry.clone(),
            self.runs.clone(),
        ));

        metrics::counter!("service_starts_total").increment(1);
        info!(
            service = %definition.id,
            pid,
            command = %definition.command_line(),
            "Spawned service"
        );
        Ok(handle)
    }

    /// 停止服务
    ///
    /// 先发送 SIGTERM，宽限期后仍存活则升级为 SIGKILL，并等待进程被回收。
    /// 信号发送失败只记录日志；审计记录与注册表总会被清理。
    pub async fn stop(&self, id: &str) -> Result<ManagedProcess, ControlError> {
        self.definition(id)?;
        let handle = self
            .registry
            .get(id)
            .ok_or_else(|| ControlError::NotRunning(id.to_string()))?;
        let pid = handle.pid();

        if !handle.has_exited() {
            send_termination(pid, Termination::Graceful).await;
            if handle.wait_exit(self.settings.stop_grace()).await.is_none() {
                warn!(service = id, pid, "Service ignored SIGTERM, escalating to SIGKILL");
                metrics::counter!("service_kill_escalations_total").increment(1);
                send_termination(pid, Termination::Forced).await;
                if handle.wait_exit(self.settings.kill_wait()).await.is_none() {
                    warn!(service = id, pid, "Service not reaped after SIGKILL");
                }
            }
        }

        let stop_time = Utc::now();
        if let (Some(runs), Some(run_id)) = (&self.runs, handle.process.run_id) {
            let exit_code = handle.exit_info().and_then(|e| e.code);
            if let Err(e) = runs.mark_stopped(run_id, stop_time, exit_code).await {
                warn!(service = id, "Failed to mark service run stopped: {}", e);
            }
        }
        self.registry.remove_if_pid(id, pid);

        metrics::counter!("service_stops_total").increment(1);
        info!(service = id, pid, "Stopped service");

        let mut process = handle.process.clone();
        process.status = ProcessStatus::Stopped;
        process.stop_time = Some(stop_time);
        Ok(process)
    }

    /// 查询单个服务状态
    pub async fn status(&self, id: &str) -> Result<ServiceStatus, ControlError> {
        let definition = self.definition(id)?;
        Ok(self.status_of(definition).await)
    }

    /// 按目录顺序查询全部服务状态
    pub async fn status_all(&self) -> Vec<ServiceStatus> {
        join_all(self.catalog.iter().map(|d| self.status_of(d))).await
    }

    /// 跟踪的句柄优先；没有句柄时退回到进程表扫描
    async fn status_of(&self, definition: &ServiceDefinition) -> ServiceStatus {
        let command_line = definition.command_line();

        if let Some(handle) = self.registry.get(&definition.id) {
            if self.is_tracked_alive(&handle) {
                return ServiceStatus {
                    id: definition.id.clone(),
                    running: true,
                    pid: Some(handle.pid()),
                    source: LivenessSource::Tracked,
                    optional: definition.optional,
                    command: command_line,
                    start_time: Some(handle.process.start_time),
                };
            }
        }

        let probe = self.probe.clone();
        let needles = scan_needles(definition);
        let detected = tokio::task::spawn_blocking(move || probe.find_matching(&needles))
            .await
            .unwrap_or(None);

        match detected {
            Some(pid) => ServiceStatus {
                id: definition.id.clone(),
                running: true,
                pid: Some(pid),
                source: LivenessSource::Detected,
                optional: definition.optional,
                command: command_line,
                start_time: None,
            },
            None => ServiceStatus::stopped(&definition.id, command_line, definition.optional),
        }
    }

    /// 查询服务最近的运行记录，最新的在前
    ///
    /// 未配置审计仓库时返回空列表
    pub async fn recent_runs(
        &self,
        id: &str,
        limit: u64,
    ) -> Result<Vec<ManagedProcess>, ControlError> {
        self.definition(id)?;
        let Some(runs) = &self.runs else {
            return Ok(Vec::new());
        };
        Ok(runs.recent_runs(id, limit).await?)
    }

    /// 终止所有跟踪的进程
    ///
    /// 控制平面自身收到 SIGINT/SIGTERM 时调用，避免留下孤儿进程
    pub async fn shutdown_all(&self) {
        let ids = self.registry.service_ids();
        if ids.is_empty() {
            return;
        }
        info!(count = ids.len(), "Stopping all tracked services");

        let results = join_all(ids.iter().map(|id| self.stop(id))).await;
        for (id, result) in ids.iter().zip(results) {
            if let Err(e) = result {
                warn!(service = %id, "Failed to stop service during shutdown: {}", e);
            }
        }
    }
}

/// 进程表扫描的匹配子串：配置的命令与参数，任一命中即视为存活
fn scan_needles(definition: &ServiceDefinition) -> Vec<String> {
    vec![definition.command.clone(), definition.args.join(" ")]
}

#[cfg(unix)]
fn build_command(definition: &ServiceDefinition) -> Command {
    let mut command = Command::new(&definition.command);
    command.args(&definition.args);
    // Own process group so signals reach forked grandchildren too.
    command.process_group(0);
    if let Some(cwd) = &definition.cwd {
        command.current_dir(cwd);
    }
    command
}

#[cfg(not(unix))]
fn build_command(definition: &ServiceDefinition) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(&definition.command).args(&definition.args);
    if let Some(cwd) = &definition.cwd {
        command.current_dir(cwd);
    }
    command
}

#[cfg(unix)]
async fn send_termination(pid: u32, termination: Termination) {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let signal = match termination {
        Termination::Graceful => Signal::SIGTERM,
        Termination::Forced => Signal::SIGKILL,
    };
    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid, "Pid out of range, cannot signal");
        return;
    };
    let target = Pid::from_raw(raw);

    match killpg(target, signal) {
        Ok(()) => {}
        Err(Errno::ESRCH) => match kill(target, signal) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!(pid, ?signal, "Failed to signal process: {}", e),
        },
        Err(e) => warn!(pid, ?signal, "Failed to signal process group: {}", e),
    }
}

#[cfg(not(unix))]
async fn send_termination(pid: u32, termination: Termination) {
    let mut command = Command::new("taskkill");
    command.arg("/PID").arg(pid.to_string()).arg("/T");
    if termination == Termination::Forced {
        command.arg("/F");
    }
    match command.output().await {
        Ok(output) if output.status.success() => {}
        Ok(output) => warn!(
            pid,
            "taskkill failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => warn!(pid, "Failed to run taskkill: {}", e),
    }
}

async fn forward_output<R>(service: String, reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stderr => warn!(service = %service, stream = "stderr", "{}", line),
            Ok(Some(line)) => info!(service = %service, stream = "stdout", "{}", line),
            Ok(None) => break,
            Err(e) => {
                debug!(service = %service, "Stopped reading service output: {}", e);
                break;
            }
        }
    }
}

/// 等待子进程退出，记录退出状态并清理
async fn reap(
    mut child: Child,
    handle: Arc<ProcessHandle>,
    exit_tx: watch::Sender<Option<ExitInfo>>,
    registry: Arc<ProcessRegistry>,
    runs: Option<Arc<dyn ProcessRunRepository>>,
) {
    let service = handle.service_id().to_string();
    let pid = handle.pid();

    let exit = match child.wait().await {
        Ok(status) => ExitInfo::from_status(status),
        Err(e) => {
            warn!(service = %service, pid, "Failed to wait for service: {}", e);
            ExitInfo::unknown()
        }
    };
    info!(
        service = %service,
        pid,
        exit_code = ?exit.code,
        signal = ?exit.signal,
        "Service exited"
    );
    // The audit row is final before any waiter observes the exit.
    if let (Some(runs), Some(run_id)) = (runs, handle.process.run_id) {
        if let Err(e) = runs.mark_stopped(run_id, Utc::now(), exit.code).await {
            warn!(service = %service, "Failed to mark service run stopped: {}", e);
        }
    }
    let _ = exit_tx.send(Some(exit));
    registry.remove_if_pid(&service, pid);
}
