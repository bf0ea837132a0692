// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sysinfo::{
    Pid as SysPid, ProcessRefreshKind, ProcessStatus as SysProcessStatus, ProcessesToUpdate,
    System, UpdateKind,
};

/// 进程存活探测
pub trait ProcessProbe: Send + Sync {
    /// 零信号探测；僵尸进程在被回收前同样返回 `true`
    fn is_alive(&self, pid: u32) -> bool;

    /// 在进程表中查找命令行包含任一 `needles` 子串的进程，尽力而为
    ///
    /// 空白子串被忽略
    fn find_matching(&self, needles: &[String]) -> Option<u32>;
}

/// 基于操作系统进程表的探测实现
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessProbe;

impl ProcessProbe for SystemProcessProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        match kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            // Exists but belongs to another user.
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    fn is_alive(&self, pid: u32) -> bool {
        let mut system = System::new();
        let target = SysPid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
        system.process(target).is_some()
    }

    fn find_matching(&self, needles: &[String]) -> Option<u32> {
        let needles: Vec<&str> = needles
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        if needles.is_empty() {
            return None;
        }

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        let own_pid = SysPid::from_u32(std::process::id());
        system
            .processes()
            .iter()
            .filter(|(pid, process)| {
                **pid != own_pid && process.status() != SysProcessStatus::Zombie
            })
            .find(|(_, process)| {
                let command_line = process
                    .cmd()
                    .iter()
                    .map(|part| part.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");
                needles.iter().any(|needle| command_line.contains(needle))
            })
            .map(|(pid, _)| pid.as_u32())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_is_alive() {
        assert!(SystemProcessProbe.is_alive(std::process::id()));
    }

    #[test]
    fn test_unused_pid_is_not_alive() {
        // Above the default Linux pid_max.
        assert!(!SystemProcessProbe.is_alive(4_194_304 + 17));
    }

    #[test]
    fn test_blank_needles_never_match() {
        assert_eq!(SystemProcessProbe.find_matching(&[]), None);
        assert_eq!(
            SystemProcessProbe.find_matching(&["   ".to_string(), String::new()]),
            None
        );
    }

    #[test]
    fn test_scan_finds_a_spawned_child() {
        let mut child = std::process::Command::new("sleep")
            .arg("7.25")
            .spawn()
            .unwrap();

        let found = SystemProcessProbe.find_matching(&["sleep 7.25".to_string()]);

        child.kill().unwrap();
        child.wait().unwrap();
        assert_eq!(found, Some(child.id()));
    }

    #[test]
    fn test_scan_matches_on_arguments_alone() {
        let mut child = std::process::Command::new("sleep")
            .arg("7.75")
            .spawn()
            .unwrap();

        // The command never matches; the arguments do.
        let found = SystemProcessProbe.find_matching(&[
            "/nonexistent/crawlplane-launcher".to_string(),
            "7.75".to_string(),
        ]);

        child.kill().unwrap();
        child.wait().unwrap();
        assert_eq!(found, Some(child.id()));
    }
}
