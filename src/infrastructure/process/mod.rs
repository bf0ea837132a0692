// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 进程监管模块
///
/// - 注册表（registry）：服务ID到存活进程句柄的内存映射
/// - 探测器（probe）：零信号探测与进程表扫描
/// - 监管器（supervisor）：启动、停止、状态查询与整体关闭
pub mod probe;
pub mod registry;
pub mod supervisor;
