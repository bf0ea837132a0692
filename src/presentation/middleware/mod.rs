// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 中间件模块
///
/// 目前只有进程控制接口的共享密钥认证
pub mod auth_middleware;
