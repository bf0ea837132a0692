// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的持久化抽象，具体实现由基础设施层提供：
/// - 配置存储（config_store）：爬虫类型与爬虫实例的文档存储
/// - 运行记录仓库（process_run_repository）：受监管进程的审计记录
pub mod config_store;
pub mod process_run_repository;
