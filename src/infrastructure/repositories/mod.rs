// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口的具体实现：
/// JSON 文件后端、关系型后端、运行审计记录，以及启动时选择后端的工厂
pub mod file_store;
pub mod process_run_repo_impl;
pub mod relational_store;
pub mod store_factory;
