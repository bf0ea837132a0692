// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 爬虫类型注册表（crawler_type_registry）：类型目录与内置类型初始化
/// - 爬虫实例管理器（crawler_instance_manager）：实例增删改查、配置合并与生命周期
///
/// 服务只依赖 `ConfigStore` 特质，不关心当前使用的是哪种存储后端。
pub mod crawler_instance_manager;
pub mod crawler_type_registry;

#[cfg(test)]
mod crawler_instance_manager_test;
