// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了控制平面的核心实体，包括：
/// - 配置块（config_block）：类型默认值与实例配置的合并规则
/// - 爬虫类型（crawler_type）：一类抓取引擎的默认参数模板
/// - 爬虫实例（crawler_instance）：由类型派生、带生命周期的抓取任务
/// - 受监管进程（managed_process）：进程监管器启动的服务进程
pub mod config_block;
pub mod crawler_instance;
pub mod crawler_type;
pub mod managed_process;
