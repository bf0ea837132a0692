// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库实体模块
///
/// 使用SeaORM框架定义关系型后端的表结构，
/// 配置块等开放结构以 JSON 列存储
pub mod crawler_instance;
pub mod crawler_type;
pub mod service_run;
