// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 请求提取器
///
/// 包装 axum 的提取器，拒绝时输出统一格式的错误响应
pub mod request;
