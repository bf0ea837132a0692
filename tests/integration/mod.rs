// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod crawler_api_test;
pub mod crawler_type_api_test;
pub mod helpers;
#[cfg(unix)]
pub mod service_api_test;
