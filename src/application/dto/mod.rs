// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod crawler_instance_request;
pub mod crawler_type_request;
pub mod query_request;
pub mod seed_request;
