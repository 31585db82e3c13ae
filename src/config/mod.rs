// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理克隆运行的配置结构：种子URL、目标目录、克隆模式、
/// 请求头、代理与深度等
pub mod settings;
