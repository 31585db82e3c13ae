// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 路径映射、引用重写与克隆任务的核心实体
pub mod domain;

/// 引擎模块
///
/// 实现静态与渲染两种页面抓取引擎
pub mod engines;

/// 事件模块
///
/// 工作器向外壳单向推送的类型化事件流
pub mod events;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现克隆任务的后台调度与执行
pub mod workers;
