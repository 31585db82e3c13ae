// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 克隆运行错误类型
///
/// 没有任何一类错误会中止进程：单个引用或任务的最坏结果是
/// 一个标记占位符或被丢弃的任务
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("传输失败: {0}")]
    TransportFailure(String),

    #[error("渲染引擎失败: {0}")]
    RenderingFailure(String),

    #[error("相对路径计算失败: {0}")]
    PathResolutionFailure(String),

    #[error("磁盘空间不足: 剩余 {free} 字节")]
    LowDiskSpace { free: u64 },

    #[error("用户取消")]
    Cancelled,

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("无效的URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
