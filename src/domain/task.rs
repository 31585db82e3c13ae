// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// 克隆模式
///
/// 决定发现的页面链接是否进入遍历队列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
    /// 同域多跳递归克隆
    Recursive,
    /// 种子页 + 其资源 + 一跳同域页面链接
    SinglePage,
}

/// 爬取任务
///
/// 链接被准入时创建，由调度器消费恰好一次，创建后不再变更
#[derive(Debug, Clone)]
pub struct CrawlTask {
    /// 绝对URL
    pub url: Url,
    /// 遍历深度，根任务为0，每条遍历边严格加1
    pub depth: u32,
    /// 该URL域上下文的保存根目录
    pub save_root: PathBuf,
}

/// 运行终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloneStatus {
    Idle,
    Running,
    Completed,
    /// 用户主动停止
    Stopped,
    /// 磁盘空间保护触发
    LowDiskSpace,
    /// 没有保存任何文件
    Failed,
}

impl CloneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloneStatus::Idle => "Idle",
            CloneStatus::Running => "Running",
            CloneStatus::Completed => "Completed",
            CloneStatus::Stopped => "Stopped by user",
            CloneStatus::LowDiskSpace => "Stopped: low disk space",
            CloneStatus::Failed => "Failed or nothing to download",
        }
    }
}

/// 克隆报告
///
/// 运行开始时创建，整个运行期间只做累加，结束时发出一次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneReport {
    pub base_url: String,
    pub destination_root: PathBuf,
    pub files_downloaded: u64,
    pub total_bytes: u64,
    pub duration_seconds: f64,
    pub status: CloneStatus,
}

impl CloneReport {
    pub fn new(base_url: &Url, destination_root: PathBuf) -> Self {
        Self {
            base_url: base_url.to_string(),
            destination_root,
            files_downloaded: 0,
            total_bytes: 0,
            duration_seconds: 0.0,
            status: CloneStatus::Running,
        }
    }

    /// 记录一个已落盘的文件
    pub fn record_file(&mut self, bytes: u64) {
        self.files_downloaded += 1;
        self.total_bytes += bytes;
    }

    pub fn total_megabytes(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }

    /// 平均下载速度（MB/s）
    pub fn average_speed(&self) -> f64 {
        if self.duration_seconds > 0.1 {
            self.total_megabytes() / self.duration_seconds
        } else {
            0.0
        }
    }
}
