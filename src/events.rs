// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::task::CloneReport;
use std::path::PathBuf;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// 日志事件级别
///
/// 对应外壳中的日志着色，而非进程日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 克隆事件流
///
/// 工作器向外壳发送的类型化事件，外壳按自己的节奏消费；
/// 工作器从不读取外壳状态
#[derive(Debug, Clone)]
pub enum CloneEvent {
    /// 日志消息
    Log { message: String, level: LogLevel },
    /// 总体进度（0-100，基于已发现任务数的近似值）
    Progress(u8),
    /// 运行统计快照
    Status {
        files_downloaded: u64,
        total_megabytes: f64,
        elapsed_seconds: f64,
    },
    /// 单个文件已落盘
    FileSaved(PathBuf),
    /// 页面原始HTML（重写前，仅用于实时预览）
    PageContent { url: String, html: String },
    /// 运行结束，携带最终报告
    Finished(CloneReport),
}

/// 事件发送端
///
/// 接收端被外壳丢弃后发送静默失败，工作器照常推进
#[derive(Clone)]
pub struct EventSink {
    tx: UnboundedSender<CloneEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, UnboundedReceiver<CloneEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: CloneEvent) {
        let _ = self.tx.send(event);
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(CloneEvent::Log {
            message: message.into(),
            level,
        });
    }

    pub fn progress(&self, percent: u8) {
        self.emit(CloneEvent::Progress(percent.min(100)));
    }

    pub fn status(&self, files_downloaded: u64, total_bytes: u64, elapsed_seconds: f64) {
        self.emit(CloneEvent::Status {
            files_downloaded,
            total_megabytes: total_bytes as f64 / (1024.0 * 1024.0),
            elapsed_seconds,
        });
    }

    pub fn file_saved(&self, path: PathBuf) {
        self.emit(CloneEvent::FileSaved(path));
    }
}
