// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非2xx状态码
    #[error("HTTP status {0}")]
    BadStatus(u16),
    /// 浏览器会话错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    /// 请求头
    pub headers: HashMap<String, String>,
    /// 超时时间
    pub timeout: Duration,
    /// 代理配置 (URL)
    pub proxy: Option<String>,
}

/// 已获取的文档
///
/// 任务迭代期间的瞬态数据，落盘后即销毁
#[derive(Debug)]
pub struct FetchedDocument {
    /// 原始字节
    pub raw_bytes: Vec<u8>,
    /// 响应声明的字符集
    pub declared_encoding: Option<String>,
    /// Content-Type响应头
    pub content_type: Option<String>,
}

/// 抓取引擎特质
///
/// 静态HTTP与渲染快照两种后端的统一失败信号，
/// 使调度器的降级逻辑与后端无关
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// 执行抓取
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedDocument, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
