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

use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchedDocument};
use crate::utils::text_encoding::charset_from_content_type;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// 静态请求的固定超时，与渲染引擎的页面加载超时无关
pub const STATIC_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// 静态抓取引擎
///
/// 基于reqwest实现的基本HTTP抓取引擎，资源下载总是走此引擎
pub struct StaticEngine;

#[async_trait]
impl FetchEngine for StaticEngine {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchedDocument)` - 原始字节与元数据
    /// * `Err(EngineError)` - 传输错误或非2xx状态，不会越过调用边界抛出
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedDocument, EngineError> {
        // Build headers
        let mut headers = HeaderMap::new();
        for (k, v) in &request.headers {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }

        // Each request gets a fresh client for cookie isolation
        let mut builder = reqwest::Client::builder()
            .timeout(request.timeout)
            .cookie_store(true);

        // Handle proxy
        if let Some(proxy_url) = &request.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| EngineError::Other(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        let response = client.get(&request.url).headers(headers).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::BadStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let declared_encoding = content_type
            .as_deref()
            .and_then(charset_from_content_type);

        let raw_bytes = response.bytes().await?.to_vec();

        Ok(FetchedDocument {
            raw_bytes,
            declared_encoding,
            content_type,
        })
    }

    /// 获取引擎名称
    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
#[path = "static_engine_test.rs"]
mod tests;
