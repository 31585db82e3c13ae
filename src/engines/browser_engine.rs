// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchedDocument};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 浏览器会话
///
/// 昂贵的惰性初始化资源，无论成功或失败路径都必须释放
struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// 渲染抓取引擎
///
/// 基于chromiumoxide驱动无头浏览器加载页面，等待固定的稳定间隔后
/// 返回渲染完成的DOM序列化。仅用于启用动态引擎时的深度0任务
pub struct BrowserEngine {
    session: Mutex<Option<BrowserSession>>,
    /// 页面加载超时
    page_load_timeout: Duration,
    /// 渲染稳定等待（请求间隔 + 1秒）
    settle_delay: Duration,
    user_agent: Option<String>,
    proxy: Option<String>,
}

impl BrowserEngine {
    pub fn new(
        page_load_timeout: Duration,
        settle_delay: Duration,
        user_agent: Option<String>,
        proxy: Option<String>,
    ) -> Self {
        Self {
            session: Mutex::new(None),
            page_load_timeout,
            settle_delay,
            user_agent,
            proxy,
        }
    }

    /// 启动无头浏览器并挂起事件处理任务
    async fn launch(&self) -> Result<BrowserSession, EngineError> {
        info!("Launching headless browser session");
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.page_load_timeout);

        builder = builder.arg("--disable-gpu").arg("--disable-dev-shm-usage");

        if let Some(ua) = &self.user_agent {
            builder = builder.arg(format!("--user-agent={}", ua));
        }
        if let Some(proxy) = &self.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        let config = builder
            .build()
            .map_err(|e| EngineError::Browser(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))?;

        // Spawn a handler to process browser events
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(BrowserSession {
            browser,
            handler_task,
        })
    }

    /// 释放浏览器会话
    ///
    /// 幂等：超时路径与显式停止路径可能竞争释放，重复调用无副作用
    pub async fn shutdown(&self) {
        let mut guard = self.session.lock().await;
        if let Some(mut session) = guard.take() {
            if let Err(e) = session.browser.close().await {
                debug!("Browser close reported error: {}", e);
            }
            session.handler_task.abort();
            info!("Headless browser session released");
        }
    }
}

#[async_trait]
impl FetchEngine for BrowserEngine {
    /// 执行渲染抓取
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchedDocument)` - 渲染后DOM的UTF-8字节，内容类型按HTML处理
    /// * `Err(EngineError)` - 超时或驱动错误，调用方应回退到静态引擎
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedDocument, EngineError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let session = guard
            .as_mut()
            .ok_or_else(|| EngineError::Browser("session unavailable".to_string()))?;

        let content = tokio::time::timeout(self.page_load_timeout, async {
            let page = session
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;

            page.goto(request.url.as_str())
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;

            // Fixed settle interval for late-running scripts
            tokio::time::sleep(self.settle_delay).await;

            page.content()
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))
        })
        .await
        .map_err(|_| EngineError::Timeout)??;

        Ok(FetchedDocument {
            raw_bytes: content.into_bytes(),
            declared_encoding: Some("utf-8".to_string()),
            content_type: Some("text/html".to_string()),
        })
    }

    /// 获取引擎名称
    fn name(&self) -> &'static str {
        "browser"
    }
}
