// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CloneSettings;
use crate::domain::path_mapper::{is_document_payload, map_url};
use crate::domain::rewriter::ReferenceRewriter;
use crate::domain::task::{CloneReport, CloneStatus, CrawlTask};
use crate::engines::browser_engine::BrowserEngine;
use crate::engines::static_engine::{StaticEngine, STATIC_REQUEST_TIMEOUT};
use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchedDocument};
use crate::events::{CloneEvent, EventSink, LogLevel};
use crate::utils::errors::CloneError;
use crate::utils::text_encoding::decode_bytes;
use crate::utils::url_utils::url_domain;
use crate::workers::guard::ResourceGuard;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

/// 运行中克隆任务的句柄
///
/// 事件接收端、取消开关、以及产出最终报告的任务句柄
pub struct CloneHandle {
    pub events: UnboundedReceiver<CloneEvent>,
    pub cancel: Arc<AtomicBool>,
    pub join: JoinHandle<CloneReport>,
}

impl CloneHandle {
    /// 请求取消；幂等，实际停止发生在下一个检查点
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// 克隆工作器
///
/// 顺序消费FIFO任务队列的单工作器：抓取、分类、重写、落盘。
/// 整个运行只依赖自身状态，外部只通过取消标志介入
pub struct CloneWorker {
    settings: CloneSettings,
    seed: Url,
    seed_domain: String,
    destination: PathBuf,
    static_engine: Arc<StaticEngine>,
    events: EventSink,
    cancel: Arc<AtomicBool>,
}

impl CloneWorker {
    /// 校验配置并启动克隆任务
    ///
    /// # 返回值
    ///
    /// * `Ok(CloneHandle)` - 工作器已在后台运行
    /// * `Err(CloneError)` - 种子URL无法解析，未产生任何副作用
    pub fn spawn(settings: CloneSettings) -> Result<CloneHandle, CloneError> {
        let seed = settings.seed()?;
        let destination = settings.destination(&seed);
        let seed_domain = url_domain(&seed);

        let (events, rx) = EventSink::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let worker = CloneWorker {
            settings,
            seed,
            seed_domain,
            destination,
            static_engine: Arc::new(StaticEngine),
            events,
            cancel: cancel.clone(),
        };
        let join = tokio::spawn(async move { worker.run().await });

        Ok(CloneHandle {
            events: rx,
            cancel,
            join,
        })
    }

    async fn run(self) -> CloneReport {
        let started = Instant::now();
        let mut report = CloneReport::new(&self.seed, self.destination.clone());

        info!(
            "Clone started: {} -> {}",
            self.seed,
            self.destination.display()
        );
        self.events.log(
            LogLevel::Info,
            format!("Cloning {} into {}", self.seed, self.destination.display()),
        );

        // 渲染引擎惰性启动，仅深度0启用
        let mut browser: Option<BrowserEngine> = if self.settings.browser.enabled {
            Some(BrowserEngine::new(
                Duration::from_secs(self.settings.browser.page_load_timeout),
                Duration::from_secs(self.settings.request_delay + 1),
                self.settings.effective_headers().get("User-Agent").cloned(),
                self.settings.proxy_url(),
            ))
        } else {
            None
        };

        let rewriter = ReferenceRewriter::new(
            self.seed_domain.clone(),
            self.destination.clone(),
            self.settings.mode,
            self.settings.max_depth,
            self.static_engine.clone(),
            self.settings.effective_headers(),
            STATIC_REQUEST_TIMEOUT,
            self.settings.proxy_url(),
            self.events.clone(),
            self.cancel.clone(),
        );

        let guard = ResourceGuard::new(self.settings.request_delay);

        let mut queue: VecDeque<CrawlTask> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(self.seed.as_str().to_string());
        queue.push_back(CrawlTask {
            url: self.seed.clone(),
            depth: 0,
            save_root: self.destination.clone(),
        });

        let mut enqueued: u64 = 1;
        let mut processed: u64 = 0;
        let mut disk_tripped = false;

        while let Some(task) = queue.pop_front() {
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }

            guard.pace(report.files_downloaded).await;

            self.events.log(
                LogLevel::Info,
                format!("Processing: {} (depth {})", task.url, task.depth),
            );

            let fetched = match self.fetch_task(&task, &mut browser).await {
                Ok(document) => document,
                Err(e) => {
                    processed += 1;
                    self.events.log(
                        LogLevel::Error,
                        format!("Failed to fetch {}: {}", task.url, e),
                    );
                    self.emit_progress(processed, enqueued);
                    continue;
                }
            };
            processed += 1;

            // 落盘前检查磁盘余量，触发保护时当前文件不写入
            if let Err(CloneError::LowDiskSpace { free }) = guard.check_disk_space(
                &self.destination,
                processed - 1,
                fetched.raw_bytes.len() as u64,
            ) {
                self.events.log(
                    LogLevel::Error,
                    format!("Low disk space: {} bytes free. Stopping.", free),
                );
                disk_tripped = true;
                self.cancel.store(true, Ordering::SeqCst);
                break;
            }

            let is_document = is_document_payload(
                &task.url,
                fetched.content_type.as_deref(),
                &fetched.raw_bytes,
            );
            let target = map_url(&task.url, &task.save_root, is_document);

            let write_result = if is_document {
                let html = decode_bytes(&fetched.raw_bytes, fetched.declared_encoding.as_deref());
                self.events.emit(CloneEvent::PageContent {
                    url: task.url.to_string(),
                    html: html.clone(),
                });

                let outcome = rewriter
                    .rewrite_document(&task.url, &html, &target, task.depth, &mut visited)
                    .await;
                report.files_downloaded += outcome.assets_saved;
                report.total_bytes += outcome.asset_bytes;
                enqueued += outcome.new_tasks.len() as u64;
                queue.extend(outcome.new_tasks);

                write_file(&target, outcome.html.as_bytes()).await
            } else {
                write_file(&target, &fetched.raw_bytes).await
            };

            match write_result {
                Ok(bytes) => {
                    report.record_file(bytes);
                    self.events.file_saved(target.clone());
                    self.events
                        .log(LogLevel::Success, format!("Saved: {}", target.display()));
                }
                Err(e) => {
                    self.events.log(
                        LogLevel::Error,
                        format!("Failed to write {}: {}", target.display(), e),
                    );
                }
            }

            self.emit_progress(processed, enqueued);
            self.events.status(
                report.files_downloaded,
                report.total_bytes,
                started.elapsed().as_secs_f64(),
            );
        }

        if let Some(engine) = browser.take() {
            engine.shutdown().await;
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        report.status = if disk_tripped {
            CloneStatus::LowDiskSpace
        } else if self.cancel.load(Ordering::SeqCst) {
            CloneStatus::Stopped
        } else if report.files_downloaded == 0 {
            CloneStatus::Failed
        } else {
            CloneStatus::Completed
        };

        if report.status == CloneStatus::Completed {
            self.events.progress(100);
        }
        info!(
            "Clone finished: {} ({} files, {:.2} MB)",
            report.status.as_str(),
            report.files_downloaded,
            report.total_megabytes()
        );
        self.events
            .log(LogLevel::Info, report.status.as_str().to_string());
        self.events.emit(CloneEvent::Finished(report.clone()));
        report
    }

    /// 抓取一个任务
    ///
    /// 渲染引擎仅服务种子页（深度0）；渲染失败记录告警、释放会话，
    /// 本次与后续任务全部回退静态引擎
    async fn fetch_task(
        &self,
        task: &CrawlTask,
        browser: &mut Option<BrowserEngine>,
    ) -> Result<FetchedDocument, EngineError> {
        // The rendered engine applies its own page-load timeout; the request
        // timeout only governs the static path
        let request = FetchRequest {
            url: task.url.to_string(),
            headers: self.settings.effective_headers(),
            timeout: STATIC_REQUEST_TIMEOUT,
            proxy: self.settings.proxy_url(),
        };

        if task.depth == 0 {
            if let Some(engine) = browser.as_ref() {
                match engine.fetch(&request).await {
                    Ok(document) => return Ok(document),
                    Err(e) => {
                        warn!("Rendered fetch failed for {}: {}", task.url, e);
                        self.events.log(
                            LogLevel::Warning,
                            format!(
                                "Rendered fetch failed for {}: {}. Falling back to static fetch.",
                                task.url, e
                            ),
                        );
                        if let Some(engine) = browser.take() {
                            engine.shutdown().await;
                        }
                    }
                }
            }
        }

        self.static_engine.fetch(&request).await
    }

    /// 进度按已处理/已发现任务数估算
    fn emit_progress(&self, processed: u64, enqueued: u64) {
        let percent = (processed * 100 / enqueued.max(1)).min(100) as u8;
        self.events.progress(percent);
    }
}

async fn write_file(target: &Path, bytes: &[u8]) -> Result<u64, std::io::Error> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, bytes).await?;
    Ok(bytes.len() as u64)
}
