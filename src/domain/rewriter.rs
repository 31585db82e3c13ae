// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::path_mapper::{map_url, relative_path_between, save_root_for};
use crate::domain::task::{CloneMode, CrawlTask};
use crate::engines::static_engine::StaticEngine;
use crate::engines::traits::{EngineError, FetchEngine, FetchRequest};
use crate::events::{EventSink, LogLevel};
use crate::utils::url_utils::{is_http_scheme, is_skippable_reference, resolve_url, url_domain};
use ego_tree::NodeId;
use scraper::{Html, Node, Selector};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// 重写规则
///
/// 固定的标签/属性对查找表，每条携带自身的分类规则
#[derive(Debug, Clone, Copy)]
pub struct RewriteRule {
    pub tag: &'static str,
    pub attr: &'static str,
    /// srcset类列表属性仅处理第一个候选URL
    pub first_candidate_only: bool,
    /// 标签身份强制资源分类，与扩展名无关
    pub forces_asset: bool,
}

/// 参与重写的标签/属性对
pub const REWRITE_RULES: &[RewriteRule] = &[
    RewriteRule { tag: "a", attr: "href", first_candidate_only: false, forces_asset: false },
    RewriteRule { tag: "link", attr: "href", first_candidate_only: false, forces_asset: true },
    RewriteRule { tag: "iframe", attr: "src", first_candidate_only: false, forces_asset: false },
    RewriteRule { tag: "embed", attr: "src", first_candidate_only: false, forces_asset: true },
    RewriteRule { tag: "object", attr: "data", first_candidate_only: false, forces_asset: false },
    RewriteRule { tag: "img", attr: "src", first_candidate_only: false, forces_asset: true },
    RewriteRule { tag: "img", attr: "srcset", first_candidate_only: true, forces_asset: true },
    RewriteRule { tag: "img", attr: "data-src", first_candidate_only: false, forces_asset: true },
    RewriteRule { tag: "script", attr: "src", first_candidate_only: false, forces_asset: true },
    RewriteRule { tag: "source", attr: "src", first_candidate_only: false, forces_asset: true },
    RewriteRule { tag: "form", attr: "action", first_candidate_only: false, forces_asset: false },
];

/// 资源扩展名允许列表：样式、脚本、图片、字体、媒体、文档
const ASSET_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".json", ".woff",
    ".woff2", ".ttf", ".otf", ".eot", ".mp4", ".webm", ".ogg", ".mp3", ".pdf", ".doc", ".docx",
    ".xls", ".xlsx", ".ppt", ".pptx", ".xml", ".txt",
];

fn has_asset_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// 单次重写的产出
pub struct RewriteOutcome {
    /// 重写后的文档标记文本
    pub html: String,
    /// 本页准入的新遍历任务
    pub new_tasks: Vec<CrawlTask>,
    /// 本页同步下载的资源数
    pub assets_saved: u64,
    /// 本页同步下载的资源字节数
    pub asset_bytes: u64,
}

struct DiscoveredReference {
    node: NodeId,
    rule: RewriteRule,
    original: String,
}

/// 引用重写器
///
/// 对文档中固定标签/属性对上的每个引用：解析为绝对URL、
/// 资源/页面分类、经路径映射计算目标本地路径、写回相对引用，
/// 并产生资源下载副作用与新的遍历任务
pub struct ReferenceRewriter {
    seed_domain: String,
    destination_root: PathBuf,
    mode: CloneMode,
    max_depth: u32,
    /// 资源永远走静态引擎，不经渲染
    engine: Arc<StaticEngine>,
    headers: HashMap<String, String>,
    timeout: Duration,
    proxy: Option<String>,
    events: EventSink,
    cancel: Arc<AtomicBool>,
}

impl ReferenceRewriter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seed_domain: String,
        destination_root: PathBuf,
        mode: CloneMode,
        max_depth: u32,
        engine: Arc<StaticEngine>,
        headers: HashMap<String, String>,
        timeout: Duration,
        proxy: Option<String>,
        events: EventSink,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            seed_domain,
            destination_root,
            mode,
            max_depth,
            engine,
            headers,
            timeout,
            proxy,
            events,
            cancel,
        }
    }

    /// 重写一个文档的全部引用
    ///
    /// 取消标志在每个引用处检查；观察到取消时停止扫描，
    /// 已处理的部分照常序列化，文档仍会落盘
    pub async fn rewrite_document(
        &self,
        page_url: &Url,
        html: &str,
        page_local_path: &Path,
        depth: u32,
        visited: &mut HashSet<String>,
    ) -> RewriteOutcome {
        let mut document = Html::parse_document(html);

        let mut discovered: Vec<DiscoveredReference> = Vec::new();
        for rule in REWRITE_RULES {
            let selector = Selector::parse(&format!("{}[{}]", rule.tag, rule.attr)).unwrap();
            for element in document.select(&selector) {
                if let Some(value) = element.value().attr(rule.attr) {
                    discovered.push(DiscoveredReference {
                        node: element.id(),
                        rule: *rule,
                        original: value.to_string(),
                    });
                }
            }
        }

        let page_dir = page_local_path.parent().unwrap_or(Path::new("")).to_path_buf();

        let mut new_tasks: Vec<CrawlTask> = Vec::new();
        let mut assets_saved: u64 = 0;
        let mut asset_bytes: u64 = 0;
        let mut edits: Vec<(NodeId, &'static str, String)> = Vec::new();

        for reference in discovered {
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }
            let new_value = self
                .process_reference(
                    &reference,
                    page_url,
                    &page_dir,
                    depth,
                    visited,
                    &mut new_tasks,
                    &mut assets_saved,
                    &mut asset_bytes,
                )
                .await;
            if let Some(new_value) = new_value {
                edits.push((reference.node, reference.rule.attr, new_value));
            }
        }

        for (node_id, attr, new_value) in edits {
            if let Some(mut node) = document.tree.get_mut(node_id) {
                if let Node::Element(element) = node.value() {
                    for (name, value) in element.attrs.iter_mut() {
                        if &*name.local == attr {
                            *value = new_value.as_str().into();
                        }
                    }
                }
            }
        }

        let html = format!("<!DOCTYPE html>{}", document.root_element().html());

        RewriteOutcome {
            html,
            new_tasks,
            assets_saved,
            asset_bytes,
        }
    }

    /// 处理单个引用，返回属性的新值；None表示保持原样
    #[allow(clippy::too_many_arguments)]
    async fn process_reference(
        &self,
        reference: &DiscoveredReference,
        page_url: &Url,
        page_dir: &Path,
        depth: u32,
        visited: &mut HashSet<String>,
        new_tasks: &mut Vec<CrawlTask>,
        assets_saved: &mut u64,
        asset_bytes: &mut u64,
    ) -> Option<String> {
        let original = reference.original.trim();
        if is_skippable_reference(original) {
            return None;
        }

        // srcset: only the first comma-separated candidate is processed,
        // remaining candidates stay untouched
        let candidate = if reference.rule.first_candidate_only {
            original
                .split(',')
                .next()?
                .trim()
                .split_whitespace()
                .next()?
                .to_string()
        } else {
            original.to_string()
        };
        if candidate.is_empty() {
            return None;
        }

        let absolute = resolve_url(page_url, &candidate).ok()?;
        if !is_http_scheme(&absolute) {
            return None;
        }

        let link_domain = url_domain(&absolute);
        let is_asset = reference.rule.forces_asset || has_asset_extension(&absolute);

        let save_root = save_root_for(&absolute, &self.seed_domain, &self.destination_root);
        let target_path = map_url(&absolute, &save_root, !is_asset);

        let mut new_value = match relative_path_between(&target_path, page_dir) {
            Some(relative) => relative,
            None => {
                let file_name = target_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.events.log(
                    LogLevel::Error,
                    format!(
                        "Path error: could not create relative path from '{}' to '{}'. Link will be broken.",
                        page_dir.display(),
                        target_path.display()
                    ),
                );
                format!("#RELPATH_ERROR/{}", file_name)
            }
        };

        if is_asset {
            if !asset_on_disk(&target_path).await {
                match self.download_asset(&absolute, &target_path).await {
                    Ok(size) => {
                        *assets_saved += 1;
                        *asset_bytes += size;
                        self.events.file_saved(target_path.clone());
                        self.events.log(
                            LogLevel::Success,
                            format!("Saved asset: {}", target_path.display()),
                        );
                    }
                    Err(e) => {
                        self.events.log(
                            LogLevel::Error,
                            format!("Failed to download {}: {}", absolute, e),
                        );
                        new_value = format!("#FAILED_DOWNLOAD_{}", original);
                    }
                }
            } else {
                debug!("Asset already on disk: {}", target_path.display());
            }
        } else {
            let admitted = !visited.contains(absolute.as_str())
                && depth < self.max_depth
                && self.admits_page(&link_domain, depth);
            if admitted {
                visited.insert(absolute.to_string());
                new_tasks.push(CrawlTask {
                    url: absolute.clone(),
                    depth: depth + 1,
                    save_root,
                });
            } else if link_domain != self.seed_domain {
                // Not cloned: keep the external page reachable at its origin
                new_value = absolute.to_string();
            }
        }

        if reference.rule.first_candidate_only {
            return Some(reference.original.replace(&candidate, &new_value));
        }
        Some(new_value)
    }

    /// 页面链接准入策略
    ///
    /// 递归模式要求同域；单页模式仅深度0的同域页面链接入队
    fn admits_page(&self, link_domain: &str, depth: u32) -> bool {
        match self.mode {
            CloneMode::Recursive => link_domain == self.seed_domain,
            CloneMode::SinglePage => depth == 0 && link_domain == self.seed_domain,
        }
    }

    async fn download_asset(&self, url: &Url, target: &Path) -> Result<u64, EngineError> {
        let request = FetchRequest {
            url: url.to_string(),
            headers: self.headers.clone(),
            timeout: self.timeout,
            proxy: self.proxy.clone(),
        };
        let document = self.engine.fetch(&request).await?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::Other(e.to_string()))?;
        }
        tokio::fs::write(target, &document.raw_bytes)
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;

        Ok(document.raw_bytes.len() as u64)
    }
}

/// 存在且非零大小的文件才算已在磁盘上
async fn asset_on_disk(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "rewriter_test.rs"]
mod tests;
