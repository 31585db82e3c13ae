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

use crate::domain::path_mapper::sanitize_segment;
use crate::domain::task::CloneMode;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

/// 默认User-Agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// 自动生成目标路径时使用的子目录名
const DEFAULT_DOCS_SUBDIR: &str = "My Cloned Websites";

/// 克隆运行配置
///
/// 对核心算法而言是不透明数据，由外壳在启动时提供
#[derive(Debug, Clone, Deserialize)]
pub struct CloneSettings {
    /// 种子URL
    pub seed_url: String,
    /// 目标根目录，缺省时按种子域派生
    pub destination_root: Option<PathBuf>,
    /// 克隆模式
    pub mode: CloneMode,
    /// HTTP请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 渲染引擎配置
    pub browser: BrowserSettings,
    /// 请求间隔（秒）
    pub request_delay: u64,
    /// 代理配置
    pub proxy: ProxySettings,
    /// 最大递归深度
    pub max_depth: u32,
}

/// 渲染引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 是否启用动态渲染引擎
    pub enabled: bool,
    /// 页面加载超时（秒）
    pub page_load_timeout: u64,
}

/// 代理配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxySettings {
    /// 代理主机，可携带协议前缀（如 socks5://127.0.0.1）
    pub host: String,
    /// 代理端口
    pub port: String,
}

impl CloneSettings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(CloneSettings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败（如种子URL缺失）
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // Traversal defaults
            .set_default("mode", "recursive")?
            .set_default("max_depth", 5)?
            .set_default("request_delay", 1)?
            // Rendered engine defaults
            .set_default("browser.enabled", false)?
            .set_default("browser.page_load_timeout", 30)?
            // Proxy defaults (empty means direct connection)
            .set_default("proxy.host", "")?
            .set_default("proxy.port", "")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("CLONRS").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// 解析种子URL
    pub fn seed(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.seed_url.trim())
    }

    /// 生效的请求头，User-Agent缺失时补默认值
    pub fn effective_headers(&self) -> HashMap<String, String> {
        let mut headers = self.headers.clone();
        if !headers.contains_key("User-Agent") {
            headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
        }
        headers
    }

    /// 归一化的代理URL
    ///
    /// 未显式给出协议时补 `http://` 前缀；同一URL同时服务HTTP与HTTPS流量
    pub fn proxy_url(&self) -> Option<String> {
        if self.proxy.host.is_empty() || self.proxy.port.is_empty() {
            return None;
        }
        if self.proxy.host.contains("://") {
            Some(format!("{}:{}", self.proxy.host, self.proxy.port))
        } else {
            Some(format!("http://{}:{}", self.proxy.host, self.proxy.port))
        }
    }

    /// 运行的目标根目录
    ///
    /// 未配置时落在 `~/Documents/My Cloned Websites/<域名>`，
    /// Documents不存在则退回当前目录
    pub fn destination(&self, seed: &Url) -> PathBuf {
        if let Some(root) = &self.destination_root {
            return root.clone();
        }

        let base = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join("Documents"))
            .filter(|docs| docs.is_dir())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let domain = crate::utils::url_utils::url_domain(seed);
        base.join(DEFAULT_DOCS_SUBDIR).join(sanitize_segment(&domain))
    }
}
