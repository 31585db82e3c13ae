// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 提取URL的域标识（主机名，带非默认端口）
///
/// 同域判断以此为准，`example.com` 与 `example.com:8080` 视为不同域
pub fn url_domain(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// 判断属性值是否属于不可导航的引用
///
/// data:、javascript:、mailto:、tel: 协议以及纯片段引用不参与重写
pub fn is_skippable_reference(value: &str) -> bool {
    value.is_empty()
        || value.starts_with("data:")
        || value.starts_with("javascript:")
        || value.starts_with("mailto:")
        || value.starts_with("tel:")
        || value.starts_with('#')
}

/// 判断URL是否使用HTTP(S)协议
pub fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
