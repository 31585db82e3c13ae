// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::url_utils::url_domain;
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// 单个路径段的最大长度
const MAX_SEGMENT_LEN: usize = 200;

/// HTML内容嗅探的字节上限
const SNIFF_LIMIT: usize = 1000;

/// 清洗路径段，去除文件系统非法字符
///
/// 非法字符与控制字符替换为下划线，重复下划线折叠，
/// 首尾下划线与空格去除，空结果回退为占位符，长度截断
pub fn sanitize_segment(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut last_was_underscore = false;
    for ch in raw.chars() {
        let mapped = match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        cleaned.push(mapped);
    }

    let trimmed = cleaned.trim_matches(|c| c == '_' || c == ' ');
    if trimmed.is_empty() {
        return "untitled".to_string();
    }
    trimmed.chars().take(MAX_SEGMENT_LEN).collect()
}

/// 根据URL扩展名或尾部斜杠判断是否像HTML页面
pub fn url_suggests_document(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.ends_with(".html") || path.ends_with(".htm") || path.ends_with(".php") || path.ends_with('/')
}

/// 判断已获取的内容是否为HTML文档
///
/// 嗅探顺序：声明的Content-Type头；头缺失时退回URL启发式，
/// 再退回到字节前缀嗅探
pub fn is_document_payload(url: &Url, content_type: Option<&str>, raw: &[u8]) -> bool {
    match content_type {
        Some(ct) => ct.to_ascii_lowercase().contains("text/html"),
        None => {
            if url_suggests_document(url) {
                return true;
            }
            let sample = &raw[..raw.len().min(SNIFF_LIMIT)];
            let text = String::from_utf8_lossy(sample).to_ascii_lowercase();
            text.contains("<html") || text.contains("<!doctype html")
        }
    }
}

/// 确定一个URL的域上下文保存根目录
///
/// 与种子同域的URL落在运行目标根目录下，其他域落在目标根目录内
/// 以该域名命名的子目录下，避免跨域资源污染主目录树
pub fn save_root_for(url: &Url, seed_domain: &str, destination_root: &Path) -> PathBuf {
    let domain = url_domain(url);
    if domain == seed_domain {
        destination_root.to_path_buf()
    } else {
        destination_root.join(sanitize_segment(&domain))
    }
}

/// URL到本地文件路径的确定性映射
///
/// 纯函数：同一运行内对同一URL的重复调用总是得到相同路径。
/// `treat_as_document` 控制无扩展名时是否补 `.html` 后缀
pub fn map_url(url: &Url, save_root: &Path, treat_as_document: bool) -> PathBuf {
    let raw_path = url.path();
    let decoded: Cow<str> = urlencoding::decode(raw_path)
        .map(|c| Cow::Owned(c.into_owned()))
        .unwrap_or(Cow::Borrowed(raw_path));

    // Dot segments can appear after percent-decoding (%2F..%2F) and would
    // walk the path out of the save root, drop them before sanitizing
    let mut segments: Vec<String> = decoded
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(sanitize_segment)
        .collect();

    let (dir_segments, filename) = if decoded.ends_with('/') || segments.is_empty() {
        (segments, "index.html".to_string())
    } else {
        let last = segments.pop().unwrap_or_default();
        let filename = if last.contains('.') {
            last
        } else if treat_as_document {
            format!("{}.html", last)
        } else {
            last
        };
        (segments, filename)
    };

    let filename = if filename.is_empty() {
        if treat_as_document {
            "index.html".to_string()
        } else {
            "resource".to_string()
        }
    } else {
        filename
    };

    let mut path = save_root.to_path_buf();
    for segment in &dir_segments {
        path.push(segment);
    }
    path.push(filename);
    path
}

/// 计算从起始目录到目标文件的相对路径，分隔符统一为正斜杠
///
/// 两个路径无法用 `..` 桥接时返回None，由调用方替换为占位符
pub fn relative_path_between(target: &Path, start_dir: &Path) -> Option<String> {
    if target.is_absolute() != start_dir.is_absolute() {
        return None;
    }

    let target_parts: Vec<Component> = target.components().collect();
    let start_parts: Vec<Component> = start_dir.components().collect();

    let mut common = 0;
    while common < target_parts.len()
        && common < start_parts.len()
        && target_parts[common] == start_parts[common]
    {
        common += 1;
    }

    // Windows drive prefixes that do not match cannot be bridged
    if common == 0
        && (matches!(target_parts.first(), Some(Component::Prefix(_)))
            || matches!(start_parts.first(), Some(Component::Prefix(_))))
    {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for _ in common..start_parts.len() {
        parts.push("..".to_string());
    }
    for component in &target_parts[common..] {
        match component {
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
            _ => return None,
        }
    }

    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_sanitize_replaces_illegal_characters() {
        assert_eq!(sanitize_segment("a<b>c"), "a_b_c");
        assert_eq!(sanitize_segment("x::y"), "x_y");
        assert_eq!(sanitize_segment("___"), "untitled");
        assert_eq!(sanitize_segment(""), "untitled");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_segment(&long).chars().count(), 200);
    }

    #[test]
    fn test_map_root_url_to_index() {
        let root = Path::new("/clone");
        let path = map_url(&url("https://example.com/"), root, true);
        assert_eq!(path, Path::new("/clone/index.html"));
    }

    #[test]
    fn test_map_trailing_slash_keeps_directories() {
        let root = Path::new("/clone");
        let path = map_url(&url("https://example.com/blog/posts/"), root, true);
        assert_eq!(path, Path::new("/clone/blog/posts/index.html"));
    }

    #[test]
    fn test_map_extensionless_document_gets_html_suffix() {
        let root = Path::new("/clone");
        let path = map_url(&url("https://example.com/about"), root, true);
        assert_eq!(path, Path::new("/clone/about.html"));
    }

    #[test]
    fn test_map_extensionless_asset_keeps_bare_name() {
        let root = Path::new("/clone");
        let path = map_url(&url("https://example.com/fonts/icons"), root, false);
        assert_eq!(path, Path::new("/clone/fonts/icons"));
    }

    #[test]
    fn test_map_is_idempotent() {
        let root = Path::new("/clone");
        let u = url("https://example.com/a/b/c.css?v=3");
        assert_eq!(map_url(&u, root, false), map_url(&u, root, false));
    }

    #[test]
    fn test_map_percent_decodes_path() {
        let root = Path::new("/clone");
        let path = map_url(&url("https://example.com/my%20page.html"), root, true);
        assert_eq!(path, Path::new("/clone/my page.html"));
    }

    #[test]
    fn test_save_root_domain_scoping() {
        let dest = Path::new("/clone");
        let same = save_root_for(&url("https://example.com/x"), "example.com", dest);
        assert_eq!(same, Path::new("/clone"));

        let other = save_root_for(&url("https://cdn.example.net/x"), "example.com", dest);
        assert_eq!(other, Path::new("/clone/cdn.example.net"));
    }

    #[test]
    fn test_mapped_paths_stay_under_root() {
        let dest = Path::new("/clone");
        for u in [
            "https://example.com/",
            "https://example.com/a/b/c",
            "https://other.org/style.css",
        ] {
            let parsed = url(u);
            let root = save_root_for(&parsed, "example.com", dest);
            let mapped = map_url(&parsed, &root, true);
            assert!(mapped.starts_with(dest), "{:?} escapes the root", mapped);
        }
    }

    #[test]
    fn test_map_drops_encoded_dot_segments() {
        let root = Path::new("/clone");
        // %2F..%2F decodes to literal /../ inside one URL segment
        let path = map_url(&url("https://example.com/a%2F..%2F..%2F..%2Fpwn"), root, true);
        assert!(
            path.components().all(|c| c != Component::ParentDir && c != Component::CurDir),
            "{:?} carries dot segments",
            path
        );
        assert_eq!(path, Path::new("/clone/a/pwn.html"));

        // Literal dot segments are already normalized by the URL parser
        let path = map_url(&url("https://example.com/x/../y/./z"), root, true);
        assert_eq!(path, Path::new("/clone/y/z.html"));
    }

    #[test]
    fn test_relative_path_round_trip() {
        let page_dir = Path::new("/clone/a/b");
        let asset = Path::new("/clone/c/style.css");
        assert_eq!(
            relative_path_between(asset, page_dir).as_deref(),
            Some("../../c/style.css")
        );
    }

    #[test]
    fn test_relative_path_sibling() {
        let page_dir = Path::new("/clone");
        let asset = Path::new("/clone/about.html");
        assert_eq!(
            relative_path_between(asset, page_dir).as_deref(),
            Some("about.html")
        );
    }

    #[test]
    fn test_relative_path_mixed_absolute_fails() {
        assert!(relative_path_between(Path::new("a/b"), Path::new("/clone")).is_none());
    }

    #[test]
    fn test_document_sniffing() {
        let u = url("https://example.com/page");
        assert!(is_document_payload(&u, Some("text/html; charset=utf-8"), b""));
        assert!(!is_document_payload(&u, Some("image/png"), b"<html>"));
        assert!(is_document_payload(&u, None, b"<!DOCTYPE html><html></html>"));
        assert!(!is_document_payload(&u, None, &[0x89, b'P', b'N', b'G']));
        assert!(is_document_payload(&url("https://example.com/p.php"), None, b""));
        assert!(is_document_payload(&url("https://example.com/dir/"), None, b""));
    }
}
