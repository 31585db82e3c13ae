// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// 将原始字节解码为UTF-8字符串
///
/// 优先使用响应声明的字符集；声明缺失或无法识别时先尝试UTF-8，
/// 再退回到编码探测。无法映射的字节以替换字符代替，不会失败
pub fn decode_bytes(raw: &[u8], declared_encoding: Option<&str>) -> String {
    if let Some(label) = declared_encoding {
        if let Some(encoding) = Encoding::for_label(label.trim().as_bytes()) {
            let (text, _, _) = encoding.decode(raw);
            return text.into_owned();
        }
    }

    if let Ok(text) = std::str::from_utf8(raw) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(raw, true);
    let encoding = detector.guess(None, true);
    encoding.decode(raw).0.into_owned()
}

/// 从Content-Type头中提取charset参数
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("charset="))
        .map(|cs| cs.trim_matches('"').to_string())
}
