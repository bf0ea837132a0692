// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::config_block::{deep_merge, BlockKind, ConfigBlock};

/// 爬虫类型
///
/// 一类抓取引擎的默认参数模板。`id` 为 slug，创建后不可修改，本系统不删除类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerType {
    /// 类型标识（slug）
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 描述
    pub description: String,
    /// 特性标签，实例未提供 tags 时以此为默认值
    pub features: Vec<String>,
    /// 适用场景说明
    pub usage: String,
    /// 文档地址
    pub docs_url: String,
    /// 备注
    pub notes: String,
    /// 默认运行参数
    pub default_config: ConfigBlock,
    /// 默认请求参数
    pub default_request_config: ConfigBlock,
    /// 默认URL匹配策略
    pub default_url_patterns: ConfigBlock,
    /// 默认选择器
    pub default_selectors: ConfigBlock,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl CrawlerType {
    /// 获取某个配置块的类型级默认值
    pub fn default_block(&self, kind: BlockKind) -> Option<&ConfigBlock> {
        match kind {
            BlockKind::Config => Some(&self.default_config),
            BlockKind::RequestConfig => Some(&self.default_request_config),
            BlockKind::UrlPatterns => Some(&self.default_url_patterns),
            BlockKind::Selectors => Some(&self.default_selectors),
            _ => None,
        }
    }

    fn default_block_mut(&mut self, kind: BlockKind) -> Option<&mut ConfigBlock> {
        match kind {
            BlockKind::Config => Some(&mut self.default_config),
            BlockKind::RequestConfig => Some(&mut self.default_request_config),
            BlockKind::UrlPatterns => Some(&mut self.default_url_patterns),
            BlockKind::Selectors => Some(&mut self.default_selectors),
            _ => None,
        }
    }

    /// 转换为存储文档
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-z0-9]+").expect("static slug pattern"));

/// 生成 slug
///
/// 转为小写，连续的非字母数字字符折叠为单个 `-`，并去掉首尾的 `-`。
/// 对结果再次调用返回相同的值。
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn time_field(map: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    map.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok())
}

/// 规范化爬虫类型记录
///
/// 对从存储读出的原始记录回填所有缺失字段，缺失或残缺的默认配置块由全局兜底值补齐，
/// 保证上层读到的记录字段完整。既无 `id` 也无 `name` 的记录返回 `None`。
pub fn normalize_crawler_type_record(raw: &Value) -> Option<CrawlerType> {
    let map = raw.as_object()?;

    let name = str_field(map, "name");
    let id = str_field(map, "id")
        .filter(|id| !id.trim().is_empty())
        .or_else(|| name.as_deref().map(slugify))
        .filter(|id| !id.is_empty())?;

    let created_at = time_field(map, "created_at").unwrap_or_default();

    let mut crawler_type = bare_crawler_type(id);
    if let Some(name) = name {
        crawler_type.name = name;
    }
    crawler_type.description = str_field(map, "description").unwrap_or_default();
    crawler_type.features = map.get("features").and_then(string_list).unwrap_or_default();
    crawler_type.usage = str_field(map, "usage").unwrap_or_default();
    crawler_type.docs_url = str_field(map, "docs_url").unwrap_or_default();
    crawler_type.notes = str_field(map, "notes").unwrap_or_default();
    crawler_type.created_at = created_at;
    crawler_type.updated_at = time_field(map, "updated_at").unwrap_or(created_at);

    for kind in BlockKind::ALL {
        let Some(field) = kind.type_default_field() else {
            continue;
        };
        if let (Some(Value::Object(stored)), Some(target)) =
            (map.get(field), crawler_type.default_block_mut(kind))
        {
            deep_merge(target, stored);
        }
    }

    Some(crawler_type)
}

/// 内置爬虫类型
///
/// 注册表首次读取且存储为空时写入。浏览器类引擎并发低、超时长，纯 HTTP 引擎并发最高、超时最短。
pub fn builtin_crawler_types(now: DateTime<Utc>) -> Vec<CrawlerType> {
    let builtin = |id: &str,
                   name: &str,
                   description: &str,
                   features: &[&str],
                   usage: &str,
                   docs_url: &str,
                   notes: &str,
                   config: Value,
                   request_config: Value| {
        let raw = json!({
            "id": id,
            "name": name,
            "description": description,
            "features": features,
            "usage": usage,
            "docs_url": docs_url,
            "notes": notes,
            "default_config": config,
            "default_request_config": request_config,
            "created_at": now,
            "updated_at": now,
        });
        normalize_crawler_type_record(&raw)
    };

    vec![
        builtin(
            "cheerio",
            "Cheerio",
            "Static HTML crawler that parses server-rendered markup without executing JavaScript.",
            &["fast", "low-memory", "static-html"],
            "Server-rendered sites, sitemaps, article and listing pages.",
            "https://crawlee.dev/api/cheerio-crawler",
            "Cannot see content injected by client-side scripts.",
            json!({
                "maxConcurrency": 20,
                "maxRequestsPerCrawl": 5000,
                "requestHandlerTimeoutSecs": 30,
                "navigationTimeoutSecs": 30,
                "javascriptExecution": false
            }),
            json!({ "timeoutSecs": 30 }),
        ),
        builtin(
            "playwright",
            "Playwright",
            "Full browser automation with Chromium, Firefox or WebKit.",
            &["javascript", "browser", "screenshots", "multi-browser"],
            "Single-page applications, login flows and pages that require interaction.",
            "https://crawlee.dev/api/playwright-crawler",
            "Highest memory footprint per request; keep concurrency low.",
            json!({
                "maxConcurrency": 5,
                "maxRequestsPerCrawl": 1000,
                "requestHandlerTimeoutSecs": 90,
                "navigationTimeoutSecs": 60,
                "javascriptExecution": true,
                "headless": true,
                "useSessionPool": true,
                "persistCookiesPerSession": true
            }),
            json!({ "timeoutSecs": 60 }),
        ),
        builtin(
            "puppeteer",
            "Puppeteer",
            "Headless Chrome automation over the DevTools protocol.",
            &["javascript", "browser", "screenshots", "chrome"],
            "JavaScript-heavy sites where Chrome-specific behaviour is needed.",
            "https://crawlee.dev/api/puppeteer-crawler",
            "Chrome only; session pool enabled by default.",
            json!({
                "maxConcurrency": 5,
                "maxRequestsPerCrawl": 1000,
                "requestHandlerTimeoutSecs": 60,
                "navigationTimeoutSecs": 45,
                "javascriptExecution": true,
                "headless": true,
                "useSessionPool": true,
                "persistCookiesPerSession": true
            }),
            json!({ "timeoutSecs": 45 }),
        ),
        builtin(
            "jsdom",
            "JSDOM",
            "DOM emulation with partial script execution and no real browser.",
            &["partial-javascript", "dom", "moderate-memory"],
            "Pages with light client-side rendering where a browser is overkill.",
            "https://crawlee.dev/api/jsdom-crawler",
            "Scripts relying on layout or browser APIs may fail.",
            json!({
                "maxConcurrency": 10,
                "maxRequestsPerCrawl": 2000,
                "requestHandlerTimeoutSecs": 45,
                "navigationTimeoutSecs": 45,
                "javascriptExecution": true
            }),
            json!({ "timeoutSecs": 45 }),
        ),
        builtin(
            "http",
            "HTTP",
            "Raw HTTP client for APIs, feeds and files.",
            &["fastest", "raw-http", "api"],
            "JSON APIs, RSS feeds and bulk downloads.",
            "https://crawlee.dev/api/http-crawler",
            "No HTML parsing helpers; selectors are passed through to the engine as-is.",
            json!({
                "maxConcurrency": 50,
                "maxRequestsPerCrawl": 10000,
                "requestHandlerTimeoutSecs": 15,
                "navigationTimeoutSecs": 15,
                "javascriptExecution": false
            }),
            json!({ "timeoutSecs": 15 }),
        ),
    ]
    .into_iter()
    .flatten()
    .enumerate()
    .map(|(ordinal, mut crawler_type)| {
        // Distinct timestamps keep the declared order in created_at-ordered reads.
        let stamp = now + Duration::milliseconds(ordinal as i64);
        crawler_type.created_at = stamp;
        crawler_type.updated_at = stamp;
        crawler_type
    })
    .collect()
}

/// 类型缺失时使用的兜底类型ID
pub const FALLBACK_CRAWLER_TYPE: &str = "cheerio";

/// 兜底类型
///
/// 实例引用的类型与 `cheerio` 均不在存储中时使用内置的 `cheerio` 定义
pub fn fallback_crawler_type() -> CrawlerType {
    builtin_crawler_types(DateTime::<Utc>::default())
        .into_iter()
        .find(|t| t.id == FALLBACK_CRAWLER_TYPE)
        .unwrap_or_else(|| bare_crawler_type(FALLBACK_CRAWLER_TYPE.to_string()))
}

/// 仅含全局兜底值的类型
fn bare_crawler_type(id: String) -> CrawlerType {
    CrawlerType {
        name: id.clone(),
        id,
        description: String::new(),
        features: Vec::new(),
        usage: String::new(),
        docs_url: String::new(),
        notes: String::new(),
        default_config: BlockKind::Config.fallback(),
        default_request_config: BlockKind::RequestConfig.fallback(),
        default_url_patterns: BlockKind::UrlPatterns.fallback(),
        default_selectors: BlockKind::Selectors.fallback(),
        created_at: DateTime::<Utc>::default(),
        updated_at: DateTime::<Utc>::default(),
    }
}

/// 从自由格式的 JSON 值中读取字符串数组
pub(crate) fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_rules() {
        assert_eq!(slugify("Custom HTTP"), "custom-http");
        assert_eq!(slugify("  --My__Crawler!! v2 "), "my-crawler-v2");
        assert_eq!(slugify("cheerio"), "cheerio");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        for name in [
            "Custom HTTP",
            "Playwright (Chromium)",
            "a--b",
            "-leading and trailing-",
            "ÜBER crawler 2000",
            "x",
        ] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "slug of {:?} is not stable", name);
            assert!(!once.starts_with('-') && !once.ends_with('-'));
            assert!(!once.contains("--"));
            assert_eq!(once, once.to_lowercase());
        }
    }

    #[test]
    fn test_normalize_backfills_missing_blocks() {
        let raw = json!({
            "id": "partial",
            "default_config": { "maxConcurrency": 3 }
        });

        let crawler_type = normalize_crawler_type_record(&raw).unwrap();

        assert_eq!(crawler_type.name, "partial");
        assert_eq!(crawler_type.default_config["maxConcurrency"], 3);
        assert!(crawler_type.default_config.contains_key("maxRequestRetries"));
        assert_eq!(
            crawler_type.default_selectors,
            BlockKind::Selectors.fallback()
        );
        assert_eq!(
            crawler_type.default_url_patterns,
            BlockKind::UrlPatterns.fallback()
        );
    }

    #[test]
    fn test_normalize_derives_id_from_name() {
        let crawler_type = normalize_crawler_type_record(&json!({ "name": "My Type" })).unwrap();
        assert_eq!(crawler_type.id, "my-type");

        assert!(normalize_crawler_type_record(&json!({ "description": "x" })).is_none());
        assert!(normalize_crawler_type_record(&json!("not an object")).is_none());
    }

    #[test]
    fn test_builtin_types_reflect_execution_cost() {
        let types = builtin_crawler_types(Utc::now());
        let ids: Vec<&str> = types.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["cheerio", "playwright", "puppeteer", "jsdom", "http"]);
        assert!(types.windows(2).all(|w| w[0].created_at < w[1].created_at));

        let http = types.iter().find(|t| t.id == "http").unwrap();
        assert_eq!(http.default_config["maxConcurrency"], 50);
        assert_eq!(http.default_config["requestHandlerTimeoutSecs"], 15);

        for browser in ["playwright", "puppeteer"] {
            let t = types.iter().find(|t| t.id == browser).unwrap();
            let concurrency = t.default_config["maxConcurrency"].as_u64().unwrap();
            let timeout = t.default_config["requestHandlerTimeoutSecs"].as_u64().unwrap();
            assert!(concurrency < 10);
            assert!((45..=90).contains(&timeout));
            assert_eq!(t.default_config["useSessionPool"], true);
        }
    }
}
