//! 文档解析服务 - 业务能力层
//!
//! 把一份多书文档拆成有序的 `RawItem` 列表。
//!
//! 文档形如：
//!
//! ```text
//! Book 12 The Great Escape [Jane Doe]
//! 1. Who escaped first? ...
//! Book 13 Owl Moon [Jane Yolen]
//! ...
//! ```
//!
//! 标题行只在行首识别。形似标题行但格式不对（缺右括号、书号不是数字）的小节
//! 连同正文一起被丢弃，不报错。

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::models::book::RawItem;

/// 可能是标题行：`Book` + 空白开头，且同一行带有 `[`
///
/// 正文里的 `Book 2 of the series ...` 没有方括号，不会截断前一本书。
static HEADER_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*Book[ \t]+[^\n]*\[").expect("valid regex"));

/// 严格的标题行格式：`Book <N> <Title> [<Author>]`
static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(Book[ \t]+(\d+)[ \t]+([^\[\n]+?)[ \t]+\[([^\]\n]+)\])")
        .expect("valid regex")
});

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

const AUTHOR_QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’'];

/// 解析多书文档
///
/// 返回的条目严格按标题行在文档中出现的顺序排列，不去重、不重排。
pub fn parse(document: &str) -> Vec<RawItem> {
    let sections = split_sections(document);
    let mut items = Vec::with_capacity(sections.len());

    for section in sections {
        match parse_section(section, items.len() + 1) {
            Some(item) => {
                info!(
                    "Parsed book: {} - {} by {}",
                    item.book_number, item.title, item.author
                );
                items.push(item);
            }
            None => {
                let first_line = section.lines().next().unwrap_or_default();
                debug!("跳过格式不正确的小节: {:?}", first_line);
            }
        }
    }

    items
}

/// 按标题候选行切分，文档开头第一个候选行之前的内容被忽略
fn split_sections(document: &str) -> Vec<&str> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in document.split_inclusive('\n') {
        if HEADER_CANDIDATE.is_match(line) {
            starts.push(offset);
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(document.len());
            &document[start..end]
        })
        .collect()
}

fn parse_section(section: &str, sequence_no: usize) -> Option<RawItem> {
    let caps = HEADER.captures(section)?;
    let header = caps.get(1)?;
    let book_number = caps.get(2)?.as_str().parse::<u64>().ok()?;

    let title = normalize_title(caps.get(3)?.as_str());
    if title.is_empty() {
        return None;
    }
    let author = caps
        .get(4)?
        .as_str()
        .trim()
        .trim_matches(AUTHOR_QUOTES)
        .trim()
        .to_string();

    let body = section[header.end()..].trim();
    let quiz_text = if body.is_empty() {
        header.as_str().to_string()
    } else {
        format!("{}\n{}", header.as_str(), body)
    };

    Some(RawItem {
        sequence_no,
        book_number,
        title,
        author,
        quiz_text,
    })
}

/// 标题规范化：弯引号改为直引号，连续空白压缩为一个空格
pub fn normalize_title(raw: &str) -> String {
    let straightened = raw.replace(['’', '‘'], "'");
    WHITESPACE_RUN
        .replace_all(straightened.trim(), " ")
        .into_owned()
}
