//! 书本相关的数据结构

use serde::{Deserialize, Serialize};

/// 从文档中解析出的一本书（一个待处理条目）
///
/// 创建后不再修改；`sequence_no` 是在源文档中的位置（从 1 开始），
/// 所有下游报告都按它排序。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub sequence_no: usize,
    /// 标题行里的书号（`Book <N>`），单文件模式下为文件序号
    pub book_number: u64,
    pub title: String,
    pub author: String,
    /// 标题行 + 正文，标题行保留给格式化阶段提供书本上下文
    pub quiz_text: String,
}

/// 目录服务中查到的一本书
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub nid: i64,
    pub title: Option<String>,
}

/// 标题解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMatch {
    pub catalog_id: i64,
    pub canonical_title: String,
}

impl CatalogMatch {
    /// 由目录条目构建；条目没有标题时沿用查询时的原始标题
    pub fn from_entry(entry: &CatalogEntry, fallback_title: &str) -> Self {
        Self {
            catalog_id: entry.nid,
            canonical_title: entry
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| fallback_title.to_string()),
        }
    }
}
