//! 书本处理上下文
//!
//! 封装"我正在处理文档里的第几本书"这一信息，只用于日志。

use std::fmt::Display;

use crate::models::book::RawItem;

/// 书本处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 在文档中的位置（从1开始）
    pub sequence_no: usize,

    /// 标题行里的书号
    pub book_number: u64,
}

impl ItemCtx {
    pub fn new(sequence_no: usize, book_number: u64) -> Self {
        Self {
            sequence_no,
            book_number,
        }
    }

    pub fn for_item(item: &RawItem) -> Self {
        Self::new(item.sequence_no, item.book_number)
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Book {} #{}]", self.book_number, self.sequence_no)
    }
}
