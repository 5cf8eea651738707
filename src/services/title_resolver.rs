//! 标题解析服务 - 业务能力层
//!
//! 把文档里的书名映射到目录服务中的书本 ID。
//!
//! 规则（每个候选查询只查一次，不重试）：
//! 1. 去掉 `"Let's "` 前缀得到主查询
//! 2. 主查询有有效条目 → 取第一个
//! 3. 主查询为空结果或 404 → 去掉非字母数字/空白字符得到简化查询，与主查询不同时再查一次
//! 4. 其他状态码或传输错误 → 立即结束，记录失败详情

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::{CatalogApi, LookupResponse};
use crate::models::book::CatalogMatch;

const LETS_PREFIX: &str = "Let's ";

/// 标题解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(CatalogMatch),
    Unresolved { detail: String },
}

/// 单次查询的结果
enum Attempt {
    Found(CatalogMatch),
    /// 查询成功但没有可用条目（含 404）
    Empty,
    /// 状态码错误或传输错误，不再继续
    Failed(String),
}

/// 标题解析服务
pub struct TitleResolver {
    catalog: Arc<dyn CatalogApi>,
}

impl TitleResolver {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self { catalog }
    }

    /// 解析书名
    pub async fn resolve(&self, title: &str) -> Resolution {
        let primary = primary_query(title);
        if primary != title {
            info!(
                "Modified title from '{}' to '{}' (removed Let's prefix)",
                title, primary
            );
        }

        match self.attempt(&primary, title).await {
            Attempt::Found(found) => return Resolution::Resolved(found),
            Attempt::Failed(detail) => return Resolution::Unresolved { detail },
            Attempt::Empty => {}
        }

        let mut tried = vec![primary.clone()];
        let simplified = simplified_query(&primary);
        if !simplified.is_empty() && simplified != primary {
            info!("🔄 Retrying with simplified title: '{}'", simplified);
            match self.attempt(&simplified, title).await {
                Attempt::Found(found) => return Resolution::Resolved(found),
                Attempt::Failed(detail) => return Resolution::Unresolved { detail },
                Attempt::Empty => tried.push(simplified),
            }
        }

        let tried = tried
            .iter()
            .map(|q| format!("{:?}", q))
            .collect::<Vec<_>>()
            .join(", ");
        warn!("❌ Failed to find book: '{}'", title);
        Resolution::Unresolved {
            detail: format!("book not found in catalog (tried {})", tried),
        }
    }

    async fn attempt(&self, query: &str, raw_title: &str) -> Attempt {
        match self.catalog.lookup_by_title(query).await {
            Ok(LookupResponse::Success(entries)) => match entries.first() {
                Some(entry) => {
                    let found = CatalogMatch::from_entry(entry, raw_title);
                    info!(
                        "✅ Found: {} (ID: {})",
                        found.canonical_title, found.catalog_id
                    );
                    Attempt::Found(found)
                }
                None => Attempt::Empty,
            },
            Ok(LookupResponse::NotFound) => {
                warn!("Book not found (404): '{}'", query);
                Attempt::Empty
            }
            Ok(LookupResponse::Error { status, body }) => {
                warn!("API request failed for title '{}': {} - {}", query, status, body);
                Attempt::Failed(format!(
                    "catalog lookup for {:?} failed: HTTP {} - {}",
                    query,
                    status,
                    body.trim()
                ))
            }
            Err(e) => {
                warn!("Error fetching book info for '{}': {}", query, e);
                Attempt::Failed(format!("catalog lookup for {:?} failed: {}", query, e))
            }
        }
    }
}

/// 主查询：去掉 `"Let's "` 前缀
pub fn primary_query(title: &str) -> String {
    title.strip_prefix(LETS_PREFIX).unwrap_or(title).to_string()
}

/// 简化查询：只保留字母、数字和空白
pub fn simplified_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::SubmitResponse;
    use crate::error::ApiError;
    use crate::models::book::CatalogEntry;
    use crate::models::quiz::QuizPayload;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 按查询字符串返回预设结果，并记录查询顺序
    #[derive(Default)]
    struct ScriptedCatalog {
        responses: HashMap<String, LookupResponse>,
        queries: Mutex<Vec<String>>,
        transport_error: bool,
    }

    impl ScriptedCatalog {
        fn with(mut self, query: &str, response: LookupResponse) -> Self {
            self.responses.insert(query.to_string(), response);
            self
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogApi for ScriptedCatalog {
        async fn lookup_by_title(&self, query: &str) -> Result<LookupResponse, ApiError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.transport_error {
                return Err(ApiError::RequestFailed {
                    endpoint: "books/by-title".into(),
                    source: "connection reset".into(),
                });
            }
            Ok(self
                .responses
                .get(query)
                .cloned()
                .unwrap_or(LookupResponse::NotFound))
        }

        async fn create_quiz(&self, _payload: &QuizPayload) -> Result<SubmitResponse, ApiError> {
            unreachable!("resolver never submits")
        }
    }

    fn entry(nid: i64, title: &str) -> LookupResponse {
        LookupResponse::Success(vec![CatalogEntry {
            nid,
            title: Some(title.to_string()),
        }])
    }

    #[test]
    fn test_query_normalisation() {
        assert_eq!(primary_query("Let's Build a Boat"), "Build a Boat");
        assert_eq!(primary_query("Lets Go"), "Lets Go");
        assert_eq!(simplified_query("Mr. Popper's Penguins: A Tale"), "Mr Poppers Penguins A Tale");
        assert_eq!(simplified_query("Build a Boat"), "Build a Boat");
    }

    #[tokio::test]
    async fn test_lets_prefix_stripped_before_lookup() {
        let catalog = Arc::new(ScriptedCatalog::default());
        let resolver = TitleResolver::new(catalog.clone());

        let result = resolver.resolve("Let's Build a Boat").await;

        assert!(matches!(result, Resolution::Unresolved { .. }));
        // 简化后与主查询相同，不再发第二次
        assert_eq!(catalog.queries(), vec!["Build a Boat"]);
    }

    #[tokio::test]
    async fn test_simplified_fallback_finds_book() {
        let catalog = Arc::new(
            ScriptedCatalog::default()
                .with("Charlotte's Web", LookupResponse::Success(Vec::new()))
                .with("Charlottes Web", entry(9, "Charlotte's Web")),
        );
        let resolver = TitleResolver::new(catalog.clone());

        let result = resolver.resolve("Charlotte's Web").await;

        assert_eq!(
            result,
            Resolution::Resolved(CatalogMatch {
                catalog_id: 9,
                canonical_title: "Charlotte's Web".into()
            })
        );
        assert_eq!(catalog.queries(), vec!["Charlotte's Web", "Charlottes Web"]);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let catalog = Arc::new(ScriptedCatalog::default().with(
            "Owl Moon",
            LookupResponse::Success(vec![
                CatalogEntry {
                    nid: 3,
                    title: Some("Owl Moon".into()),
                },
                CatalogEntry {
                    nid: 4,
                    title: Some("Owl Moon".into()),
                },
            ]),
        ));
        let resolver = TitleResolver::new(catalog);

        match resolver.resolve("Owl Moon").await {
            Resolution::Resolved(found) => assert_eq!(found.catalog_id, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_both_404_reports_not_found() {
        let catalog = Arc::new(ScriptedCatalog::default());
        let resolver = TitleResolver::new(catalog.clone());

        match resolver.resolve("Where's Spot?").await {
            Resolution::Unresolved { detail } => {
                assert!(detail.contains("not found"));
                assert!(detail.contains("Wheres Spot"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(catalog.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_stops_without_fallback() {
        let catalog = Arc::new(ScriptedCatalog::default().with(
            "Where's Spot?",
            LookupResponse::Error {
                status: 500,
                body: "internal".into(),
            },
        ));
        let resolver = TitleResolver::new(catalog.clone());

        match resolver.resolve("Where's Spot?").await {
            Resolution::Unresolved { detail } => {
                assert!(detail.contains("HTTP 500"));
                assert!(detail.contains("internal"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(catalog.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let catalog = Arc::new(ScriptedCatalog {
            transport_error: true,
            ..Default::default()
        });
        let resolver = TitleResolver::new(catalog.clone());

        let result = resolver.resolve("Where's Spot?").await;

        assert!(matches!(result, Resolution::Unresolved { .. }));
        assert_eq!(catalog.queries().len(), 1);
    }
}
