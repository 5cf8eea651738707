//! 目录服务 API 客户端
//!
//! 封装按标题查书和创建测验两个接口。HTTP 状态码在这里被归类为
//! 显式的响应变体，上层只需要对变体做穷尽匹配。

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::book::CatalogEntry;
use crate::models::quiz::QuizPayload;

/// 按标题查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResponse {
    /// 200：已过滤掉分页等元数据，只剩带有效 `nid` 的条目（可能为空）
    Success(Vec<CatalogEntry>),
    /// 404
    NotFound,
    /// 其他状态码
    Error { status: u16, body: String },
}

/// 创建测验的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResponse {
    /// 200 / 201
    Accepted { status: u16 },
    Rejected { status: u16, body: String },
}

/// 目录服务能力
///
/// 传输层失败以 `Err(ApiError)` 返回；任何 HTTP 状态码都是 `Ok`。
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn lookup_by_title(&self, query: &str) -> Result<LookupResponse, ApiError>;

    async fn create_quiz(&self, payload: &QuizPayload) -> Result<SubmitResponse, ApiError>;
}

/// 目录服务 HTTP 客户端
///
/// 内部的 reqwest 连接池在一次运行的所有流程之间共享；
/// 信号量限制同时在途的请求总数。
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
    permits: Semaphore,
}

impl CatalogClient {
    /// 创建新的目录服务客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_connections_per_host)
            .timeout(config.session_timeout)
            .build()
            .map_err(|e| {
                AppError::Api(ApiError::ClientBuildFailed {
                    source: Box::new(e),
                })
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            authorization: authorization_value(&config.auth_token),
            permits: Semaphore::new(config.max_connections),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn acquire(&self, endpoint: &str) -> Result<tokio::sync::SemaphorePermit<'_>, ApiError> {
        self.permits
            .acquire()
            .await
            .map_err(|e| ApiError::RequestFailed {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            })
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn lookup_by_title(&self, query: &str) -> Result<LookupResponse, ApiError> {
        let endpoint = self.endpoint("books/by-title");
        let _permit = self.acquire(&endpoint).await?;

        debug!("查询目录: {} title={:?}", endpoint, query);

        let response = self
            .http
            .get(&endpoint)
            .query(&[("title", query)])
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed {
                endpoint: endpoint.clone(),
                source: Box::new(e),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::RequestFailed {
            endpoint: endpoint.clone(),
            source: Box::new(e),
        })?;

        classify_lookup(&endpoint, status, &body)
    }

    async fn create_quiz(&self, payload: &QuizPayload) -> Result<SubmitResponse, ApiError> {
        let endpoint = self.endpoint("quizz/create");
        let _permit = self.acquire(&endpoint).await?;

        debug!(
            "创建测验: bookId={} questions={}",
            payload.book_id,
            payload.questions.len()
        );

        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, &self.authorization)
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed {
                endpoint: endpoint.clone(),
                source: Box::new(e),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        debug!("创建测验结果: {} {}", status, body);

        Ok(classify_submit(status, body))
    }
}

/// `Authorization` 头的值：已带认证方案的凭证原样发送，否则补上 `Bearer`
pub fn authorization_value(token: &str) -> String {
    let token = token.trim();
    if token.contains(char::is_whitespace) {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}

#[derive(Debug, Deserialize)]
struct LookupEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
}

/// 将查书接口的状态码和响应体归类
pub fn classify_lookup(
    endpoint: &str,
    status: StatusCode,
    body: &str,
) -> Result<LookupResponse, ApiError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(LookupResponse::NotFound);
    }
    if status != StatusCode::OK {
        return Ok(LookupResponse::Error {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let envelope: LookupEnvelope =
        serde_json::from_str(body).map_err(|e| ApiError::JsonParseFailed {
            endpoint: endpoint.to_string(),
            source: Box::new(e),
        })?;

    if !envelope.success {
        return Ok(LookupResponse::Success(Vec::new()));
    }

    let entries = match envelope.result {
        Some(Value::Array(items)) => items.iter().filter_map(catalog_entry).collect(),
        // 单个对象也接受
        Some(item @ Value::Object(_)) => catalog_entry(&item).into_iter().collect(),
        _ => Vec::new(),
    };

    Ok(LookupResponse::Success(entries))
}

/// 只有带正整数 `nid` 的对象才是书本条目，其余（分页信息等）丢弃
fn catalog_entry(item: &Value) -> Option<CatalogEntry> {
    let object = item.as_object()?;
    let nid = match object.get("nid")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if nid <= 0 {
        return None;
    }

    Some(CatalogEntry {
        nid,
        title: object
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
    })
}

/// 将创建测验接口的状态码归类
pub fn classify_submit(status: StatusCode, body: String) -> SubmitResponse {
    if status == StatusCode::OK || status == StatusCode::CREATED {
        SubmitResponse::Accepted {
            status: status.as_u16(),
        }
    } else {
        SubmitResponse::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuestionPayload;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const ENDPOINT: &str = "https://catalog.test/books/by-title";

    #[test]
    fn test_lookup_filters_metadata_entries() {
        let body = r#"{"success": true, "result": [
            {"nid": 55, "title": "The Great Escape"},
            {"page": 1, "total": 2},
            {"nid": 56}
        ]}"#;
        let response = classify_lookup(ENDPOINT, StatusCode::OK, body).unwrap();
        assert_eq!(
            response,
            LookupResponse::Success(vec![
                CatalogEntry {
                    nid: 55,
                    title: Some("The Great Escape".into())
                },
                CatalogEntry { nid: 56, title: None },
            ])
        );
    }

    #[test]
    fn test_lookup_only_metadata_is_empty_success() {
        let body = r#"{"success": true, "result": [{"pagination": {"page": 1}}]}"#;
        assert_eq!(
            classify_lookup(ENDPOINT, StatusCode::OK, body).unwrap(),
            LookupResponse::Success(Vec::new())
        );
    }

    #[test]
    fn test_lookup_unsuccessful_flag() {
        let body = r#"{"success": false, "result": [{"nid": 1}]}"#;
        assert_eq!(
            classify_lookup(ENDPOINT, StatusCode::OK, body).unwrap(),
            LookupResponse::Success(Vec::new())
        );
    }

    #[test]
    fn test_lookup_status_variants() {
        assert_eq!(
            classify_lookup(ENDPOINT, StatusCode::NOT_FOUND, "").unwrap(),
            LookupResponse::NotFound
        );
        assert_eq!(
            classify_lookup(ENDPOINT, StatusCode::INTERNAL_SERVER_ERROR, "boom").unwrap(),
            LookupResponse::Error {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[test]
    fn test_lookup_invalid_json_is_api_error() {
        let err = classify_lookup(ENDPOINT, StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, ApiError::JsonParseFailed { .. }));
    }

    #[test]
    fn test_submit_classification() {
        assert_eq!(
            classify_submit(StatusCode::CREATED, String::new()),
            SubmitResponse::Accepted { status: 201 }
        );
        assert_eq!(
            classify_submit(StatusCode::OK, String::new()),
            SubmitResponse::Accepted { status: 200 }
        );
        assert_eq!(
            classify_submit(StatusCode::BAD_REQUEST, "bad".into()),
            SubmitResponse::Rejected {
                status: 400,
                body: "bad".into()
            }
        );
    }

    #[test]
    fn test_authorization_value() {
        assert_eq!(authorization_value("abc"), "Bearer abc");
        assert_eq!(authorization_value("Bearer abc"), "Bearer abc");
        assert_eq!(authorization_value(" Token xyz "), "Token xyz");
    }

    // ========== 本地监听端口上的请求构建测试 ==========

    /// 只接受一次连接的 HTTP 服务，返回 base URL 和收到的原始请求
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|line| {
                            line.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{}/api/v1/", addr), handle)
    }

    fn client_for(base_url: String) -> CatalogClient {
        let config = Config {
            api_base_url: base_url,
            auth_token: "tok".to_string(),
            ..Config::default()
        };
        CatalogClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_request_shape() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"success": true, "result": [{"nid": 55, "title": "Let's Go Camping"}]}"#,
        )
        .await;
        let client = client_for(base_url);

        let response = client.lookup_by_title("Let's Go Camping").await.unwrap();
        let request = server.await.unwrap();

        assert!(
            request.starts_with("GET /api/v1/books/by-title?title=Let%27s+Go+Camping HTTP/1.1"),
            "unexpected request: {}",
            request
        );
        assert!(request.to_ascii_lowercase().contains("authorization: bearer tok"));
        assert_eq!(
            response,
            LookupResponse::Success(vec![CatalogEntry {
                nid: 55,
                title: Some("Let's Go Camping".into())
            }])
        );
    }

    #[tokio::test]
    async fn test_create_quiz_request_shape() {
        let (base_url, server) = serve_once("201 Created", "{}").await;
        let client = client_for(base_url);
        let payload = QuizPayload {
            book_id: 55,
            book_name: "The Great Escape".to_string(),
            questions: vec![QuestionPayload {
                question_no: 1,
                content: "Who escaped?".to_string(),
                options: vec!["Tom".to_string(), "Ann".to_string()],
                correct_answers: vec!["Tom".to_string()],
            }],
        };

        let response = client.create_quiz(&payload).await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(response, SubmitResponse::Accepted { status: 201 });
        assert!(request.starts_with("POST /api/v1/quizz/create HTTP/1.1"));
        let lower = request.to_ascii_lowercase();
        assert!(lower.contains("authorization: bearer tok"));
        assert!(lower.contains("content-type: application/json"));

        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["bookId"], 55);
        assert_eq!(json["bookName"], "The Great Escape");
        assert_eq!(json["questions"][0]["questionNo"], 1);
        assert_eq!(json["questions"][0]["correctAnswers"][0], "Tom");
    }
}
