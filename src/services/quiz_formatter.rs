//! 测验格式化服务 - 业务能力层
//!
//! 调用生成服务，把原始测验文本整理成结构化测验。
//! 每本书只调用一次，不重试、不缓存；结构校验由流程层负责。

use async_trait::async_trait;
use tracing::debug;

use crate::clients::LlmClient;
use crate::error::FormatError;
use crate::models::quiz::{QuizPayload, StructuredQuiz};
use crate::utils::logging::truncate_text;

/// 测验格式化能力
#[async_trait]
pub trait QuizFormatter: Send + Sync {
    async fn format(
        &self,
        catalog_id: i64,
        canonical_title: &str,
        quiz_text: &str,
    ) -> Result<StructuredQuiz, FormatError>;
}

/// 基于 LLM 的测验格式化
pub struct LlmQuizFormatter {
    client: LlmClient,
}

impl LlmQuizFormatter {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QuizFormatter for LlmQuizFormatter {
    async fn format(
        &self,
        catalog_id: i64,
        canonical_title: &str,
        quiz_text: &str,
    ) -> Result<StructuredQuiz, FormatError> {
        let (system_message, user_message) =
            build_format_messages(catalog_id, canonical_title, quiz_text);

        debug!(
            "格式化测验: bookId={} 模型={} 原文长度={}",
            catalog_id,
            self.client.model_name(),
            quiz_text.len()
        );

        let response = self
            .client
            .chat(&system_message, &user_message)
            .await
            .map_err(|e| FormatError::Upstream(e.to_string()))?;

        let payload = parse_quiz_response(&response)?;
        Ok(StructuredQuiz::from_payload(payload, catalog_id, canonical_title))
    }
}

/// 构建格式化用的消息
///
/// 返回 (system_message, user_message)
fn build_format_messages(catalog_id: i64, book_name: &str, quiz_text: &str) -> (String, String) {
    let book_name_json = serde_json::to_string(book_name).unwrap_or_else(|_| "\"\"".to_string());

    let system_message = format!(
        r#"Your task is arranging the quiz you get from the text into a proper json format.

The quiz content is for book ID: {catalog_id} (integer) and book name: {book_name_json}

Example output:
{{
    "bookId": {catalog_id},
    "bookName": {book_name_json},
    "questions": [
        {{
            "questionNo": 1,
            "content": "What is 2 + 2?",
            "options": ["1", "2", "3", "4"],
            "correctAnswers": ["4"]
        }},
        {{
            "questionNo": 2,
            "content": "Which are prime numbers?",
            "options": ["2", "3", "4", "6"],
            "correctAnswers": ["2", "3"]
        }}
    ]
}}

Rules:
- Number questions in the order they appear, starting at 1.
- Every correct answer must be copied exactly from that question's options.
- Return only the JSON object, without explanations or code fences."#
    );

    let user_message = format!(
        "Please process the following quiz text and format it according to the example above:\n{}",
        quiz_text
    );

    (system_message, user_message)
}

/// 从 LLM 响应中提取测验 JSON
///
/// 容忍 ```json 代码块包裹和前后说明文字。
pub fn parse_quiz_response(response: &str) -> Result<QuizPayload, FormatError> {
    let start = response.find('{');
    let end = response.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            return Err(FormatError::Malformed(format!(
                "no JSON object in response: {}",
                truncate_text(response, 80)
            )))
        }
    };

    serde_json::from_str::<QuizPayload>(json).map_err(|e| FormatError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let payload = parse_quiz_response(
            r#"{"bookId": 55, "bookName": "The Great Escape", "questions": [
                {"questionNo": 1, "content": "Q?", "options": ["a", "b"], "correctAnswers": ["a"]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(payload.book_id, 55);
        assert_eq!(payload.questions.len(), 1);
    }

    #[test]
    fn test_parse_fenced_json() {
        let response = "Here you go:\n```json\n{\"questions\": [{\"questionNo\": 1, \"content\": \"Q?\", \"options\": [\"a\"], \"correctAnswers\": [\"a\"]}]}\n```";
        let payload = parse_quiz_response(response).unwrap();
        assert_eq!(payload.questions[0].options, vec!["a"]);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_quiz_response("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(err, FormatError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse_quiz_response(r#"{"questions": "none"}"#).unwrap_err();
        assert!(matches!(err, FormatError::Malformed(_)));
    }

    #[test]
    fn test_prompt_carries_book_identity() {
        let (system, user) = build_format_messages(55, "Let's \"Go\"", "Book 1 ...");
        assert!(system.contains("book ID: 55"));
        assert!(system.contains(r#""bookName": "Let's \"Go\"""#));
        assert!(user.ends_with("Book 1 ..."));
    }
}
