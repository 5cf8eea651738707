//! 结构化测验及其提交格式

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 一道选择题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub number: u32,
    pub content: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<String>,
}

/// 一本书的结构化测验
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredQuiz {
    pub catalog_id: i64,
    pub title: String,
    pub questions: Vec<Question>,
}

impl StructuredQuiz {
    /// 校验结构约束
    ///
    /// - 至少一道题
    /// - 题号严格递增（因此唯一）
    /// - 选项非空且不重复
    /// - 正确答案非空且都出现在选项中
    pub fn validate(&self) -> Result<(), String> {
        if self.catalog_id <= 0 {
            return Err(format!("catalog id {} is not positive", self.catalog_id));
        }
        if self.questions.is_empty() {
            return Err("quiz has no questions".to_string());
        }

        let mut previous: Option<u32> = None;
        for question in &self.questions {
            let n = question.number;
            if let Some(prev) = previous {
                if n <= prev {
                    return Err(format!(
                        "question numbers must be increasing: {} follows {}",
                        n, prev
                    ));
                }
            }
            previous = Some(n);

            if question.content.trim().is_empty() {
                return Err(format!("question {} has empty content", n));
            }
            if question.options.is_empty() {
                return Err(format!("question {} has no options", n));
            }

            let mut seen = HashSet::new();
            for option in &question.options {
                if !seen.insert(option.as_str()) {
                    return Err(format!("question {} repeats option {:?}", n, option));
                }
            }

            if question.correct_answers.is_empty() {
                return Err(format!("question {} has no correct answer", n));
            }
            if let Some(missing) = question
                .correct_answers
                .iter()
                .find(|answer| !seen.contains(answer.as_str()))
            {
                return Err(format!(
                    "question {} answer {:?} is not one of its options",
                    n, missing
                ));
            }
        }

        Ok(())
    }

    /// 转换为提交给目录服务的格式
    pub fn to_payload(&self) -> QuizPayload {
        QuizPayload {
            book_id: self.catalog_id,
            book_name: self.title.clone(),
            questions: self
                .questions
                .iter()
                .map(|q| QuestionPayload {
                    question_no: q.number,
                    content: q.content.clone(),
                    options: q.options.clone(),
                    correct_answers: q.correct_answers.clone(),
                })
                .collect(),
        }
    }

    /// 由生成服务返回的 payload 构建
    ///
    /// 书本身份以解析阶段得到的目录信息为准，忽略 payload 中回显的 bookId / bookName。
    pub fn from_payload(payload: QuizPayload, catalog_id: i64, title: &str) -> Self {
        Self {
            catalog_id,
            title: title.to_string(),
            questions: payload
                .questions
                .into_iter()
                .map(|q| Question {
                    number: q.question_no,
                    content: q.content.trim().to_string(),
                    options: q.options.into_iter().map(|o| o.trim().to_string()).collect(),
                    correct_answers: q
                        .correct_answers
                        .into_iter()
                        .map(|a| a.trim().to_string())
                        .collect(),
                })
                .collect(),
        }
    }
}

/// `POST /quizz/create` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPayload {
    #[serde(default)]
    pub book_id: i64,
    #[serde(default)]
    pub book_name: String,
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub question_no: u32,
    pub content: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(number: u32, options: &[&str], answers: &[&str]) -> Question {
        Question {
            number,
            content: format!("Question {}?", number),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answers: answers.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn quiz(questions: Vec<Question>) -> StructuredQuiz {
        StructuredQuiz {
            catalog_id: 55,
            title: "The Great Escape".into(),
            questions,
        }
    }

    #[test]
    fn test_valid_quiz() {
        let q = quiz(vec![
            question(1, &["1", "2", "3", "4"], &["4"]),
            question(2, &["2", "3", "4", "6"], &["2", "3"]),
        ]);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_answer_must_be_an_option() {
        let q = quiz(vec![question(1, &["a", "b"], &["c"])]);
        let err = q.validate().unwrap_err();
        assert!(err.contains("not one of its options"));
    }

    #[test]
    fn test_empty_answers_rejected() {
        let q = quiz(vec![question(1, &["a", "b"], &[])]);
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_numbers_must_increase() {
        let q = quiz(vec![
            question(2, &["a", "b"], &["a"]),
            question(2, &["a", "b"], &["b"]),
        ]);
        assert!(q.validate().unwrap_err().contains("increasing"));
    }

    #[test]
    fn test_duplicate_options_rejected() {
        let q = quiz(vec![question(1, &["a", "a"], &["a"])]);
        assert!(q.validate().unwrap_err().contains("repeats"));
    }

    #[test]
    fn test_no_questions_rejected() {
        assert!(quiz(Vec::new()).validate().is_err());
    }

    #[test]
    fn test_payload_wire_names() {
        let q = quiz(vec![question(1, &["yes", "no"], &["yes"])]);
        let json = serde_json::to_value(q.to_payload()).unwrap();
        assert_eq!(json["bookId"], 55);
        assert_eq!(json["bookName"], "The Great Escape");
        assert_eq!(json["questions"][0]["questionNo"], 1);
        assert_eq!(json["questions"][0]["correctAnswers"][0], "yes");
    }

    #[test]
    fn test_from_payload_uses_catalog_identity() {
        let payload: QuizPayload = serde_json::from_str(
            r#"{"bookId": 1, "bookName": "wrong", "questions": [
                {"questionNo": 1, "content": " Who? ", "options": [" A ", "B"], "correctAnswers": ["A"]}
            ]}"#,
        )
        .unwrap();
        let q = StructuredQuiz::from_payload(payload, 55, "The Great Escape");
        assert_eq!(q.catalog_id, 55);
        assert_eq!(q.title, "The Great Escape");
        assert_eq!(q.questions[0].content, "Who?");
        assert_eq!(q.questions[0].options, vec!["A", "B"]);
        assert!(q.validate().is_ok());
    }
}
