pub mod document_parser;
pub mod quiz_formatter;
pub mod report_writer;
pub mod title_resolver;

pub use quiz_formatter::{LlmQuizFormatter, QuizFormatter};
pub use report_writer::{ReportKind, ReportWriter};
pub use title_resolver::{Resolution, TitleResolver};
