pub mod book;
pub mod loaders;
pub mod outcome;
pub mod quiz;

pub use book::{CatalogEntry, CatalogMatch, RawItem};
pub use loaders::{load_book_folder, load_document, title_from_filename};
pub use outcome::{ItemOutcome, ItemStatus, RunSummary, Stage};
pub use quiz::{Question, QuestionPayload, QuizPayload, StructuredQuiz};
