pub mod document_loader;

pub use document_loader::{load_book_folder, load_document, title_from_filename};
