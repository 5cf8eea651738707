//! 输入文档加载
//!
//! 只处理纯文本：多书文档整体读入，单文件模式下每个 `.txt` 文件是一本书。

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, FileError};
use crate::models::book::RawItem;

/// 单文件模式识别的扩展名
pub const BOOK_FILE_EXTENSION: &str = "txt";

/// 读取多书文档
///
/// 文件不存在、无法读取或没有文本内容都属于致命错误。
pub async fn load_document(path: &Path) -> AppResult<String> {
    if !path.exists() {
        return Err(FileError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    if content.trim().is_empty() {
        return Err(FileError::EmptyFile {
            path: path.display().to_string(),
        }
        .into());
    }

    info!(
        "📄 已读取文档: {} ({} 字符)",
        path.display(),
        content.chars().count()
    );
    Ok(content)
}

/// 从文件名提取标题和作者
///
/// `"<标题> by <作者>.txt"` → (标题, 作者)；没有 `" by "` 时整个文件名作为标题，作者为空。
pub fn title_from_filename(file_name: &str) -> (String, String) {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());

    match stem.split_once(" by ") {
        Some((title, author)) => (title.trim().to_string(), author.trim().to_string()),
        None => (stem.trim().to_string(), String::new()),
    }
}

/// 从文件夹中加载所有书本文件
///
/// 文件按文件名排序以保证顺序稳定；读不出文本的单个文件被跳过并记录警告。
pub async fn load_book_folder(folder_path: &Path) -> AppResult<Vec<RawItem>> {
    if !folder_path.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.display().to_string(),
        }
        .into());
    }

    let mut files: Vec<PathBuf> = Vec::new();
    let mut entries = fs::read_dir(folder_path)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path.display().to_string(), e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(folder_path.display().to_string(), e))?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some(BOOK_FILE_EXTENSION) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(FileError::NoInputFiles {
            path: folder_path.display().to_string(),
            extension: BOOK_FILE_EXTENSION.to_string(),
        }
        .into());
    }

    files.sort();
    info!("✓ 找到 {} 个书本文件", files.len());

    let mut items = Vec::with_capacity(files.len());
    for path in files {
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let content = match fs::read_to_string(&path).await {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => {
                warn!("⚠️ 文件没有可用文本，跳过: {}", file_name);
                continue;
            }
            Err(e) => {
                warn!("⚠️ 无法读取文件 {}: {}", file_name, e);
                continue;
            }
        };

        let (title, author) = title_from_filename(&file_name);
        let sequence_no = items.len() + 1;
        info!("正在加载: {} → 标题: '{}'", file_name, title);

        items.push(RawItem {
            sequence_no,
            book_number: sequence_no as u64,
            title,
            author,
            quiz_text: content.trim().to_string(),
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_filename() {
        assert_eq!(
            title_from_filename("Owl Moon by Jane Yolen.txt"),
            ("Owl Moon".to_string(), "Jane Yolen".to_string())
        );
        assert_eq!(
            title_from_filename("Stand by Me.txt"),
            ("Stand".to_string(), "Me".to_string())
        );
        assert_eq!(
            title_from_filename("Frog and Toad.txt"),
            ("Frog and Toad".to_string(), String::new())
        );
    }

    #[tokio::test]
    async fn test_load_document_missing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("nope.txt")).await.unwrap_err();
        assert!(err.is_fatal_setup());
    }

    #[tokio::test]
    async fn test_load_document_empty_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "   \n").unwrap();
        let err = load_document(&path).await.unwrap_err();
        assert!(matches!(err, AppError::File(FileError::EmptyFile { .. })));
    }

    #[tokio::test]
    async fn test_load_book_folder_orders_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("B Book by Bee.txt"), "Q1. b?").unwrap();
        std::fs::write(dir.path().join("A Book by Ay.txt"), "Q1. a?").unwrap();
        std::fs::write(dir.path().join("Blank by Nobody.txt"), "").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let items = load_book_folder(dir.path()).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "A Book");
        assert_eq!(items[0].author, "Ay");
        assert_eq!(items[0].sequence_no, 1);
        assert_eq!(items[1].title, "B Book");
        assert_eq!(items[1].sequence_no, 2);
    }

    #[tokio::test]
    async fn test_load_book_folder_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_book_folder(dir.path()).await.unwrap_err();
        assert!(matches!(err, AppError::File(FileError::NoInputFiles { .. })));
    }
}
