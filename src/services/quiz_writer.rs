//! 测验写入服务 - 业务能力层
//!
//! 只负责"把测验写成 JSON 文件"能力，不关心流程

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::FileError;
use crate::models::Quiz;

/// 测验写入服务
pub struct QuizWriter {
    output_path: PathBuf,
}

impl QuizWriter {
    /// 使用默认路径 `quiz.json` 创建
    pub fn new() -> Self {
        Self::with_path("quiz.json")
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// 以格式化 JSON 写入测验，覆盖已有文件
    pub async fn write(&self, quiz: &Quiz) -> Result<(), FileError> {
        let path = self.output_path.display().to_string();
        let json = serde_json::to_string_pretty(quiz).map_err(FileError::JsonSerializeFailed)?;

        debug!("写入测验: {} | {} 字节", path, json.len());

        if let Some(parent) = self.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FileError::WriteFailed {
                    path: path.clone(),
                    source,
                })?;
        }

        fs::write(&self.output_path, json)
            .await
            .map_err(|source| FileError::WriteFailed { path, source })
    }
}

impl Default for QuizWriter {
    fn default() -> Self {
        Self::new()
    }
}
