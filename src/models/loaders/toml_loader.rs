use crate::config::Config;
use crate::error::FileError;
use crate::models::request::QuizRequest;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载出题请求
///
/// 文件中没有写 `quality_threshold` / `max_attempts` 时使用配置中的值。
/// 只做解析，范围校验由 `QuizRequest::validated` 负责
pub async fn load_quiz_request(toml_file_path: &Path, defaults: &Config) -> Result<QuizRequest, FileError> {
    let path = toml_file_path.display().to_string();

    if !toml_file_path.exists() {
        return Err(FileError::NotFound { path });
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path.clone(),
            source,
        })?;

    let mut table: toml::Table = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
        path: path.clone(),
        source,
    })?;
    table
        .entry("quality_threshold")
        .or_insert(toml::Value::Float(defaults.quality_threshold));
    table
        .entry("max_attempts")
        .or_insert(toml::Value::Integer(i64::from(defaults.max_regeneration_attempts)));

    let request: QuizRequest = toml::Value::Table(table)
        .try_into()
        .map_err(|source| FileError::TomlParseFailed { path, source })?;

    tracing::info!("成功加载出题请求: {} 个主题", request.topics.len());

    Ok(request)
}
