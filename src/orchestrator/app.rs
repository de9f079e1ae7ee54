//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、输出启动日志、创建模型客户端
//! 2. **加载请求**：从 TOML 文件读取出题请求
//! 3. **运行流程**：委托 `QuizFlow` 完成规划到组卷的全部阶段
//! 4. **写出结果**：把测验写成 JSON 并输出统计

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::clients::{OpenAiClient, StructuredLlm};
use crate::config::Config;
use crate::error::AppError;
use crate::models::load_quiz_request;
use crate::services::QuizWriter;
use crate::utils::logging;
use crate::workflow::QuizFlow;

/// 应用主结构
pub struct App {
    config: Config,
    flow: QuizFlow,
    writer: QuizWriter,
}

impl App {
    /// 使用 OpenAI 兼容接口初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let llm: Arc<dyn StructuredLlm> = Arc::new(OpenAiClient::new(&config));
        Self::with_llm(config, llm)
    }

    /// 使用指定的模型客户端初始化应用
    pub fn with_llm(config: Config, llm: Arc<dyn StructuredLlm>) -> Result<Self> {
        config.check().context("配置校验失败")?;
        logging::log_startup(&config);

        Ok(Self {
            flow: QuizFlow::new(&config, llm),
            writer: QuizWriter::with_path(&config.output_path),
            config,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在加载出题请求: {}", self.config.request_file);
        let request = load_quiz_request(Path::new(&self.config.request_file), &self.config)
            .await
            .context("加载出题请求失败")?;

        let state = self.flow.execute(request).await.context("出题请求不合法")?;
        let quiz = state.quiz.ok_or(AppError::NoQuizProduced)?;

        self.writer
            .write(&quiz)
            .await
            .with_context(|| format!("写入测验失败: {}", self.config.output_path))?;

        logging::print_quiz_summary(&quiz, &state.errors, &self.config.output_path);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::llm_client::test_support::ScriptedLlm;
    use crate::models::Quiz;
    use std::io::Write;

    fn config_in(dir: &Path) -> Config {
        Config {
            request_file: dir.join("quiz.toml").display().to_string(),
            output_path: dir.join("quiz.json").display().to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            review_temperature: 2.0,
            ..Config::default()
        };
        assert!(App::with_llm(config, Arc::new(ScriptedLlm::failing())).is_err());
    }

    #[tokio::test]
    async fn test_run_writes_quiz_even_when_model_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut file = std::fs::File::create(&config.request_file).unwrap();
        writeln!(file, "topics = [\"History\"]\nquestions_per_round = 2\nmax_attempts = 1").unwrap();

        let app = App::with_llm(config.clone(), Arc::new(ScriptedLlm::failing())).unwrap();
        app.run().await.unwrap();

        let quiz: Quiz = serde_json::from_str(&std::fs::read_to_string(&config.output_path).unwrap()).unwrap();
        assert!(quiz.rounds.is_empty());
        assert!(!quiz.title.is_empty());
        // 没有题目可审核会触发一次重试
        assert_eq!(quiz.metadata.regeneration_count, 1);
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_request_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::with_llm(config_in(dir.path()), Arc::new(ScriptedLlm::failing())).unwrap();
        assert!(app.run().await.is_err());
    }
}
