//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{Quiz, QuizRequest};

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`，否则默认 `info`（`verbose` 时为 `debug`）
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多阶段测验生成");
    info!("🤖 模型: {}", config.llm_model_name);
    info!(
        "📊 质量阈值: {} | 最大重试次数: {}",
        config.quality_threshold, config.max_regeneration_attempts
    );
    info!("{}", "=".repeat(60));
}

/// 记录出题请求
pub fn log_request(request: &QuizRequest) {
    info!("📋 主题: {}", request.topics.join(", "));
    info!(
        "📋 每轮题目: {} | 难度: {}",
        request.questions_per_round, request.difficulty
    );
    if let Some(title) = &request.quiz_title {
        info!("📋 标题: {}", title);
    }
}

/// 记录阶段开始
///
/// # 参数
/// - `stage`: 阶段名称
/// - `attempt`: 当前重试次数
pub fn log_stage(stage: &str, attempt: u32) {
    info!("\n{}", "─".repeat(60));
    info!("▶ {} (重试次数: {})", stage, attempt);
    info!("{}", "─".repeat(60));
}

/// 打印最终测验统计
///
/// # 参数
/// - `quiz`: 生成的测验
/// - `errors`: 流程中记录的非致命错误
/// - `output_path`: 输出文件路径
pub fn print_quiz_summary(quiz: &Quiz, errors: &[String], output_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 测验生成完成统计");
    info!("完成时间: {}", quiz.metadata.created_at.format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "=".repeat(60));
    info!("标题: {}", quiz.title);
    info!("轮数: {} | 题目总数: {}", quiz.total_rounds(), quiz.total_questions());
    for round in &quiz.rounds {
        info!(
            "  第 {} 轮 [{}]: {} 道题",
            round.round_number,
            round.topic,
            round.question_count()
        );
    }
    match quiz.metadata.average_quality_score {
        Some(score) => info!("平均质量分: {:.2}", score),
        None => info!("平均质量分: 无"),
    }
    if quiz.metadata.regeneration_count > 0 {
        info!("重新生成次数: {}", quiz.metadata.regeneration_count);
    }
    if !errors.is_empty() {
        warn!("⚠️ 流程中记录了 {} 条错误:", errors.len());
        for error in errors {
            warn!("  - {}", error);
        }
    }
    info!("{}", "=".repeat(60));
    info!("\n测验已保存至: {}", output_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
