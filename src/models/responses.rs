//! LLM 结构化输出
//!
//! 每个类型对应一种要求模型返回的 JSON 结构，schema 由 `schemars` 生成

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::QuestionError;
use crate::models::question::{ChoiceLabel, Choices, Difficulty, Question};

/// 可以作为结构化输出请求的类型
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    /// schema 名称（日志与请求中使用）
    const NAME: &'static str;
}

// ========== 规划 ==========

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RoundDraft {
    pub round_number: Option<u32>,
    pub round_name: Option<String>,
    pub topic: Option<String>,
    pub question_count: Option<u32>,
    /// easy / medium / hard
    pub difficulty: Option<String>,
}

/// 模型给出的测验规划草稿
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlanDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub rounds: Vec<RoundDraft>,
}

impl StructuredOutput for PlanDraft {
    const NAME: &'static str = "quiz_plan";
}

// ========== 出题 ==========

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedQuestion {
    pub question_text: String,
    /// 键必须恰好为 A, B, C, D
    pub options: BTreeMap<String, String>,
    /// A, B, C 或 D
    pub correct_answer: String,
    pub explanation: Option<String>,
}

impl GeneratedQuestion {
    /// 转换为题目，主题与难度由调用方指定
    pub fn into_question(self, topic: &str, difficulty: Difficulty) -> Result<Question, QuestionError> {
        let options = Choices::try_from(self.options)?;
        let correct_answer: ChoiceLabel = self.correct_answer.parse()?;
        Ok(Question::new(self.question_text, options, correct_answer, topic, difficulty)?
            .with_explanation(self.explanation))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedQuestionList {
    pub questions: Vec<GeneratedQuestion>,
}

impl StructuredOutput for GeneratedQuestionList {
    const NAME: &'static str = "question_list";
}

// ========== 审核 ==========

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionReview {
    /// 本批中的位置，从 0 开始
    pub question_index: usize,
    pub clarity_score: f64,
    pub correctness_score: f64,
    pub distractor_score: f64,
    pub difficulty_score: f64,
    pub engagement_score: f64,
    pub overall_score: Option<f64>,
    pub feedback: String,
    #[serde(default)]
    pub issues: Vec<String>,
    pub passed: Option<bool>,
}

impl QuestionReview {
    /// 五项分数的算术平均（每项先截断到 [0, 1]）
    pub fn mean_score(&self) -> f64 {
        let scores = [
            self.clarity_score,
            self.correctness_score,
            self.distractor_score,
            self.difficulty_score,
            self.engagement_score,
        ];
        scores.iter().map(|s| s.clamp(0.0, 1.0)).sum::<f64>() / scores.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReviewList {
    pub reviews: Vec<QuestionReview>,
}

impl StructuredOutput for ReviewList {
    const NAME: &'static str = "review_list";
}

// ========== 核查 ==========

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionValidation {
    /// 本批中的位置，从 0 开始
    pub question_index: usize,
    /// 标记的正确答案确实正确
    pub correct_answer_valid: bool,
    /// 其余三个选项确实错误
    pub incorrect_options_valid: bool,
    /// 存在多个可辩护的答案
    pub is_ambiguous: bool,
    /// 解析支持标记的答案
    pub explanation_matches: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    pub suggested_fix: Option<String>,
    pub confidence: f64,
}

impl QuestionValidation {
    pub fn passed(&self) -> bool {
        self.correct_answer_valid
            && self.incorrect_options_valid
            && self.explanation_matches
            && !self.is_ambiguous
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidationList {
    pub validations: Vec<QuestionValidation>,
}

impl StructuredOutput for ValidationList {
    const NAME: &'static str = "validation_list";
}
