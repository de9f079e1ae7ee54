//! 核查服务 - 业务能力层
//!
//! 逐批核对答案是否正确、干扰项是否确实错误、题目是否有歧义。
//! 核查失败不阻塞流程：模型调用出错时整批视为通过。

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{ask_for, StructuredLlm};
use crate::config::Config;
use crate::models::responses::ValidationList;
use crate::models::{Question, ValidationIssue};

/// 每次调用模型核查的题目数
pub const VALIDATION_BATCH_SIZE: usize = 5;
/// 核查未通过的题目被压到的分数
pub const FAILED_VALIDATION_SCORE: f64 = 0.5;

const SYSTEM_PROMPT: &str = "You are a fact-checker and quiz validator. Your job is to verify that quiz questions are accurate.

For each question, check:
1. Is the marked correct answer actually correct?
2. Are all incorrect options actually incorrect?
3. Is there any ambiguity that could make multiple answers correct?
4. Does the explanation match the answer?

Be thorough and precise. Flag any issues you find.
Use the question numbers shown in the prompt as question_index.";

/// 核查结果
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub questions: Vec<Question>,
    pub issues: Vec<ValidationIssue>,
    pub errors: Vec<String>,
}

/// 核查服务
pub struct Validator {
    llm: Arc<dyn StructuredLlm>,
    temperature: f32,
}

impl Validator {
    pub fn new(config: &Config, llm: Arc<dyn StructuredLlm>) -> Self {
        Self {
            llm,
            temperature: config.validation_temperature,
        }
    }

    /// 核查全部题目，题目数量和顺序保持不变
    pub async fn validate(&self, questions: Vec<Question>) -> ValidationOutcome {
        if questions.is_empty() {
            info!("没有题目需要核查");
            return ValidationOutcome::default();
        }

        let total = questions.len();
        let mut outcome = ValidationOutcome::default();
        let mut remaining = questions.into_iter().peekable();
        let mut offset = 0usize;

        while remaining.peek().is_some() {
            let batch: Vec<Question> = remaining.by_ref().take(VALIDATION_BATCH_SIZE).collect();
            let batch_len = batch.len();
            let (checked, issues, error) = self.validate_batch(batch, offset).await;
            outcome.questions.extend(checked);
            outcome.issues.extend(issues);
            outcome.errors.extend(error);
            offset += batch_len;
        }

        if outcome.issues.is_empty() {
            info!("✓ 核查完成: {} 道题全部通过", total);
        } else {
            warn!("⚠️ 核查完成: {}/{} 道题存在问题", outcome.issues.len(), total);
        }

        outcome
    }

    async fn validate_batch(
        &self,
        mut batch: Vec<Question>,
        offset: usize,
    ) -> (Vec<Question>, Vec<ValidationIssue>, Option<String>) {
        let user_prompt = format!(
            "Validate these quiz questions for accuracy:\n\n{}\n\nCheck each question carefully for factual accuracy and ambiguity.",
            format_questions_for_validation(&batch)
        );

        let list = match ask_for::<ValidationList>(
            self.llm.as_ref(),
            SYSTEM_PROMPT,
            &user_prompt,
            self.temperature,
        )
        .await
        {
            Ok(list) => list,
            Err(e) => {
                let msg = format!(
                    "Validation failed for questions {}-{}: {}",
                    offset,
                    offset + batch.len() - 1,
                    e
                );
                warn!("⚠️ {}，整批视为通过", msg);
                return (batch, Vec::new(), Some(msg));
            }
        };

        let mut issues = Vec::new();
        for (j, question) in batch.iter_mut().enumerate() {
            let Some(validation) = list.validations.iter().find(|v| v.question_index == j) else {
                continue;
            };
            if validation.passed() {
                continue;
            }

            // 审核反馈保持原样，核查问题只记在 ValidationIssue 里
            if let Err(e) = question.set_quality_score(FAILED_VALIDATION_SCORE) {
                warn!("⚠️ 题目 {} 无法写入核查分数: {}", question.id, e);
            }
            let mut problems = validation.issues.clone();
            if problems.is_empty() {
                problems.push("Validation checks failed".to_string());
            }

            issues.push(ValidationIssue {
                question_id: question.id.clone(),
                question_index: offset + j,
                topic: question.topic.clone(),
                question_text: question.question_text.clone(),
                issues: problems,
                suggested_fix: validation.suggested_fix.clone(),
                confidence: validation.confidence,
            });
        }

        (batch, issues, None)
    }
}

/// 核查提示词中的题目列表，编号为批内位置
pub fn format_questions_for_validation(questions: &[Question]) -> String {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let options: Vec<String> = q
                .options
                .iter()
                .map(|(label, text)| format!("  {}: {}", label, text))
                .collect();
            format!(
                "Question {}:\nQuestion: {}\nOptions:\n{}\nMarked Correct: {} ({})\nExplanation: {}\n---",
                i,
                q.question_text,
                options.join("\n"),
                q.correct_answer,
                q.correct_text(),
                q.explanation.as_deref().unwrap_or("Not provided")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
