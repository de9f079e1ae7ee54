//! 审核服务 - 业务能力层
//!
//! 按批次（每批 5 道）为题目打分并写入反馈。审核从不丢弃题目，
//! 只给题目标注分数，并为低于阈值的题目记录按 id 索引的反馈。

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{ask_for, StructuredLlm};
use crate::config::Config;
use crate::models::responses::ReviewList;
use crate::models::{FeedbackItem, Question};

/// 每次调用模型审核的题目数
pub const REVIEW_BATCH_SIZE: usize = 5;
/// 审核不可用时的中性分数
pub const DEFAULT_REVIEW_SCORE: f64 = 0.7;
/// 低分题目占比超过该值时要求重试
pub const MAX_FAILING_FRACTION: f64 = 0.3;

const SYSTEM_PROMPT: &str = "You are an expert quiz quality reviewer. Evaluate quiz questions on multiple criteria.

For each question, assess:
1. Clarity: Is the question clear and unambiguous? (0-1)
2. Answer Correctness: Is the correct answer actually correct? (0-1)
3. Distractor Quality: Are incorrect options plausible but clearly wrong? (0-1)
4. Difficulty Match: Does it match the intended difficulty? (0-1)
5. Engagement: Is it interesting and well-written? (0-1)

Overall score should be the average of the 5 criteria.
Consider a question \"passed\" if overall_score >= 0.7.
Use the question numbers shown in the prompt as question_index.";

/// 审核结果
#[derive(Debug, Default)]
pub struct ReviewOutcome {
    /// 全部题目（已标注分数）
    pub questions: Vec<Question>,
    /// 低于阈值的题目反馈
    pub feedback: Vec<FeedbackItem>,
    pub needs_regeneration: bool,
    pub average_score: f64,
    pub errors: Vec<String>,
}

/// 判断是否需要重试：低分占比超过 30% 或平均分低于阈值
pub fn needs_regeneration(failing: usize, total: usize, average: f64, threshold: f64) -> bool {
    failing as f64 > total as f64 * MAX_FAILING_FRACTION || average < threshold
}

/// 审核服务
pub struct Reviewer {
    llm: Arc<dyn StructuredLlm>,
    temperature: f32,
}

impl Reviewer {
    pub fn new(config: &Config, llm: Arc<dyn StructuredLlm>) -> Self {
        Self {
            llm,
            temperature: config.review_temperature,
        }
    }

    /// 审核全部题目
    ///
    /// # 参数
    /// - `questions`: 待审核题目
    /// - `threshold`: 质量阈值
    pub async fn review(&self, questions: Vec<Question>, threshold: f64) -> ReviewOutcome {
        if questions.is_empty() {
            warn!("⚠️ 没有题目可审核，要求重新出题");
            return ReviewOutcome {
                questions: Vec::new(),
                feedback: vec![FeedbackItem::general("No questions to review")],
                needs_regeneration: true,
                average_score: 0.0,
                errors: Vec::new(),
            };
        }

        let total = questions.len();
        let mut outcome = ReviewOutcome::default();
        let mut failing = 0usize;

        let mut remaining = questions.into_iter().peekable();
        let mut batch_index = 0usize;
        while remaining.peek().is_some() {
            let batch: Vec<Question> = remaining.by_ref().take(REVIEW_BATCH_SIZE).collect();
            let offset = batch_index * REVIEW_BATCH_SIZE;
            batch_index += 1;

            let (reviewed, feedback, error) = self.review_batch(batch, offset, threshold).await;
            failing += feedback.len();
            outcome.questions.extend(reviewed);
            outcome.feedback.extend(feedback);
            outcome.errors.extend(error);
        }

        let score_sum: f64 = outcome
            .questions
            .iter()
            .map(|q| q.quality_score.unwrap_or(DEFAULT_REVIEW_SCORE))
            .sum();
        outcome.average_score = score_sum / total as f64;
        outcome.needs_regeneration = needs_regeneration(failing, total, outcome.average_score, threshold);

        info!(
            "✓ 审核完成: 平均分 {:.2}，低分 {}/{}，{}",
            outcome.average_score,
            failing,
            total,
            if outcome.needs_regeneration { "需要重试" } else { "通过" }
        );

        outcome
    }

    /// 审核一批题目
    ///
    /// 返回（标注后的题目，低分反馈，批次错误）
    async fn review_batch(
        &self,
        mut batch: Vec<Question>,
        offset: usize,
        threshold: f64,
    ) -> (Vec<Question>, Vec<FeedbackItem>, Option<String>) {
        let user_prompt = format!(
            "Review these quiz questions:\n\n{}\n\nEvaluate each question with detailed scores and feedback.",
            format_questions_for_review(&batch)
        );

        let review_list = match ask_for::<ReviewList>(
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
                    "Review failed for questions {}-{}: {}",
                    offset,
                    offset + batch.len() - 1,
                    e
                );
                warn!("⚠️ {}，按默认分数接受", msg);
                for question in &mut batch {
                    stamp_score(question, DEFAULT_REVIEW_SCORE);
                    question.feedback = Some("Review failed, assuming acceptable quality".to_string());
                }
                return (batch, Vec::new(), Some(msg));
            }
        };

        let mut feedback = Vec::new();
        for (j, question) in batch.iter_mut().enumerate() {
            let Some(review) = review_list.reviews.iter().find(|r| r.question_index == j) else {
                stamp_score(question, DEFAULT_REVIEW_SCORE);
                question.feedback = Some("Review not available".to_string());
                continue;
            };

            let score = stamp_score(question, review.mean_score());
            question.feedback = Some(review.feedback.clone());

            if score < threshold {
                feedback.push(FeedbackItem {
                    question_id: Some(question.id.clone()),
                    topic: Some(question.topic.clone()),
                    issue: review.feedback.clone(),
                    issues: review.issues.clone(),
                    score: Some(score),
                });
            }
        }

        (batch, feedback, None)
    }
}

/// 写入质量分，分数无效（如 NaN）时改用默认分数
///
/// 返回实际写入的分数
fn stamp_score(question: &mut Question, score: f64) -> f64 {
    match question.set_quality_score(score) {
        Ok(()) => score,
        Err(e) => {
            warn!("⚠️ 题目 {} 的审核分数无效，使用默认分数: {}", question.id, e);
            question.quality_score = Some(DEFAULT_REVIEW_SCORE);
            DEFAULT_REVIEW_SCORE
        }
    }
}

/// 审核提示词中的题目列表，编号为批内位置
pub fn format_questions_for_review(questions: &[Question]) -> String {
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
                "Question {}:\nTopic: {}\nDifficulty: {}\nQuestion: {}\nOptions:\n{}\nCorrect Answer: {}\nExplanation: {}\n---",
                i,
                q.topic,
                q.difficulty,
                q.question_text,
                options.join("\n"),
                q.correct_answer,
                q.explanation.as_deref().unwrap_or("Not provided")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::llm_client::test_support::{prompt_question_texts, review_json, ScriptedLlm};
    use crate::error::LlmError;
    use crate::models::{ChoiceLabel, Choices, Difficulty};
    use serde_json::json;

    fn questions(count: usize, prefix: &str) -> Vec<Question> {
        (0..count)
            .map(|i| {
                Question::new(
                    format!("{} question number {}?", prefix, i),
                    Choices::new("a", "b", "c", "d").unwrap(),
                    ChoiceLabel::A,
                    "History",
                    Difficulty::Medium,
                )
                .unwrap()
            })
            .collect()
    }

    /// 题干包含 "BAD" 的题目得 0.375 分，其余得 `good` 分
    fn scoring_llm(good: f64) -> Arc<ScriptedLlm> {
        Arc::new(ScriptedLlm::new(move |req| {
            let reviews: Vec<_> = prompt_question_texts(&req.user)
                .iter()
                .enumerate()
                .map(|(i, text)| review_json(i, if text.contains("BAD") { 0.375 } else { good }))
                .collect();
            Ok(json!({ "reviews": reviews }))
        }))
    }

    #[tokio::test]
    async fn test_empty_input_forces_retry() {
        let reviewer = Reviewer::new(&Config::default(), Arc::new(ScriptedLlm::failing()));
        let outcome = reviewer.review(Vec::new(), 0.7).await;

        assert!(outcome.questions.is_empty());
        assert!(outcome.needs_regeneration);
        assert_eq!(outcome.feedback.len(), 1);
        assert!(outcome.feedback[0].question_id.is_none());
    }

    #[tokio::test]
    async fn test_batches_of_five() {
        let llm = scoring_llm(0.875);
        let reviewer = Reviewer::new(&Config::default(), llm.clone());

        let outcome = reviewer.review(questions(12, "Good"), 0.7).await;

        assert_eq!(outcome.questions.len(), 12);
        let calls = llm.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(prompt_question_texts(&calls[2].user).len(), 2);
        // 批内编号从 0 开始
        assert!(calls[1].user.starts_with("Review these quiz questions:\n\nQuestion 0:"));
        assert!(outcome.questions.iter().all(|q| q.quality_score == Some(0.875)));
        assert!(!outcome.needs_regeneration);
    }

    #[tokio::test]
    async fn test_two_of_ten_failing_with_high_mean_passes() {
        let reviewer = Reviewer::new(&Config::default(), scoring_llm(0.875));
        let mut items = questions(8, "Good");
        items.extend(questions(2, "BAD"));

        let outcome = reviewer.review(items, 0.7).await;

        // 2/10 = 20% 未超过 30%，平均分 (8*0.875 + 2*0.375)/10 = 0.775
        assert_eq!(outcome.feedback.len(), 2);
        assert!((outcome.average_score - 0.775).abs() < 1e-9);
        assert!(!outcome.needs_regeneration);
        assert_eq!(outcome.questions.len(), 10);
    }

    #[tokio::test]
    async fn test_two_of_ten_failing_with_low_mean_retries() {
        let reviewer = Reviewer::new(&Config::default(), scoring_llm(0.75));
        let mut items = questions(8, "Good");
        items.extend(questions(2, "BAD"));

        let outcome = reviewer.review(items, 0.7).await;

        // 平均分 (8*0.75 + 2*0.375)/10 = 0.675 < 0.7
        assert_eq!(outcome.feedback.len(), 2);
        assert!(outcome.average_score < 0.7);
        assert!(outcome.needs_regeneration);
    }

    #[tokio::test]
    async fn test_feedback_is_keyed_by_question_id() {
        let reviewer = Reviewer::new(&Config::default(), scoring_llm(0.875));
        let mut items = questions(3, "Good");
        items.extend(questions(1, "BAD"));
        let bad_id = items[3].id.clone();

        let outcome = reviewer.review(items, 0.7).await;

        assert_eq!(outcome.feedback.len(), 1);
        assert_eq!(outcome.feedback[0].question_id.as_deref(), Some(bad_id.as_str()));
        assert_eq!(outcome.feedback[0].topic.as_deref(), Some("History"));
        assert_eq!(outcome.feedback[0].issues, vec!["Too vague".to_string()]);
    }

    #[tokio::test]
    async fn test_batch_failure_accepts_with_default_score() {
        let reviewer = Reviewer::new(
            &Config::default(),
            Arc::new(ScriptedLlm::new(|_| Err(LlmError::EmptyContent { model: "scripted".into() }))),
        );

        let outcome = reviewer.review(questions(6, "Any"), 0.7).await;

        assert_eq!(outcome.questions.len(), 6);
        assert!(outcome.questions.iter().all(|q| q.quality_score == Some(DEFAULT_REVIEW_SCORE)));
        assert!(outcome.feedback.is_empty());
        assert!(!outcome.needs_regeneration);
        assert_eq!(outcome.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_review_gets_default_score() {
        let llm = Arc::new(ScriptedLlm::new(|_| Ok(json!({ "reviews": [review_json(0, 0.9375), review_json(7, 0.1)] }))));
        let reviewer = Reviewer::new(&Config::default(), llm);

        let outcome = reviewer.review(questions(2, "Good"), 0.7).await;

        assert_eq!(outcome.questions[0].quality_score, Some(0.9375));
        assert_eq!(outcome.questions[1].quality_score, Some(DEFAULT_REVIEW_SCORE));
        assert_eq!(outcome.questions[1].feedback.as_deref(), Some("Review not available"));
        assert!(outcome.feedback.is_empty());
    }

    #[test]
    fn test_invalid_score_falls_back_to_default() {
        let mut question = questions(1, "Odd").remove(0);

        assert_eq!(stamp_score(&mut question, f64::NAN), DEFAULT_REVIEW_SCORE);
        assert_eq!(question.quality_score, Some(DEFAULT_REVIEW_SCORE));

        assert_eq!(stamp_score(&mut question, 0.25), 0.25);
        assert_eq!(question.quality_score, Some(0.25));
    }

    #[test]
    fn test_needs_regeneration_rules() {
        // 3/10 不超过 30%
        assert!(!needs_regeneration(3, 10, 0.75, 0.7));
        assert!(needs_regeneration(4, 10, 0.75, 0.7));
        assert!(needs_regeneration(0, 10, 0.69, 0.7));
    }
}
