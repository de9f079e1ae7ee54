//! 组卷服务 - 业务能力层
//!
//! 把最终的题目按规划的轮次分组，生成最终测验。纯函数，不调用模型。

use chrono::Local;
use tracing::{info, warn};

use crate::models::{Question, Quiz, QuizMetadata, QuizPlan, QuizRequest, QuizRound};

/// 没有任何题目时的标题
pub const EMPTY_QUIZ_TITLE: &str = "Empty Quiz";
/// 规划和请求都没有标题时的标题
pub const GENERIC_QUIZ_TITLE: &str = "Quiz";
/// 规划和请求都没有描述时的描述
pub const GENERIC_QUIZ_DESCRIPTION: &str = "Generated quiz";

/// 组卷服务
pub struct Coordinator {
    model_used: String,
}

impl Coordinator {
    /// `model_used` 取自实际出题的模型客户端
    pub fn new(model_used: impl Into<String>) -> Self {
        Self {
            model_used: model_used.into(),
        }
    }

    /// 组装最终测验
    ///
    /// # 参数
    /// - `questions`: 最终题目
    /// - `plan`: 测验规划
    /// - `request`: 用户请求
    /// - `attempt`: 重试次数
    pub fn format_quiz(
        &self,
        questions: &[Question],
        plan: &QuizPlan,
        request: &QuizRequest,
        attempt: u32,
    ) -> Quiz {
        let title = non_blank(&plan.title)
            .or_else(|| request.quiz_title.clone())
            .unwrap_or_else(|| {
                if questions.is_empty() {
                    EMPTY_QUIZ_TITLE.to_string()
                } else {
                    GENERIC_QUIZ_TITLE.to_string()
                }
            });
        let description = non_blank(&plan.description)
            .or_else(|| request.quiz_description.clone())
            .unwrap_or_else(|| GENERIC_QUIZ_DESCRIPTION.to_string());

        if questions.is_empty() {
            warn!("⚠️ 没有题目，输出空测验");
            return Quiz {
                title,
                description,
                rounds: Vec::new(),
                metadata: self.metadata(attempt, None),
            };
        }

        let mut rounds = Vec::with_capacity(plan.rounds.len());
        for spec in &plan.rounds {
            let round_questions: Vec<Question> = questions
                .iter()
                .filter(|q| q.topic == spec.topic)
                .cloned()
                .collect();

            if round_questions.is_empty() {
                warn!("⚠️ 第 {} 轮 [{}] 没有题目，省略该轮", spec.round_number, spec.topic);
                continue;
            }

            rounds.push(QuizRound {
                round_name: spec.round_name.clone(),
                round_number: spec.round_number,
                topic: spec.topic.clone(),
                questions: round_questions,
            });
        }

        let quiz = Quiz {
            title,
            description,
            rounds,
            metadata: self.metadata(attempt, average_score(questions)),
        };
        info!(
            "✓ 组卷完成: {} 轮，共 {} 道题",
            quiz.total_rounds(),
            quiz.total_questions()
        );
        quiz
    }

    fn metadata(&self, attempt: u32, average_quality_score: Option<f64>) -> QuizMetadata {
        QuizMetadata {
            created_at: Local::now(),
            model_used: self.model_used.clone(),
            regeneration_count: attempt,
            average_quality_score,
            generation_time_seconds: None,
        }
    }
}

/// 只对有分数的题目求平均
pub fn average_score(questions: &[Question]) -> Option<f64> {
    let scores: Vec<f64> = questions.iter().filter_map(|q| q.quality_score).collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
