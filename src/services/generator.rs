//! 出题服务 - 业务能力层
//!
//! 首次出题时按规划为每一轮出满配额；重试时只替换未通过的题目：
//! 保留反馈中没有出现的题目，按主题统计需要补多少道，只为有缺口的轮次调用模型。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{ask_for, StructuredLlm};
use crate::config::Config;
use crate::models::responses::GeneratedQuestionList;
use crate::models::{FeedbackItem, Question, QuizPlan, RoundSpec};

const SYSTEM_PROMPT: &str = "You are an expert quiz question writer. Create high-quality, engaging multiple-choice questions.

Requirements:
- Each question must have exactly 4 options keyed A, B, C, D
- Only ONE option should be correct
- Incorrect options (distractors) should be plausible but clearly wrong
- Questions should be clear and unambiguous
- Avoid trivial or overly obscure questions
- Match the requested difficulty level
- Include a short explanation of the correct answer

Difficulty levels:
- easy: Common knowledge, straightforward questions
- medium: Requires general knowledge or logical thinking
- hard: Challenging, requires specific knowledge or deep thinking";

/// 出题结果
#[derive(Debug, Default)]
pub struct GenerationOutcome {
    /// 保留的题目 + 新生成的题目
    pub questions: Vec<Question>,
    /// 非致命错误
    pub errors: Vec<String>,
}

/// 重试时对上一轮题目的划分
#[derive(Debug, Default)]
pub struct RetrySplit {
    /// 不在反馈中的题目
    pub kept: Vec<Question>,
    /// 每个主题被丢弃的题目数
    pub deficit_by_topic: HashMap<String, usize>,
}

/// 按题目 id 划分保留与丢弃的题目
pub fn split_for_retry(prior: Vec<Question>, feedback: &[FeedbackItem]) -> RetrySplit {
    let failing: HashSet<&str> = feedback
        .iter()
        .filter_map(|f| f.question_id.as_deref())
        .collect();

    let mut split = RetrySplit::default();
    for question in prior {
        if failing.contains(question.id.as_str()) {
            *split.deficit_by_topic.entry(question.topic.clone()).or_insert(0) += 1;
        } else {
            split.kept.push(question);
        }
    }
    split
}

/// 汇总某个主题的反馈，供重新出题时参考
pub fn format_feedback_for_topic(feedback: &[FeedbackItem], topic: &str) -> String {
    if feedback.is_empty() {
        return "No specific feedback available.".to_string();
    }

    let relevant: Vec<&FeedbackItem> = feedback
        .iter()
        .filter(|f| f.topic.as_deref() == Some(topic))
        .collect();

    if relevant.is_empty() {
        return "General: Improve question quality, clarity, and difficulty appropriateness.".to_string();
    }

    let mut lines = Vec::new();
    for item in relevant {
        if !item.issue.is_empty() {
            lines.push(format!("- {}", item.issue));
        }
        for issue in &item.issues {
            lines.push(format!("  • {}", issue));
        }
    }

    if lines.is_empty() {
        "Improve overall quality.".to_string()
    } else {
        lines.join("\n")
    }
}

/// 出题服务
pub struct Generator {
    llm: Arc<dyn StructuredLlm>,
    temperature: f32,
}

impl Generator {
    pub fn new(config: &Config, llm: Arc<dyn StructuredLlm>) -> Self {
        Self {
            llm,
            temperature: config.default_temperature,
        }
    }

    /// 按规划出题
    ///
    /// # 参数
    /// - `plan`: 测验规划
    /// - `attempt`: 当前重试次数（0 表示首次）
    /// - `feedback`: 上一次审核/核查的反馈（按题目 id）
    /// - `prior`: 上一阶段的题目
    pub async fn generate(
        &self,
        plan: &QuizPlan,
        attempt: u32,
        feedback: &[FeedbackItem],
        prior: Vec<Question>,
    ) -> GenerationOutcome {
        // 只有针对具体题目的反馈才能做选择性重试
        let is_retry = attempt > 0 && feedback.iter().any(|f| f.question_id.is_some());

        let (mut questions, deficit_by_topic) = if is_retry {
            let split = split_for_retry(prior, feedback);
            info!(
                "🔁 第 {} 次重试: 保留 {} 道题，需要补充 {} 道",
                attempt,
                split.kept.len(),
                split.deficit_by_topic.values().sum::<usize>()
            );
            (split.kept, split.deficit_by_topic)
        } else {
            info!("📝 按规划出题: {} 轮，共 {} 道", plan.rounds.len(), plan.total_questions());
            (Vec::new(), HashMap::new())
        };

        let mut errors = Vec::new();

        for round in &plan.rounds {
            let count = if is_retry {
                match deficit_by_topic.get(&round.topic) {
                    Some(&n) if n > 0 => n,
                    _ => continue,
                }
            } else {
                round.question_count as usize
            };

            let feedback_context = is_retry.then(|| {
                format!(
                    "IMPORTANT: This is regeneration attempt {}.\nPrevious questions on this topic had quality issues. Please improve based on this feedback:\n{}\n\nFocus on:\n- More interesting and engaging questions\n- Clear, unambiguous wording\n- Plausible but clearly incorrect distractors\n- Proper difficulty level\n",
                    attempt,
                    format_feedback_for_topic(feedback, &round.topic)
                )
            });

            let (generated, mut round_errors) =
                self.generate_round(round, count, feedback_context.as_deref()).await;
            questions.extend(generated);
            errors.append(&mut round_errors);
        }

        GenerationOutcome { questions, errors }
    }

    /// 为一轮生成 `count` 道题
    ///
    /// 模型调用失败时整轮跳过，返回错误信息
    async fn generate_round(
        &self,
        round: &RoundSpec,
        count: usize,
        feedback_context: Option<&str>,
    ) -> (Vec<Question>, Vec<String>) {
        info!(
            "✍️ 第 {} 轮 [{}]: 生成 {} 道题 (难度: {})",
            round.round_number, round.topic, count, round.difficulty
        );

        let user_prompt = format!(
            "Generate {} multiple-choice questions on the topic: {}\n\nDifficulty level: {}\nRound: {}\n\n{}\nGenerate exactly {} high-quality questions.",
            count,
            round.topic,
            round.difficulty,
            round.round_number,
            feedback_context.unwrap_or_default(),
            count
        );

        let list = match ask_for::<GeneratedQuestionList>(
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
                    "Failed to generate questions for round {} ({}): {}",
                    round.round_number, round.topic, e
                );
                warn!("⚠️ 跳过该轮: {}", msg);
                return (Vec::new(), vec![msg]);
            }
        };

        let mut questions = Vec::with_capacity(count);
        let mut errors = Vec::new();
        for (i, generated) in list.questions.into_iter().enumerate() {
            match generated.into_question(&round.topic, round.difficulty) {
                Ok(question) => questions.push(question),
                Err(e) => {
                    let msg = format!(
                        "Discarded invalid question {} in round {} ({}): {}",
                        i, round.round_number, round.topic, e
                    );
                    warn!("⚠️ {}", msg);
                    errors.push(msg);
                }
            }
        }

        if questions.len() > count {
            questions.truncate(count);
        } else if questions.len() < count {
            warn!(
                "⚠️ 第 {} 轮 [{}] 只得到 {}/{} 道题",
                round.round_number,
                round.topic,
                questions.len(),
                count
            );
        }

        (questions, errors)
    }
}
