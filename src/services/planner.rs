//! 规划服务 - 业务能力层
//!
//! 只负责"把用户需求变成测验规划"，任何情况下都返回可用的规划

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{ask_for, StructuredLlm};
use crate::config::Config;
use crate::error::LlmResult;
use crate::models::plan::{DEFAULT_QUIZ_DESCRIPTION, DEFAULT_QUIZ_TITLE};
use crate::models::request::{same_topic, MAX_QUESTIONS_PER_ROUND, MIN_QUESTIONS_PER_ROUND};
use crate::models::responses::{PlanDraft, RoundDraft};
use crate::models::{Difficulty, QuizPlan, QuizRequest, RoundSpec};

const SYSTEM_PROMPT: &str = "You are a quiz planning expert. Your job is to create a well-structured quiz plan.

Given the user's requirements, create a detailed quiz plan with:
1. An engaging quiz title (if not provided)
2. A brief description
3. Rounds organized by topics, exactly one round per requested topic
4. Balanced distribution of questions

Guidelines:
- Each round should focus on one topic
- Round names should be engaging and descriptive
- Ensure variety and good flow between rounds
- Consider the difficulty level requested";

/// 规划服务
pub struct Planner {
    llm: Arc<dyn StructuredLlm>,
    temperature: f32,
}

impl Planner {
    pub fn new(config: &Config, llm: Arc<dyn StructuredLlm>) -> Self {
        Self {
            llm,
            temperature: config.default_temperature,
        }
    }

    /// 生成测验规划
    ///
    /// 模型调用失败时退回确定性的兜底规划，不会再次调用模型
    pub async fn create_plan(&self, request: &QuizRequest) -> QuizPlan {
        match self.draft_plan(request).await {
            Ok(draft) => {
                let plan = repair_plan(draft, request);
                info!("✓ 规划完成: 《{}》共 {} 轮", plan.title, plan.rounds.len());
                plan
            }
            Err(e) => {
                warn!("⚠️ 生成规划失败，使用兜底规划: {}", e);
                QuizPlan::fallback(request)
            }
        }
    }

    async fn draft_plan(&self, request: &QuizRequest) -> LlmResult<PlanDraft> {
        let user_prompt = build_user_prompt(request);
        ask_for::<PlanDraft>(self.llm.as_ref(), SYSTEM_PROMPT, &user_prompt, self.temperature).await
    }
}

fn build_user_prompt(request: &QuizRequest) -> String {
    let mut prompt = format!(
        "Create a quiz plan with the following requirements:\n\nTopics: {}\nQuestions per round: {}\nDifficulty: {}\n",
        request.topics.join(", "),
        request.questions_per_round,
        request.difficulty
    );
    if let Some(title) = &request.quiz_title {
        prompt.push_str(&format!("Custom title: {}\n", title));
    }
    if let Some(description) = &request.quiz_description {
        prompt.push_str(&format!("Custom description: {}\n", description));
    }
    prompt.push_str("\nCreate an engaging quiz plan.");
    prompt
}

/// 修复模型给出的规划
///
/// - 轮数与主题数不一致时丢弃模型的轮次，按主题重建
/// - 缺失的标题、描述用用户输入或默认值补齐
/// - 无效难度替换为用户要求的难度
pub fn repair_plan(draft: PlanDraft, request: &QuizRequest) -> QuizPlan {
    let title = non_empty(draft.title)
        .or_else(|| request.quiz_title.clone())
        .unwrap_or_else(|| DEFAULT_QUIZ_TITLE.to_string());
    let description = non_empty(draft.description)
        .or_else(|| request.quiz_description.clone())
        .unwrap_or_else(|| DEFAULT_QUIZ_DESCRIPTION.to_string());

    let rounds = if draft.rounds.len() == request.topics.len() {
        assign_rounds(&draft.rounds, request)
    } else {
        warn!(
            "⚠️ 模型给出 {} 轮，但请求了 {} 个主题，按主题重建轮次",
            draft.rounds.len(),
            request.topics.len()
        );
        QuizPlan::fallback_rounds(request)
    };

    QuizPlan {
        title,
        description,
        rounds,
    }
}

/// 把模型的轮次分配给请求的主题，每个草稿轮次最多使用一次
///
/// 先按主题匹配；剩下的主题依次取同位置或第一个未使用的轮次，
/// 这时模型的主题对不上，轮次名称不可信，只保留题量和难度
fn assign_rounds(drafts: &[RoundDraft], request: &QuizRequest) -> Vec<RoundSpec> {
    let mut claimed = vec![false; drafts.len()];
    let mut matched: Vec<Option<usize>> = request
        .topics
        .iter()
        .map(|topic| {
            let index = drafts.iter().enumerate().position(|(j, r)| {
                !claimed[j] && r.topic.as_deref().is_some_and(|t| same_topic(t, topic))
            })?;
            claimed[index] = true;
            Some(index)
        })
        .collect();

    for (i, slot) in matched.iter_mut().enumerate() {
        if slot.is_some() {
            continue;
        }
        let index = if claimed.get(i) == Some(&false) {
            Some(i)
        } else {
            claimed.iter().position(|c| !c)
        };
        if let Some(index) = index {
            claimed[index] = true;
            *slot = Some(index);
        }
    }

    request
        .topics
        .iter()
        .zip(matched)
        .enumerate()
        .map(|(i, (topic, index))| {
            let round_number = i as u32 + 1;
            match index {
                Some(index) => repair_round(&drafts[index], round_number, topic, request),
                None => RoundSpec {
                    round_number,
                    round_name: RoundSpec::default_name(round_number, topic),
                    topic: topic.clone(),
                    question_count: request.questions_per_round,
                    difficulty: request.difficulty,
                },
            }
        })
        .collect()
}

fn repair_round(draft: &RoundDraft, round_number: u32, topic: &str, request: &QuizRequest) -> RoundSpec {
    let question_count = draft
        .question_count
        .filter(|c| (MIN_QUESTIONS_PER_ROUND..=MAX_QUESTIONS_PER_ROUND).contains(c))
        .unwrap_or(request.questions_per_round);
    let difficulty = draft
        .difficulty
        .as_deref()
        .and_then(|d| d.parse::<Difficulty>().ok())
        .unwrap_or(request.difficulty);
    let topic_matches = draft.topic.as_deref().map_or(true, |t| same_topic(t, topic));
    let round_name = non_empty(draft.round_name.clone())
        .filter(|_| topic_matches)
        .unwrap_or_else(|| RoundSpec::default_name(round_number, topic));

    RoundSpec {
        round_number,
        round_name,
        topic: topic.to_string(),
        question_count,
        difficulty,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
