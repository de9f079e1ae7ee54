//! 测验生成流程 - 流程层
//!
//! 核心职责：按状态机推进各阶段，决定何时回到出题阶段
//!
//! 流程顺序：
//! 1. plan → generate → review
//! 2. review → generate（需要重试且还有次数）或 validate
//! 3. validate → generate（有核查问题且还有次数）或 coordinate
//! 4. coordinate → done
//!
//! 重试次数只在回到 generate 的那条边上加一，因此循环次数不超过 `max_attempts`。

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::clients::StructuredLlm;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{FeedbackItem, Quiz, QuizPlan, QuizRequest};
use crate::services::{Coordinator, Generator, Planner, Reviewer, Validator};
use crate::utils::logging;
use crate::workflow::quiz_state::{StateUpdate, WorkState};

/// 流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Plan,
    Generate,
    Review,
    Validate,
    Coordinate,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Plan => "规划",
            Stage::Generate => "出题",
            Stage::Review => "审核",
            Stage::Validate => "核查",
            Stage::Coordinate => "组卷",
            Stage::Done => "完成",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 审核之后去哪
pub fn route_after_review(state: &WorkState) -> Stage {
    if state.needs_regeneration && state.has_budget() {
        Stage::Generate
    } else {
        Stage::Validate
    }
}

/// 核查之后去哪
pub fn route_after_validation(state: &WorkState) -> Stage {
    if !state.validation_issues.is_empty() && state.has_budget() {
        Stage::Generate
    } else {
        Stage::Coordinate
    }
}

/// 测验生成流程
///
/// - 持有各阶段服务
/// - 只负责推进状态机，不做具体业务判断
pub struct QuizFlow {
    planner: Planner,
    generator: Generator,
    reviewer: Reviewer,
    validator: Validator,
    coordinator: Coordinator,
}

impl QuizFlow {
    pub fn new(config: &Config, llm: Arc<dyn StructuredLlm>) -> Self {
        let coordinator = Coordinator::new(llm.model_name());
        Self {
            planner: Planner::new(config, llm.clone()),
            generator: Generator::new(config, llm.clone()),
            reviewer: Reviewer::new(config, llm.clone()),
            validator: Validator::new(config, llm),
            coordinator,
        }
    }

    /// 运行完整流程并返回最终测验
    pub async fn run(&self, request: QuizRequest) -> AppResult<Quiz> {
        self.execute(request).await?.quiz.ok_or(AppError::NoQuizProduced)
    }

    /// 运行完整流程并返回最终状态（包含错误记录）
    ///
    /// 只有请求本身不合法时返回错误，各阶段的失败都在内部降级处理
    pub async fn execute(&self, request: QuizRequest) -> AppResult<WorkState> {
        let request = request.validated()?;
        logging::log_request(&request);

        let started = Instant::now();
        let mut state = WorkState::new(request);
        let mut stage = Stage::Plan;

        while stage != Stage::Done {
            logging::log_stage(stage.as_str(), state.attempt);
            stage = self.step(stage, &mut state).await;
        }

        let elapsed = started.elapsed().as_secs_f64();
        if let Some(quiz) = state.quiz.as_mut() {
            quiz.metadata.generation_time_seconds = Some(elapsed);
        }
        match state.average_score {
            Some(score) => info!(
                "✓ 流程结束: 重试 {} 次，最近平均分 {:.2}，用时 {:.1}s",
                state.attempt, score, elapsed
            ),
            None => info!("✓ 流程结束: 重试 {} 次，没有审核分数，用时 {:.1}s", state.attempt, elapsed),
        }

        Ok(state)
    }

    /// 执行一个阶段，返回下一个阶段
    async fn step(&self, stage: Stage, state: &mut WorkState) -> Stage {
        match stage {
            Stage::Plan => {
                let plan = self.planner.create_plan(&state.request).await;
                state.apply(StateUpdate::with_plan(plan));
                Stage::Generate
            }
            Stage::Generate => {
                let plan = current_plan(state);
                let prior = std::mem::take(&mut state.questions);
                let outcome = self
                    .generator
                    .generate(&plan, state.attempt, &state.feedback, prior)
                    .await;
                state.apply(outcome.into());
                Stage::Review
            }
            Stage::Review => {
                let questions = std::mem::take(&mut state.questions);
                let outcome = self
                    .reviewer
                    .review(questions, state.request.quality_threshold)
                    .await;
                state.apply(outcome.into());

                let next = route_after_review(state);
                if next == Stage::Generate {
                    info!("🔁 审核未通过，回到出题阶段 ({}/{})", state.attempt + 1, state.max_attempts);
                    let feedback = std::mem::take(&mut state.feedback);
                    state.apply(StateUpdate::retry(state.attempt + 1, feedback));
                } else if state.needs_regeneration {
                    info!("重试次数已用完，按当前质量继续");
                }
                next
            }
            Stage::Validate => {
                let questions = std::mem::take(&mut state.questions);
                let outcome = self.validator.validate(questions).await;
                state.apply(outcome.into());

                let next = route_after_validation(state);
                if next == Stage::Generate {
                    info!("🔁 核查发现问题，回到出题阶段 ({}/{})", state.attempt + 1, state.max_attempts);
                    let feedback: Vec<FeedbackItem> =
                        state.validation_issues.iter().map(FeedbackItem::from).collect();
                    state.apply(StateUpdate::retry(state.attempt + 1, feedback));
                } else if !state.validation_issues.is_empty() {
                    info!("重试次数已用完，保留 {} 道有问题的题目", state.validation_issues.len());
                }
                next
            }
            Stage::Coordinate => {
                let plan = current_plan(state);
                let quiz = self.coordinator.format_quiz(
                    &state.questions,
                    &plan,
                    &state.request,
                    state.attempt,
                );
                state.apply(StateUpdate::with_quiz(quiz));
                Stage::Done
            }
            Stage::Done => Stage::Done,
        }
    }
}

/// 规划阶段总会写入规划，这里只防止直接从中间阶段开始
fn current_plan(state: &WorkState) -> QuizPlan {
    state
        .plan
        .clone()
        .unwrap_or_else(|| QuizPlan::fallback(&state.request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::llm_client::test_support::{
        prompt_question_texts, question_list_json, requested_count, review_json, validation_json,
        ScriptedLlm,
    };
    use crate::error::InputError;
    use crate::models::{Difficulty, ValidationIssue};
    use serde_json::json;

    fn request(max_attempts: u32) -> QuizRequest {
        QuizRequest::new(vec!["History".into(), "Science".into()], 2, Difficulty::Medium)
            .with_max_attempts(max_attempts)
    }

    fn issue() -> ValidationIssue {
        ValidationIssue {
            question_id: "q-1".into(),
            question_index: 0,
            topic: "History".into(),
            question_text: "When?".into(),
            issues: vec!["wrong".into()],
            suggested_fix: None,
            confidence: 0.5,
        }
    }

    /// 审核分数固定、核查全部通过的模型
    fn scripted(score: f64) -> Arc<ScriptedLlm> {
        Arc::new(ScriptedLlm::new(move |req| match req.schema_name.as_str() {
            "question_list" => Ok(question_list_json(requested_count(&req.user), "Flow")),
            "review_list" => {
                let reviews: Vec<_> = (0..prompt_question_texts(&req.user).len())
                    .map(|i| review_json(i, score))
                    .collect();
                Ok(json!({ "reviews": reviews }))
            }
            "validation_list" => {
                let validations: Vec<_> = (0..prompt_question_texts(&req.user).len())
                    .map(|i| validation_json(i, true))
                    .collect();
                Ok(json!({ "validations": validations }))
            }
            _ => Err(crate::error::LlmError::EmptyContent { model: "scripted".into() }),
        }))
    }

    #[test]
    fn test_route_after_review() {
        let mut state = WorkState::new(request(1));
        assert_eq!(route_after_review(&state), Stage::Validate);

        state.needs_regeneration = true;
        assert_eq!(route_after_review(&state), Stage::Generate);

        state.attempt = 1;
        assert_eq!(route_after_review(&state), Stage::Validate);
    }

    #[test]
    fn test_route_after_validation() {
        let mut state = WorkState::new(request(1));
        assert_eq!(route_after_validation(&state), Stage::Coordinate);

        state.validation_issues.push(issue());
        assert_eq!(route_after_validation(&state), Stage::Generate);

        state.attempt = 1;
        assert_eq!(route_after_validation(&state), Stage::Coordinate);
    }

    #[test]
    fn test_zero_budget_never_loops() {
        let mut state = WorkState::new(request(0));
        state.needs_regeneration = true;
        state.validation_issues.push(issue());
        assert_eq!(route_after_review(&state), Stage::Validate);
        assert_eq!(route_after_validation(&state), Stage::Coordinate);
    }

    #[tokio::test]
    async fn test_happy_path_has_no_retries() {
        let llm = scripted(0.875);
        let flow = QuizFlow::new(&Config::default(), llm.clone());

        let state = flow.execute(request(3)).await.unwrap();

        let quiz = state.quiz.unwrap();
        assert_eq!(quiz.total_rounds(), 2);
        assert_eq!(quiz.total_questions(), 4);
        assert_eq!(quiz.metadata.regeneration_count, 0);
        assert!(quiz.metadata.generation_time_seconds.is_some());
        assert_eq!(quiz.metadata.model_used, "scripted");
        assert_eq!(state.average_score, Some(0.875));
        // 规划调用失败只会退回兜底规划，不记录错误
        assert_eq!(state.errors.len(), 0);
        assert_eq!(llm.calls_for("question_list").len(), 2);
    }

    #[tokio::test]
    async fn test_low_scores_exhaust_budget() {
        let llm = scripted(0.25);
        let flow = QuizFlow::new(&Config::default(), llm.clone());

        let quiz = flow.run(request(2)).await.unwrap();

        assert_eq!(quiz.metadata.regeneration_count, 2);
        assert_eq!(llm.calls_for("review_list").len(), 3);
        assert_eq!(llm.calls_for("validation_list").len(), 1);
        assert_eq!(quiz.total_questions(), 4);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_any_call() {
        let llm = scripted(0.875);
        let flow = QuizFlow::new(&Config::default(), llm.clone());

        let err = flow
            .run(QuizRequest::new(Vec::new(), 2, Difficulty::Easy))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Input(InputError::NoTopics)));
        assert!(llm.calls().is_empty());
    }
}
