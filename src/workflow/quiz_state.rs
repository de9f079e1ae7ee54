//! 流程状态
//!
//! 整个流程只有一份 `WorkState`，每个阶段返回一个 `StateUpdate`，
//! 由流程层合并进状态。阶段之间不直接共享数据。

use crate::models::{FeedbackItem, Question, Quiz, QuizPlan, QuizRequest, ValidationIssue};
use crate::services::{GenerationOutcome, ReviewOutcome, ValidationOutcome};

/// 贯穿所有阶段的工作状态
#[derive(Debug, Clone)]
pub struct WorkState {
    /// 已校验的用户请求
    pub request: QuizRequest,
    pub plan: Option<QuizPlan>,
    pub questions: Vec<Question>,
    /// 最近一次审核（或核查）给出的按 id 反馈
    pub feedback: Vec<FeedbackItem>,
    pub validation_issues: Vec<ValidationIssue>,
    pub needs_regeneration: bool,
    /// 已经回到出题阶段的次数
    pub attempt: u32,
    pub max_attempts: u32,
    pub average_score: Option<f64>,
    pub quiz: Option<Quiz>,
    /// 各阶段记录的非致命错误，只增不减
    pub errors: Vec<String>,
}

impl WorkState {
    pub fn new(request: QuizRequest) -> Self {
        let max_attempts = request.max_attempts;
        Self {
            request,
            plan: None,
            questions: Vec::new(),
            feedback: Vec::new(),
            validation_issues: Vec::new(),
            needs_regeneration: false,
            attempt: 0,
            max_attempts,
            average_score: None,
            quiz: None,
            errors: Vec::new(),
        }
    }

    /// 是否还能回到出题阶段
    pub fn has_budget(&self) -> bool {
        self.attempt < self.max_attempts
    }

    pub fn apply(&mut self, update: StateUpdate) {
        update.merge_into(self);
    }
}

/// 阶段对状态的部分更新
///
/// `None` 表示不修改；`errors` 总是追加
#[derive(Debug, Default)]
pub struct StateUpdate {
    pub plan: Option<QuizPlan>,
    pub questions: Option<Vec<Question>>,
    pub feedback: Option<Vec<FeedbackItem>>,
    pub validation_issues: Option<Vec<ValidationIssue>>,
    pub needs_regeneration: Option<bool>,
    pub attempt: Option<u32>,
    pub average_score: Option<f64>,
    pub quiz: Option<Quiz>,
    pub errors: Vec<String>,
}

impl StateUpdate {
    pub fn with_plan(plan: QuizPlan) -> Self {
        Self {
            plan: Some(plan),
            ..Self::default()
        }
    }

    pub fn with_quiz(quiz: Quiz) -> Self {
        Self {
            quiz: Some(quiz),
            ..Self::default()
        }
    }

    /// 回到出题阶段：重试次数加一，并带上下一轮出题要用的反馈
    pub fn retry(attempt: u32, feedback: Vec<FeedbackItem>) -> Self {
        Self {
            attempt: Some(attempt),
            feedback: Some(feedback),
            ..Self::default()
        }
    }

    fn merge_into(self, state: &mut WorkState) {
        if let Some(plan) = self.plan {
            state.plan = Some(plan);
        }
        if let Some(questions) = self.questions {
            state.questions = questions;
        }
        if let Some(feedback) = self.feedback {
            state.feedback = feedback;
        }
        if let Some(issues) = self.validation_issues {
            state.validation_issues = issues;
        }
        if let Some(needs) = self.needs_regeneration {
            state.needs_regeneration = needs;
        }
        if let Some(attempt) = self.attempt {
            state.attempt = attempt;
        }
        if let Some(score) = self.average_score {
            state.average_score = Some(score);
        }
        if let Some(quiz) = self.quiz {
            state.quiz = Some(quiz);
        }
        state.errors.extend(self.errors);
    }
}

impl From<GenerationOutcome> for StateUpdate {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            questions: Some(outcome.questions),
            needs_regeneration: Some(false),
            errors: outcome.errors,
            ..Self::default()
        }
    }
}

impl From<ReviewOutcome> for StateUpdate {
    fn from(outcome: ReviewOutcome) -> Self {
        Self {
            questions: Some(outcome.questions),
            feedback: Some(outcome.feedback),
            needs_regeneration: Some(outcome.needs_regeneration),
            average_score: Some(outcome.average_score),
            errors: outcome.errors,
            ..Self::default()
        }
    }
}

impl From<ValidationOutcome> for StateUpdate {
    fn from(outcome: ValidationOutcome) -> Self {
        Self {
            questions: Some(outcome.questions),
            validation_issues: Some(outcome.issues),
            errors: outcome.errors,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    fn state() -> WorkState {
        WorkState::new(QuizRequest::new(vec!["History".into()], 3, Difficulty::Easy).with_max_attempts(2))
    }

    #[test]
    fn test_new_state_takes_budget_from_request() {
        let state = state();
        assert_eq!(state.attempt, 0);
        assert_eq!(state.max_attempts, 2);
        assert!(state.has_budget());
    }

    #[test]
    fn test_errors_accumulate_across_updates() {
        let mut state = state();
        state.apply(StateUpdate {
            errors: vec!["first".into()],
            ..StateUpdate::default()
        });
        state.apply(StateUpdate {
            errors: vec!["second".into()],
            ..StateUpdate::default()
        });
        assert_eq!(state.errors, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_empty_update_changes_nothing() {
        let mut state = state();
        state.needs_regeneration = true;
        state.feedback = vec![FeedbackItem::general("keep me")];

        state.apply(StateUpdate::default());

        assert!(state.needs_regeneration);
        assert_eq!(state.feedback.len(), 1);
    }

    #[test]
    fn test_generation_resets_regeneration_flag() {
        let mut state = state();
        state.needs_regeneration = true;
        state.apply(GenerationOutcome::default().into());
        assert!(!state.needs_regeneration);
    }

    #[test]
    fn test_retry_update_sets_attempt_and_feedback() {
        let mut state = state();
        state.apply(StateUpdate::retry(1, vec![FeedbackItem::general("again")]));
        assert_eq!(state.attempt, 1);
        assert_eq!(state.feedback[0].issue, "again");

        state.apply(StateUpdate::retry(2, Vec::new()));
        assert!(!state.has_budget());
    }
}
