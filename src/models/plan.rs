use serde::{Deserialize, Serialize};

use crate::models::question::Difficulty;
use crate::models::request::QuizRequest;

pub const DEFAULT_QUIZ_TITLE: &str = "General Knowledge Quiz";
pub const DEFAULT_QUIZ_DESCRIPTION: &str = "A challenging quiz covering various topics";

/// 单轮规划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSpec {
    /// 从 1 开始
    pub round_number: u32,
    pub round_name: String,
    pub topic: String,
    pub question_count: u32,
    pub difficulty: Difficulty,
}

impl RoundSpec {
    pub fn default_name(round_number: u32, topic: &str) -> String {
        format!("Round {}: {}", round_number, topic)
    }
}

/// 测验规划：每个主题一轮
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizPlan {
    pub title: String,
    pub description: String,
    pub rounds: Vec<RoundSpec>,
}

impl QuizPlan {
    /// 确定性的兜底规划：按用户给出的主题顺序，每个主题一轮
    pub fn fallback(request: &QuizRequest) -> Self {
        Self {
            title: request
                .quiz_title
                .clone()
                .unwrap_or_else(|| DEFAULT_QUIZ_TITLE.to_string()),
            description: request
                .quiz_description
                .clone()
                .unwrap_or_else(|| DEFAULT_QUIZ_DESCRIPTION.to_string()),
            rounds: Self::fallback_rounds(request),
        }
    }

    pub fn fallback_rounds(request: &QuizRequest) -> Vec<RoundSpec> {
        request
            .topics
            .iter()
            .enumerate()
            .map(|(i, topic)| {
                let round_number = i as u32 + 1;
                RoundSpec {
                    round_number,
                    round_name: RoundSpec::default_name(round_number, topic),
                    topic: topic.clone(),
                    question_count: request.questions_per_round,
                    difficulty: request.difficulty,
                }
            })
            .collect()
    }

    pub fn total_questions(&self) -> u32 {
        self.rounds.iter().map(|r| r.question_count).sum()
    }

    pub fn round_for_topic(&self, topic: &str) -> Option<&RoundSpec> {
        self.rounds.iter().find(|r| r.topic == topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_one_round_per_topic_in_order() {
        let request = QuizRequest::new(
            vec!["History".into(), "Science".into(), "Art".into()],
            7,
            Difficulty::Hard,
        );
        let plan = QuizPlan::fallback(&request);

        assert_eq!(plan.title, DEFAULT_QUIZ_TITLE);
        assert_eq!(plan.description, DEFAULT_QUIZ_DESCRIPTION);
        assert_eq!(plan.rounds.len(), 3);
        for (i, round) in plan.rounds.iter().enumerate() {
            assert_eq!(round.round_number, i as u32 + 1);
            assert_eq!(round.topic, request.topics[i]);
            assert_eq!(round.question_count, 7);
            assert_eq!(round.difficulty, Difficulty::Hard);
        }
        assert_eq!(plan.rounds[1].round_name, "Round 2: Science");
        assert_eq!(plan.total_questions(), 21);
    }

    #[test]
    fn test_fallback_uses_custom_title() {
        let request = QuizRequest::new(vec!["Test".into()], 10, Difficulty::Easy)
            .with_title("Custom Title")
            .with_description("Custom description");
        let plan = QuizPlan::fallback(&request);
        assert_eq!(plan.title, "Custom Title");
        assert_eq!(plan.description, "Custom description");
    }
}
