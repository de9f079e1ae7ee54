use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::question::{Difficulty, Question};
use crate::models::request::same_topic;

/// 一轮题目（同一主题）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRound {
    pub round_name: String,
    pub round_number: u32,
    pub topic: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuizRound {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// 生成过程的元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizMetadata {
    pub created_at: DateTime<Local>,
    pub model_used: String,
    /// 回到出题阶段的次数
    pub regeneration_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time_seconds: Option<f64>,
}

/// 最终测验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    pub description: String,
    pub rounds: Vec<QuizRound>,
    pub metadata: QuizMetadata,
}

impl Quiz {
    pub fn total_questions(&self) -> usize {
        self.rounds.iter().map(QuizRound::question_count).sum()
    }

    pub fn total_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn questions_by_difficulty(&self, difficulty: Difficulty) -> Vec<&Question> {
        self.rounds
            .iter()
            .flat_map(|r| r.questions.iter())
            .filter(|q| q.difficulty == difficulty)
            .collect()
    }

    /// 主题匹配不区分大小写
    pub fn questions_by_topic(&self, topic: &str) -> Vec<&Question> {
        self.rounds
            .iter()
            .filter(|r| same_topic(&r.topic, topic))
            .flat_map(|r| r.questions.iter())
            .collect()
    }
}
