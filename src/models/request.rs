use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::models::question::Difficulty;

pub const MIN_QUESTIONS_PER_ROUND: u32 = 1;
pub const MAX_QUESTIONS_PER_ROUND: u32 = 50;
pub const MAX_ATTEMPTS_CEILING: u32 = 10;

/// 主题比较规则：去除首尾空白后不区分大小写
pub fn same_topic(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn default_questions_per_round() -> u32 {
    10
}

fn default_quality_threshold() -> f64 {
    0.7
}

fn default_max_attempts() -> u32 {
    3
}

/// 用户的出题请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub topics: Vec<String>,
    #[serde(default = "default_questions_per_round")]
    pub questions_per_round: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_description: Option<String>,
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    /// 允许回到出题阶段的最大次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl QuizRequest {
    pub fn new(topics: Vec<String>, questions_per_round: u32, difficulty: Difficulty) -> Self {
        Self {
            topics,
            questions_per_round,
            difficulty,
            quiz_title: None,
            quiz_description: None,
            quality_threshold: default_quality_threshold(),
            max_attempts: default_max_attempts(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.quiz_title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.quiz_description = Some(description.into());
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// 校验并清理请求
    ///
    /// 主题去除首尾空白、丢弃空主题并按首次出现去重（不区分大小写）
    pub fn validated(mut self) -> Result<Self, InputError> {
        let mut topics: Vec<String> = Vec::with_capacity(self.topics.len());
        for topic in &self.topics {
            let topic = topic.trim();
            if !topic.is_empty() && !topics.iter().any(|t| same_topic(t, topic)) {
                topics.push(topic.to_string());
            }
        }
        if topics.is_empty() {
            return Err(InputError::NoTopics);
        }
        self.topics = topics;

        if !(MIN_QUESTIONS_PER_ROUND..=MAX_QUESTIONS_PER_ROUND).contains(&self.questions_per_round) {
            return Err(InputError::QuestionsPerRoundOutOfRange(self.questions_per_round));
        }
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(InputError::ThresholdOutOfRange(self.quality_threshold));
        }
        if self.max_attempts > MAX_ATTEMPTS_CEILING {
            return Err(InputError::MaxAttemptsOutOfRange(self.max_attempts));
        }

        self.quiz_title = self.quiz_title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        self.quiz_description = self
            .quiz_description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validated_cleans_topics() {
        let request = QuizRequest::new(topics(&[" History ", "", "Science", "History"]), 5, Difficulty::Easy)
            .validated()
            .unwrap();
        assert_eq!(request.topics, topics(&["History", "Science"]));
    }

    #[test]
    fn test_validated_dedupes_topics_ignoring_case() {
        let request = QuizRequest::new(topics(&["History", "history", " HISTORY "]), 5, Difficulty::Easy)
            .validated()
            .unwrap();
        assert_eq!(request.topics, topics(&["History"]));
        assert!(same_topic("  Science", "science "));
        assert!(!same_topic("Science", "Sciences"));
    }

    #[test]
    fn test_validated_rejects_no_topics() {
        let err = QuizRequest::new(topics(&["  ", ""]), 5, Difficulty::Easy).validated().unwrap_err();
        assert_eq!(err, InputError::NoTopics);
    }

    #[test]
    fn test_validated_rejects_count_out_of_range() {
        let err = QuizRequest::new(topics(&["History"]), 0, Difficulty::Easy).validated().unwrap_err();
        assert_eq!(err, InputError::QuestionsPerRoundOutOfRange(0));

        let err = QuizRequest::new(topics(&["History"]), 51, Difficulty::Easy).validated().unwrap_err();
        assert_eq!(err, InputError::QuestionsPerRoundOutOfRange(51));
    }

    #[test]
    fn test_validated_rejects_bad_threshold_and_ceiling() {
        let err = QuizRequest::new(topics(&["History"]), 5, Difficulty::Easy)
            .with_quality_threshold(1.1)
            .validated()
            .unwrap_err();
        assert_eq!(err, InputError::ThresholdOutOfRange(1.1));

        let err = QuizRequest::new(topics(&["History"]), 5, Difficulty::Easy)
            .with_max_attempts(11)
            .validated()
            .unwrap_err();
        assert_eq!(err, InputError::MaxAttemptsOutOfRange(11));
    }

    #[test]
    fn test_validated_drops_blank_title() {
        let request = QuizRequest::new(topics(&["History"]), 5, Difficulty::Easy)
            .with_title("   ")
            .validated()
            .unwrap();
        assert_eq!(request.quiz_title, None);
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let request: QuizRequest = toml::from_str(r#"topics = ["Music"]"#).unwrap();
        assert_eq!(request.questions_per_round, 10);
        assert_eq!(request.difficulty, Difficulty::Medium);
        assert_eq!(request.max_attempts, 3);
        assert!((request.quality_threshold - 0.7).abs() < f64::EPSILON);
    }
}
