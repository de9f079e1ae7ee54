use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::QuestionError;

/// 题干最少字符数
pub const MIN_QUESTION_LEN: usize = 10;

/// 题目难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(QuestionError::InvalidDifficulty(s.to_string())),
        }
    }
}

/// 选项标签（只有 A-D 四个）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChoiceLabel {
    A,
    B,
    C,
    D,
}

impl ChoiceLabel {
    pub const ALL: [ChoiceLabel; 4] = [ChoiceLabel::A, ChoiceLabel::B, ChoiceLabel::C, ChoiceLabel::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChoiceLabel::A => "A",
            ChoiceLabel::B => "B",
            ChoiceLabel::C => "C",
            ChoiceLabel::D => "D",
        }
    }
}

impl fmt::Display for ChoiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChoiceLabel {
    type Err = QuestionError;

    /// 大小写不敏感
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(ChoiceLabel::A),
            "B" => Ok(ChoiceLabel::B),
            "C" => Ok(ChoiceLabel::C),
            "D" => Ok(ChoiceLabel::D),
            _ => Err(QuestionError::InvalidCorrectAnswer(s.to_string())),
        }
    }
}

/// 四个选项
///
/// 序列化为 `{"A": .., "B": .., "C": .., "D": ..}`，反序列化时同样校验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Choices {
    a: String,
    b: String,
    c: String,
    d: String,
}

impl Choices {
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
        c: impl Into<String>,
        d: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let choices = Self {
            a: a.into().trim().to_string(),
            b: b.into().trim().to_string(),
            c: c.into().trim().to_string(),
            d: d.into().trim().to_string(),
        };
        for (label, text) in choices.iter() {
            if text.is_empty() {
                return Err(QuestionError::EmptyOption(label.to_string()));
            }
        }
        Ok(choices)
    }

    pub fn get(&self, label: ChoiceLabel) -> &str {
        match label {
            ChoiceLabel::A => &self.a,
            ChoiceLabel::B => &self.b,
            ChoiceLabel::C => &self.c,
            ChoiceLabel::D => &self.d,
        }
    }

    /// 按 A-D 顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (ChoiceLabel, &str)> {
        ChoiceLabel::ALL.into_iter().map(move |label| (label, self.get(label)))
    }
}

impl TryFrom<BTreeMap<String, String>> for Choices {
    type Error = QuestionError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let original_len = map.len();
        let normalized: BTreeMap<String, String> = map
            .into_iter()
            .map(|(k, v)| (k.trim().to_uppercase(), v))
            .collect();

        let keys: Vec<String> = normalized.keys().cloned().collect();
        // "a" 与 "A" 同时出现时大小写归一会吞掉一个选项
        if keys != ["A", "B", "C", "D"] || original_len != normalized.len() {
            return Err(QuestionError::InvalidOptionLabels(keys));
        }

        let mut values = normalized.into_values();
        // 上面已确认恰好四个键
        match (values.next(), values.next(), values.next(), values.next()) {
            (Some(a), Some(b), Some(c), Some(d)) => Choices::new(a, b, c, d),
            _ => Err(QuestionError::InvalidOptionLabels(keys)),
        }
    }
}

impl From<Choices> for BTreeMap<String, String> {
    fn from(choices: Choices) -> Self {
        choices
            .iter()
            .map(|(label, text)| (label.to_string(), text.to_string()))
            .collect()
    }
}

/// 一道四选一题目
///
/// 反序列化时与 `Question::new` 做同样的校验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct Question {
    /// 唯一标识（出题时生成，重试时据此匹配反馈）
    pub id: String,
    pub question_text: String,
    pub options: Choices,
    pub correct_answer: ChoiceLabel,
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// 反序列化的原始形态，经 `TryFrom` 校验后才成为 `Question`
#[derive(Deserialize)]
struct QuestionRecord {
    id: String,
    question_text: String,
    options: Choices,
    correct_answer: ChoiceLabel,
    topic: String,
    #[serde(default)]
    difficulty: Difficulty,
    explanation: Option<String>,
    quality_score: Option<f64>,
    feedback: Option<String>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let mut question = Question::new(
            record.question_text,
            record.options,
            record.correct_answer,
            record.topic,
            record.difficulty,
        )?
        .with_explanation(record.explanation);
        question.id = record.id;
        if let Some(score) = record.quality_score {
            question.set_quality_score(score)?;
        }
        question.feedback = record.feedback;
        Ok(question)
    }
}

impl Question {
    /// 创建新题目，分配新的 id
    pub fn new(
        question_text: impl Into<String>,
        options: Choices,
        correct_answer: ChoiceLabel,
        topic: impl Into<String>,
        difficulty: Difficulty,
    ) -> Result<Self, QuestionError> {
        let question_text = question_text.into().trim().to_string();
        let actual = question_text.chars().count();
        if actual < MIN_QUESTION_LEN {
            return Err(QuestionError::TextTooShort {
                min: MIN_QUESTION_LEN,
                actual,
            });
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            question_text,
            options,
            correct_answer,
            topic: topic.into(),
            difficulty,
            explanation: None,
            quality_score: None,
            feedback: None,
        })
    }

    pub fn with_explanation(mut self, explanation: Option<String>) -> Self {
        self.explanation = explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }

    /// 设置质量分，必须位于 [0, 1]
    pub fn set_quality_score(&mut self, score: f64) -> Result<(), QuestionError> {
        if !(0.0..=1.0).contains(&score) {
            return Err(QuestionError::ScoreOutOfRange(score));
        }
        self.quality_score = Some(score);
        Ok(())
    }

    /// 正确选项的文本
    pub fn correct_text(&self) -> &str {
        self.options.get(self.correct_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_choices() -> Choices {
        Choices::new("London", "Paris", "Berlin", "Madrid").unwrap()
    }

    #[test]
    fn test_question_new_assigns_unique_ids() {
        let q1 = Question::new("What is the capital of France?", sample_choices(), ChoiceLabel::B, "Geography", Difficulty::Easy).unwrap();
        let q2 = Question::new("What is the capital of France?", sample_choices(), ChoiceLabel::B, "Geography", Difficulty::Easy).unwrap();
        assert_ne!(q1.id, q2.id);
        assert_eq!(q1.correct_text(), "Paris");
    }

    #[test]
    fn test_question_rejects_short_text() {
        let err = Question::new("Why?", sample_choices(), ChoiceLabel::A, "General", Difficulty::Medium).unwrap_err();
        assert_eq!(err, QuestionError::TextTooShort { min: MIN_QUESTION_LEN, actual: 4 });
    }

    #[test]
    fn test_choices_reject_empty_option() {
        let err = Choices::new("London", "  ", "Berlin", "Madrid").unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption("B".to_string()));
    }

    #[test]
    fn test_choices_from_map_requires_exact_labels() {
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), "1".to_string());
        map.insert("B".to_string(), "2".to_string());
        map.insert("C".to_string(), "3".to_string());
        assert!(matches!(Choices::try_from(map.clone()), Err(QuestionError::InvalidOptionLabels(_))));

        map.insert("E".to_string(), "5".to_string());
        assert!(Choices::try_from(map.clone()).is_err());

        map.remove("E");
        map.insert("d".to_string(), "4".to_string());
        let choices = Choices::try_from(map).unwrap();
        let labels: Vec<ChoiceLabel> = choices.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ChoiceLabel::ALL.to_vec());
        assert_eq!(choices.get(ChoiceLabel::D), "4");
    }

    #[test]
    fn test_choices_reject_labels_colliding_after_case_folding() {
        let map: BTreeMap<String, String> = [("a", "1"), ("A", "2"), ("B", "3"), ("C", "4"), ("D", "5")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(matches!(Choices::try_from(map), Err(QuestionError::InvalidOptionLabels(_))));
    }

    #[test]
    fn test_question_deserialize_validates() {
        let q = Question::new("What is the capital of France?", sample_choices(), ChoiceLabel::B, "Geography", Difficulty::Easy).unwrap();
        let mut value = serde_json::to_value(&q).unwrap();
        let restored: Question = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(restored, q);

        value["question_text"] = serde_json::json!("Why?");
        assert!(serde_json::from_value::<Question>(value.clone()).is_err());

        value["question_text"] = serde_json::json!("What is the capital of France?");
        value["quality_score"] = serde_json::json!(1.5);
        assert!(serde_json::from_value::<Question>(value).is_err());
    }

    #[test]
    fn test_choices_deserialize_validates() {
        let bad = r#"{"A":"1","B":"2","C":"3","X":"4"}"#;
        assert!(serde_json::from_str::<Choices>(bad).is_err());

        let good = r#"{"A":"1","B":"2","C":"3","D":"4"}"#;
        let choices: Choices = serde_json::from_str(good).unwrap();
        assert_eq!(serde_json::to_string(&choices).unwrap(), good);
    }

    #[test]
    fn test_choice_label_parse_is_case_insensitive() {
        assert_eq!("b".parse::<ChoiceLabel>().unwrap(), ChoiceLabel::B);
        assert!("E".parse::<ChoiceLabel>().is_err());
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(" Hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_set_quality_score_range() {
        let mut q = Question::new("What is the capital of France?", sample_choices(), ChoiceLabel::B, "Geography", Difficulty::Easy).unwrap();
        assert!(q.set_quality_score(0.85).is_ok());
        assert_eq!(q.quality_score, Some(0.85));
        assert!(q.set_quality_score(1.2).is_err());
        assert_eq!(q.quality_score, Some(0.85));
    }
}
