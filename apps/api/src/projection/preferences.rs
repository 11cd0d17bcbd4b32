//! Preference questionnaire: the fixed questions asked one step at a time
//! before a revision.

use serde::{Deserialize, Serialize};

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Text,
    YesNo,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PreferenceQuestion {
    pub key: &'static str,
    pub prompt: &'static str,
    pub kind: AnswerKind,
}

pub const PREFERENCE_QUESTIONS: &[PreferenceQuestion] = &[
    PreferenceQuestion {
        key: "pet",
        prompt: "Do you have a pet? If yes, what kind?",
        kind: AnswerKind::Text,
    },
    PreferenceQuestion {
        key: "subject",
        prompt: "What is your favorite subject?",
        kind: AnswerKind::Text,
    },
    PreferenceQuestion {
        key: "goal",
        prompt: "What is your main goal in life?",
        kind: AnswerKind::Text,
    },
    PreferenceQuestion {
        key: "like_money",
        prompt: "Do you like money?",
        kind: AnswerKind::YesNo,
    },
    PreferenceQuestion {
        key: "hobbies",
        prompt: "Do you have any hobbies? If so, what kind?",
        kind: AnswerKind::Text,
    },
    PreferenceQuestion {
        key: "like_cars",
        prompt: "Do you like cars?",
        kind: AnswerKind::YesNo,
    },
    PreferenceQuestion {
        key: "admire_singer",
        prompt: "Do you admire any singer? If yes, who?",
        kind: AnswerKind::Text,
    },
];

/// The question asked at `step`. Step 0 means the questionnaire has not started;
/// steps past the last question have no question.
pub fn question_for_step(step: usize) -> Option<&'static PreferenceQuestion> {
    step.checked_sub(1).and_then(|i| PREFERENCE_QUESTIONS.get(i))
}

/// A submitted answer. Untagged so clients can send `"a cat"` or `true`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PreferenceAnswer {
    YesNo(bool),
    Text(String),
}

impl PreferenceAnswer {
    /// Checks the answer against the question's kind and renders it for the prompt.
    pub fn render_for(&self, question: &PreferenceQuestion) -> Result<String, String> {
        match (question.kind, self) {
            (AnswerKind::YesNo, PreferenceAnswer::YesNo(true)) => Ok("Yes".to_string()),
            (AnswerKind::YesNo, PreferenceAnswer::YesNo(false)) => Ok("No".to_string()),
            (AnswerKind::Text, PreferenceAnswer::Text(text)) => Ok(text.trim().to_string()),
            (AnswerKind::YesNo, PreferenceAnswer::Text(_)) => Err(format!(
                "'{}' expects a yes/no answer",
                question.prompt
            )),
            (AnswerKind::Text, PreferenceAnswer::YesNo(_)) => {
                Err(format!("'{}' expects a text answer", question.prompt))
            }
        }
    }
}

/// One entry of the cumulative preference log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceResponse {
    pub question: String,
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_zero_has_no_question() {
        assert!(question_for_step(0).is_none());
    }

    #[test]
    fn test_steps_map_to_questions_in_order() {
        assert_eq!(question_for_step(1).unwrap().key, "pet");
        assert_eq!(question_for_step(4).unwrap().kind, AnswerKind::YesNo);
        assert_eq!(question_for_step(7).unwrap().key, "admire_singer");
        assert!(question_for_step(8).is_none());
    }

    #[test]
    fn test_answer_deserializes_untagged() {
        let yes: PreferenceAnswer = serde_json::from_str("true").unwrap();
        assert_eq!(yes, PreferenceAnswer::YesNo(true));
        let text: PreferenceAnswer = serde_json::from_str(r#""a cat""#).unwrap();
        assert_eq!(text, PreferenceAnswer::Text("a cat".to_string()));
    }

    #[test]
    fn test_render_checks_kind() {
        let money = question_for_step(4).unwrap();
        assert_eq!(
            PreferenceAnswer::YesNo(true).render_for(money).unwrap(),
            "Yes"
        );
        assert!(PreferenceAnswer::Text("sure".into())
            .render_for(money)
            .is_err());

        let pet = question_for_step(1).unwrap();
        assert_eq!(
            PreferenceAnswer::Text("  a dog ".into()).render_for(pet).unwrap(),
            "a dog"
        );
        assert!(PreferenceAnswer::YesNo(false).render_for(pet).is_err());
    }
}
