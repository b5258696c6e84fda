use crate::types::{AnswerMap, AnswerValue, Question, QuestionType};

/// Outcome of scoring one submission. `average` is 0 when the survey has no
/// rating questions; `rating_count` carries the distinction between "scored
/// zero" and "nothing to score" to the review-prompt decision and the
/// persisted (nullable) score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingScore {
    pub average: f64,
    pub rating_count: usize,
}

impl RatingScore {
    /// The value stored on the response: null when there was nothing to
    /// score.
    pub fn persisted(&self) -> Option<f64> {
        (self.rating_count > 0).then_some(self.average)
    }
}

/// Averages the answers to rating-type questions. Missing answers for
/// required rating questions are prevented upstream by the collector;
/// unanswered optional ratings simply don't contribute.
pub fn score_response(questions: &[Question], answers: &AnswerMap) -> RatingScore {
    let mut total = 0.0;
    let mut rating_count = 0;

    for question in questions {
        if question.question_type != QuestionType::Rating {
            continue;
        }
        if let Some(value) = answers.get(&question.id).and_then(AnswerValue::as_number) {
            total += value;
            rating_count += 1;
        }
    }

    if rating_count == 0 {
        return RatingScore {
            average: 0.0,
            rating_count: 0,
        };
    }

    RatingScore {
        average: total / rating_count as f64,
        rating_count,
    }
}
