use uuid::Uuid;

use crate::types::{AnswerMap, AnswerValue, Question};

/// Required-field check shared by the per-step gate and the final submit
/// pass.
pub fn required_violation(question: &Question, answers: &AnswerMap) -> bool {
    question.required
        && answers
            .get(&question.id)
            .map_or(true, AnswerValue::is_empty)
}

/// Index of the first question whose required constraint is unsatisfied.
pub fn first_missing_required(questions: &[Question], answers: &AnswerMap) -> Option<usize> {
    questions
        .iter()
        .position(|question| required_violation(question, answers))
}

pub fn missing_required(questions: &[Question], answers: &AnswerMap) -> Vec<Uuid> {
    questions
        .iter()
        .filter(|question| required_violation(question, answers))
        .map(|question| question.id)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStep {
    AtQuestion(usize),
    Submitted,
}

#[derive(Debug, PartialEq)]
pub enum AdvanceOutcome {
    /// Now showing the question at this index.
    Moved(usize),
    /// The question at this index failed its required check; stay (or jump
    /// back) there.
    Rejected(usize),
    /// All questions passed; the full answer map is emitted.
    Submitted(AnswerMap),
}

/// Paged survey form: one question at a time, forward movement gated on the
/// current question's required constraint, the final step validating the
/// whole form again before emitting the answers.
pub struct ResponseCollector<'a> {
    questions: &'a [Question],
    answers: AnswerMap,
    current: usize,
    submitted: bool,
}

impl<'a> ResponseCollector<'a> {
    pub fn new(questions: &'a [Question]) -> Self {
        Self {
            questions,
            answers: AnswerMap::new(),
            current: 0,
            submitted: false,
        }
    }

    pub fn step(&self) -> CollectorStep {
        if self.submitted {
            CollectorStep::Submitted
        } else {
            CollectorStep::AtQuestion(self.current)
        }
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn record_answer(&mut self, question_id: Uuid, value: AnswerValue) {
        self.answers.insert(question_id, value);
    }

    /// Move to the next question if the current one passes its required
    /// check; advancing past the last question submits the whole form.
    pub fn advance(&mut self) -> AdvanceOutcome {
        if self.questions.is_empty() {
            return match self.submit() {
                Ok(answers) => AdvanceOutcome::Submitted(answers),
                Err(index) => AdvanceOutcome::Rejected(index),
            };
        }

        let current = &self.questions[self.current];
        if required_violation(current, &self.answers) {
            return AdvanceOutcome::Rejected(self.current);
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            return AdvanceOutcome::Moved(self.current);
        }

        match self.submit() {
            Ok(answers) => AdvanceOutcome::Submitted(answers),
            Err(index) => AdvanceOutcome::Rejected(index),
        }
    }

    /// Always allowed except at the first question.
    pub fn go_back(&mut self) -> usize {
        if self.current > 0 {
            self.current -= 1;
        }
        self.current
    }

    /// Authoritative validation over every question, not just the current
    /// one. On failure the collector jumps to the first invalid question and
    /// returns its index.
    pub fn submit(&mut self) -> Result<AnswerMap, usize> {
        if let Some(first_invalid) = first_missing_required(self.questions, &self.answers) {
            self.current = first_invalid;
            return Err(first_invalid);
        }
        self.submitted = true;
        Ok(self.answers.clone())
    }
}
