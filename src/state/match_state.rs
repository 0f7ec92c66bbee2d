use crate::state::question::Question;

/// Live-round state of a session.
#[derive(Debug, Clone, Default)]
pub struct Match {
    /// Normalised topic the questions were provisioned for.
    pub topic: String,
    /// Questions in play order.
    pub questions: Vec<Question>,
    /// Index of the round currently played (or about to be played).
    pub round_index: usize,
    /// Whether the current round's question is out and answers are accepted.
    pub accepting_answers: bool,
}

impl Match {
    /// Start a fresh match over `questions` at the first round.
    pub fn new(topic: String, questions: Vec<Question>) -> Self {
        Self {
            topic,
            questions,
            round_index: 0,
            accepting_answers: false,
        }
    }

    /// Number of rounds in the match.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Question for the current round, if any remains.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.round_index)
    }

    /// Mutable access to the question of the current round.
    pub fn current_question_mut(&mut self) -> Option<&mut Question> {
        self.questions.get_mut(self.round_index)
    }

    /// Whether a round is left to play at the current index.
    pub fn has_next_round(&self) -> bool {
        self.round_index < self.questions.len()
    }

    /// Close the current round and move to the following one, never passing the question count.
    pub fn advance(&mut self) {
        self.accepting_answers = false;
        if self.has_next_round() {
            self.round_index += 1;
        }
    }

    /// Keep only the first `desired` questions.
    pub fn truncate(&mut self, desired: usize) {
        self.questions.truncate(desired);
    }

    /// Overwrite every question's time budget.
    pub fn retime(&mut self, timer_secs: u32) {
        for question in &mut self.questions {
            question.time_limit_secs = timer_secs;
        }
    }
}
