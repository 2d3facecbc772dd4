/// Number of leading characters of the previous final text that a same-turn
/// result must repeat to count as a refinement. Heuristic, not a contract.
const REFINEMENT_PREFIX_CHARS: usize = 10;

/// Turn order before any final result has been seen
const NO_TURN: i64 = -1;

/// Merges interim and final recognition results into a running transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptReconciler {
    accumulated: String,
    last: String,
    current_turn_order: i64,
    interim: String,
}

impl Default for TranscriptReconciler {
    fn default() -> Self {
        Self {
            accumulated: String::new(),
            last: String::new(),
            current_turn_order: NO_TURN,
            interim: String::new(),
        }
    }
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the interim text and return the new display text
    pub fn apply_interim(&mut self, text: &str) -> String {
        self.interim = text.to_string();
        self.display_text()
    }

    /// Fold a final result into the transcript and return the new display text
    pub fn apply_final(&mut self, text: &str, turn_order: Option<i64>) -> String {
        let turn_order = turn_order.unwrap_or(0);

        self.interim.clear();

        if turn_order > self.current_turn_order {
            // New turn: the previous turn's text is complete
            if !self.last.is_empty() {
                let last = std::mem::take(&mut self.last);
                push_joined(&mut self.accumulated, &last);
            }
            self.current_turn_order = turn_order;
            self.last = text.to_string();
        } else if is_refinement(&self.last, text) {
            self.last = text.to_string();
        } else {
            push_joined(&mut self.last, text);
        }

        join_non_empty(&[&self.accumulated, &self.last])
    }

    /// Accumulated and current-turn final text, without interim
    pub fn finalized_text(&self) -> String {
        join_non_empty(&[&self.accumulated, &self.last])
    }

    /// Everything the host should currently display
    pub fn display_text(&self) -> String {
        join_non_empty(&[&self.accumulated, &self.last, &self.interim])
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn last(&self) -> &str {
        &self.last
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn current_turn_order(&self) -> i64 {
        self.current_turn_order
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A longer result that repeats the opening of the previous final text
fn is_refinement(last: &str, text: &str) -> bool {
    if text.chars().count() <= last.chars().count() {
        return false;
    }
    let prefix: String = last.chars().take(REFINEMENT_PREFIX_CHARS).collect();
    text.starts_with(&prefix)
}

fn push_joined(target: &mut String, text: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
