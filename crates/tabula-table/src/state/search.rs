/// Free-text search box.
///
/// `input` follows every keystroke; `term` is what the last settled debounce
/// committed and is the only value fetches read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    input: String,
    term: String,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Commit the current input; returns true when the term changed
    pub fn commit(&mut self) -> bool {
        if self.term == self.input {
            return false;
        }
        self.term = self.input.clone();
        true
    }

    /// Set input and term together, bypassing the debounce
    pub fn set_term(&mut self, term: impl Into<String>) -> bool {
        self.input = term.into();
        self.commit()
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.term.clear();
    }
}
