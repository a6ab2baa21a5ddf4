/// Aggregated view of exam progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub remaining_secs: u32,
    pub near_expiry: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn is_fully_answered(&self) -> bool {
        self.total > 0 && self.unanswered == 0
    }
}
