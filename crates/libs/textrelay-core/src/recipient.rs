use crate::address::AddressPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const EMPTY_RECIPIENT: &str = "cannot be empty";
pub const INVALID_RECIPIENT: &str = "invalid recipient";
pub const DUPLICATE_RECIPIENT: &str = "duplicate recipient";
pub const EMPTY_MESSAGE: &str = "message cannot be empty";

/// One row of the recipient list.
///
/// Entries are only ever changed through [`RecipientSet`], which keeps the
/// validity and duplicate flags in step with the whole list.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientEntry {
    raw_input: String,
    normalized_address: String,
    is_valid: bool,
    is_duplicate: bool,
    validation_message: String,
}

impl RecipientEntry {
    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn normalized_address(&self) -> &str {
        &self.normalized_address
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn is_duplicate(&self) -> bool {
        self.is_duplicate
    }

    pub fn validation_message(&self) -> &str {
        &self.validation_message
    }

    pub fn is_blank(&self) -> bool {
        self.normalized_address.trim().is_empty()
    }

    /// Valid, non-blank and unique.
    pub fn is_dispatchable(&self) -> bool {
        self.is_valid && !self.is_blank() && !self.is_duplicate
    }
}

#[derive(Debug, Clone)]
pub struct RecipientSet {
    policy: Arc<dyn AddressPolicy>,
    entries: Vec<RecipientEntry>,
}

impl RecipientSet {
    /// A list holding a single empty entry.
    pub fn new(policy: Arc<dyn AddressPolicy>) -> Self {
        let mut set = Self { policy, entries: Vec::new() };
        set.reset();
        set
    }

    pub fn entries(&self) -> &[RecipientEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&RecipientEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn policy(&self) -> &Arc<dyn AddressPolicy> {
        &self.policy
    }

    pub fn add(&mut self) {
        self.entries.push(RecipientEntry::default());
        self.revalidate();
    }

    pub fn update(&mut self, index: usize, raw_input: &str) {
        self.check_index(index);
        let normalized = self.policy.normalize(raw_input);
        let entry = &mut self.entries[index];
        entry.raw_input = raw_input.to_owned();
        entry.normalized_address = normalized;
        self.revalidate();
    }

    /// Rewrites the displayed input in the policy's display format.
    ///
    /// The normalized address, and therefore validity, is left alone.
    pub fn format(&mut self, index: usize) {
        self.check_index(index);
        let entry = &mut self.entries[index];
        if let Some(formatted) = self.policy.format(&entry.normalized_address) {
            entry.raw_input = formatted;
        }
    }

    pub fn remove(&mut self, index: usize) {
        self.check_index(index);
        self.entries.remove(index);
        self.revalidate();
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.add();
    }

    /// `None` when the body may be sent, otherwise the problem with it.
    pub fn message_issue(message: &str) -> Option<&'static str> {
        message.trim().is_empty().then_some(EMPTY_MESSAGE)
    }

    /// The confirmation predicate: a non-empty list of dispatchable entries and a non-blank body.
    pub fn is_ready(&self, message: &str) -> bool {
        Self::message_issue(message).is_none()
            && !self.entries.is_empty()
            && self.entries.iter().all(RecipientEntry::is_dispatchable)
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.entries.len(),
            "recipient index {index} out of range for list of {}",
            self.entries.len()
        );
    }

    fn revalidate(&mut self) {
        let addresses: Vec<String> =
            self.entries.iter().map(|entry| entry.normalized_address.clone()).collect();

        for entry in &mut self.entries {
            let address = entry.normalized_address.as_str();
            let occurrences = if address.is_empty() {
                0
            } else {
                addresses
                    .iter()
                    .filter(|other| !other.is_empty() && self.policy.same_address(address, other))
                    .count()
            };

            entry.is_duplicate = occurrences > 1;
            if entry.raw_input.trim().is_empty() {
                entry.is_valid = false;
                entry.validation_message = EMPTY_RECIPIENT.to_owned();
            } else if !self.policy.is_well_formed(address) {
                entry.is_valid = false;
                entry.validation_message = INVALID_RECIPIENT.to_owned();
            } else {
                entry.is_valid = true;
                entry.validation_message = if entry.is_duplicate {
                    DUPLICATE_RECIPIENT.to_owned()
                } else {
                    String::new()
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{ExactMatchPolicy, NanpPolicy};

    fn nanp_set(inputs: &[&str]) -> RecipientSet {
        let mut set = RecipientSet::new(Arc::new(NanpPolicy));
        for (index, input) in inputs.iter().enumerate() {
            if index > 0 {
                set.add();
            }
            set.update(index, input);
        }
        set
    }

    #[test]
    fn new_set_holds_one_empty_invalid_entry() {
        let set = RecipientSet::new(Arc::new(NanpPolicy));
        assert_eq!(set.len(), 1);
        let entry = &set.entries()[0];
        assert!(!entry.is_valid());
        assert!(!entry.is_duplicate());
        assert_eq!(entry.validation_message(), EMPTY_RECIPIENT);
    }

    #[test]
    fn update_filters_input_and_validates() {
        let set = nanp_set(&["(555) 123-4567"]);
        let entry = &set.entries()[0];
        assert_eq!(entry.raw_input(), "(555) 123-4567");
        assert_eq!(entry.normalized_address(), "5551234567");
        assert!(entry.is_valid());
        assert_eq!(entry.validation_message(), "");
    }

    #[test]
    fn letters_only_input_is_invalid_not_empty() {
        let set = nanp_set(&["bob"]);
        let entry = &set.entries()[0];
        assert!(!entry.is_valid());
        assert_eq!(entry.validation_message(), INVALID_RECIPIENT);
    }

    #[test]
    fn equal_numbers_are_both_flagged_duplicate() {
        let set = nanp_set(&["5551234567", "5551234567"]);
        for entry in set.entries() {
            assert!(entry.is_valid());
            assert!(entry.is_duplicate());
            assert_eq!(entry.validation_message(), DUPLICATE_RECIPIENT);
        }
        assert!(!set.is_ready("hi"));
    }

    #[test]
    fn region_aware_equality_catches_country_code_duplicates() {
        let set = nanp_set(&["+1 555 123 4567", "555-123-4567"]);
        assert!(set.entries().iter().all(RecipientEntry::is_duplicate));

        let mut exact = RecipientSet::new(Arc::new(ExactMatchPolicy));
        exact.update(0, "15551234567");
        exact.add();
        exact.update(1, "5551234567");
        assert!(exact.entries().iter().all(|entry| !entry.is_duplicate()));
    }

    #[test]
    fn removing_a_duplicate_clears_the_survivor() {
        let mut set = nanp_set(&["5551234567", "5551234567"]);
        set.remove(0);
        assert_eq!(set.len(), 1);
        assert!(!set.entries()[0].is_duplicate());
        assert!(set.is_ready("hi"));
    }

    #[test]
    fn format_changes_display_only() {
        let mut set = nanp_set(&["5551234567"]);
        let before = set.entries()[0].clone();
        set.format(0);
        let after = &set.entries()[0];
        assert_eq!(after.raw_input(), "(555) 123-4567");
        assert_eq!(after.normalized_address(), before.normalized_address());
        assert_eq!(after.is_valid(), before.is_valid());
    }

    #[test]
    fn readiness_needs_a_message_body() {
        let set = nanp_set(&["5551234567"]);
        assert!(!set.is_ready("   "));
        assert_eq!(RecipientSet::message_issue(""), Some(EMPTY_MESSAGE));
        assert!(set.is_ready("hi"));
    }

    #[test]
    fn reset_leaves_single_empty_entry() {
        let mut set = nanp_set(&["5551234567", "5559876543"]);
        set.reset();
        assert_eq!(set.len(), 1);
        assert!(set.entries()[0].is_blank());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_index_is_a_programming_error() {
        let mut set = RecipientSet::new(Arc::new(NanpPolicy));
        set.remove(3);
    }
}
