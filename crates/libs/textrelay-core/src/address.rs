//! Recipient address rules.
//!
//! An [`AddressPolicy`] decides what a well-formed address looks like, when two
//! addresses name the same recipient and how an address is shown to a person.
//! Policies are chosen per region; regions without dedicated rules fall back
//! to [`ExactMatchPolicy`].

use std::fmt::Debug;
use std::sync::Arc;

pub const DEFAULT_REGION: &str = "US";

pub trait AddressPolicy: Send + Sync + Debug {
    /// Filters raw input down to the address alphabet.
    fn normalize(&self, raw: &str) -> String {
        raw.chars().filter(char::is_ascii_digit).collect()
    }

    fn is_well_formed(&self, normalized: &str) -> bool;

    /// Canonical equality. Plain string equality unless the region knows better.
    fn same_address(&self, a: &str, b: &str) -> bool {
        a == b
    }

    /// Display form of a normalized address, `None` when there is none.
    fn format(&self, _normalized: &str) -> Option<String> {
        None
    }
}

/// North American Numbering Plan rules (US, CA).
#[derive(Clone, Copy, Debug, Default)]
pub struct NanpPolicy;

impl NanpPolicy {
    /// Strips the `1` country code from an 11-digit number.
    fn national(normalized: &str) -> &str {
        match normalized.strip_prefix('1') {
            Some(rest) if normalized.len() == 11 => rest,
            _ => normalized,
        }
    }

    fn is_national_number(digits: &str) -> bool {
        digits.len() == 10
            && digits.starts_with(|c: char| ('2'..='9').contains(&c))
            && digits.chars().all(|c| c.is_ascii_digit())
    }
}

impl AddressPolicy for NanpPolicy {
    fn is_well_formed(&self, normalized: &str) -> bool {
        if !normalized.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        let short_code = (5..=6).contains(&normalized.len());
        short_code || Self::is_national_number(Self::national(normalized))
    }

    fn same_address(&self, a: &str, b: &str) -> bool {
        Self::national(a) == Self::national(b)
    }

    fn format(&self, normalized: &str) -> Option<String> {
        let national = Self::national(normalized);
        if !Self::is_national_number(national) {
            return None;
        }
        let (area, rest) = national.split_at(3);
        let (exchange, line) = rest.split_at(3);
        if national.len() == normalized.len() {
            Some(format!("({area}) {exchange}-{line}"))
        } else {
            Some(format!("+1 {area}-{exchange}-{line}"))
        }
    }
}

/// Region-agnostic fallback: any E.164-sized digit string, exact equality.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactMatchPolicy;

impl AddressPolicy for ExactMatchPolicy {
    fn is_well_formed(&self, normalized: &str) -> bool {
        (3..=15).contains(&normalized.len()) && normalized.chars().all(|c| c.is_ascii_digit())
    }
}

pub fn policy_for_region(region: &str) -> Arc<dyn AddressPolicy> {
    match region.trim().to_ascii_uppercase().as_str() {
        "US" | "CA" => Arc::new(NanpPolicy),
        other => {
            log::debug!("no address rules for region '{other}', using exact matching");
            Arc::new(ExactMatchPolicy)
        }
    }
}
