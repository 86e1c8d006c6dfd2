use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use rapport_core::SenderId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An unordered pair of distinct participants.
///
/// `a` and `b` keep the orientation they were created with (directional
/// features are reported as `a -> b` and `b -> a`), but equality and hashing
/// ignore member order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairKey {
    a: SenderId,
    b: SenderId,
}

impl PairKey {
    /// Returns `None` for a self-pair.
    pub fn new(a: impl Into<SenderId>, b: impl Into<SenderId>) -> Option<Self> {
        let (a, b) = (a.into(), b.into());
        if a == b {
            return None;
        }
        Some(Self { a, b })
    }

    pub fn a(&self) -> &str {
        &self.a
    }

    pub fn b(&self) -> &str {
        &self.b
    }

    pub fn contains(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }

    fn canonical(&self) -> (&str, &str) {
        if self.a <= self.b {
            (&self.a, &self.b)
        } else {
            (&self.b, &self.a)
        }
    }
}

impl PartialEq for PairKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for PairKey {}

impl Hash for PairKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.a, self.b)
    }
}

/// Enumerate the pairs to evaluate.
///
/// With a focus id, the focus participant is paired against every other id
/// (focus first, so directional features read `focus -> other`). Without one,
/// all `C(n, 2)` pairs are produced in id order. Fewer than two distinct ids,
/// or a focus id that never speaks, yields an empty set.
pub fn enumerate_pairs<I, S>(ids: I, focus: Option<&str>) -> Vec<PairKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let ids: IndexSet<SenderId> = ids
        .into_iter()
        .map(|id| id.as_ref().to_string())
        .collect();

    if ids.len() < 2 {
        debug!(participants = ids.len(), "fewer than two participants, no pairs");
        return Vec::new();
    }

    let pairs: Vec<PairKey> = match focus.map(str::trim) {
        Some(requested) => {
            let Some(focus) = resolve_focus(&ids, requested) else {
                warn!(focus = requested, "focus participant has no messages, no pairs");
                return Vec::new();
            };
            ids.iter()
                .filter_map(|other| PairKey::new(focus.as_str(), other.as_str()))
                .collect()
        }
        None => {
            let ids: Vec<&SenderId> = ids.iter().collect();
            let mut pairs = Vec::with_capacity(ids.len() * (ids.len() - 1) / 2);
            for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    if let Some(pair) = PairKey::new(ids[i].as_str(), ids[j].as_str()) {
                        pairs.push(pair);
                    }
                }
            }
            pairs
        }
    };

    debug!(participants = ids.len(), pairs = pairs.len(), "pairs enumerated");
    pairs
}

/// Match a focus id against the stored ids. An exact match wins; otherwise
/// an all-digit id is compared in its canonical numeric form, so `010000`
/// finds `10000`.
fn resolve_focus<'a>(ids: &'a IndexSet<SenderId>, focus: &str) -> Option<&'a SenderId> {
    if let Some(id) = ids.get(focus) {
        return Some(id);
    }
    let canonical = canonical_numeric(focus)?;
    ids.iter()
        .find(|id| canonical_numeric(id).is_some_and(|c| c == canonical))
}

fn canonical_numeric(id: &str) -> Option<&str> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = id.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn pair_equality_ignores_order() {
        let ab = PairKey::new("a", "b").unwrap();
        let ba = PairKey::new("b", "a").unwrap();
        assert_eq!(ab, ba);

        let set: HashSet<PairKey> = [ab.clone(), ba].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_eq!(ab.a(), "a");
    }

    #[test]
    fn self_pair_is_rejected() {
        assert!(PairKey::new("a", "a").is_none());
    }

    #[test]
    fn all_pairs_is_n_choose_2() {
        let pairs = enumerate_pairs(["a", "b", "c", "d"], None);
        assert_eq!(pairs.len(), 6);

        let unique: HashSet<&PairKey> = pairs.iter().collect();
        assert_eq!(unique.len(), 6);
        assert_eq!(pairs[0], PairKey::new("a", "b").unwrap());
    }

    #[test]
    fn duplicate_ids_are_collapsed() {
        let pairs = enumerate_pairs(["a", "b", "a"], None);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn focus_pairs_against_everyone_else() {
        let pairs = enumerate_pairs(["a", "b", "c"], Some(" b "));
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.a() == "b"));
        assert!(pairs.iter().all(|p| p.b() != "b"));
    }

    #[test]
    fn numeric_focus_matches_stored_form() {
        let pairs = enumerate_pairs(["10000", "20000", "007"], Some("010000"));
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.a() == "10000"));

        let pairs = enumerate_pairs(["10000", "007"], Some("007"));
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a(), "007");
        let pairs = enumerate_pairs(["10000", "007"], Some("7"));
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a(), "007");
        assert!(enumerate_pairs(["10000", "20000"], Some("1000")).is_empty());
    }

    #[test]
    fn unknown_focus_yields_nothing() {
        assert!(enumerate_pairs(["a", "b"], Some("z")).is_empty());
    }

    #[test]
    fn single_participant_yields_nothing() {
        assert!(enumerate_pairs(["a"], None).is_empty());
        assert!(enumerate_pairs(Vec::<String>::new(), None).is_empty());
    }
}
