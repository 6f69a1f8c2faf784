//! Words, mentions and clusters.
//!
//! A [`Mention`] is an ordered set of [`Word`] positions, optionally
//! annotated with a MIN (head) set used for partial matching. Split
//! antecedents are mentions with no words of their own that stand for
//! several other clusters at once; zero mentions are empty (elided)
//! elements anchored at a token position.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Word
// ============================================================================

/// A word position in a document.
///
/// Surface tokens carry `sub == 0`. Zero (empty) elements are anchored
/// after a surface token and disambiguated by `sub >= 1`, so several
/// zeros can share the same anchor. Ordering is lexicographic on
/// `(sent, ord, sub)`, which interleaves zeros right after their
/// anchor token in discourse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Word {
    /// Sentence index (0-based).
    pub sent: u32,
    /// Token index within the sentence (0-based).
    pub ord: u32,
    /// Zero sub-index; 0 for surface tokens.
    pub sub: u32,
}

impl Word {
    /// A surface token at `(sent, ord)`.
    #[must_use]
    pub fn token(sent: u32, ord: u32) -> Self {
        Word { sent, ord, sub: 0 }
    }

    /// A zero element anchored after token `(sent, ord)`.
    #[must_use]
    pub fn zero(sent: u32, ord: u32, sub: u32) -> Self {
        Word { sent, ord, sub }
    }

    /// True for zero (empty) elements.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.sub != 0
    }

    /// Anchor position, ignoring the zero sub-index.
    #[must_use]
    pub fn anchor(&self) -> (u32, u32) {
        (self.sent, self.ord)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "{}:{}.{}", self.sent, self.ord, self.sub)
        } else {
            write!(f, "{}:{}", self.sent, self.ord)
        }
    }
}

// ============================================================================
// Matching methods
// ============================================================================

/// Partial-match scoring method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMethod {
    /// CorefUD-style matching: the response must contain the key's MIN
    /// set and be contained in the key span. Score is recall of the
    /// key words (precision is 1 by construction).
    #[default]
    Default,
    /// CRAFT 2019 matching: any response span covered by the key's MIN
    /// window receives the word-overlap score.
    Craft,
}

/// How zero mentions are matched between key and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZeroMatch {
    /// Exact word identity, like any other mention.
    #[default]
    Linear,
    /// Anchor-based matching: zeros aligned by their anchor token
    /// before the general partial-matching pass.
    Dependent,
}

// ============================================================================
// Mention
// ============================================================================

/// A mention: an ordered, deduplicated list of word positions.
///
/// Equality ignores the MIN set and the referring flag: two ordinary
/// mentions are equal when their word sequences are identical, and two
/// split-antecedent mentions are equal when their member cluster sets
/// are identical. A split never equals a non-split. Hashing is
/// consistent with this equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    words: Vec<Word>,
    word_set: BTreeSet<Word>,
    min_set: BTreeSet<Word>,
    spans: Vec<(Word, Word)>,
    is_referring: bool,
    is_zero: bool,
    is_split: bool,
    split_members: BTreeSet<Vec<Mention>>,
}

impl Mention {
    /// Build a mention from word positions. Words are sorted and
    /// deduplicated; an empty list is rejected.
    pub fn new(words: impl IntoIterator<Item = Word>) -> Result<Self> {
        let word_set: BTreeSet<Word> = words.into_iter().collect();
        if word_set.is_empty() {
            return Err(Error::format("mention with no words"));
        }
        let words: Vec<Word> = word_set.iter().copied().collect();
        let spans = derive_spans(&words);
        Ok(Mention {
            words,
            word_set,
            min_set: BTreeSet::new(),
            spans,
            is_referring: true,
            is_zero: false,
            is_split: false,
            split_members: BTreeSet::new(),
        })
    }

    /// Build a mention covering the inclusive token range
    /// `[start, end]` within one sentence.
    pub fn span(sent: u32, start: u32, end: u32) -> Result<Self> {
        if end < start {
            return Err(Error::format(format!(
                "mention span {start}..{end} is reversed"
            )));
        }
        Mention::new((start..=end).map(|ord| Word::token(sent, ord)))
    }

    /// Build a zero mention from its single zero word.
    pub fn zero(word: Word) -> Result<Self> {
        if !word.is_zero() {
            return Err(Error::format(format!(
                "zero mention anchored at surface token {word}"
            )));
        }
        let mut m = Mention::new([word])?;
        m.is_zero = true;
        Ok(m)
    }

    /// Build a split-antecedent mention from its member clusters.
    ///
    /// The member clusters are the gold clusters the plural anaphor
    /// refers to; each is a list of ordinary mentions.
    #[must_use]
    pub fn split(members: impl IntoIterator<Item = Vec<Mention>>) -> Self {
        Mention {
            words: Vec::new(),
            word_set: BTreeSet::new(),
            min_set: BTreeSet::new(),
            spans: Vec::new(),
            is_referring: true,
            is_zero: false,
            is_split: true,
            split_members: members.into_iter().collect(),
        }
    }

    /// A placeholder split antecedent with no members, used to pad the
    /// split alignment when only one side has splits.
    #[must_use]
    pub(crate) fn dummy_split() -> Self {
        Mention::split(std::iter::empty())
    }

    /// Attach a MIN (head) set. Every MIN word must belong to the
    /// mention.
    pub fn with_min(mut self, min: impl IntoIterator<Item = Word>) -> Result<Self> {
        let min_set: BTreeSet<Word> = min.into_iter().collect();
        if !min_set.is_subset(&self.word_set) {
            return Err(Error::format("MIN set not contained in mention words"));
        }
        self.min_set = min_set;
        Ok(self)
    }

    /// Mark the mention as referring or non-referring.
    #[must_use]
    pub fn with_referring(mut self, is_referring: bool) -> Self {
        self.is_referring = is_referring;
        self
    }

    /// The mention's words, sorted.
    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// The mention's words as a set.
    #[must_use]
    pub fn word_set(&self) -> &BTreeSet<Word> {
        &self.word_set
    }

    /// The MIN (head) set; empty when unannotated.
    #[must_use]
    pub fn min_set(&self) -> &BTreeSet<Word> {
        &self.min_set
    }

    /// Maximal contiguous spans of the mention, in order.
    #[must_use]
    pub fn spans(&self) -> &[(Word, Word)] {
        &self.spans
    }

    /// Number of words.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// First word, if any (split mentions have none).
    #[must_use]
    pub fn first_word(&self) -> Option<Word> {
        self.words.first().copied()
    }

    /// True for referring mentions.
    #[must_use]
    pub fn is_referring(&self) -> bool {
        self.is_referring
    }

    /// True for zero (elided) mentions.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.is_zero
    }

    /// True for split-antecedent mentions.
    #[must_use]
    pub fn is_split(&self) -> bool {
        self.is_split
    }

    /// Member clusters of a split antecedent; empty otherwise.
    #[must_use]
    pub fn split_members(&self) -> &BTreeSet<Vec<Mention>> {
        &self.split_members
    }

    /// Number of shared words with `other`.
    #[must_use]
    pub fn word_overlap(&self, other: &Mention) -> usize {
        // Cheap reject when the spans cannot overlap.
        match (self.words.first(), self.words.last(), other.words.first(), other.words.last()) {
            (Some(sf), Some(sl), Some(of), Some(ol)) if sf > ol || of > sl => 0,
            (None, _, _, _) | (_, _, None, _) => 0,
            _ => self.word_set.intersection(&other.word_set).count(),
        }
    }

    /// Partial-match score against `other` in `[0, 1]`.
    ///
    /// Exact equality scores 1 under either method. Otherwise the MIN
    /// annotation decides which side acts as the key; an unannotated
    /// pair scores 0.
    #[must_use]
    pub fn partial_match_score(&self, other: &Mention, method: MatchMethod) -> f64 {
        if self == other {
            return 1.0;
        }
        match method {
            MatchMethod::Default => self.corefud_score(other),
            MatchMethod::Craft => self.craft_score(other),
        }
    }

    /// CorefUD matching: MIN ⊆ response ⊆ key, scored as key-word
    /// recall.
    fn corefud_score(&self, other: &Mention) -> f64 {
        if !self.min_set.is_empty()
            && self.min_set.is_subset(&other.word_set)
            && other.word_set.is_subset(&self.word_set)
        {
            self.word_overlap(other) as f64 / self.word_set.len() as f64
        } else if !other.min_set.is_empty()
            && other.min_set.is_subset(&self.word_set)
            && self.word_set.is_subset(&other.word_set)
        {
            self.word_overlap(other) as f64 / other.word_set.len() as f64
        } else {
            0.0
        }
    }

    /// CRAFT matching: any span of the other side covered by the MIN
    /// window scores word overlap over the MIN-holder's length.
    fn craft_score(&self, other: &Mention) -> f64 {
        if self.is_zero || other.is_zero {
            return 0.0;
        }
        if !self.min_set.is_empty() {
            craft_window_score(self, other)
        } else if !other.min_set.is_empty() {
            craft_window_score(other, self)
        } else {
            0.0
        }
    }

    /// Zero-dependent match: two zeros match when they share an anchor
    /// token, regardless of the zero sub-index.
    #[must_use]
    pub fn zero_dependent_match_score(&self, other: &Mention) -> f64 {
        match (self.is_zero, other.is_zero, self.words.first(), other.words.first()) {
            (true, true, Some(a), Some(b)) if a.anchor() == b.anchor() => 1.0,
            _ => 0.0,
        }
    }
}

/// Overlap score with `holder`'s MIN window, 0 when no span of `other`
/// falls inside it.
fn craft_window_score(holder: &Mention, other: &Mention) -> f64 {
    let (Some(&lo), Some(&hi)) = (holder.min_set.iter().next(), holder.min_set.iter().next_back())
    else {
        return 0.0;
    };
    let covered = other.spans.iter().any(|&(s, e)| s >= lo && e <= hi);
    if covered {
        holder.word_overlap(other) as f64 / holder.word_set.len() as f64
    } else {
        0.0
    }
}

/// Maximal runs of consecutive surface tokens; zero words always form
/// their own span.
fn derive_spans(words: &[Word]) -> Vec<(Word, Word)> {
    let mut spans: Vec<(Word, Word)> = Vec::new();
    for &w in words {
        match spans.last_mut() {
            Some((_, end))
                if !w.is_zero()
                    && !end.is_zero()
                    && end.sent == w.sent
                    && end.ord + 1 == w.ord =>
            {
                *end = w;
            }
            _ => spans.push((w, w)),
        }
    }
    spans
}

impl PartialEq for Mention {
    fn eq(&self, other: &Self) -> bool {
        if self.is_split != other.is_split {
            false
        } else if self.is_split {
            self.split_members == other.split_members
        } else {
            self.words == other.words
        }
    }
}

impl Eq for Mention {}

impl Hash for Mention {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_split.hash(state);
        if self.is_split {
            self.split_members.hash(state);
        } else {
            self.words.hash(state);
        }
    }
}

impl Ord for Mention {
    /// Discourse order: by first word, then last word, then length.
    /// Further tie-breaks keep the order total and consistent with
    /// equality, with split mentions sorting before worded ones.
    fn cmp(&self, other: &Self) -> Ordering {
        let key = |m: &Mention| {
            (
                m.words.first().copied(),
                m.words.last().copied(),
                m.words.len(),
            )
        };
        key(self)
            .cmp(&key(other))
            .then_with(|| self.words.cmp(&other.words))
            .then_with(|| self.is_split.cmp(&other.is_split))
            .then_with(|| self.split_members.cmp(&other.split_members))
    }
}

impl PartialOrd for Mention {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_split {
            write!(f, "(split:")?;
            for (i, member) in self.split_members.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                match member.first() {
                    Some(m) => write!(f, "{m}")?,
                    None => write!(f, "()")?,
                }
            }
            return write!(f, ")");
        }
        write!(f, "(")?;
        for (i, w) in self.words.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if self.min_set.contains(w) {
                write!(f, "{w}*")?;
            } else {
                write!(f, "{w}")?;
            }
        }
        write!(f, ")")
    }
}

// ============================================================================
// Cluster
// ============================================================================

/// A coreference cluster (entity): a list of mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    mentions: Vec<Mention>,
}

impl Cluster {
    /// Wrap a list of mentions.
    #[must_use]
    pub fn new(mentions: Vec<Mention>) -> Self {
        Cluster { mentions }
    }

    /// The mentions, in insertion order.
    #[must_use]
    pub fn mentions(&self) -> &[Mention] {
        &self.mentions
    }

    /// Number of mentions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    /// True when the cluster has no mentions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    /// True for single-mention clusters.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.mentions.len() == 1
    }

    /// Membership test by mention equality.
    #[must_use]
    pub fn contains(&self, mention: &Mention) -> bool {
        self.mentions.contains(mention)
    }

    /// Iterate over the mentions.
    pub fn iter(&self) -> std::slice::Iter<'_, Mention> {
        self.mentions.iter()
    }

    /// The mentions sorted into discourse order.
    #[must_use]
    pub fn sorted_mentions(&self) -> Vec<Mention> {
        let mut out = self.mentions.clone();
        out.sort();
        out
    }
}

impl FromIterator<Mention> for Cluster {
    fn from_iter<T: IntoIterator<Item = Mention>>(iter: T) -> Self {
        Cluster::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Cluster {
    type Item = &'a Mention;
    type IntoIter = std::slice::Iter<'a, Mention>;

    fn into_iter(self) -> Self::IntoIter {
        self.mentions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(sent: u32, start: u32, end: u32) -> Mention {
        Mention::span(sent, start, end).unwrap()
    }

    #[test]
    fn word_ordering_interleaves_zeros() {
        let a = Word::token(0, 3);
        let z = Word::zero(0, 3, 1);
        let b = Word::token(0, 4);
        assert!(a < z && z < b);
        assert!(z.is_zero() && !a.is_zero());
        assert_eq!(z.anchor(), (0, 3));
    }

    #[test]
    fn mention_equality_is_word_sequence() {
        assert_eq!(m(0, 1, 3), m(0, 1, 3));
        assert_ne!(m(0, 1, 3), m(0, 1, 2));
        let gappy = Mention::new([Word::token(0, 1), Word::token(0, 3)]).unwrap();
        assert_ne!(m(0, 1, 3), gappy);
    }

    #[test]
    fn mention_rejects_empty_and_reversed() {
        assert!(Mention::new(std::iter::empty()).is_err());
        assert!(Mention::span(0, 5, 2).is_err());
        assert!(Mention::zero(Word::token(0, 1)).is_err());
    }

    #[test]
    fn min_must_be_subset() {
        assert!(m(0, 1, 3).with_min([Word::token(0, 2)]).is_ok());
        assert!(m(0, 1, 3).with_min([Word::token(0, 7)]).is_err());
    }

    #[test]
    fn discourse_order() {
        let a = m(0, 1, 2);
        let b = m(0, 1, 4);
        let c = m(0, 3, 4);
        let mut v = vec![c.clone(), b.clone(), a.clone()];
        v.sort();
        assert_eq!(v, vec![a, b, c]);
    }

    #[test]
    fn split_equality_by_members() {
        let s1 = Mention::split([vec![m(0, 0, 1)], vec![m(0, 5, 6)]]);
        let s2 = Mention::split([vec![m(0, 5, 6)], vec![m(0, 0, 1)]]);
        let s3 = Mention::split([vec![m(0, 0, 1)]]);
        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
        assert_ne!(s1, m(0, 0, 1));
        assert_eq!(Mention::dummy_split(), Mention::dummy_split());
    }

    #[test]
    fn default_partial_match() {
        // Key [1..5] with MIN {2}; response [1..3] is inside and covers MIN.
        let key = m(0, 1, 5).with_min([Word::token(0, 2)]).unwrap();
        let sys = m(0, 1, 3);
        let score = key.partial_match_score(&sys, MatchMethod::Default);
        assert!((score - 3.0 / 5.0).abs() < 1e-12);
        // Symmetric lookup from the response side.
        assert!((sys.partial_match_score(&key, MatchMethod::Default) - 3.0 / 5.0).abs() < 1e-12);
        // Response missing the MIN word scores zero.
        let miss = m(0, 4, 5);
        assert_eq!(key.partial_match_score(&miss, MatchMethod::Default), 0.0);
        // Response leaking outside the key scores zero.
        let leak = m(0, 2, 7);
        assert_eq!(key.partial_match_score(&leak, MatchMethod::Default), 0.0);
        // Exact match scores one even without MIN.
        assert_eq!(m(0, 1, 3).partial_match_score(&m(0, 1, 3), MatchMethod::Default), 1.0);
    }

    #[test]
    fn craft_partial_match() {
        // Key [0..5] whose MIN window is [1, 2].
        let key = m(0, 0, 5)
            .with_min([Word::token(0, 1), Word::token(0, 2)])
            .unwrap();
        let inside = m(0, 1, 2);
        let score = key.partial_match_score(&inside, MatchMethod::Craft);
        assert!((score - 2.0 / 6.0).abs() < 1e-12);
        // A span sticking out of the MIN window does not match, even
        // though it overlaps the mention.
        let outside = m(0, 2, 4);
        assert_eq!(key.partial_match_score(&outside, MatchMethod::Craft), 0.0);
    }

    #[test]
    fn craft_ignores_zeros() {
        let z = Mention::zero(Word::zero(0, 3, 1)).unwrap();
        let key = m(0, 2, 4).with_min([Word::token(0, 3)]).unwrap();
        assert_eq!(key.partial_match_score(&z, MatchMethod::Craft), 0.0);
    }

    #[test]
    fn zero_dependent_match() {
        let a = Mention::zero(Word::zero(1, 4, 1)).unwrap();
        let b = Mention::zero(Word::zero(1, 4, 2)).unwrap();
        let c = Mention::zero(Word::zero(1, 5, 1)).unwrap();
        assert_eq!(a.zero_dependent_match_score(&b), 1.0);
        assert_eq!(a.zero_dependent_match_score(&c), 0.0);
        assert_eq!(a.zero_dependent_match_score(&m(1, 4, 4)), 0.0);
    }

    #[test]
    fn spans_split_on_gaps() {
        let gappy = Mention::new([
            Word::token(0, 1),
            Word::token(0, 2),
            Word::token(0, 5),
            Word::token(1, 0),
        ])
        .unwrap();
        assert_eq!(
            gappy.spans(),
            &[
                (Word::token(0, 1), Word::token(0, 2)),
                (Word::token(0, 5), Word::token(0, 5)),
                (Word::token(1, 0), Word::token(1, 0)),
            ]
        );
    }

    #[test]
    fn cluster_basics() {
        let c = Cluster::new(vec![m(0, 3, 4), m(0, 0, 1)]);
        assert_eq!(c.len(), 2);
        assert!(!c.is_singleton());
        assert!(c.contains(&m(0, 0, 1)));
        assert_eq!(c.sorted_mentions()[0], m(0, 0, 1));
    }
}
