//! Mention alignment between key and response clusters.
//!
//! Exact matches are found by mention equality; with partial matching
//! enabled, the remaining mentions are paired either by an optimal
//! assignment over partial-match scores or by the CRAFT greedy scan.
//! Zero mentions can additionally be aligned by their anchor token
//! before the general pass. The result is a [`CorefInfo`] consumed by
//! every metric.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::assignment::max_score_assignment;
use crate::mention::{Cluster, MatchMethod, Mention, ZeroMatch};

/// Alignment configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlignOptions {
    /// Pair non-identical mentions by partial-match score.
    pub partial_match: bool,
    /// Scoring method for partial matches.
    pub match_method: MatchMethod,
    /// Whether zero mentions take part in the evaluation.
    pub keep_zeros: bool,
    /// How zero mentions are matched.
    pub zero_match: ZeroMatch,
}

/// Per-document alignment state consumed by the metrics.
///
/// `mention_to_key` indexes every mention of every key cluster by its
/// key cluster id; a response mention that matches a key mention
/// exactly hashes to the same entry. `mention_to_sys` is the mirror
/// image. Partially matched pairs are deliberately kept out of both
/// maps and recorded in `alignment`, symmetrically.
#[derive(Debug, Clone, Default)]
pub struct CorefInfo {
    /// Gold clusters.
    pub key_clusters: Vec<Cluster>,
    /// Response clusters.
    pub sys_clusters: Vec<Cluster>,
    /// Mention to key-cluster index.
    pub mention_to_key: HashMap<Mention, usize>,
    /// Mention to response-cluster index.
    pub mention_to_sys: HashMap<Mention, usize>,
    /// Symmetric map of partially aligned mention pairs.
    pub alignment: HashMap<Mention, Mention>,
}

impl CorefInfo {
    /// The same document with key and response sides exchanged.
    /// Precision and recall of every metric swap along with it.
    #[must_use]
    pub fn swapped(&self) -> CorefInfo {
        CorefInfo {
            key_clusters: self.sys_clusters.clone(),
            sys_clusters: self.key_clusters.clone(),
            mention_to_key: self.mention_to_sys.clone(),
            mention_to_sys: self.mention_to_key.clone(),
            alignment: self.alignment.clone(),
        }
    }
}

/// Drop singleton clusters, for evaluations that score links only.
#[must_use]
pub fn drop_singletons(clusters: Vec<Cluster>) -> Vec<Cluster> {
    clusters.into_iter().filter(|c| !c.is_singleton()).collect()
}

/// Index every mention of `clusters` by cluster id and collect the
/// ordinary mentions with no exact counterpart on the other side.
///
/// A mention listed under two clusters is reassigned to the later one
/// with a warning.
fn mention_cluster_ids(
    clusters: &[Cluster],
    other_mentions: &HashSet<Mention>,
) -> (HashMap<Mention, usize>, Vec<Mention>) {
    let mut ids: HashMap<Mention, usize> = HashMap::new();
    let mut non_aligned: Vec<Mention> = Vec::new();
    for (cluster_id, cluster) in clusters.iter().enumerate() {
        for m in cluster {
            if let Some(old) = ids.get(m) {
                log::warn!(
                    "mention {m} already indexed with cluster id {old}; new cluster id {cluster_id}"
                );
            }
            ids.insert(m.clone(), cluster_id);
            if !m.is_split() && !m.is_zero() && !other_mentions.contains(m) {
                non_aligned.push(m.clone());
            }
        }
    }
    (ids, non_aligned)
}

/// Align key and response clusters into a [`CorefInfo`].
#[must_use]
pub fn align_clusters(
    key_clusters: Vec<Cluster>,
    sys_clusters: Vec<Cluster>,
    opts: &AlignOptions,
) -> CorefInfo {
    let key_mentions: HashSet<Mention> =
        key_clusters.iter().flat_map(|c| c.iter().cloned()).collect();
    let sys_mentions: HashSet<Mention> =
        sys_clusters.iter().flat_map(|c| c.iter().cloned()).collect();

    let mut alignment: HashMap<Mention, Mention> = HashMap::new();

    // Dependent zeros are aligned by anchor before anything else; the
    // pairing is shared with the partial-match bookkeeping below.
    if opts.keep_zeros && opts.zero_match == ZeroMatch::Dependent {
        align_dependent_zeros(&key_mentions, &sys_mentions, &mut alignment);
    }

    let exact = key_mentions.intersection(&sys_mentions).count();
    log::debug!(
        "key mentions: {}, response mentions: {}, exactly matched: {}",
        key_mentions.len(),
        sys_mentions.len(),
        exact
    );

    let (mention_to_key, mut key_non_aligned) = mention_cluster_ids(&key_clusters, &sys_mentions);
    let (mention_to_sys, mut sys_non_aligned) = mention_cluster_ids(&sys_clusters, &key_mentions);

    if opts.partial_match && !key_non_aligned.is_empty() && !sys_non_aligned.is_empty() {
        // Sorting implements the CorefUD tie-breaking: among equal
        // overlap scores, prefer the mention that starts earlier, then
        // the one that ends earlier.
        key_non_aligned.sort();
        sys_non_aligned.sort();
        match opts.match_method {
            MatchMethod::Craft => {
                align_craft(&sys_clusters, &key_non_aligned, &sys_non_aligned, &mut alignment);
            }
            MatchMethod::Default => {
                align_optimal(
                    &key_non_aligned,
                    &sys_non_aligned,
                    opts.match_method,
                    &mut alignment,
                );
            }
        }
    }

    CorefInfo {
        key_clusters,
        sys_clusters,
        mention_to_key,
        mention_to_sys,
        alignment,
    }
}

/// Pair zero mentions by anchor token via optimal assignment.
fn align_dependent_zeros(
    key_mentions: &HashSet<Mention>,
    sys_mentions: &HashSet<Mention>,
    alignment: &mut HashMap<Mention, Mention>,
) {
    let mut key_zeros: Vec<&Mention> = key_mentions.iter().filter(|m| m.is_zero()).collect();
    let mut sys_zeros: Vec<&Mention> = sys_mentions.iter().filter(|m| m.is_zero()).collect();
    if key_zeros.is_empty() || sys_zeros.is_empty() {
        return;
    }
    key_zeros.sort();
    sys_zeros.sort();
    let similarity: Vec<Vec<f64>> = key_zeros
        .iter()
        .map(|km| {
            sys_zeros
                .iter()
                .map(|sm| km.zero_dependent_match_score(sm))
                .collect()
        })
        .collect();
    for (k, s) in max_score_assignment(&similarity) {
        if similarity[k][s] > 0.0 {
            alignment.insert(sys_zeros[s].clone(), key_zeros[k].clone());
            alignment.insert(key_zeros[k].clone(), sys_zeros[s].clone());
        }
    }
}

/// CRAFT greedy pairing: walk response mentions in cluster order and
/// give each one the first unused key candidate with a positive score.
fn align_craft(
    sys_clusters: &[Cluster],
    key_non_aligned: &[Mention],
    sys_non_aligned: &[Mention],
    alignment: &mut HashMap<Mention, Mention>,
) {
    let pending: HashSet<&Mention> = sys_non_aligned.iter().collect();
    let mut key_used: HashSet<&Mention> = HashSet::new();
    for cluster in sys_clusters {
        for sm in cluster {
            if !pending.contains(sm) {
                continue;
            }
            for km in key_non_aligned {
                if key_used.contains(km) {
                    continue;
                }
                if km.partial_match_score(sm, MatchMethod::Craft) > 0.0 {
                    key_used.insert(km);
                    alignment.insert(sm.clone(), km.clone());
                    alignment.insert(km.clone(), sm.clone());
                    break;
                }
            }
        }
    }
}

/// Optimal pairing over the full partial-match score matrix.
fn align_optimal(
    key_non_aligned: &[Mention],
    sys_non_aligned: &[Mention],
    method: MatchMethod,
    alignment: &mut HashMap<Mention, Mention>,
) {
    let similarity: Vec<Vec<f64>> = key_non_aligned
        .iter()
        .map(|km| {
            sys_non_aligned
                .iter()
                .map(|sm| km.partial_match_score(sm, method))
                .collect()
        })
        .collect();
    let mut paired = 0usize;
    for (k, s) in max_score_assignment(&similarity) {
        if similarity[k][s] > 0.0 {
            paired += 1;
            alignment.insert(sys_non_aligned[s].clone(), key_non_aligned[k].clone());
            alignment.insert(key_non_aligned[k].clone(), sys_non_aligned[s].clone());
        }
    }
    log::debug!("partially matched mentions: {paired}");
}
