//! Corpus-level evaluation.
//!
//! An [`Evaluator`] accumulates one metric's raw counts over a corpus
//! of aligned documents ([`CorefInfo`]); [`evaluate_documents`] is the
//! one-shot entry point. Split antecedents are aligned per document
//! with the evaluator's own metric before the main pass. Bridging and
//! non-referring mentions have their own scorers.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::align::CorefInfo;
use crate::assignment::max_score_assignment;
use crate::mention::{Cluster, Mention};
use crate::metrics::{
    als_zeros, b_cubed, blanc_c, blanc_n, ceaf_e, ceaf_m, lea, mention_overlap, mentions_score,
    muc, AlignmentMap, ClusterMap, Metric, MetricKind, SplitMap,
};

/// Precision/recall/F-score triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    /// Recall in `[0, 1]`.
    pub recall: f64,
    /// Precision in `[0, 1]`.
    pub precision: f64,
    /// F-beta in `[0, 1]`.
    pub f1: f64,
}

/// Evaluation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Beta of the F-score; 1 weighs precision and recall equally.
    pub beta: f64,
    /// LEA importance multiplier for clusters holding a split
    /// antecedent.
    pub lea_split_importance: f64,
    /// Report the split-antecedent alignment quality instead of the
    /// metric itself.
    pub only_split_antecedent: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            beta: 1.0,
            lea_split_importance: 1.0,
            only_split_antecedent: false,
        }
    }
}

/// F-beta from raw counts; 0 when precision and recall are both 0.
#[must_use]
pub fn f_beta(p_num: f64, p_den: f64, r_num: f64, r_den: f64, beta: f64) -> f64 {
    let p = if p_den == 0.0 { 0.0 } else { p_num / p_den };
    let r = if r_den == 0.0 { 0.0 } else { r_num / r_den };
    if p + r == 0.0 {
        0.0
    } else {
        (1.0 + beta * beta) * p * r / (beta * beta * p + r)
    }
}

/// Mean F1 of MUC, B³ and CEAF-e, the customary CoNLL-2012 average.
#[must_use]
pub fn conll_average(muc: &Scores, b_cubed: &Scores, ceaf_e: &Scores) -> f64 {
    (muc.f1 + b_cubed.f1 + ceaf_e.f1) / 3.0
}

// ============================================================================
// Evaluator
// ============================================================================

/// Per-kind accumulator.
#[derive(Debug, Clone)]
struct SubEvaluator {
    kind: MetricKind,
    beta: f64,
    lea_split_importance: f64,
    p_num: f64,
    p_den: f64,
    r_num: f64,
    r_den: f64,
    // pn, pd, rn, rd of the split-antecedent alignment itself.
    split_counter: [f64; 4],
    dummy_split: Mention,
}

impl SubEvaluator {
    fn new(kind: MetricKind, config: &EvalConfig) -> Self {
        SubEvaluator {
            kind,
            beta: config.beta,
            lea_split_importance: config.lea_split_importance,
            p_num: 0.0,
            p_den: 0.0,
            r_num: 0.0,
            r_den: 0.0,
            split_counter: [0.0; 4],
            dummy_split: Mention::dummy_split(),
        }
    }

    /// Run the metric once with the proper argument orientation.
    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        key_clusters: &[Cluster],
        sys_clusters: &[Cluster],
        mention_to_sys: &ClusterMap,
        mention_to_key: &ClusterMap,
        alignment: &AlignmentMap,
        key_split_r: &SplitMap,
        sys_split_p: &SplitMap,
        key_split_f: &SplitMap,
        split_alignment_mode: bool,
    ) -> (f64, f64, f64, f64) {
        match self.kind {
            MetricKind::CeafE => ceaf_e(sys_clusters, key_clusters, alignment, key_split_f),
            MetricKind::CeafM => ceaf_m(sys_clusters, key_clusters, alignment, key_split_f),
            MetricKind::BlancC => {
                blanc_c(sys_clusters, key_clusters, mention_to_sys, alignment, key_split_f)
            }
            MetricKind::BlancN => {
                blanc_n(sys_clusters, key_clusters, mention_to_sys, alignment, key_split_f)
            }
            MetricKind::Lea => {
                let (pn, pd) = lea(
                    sys_clusters,
                    key_clusters,
                    mention_to_key,
                    alignment,
                    sys_split_p,
                    self.lea_split_importance,
                );
                let (rn, rd) = lea(
                    key_clusters,
                    sys_clusters,
                    mention_to_sys,
                    alignment,
                    key_split_r,
                    self.lea_split_importance,
                );
                (pn, pd, rn, rd)
            }
            MetricKind::Muc => {
                let (pn, pd) = muc(
                    sys_clusters,
                    key_clusters,
                    mention_to_key,
                    alignment,
                    sys_split_p,
                    split_alignment_mode,
                );
                let (rn, rd) = muc(
                    key_clusters,
                    sys_clusters,
                    mention_to_sys,
                    alignment,
                    key_split_r,
                    split_alignment_mode,
                );
                (pn, pd, rn, rd)
            }
            MetricKind::BCubed => {
                let (pn, pd) = b_cubed(sys_clusters, mention_to_key, alignment, sys_split_p);
                let (rn, rd) = b_cubed(key_clusters, mention_to_sys, alignment, key_split_r);
                (pn, pd, rn, rd)
            }
            MetricKind::Mentions => {
                let (pn, pd) = mentions_score(sys_clusters, mention_to_key, alignment, sys_split_p);
                let (rn, rd) = mentions_score(key_clusters, mention_to_sys, alignment, key_split_r);
                (pn, pd, rn, rd)
            }
            MetricKind::MentionOverlap => mention_overlap(key_clusters, sys_clusters, alignment),
            MetricKind::Zeros => {
                als_zeros(key_clusters, sys_clusters, mention_to_sys, alignment)
            }
        }
    }

    /// Align key and response split antecedents by evaluating their
    /// member clusters against each other with this evaluator's own
    /// metric, then solving for the F1-maximizing pairing.
    ///
    /// Returns the recall-, precision- and F1-keyed lookup maps used
    /// by the main metric pass; entries exist only for scores above 0.
    fn align_split_antecedents(&mut self, info: &CorefInfo) -> (SplitMap, SplitMap, SplitMap) {
        let collect = |clusters: &[Cluster]| -> Vec<Mention> {
            clusters
                .iter()
                .flat_map(|c| c.iter())
                .filter(|m| m.is_split())
                .cloned()
                .collect()
        };
        let mut key_splits = collect(&info.key_clusters);
        let mut sys_splits = collect(&info.sys_clusters);
        if key_splits.is_empty() && sys_splits.is_empty() {
            return (SplitMap::new(), SplitMap::new(), SplitMap::new());
        }
        // A one-sided document still contributes to the split counter,
        // so the absent side is padded with an empty placeholder.
        if key_splits.is_empty() {
            key_splits.push(self.dummy_split.clone());
        }
        if sys_splits.is_empty() {
            sys_splits.push(self.dummy_split.clone());
        }

        let member_clusters = |splits: &[Mention]| -> Vec<Vec<Cluster>> {
            splits
                .iter()
                .map(|s| {
                    s.split_members()
                        .iter()
                        .map(|members| Cluster::new(members.clone()))
                        .collect()
                })
                .collect()
        };
        let member_maps = |groups: &[Vec<Cluster>]| -> Vec<ClusterMap> {
            groups
                .iter()
                .map(|clusters| {
                    let mut map = ClusterMap::new();
                    for (cid, c) in clusters.iter().enumerate() {
                        for m in c {
                            map.insert(m.clone(), cid);
                        }
                    }
                    map
                })
                .collect()
        };
        let key_members = member_clusters(&key_splits);
        let sys_members = member_clusters(&sys_splits);
        let key_maps = member_maps(&key_members);
        let sys_maps = member_maps(&sys_members);

        let nk = key_splits.len();
        let ns = sys_splits.len();
        let empty = SplitMap::new();
        let mut raw = vec![vec![[0.0_f64; 4]; ns]; nk];
        let mut recalls = vec![vec![0.0_f64; ns]; nk];
        let mut precisions = vec![vec![0.0_f64; ns]; nk];
        let mut f_scores = vec![vec![0.0_f64; ns]; nk];
        for i in 0..nk {
            for j in 0..ns {
                let (pn, pd, rn, rd) = self.apply(
                    &key_members[i],
                    &sys_members[j],
                    &sys_maps[j],
                    &key_maps[i],
                    &info.alignment,
                    &empty,
                    &empty,
                    &empty,
                    true,
                );
                raw[i][j] = [pn, pd, rn, rd];
                precisions[i][j] = if pn == 0.0 { 0.0 } else { pn / pd };
                recalls[i][j] = if rn == 0.0 { 0.0 } else { rn / rd };
                f_scores[i][j] = f_beta(pn, pd, rn, rd, self.beta);
            }
        }

        let pairs = max_score_assignment(&f_scores);
        for &(i, j) in &pairs {
            self.split_counter[0] += raw[i][j][0];
            self.split_counter[2] += raw[i][j][2];
        }
        self.split_counter[1] += (0..ns).map(|j| raw[0][j][1]).sum::<f64>();
        self.split_counter[3] += (0..nk).map(|i| raw[i][0][3]).sum::<f64>();

        let mut key_split_r = SplitMap::new();
        let mut sys_split_p = SplitMap::new();
        let mut key_split_f = SplitMap::new();
        for &(i, j) in &pairs {
            if recalls[i][j] > 0.0 {
                key_split_r.insert(key_splits[i].clone(), (sys_splits[j].clone(), recalls[i][j]));
            }
            if precisions[i][j] > 0.0 {
                sys_split_p.insert(sys_splits[j].clone(), (key_splits[i].clone(), precisions[i][j]));
            }
            if f_scores[i][j] > 0.0 {
                key_split_f.insert(key_splits[i].clone(), (sys_splits[j].clone(), f_scores[i][j]));
            }
        }
        (key_split_r, sys_split_p, key_split_f)
    }

    fn update(&mut self, info: &CorefInfo) {
        let (key_split_r, sys_split_p, key_split_f) = self.align_split_antecedents(info);
        let (pn, pd, rn, rd) = self.apply(
            &info.key_clusters,
            &info.sys_clusters,
            &info.mention_to_sys,
            &info.mention_to_key,
            &info.alignment,
            &key_split_r,
            &sys_split_p,
            &key_split_f,
            false,
        );
        self.p_num += pn;
        self.p_den += pd;
        self.r_num += rn;
        self.r_den += rd;
    }

    fn recall(&self) -> f64 {
        if self.r_num == 0.0 {
            0.0
        } else {
            self.r_num / self.r_den
        }
    }

    fn precision(&self) -> f64 {
        if self.p_num == 0.0 {
            0.0
        } else {
            self.p_num / self.p_den
        }
    }

    fn scores(&self) -> Scores {
        Scores {
            recall: self.recall(),
            precision: self.precision(),
            f1: f_beta(self.p_num, self.p_den, self.r_num, self.r_den, self.beta),
        }
    }

    fn split_scores(&self) -> Scores {
        let [pn, pd, rn, rd] = self.split_counter;
        Scores {
            recall: if rn == 0.0 { 0.0 } else { rn / rd },
            precision: if pn == 0.0 { 0.0 } else { pn / pd },
            f1: f_beta(pn, pd, rn, rd, self.beta),
        }
    }
}

/// Accumulates one [`Metric`] over a corpus of aligned documents.
///
/// BLANC accumulates its two link classes independently and averages
/// them at reporting time, skipping a class that occurs on neither
/// side of the whole corpus.
#[derive(Debug, Clone)]
pub struct Evaluator {
    subs: Vec<SubEvaluator>,
    only_split_antecedent: bool,
}

impl Evaluator {
    /// New evaluator for `metric`.
    #[must_use]
    pub fn new(metric: Metric, config: &EvalConfig) -> Self {
        Evaluator {
            subs: metric
                .kinds()
                .iter()
                .map(|&kind| SubEvaluator::new(kind, config))
                .collect(),
            only_split_antecedent: config.only_split_antecedent,
        }
    }

    /// Fold one document into the accumulated counts.
    pub fn update(&mut self, info: &CorefInfo) {
        for sub in &mut self.subs {
            sub.update(info);
        }
    }

    /// The accumulated corpus scores.
    #[must_use]
    pub fn scores(&self) -> Scores {
        if self.subs.len() == 1 {
            let sub = &self.subs[0];
            return if self.only_split_antecedent {
                sub.split_scores()
            } else {
                sub.scores()
            };
        }
        let mut acc = Scores::default();
        let mut counted = 0usize;
        for sub in &self.subs {
            if sub.p_den == 0.0 && sub.r_den == 0.0 {
                continue;
            }
            let s = if self.only_split_antecedent {
                sub.split_scores()
            } else {
                sub.scores()
            };
            acc.recall += s.recall;
            acc.precision += s.precision;
            acc.f1 += s.f1;
            counted += 1;
        }
        if counted == 0 {
            return Scores::default();
        }
        Scores {
            recall: acc.recall / counted as f64,
            precision: acc.precision / counted as f64,
            f1: acc.f1 / counted as f64,
        }
    }
}

/// Score a corpus with one metric.
#[must_use]
pub fn evaluate_documents(docs: &[CorefInfo], metric: Metric, config: &EvalConfig) -> Scores {
    let mut evaluator = Evaluator::new(metric, config);
    for doc in docs {
        evaluator.update(doc);
    }
    evaluator.scores()
}

// ============================================================================
// Non-referring and bridging
// ============================================================================

fn prf_from_counts(tp: f64, fp: f64, fn_: f64) -> Scores {
    let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
    let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
    let f1 = if recall + precision > 0.0 {
        2.0 * recall * precision / (recall + precision)
    } else {
        0.0
    };
    Scores { recall, precision, f1 }
}

/// Exact-match P/R/F over per-document key and response non-referring
/// mention lists.
#[must_use]
pub fn evaluate_non_referring(docs: &[(Vec<Mention>, Vec<Mention>)]) -> Scores {
    let (mut tp, mut fp, mut fn_) = (0.0, 0.0, 0.0);
    for (key, sys) in docs {
        let sys_set: HashSet<&Mention> = sys.iter().collect();
        let key_set: HashSet<&Mention> = key.iter().collect();
        for m in key {
            if sys_set.contains(m) {
                tp += 1.0;
            } else {
                fn_ += 1.0;
            }
        }
        for m in sys {
            if !key_set.contains(m) {
                fp += 1.0;
            }
        }
    }
    prf_from_counts(tp, fp, fn_)
}

/// Bridging annotation of one document: anaphor to antecedent, plus
/// the key mention-to-cluster map for entity-level credit.
#[derive(Debug, Clone, Default)]
pub struct BridgingInfo {
    /// Gold anaphor to antecedent pairs.
    pub key_pairs: HashMap<Mention, Mention>,
    /// Response anaphor to antecedent pairs.
    pub sys_pairs: HashMap<Mention, Mention>,
    /// Key mention to cluster index.
    pub mention_to_key: ClusterMap,
}

/// Bridging scores at the three customary granularities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BridgingScores {
    /// Was the anaphor recognized at all.
    pub anaphora_recognition: Scores,
    /// Antecedent correct as a mention.
    pub mention_level: Scores,
    /// Antecedent in the correct entity.
    pub entity_level: Scores,
}

/// Score bridging pairs over a corpus.
///
/// An anaphor whose response antecedent differs from the gold one
/// still earns entity-level credit when both antecedents sit in the
/// same key cluster. Non-referring antecedents are outside the cluster
/// map and only match exactly.
#[must_use]
pub fn evaluate_bridging(docs: &[BridgingInfo]) -> BridgingScores {
    let (mut tp_ar, mut fp_ar, mut fn_ar) = (0.0, 0.0, 0.0);
    let (mut tp_m, mut fp_m, mut fn_m) = (0.0, 0.0, 0.0);
    let (mut tp_e, mut fp_e, mut fn_e) = (0.0, 0.0, 0.0);
    for doc in docs {
        let same_entity = |a: &Mention, b: &Mention| -> bool {
            match (doc.mention_to_key.get(a), doc.mention_to_key.get(b)) {
                (Some(ca), Some(cb)) => ca == cb,
                _ => false,
            }
        };
        for (k_ana, k_ant) in &doc.key_pairs {
            match doc.sys_pairs.get(k_ana) {
                Some(s_ant) => {
                    tp_ar += 1.0;
                    if s_ant == k_ant {
                        tp_m += 1.0;
                        tp_e += 1.0;
                    } else {
                        fn_m += 1.0;
                        if same_entity(k_ant, s_ant) {
                            tp_e += 1.0;
                        } else {
                            fn_e += 1.0;
                        }
                    }
                }
                None => {
                    fn_ar += 1.0;
                    fn_m += 1.0;
                    fn_e += 1.0;
                }
            }
        }
        for (s_ana, s_ant) in &doc.sys_pairs {
            match doc.key_pairs.get(s_ana) {
                Some(k_ant) => {
                    if s_ant != k_ant {
                        fp_m += 1.0;
                        if !same_entity(s_ant, k_ant) {
                            fp_e += 1.0;
                        }
                    }
                }
                None => {
                    fp_ar += 1.0;
                    fp_m += 1.0;
                    fp_e += 1.0;
                }
            }
        }
    }
    BridgingScores {
        anaphora_recognition: prf_from_counts(tp_ar, fp_ar, fn_ar),
        mention_level: prf_from_counts(tp_m, fp_m, fn_m),
        entity_level: prf_from_counts(tp_e, fp_e, fn_e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{align_clusters, AlignOptions};

    const TOL: f64 = 1e-4;

    fn m(ord: u32) -> Mention {
        Mention::span(0, ord, ord).unwrap()
    }

    fn cl(ords: &[u32]) -> Cluster {
        ords.iter().map(|&o| m(o)).collect()
    }

    fn doc(key: Vec<Cluster>, sys: Vec<Cluster>) -> CorefInfo {
        align_clusters(key, sys, &AlignOptions::default())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < TOL
    }

    #[test]
    fn perfect_match_scores_one() {
        let key = vec![cl(&[0, 1]), cl(&[2, 3, 4])];
        let docs = vec![doc(key.clone(), key)];
        let config = EvalConfig::default();
        for metric in [
            Metric::Muc,
            Metric::BCubed,
            Metric::CeafE,
            Metric::CeafM,
            Metric::Lea,
            Metric::Blanc,
            Metric::MentionOverlap,
            Metric::Mentions,
        ] {
            let s = evaluate_documents(&docs, metric, &config);
            assert!(close(s.recall, 1.0), "{metric:?} recall {}", s.recall);
            assert!(close(s.precision, 1.0), "{metric:?} precision {}", s.precision);
            assert!(close(s.f1, 1.0), "{metric:?} f1 {}", s.f1);
        }
    }

    #[test]
    fn disjoint_sides_score_zero() {
        let key = vec![cl(&[0, 1, 2])];
        let sys = vec![cl(&[10, 11, 12])];
        let docs = vec![doc(key, sys)];
        let config = EvalConfig::default();
        for metric in [Metric::Muc, Metric::BCubed, Metric::CeafE, Metric::Lea, Metric::Blanc] {
            let s = evaluate_documents(&docs, metric, &config);
            assert!(close(s.f1, 0.0), "{metric:?} f1 {}", s.f1);
        }
    }

    #[test]
    fn beta_weights_recall() {
        // Recall 1/2, precision 1: beta=2 favors recall.
        let f1 = f_beta(1.0, 1.0, 1.0, 2.0, 1.0);
        let f2 = f_beta(1.0, 1.0, 1.0, 2.0, 2.0);
        assert!(close(f1, 2.0 / 3.0));
        assert!(f2 < f1);
        assert!(close(f2, 5.0 * 1.0 * 0.5 / (4.0 + 0.5)));
    }

    #[test]
    fn blanc_skips_absent_link_class() {
        // All singletons on both sides: no coreference links exist, so
        // only the non-coreference class is counted.
        let key = vec![cl(&[0]), cl(&[1]), cl(&[2])];
        let docs = vec![doc(key.clone(), key)];
        let s = evaluate_documents(&docs, Metric::Blanc, &EvalConfig::default());
        assert!(close(s.recall, 1.0));
        assert!(close(s.precision, 1.0));
        assert!(close(s.f1, 1.0));
    }

    #[test]
    fn accumulates_over_documents() {
        let d1 = doc(vec![cl(&[0, 1])], vec![cl(&[0, 1])]);
        let d2 = doc(vec![cl(&[0, 1])], vec![cl(&[0, 5])]);
        let s = evaluate_documents(&[d1, d2], Metric::Muc, &EvalConfig::default());
        // Two key links, one recovered; two response links, one right.
        assert!(close(s.recall, 0.5));
        assert!(close(s.precision, 0.5));
    }

    #[test]
    fn non_referring_counts() {
        let key = vec![m(0), m(1)];
        let sys = vec![m(1), m(2)];
        let s = evaluate_non_referring(&[(key, sys)]);
        assert!(close(s.recall, 0.5));
        assert!(close(s.precision, 0.5));
        assert!(close(s.f1, 0.5));
    }

    #[test]
    fn bridging_entity_level_credit() {
        let key_cluster = vec![cl(&[0, 1]), cl(&[5])];
        let mut mention_to_key = ClusterMap::new();
        for (cid, c) in key_cluster.iter().enumerate() {
            for mm in c {
                mention_to_key.insert(mm.clone(), cid);
            }
        }
        // Key: anaphor 9 bridges to antecedent 0; the response picks 1,
        // a different mention of the same entity.
        let info = BridgingInfo {
            key_pairs: HashMap::from([(m(9), m(0))]),
            sys_pairs: HashMap::from([(m(9), m(1))]),
            mention_to_key,
        };
        let s = evaluate_bridging(&[info]);
        assert!(close(s.anaphora_recognition.f1, 1.0));
        assert!(close(s.mention_level.f1, 0.0));
        assert!(close(s.entity_level.f1, 1.0));
    }
}
