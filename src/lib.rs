//! # corefscore
//!
//! Coreference resolution scoring.
//!
//! - **Metrics**: MUC, B³, CEAF-e/m, BLANC, LEA, mention overlap,
//!   anaphor-level zero score
//! - **Alignment**: exact, partial (CorefUD and CRAFT style) and
//!   zero-mention matching between key and response
//! - **Plurals**: split-antecedent alignment with fractional credit
//! - **Extras**: bridging and non-referring scoring, CoNLL average
//!
//! ## Quick start
//!
//! Build key and response clusters, align them once, then score the
//! aligned documents with any metric:
//!
//! ```
//! use corefscore::{
//!     align_clusters, evaluate_documents, AlignOptions, Cluster, EvalConfig, Mention, Metric,
//! };
//!
//! # fn main() -> corefscore::Result<()> {
//! let key = vec![
//!     Cluster::new(vec![Mention::span(0, 0, 1)?, Mention::span(0, 7, 7)?]),
//!     Cluster::new(vec![Mention::span(0, 3, 4)?]),
//! ];
//! let sys = key.clone();
//! let doc = align_clusters(key, sys, &AlignOptions::default());
//! let scores = evaluate_documents(&[doc], Metric::Muc, &EvalConfig::default());
//! assert!((scores.f1 - 1.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//!
//! | Metric | Granularity | Singleton-aware |
//! |--------|-------------|-----------------|
//! | `Metric::Muc` | links | No |
//! | `Metric::BCubed` | mentions | Yes |
//! | `Metric::CeafM` / `Metric::CeafE` | mentions / entities | Yes |
//! | `Metric::Blanc` | link pairs | Yes |
//! | `Metric::Lea` | weighted links | Yes |
//! | `Metric::MentionOverlap` | tokens | Yes |
//! | `Metric::Zeros` | zero anaphors | No |
//! | `Metric::Mentions` | mention detection | Yes |

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod align;
pub mod assignment;
pub mod error;
pub mod evaluator;
pub mod mention;
pub mod metrics;

pub use align::{align_clusters, drop_singletons, AlignOptions, CorefInfo};
pub use error::{Error, Result};
pub use evaluator::{
    conll_average, evaluate_bridging, evaluate_documents, evaluate_non_referring, f_beta,
    BridgingInfo, BridgingScores, EvalConfig, Evaluator, Scores,
};
pub use mention::{Cluster, MatchMethod, Mention, Word, ZeroMatch};
pub use metrics::Metric;
