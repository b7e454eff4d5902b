//! Packaging recommendations
//!
//! Two independent paths share the same air-quality reading:
//! - the local [`RecommendationSelector`] over the static [`RuleTable`]
//! - the [`RecommendationProxy`], which asks a language model for one pick
//!
//! The selector is pure and never fails; the proxy is a single best-effort
//! network round trip.

pub mod parse;
pub mod prompt;
pub mod proxy;
pub mod rules;
pub mod selector;

pub use parse::{parse_recommendation, strip_code_fences};
pub use proxy::{EMPTY_CHAT_REPLY, LabeledTurn, RecommendationProxy, filter_history};
pub use rules::RuleTable;
pub use selector::{Evaluation, RecommendationSelector};
