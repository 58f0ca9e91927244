//! Local, lexical text analysis.
//!
//! Everything here is pure and synchronous: OCR text cleanup
//! ([`normalize`]), token-set similarity ([`similarity`]), keyword topic
//! classification ([`classify_topic`]) and keyword bias scoring
//! ([`detect_bias`]). None of it is statistical; the lexicons are fixed.
pub mod bias;
pub mod normalize;
pub mod similarity;
pub mod topic;

pub use bias::{detect_bias, BiasAnalysis, BiasScores, PoliticalLean};
pub use normalize::normalize;
pub use similarity::similarity;
pub use topic::{classify_topic, TopicClassification};
