pub mod aggregate;
pub mod cache;
pub mod complexity;
pub mod config;
pub mod dependency;
pub mod error;
pub mod layer;
pub mod metrics;
pub mod node;
pub mod pipeline;
pub mod profile;
pub mod query;
pub mod report;
pub mod selector;
pub mod types;
pub mod usage;

pub use aggregate::ProjectTotals;
pub use config::Config;
pub use error::{ConfigError, TreeReadError};
pub use layer::PathClassifier;
pub use metrics::{Extractor, FileMetrics};
pub use node::{parse_tree, Node, Position};
pub use pipeline::{AnalysisOutcome, AnalysisPipeline};
pub use profile::{LanguageProfile, ProfileMetrics};
pub use query::{find_all, max_depth, resolve_path, PathQuery, PathStep};
pub use report::ProjectReport;
pub use selector::SelectorConfig;
pub use types::*;
