//! Aggregation and clustering over mention-annotated news documents: event
//! extraction, tf-idf and Jaccard distances, complete-link clustering cut at
//! the best silhouette (or k-medoids), cluster-based mention denoising, and
//! agreement metrics against a human reference.

pub mod cluster;
pub mod config;
pub mod error;
pub mod eval;
pub mod events;
pub mod filter;
pub mod matrix;
pub mod medoids;
pub mod mention;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod similarity;
pub mod temporal;
pub mod text;

pub use cluster::{cluster, cluster_hierarchical, silhouette, Clustering, ClusteringMethod, Dendrogram, Partition};
pub use config::{FilterConfig, PipelineConfig};
pub use error::{Error, Result};
pub use events::{extract_events, Granularity};
pub use matrix::DistanceMatrix;
pub use mention::{Mention, MentionType, Span};
pub use models::{Corpus, CorpusDocument, Document, DocumentResult, Event};
pub use orchestrator::{run_pipeline, DocumentClustering, PipelineOutput};
pub use temporal::{Period, TemporalValue};
