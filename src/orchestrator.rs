use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cluster::{cluster, Clustering};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::eval::{evaluate, Evaluation};
use crate::events::{extract_for_document, Granularity};
use crate::filter::{apply_filters, filter_by_cluster};
use crate::models::{Corpus, DocumentResult, Event};
use crate::report::{cluster_records, document_records, event_records, ClusterSummary, Record, KEYWORD_LIMIT};
use crate::similarity::{event_distance_matrix, TermVectors};
use crate::text::Tokenizer;

/// Fewer retained documents than this are not vectorized.
pub const MIN_DOCUMENTS_TO_CLUSTER: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentClustering {
    /// Too few documents; every retained one sits in cluster 1.
    Trivial,
    Clustered(Clustering),
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub documents: Vec<DocumentResult>,
    pub clusters: Vec<ClusterSummary>,
    pub document_clustering: DocumentClustering,
    /// Events of the retained documents, in document order.
    pub events: Vec<Event>,
    /// `None` when fewer than two events were extracted.
    pub event_clustering: Option<Clustering>,
    pub evaluation: Option<Evaluation>,
}

impl PipelineOutput {
    pub fn document_records(&self) -> Vec<Record> {
        document_records(&self.documents)
    }

    pub fn cluster_records(&self) -> Vec<Record> {
        cluster_records(&self.documents, &self.clusters)
    }

    pub fn event_records(&self) -> Vec<Record> {
        event_records(&self.events)
    }
}

pub fn run_pipeline(corpus: Corpus, config: &PipelineConfig) -> Result<PipelineOutput> {
    let pipeline_start = Instant::now();
    config.validate()?;
    let Corpus { documents, reference } = corpus;
    info!("Pipeline started - documents={}, granularity={:?}", documents.len(), config.granularity);

    let results = documents
        .into_iter()
        .map(|d| d.into_result())
        .collect::<Result<Vec<_>>>()?;
    let results = apply_filters(&results, &config.document_filters());

    // 1) first extraction
    let extract_start = Instant::now();
    let results = extraction_pass(&results, config.granularity)?;
    info!(
        "First extraction completed - duration={:.2}s, retained={}",
        extract_start.elapsed().as_secs_f32(),
        retained(&results)
    );

    // 2) document clustering
    let cluster_start = Instant::now();
    let (results, clusters, document_clustering) = cluster_documents(&results, config)?;
    info!(
        "Document clustering completed - duration={:.2}s, clusters={}",
        cluster_start.elapsed().as_secs_f32(),
        clusters.len()
    );

    // 3) denoise mentions, then extract again from what survived
    let results = filter_by_cluster(&results, config.cluster_threshold)?;
    let extract_start = Instant::now();
    let results = extraction_pass(&results, config.granularity)?;
    info!(
        "Second extraction completed - duration={:.2}s, retained={}",
        extract_start.elapsed().as_secs_f32(),
        retained(&results)
    );

    // 4) event clustering
    let (results, event_clustering) = cluster_events(&results, config)?;
    let events: Vec<Event> = results
        .iter()
        .filter(|r| r.is_retained())
        .flat_map(|r| r.events.iter().cloned())
        .collect();

    // 5) evaluation
    let evaluation = match &reference {
        Some(r) => Some(evaluate(&results, r, config.query_period.as_ref())?),
        None => {
            debug!("No reference annotations - evaluation skipped");
            None
        }
    };

    info!(
        "Pipeline completed - total_duration={:.2}s, documents={}, retained={}, clusters={}, events={}",
        pipeline_start.elapsed().as_secs_f32(),
        results.len(),
        retained(&results),
        clusters.len(),
        events.len()
    );

    Ok(PipelineOutput {
        documents: results,
        clusters,
        document_clustering,
        events,
        event_clustering,
        evaluation,
    })
}

fn retained(results: &[DocumentResult]) -> usize {
    results.iter().filter(|r| r.is_retained()).count()
}

fn extraction_pass(results: &[DocumentResult], granularity: Granularity) -> Result<Vec<DocumentResult>> {
    let mut notes = 0usize;
    let mut out = Vec::with_capacity(results.len());
    for r in results {
        let (next, n) = extract_for_document(r, granularity)?;
        notes += n.len();
        out.push(next);
    }
    debug!("Extraction pass - documents={}, skipped_scopes={}", results.len(), notes);
    Ok(out)
}

fn cluster_documents(
    results: &[DocumentResult],
    config: &PipelineConfig,
) -> Result<(Vec<DocumentResult>, Vec<ClusterSummary>, DocumentClustering)> {
    let mut out = results.to_vec();
    let kept: Vec<usize> = (0..out.len()).filter(|&i| out[i].is_retained()).collect();

    if kept.len() < MIN_DOCUMENTS_TO_CLUSTER {
        warn!("Too few documents to cluster - retained={}, assigning a single cluster", kept.len());
        for &i in &kept {
            out[i].cluster_id = Some(1);
        }
        let clusters = if kept.is_empty() {
            Vec::new()
        } else {
            vec![ClusterSummary { cluster: 1, members: kept, keywords: Vec::new() }]
        };
        return Ok((out, clusters, DocumentClustering::Trivial));
    }

    let stop_words = config.stop_words();
    let tokens: Vec<Vec<String>> = kept
        .iter()
        .map(|&i| {
            let doc = &out[i].document;
            let lang = doc.language.as_deref().unwrap_or(&config.default_language);
            Tokenizer::new(stop_words.for_language(lang)).tokenize(&doc.text)
        })
        .collect();
    let vectors = TermVectors::from_tokens(&tokens);
    let matrix = vectors.distance_matrix();

    let Some(clustering) = cluster(&matrix, config.clustering)? else {
        return Ok((out, Vec::new(), DocumentClustering::Trivial));
    };

    for (pos, &i) in kept.iter().enumerate() {
        out[i].cluster_id = Some(clustering.partition.label(pos));
    }
    let clusters = clustering
        .partition
        .groups()
        .into_iter()
        .enumerate()
        .map(|(g, positions)| ClusterSummary {
            cluster: g + 1,
            keywords: vectors
                .top_terms(&positions, KEYWORD_LIMIT)
                .into_iter()
                .map(|(term, _)| term)
                .collect(),
            members: positions.iter().map(|&p| kept[p]).collect(),
        })
        .collect();

    Ok((out, clusters, DocumentClustering::Clustered(clustering)))
}

fn cluster_events(results: &[DocumentResult], config: &PipelineConfig) -> Result<(Vec<DocumentResult>, Option<Clustering>)> {
    let mut out = results.to_vec();
    // (document, event) coordinates in flattening order
    let slots: Vec<(usize, usize)> = out
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_retained())
        .flat_map(|(d, r)| (0..r.events.len()).map(move |e| (d, e)))
        .collect();
    let events: Vec<Event> = slots.iter().map(|&(d, e)| out[d].events[e].clone()).collect();

    let start = Instant::now();
    let matrix = event_distance_matrix(&events);
    let Some(clustering) = cluster(&matrix, config.clustering)? else {
        debug!("Event clustering skipped - events={}", events.len());
        return Ok((out, None));
    };
    for (pos, &(d, e)) in slots.iter().enumerate() {
        out[d].events[e].cluster_id = Some(clustering.partition.label(pos));
    }
    info!(
        "Event clustering completed - duration={:.2}s, events={}, clusters={}",
        start.elapsed().as_secs_f32(),
        events.len(),
        clustering.partition.k()
    );
    Ok((out, Some(clustering)))
}
