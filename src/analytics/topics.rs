use std::collections::{BTreeMap, HashSet};

use log::debug;
use once_cell::sync::Lazy;

use super::tokenize;

const MAX_ITERATIONS: usize = 50;
const LABEL_TERMS: usize = 3;
pub const UNCLUSTERED_LABEL: &str = "(none)";

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "your", "all", "any", "can", "had", "her",
        "was", "one", "our", "out", "has", "have", "him", "his", "how", "its", "may", "new", "now",
        "see", "two", "who", "did", "get", "let", "say", "she", "too", "use", "this", "that", "with",
        "from", "they", "will", "would", "there", "their", "what", "about", "which", "when", "make",
        "like", "time", "just", "know", "take", "into", "year", "some", "could", "them", "than",
        "then", "look", "only", "come", "over", "also", "back", "after", "work", "first", "well",
        "even", "want", "because", "these", "give", "most", "been", "were", "here", "please",
        "thanks", "thank", "regards", "best", "hello", "dear", "sent", "email", "mail", "message",
        "http", "https", "www", "com", "fwd", "re", "fw", "subject", "should", "being", "does",
        "doing", "each", "more", "other", "such", "very", "where", "while", "why", "yes", "yet",
    ]
    .into_iter()
    .collect()
});

/// Topic of every document plus a label per cluster
#[derive(Debug, Clone, Default)]
pub struct TopicModel {
    /// Cluster index per document; None when the document has no usable terms
    pub assignments: Vec<Option<usize>>,
    pub labels: Vec<String>,
}

impl TopicModel {
    pub fn label_of(&self, document: usize) -> &str {
        self.assignments
            .get(document)
            .copied()
            .flatten()
            .and_then(|cluster| self.labels.get(cluster))
            .map(String::as_str)
            .unwrap_or(UNCLUSTERED_LABEL)
    }
}

/// Sparse, L2-normalized TF-IDF vector (term index, weight), sorted by index
type SparseVector = Vec<(usize, f64)>;

/// Group documents into at most `k` topics with TF-IDF vectors and k-means.
///
/// Seeding is deterministic (farthest-point), so the same input always gives
/// the same clusters.
pub fn cluster_topics(documents: &[String], k: usize) -> TopicModel {
    let token_lists: Vec<Vec<String>> = documents
        .iter()
        .map(|doc| {
            tokenize(doc)
                .into_iter()
                .filter(|t| t.len() >= 3 && !STOPWORDS.contains(t.as_str()))
                .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
                .collect()
        })
        .collect();

    let (vocabulary, vectors) = tfidf(&token_lists);
    let usable: Vec<usize> = (0..vectors.len()).filter(|&i| !vectors[i].is_empty()).collect();

    let k = k.min(usable.len());
    if k == 0 {
        return TopicModel {
            assignments: vec![None; documents.len()],
            labels: Vec::new(),
        };
    }

    let mut centroids = seed_centroids(&vectors, &usable, k, vocabulary.len());
    let mut assignments: Vec<Option<usize>> = vec![None; documents.len()];

    for iteration in 0..MAX_ITERATIONS {
        let mut changed = false;
        for &doc in &usable {
            let best = nearest(&vectors[doc], &centroids);
            if assignments[doc] != Some(best) {
                assignments[doc] = Some(best);
                changed = true;
            }
        }

        centroids = recompute_centroids(&vectors, &assignments, &centroids, vocabulary.len());

        if !changed {
            debug!("k-means converged after {} iteration(s)", iteration + 1);
            break;
        }
    }

    let labels = centroids
        .iter()
        .map(|centroid| label_for(centroid, &vocabulary))
        .collect();

    TopicModel { assignments, labels }
}

fn tfidf(token_lists: &[Vec<String>]) -> (Vec<String>, Vec<SparseVector>) {
    // BTreeMap for a stable term order
    let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for tokens in token_lists {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            *document_frequency.entry(term).or_insert(0) += 1;
        }
    }

    let vocabulary: Vec<String> = document_frequency.keys().map(|t| t.to_string()).collect();
    let index: BTreeMap<&str, usize> = document_frequency
        .keys()
        .enumerate()
        .map(|(i, t)| (*t, i))
        .collect();

    let n = token_lists.len() as f64;
    let vectors = token_lists
        .iter()
        .map(|tokens| {
            let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
            for token in tokens {
                if let Some(&i) = index.get(token.as_str()) {
                    *counts.entry(i).or_insert(0.0) += 1.0;
                }
            }
            let mut vector: SparseVector = counts
                .into_iter()
                .map(|(i, tf)| {
                    let df = document_frequency[vocabulary[i].as_str()] as f64;
                    (i, tf * (((1.0 + n) / (1.0 + df)).ln() + 1.0))
                })
                .collect();
            normalize_sparse(&mut vector);
            vector
        })
        .collect();

    (vocabulary, vectors)
}

fn normalize_sparse(vector: &mut SparseVector) {
    let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in vector.iter_mut() {
            *w /= norm;
        }
    }
}

fn dot(vector: &SparseVector, centroid: &[f64]) -> f64 {
    vector.iter().map(|&(i, w)| w * centroid[i]).sum()
}

fn to_dense(vector: &SparseVector, dimensions: usize) -> Vec<f64> {
    let mut dense = vec![0.0; dimensions];
    for &(i, w) in vector {
        dense[i] = w;
    }
    dense
}

fn nearest(vector: &SparseVector, centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_similarity = f64::NEG_INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let similarity = dot(vector, centroid);
        if similarity > best_similarity {
            best = c;
            best_similarity = similarity;
        }
    }
    best
}

/// First usable document, then repeatedly the one least similar to every chosen seed
fn seed_centroids(vectors: &[SparseVector], usable: &[usize], k: usize, dimensions: usize) -> Vec<Vec<f64>> {
    let mut centroids = vec![to_dense(&vectors[usable[0]], dimensions)];
    let mut chosen = vec![usable[0]];

    while centroids.len() < k {
        let next = usable
            .iter()
            .copied()
            .filter(|doc| !chosen.contains(doc))
            .map(|doc| {
                let closest = centroids
                    .iter()
                    .map(|c| dot(&vectors[doc], c))
                    .fold(f64::NEG_INFINITY, f64::max);
                (doc, closest)
            })
            .fold(None, |best: Option<(usize, f64)>, (doc, similarity)| match best {
                Some((_, s)) if s <= similarity => best,
                _ => Some((doc, similarity)),
            });

        match next {
            Some((doc, _)) => {
                centroids.push(to_dense(&vectors[doc], dimensions));
                chosen.push(doc);
            }
            None => break,
        }
    }

    centroids
}

fn recompute_centroids(
    vectors: &[SparseVector],
    assignments: &[Option<usize>],
    previous: &[Vec<f64>],
    dimensions: usize,
) -> Vec<Vec<f64>> {
    let mut sums = vec![vec![0.0; dimensions]; previous.len()];
    let mut members = vec![0usize; previous.len()];

    for (doc, assignment) in assignments.iter().enumerate() {
        if let Some(cluster) = *assignment {
            members[cluster] += 1;
            for &(i, w) in &vectors[doc] {
                sums[cluster][i] += w;
            }
        }
    }

    sums.into_iter()
        .zip(members)
        .enumerate()
        .map(|(cluster, (mut sum, count))| {
            if count == 0 {
                // empty cluster keeps its previous centroid
                return previous[cluster].clone();
            }
            let norm = sum.iter().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                sum.iter_mut().for_each(|w| *w /= norm);
            }
            sum
        })
        .collect()
}

fn label_for(centroid: &[f64], vocabulary: &[String]) -> String {
    let mut terms: Vec<(usize, f64)> = centroid
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, w)| *w > 0.0)
        .collect();
    // heaviest first, alphabetical on ties
    terms.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let label: Vec<&str> = terms
        .iter()
        .take(LABEL_TERMS)
        .map(|(i, _)| vocabulary[*i].as_str())
        .collect();

    if label.is_empty() {
        UNCLUSTERED_LABEL.to_string()
    } else {
        label.join("/")
    }
}
