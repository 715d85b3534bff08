//! Cosine similarity and best-match selection.

use crate::sensors::EmbeddedParagraph;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimilarityError {
    #[error("dimension mismatch: query has {query} dimensions, stored embedding has {stored}")]
    DimensionMismatch { query: usize, stored: usize },

    /// Cosine similarity is undefined for a zero-norm vector; it is
    /// reported as a failure rather than scored 0.
    #[error("cannot compute similarity against a zero-norm vector")]
    ZeroNorm,

    #[error("sensor has no paragraph embeddings to match against")]
    NoParagraphs,
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity `(u·v)/(‖u‖·‖v‖)`, in [-1, 1].
pub fn cosine_similarity(u: &[f32], v: &[f32]) -> Result<f32, SimilarityError> {
    if u.len() != v.len() {
        return Err(SimilarityError::DimensionMismatch {
            query: u.len(),
            stored: v.len(),
        });
    }

    let norm_u = l2_norm(u);
    let norm_v = l2_norm(v);
    if norm_u < f32::EPSILON || norm_v < f32::EPSILON {
        return Err(SimilarityError::ZeroNorm);
    }

    let dot: f32 = u.iter().zip(v.iter()).map(|(a, b)| a * b).sum();
    Ok(dot / (norm_u * norm_v))
}

/// Score `query` against every stored paragraph and return the best one.
///
/// Ties go to the paragraph inserted first: only a strictly higher score
/// displaces the current best, so results are deterministic for equal
/// scores.
pub fn best_match<'a>(
    query: &[f32],
    paragraphs: &'a [EmbeddedParagraph],
) -> Result<(f32, &'a EmbeddedParagraph), SimilarityError> {
    let mut best: Option<(f32, &EmbeddedParagraph)> = None;

    for paragraph in paragraphs {
        let score = cosine_similarity(query, &paragraph.embedding)?;
        match best {
            Some((best_score, _)) if score <= best_score => {}
            _ => best = Some((score, paragraph)),
        }
    }

    best.ok_or(SimilarityError::NoParagraphs)
}
