use serde::{Deserialize, Serialize};

use super::RankedResult;

pub const DOCUMENT_DELIMITER: &str = "\n\n----------------\n\n";
pub const TRENDING_MARKER: &str = "🔥 [POPULAR/TRENDING]";

/// A compact reference to a ranked result for downstream enrichment such as source cards.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PreviewCard {
	pub id: String,
	pub title: String,
	pub category: String,
	pub rank: u32,
	pub is_trending: bool,
}

/// Renders the evidence block handed to answer generation.
pub fn build_context(ranked: &[RankedResult]) -> String {
	ranked
		.iter()
		.enumerate()
		.map(|(idx, result)| {
			let mut block = format!("[Document {}]", idx + 1);

			if result.document.provenance.is_trending {
				block.push(' ');
				block.push_str(TRENDING_MARKER);
			}

			block.push('\n');
			block.push_str(&result.document.text);

			block
		})
		.collect::<Vec<_>>()
		.join(DOCUMENT_DELIMITER)
}

pub fn preview(ranked: &[RankedResult], limit: usize) -> Vec<PreviewCard> {
	ranked
		.iter()
		.take(limit)
		.map(|result| PreviewCard {
			id: result.document.id.clone(),
			title: result.document.title.clone(),
			category: result.document.category.clone(),
			rank: result.rank,
			is_trending: result.document.provenance.is_trending,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::CandidateDocument;
	use trove_domain::provenance::{Provenance, SourceKind, SourceScores};

	fn result(id: &str, source: SourceKind, rank: u32) -> RankedResult {
		RankedResult {
			document: CandidateDocument {
				id: id.to_string(),
				title: format!("Place {id}"),
				category: "Temples".to_string(),
				text: format!("Title: Place {id}"),
				provenance: Provenance::from_source(source),
				source_scores: SourceScores::default(),
			},
			raw_score: 0.5,
			boosted_score: 0.5,
			rank,
		}
	}

	#[test]
	fn labels_and_marks_trending_without_touching_titles() {
		let ranked = [result("a", SourceKind::Semantic, 1), result("b", SourceKind::Trending, 2)];
		let context = build_context(&ranked);

		assert_eq!(
			context,
			"[Document 1]\nTitle: Place a\n\n----------------\n\n[Document 2] 🔥 [POPULAR/TRENDING]\nTitle: Place b"
		);
		assert_eq!(ranked[1].document.title, "Place b");
	}

	#[test]
	fn empty_ranking_renders_empty_context() {
		assert_eq!(build_context(&[]), "");
	}

	#[test]
	fn preview_is_capped() {
		let ranked: Vec<_> =
			(1..=7).map(|idx| result(&idx.to_string(), SourceKind::Semantic, idx)).collect();
		let cards = preview(&ranked, 5);

		assert_eq!(cards.len(), 5);
		assert_eq!(cards[4].rank, 5);
		assert!(!cards[0].is_trending);
	}
}
