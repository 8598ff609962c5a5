use std::collections::HashMap;

use trove_domain::{
	entry::KnowledgeEntry,
	provenance::{Provenance, SourceKind, SourceScores},
};

/// One candidate as produced by a single source, with that source's local score.
#[derive(Clone, Debug)]
pub struct SourceHit {
	pub source: SourceKind,
	pub entry: KnowledgeEntry,
	pub score: f32,
}

#[derive(Clone, Debug)]
pub struct FusedCandidate {
	pub entry: KnowledgeEntry,
	pub provenance: Provenance,
	pub scores: SourceScores,
}

/// Merges hits by entry id in first-seen order. Duplicates OR their provenance and keep the max
/// score per source kind.
pub fn fuse(hits: Vec<SourceHit>) -> Vec<FusedCandidate> {
	let mut positions: HashMap<String, usize> = HashMap::with_capacity(hits.len());
	let mut fused: Vec<FusedCandidate> = Vec::with_capacity(hits.len());

	for hit in hits {
		let id = hit.entry.id.trim().to_string();

		if id.is_empty() {
			continue;
		}

		if let Some(&pos) = positions.get(&id) {
			let existing = &mut fused[pos];

			existing.provenance.mark(hit.source);
			existing.scores.record(hit.source, hit.score);

			// Index payloads may omit details; prefer whichever copy carries the full record.
			if existing.entry.details.is_empty() && !hit.entry.details.is_empty() {
				existing.entry = hit.entry;
			}

			continue;
		}

		let mut scores = SourceScores::default();

		scores.record(hit.source, hit.score);
		positions.insert(id, fused.len());
		fused.push(FusedCandidate {
			entry: hit.entry,
			provenance: Provenance::from_source(hit.source),
			scores,
		});
	}

	fused
}

#[cfg(test)]
mod tests {
	use super::*;
	use trove_domain::entry::EntryDetail;

	fn hit(source: SourceKind, id: &str, score: f32) -> SourceHit {
		SourceHit {
			source,
			entry: KnowledgeEntry {
				id: id.to_string(),
				title: format!("Title {id}"),
				..Default::default()
			},
			score,
		}
	}

	#[test]
	fn duplicates_merge_into_one_candidate() {
		let fused = fuse(vec![
			hit(SourceKind::Semantic, "a", 0.4),
			hit(SourceKind::Semantic, "b", 0.9),
			hit(SourceKind::Trending, "a", 0.85),
			hit(SourceKind::Semantic, "a", 0.6),
		]);

		assert_eq!(fused.len(), 2);
		assert_eq!(fused[0].entry.id, "a");
		assert_eq!(fused[1].entry.id, "b");
		assert!(fused[0].provenance.is_semantic);
		assert!(fused[0].provenance.is_trending);
		assert!(!fused[0].provenance.is_direct_match);
		assert_eq!(fused[0].scores.semantic, Some(0.6));
		assert_eq!(fused[0].scores.trending, Some(0.85));
	}

	#[test]
	fn blank_ids_are_dropped() {
		let fused =
			fuse(vec![hit(SourceKind::Fallback, "  ", 1.0), hit(SourceKind::Fallback, "x", 1.0)]);

		assert_eq!(fused.len(), 1);
		assert_eq!(fused[0].entry.id, "x");
	}

	#[test]
	fn richer_entry_replaces_payload_copy() {
		let mut full = hit(SourceKind::Direct, "a", 1.5);

		full.entry.details =
			vec![EntryDetail { heading: "Hours".to_string(), content: "08:00".to_string() }];

		let fused = fuse(vec![hit(SourceKind::Semantic, "a", 0.7), full]);

		assert_eq!(fused.len(), 1);
		assert_eq!(fused[0].entry.details.len(), 1);
		assert!(fused[0].provenance.is_direct_match);
	}
}
