use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
	Direct,
	Trending,
	Semantic,
	Fallback,
}
impl SourceKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Direct => "direct",
			Self::Trending => "trending",
			Self::Semantic => "semantic",
			Self::Fallback => "fallback",
		}
	}
}

/// Which sources produced a candidate. Merging two records ORs every flag.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Provenance {
	pub is_direct_match: bool,
	pub is_trending: bool,
	pub is_semantic: bool,
	pub is_fallback: bool,
}
impl Provenance {
	pub fn from_source(source: SourceKind) -> Self {
		let mut out = Self::default();

		out.mark(source);

		out
	}

	pub fn mark(&mut self, source: SourceKind) {
		match source {
			SourceKind::Direct => self.is_direct_match = true,
			SourceKind::Trending => self.is_trending = true,
			SourceKind::Semantic => self.is_semantic = true,
			SourceKind::Fallback => self.is_fallback = true,
		}
	}

	pub fn merge(self, other: Self) -> Self {
		Self {
			is_direct_match: self.is_direct_match || other.is_direct_match,
			is_trending: self.is_trending || other.is_trending,
			is_semantic: self.is_semantic || other.is_semantic,
			is_fallback: self.is_fallback || other.is_fallback,
		}
	}

	/// Direct and trending candidates carry trust that does not come from similarity.
	pub fn is_trusted(&self) -> bool {
		self.is_direct_match || self.is_trending
	}

	/// Tie-break tier: lower sorts first.
	pub fn tier(&self) -> u8 {
		if self.is_direct_match {
			0
		} else if self.is_trending {
			1
		} else {
			2
		}
	}
}

/// Best source-local score per source kind. Scores of different kinds are not comparable.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SourceScores {
	pub direct: Option<f32>,
	pub trending: Option<f32>,
	pub semantic: Option<f32>,
	pub fallback: Option<f32>,
}
impl SourceScores {
	pub fn get(&self, source: SourceKind) -> Option<f32> {
		match source {
			SourceKind::Direct => self.direct,
			SourceKind::Trending => self.trending,
			SourceKind::Semantic => self.semantic,
			SourceKind::Fallback => self.fallback,
		}
	}

	pub fn record(&mut self, source: SourceKind, score: f32) {
		let slot = match source {
			SourceKind::Direct => &mut self.direct,
			SourceKind::Trending => &mut self.trending,
			SourceKind::Semantic => &mut self.semantic,
			SourceKind::Fallback => &mut self.fallback,
		};

		*slot = Some(match *slot {
			Some(existing) if existing >= score || score.is_nan() => existing,
			_ => score,
		});
	}

	/// Highest score across kinds, used only when no comparable reranker score exists.
	pub fn best(&self) -> Option<f32> {
		[self.direct, self.trending, self.semantic, self.fallback]
			.into_iter()
			.flatten()
			.filter(|score| score.is_finite())
			.reduce(f32::max)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merge_ors_flags() {
		let merged = Provenance::from_source(SourceKind::Semantic)
			.merge(Provenance::from_source(SourceKind::Trending));

		assert!(merged.is_semantic);
		assert!(merged.is_trending);
		assert!(!merged.is_direct_match);
		assert!(merged.is_trusted());
		assert_eq!(merged.tier(), 1);
	}

	#[test]
	fn record_keeps_max_per_kind() {
		let mut scores = SourceScores::default();

		scores.record(SourceKind::Semantic, 0.4);
		scores.record(SourceKind::Semantic, 0.7);
		scores.record(SourceKind::Semantic, 0.5);
		scores.record(SourceKind::Direct, 1.5);

		assert_eq!(scores.semantic, Some(0.7));
		assert_eq!(scores.direct, Some(1.5));
		assert_eq!(scores.trending, None);
		assert_eq!(scores.best(), Some(1.5));
	}
}
