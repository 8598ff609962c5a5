use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::entry::KnowledgeEntry;

/// Advisory metadata constraints. An absent field leaves that dimension unconstrained.
///
/// Values match stored labels exactly after trimming, including case. The vector index applies
/// the same filter as keyword conditions, so [`MetadataFilter::admits`] must not be looser.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MetadataFilter {
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub district: Option<String>,
	#[serde(default)]
	pub sub_district: Option<String>,
	#[serde(default)]
	pub exclude_categories: Vec<String>,
}
impl MetadataFilter {
	/// True when the filter narrows the result set. Exclusions alone do not count.
	pub fn is_active(&self) -> bool {
		[&self.category, &self.district, &self.sub_district]
			.into_iter()
			.any(|value| value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false))
	}

	/// Local check for sources that bypass the vector index filter.
	pub fn admits(&self, entry: &KnowledgeEntry) -> bool {
		let same = |want: &str, have: &str| want.trim() == have.trim();

		if self.exclude_categories.iter().any(|excluded| same(excluded, &entry.category)) {
			return false;
		}

		[
			(&self.category, Some(entry.category.as_str())),
			(&self.district, entry.district.as_deref()),
			(&self.sub_district, entry.sub_district.as_deref()),
		]
		.into_iter()
		.all(|(want, have)| match want.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
			Some(want) => have.map(|have| same(want, have)).unwrap_or(false),
			None => true,
		})
	}

	/// Returns a copy with blank fields dropped and `extra_excludes` merged in, order preserved.
	pub fn normalized(&self, extra_excludes: &[String]) -> Self {
		let clean = |value: &Option<String>| {
			value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
		};
		let mut exclude_categories: Vec<String> = Vec::new();

		for category in self.exclude_categories.iter().chain(extra_excludes) {
			let category = category.trim();

			if !category.is_empty() && !exclude_categories.iter().any(|c| c == category) {
				exclude_categories.push(category.to_string());
			}
		}

		Self {
			category: clean(&self.category),
			district: clean(&self.district),
			sub_district: clean(&self.sub_district),
			exclude_categories,
		}
	}
}

/// NFKC-normalizes, lowercases and collapses whitespace.
pub fn normalize_text(text: &str) -> String {
	let folded: String = text.nfkc().collect::<String>().to_lowercase();

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A continuation query refers back to the previous turn's topic, e.g. "take me there".
pub fn is_continuation(text: &str, markers: &[String]) -> bool {
	let normalized = normalize_text(text);

	if normalized.is_empty() {
		return false;
	}

	markers.iter().any(|marker| {
		let marker = normalize_text(marker);

		!marker.is_empty() && normalized.contains(marker.as_str())
	})
}

/// Broad queries name no entity and carry no narrowing filter.
pub fn is_broad(entity: Option<&str>, filter: &MetadataFilter) -> bool {
	let has_entity = entity.map(|value| !value.trim().is_empty()).unwrap_or(false);

	!has_entity && !filter.is_active()
}
