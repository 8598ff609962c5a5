//! Fuzzy title lookup used for direct entity resolution and the text-search fallback.
//!
//! Matching compares the query against a prefix of each title (query length plus a small
//! slack), so "Wat Phumn" still finds "Wat Phumin (Royal Temple)". The similarity is the
//! gestalt pattern-matching ratio `2 * M / T`, where `M` is the number of characters in
//! recursively found longest common blocks and `T` the combined length.

use trove_config::TitleMatch;

use crate::query::normalize_text;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TitleHit {
	pub index: usize,
	pub ratio: f32,
}

/// Case-insensitive substring test after normalization.
pub fn title_contains(title: &str, query: &str) -> bool {
	let query = normalize_text(query);

	!query.is_empty() && normalize_text(title).contains(query.as_str())
}

/// Resolves `query` to an index into `titles`: the shortest title containing the query wins,
/// earliest first on equal length. Without a substring hit the best fuzzy match is used.
pub fn resolve_title<'a, I>(query: &str, titles: I, cfg: &TitleMatch) -> Option<usize>
where
	I: IntoIterator<Item = &'a str>,
	I::IntoIter: Clone,
{
	let titles = titles.into_iter();
	let substring = titles
		.clone()
		.enumerate()
		.filter(|(_, title)| title_contains(title, query))
		.min_by_key(|(index, title)| (title.chars().count(), *index))
		.map(|(index, _)| index);

	substring.or_else(|| best_title_match(query, titles, cfg).map(|hit| hit.index))
}

/// Returns the best fuzzy hit above the configured cutoff. Ties keep the earliest title.
pub fn best_title_match<'a, I>(query: &str, titles: I, cfg: &TitleMatch) -> Option<TitleHit>
where
	I: IntoIterator<Item = &'a str>,
{
	let query: Vec<char> = normalize_text(query).chars().collect();

	if query.is_empty() {
		return None;
	}

	let cutoff = if query.len() <= cfg.short_query_chars as usize {
		cfg.short_cutoff
	} else {
		cfg.long_cutoff
	};
	let compare_len = query.len() + cfg.prefix_slack as usize;
	let mut best: Option<TitleHit> = None;

	for (index, title) in titles.into_iter().enumerate() {
		let prefix: Vec<char> = normalize_text(title).chars().take(compare_len).collect();
		let ratio = similarity(&query, &prefix);

		if ratio > cutoff && best.map(|hit| ratio > hit.ratio).unwrap_or(true) {
			best = Some(TitleHit { index, ratio });
		}
	}

	best
}

pub fn similarity(a: &[char], b: &[char]) -> f32 {
	let total = a.len() + b.len();

	if total == 0 {
		return 1.0;
	}

	(2 * matching_chars(a, b)) as f32 / total as f32
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
	let (i, j, len) = longest_common_block(a, b);

	if len == 0 {
		return 0;
	}

	len + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + len..], &b[j + len..])
}

fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
	if a.is_empty() || b.is_empty() {
		return (0, 0, 0);
	}

	let mut prev = vec![0_usize; b.len() + 1];
	let mut cur = vec![0_usize; b.len() + 1];
	let (mut best_i, mut best_j, mut best_len) = (0, 0, 0);

	for (i, ca) in a.iter().enumerate() {
		for (j, cb) in b.iter().enumerate() {
			cur[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };

			if cur[j + 1] > best_len {
				best_len = cur[j + 1];
				best_i = i + 1 - best_len;
				best_j = j + 1 - best_len;
			}
		}

		std::mem::swap(&mut prev, &mut cur);
	}

	(best_i, best_j, best_len)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chars(text: &str) -> Vec<char> {
		text.chars().collect()
	}

	#[test]
	fn similarity_matches_gestalt_ratio() {
		assert_eq!(similarity(&chars("abcd"), &chars("abcd")), 1.0);
		assert_eq!(similarity(&chars("abcd"), &chars("wxyz")), 0.0);
		// "abxcd" vs "abcd": blocks "ab" + "cd" -> 2 * 4 / 9
		assert!((similarity(&chars("abxcd"), &chars("abcd")) - 8.0 / 9.0).abs() < 1e-6);
	}

	#[test]
	fn typo_matches_title_prefix() {
		let cfg = TitleMatch::default();
		let titles = ["Doi Samer Dao", "Wat Phumin (Royal Temple)", "Wat Phra That Chae Haeng"];
		let hit = best_title_match("wat phumn", titles, &cfg).expect("expected a fuzzy hit");

		assert_eq!(hit.index, 1);
	}

	#[test]
	fn short_queries_use_stricter_cutoff() {
		let cfg = TitleMatch::default();

		assert!(best_title_match("wut", ["Wat Phumin"], &cfg).is_none());
	}

	#[test]
	fn resolve_prefers_shortest_substring_then_fuzzy() {
		let cfg = TitleMatch::default();
		let titles = ["Wat Phumin Museum", "ｗａｔ ｐｈｕｍｉｎ", "Doi Samer Dao"];

		assert_eq!(resolve_title("WAT PHUMIN", titles, &cfg), Some(1));
		assert_eq!(resolve_title("doi samur", titles, &cfg), Some(2));
		assert_eq!(resolve_title("   ", titles, &cfg), None);
	}

	#[test]
	fn substring_is_case_insensitive() {
		assert!(title_contains("Wat Phumin (Royal Temple)", "WAT PHUMIN"));
		assert!(!title_contains("Wat Phumin", ""));
	}
}
