pub const DENSE_VECTOR_NAME: &str = "dense";

use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, QueryPointsBuilder, ScoredPoint, Value, point_id::PointIdOptions, value::Kind,
};

use crate::{Error, Result};
use trove_domain::{entry::KnowledgeEntry, query::MetadataFilter};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &trove_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Nearest-neighbour search over the dense vector, constrained by `filter`.
	///
	/// Hits carry the payload-derived entry, which may lack `details`; callers hydrate from the
	/// document store when they need the full record.
	pub async fn search(
		&self,
		vector: Vec<f32>,
		top_k: u32,
		filter: &MetadataFilter,
	) -> Result<Vec<VectorHit>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Query vector has {} dimensions, collection expects {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(qdrant_client::qdrant::Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(u64::from(top_k));

		if let Some(filter) = build_filter(filter) {
			search = search.filter(filter);
		}

		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().filter_map(hit_from_point).collect())
	}
}

#[derive(Clone, Debug)]
pub struct VectorHit {
	pub entry_id: String,
	pub score: f32,
	pub entry: KnowledgeEntry,
}

/// Keyword conditions match payload values exactly, the same contract as
/// `MetadataFilter::admits`.
pub fn build_filter(filter: &MetadataFilter) -> Option<Filter> {
	let mut must = Vec::new();

	for (key, value) in [
		("category", &filter.category),
		("district", &filter.district),
		("sub_district", &filter.sub_district),
	] {
		if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
			must.push(Condition::matches(key, value.to_string()));
		}
	}

	let excluded: Vec<String> = filter
		.exclude_categories
		.iter()
		.map(|category| category.trim())
		.filter(|category| !category.is_empty())
		.map(str::to_string)
		.collect();
	let must_not = if excluded.is_empty() {
		Vec::new()
	} else {
		vec![Condition::matches("category", excluded)]
	};

	if must.is_empty() && must_not.is_empty() {
		return None;
	}

	Some(Filter { must, should: Vec::new(), must_not, min_should: None })
}

fn hit_from_point(point: ScoredPoint) -> Option<VectorHit> {
	let payload = &point.payload;
	let entry_id = payload_string(payload, "entry_id").or_else(|| {
		point.id.as_ref().and_then(|id| match id.point_id_options.as_ref()? {
			PointIdOptions::Uuid(id) => Some(id.clone()),
			PointIdOptions::Num(id) => Some(id.to_string()),
		})
	})?;
	let entry = KnowledgeEntry {
		id: entry_id.clone(),
		title: payload_string(payload, "title").unwrap_or_default(),
		category: payload_string(payload, "category").unwrap_or_default(),
		topic: payload_string(payload, "topic").unwrap_or_default(),
		summary: payload_string(payload, "summary").unwrap_or_default(),
		details: Vec::new(),
		keywords: payload_string_list(payload, "keywords"),
		district: payload_string(payload, "district"),
		sub_district: payload_string(payload, "sub_district"),
	};

	Some(VectorHit { entry_id, score: point.score, entry })
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) if !text.trim().is_empty() => Some(text.clone()),
		_ => None,
	}
}

fn payload_string_list(payload: &HashMap<String, Value>, key: &str) -> Vec<String> {
	let Some(value) = payload.get(key) else {
		return Vec::new();
	};

	match &value.kind {
		Some(Kind::ListValue(list)) => list
			.values
			.iter()
			.filter_map(|item| match &item.kind {
				Some(Kind::StringValue(text)) => Some(text.clone()),
				_ => None,
			})
			.collect(),
		Some(Kind::StringValue(text)) => vec![text.clone()],
		_ => Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_filter_builds_nothing() {
		assert!(build_filter(&MetadataFilter::default()).is_none());
	}

	#[test]
	fn filter_splits_constraints_and_exclusions() {
		let filter = MetadataFilter {
			category: Some("Temples".to_string()),
			district: Some("  ".to_string()),
			sub_district: None,
			exclude_categories: vec!["District Overview".to_string()],
		};
		let built = build_filter(&filter).expect("filter should be built");

		assert_eq!(built.must.len(), 1);
		assert_eq!(built.must_not.len(), 1);
		assert!(built.should.is_empty());
	}

	#[test]
	fn blank_exclusions_are_dropped() {
		let filter = MetadataFilter {
			exclude_categories: vec!["  ".to_string()],
			..Default::default()
		};

		assert!(build_filter(&filter).is_none());
	}

	#[test]
	fn payload_lists_accept_strings_only() {
		let mut payload = HashMap::new();

		payload.insert(
			"keywords".to_string(),
			Value::from(vec![Value::from("murals"), Value::from(3_i64), Value::from("temple")]),
		);
		payload.insert("title".to_string(), Value::from("  "));

		assert_eq!(payload_string_list(&payload, "keywords"), vec!["murals", "temple"]);
		assert_eq!(payload_string(&payload, "title"), None);
	}
}
