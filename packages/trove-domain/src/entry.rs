use serde::{Deserialize, Serialize};

/// A knowledge-base entry as held by the primary document store.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct KnowledgeEntry {
	pub id: String,
	pub title: String,
	#[serde(default)]
	pub category: String,
	#[serde(default)]
	pub topic: String,
	#[serde(default)]
	pub summary: String,
	#[serde(default)]
	pub details: Vec<EntryDetail>,
	#[serde(default)]
	pub keywords: Vec<String>,
	#[serde(default)]
	pub district: Option<String>,
	#[serde(default)]
	pub sub_district: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct EntryDetail {
	pub heading: String,
	pub content: String,
}

impl KnowledgeEntry {
	/// Renders the entry as plain text in a fixed field order.
	///
	/// The same text feeds the pairwise scorer and the context window, so the output must only
	/// depend on the entry itself. Empty fields are skipped.
	pub fn flatten(&self) -> String {
		let mut lines = Vec::with_capacity(8 + self.details.len());

		lines.push(format!("Title: {}", self.title.trim()));

		for (label, value) in
			[("Category", &self.category), ("Topic", &self.topic), ("Summary", &self.summary)]
		{
			let value = value.trim();

			if !value.is_empty() {
				lines.push(format!("{label}: {value}"));
			}
		}

		let details: Vec<String> = self
			.details
			.iter()
			.filter(|detail| !detail.content.trim().is_empty())
			.map(|detail| {
				let heading = detail.heading.trim();

				if heading.is_empty() {
					detail.content.trim().to_string()
				} else {
					format!("{heading}: {}", detail.content.trim())
				}
			})
			.collect();

		if !details.is_empty() {
			lines.push("Details:".to_string());
			lines.extend(details);
		}

		let keywords: Vec<&str> = self
			.keywords
			.iter()
			.map(|keyword| keyword.trim())
			.filter(|keyword| !keyword.is_empty())
			.collect();

		if !keywords.is_empty() {
			lines.push(format!("Keywords: {}", keywords.join(", ")));
		}

		lines.join("\n")
	}
}
