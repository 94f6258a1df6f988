//! View configuration.

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_IDLE_TIMEOUT_MS;

/// Every document except reserved ids and internal/system types.
pub const DEFAULT_QUERY: &str = r#"
  *[
    !(_id in path("_.*")) &&
    !(_type match "system.*") &&
    !(_type match "sanity.*")
  ]
"#;

pub const DEFAULT_API_VERSION: &str = "2022-09-01";

pub const DEFAULT_AVATAR_URL: &str =
	"https://raw.githubusercontent.com/sanity-io/sanity-plugin-graph-view/main/assets/head-silhouette.jpg";

/// Settings for one graph view. Every field has a default, so a partial (or
/// empty) JSON object is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
	/// Query selecting the documents to graph.
	pub query: String,
	/// Forwarded untouched to the document-store client.
	pub api_version: String,
	pub idle_timeout_ms: u64,
	pub sweep_interval_ms: u32,
	/// Avatar edge length in pixels.
	pub avatar_size: u32,
	/// Shown for users without a profile image.
	pub fallback_avatar_url: String,
	/// How many document types the legend lists.
	pub legend_size: usize,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			query: DEFAULT_QUERY.to_owned(),
			api_version: DEFAULT_API_VERSION.to_owned(),
			idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
			sweep_interval_ms: 1_000,
			avatar_size: 40,
			fallback_avatar_url: DEFAULT_AVATAR_URL.to_owned(),
			legend_size: 10,
		}
	}
}

impl GraphConfig {
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		let config: Self = serde_json::from_str(text)?;
		Ok(config.sanitized())
	}

	/// Blank strings and zero intervals fall back to defaults.
	fn sanitized(mut self) -> Self {
		let defaults = Self::default();
		if self.query.trim().is_empty() {
			self.query = defaults.query;
		}
		if self.api_version.trim().is_empty() {
			self.api_version = defaults.api_version;
		}
		if self.sweep_interval_ms == 0 {
			self.sweep_interval_ms = defaults.sweep_interval_ms;
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_object_yields_defaults() {
		assert_eq!(GraphConfig::from_json("{}").unwrap(), GraphConfig::default());
	}

	#[test]
	fn partial_config_overrides_only_given_fields() {
		let config =
			GraphConfig::from_json(r#"{"query": "*[_type == 'post']", "idleTimeoutMs": 5000}"#)
				.unwrap();

		assert_eq!(config.query, "*[_type == 'post']");
		assert_eq!(config.idle_timeout_ms, 5_000);
		assert_eq!(config.api_version, DEFAULT_API_VERSION);
		assert_eq!(config.sweep_interval_ms, 1_000);
	}

	#[test]
	fn blank_values_fall_back() {
		let config =
			GraphConfig::from_json(r#"{"query": "  ", "apiVersion": "", "sweepIntervalMs": 0}"#)
				.unwrap();
		assert_eq!(config.query, DEFAULT_QUERY);
		assert_eq!(config.api_version, DEFAULT_API_VERSION);
		assert_eq!(config.sweep_interval_ms, 1_000);
	}

	#[test]
	fn rejects_malformed_json() {
		assert!(GraphConfig::from_json("{query").is_err());
	}
}
