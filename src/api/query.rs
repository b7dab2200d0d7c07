//! Query-string encoding for GET and DELETE bodies.

// crates.io
use serde_json::Value;
use url::form_urlencoded;
// self
use crate::{_prelude::*, error::ConfigError};

/// Serializes `body` into query pairs and appends them to `path`.
///
/// `null` members are skipped, so `Option::None` fields never reach the wire. Arrays repeat
/// their key and nested objects are flattened as `parent[child]`. Existing query pairs in
/// `path` are kept ahead of the new ones.
pub(crate) fn merge_query<B>(path: &str, body: &B) -> Result<String>
where
	B: ?Sized + Serialize,
{
	let value = serde_json::to_value(body).map_err(ConfigError::Serialize)?;
	let map = match value {
		Value::Null => return Ok(path.to_owned()),
		Value::Object(map) => map,
		other => return Err(ConfigError::UnsupportedQuery { found: json_kind(&other) }.into()),
	};
	let mut pairs = Vec::new();

	for (key, value) in &map {
		push_pairs(key, value, &mut pairs);
	}

	if pairs.is_empty() {
		return Ok(path.to_owned());
	}

	// Keys are sorted regardless of map ordering; values keep their array order.
	pairs.sort_by(|(a, _), (b, _)| a.cmp(b));

	let encoded = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();
	let (base, fragment) = match path.split_once('#') {
		Some((base, fragment)) => (base, Some(fragment)),
		None => (path, None),
	};
	let mut merged = String::with_capacity(path.len() + encoded.len() + 1);

	merged.push_str(base);

	match base.find('?') {
		Some(idx) if idx + 1 < base.len() && !base.ends_with('&') => merged.push('&'),
		Some(_) => {},
		None => merged.push('?'),
	}

	merged.push_str(&encoded);

	if let Some(fragment) = fragment {
		merged.push('#');
		merged.push_str(fragment);
	}

	Ok(merged)
}

fn push_pairs(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
	match value {
		Value::Null => {},
		Value::Bool(flag) => out.push((key.to_owned(), flag.to_string())),
		Value::Number(number) => out.push((key.to_owned(), number.to_string())),
		Value::String(text) => out.push((key.to_owned(), text.clone())),
		Value::Array(items) =>
			for item in items {
				push_pairs(key, item, out);
			},
		Value::Object(map) =>
			for (child, nested) in map {
				push_pairs(&format!("{key}[{child}]"), nested, out);
			},
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Serialize)]
	struct Filter {
		include: Option<String>,
		#[serde(skip_serializing_if = "Option::is_none")]
		all_day: Option<bool>,
		days: Vec<u8>,
		range: Range,
	}

	#[derive(Serialize)]
	struct Range {
		from: &'static str,
		to: Option<&'static str>,
	}

	#[test]
	fn absent_fields_are_omitted() {
		let filter = Filter {
			include: None,
			all_day: None,
			days: vec![1, 7],
			range: Range { from: "2024-01-01", to: None },
		};
		let merged = merge_query("/calendars/abc/upcoming_events", &filter)
			.expect("Filter should serialize into a query string.");

		assert_eq!(
			merged,
			"/calendars/abc/upcoming_events?days=1&days=7&range%5Bfrom%5D=2024-01-01"
		);
	}

	#[test]
	fn explicit_false_is_transmitted() {
		let filter = Filter {
			include: Some("creator label".into()),
			all_day: Some(false),
			days: Vec::new(),
			range: Range { from: "now", to: Some("later") },
		};
		let merged = merge_query("/events", &filter).expect("Filter should serialize.");

		assert_eq!(
			merged,
			"/events?all_day=false&include=creator+label&range%5Bfrom%5D=now&range%5Bto%5D=later"
		);
	}

	#[test]
	fn pairs_append_to_existing_query() {
		let merged = merge_query("/events?days=3#top", &serde_json::json!({ "timezone": "UTC" }))
			.expect("Object body should serialize.");

		assert_eq!(merged, "/events?days=3&timezone=UTC#top");
	}

	#[test]
	fn none_body_keeps_path() {
		let body: Option<Filter> = None;

		assert_eq!(merge_query("/events", &body).expect("None body should serialize."), "/events");
	}

	#[test]
	fn scalar_bodies_are_rejected() {
		let err = merge_query("/events", &42).expect_err("Scalar bodies cannot become queries.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::UnsupportedQuery { found: "a number" })
		));
	}
}
