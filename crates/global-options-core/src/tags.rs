//! `{global_*}` tag resolution
//!
//! A tag is `{global_<key>}` with `<key>` drawn from `[a-z0-9_]`, matched
//! case-insensitively. Each tag becomes the stored value of its field, or
//! the empty string when the field is unknown or unset. The banner flag
//! renders as the literal text `True` or `False`.
//!
//! Substitution is a single pass over the input: text produced by a
//! substitution is never scanned again, so a stored value that looks like a
//! tag stays as literal text.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::fields::{self, BANNER_ENABLED};
use crate::settings::SettingsRecord;
use crate::value::Value;

/// Prefix every tag key carries inside the braces
pub const TAG_PREFIX: &str = "global_";

/// Name of the dynamic-data group the tags are listed under
pub const TAG_GROUP: &str = "global_options";

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\{global_([a-z0-9_]+)\}").unwrap())
}

/// Check whether a string contains at least one tag
pub fn contains_tags(input: &str) -> bool {
    tag_re().is_match(input)
}

/// Replaces tags using one request's settings record
#[derive(Debug, Clone, Copy)]
pub struct TagResolver<'a> {
    settings: &'a SettingsRecord,
}

impl<'a> TagResolver<'a> {
    pub fn new(settings: &'a SettingsRecord) -> Self {
        Self { settings }
    }

    /// Text a field key renders as
    pub fn render_field(&self, key: &str) -> Cow<'a, str> {
        let key = key.to_ascii_lowercase();
        if key == BANNER_ENABLED {
            let text = if self.settings.banner_enabled() {
                "True"
            } else {
                "False"
            };
            return Cow::Borrowed(text);
        }
        Cow::Borrowed(self.settings.get(&key))
    }

    /// Render one complete tag such as `{global_phone}`
    ///
    /// Anything that is not exactly one tag renders as "".
    pub fn render_tag(&self, tag: &str) -> Cow<'a, str> {
        match tag_re().captures(tag.trim()) {
            Some(caps) if caps[0].len() == tag.trim().len() => self.render_field(&caps[1]),
            _ => Cow::Borrowed(""),
        }
    }

    /// Replace every tag in a string
    ///
    /// Returns the input borrowed when it contains no tags.
    pub fn resolve_str<'s>(&self, input: &'s str) -> Cow<'s, str> {
        tag_re().replace_all(input, |caps: &Captures<'_>| {
            log::trace!("Resolving tag {}", &caps[0]);
            self.render_field(&caps[1]).into_owned()
        })
    }

    /// Replace tags in every string leaf of a content tree
    ///
    /// Sequences and mappings keep their shape and keys; non-string leaves
    /// are returned unchanged.
    pub fn resolve(&self, content: Value) -> Value {
        match content {
            Value::String(s) => {
                let resolved = match self.resolve_str(&s) {
                    Cow::Owned(resolved) => Some(resolved),
                    Cow::Borrowed(_) => None,
                };
                Value::String(resolved.unwrap_or(s))
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(|item| self.resolve(item)).collect())
            }
            Value::Mapping(map) => Value::Mapping(
                map.into_iter()
                    .map(|(key, val)| (key, self.resolve(val)))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// One entry of the dynamic-data tag picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDescriptor {
    /// The tag text, e.g. `{global_phone}`
    pub name: String,
    pub label: String,
    pub group: String,
}

/// The group the tags appear under in the host's picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagGroup {
    pub name: String,
    pub label: String,
}

/// The dynamic-data group for the picker
pub fn data_group() -> TagGroup {
    TagGroup {
        name: TAG_GROUP.to_string(),
        label: "Global Options".to_string(),
    }
}

/// Every tag the resolver understands, in field order
pub fn tag_catalog() -> Vec<TagDescriptor> {
    fields::fields()
        .iter()
        .map(|def| TagDescriptor {
            name: def.tag(),
            label: def.label.clone(),
            group: TAG_GROUP.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn record(pairs: &[(&str, &str)]) -> SettingsRecord {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_resolve_known_field() {
        let settings = record(&[("email", "a@b.com")]);
        let resolver = TagResolver::new(&settings);
        assert_eq!(resolver.resolve_str("{global_email}"), "a@b.com");
    }

    #[test]
    fn test_resolve_unset_field_is_empty() {
        let settings = SettingsRecord::new();
        let resolver = TagResolver::new(&settings);
        assert_eq!(resolver.resolve_str("{global_email}"), "");
        assert_eq!(resolver.resolve_str("Call {global_phone} now"), "Call  now");
    }

    #[test]
    fn test_resolve_unknown_field_is_empty() {
        let settings = record(&[("email", "a@b.com")]);
        let resolver = TagResolver::new(&settings);
        assert_eq!(resolver.resolve_str("[{global_no_such_field}]"), "[]");
    }

    #[test]
    fn test_banner_enabled_renders_true_false() {
        let on = record(&[("banner_enabled", "1")]);
        let off = record(&[("banner_enabled", "0")]);
        let unset = SettingsRecord::new();

        assert_eq!(TagResolver::new(&on).resolve_str("{global_banner_enabled}"), "True");
        assert_eq!(TagResolver::new(&off).resolve_str("{global_banner_enabled}"), "False");
        assert_eq!(TagResolver::new(&unset).resolve_str("{global_banner_enabled}"), "False");
    }

    #[test]
    fn test_tag_matching_is_case_insensitive() {
        let settings = record(&[("email", "a@b.com"), ("banner_enabled", "1")]);
        let resolver = TagResolver::new(&settings);
        assert_eq!(resolver.resolve_str("{GLOBAL_EMAIL}"), "a@b.com");
        assert_eq!(resolver.resolve_str("{Global_Banner_Enabled}"), "True");
    }

    #[test]
    fn test_multiple_tags_in_text() {
        let settings = record(&[("city", "Oslo"), ("country", "Norway")]);
        let resolver = TagResolver::new(&settings);
        assert_eq!(
            resolver.resolve_str("<p>{global_city}, {global_country}</p>"),
            "<p>Oslo, Norway</p>"
        );
    }

    #[test]
    fn test_non_tags_left_alone() {
        let settings = record(&[("email", "a@b.com")]);
        let resolver = TagResolver::new(&settings);

        for text in ["{global_}", "{global-email}", "{ global_email }", "{woo_product_stock}"] {
            assert_eq!(resolver.resolve_str(text), text);
        }
    }

    #[test]
    fn test_tag_free_input_is_borrowed() {
        let settings = record(&[("email", "a@b.com")]);
        let resolver = TagResolver::new(&settings);
        assert!(matches!(resolver.resolve_str("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_substituted_value_is_not_rescanned() {
        let settings = record(&[("tagline", "{global_email}"), ("email", "a@b.com")]);
        let resolver = TagResolver::new(&settings);
        assert_eq!(resolver.resolve_str("{global_tagline}"), "{global_email}");
    }

    #[test]
    fn test_resolve_is_idempotent_on_tag_free_output() {
        let settings = record(&[("city", "Oslo")]);
        let resolver = TagResolver::new(&settings);

        let once = resolver.resolve(Value::from("Visit {global_city}"));
        let twice = resolver.resolve(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_resolve_nested_structure() {
        let settings = record(&[("cta_url", "https://acme.test/buy")]);
        let resolver = TagResolver::new(&settings);

        let content: Value = serde_json::from_str(
            r#"{"url": "{global_cta_url}", "label": "ok", "size": 3, "items": [{"href": "{global_cta_url}"}, null]}"#,
        )
        .unwrap();
        let expected: Value = serde_json::from_str(
            r#"{"url": "https://acme.test/buy", "label": "ok", "size": 3, "items": [{"href": "https://acme.test/buy"}, null]}"#,
        )
        .unwrap();

        assert_eq!(resolver.resolve(content), expected);
    }

    #[test]
    fn test_mapping_keys_are_not_resolved() {
        let settings = record(&[("city", "Oslo")]);
        let map: IndexMap<String, Value> =
            [("{global_city}".to_string(), Value::from("{global_city}"))]
                .into_iter()
                .collect();

        let resolved = TagResolver::new(&settings).resolve(Value::Mapping(map));
        assert_eq!(
            resolved.as_mapping().and_then(|m| m.get("{global_city}")),
            Some(&Value::from("Oslo"))
        );
    }

    #[test]
    fn test_render_tag() {
        let settings = record(&[("phone", "555-0100"), ("banner_enabled", "1")]);
        let resolver = TagResolver::new(&settings);

        assert_eq!(resolver.render_tag("{global_phone}"), "555-0100");
        assert_eq!(resolver.render_tag("{global_banner_enabled}"), "True");
        assert_eq!(resolver.render_tag("{global_missing}"), "");
        assert_eq!(resolver.render_tag("x {global_phone}"), "");
    }

    #[test]
    fn test_contains_tags() {
        assert!(contains_tags("a {global_x} b"));
        assert!(!contains_tags("a {other_x} b"));
    }

    #[test]
    fn test_catalog_lists_every_field() {
        let catalog = tag_catalog();
        assert_eq!(catalog.len(), fields::fields().len());
        assert_eq!(
            catalog[0],
            TagDescriptor {
                name: "{global_phone}".into(),
                label: "Phone Number".into(),
                group: "global_options".into(),
            }
        );
        assert!(catalog
            .iter()
            .any(|t| t.name == "{global_social_reddit}" && t.label == "Reddit"));
        assert_eq!(data_group().label, "Global Options");
    }
}
