//! Field sanitizers
//!
//! Submitted form data and imported snapshots are untrusted. Each field is
//! cleaned according to its [`FieldKind`]; a value that cannot be cleaned
//! becomes the empty string instead of failing the whole record.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::fields::{self, FieldKind};
use crate::settings::SettingsRecord;
use crate::value::Value;

/// URL schemes accepted by [`sanitize_url`]
pub const ALLOWED_PROTOCOLS: &[&str] = &[
    "http", "https", "ftp", "ftps", "mailto", "news", "irc", "gopher", "nntp", "feed", "telnet",
    "mms", "rtsp", "sms", "svn", "tel", "fax", "xmpp", "webcal", "urn",
];

/// Shortest address sanitize_email accepts ("a@b.co")
const MIN_EMAIL_LEN: usize = 6;

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<(script|style)[^>]*?>.*?</(script|style)\s*>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n\t ]+").unwrap())
}

fn horizontal_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\t ]+").unwrap())
}

fn octet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)%[a-f0-9]{2}").unwrap())
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+\-]*):").unwrap())
}

/// Build a sanitized record from raw input
///
/// The result holds exactly the known fields in catalog order. Keys not in
/// the catalog are dropped and missing keys become empty strings.
pub fn sanitize_record(input: &IndexMap<String, Value>) -> SettingsRecord {
    let dropped = input.keys().filter(|k| !fields::is_known(k)).count();
    if dropped > 0 {
        log::debug!("Ignoring {} unknown field(s) in submitted settings", dropped);
    }

    fields::fields()
        .iter()
        .map(|def| {
            let raw = input.get(&def.key);
            let clean = match def.kind {
                FieldKind::Flag => sanitize_flag(raw).to_string(),
                kind => {
                    let text = raw.map(scalar_text).unwrap_or_default();
                    let clean = sanitize_field(kind, &text);
                    if clean.is_empty() && !text.trim().is_empty() {
                        log::warn!("Field '{}' failed validation and was cleared", def.key);
                    }
                    clean
                }
            };
            (def.key.clone(), clean)
        })
        .collect()
}

/// Sanitize a text value for a non-flag field kind
pub fn sanitize_field(kind: FieldKind, text: &str) -> String {
    match kind {
        FieldKind::Text => sanitize_text(text),
        FieldKind::Textarea => sanitize_textarea(text),
        FieldKind::Email => sanitize_email(text),
        FieldKind::Url => sanitize_url(text),
        FieldKind::Flag => sanitize_flag(Some(&Value::from(text))).to_string(),
    }
}

/// Text form of a submitted scalar; containers have no text form
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null | Value::Sequence(_) | Value::Mapping(_) => String::new(),
    }
}

/// Single-line text: markup stripped, whitespace collapsed, trimmed
pub fn sanitize_text(input: &str) -> String {
    clean_text(input, false)
}

/// Multi-line text: markup stripped, each line collapsed and trimmed,
/// line breaks preserved
pub fn sanitize_textarea(input: &str) -> String {
    clean_text(input, true)
}

fn clean_text(input: &str, keep_newlines: bool) -> String {
    let mut text = if input.contains('<') {
        strip_all_tags(input)
    } else {
        input.to_string()
    };

    while octet_re().is_match(&text) {
        text = octet_re().replace_all(&text, "").into_owned();
    }

    if keep_newlines {
        text.replace("\r\n", "\n")
            .replace('\r', "\n")
            .split('\n')
            .map(|line| horizontal_space_re().replace_all(line, " ").trim().to_string())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    } else {
        whitespace_re().replace_all(&text, " ").trim().to_string()
    }
}

/// Remove all HTML tags, dropping script and style bodies entirely
pub fn strip_all_tags(input: &str) -> String {
    let without_code = script_style_re().replace_all(input, "");
    tag_re().replace_all(&without_code, "").into_owned()
}

/// Clean an email address, or return "" when nothing valid remains
pub fn sanitize_email(input: &str) -> String {
    let email = input.trim();

    if email.len() < MIN_EMAIL_LEN {
        return String::new();
    }

    let Some((local, domain)) = email.split_once('@') else {
        return String::new();
    };

    let local: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(*c))
        .collect();
    if local.is_empty() {
        return String::new();
    }

    if domain.contains("..") {
        return String::new();
    }

    let domain = domain.trim_matches(|c: char| c == '-' || c == '.' || c.is_whitespace());
    let labels: Vec<String> = domain
        .split('.')
        .map(|sub| {
            sub.trim_matches(|c: char| c == '-' || c.is_whitespace())
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect::<String>()
        })
        .filter(|sub| !sub.is_empty())
        .collect();

    if labels.len() < 2 {
        return String::new();
    }

    let clean = format!("{}@{}", local, labels.join("."));
    if clean.len() < MIN_EMAIL_LEN {
        return String::new();
    }
    clean
}

/// Clean a URL, or return "" for disallowed schemes and unparseable links
pub fn sanitize_url(input: &str) -> String {
    let url: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .filter(|c| !matches!(c, '<' | '>' | '"' | '`' | '{' | '}' | '^'))
        .collect();

    if url.is_empty() {
        return String::new();
    }

    if url.starts_with('/') || url.starts_with('#') || url.starts_with('?') {
        return url;
    }

    // "host.tld:port/path" has no scheme
    let scheme = scheme_re()
        .captures(&url)
        .map(|c| c[1].to_ascii_lowercase());
    let (url, scheme) = match scheme {
        Some(scheme) => (url, scheme),
        None => (format!("http://{}", url), "http".to_string()),
    };

    if !ALLOWED_PROTOCOLS.contains(&scheme.as_str()) {
        return String::new();
    }

    if scheme == "http" || scheme == "https" {
        match url::Url::parse(&url) {
            Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => {}
            _ => return String::new(),
        }
    }

    url
}

/// Coerce a checkbox value to "1" or "0"
///
/// A field that is absent or null is unchecked. Strings that read as off
/// ("", "0", "false", "off", "no") stay unchecked so an exported "0"
/// imports as "0".
pub fn sanitize_flag(value: Option<&Value>) -> &'static str {
    let on = match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Integer(i)) => *i != 0,
        Some(Value::Float(f)) => *f != 0.0,
        Some(Value::String(s)) => {
            let s = s.trim().to_ascii_lowercase();
            !matches!(s.as_str(), "" | "0" | "false" | "off" | "no")
        }
        Some(Value::Sequence(_)) | Some(Value::Mapping(_)) => true,
    };

    if on {
        "1"
    } else {
        "0"
    }
}
