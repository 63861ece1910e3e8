//! The fixed catalog of known settings fields
//!
//! Every field the admin form edits, in display order. The sanitizer
//! rebuilds records from this list, and the tag catalog is derived from it.

use std::sync::OnceLock;

/// How a field's submitted value is sanitized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line free text
    Text,
    /// Email address, emptied when invalid
    Email,
    /// URL, emptied when invalid or using a disallowed scheme
    Url,
    /// Multi-line free text, newlines preserved
    Textarea,
    /// Checkbox stored as "1"/"0"
    Flag,
}

/// Section of the admin page a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Contact,
    Company,
    Location,
    Social,
    Ecommerce,
    Legal,
    Banner,
    AnimatedTyping,
    CallToAction,
}

impl FieldGroup {
    pub fn label(&self) -> &'static str {
        match self {
            FieldGroup::Contact => "Contact Details",
            FieldGroup::Company => "Company Information",
            FieldGroup::Location => "Location",
            FieldGroup::Social => "Social Media",
            FieldGroup::Ecommerce => "E-commerce",
            FieldGroup::Legal => "Legal Pages",
            FieldGroup::Banner => "Banner",
            FieldGroup::AnimatedTyping => "Animated Typing",
            FieldGroup::CallToAction => "Call to Action",
        }
    }
}

/// Definition of one settings field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Storage key, also the tag suffix in `{global_<key>}`
    pub key: String,
    /// Human-readable label
    pub label: String,
    pub kind: FieldKind,
    pub group: FieldGroup,
    /// Value shown when the stored value is empty
    pub default: Option<&'static str>,
}

impl FieldDef {
    fn new(key: &str, label: &str, kind: FieldKind, group: FieldGroup) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            group,
            default: None,
        }
    }

    fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// The tag that renders this field
    pub fn tag(&self) -> String {
        format!("{{global_{}}}", self.key)
    }
}

/// The flag field rendered as "True"/"False" instead of its stored value
pub const BANNER_ENABLED: &str = "banner_enabled";

const SOCIAL_NETWORKS: &[(&str, &str)] = &[
    ("facebook", "Facebook"),
    ("instagram", "Instagram"),
    ("linkedin", "LinkedIn"),
    ("twitter", "Twitter (X)"),
    ("youtube", "YouTube"),
    ("tiktok", "TikTok"),
    ("pinterest", "Pinterest"),
    ("whatsapp", "WhatsApp"),
    ("telegram", "Telegram"),
    ("discord", "Discord"),
    ("snapchat", "Snapchat"),
    ("reddit", "Reddit"),
];

/// Social networks with a `social_<network>` URL field, as (key, label)
pub fn social_networks() -> &'static [(&'static str, &'static str)] {
    SOCIAL_NETWORKS
}

/// All known fields in display order
pub fn fields() -> &'static [FieldDef] {
    static FIELDS: OnceLock<Vec<FieldDef>> = OnceLock::new();
    FIELDS.get_or_init(build_fields)
}

/// Look up a field by key
pub fn field(key: &str) -> Option<&'static FieldDef> {
    fields().iter().find(|f| f.key == key)
}

/// Check whether a key belongs to the known set
pub fn is_known(key: &str) -> bool {
    field(key).is_some()
}

fn build_fields() -> Vec<FieldDef> {
    use FieldGroup::*;
    use FieldKind::*;

    let mut fields = vec![
        FieldDef::new("phone", "Phone Number", Text, Contact),
        FieldDef::new("phone_whatsapp", "WhatsApp Number", Text, Contact),
        FieldDef::new("phone_tollfree", "Toll-Free Number", Text, Contact),
        FieldDef::new("phone_mobile", "Mobile Number", Text, Contact),
        FieldDef::new("email", "Email (General)", Email, Contact),
        FieldDef::new("email_support", "Support Email", Email, Contact),
        FieldDef::new("email_info", "Info Email", Email, Contact),
        FieldDef::new("email_billing", "Billing Email", Email, Contact),
        FieldDef::new("email_sales", "Sales Email", Email, Contact),
        FieldDef::new("address", "Business Address", Textarea, Contact),
        FieldDef::new("business_hours", "Business Hours", Textarea, Contact),
        FieldDef::new("company_name", "Company Name", Text, Company),
        FieldDef::new("tagline", "Company Tagline", Text, Company),
        FieldDef::new("registration_number", "Registration Number", Text, Company),
        FieldDef::new("vat_number", "VAT Number", Text, Company),
        FieldDef::new("tax_id", "Tax ID", Text, Company),
        FieldDef::new("city", "City", Text, Location),
        FieldDef::new("state", "State/Province", Text, Location),
        FieldDef::new("country", "Country", Text, Location),
        FieldDef::new("zipcode", "ZIP/Postal Code", Text, Location),
    ];

    fields.extend(
        SOCIAL_NETWORKS
            .iter()
            .map(|(key, label)| FieldDef::new(&format!("social_{}", key), label, Url, Social)),
    );

    fields.extend([
        FieldDef::new("shipping_info", "Shipping Information", Textarea, Ecommerce),
        FieldDef::new("return_policy", "Return Policy", Textarea, Ecommerce),
        FieldDef::new("free_shipping_threshold", "Free Shipping Threshold", Text, Ecommerce),
        FieldDef::new("currency_symbol", "Currency Symbol", Text, Ecommerce),
        FieldDef::new("sale_badge", "Sale Badge", Text, Ecommerce)
            .with_default("{woo_product_on_sale} OFF"),
        FieldDef::new("out_of_stock_badge", "Out of Stock Badge", Text, Ecommerce)
            .with_default("Out of stock"),
        FieldDef::new("in_stock_badge", "In Stock Badge", Text, Ecommerce)
            .with_default("{woo_product_stock} in stock"),
        FieldDef::new("privacy_policy_url", "Privacy Policy URL", Url, Legal),
        FieldDef::new("terms_url", "Terms & Conditions URL", Url, Legal),
        FieldDef::new("cookie_policy_url", "Cookie Policy URL", Url, Legal),
        FieldDef::new("refund_policy_url", "Refund Policy URL", Url, Legal),
        FieldDef::new("shipping_policy_url", "Shipping Policy URL", Url, Legal),
        FieldDef::new("banner_prefix", "Banner Prefix", Text, Banner),
        FieldDef::new("banner_suffix", "Banner Suffix", Text, Banner),
        FieldDef::new(BANNER_ENABLED, "Banner Enabled", Flag, Banner),
        FieldDef::new("animated_typing_1", "Animated Typing 1", Text, AnimatedTyping),
        FieldDef::new("animated_typing_2", "Animated Typing 2", Text, AnimatedTyping),
        FieldDef::new("animated_typing_3", "Animated Typing 3", Text, AnimatedTyping),
        FieldDef::new("cta_text", "CTA Button Text", Text, CallToAction),
        FieldDef::new("cta_url", "CTA Button URL", Url, CallToAction),
        FieldDef::new("cta_secondary_text", "Secondary CTA Text", Text, CallToAction),
        FieldDef::new("cta_secondary_url", "Secondary CTA URL", Url, CallToAction),
    ]);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<_> = fields().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys.len(), fields().len());
    }

    #[test]
    fn test_catalog_size() {
        // 20 contact/company/location + 12 social + 7 e-commerce + 5 legal
        // + 3 banner + 3 typing + 4 cta
        assert_eq!(fields().len(), 54);
    }

    #[test]
    fn test_keys_match_tag_pattern() {
        for f in fields() {
            assert!(
                f.key
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "{} is not a valid tag key",
                f.key
            );
        }
    }

    #[test]
    fn test_only_badges_have_defaults() {
        let with_defaults: Vec<_> = fields()
            .iter()
            .filter(|f| f.default.is_some())
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(
            with_defaults,
            vec!["sale_badge", "out_of_stock_badge", "in_stock_badge"]
        );
    }

    #[test]
    fn test_social_fields_are_urls() {
        let def = field("social_discord").unwrap();
        assert_eq!(def.kind, FieldKind::Url);
        assert_eq!(def.group, FieldGroup::Social);
        assert_eq!(def.tag(), "{global_social_discord}");
    }

    #[test]
    fn test_banner_enabled_is_the_only_flag() {
        let flags: Vec<_> = fields()
            .iter()
            .filter(|f| f.kind == FieldKind::Flag)
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(flags, vec![BANNER_ENABLED]);
        assert!(!is_known("unknown_field"));
    }
}
