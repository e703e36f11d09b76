//! Allow-list HTML sanitization backed by ammonia.
//!
//! [`AllowPolicy`] describes what may survive: tags, attributes per tag,
//! attributes on every tag, URL schemes and relative link handling. The
//! [`Sanitizer`] turns a policy into an ammonia builder for each call.

use ammonia::{Builder, Url, UrlRelative};
use citadel_security::SanitizedNode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::config::ParserConfig;
use crate::error::{ParserError, ParserResult};
use crate::html::parse_fragment;
use crate::metrics::DocumentMetrics;

/// Tags whose text content is discarded along with the tag when not allowed.
const CLEAN_CONTENT_TAGS: &[&str] = &["script", "style"];

/// Named starting points for an [`AllowPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowPreset {
    /// Text only.
    None,
    /// Simple inline formatting.
    SimpleText,
    /// Text formatting, lists, quotes and links.
    Basic,
    /// `basic` plus images.
    BasicWithImages,
    /// Most structural and formatting markup, including tables.
    #[default]
    Relaxed,
}

impl AllowPreset {
    pub const ALL: [AllowPreset; 5] = [
        AllowPreset::None,
        AllowPreset::SimpleText,
        AllowPreset::Basic,
        AllowPreset::BasicWithImages,
        AllowPreset::Relaxed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AllowPreset::None => "none",
            AllowPreset::SimpleText => "simple-text",
            AllowPreset::Basic => "basic",
            AllowPreset::BasicWithImages => "basic-with-images",
            AllowPreset::Relaxed => "relaxed",
        }
    }
}

impl fmt::Display for AllowPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AllowPreset {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        AllowPreset::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| ParserError::InvalidAllowPolicy(format!("unknown preset '{}'", s)))
    }
}

/// What the sanitizer lets through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowPolicy {
    tags: BTreeSet<String>,
    tag_attributes: BTreeMap<String, BTreeSet<String>>,
    generic_attributes: BTreeSet<String>,
    url_schemes: BTreeSet<String>,
    preserve_relative_links: bool,
    base_url: Option<String>,
}

impl AllowPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn simple_text() -> Self {
        Self::none().add_tags(["b", "em", "i", "strong", "u"])
    }

    pub fn basic() -> Self {
        Self::none()
            .add_tags([
                "a", "b", "blockquote", "br", "cite", "code", "dd", "dl", "dt", "em", "i", "li",
                "ol", "p", "pre", "q", "small", "span", "strike", "strong", "sub", "sup", "u", "ul",
            ])
            .add_attributes("a", ["href"])
            .add_attributes("blockquote", ["cite"])
            .add_attributes("q", ["cite"])
            .add_protocols(["ftp", "http", "https", "mailto"])
    }

    pub fn basic_with_images() -> Self {
        Self::basic()
            .add_tags(["img"])
            .add_attributes("img", ["align", "alt", "height", "src", "title", "width"])
    }

    pub fn relaxed() -> Self {
        Self::none()
            .add_tags([
                "a", "b", "blockquote", "br", "caption", "cite", "code", "col", "colgroup", "dd",
                "div", "dl", "dt", "em", "h1", "h2", "h3", "h4", "h5", "h6", "i", "img", "li", "ol",
                "p", "pre", "q", "small", "span", "strike", "strong", "sub", "sup", "table",
                "tbody", "td", "tfoot", "th", "thead", "tr", "u", "ul",
            ])
            .add_attributes("a", ["href", "title"])
            .add_attributes("blockquote", ["cite"])
            .add_attributes("col", ["span", "width"])
            .add_attributes("colgroup", ["span", "width"])
            .add_attributes("img", ["align", "alt", "height", "src", "title", "width"])
            .add_attributes("ol", ["start", "type"])
            .add_attributes("q", ["cite"])
            .add_attributes("table", ["summary", "width"])
            .add_attributes("td", ["abbr", "axis", "colspan", "rowspan", "width"])
            .add_attributes("th", ["abbr", "axis", "colspan", "rowspan", "scope", "width"])
            .add_attributes("ul", ["type"])
            .add_protocols(["ftp", "http", "https", "mailto"])
    }

    pub fn from_preset(preset: AllowPreset) -> Self {
        match preset {
            AllowPreset::None => Self::none(),
            AllowPreset::SimpleText => Self::simple_text(),
            AllowPreset::Basic => Self::basic(),
            AllowPreset::BasicWithImages => Self::basic_with_images(),
            AllowPreset::Relaxed => Self::relaxed(),
        }
    }

    /// Adds allowed tags. Input is converted to lowercase.
    pub fn add_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.extend(tags.into_iter().map(|s| s.as_ref().trim().to_lowercase()));
        self
    }

    /// Removes tags along with any attributes allowed on them.
    pub fn remove_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = tag.as_ref().trim().to_lowercase();
            self.tags.remove(&tag);
            self.tag_attributes.remove(&tag);
        }
        self
    }

    /// Allows attributes on one tag. The tag itself is not added.
    pub fn add_attributes<I, S>(mut self, tag: &str, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tag_attributes
            .entry(tag.trim().to_lowercase())
            .or_default()
            .extend(attributes.into_iter().map(|s| s.as_ref().trim().to_lowercase()));
        self
    }

    pub fn remove_attributes<I, S>(mut self, tag: &str, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tag = tag.trim().to_lowercase();
        if let Some(allowed) = self.tag_attributes.get_mut(&tag) {
            for attribute in attributes {
                allowed.remove(&attribute.as_ref().trim().to_lowercase());
            }
            if allowed.is_empty() {
                self.tag_attributes.remove(&tag);
            }
        }
        self
    }

    /// Allows attributes on every allowed tag.
    pub fn add_generic_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.generic_attributes
            .extend(attributes.into_iter().map(|s| s.as_ref().trim().to_lowercase()));
        self
    }

    /// Allows URL schemes. A trailing `:` is accepted and dropped.
    pub fn add_protocols<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.url_schemes.extend(
            schemes
                .into_iter()
                .map(|s| s.as_ref().trim().trim_end_matches(':').to_lowercase()),
        );
        self
    }

    pub fn remove_protocols<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for scheme in schemes {
            self.url_schemes
                .remove(&scheme.as_ref().trim().trim_end_matches(':').to_lowercase());
        }
        self
    }

    /// Keep relative URLs as written. When off, relative URLs are resolved
    /// against the base URL, or dropped when there is none.
    pub fn preserve_relative_links(mut self, preserve: bool) -> Self {
        self.preserve_relative_links = preserve;
        self
    }

    pub fn base_url(mut self, base: Option<&str>) -> Self {
        self.base_url = base.map(str::to_string);
        self
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_lowercase())
    }

    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        let attribute = attribute.to_lowercase();
        self.generic_attributes.contains(&attribute)
            || self
                .tag_attributes
                .get(&tag.to_lowercase())
                .is_some_and(|allowed| allowed.contains(&attribute))
    }

    pub fn allows_protocol(&self, scheme: &str) -> bool {
        self.url_schemes.contains(&scheme.to_lowercase())
    }

    pub fn preserves_relative_links(&self) -> bool {
        self.preserve_relative_links
    }

    pub fn base(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn validate(&self) -> ParserResult<()> {
        let names = self
            .tags
            .iter()
            .chain(self.generic_attributes.iter())
            .chain(self.url_schemes.iter())
            .chain(self.tag_attributes.keys())
            .chain(self.tag_attributes.values().flatten());
        for name in names {
            if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(ParserError::InvalidAllowPolicy(format!(
                    "invalid name {:?}",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Cleans untrusted HTML against an [`AllowPolicy`].
#[derive(Debug, Clone)]
pub struct Sanitizer {
    policy: AllowPolicy,
    base: Option<Url>,
    parser_config: ParserConfig,
}

impl Sanitizer {
    /// Validates the policy and parses its base URL.
    pub fn new(policy: AllowPolicy) -> ParserResult<Self> {
        policy.validate()?;
        let base = policy.base().map(Url::parse).transpose()?;
        Ok(Self {
            policy,
            base,
            parser_config: ParserConfig::default(),
        })
    }

    pub fn policy(&self) -> &AllowPolicy {
        &self.policy
    }

    /// Sanitize HTML content according to the allow policy
    pub fn clean(&self, html: &str) -> String {
        self.builder().clean(html).to_string()
    }

    /// Whether cleaning would leave the element structure of `html` unchanged.
    pub fn is_valid(&self, html: &str) -> bool {
        let metrics = DocumentMetrics::new();
        let cleaned = self.clean(html);
        match (
            parse_fragment(html, &self.parser_config, &metrics),
            parse_fragment(&cleaned, &self.parser_config, &metrics),
        ) {
            (Ok(before), Ok(after)) => same_elements(&before, &after),
            _ => false,
        }
    }

    fn builder(&self) -> Builder<'_> {
        let tags: HashSet<&str> = self.policy.tags.iter().map(String::as_str).collect();
        let clean_content: HashSet<&str> = CLEAN_CONTENT_TAGS
            .iter()
            .copied()
            .filter(|tag| !tags.contains(tag))
            .collect();
        let tag_attributes: HashMap<&str, HashSet<&str>> = self
            .policy
            .tag_attributes
            .iter()
            .map(|(tag, attrs)| (tag.as_str(), attrs.iter().map(String::as_str).collect()))
            .collect();
        let generic: HashSet<&str> = self.policy.generic_attributes.iter().map(String::as_str).collect();
        let schemes: HashSet<&str> = self.policy.url_schemes.iter().map(String::as_str).collect();

        let relative = if self.policy.preserve_relative_links {
            UrlRelative::PassThrough
        } else {
            match &self.base {
                Some(base) => UrlRelative::RewriteWithBase(base.clone()),
                None => UrlRelative::Deny,
            }
        };

        let mut builder = Builder::default();
        builder
            .tags(tags)
            .clean_content_tags(clean_content)
            .tag_attributes(tag_attributes)
            .generic_attributes(generic)
            .url_schemes(schemes)
            .url_relative(relative)
            .link_rel(None);
        builder
    }
}

/// Compares tags and attributes, ignoring text.
fn same_elements(a: &SanitizedNode, b: &SanitizedNode) -> bool {
    let mut left = a.descendants();
    let mut right = b.descendants();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) => {
                let x_attrs: BTreeMap<String, &str> =
                    x.attributes().map(|(k, v)| (k.to_lowercase(), v)).collect();
                let y_attrs: BTreeMap<String, &str> =
                    y.attributes().map(|(k, v)| (k.to_lowercase(), v)).collect();
                if !x.tag().eq_ignore_ascii_case(y.tag()) || x_attrs != y_attrs {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
