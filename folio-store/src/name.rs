//! Topic name resolution.
//!
//! Splits raw document names into (namespace, page name), builds the cache
//! keys and display names derived from them, and answers the two fallback
//! questions the lookup path asks: "is there a case-flipped variant worth
//! retrying?" and "does the shared upload tenant apply here?".

use folio_core::enums::is_upload_namespace;
use folio_core::{namespace_id, FolioConfig, Namespace, NamespaceId};

/// A raw name split into its namespace and local page name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub namespace_id: NamespaceId,
    pub page_name: String,
}

/// Resolves names against one snapshot of the namespace list.
///
/// Cheap to construct; the store builds one per operation from its cached
/// namespace list rather than holding a copy that could go stale.
pub struct NameResolver<'a> {
    namespaces: &'a [Namespace],
    shared_upload_virtual_wiki: Option<&'a str>,
    allow_capitalization: bool,
}

impl<'a> NameResolver<'a> {
    pub fn new(namespaces: &'a [Namespace], config: &'a FolioConfig) -> Self {
        NameResolver {
            namespaces,
            shared_upload_virtual_wiki: config.shared_upload_virtual_wiki.as_deref(),
            allow_capitalization: config.allow_capitalization,
        }
    }

    /// Split a raw name on the namespace separator. The prefix is matched
    /// case-insensitively against each namespace's label for the given
    /// tenant (and its untranslated label); an unrecognized prefix is not an
    /// error, the whole name simply lives in the main namespace.
    pub fn parse(&self, virtual_wiki: &str, raw_name: &str) -> ParsedName {
        if let Some((prefix, rest)) = raw_name.split_once(':') {
            let prefix = prefix.trim();
            if !prefix.is_empty() && !rest.is_empty() {
                for namespace in self.namespaces {
                    if namespace.id == namespace_id::MAIN {
                        continue;
                    }
                    if namespace.label(virtual_wiki).eq_ignore_ascii_case(prefix)
                        || namespace.default_label.eq_ignore_ascii_case(prefix)
                    {
                        return ParsedName {
                            namespace_id: namespace.id,
                            page_name: rest.trim_start().to_string(),
                        };
                    }
                }
            }
        }
        ParsedName {
            namespace_id: namespace_id::MAIN,
            page_name: raw_name.to_string(),
        }
    }

    /// The full display name: namespace label prefix plus page name. Main
    /// namespace topics carry no prefix.
    pub fn build_topic_name(
        &self,
        virtual_wiki: &str,
        namespace_id: NamespaceId,
        page_name: &str,
    ) -> String {
        if namespace_id == namespace_id::MAIN {
            return page_name.to_string();
        }
        match self.namespaces.iter().find(|ns| ns.id == namespace_id) {
            Some(namespace) => format!("{}:{}", namespace.label(virtual_wiki), page_name),
            None => page_name.to_string(),
        }
    }

    /// The cache key for one (tenant, namespace, page name) triple.
    pub fn cache_key(
        &self,
        virtual_wiki: &str,
        namespace_id: NamespaceId,
        page_name: &str,
    ) -> String {
        format!(
            "{}/{}",
            virtual_wiki,
            self.build_topic_name(virtual_wiki, namespace_id, page_name)
        )
    }

    /// The case-flipped page name to retry with after an exact-name miss,
    /// when the namespace is case-insensitive and the fallback is enabled.
    /// Flips the case of the leading character only.
    pub fn alternate_page_name(
        &self,
        namespace_id: NamespaceId,
        page_name: &str,
    ) -> Option<String> {
        if !self.allow_capitalization {
            return None;
        }
        let namespace = self.namespaces.iter().find(|ns| ns.id == namespace_id)?;
        if namespace.case_sensitive {
            return None;
        }
        let mut chars = page_name.chars();
        let first = chars.next()?;
        let rest = chars.as_str();
        let flipped = if first.is_uppercase() {
            format!("{}{}", first.to_lowercase(), rest)
        } else {
            format!("{}{}", first.to_uppercase(), rest)
        };
        if flipped == page_name {
            None
        } else {
            Some(flipped)
        }
    }

    /// The shared upload tenant to fall back to, when one is configured,
    /// differs from the tenant being queried, and the namespace is an
    /// upload namespace. The shared tenant itself never falls back further.
    pub fn shared_tenant(
        &self,
        virtual_wiki: &str,
        namespace_id: NamespaceId,
    ) -> Option<&'a str> {
        let shared = self.shared_upload_virtual_wiki?;
        if shared == virtual_wiki || !is_upload_namespace(namespace_id) {
            return None;
        }
        Some(shared)
    }

    /// Media is a presentation namespace only; its topics are stored under
    /// File.
    pub fn storage_namespace(&self, namespace_id: NamespaceId) -> NamespaceId {
        if namespace_id == namespace_id::MEDIA {
            namespace_id::FILE
        } else {
            namespace_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespaces() -> Vec<Namespace> {
        let mut file = Namespace::new(namespace_id::FILE, "File");
        file.translations
            .push(("de".to_string(), "Datei".to_string()));
        let mut user = Namespace::new(namespace_id::USER, "User");
        user.case_sensitive = true;
        vec![
            Namespace::new(namespace_id::MAIN, ""),
            Namespace::new(namespace_id::COMMENTS, "Comments"),
            file,
            user,
            Namespace::new(namespace_id::SPECIAL, "Special"),
        ]
    }

    #[test]
    fn test_parse_recognized_prefix() {
        let namespaces = namespaces();
        let config = FolioConfig::default();
        let resolver = NameResolver::new(&namespaces, &config);
        let parsed = resolver.parse("en", "File:Example.png");
        assert_eq!(parsed.namespace_id, namespace_id::FILE);
        assert_eq!(parsed.page_name, "Example.png");
    }

    #[test]
    fn test_parse_translated_prefix() {
        let namespaces = namespaces();
        let config = FolioConfig::default();
        let resolver = NameResolver::new(&namespaces, &config);
        let parsed = resolver.parse("de", "Datei:Beispiel.png");
        assert_eq!(parsed.namespace_id, namespace_id::FILE);
        // the untranslated label still resolves for any tenant
        let parsed = resolver.parse("de", "File:Beispiel.png");
        assert_eq!(parsed.namespace_id, namespace_id::FILE);
    }

    #[test]
    fn test_parse_unrecognized_prefix_is_main() {
        let namespaces = namespaces();
        let config = FolioConfig::default();
        let resolver = NameResolver::new(&namespaces, &config);
        let parsed = resolver.parse("en", "Nosuch:Thing");
        assert_eq!(parsed.namespace_id, namespace_id::MAIN);
        assert_eq!(parsed.page_name, "Nosuch:Thing");
    }

    #[test]
    fn test_build_topic_name_and_cache_key() {
        let namespaces = namespaces();
        let config = FolioConfig::default();
        let resolver = NameResolver::new(&namespaces, &config);
        assert_eq!(
            resolver.build_topic_name("en", namespace_id::MAIN, "Test"),
            "Test"
        );
        assert_eq!(
            resolver.build_topic_name("de", namespace_id::FILE, "X.png"),
            "Datei:X.png"
        );
        assert_eq!(
            resolver.cache_key("en", namespace_id::FILE, "X.png"),
            "en/File:X.png"
        );
    }

    #[test]
    fn test_alternate_page_name_flips_leading_case() {
        let namespaces = namespaces();
        let config = FolioConfig::default();
        let resolver = NameResolver::new(&namespaces, &config);
        assert_eq!(
            resolver.alternate_page_name(namespace_id::MAIN, "test"),
            Some("Test".to_string())
        );
        assert_eq!(
            resolver.alternate_page_name(namespace_id::MAIN, "Test"),
            Some("test".to_string())
        );
        // no alphabetic case to flip
        assert_eq!(resolver.alternate_page_name(namespace_id::MAIN, "1234"), None);
    }

    #[test]
    fn test_alternate_page_name_respects_case_sensitive_namespace() {
        let namespaces = namespaces();
        let config = FolioConfig::default();
        let resolver = NameResolver::new(&namespaces, &config);
        assert_eq!(resolver.alternate_page_name(namespace_id::USER, "test"), None);
    }

    #[test]
    fn test_alternate_page_name_disabled_by_config() {
        let namespaces = namespaces();
        let config = FolioConfig::default().with_capitalization(false);
        let resolver = NameResolver::new(&namespaces, &config);
        assert_eq!(resolver.alternate_page_name(namespace_id::MAIN, "test"), None);
    }

    #[test]
    fn test_shared_tenant_applies_to_upload_namespaces_only() {
        let namespaces = namespaces();
        let config = FolioConfig::default().with_shared_upload_virtual_wiki("shared");
        let resolver = NameResolver::new(&namespaces, &config);
        assert_eq!(resolver.shared_tenant("en", namespace_id::FILE), Some("shared"));
        assert_eq!(resolver.shared_tenant("en", namespace_id::MEDIA), Some("shared"));
        assert_eq!(resolver.shared_tenant("en", namespace_id::MAIN), None);
        // the shared tenant never falls back to itself
        assert_eq!(resolver.shared_tenant("shared", namespace_id::FILE), None);
    }

    #[test]
    fn test_media_resolves_against_file_storage() {
        let namespaces = namespaces();
        let config = FolioConfig::default();
        let resolver = NameResolver::new(&namespaces, &config);
        assert_eq!(
            resolver.storage_namespace(namespace_id::MEDIA),
            namespace_id::FILE
        );
        assert_eq!(
            resolver.storage_namespace(namespace_id::MAIN),
            namespace_id::MAIN
        );
    }
}
