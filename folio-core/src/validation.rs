//! Field validation for entities bound for the backing store.
//!
//! Column limits mirror the relational schema. Validators run inside the
//! write transaction immediately before the corresponding insert/update, so
//! a failure aborts the whole transaction.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::{Category, LogItem, Namespace, RecentChange, Topic, TopicVersion, VirtualWiki};
use crate::error::ValidationError;

/// Maximum length of a page name or topic name column.
pub const MAX_TOPIC_NAME_LENGTH: usize = 200;
/// Maximum length of an edit comment.
pub const MAX_COMMENT_LENGTH: usize = 200;
/// Maximum length of an author display string.
pub const MAX_AUTHOR_DISPLAY_LENGTH: usize = 100;
/// Maximum length of version/log free-text params.
pub const MAX_PARAMS_LENGTH: usize = 500;
/// Maximum length of a category sort key.
pub const MAX_SORT_KEY_LENGTH: usize = 200;
/// Maximum length of a virtual wiki name or site name.
pub const MAX_WIKI_NAME_LENGTH: usize = 100;

/// Characters that can never appear in a topic name: markup delimiters and
/// control characters.
static INVALID_TOPIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1f<>\[\]{}|#]").expect("invalid topic name pattern"));

/// Validate the characters and shape of a raw topic name. This runs before
/// any transaction opens.
pub fn validate_topic_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidTopicName {
            name: name.to_string(),
            reason: "name must not be blank".to_string(),
        });
    }
    if name != name.trim() {
        return Err(ValidationError::InvalidTopicName {
            name: name.to_string(),
            reason: "name must not have leading or trailing whitespace".to_string(),
        });
    }
    if name.chars().count() > MAX_TOPIC_NAME_LENGTH {
        return Err(ValidationError::InvalidTopicName {
            name: name.to_string(),
            reason: format!("name exceeds {} characters", MAX_TOPIC_NAME_LENGTH),
        });
    }
    if let Some(m) = INVALID_TOPIC_NAME.find(name) {
        return Err(ValidationError::InvalidTopicName {
            name: name.to_string(),
            reason: format!("illegal character at offset {}", m.start()),
        });
    }
    Ok(())
}

fn check_length(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::InvalidValue {
            field,
            reason: format!("exceeds {} characters", max),
        });
    }
    Ok(())
}

/// Validate a topic row before insert or update.
pub fn validate_topic(topic: &Topic) -> Result<(), ValidationError> {
    if topic.page_name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "page_name" });
    }
    check_length("page_name", &topic.page_name, MAX_TOPIC_NAME_LENGTH)?;
    if topic.virtual_wiki.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "virtual_wiki" });
    }
    if let Some(redirect_to) = &topic.redirect_to {
        check_length("redirect_to", redirect_to, MAX_TOPIC_NAME_LENGTH)?;
    }
    if topic.is_deleted() && !topic.topic_content.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "topic_content",
            reason: "deleted topics must have empty content".to_string(),
        });
    }
    Ok(())
}

/// Validate a topic version row before insert.
pub fn validate_topic_version(version: &TopicVersion) -> Result<(), ValidationError> {
    if version.topic_id.is_none() {
        return Err(ValidationError::RequiredFieldMissing { field: "topic_id" });
    }
    if version.author_id.is_none() && version.author_display.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "author_display" });
    }
    check_length("author_display", &version.author_display, MAX_AUTHOR_DISPLAY_LENGTH)?;
    if let Some(comment) = &version.edit_comment {
        check_length("edit_comment", comment, MAX_COMMENT_LENGTH)?;
    }
    if let Some(params) = &version.version_params {
        check_length("version_params", params, MAX_PARAMS_LENGTH)?;
    }
    Ok(())
}

/// Validate a category association row.
pub fn validate_category(category: &Category) -> Result<(), ValidationError> {
    if category.name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "category_name" });
    }
    check_length("category_name", &category.name, MAX_TOPIC_NAME_LENGTH)?;
    if let Some(sort_key) = &category.sort_key {
        check_length("sort_key", sort_key, MAX_SORT_KEY_LENGTH)?;
    }
    Ok(())
}

/// Validate a log item row.
pub fn validate_log_item(log_item: &LogItem) -> Result<(), ValidationError> {
    if log_item.user_id.is_none() && log_item.user_display.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "user_display" });
    }
    if let Some(comment) = &log_item.log_comment {
        check_length("log_comment", comment, MAX_COMMENT_LENGTH)?;
    }
    if let Some(params) = &log_item.log_params {
        check_length("log_params", params, MAX_PARAMS_LENGTH)?;
    }
    Ok(())
}

/// Validate a recent-change projection row.
pub fn validate_recent_change(change: &RecentChange) -> Result<(), ValidationError> {
    if change.author_display.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "author_display" });
    }
    if change.edit_type.is_none() && change.log_type.is_none() {
        return Err(ValidationError::RequiredFieldMissing { field: "edit_type" });
    }
    if let Some(comment) = &change.change_comment {
        check_length("change_comment", comment, MAX_COMMENT_LENGTH)?;
    }
    Ok(())
}

/// Validate a virtual wiki row.
pub fn validate_virtual_wiki(virtual_wiki: &VirtualWiki) -> Result<(), ValidationError> {
    if virtual_wiki.name.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "name" });
    }
    check_length("name", &virtual_wiki.name, MAX_WIKI_NAME_LENGTH)?;
    check_length("site_name", &virtual_wiki.site_name, MAX_WIKI_NAME_LENGTH)?;
    if virtual_wiki.root_topic_name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "root_topic_name" });
    }
    Ok(())
}

/// Validate a namespace row. The main namespace is the one namespace whose
/// label is legitimately empty (its topics carry no prefix).
pub fn validate_namespace(namespace: &Namespace) -> Result<(), ValidationError> {
    if namespace.id != crate::enums::namespace_id::MAIN
        && namespace.default_label.trim().is_empty()
    {
        return Err(ValidationError::RequiredFieldMissing { field: "default_label" });
    }
    check_length("default_label", &namespace.default_label, MAX_TOPIC_NAME_LENGTH)?;
    for (_, label) in &namespace.translations {
        check_length("namespace_translation", label, MAX_TOPIC_NAME_LENGTH)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::namespace_id;

    #[test]
    fn test_topic_name_rejects_markup_characters() {
        for bad in ["a[b", "a]b", "a{b", "a}b", "a|b", "a#b", "a<b", "a>b"] {
            assert!(validate_topic_name(bad).is_err(), "{bad} should be rejected");
        }
        assert!(validate_topic_name("Main Page").is_ok());
        assert!(validate_topic_name("Comments:Main Page").is_ok());
    }

    #[test]
    fn test_topic_name_rejects_blank_and_padded() {
        assert!(validate_topic_name("").is_err());
        assert!(validate_topic_name("   ").is_err());
        assert!(validate_topic_name(" Padded").is_err());
        assert!(validate_topic_name("Padded ").is_err());
    }

    #[test]
    fn test_topic_name_rejects_control_characters() {
        assert!(validate_topic_name("a\nb").is_err());
        assert!(validate_topic_name("a\tb").is_err());
    }

    #[test]
    fn test_topic_name_length_limit() {
        let long = "a".repeat(MAX_TOPIC_NAME_LENGTH + 1);
        assert!(validate_topic_name(&long).is_err());
        let ok = "a".repeat(MAX_TOPIC_NAME_LENGTH);
        assert!(validate_topic_name(&ok).is_ok());
    }

    #[test]
    fn test_deleted_topic_must_have_empty_content() {
        let mut topic = Topic::new(1, "en", namespace_id::MAIN, "Test");
        topic.delete_date = Some(chrono::Utc::now());
        topic.topic_content = "leftover".to_string();
        assert!(validate_topic(&topic).is_err());
        topic.topic_content.clear();
        assert!(validate_topic(&topic).is_ok());
    }

    #[test]
    fn test_version_requires_author() {
        let mut version = TopicVersion::new(None, "", None, "content", 0);
        version.topic_id = Some(1);
        assert!(validate_topic_version(&version).is_err());
        version.author_display = "127.0.0.1".to_string();
        assert!(validate_topic_version(&version).is_ok());
    }
}
