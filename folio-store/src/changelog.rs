//! Change and audit record construction.
//!
//! Every content-visible mutation produces one log item (permanent audit
//! trail) and, unless suppressed, one recent-change row (live display
//! projection). These builders derive both from the topic and version the
//! write path just persisted, so the rows always reference real ids.

use folio_core::{
    FolioResult, LogItem, LogType, RecentChange, Topic, TopicVersion, TopicVersionId,
    UserId, ValidationError,
};

/// JSON-encode free-text log parameters.
pub fn encode_params(params: &[&str]) -> FolioResult<String> {
    serde_json::to_string(params).map_err(|e| {
        ValidationError::InvalidValue {
            field: "log_params",
            reason: e.to_string(),
        }
        .into()
    })
}

/// The log item recorded alongside a topic version write. The log type is
/// derived from the version's edit type; `params` carries action-specific
/// context (the move destination, for example).
pub fn edit_log_item(
    topic: &Topic,
    version: &TopicVersion,
    params: Option<String>,
) -> LogItem {
    LogItem {
        log_type: LogType::for_edit(version.edit_type),
        virtual_wiki_id: topic.virtual_wiki_id,
        user_id: version.author_id,
        user_display: version.author_display.clone(),
        log_date: version.edit_date,
        log_comment: version.edit_comment.clone(),
        log_params: params,
        topic_id: topic.topic_id,
        topic_version_id: version.topic_version_id,
    }
}

/// The recent-change projection of a topic version write.
pub fn edit_recent_change(topic: &Topic, version: &TopicVersion, topic_name: String) -> RecentChange {
    RecentChange {
        virtual_wiki_id: topic.virtual_wiki_id,
        virtual_wiki: topic.virtual_wiki.clone(),
        topic_id: topic.topic_id,
        topic_name: Some(topic_name),
        topic_version_id: version.topic_version_id,
        previous_topic_version_id: version.previous_topic_version_id,
        edit_type: Some(version.edit_type),
        log_type: None,
        author_id: version.author_id,
        author_display: version.author_display.clone(),
        change_date: version.edit_date,
        change_comment: version.edit_comment.clone(),
        characters_changed: version.characters_changed,
    }
}

/// The log item recording a permanent version purge.
pub fn purge_log_item(
    topic: &Topic,
    purged_version_id: TopicVersionId,
    author_id: Option<UserId>,
    author_display: &str,
) -> FolioResult<LogItem> {
    let params = encode_params(&[&purged_version_id.to_string()])?;
    Ok(LogItem {
        log_type: LogType::Purge,
        virtual_wiki_id: topic.virtual_wiki_id,
        user_id: author_id,
        user_display: author_display.to_string(),
        log_date: chrono::Utc::now(),
        log_comment: None,
        log_params: Some(params),
        topic_id: topic.topic_id,
        // the purged version no longer exists; the row must not reference it
        topic_version_id: None,
    })
}

/// The recent-change projection of a log-only action (purge).
pub fn recent_change_from_log_item(log_item: &LogItem, virtual_wiki: &str, topic_name: Option<String>) -> RecentChange {
    RecentChange {
        virtual_wiki_id: log_item.virtual_wiki_id,
        virtual_wiki: virtual_wiki.to_string(),
        topic_id: log_item.topic_id,
        topic_name,
        topic_version_id: log_item.topic_version_id,
        previous_topic_version_id: None,
        edit_type: None,
        log_type: Some(log_item.log_type),
        author_id: log_item.user_id,
        author_display: log_item.user_display.clone(),
        change_date: log_item.log_date,
        change_comment: log_item.log_comment.clone(),
        characters_changed: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{namespace_id, EditType};

    fn topic_and_version() -> (Topic, TopicVersion) {
        let mut topic = Topic::new(1, "en", namespace_id::MAIN, "Test");
        topic.topic_id = Some(3);
        let mut version = TopicVersion::new(Some(7), "editor", Some("fix typo".to_string()), "hello", 5);
        version.topic_version_id = Some(12);
        version.topic_id = Some(3);
        version.previous_topic_version_id = Some(11);
        (topic, version)
    }

    #[test]
    fn test_edit_log_item_derives_log_type() {
        let (topic, mut version) = topic_and_version();
        let log = edit_log_item(&topic, &version, None);
        assert_eq!(log.log_type, LogType::Edit);
        assert_eq!(log.topic_version_id, Some(12));
        assert_eq!(log.user_id, Some(7));

        version.edit_type = EditType::Move;
        let log = edit_log_item(&topic, &version, Some("[\"Test2\"]".to_string()));
        assert_eq!(log.log_type, LogType::Move);
        assert_eq!(log.log_params.as_deref(), Some("[\"Test2\"]"));
    }

    #[test]
    fn test_edit_recent_change_carries_chain_pointers() {
        let (topic, version) = topic_and_version();
        let change = edit_recent_change(&topic, &version, "Test".to_string());
        assert_eq!(change.topic_version_id, Some(12));
        assert_eq!(change.previous_topic_version_id, Some(11));
        assert_eq!(change.edit_type, Some(EditType::Normal));
        assert_eq!(change.log_type, None);
        assert_eq!(change.characters_changed, 5);
    }

    #[test]
    fn test_purge_log_item_never_references_purged_version() {
        let (topic, _) = topic_and_version();
        let log = purge_log_item(&topic, 12, None, "admin").unwrap();
        assert_eq!(log.log_type, LogType::Purge);
        assert_eq!(log.topic_version_id, None);
        assert_eq!(log.log_params.as_deref(), Some("[\"12\"]"));
    }

    #[test]
    fn test_recent_change_from_log_item() {
        let (topic, _) = topic_and_version();
        let log = purge_log_item(&topic, 12, Some(7), "admin").unwrap();
        let change = recent_change_from_log_item(&log, "en", Some("Test".to_string()));
        assert_eq!(change.log_type, Some(LogType::Purge));
        assert_eq!(change.edit_type, None);
        assert_eq!(change.author_display, "admin");
    }
}
