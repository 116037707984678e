//! Per-backend dialect strategy and the rendered statement catalog.

use folio_core::Sequence;

/// Bind-parameter placeholder style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?` positional markers (ANSI, MySQL).
    Question,
    /// `$1`, `$2`, ... numbered markers (Postgres).
    Numbered,
}

/// Row-limit clause style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT n` appended to the statement.
    LimitOffset,
    /// `FETCH FIRST n ROWS ONLY` appended to the statement.
    FetchFirst,
    /// The statement is wrapped in `SELECT * FROM (...) WHERE ROWNUM <= n`.
    RowNum,
}

/// How primary keys are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdAllocation {
    /// Native sequences (`nextval` / `.NEXTVAL`).
    Sequence,
    /// A surrogate sequence table, for engines without sequences.
    SequenceTable,
}

/// Strategy configuration for one relational backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub name: &'static str,
    pub placeholder: Placeholder,
    pub limit_style: LimitStyle,
    pub id_allocation: IdAllocation,
}

impl Dialect {
    /// Lowest-common-denominator SQL, used as the reference dialect.
    pub fn ansi() -> Self {
        Dialect {
            name: "ansi",
            placeholder: Placeholder::Question,
            limit_style: LimitStyle::FetchFirst,
            id_allocation: IdAllocation::SequenceTable,
        }
    }

    pub fn postgres() -> Self {
        Dialect {
            name: "postgres",
            placeholder: Placeholder::Numbered,
            limit_style: LimitStyle::LimitOffset,
            id_allocation: IdAllocation::Sequence,
        }
    }

    pub fn mysql() -> Self {
        Dialect {
            name: "mysql",
            placeholder: Placeholder::Question,
            limit_style: LimitStyle::LimitOffset,
            id_allocation: IdAllocation::SequenceTable,
        }
    }

    pub fn oracle() -> Self {
        Dialect {
            name: "oracle",
            placeholder: Placeholder::Question,
            limit_style: LimitStyle::RowNum,
            id_allocation: IdAllocation::Sequence,
        }
    }

    /// Rewrite `?` markers to this dialect's placeholder style.
    pub fn bindify(&self, sql: &str) -> String {
        match self.placeholder {
            Placeholder::Question => sql.to_string(),
            Placeholder::Numbered => {
                let mut out = String::with_capacity(sql.len() + 8);
                let mut n = 0;
                for ch in sql.chars() {
                    if ch == '?' {
                        n += 1;
                        out.push('$');
                        out.push_str(&n.to_string());
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
        }
    }

    /// Apply a row limit to a rendered statement. Limits come from trusted
    /// code paths, never user input, so they are rendered inline.
    pub fn apply_limit(&self, sql: &str, limit: usize) -> String {
        match self.limit_style {
            LimitStyle::LimitOffset => format!("{} LIMIT {}", sql, limit),
            LimitStyle::FetchFirst => format!("{} FETCH FIRST {} ROWS ONLY", sql, limit),
            LimitStyle::RowNum => {
                format!("SELECT * FROM ({}) WHERE ROWNUM <= {}", sql, limit)
            }
        }
    }

    /// The statement that yields the next value of a native sequence.
    /// Only meaningful for [`IdAllocation::Sequence`] dialects.
    pub fn next_sequence_value(&self, sequence: Sequence) -> String {
        match self.name {
            "oracle" => format!("SELECT {}.NEXTVAL AS next_value FROM DUAL", sequence.sql_name()),
            _ => format!("SELECT nextval('{}') AS next_value", sequence.sql_name()),
        }
    }
}

/// Every parameterized statement the SQL backend issues, rendered once for
/// one dialect. Column order here is the contract the row binders in
/// `backend.rs` follow.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    pub dialect: Dialect,

    pub select_virtual_wiki: String,
    pub select_virtual_wikis: String,
    pub insert_virtual_wiki: String,
    pub update_virtual_wiki: String,

    pub select_namespaces: String,
    pub select_namespace_translations: String,
    pub insert_namespace: String,
    pub update_namespace: String,
    pub delete_namespace_translations: String,
    pub insert_namespace_translation: String,

    pub select_topic: String,
    pub select_topic_by_id: String,
    pub select_topic_count: String,
    pub select_topic_count_namespace: String,
    pub select_topic_names: String,
    pub insert_topic: String,
    pub update_topic: String,

    pub select_topic_version: String,
    pub select_topic_version_next: String,
    pub select_topic_versions_asc: String,
    pub select_topic_versions_desc: String,
    pub insert_topic_version: String,
    pub update_topic_version: String,
    pub delete_topic_version: String,

    pub select_categories: String,
    pub select_topic_categories: String,
    pub delete_topic_categories: String,
    pub insert_category: String,

    pub select_topic_links: String,
    pub delete_topic_links: String,
    pub insert_topic_link: String,

    pub insert_log_item: String,
    pub insert_recent_change: String,
    pub delete_recent_changes: String,
    pub delete_log_items_by_version: String,
    pub delete_recent_changes_by_version: String,
    pub update_recent_changes_previous: String,
    pub select_recent_changes: String,
    pub select_log_items: String,
    pub select_log_items_by_type: String,

    pub update_sequence_table: String,
    pub select_sequence_table: String,
    pub existence_probe: String,
}

const TOPIC_COLUMNS: &str = "topic_id, virtual_wiki_id, virtual_wiki_name, namespace_id, \
    page_name, topic_type, current_version_id, topic_content, redirect_to, delete_date, \
    read_only, admin_only";

const TOPIC_VERSION_COLUMNS: &str = "topic_version_id, topic_id, edit_type, version_content, \
    author_id, author_display, edit_date, edit_comment, characters_changed, \
    previous_topic_version_id, version_params, recent_change_allowed";

const RECENT_CHANGE_COLUMNS: &str = "virtual_wiki_id, virtual_wiki_name, topic_id, topic_name, \
    topic_version_id, previous_topic_version_id, edit_type, log_type, author_id, \
    author_display, change_date, change_comment, characters_changed";

const LOG_ITEM_COLUMNS: &str = "log_type, virtual_wiki_id, user_id, user_display, log_date, \
    log_comment, log_params, topic_id, topic_version_id";

impl QueryCatalog {
    pub fn new(dialect: Dialect) -> Self {
        let b = |sql: &str| dialect.bindify(sql);
        QueryCatalog {
            select_virtual_wiki: b(
                "SELECT virtual_wiki_id, name, root_topic_name, site_name, logo_image_url, \
                 meta_description FROM folio_virtual_wiki WHERE name = ?",
            ),
            select_virtual_wikis: b(
                "SELECT virtual_wiki_id, name, root_topic_name, site_name, logo_image_url, \
                 meta_description FROM folio_virtual_wiki ORDER BY virtual_wiki_id",
            ),
            insert_virtual_wiki: b(
                "INSERT INTO folio_virtual_wiki (virtual_wiki_id, name, root_topic_name, \
                 site_name, logo_image_url, meta_description) VALUES (?, ?, ?, ?, ?, ?)",
            ),
            update_virtual_wiki: b(
                "UPDATE folio_virtual_wiki SET root_topic_name = ?, site_name = ?, \
                 logo_image_url = ?, meta_description = ? WHERE virtual_wiki_id = ?",
            ),
            select_namespaces: b(
                "SELECT namespace_id, default_label, main_namespace_id, case_sensitive \
                 FROM folio_namespace ORDER BY namespace_id",
            ),
            select_namespace_translations: b(
                "SELECT namespace_id, virtual_wiki_name, label \
                 FROM folio_namespace_translation ORDER BY namespace_id",
            ),
            insert_namespace: b(
                "INSERT INTO folio_namespace (namespace_id, default_label, main_namespace_id, \
                 case_sensitive) VALUES (?, ?, ?, ?)",
            ),
            update_namespace: b(
                "UPDATE folio_namespace SET default_label = ?, main_namespace_id = ?, \
                 case_sensitive = ? WHERE namespace_id = ?",
            ),
            delete_namespace_translations: b(
                "DELETE FROM folio_namespace_translation WHERE namespace_id = ?",
            ),
            insert_namespace_translation: b(
                "INSERT INTO folio_namespace_translation (namespace_id, virtual_wiki_name, \
                 label) VALUES (?, ?, ?)",
            ),
            select_topic: b(&format!(
                "SELECT {TOPIC_COLUMNS} FROM folio_topic WHERE virtual_wiki_id = ? AND \
                 namespace_id = ? AND page_name = ?"
            )),
            select_topic_by_id: b(&format!(
                "SELECT {TOPIC_COLUMNS} FROM folio_topic WHERE topic_id = ?"
            )),
            select_topic_count: b(
                "SELECT COUNT(*) AS topic_count FROM folio_topic WHERE virtual_wiki_id = ? \
                 AND delete_date IS NULL",
            ),
            select_topic_count_namespace: b(
                "SELECT COUNT(*) AS topic_count FROM folio_topic WHERE virtual_wiki_id = ? \
                 AND namespace_id = ? AND delete_date IS NULL",
            ),
            select_topic_names: b(
                "SELECT topic_id, namespace_id, page_name FROM folio_topic \
                 WHERE virtual_wiki_id = ? AND (delete_date IS NULL OR ? = 1) \
                 ORDER BY topic_id",
            ),
            insert_topic: b(&format!(
                "INSERT INTO folio_topic ({TOPIC_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            )),
            update_topic: b(
                "UPDATE folio_topic SET virtual_wiki_id = ?, virtual_wiki_name = ?, \
                 namespace_id = ?, page_name = ?, topic_type = ?, current_version_id = ?, \
                 topic_content = ?, redirect_to = ?, delete_date = ?, read_only = ?, \
                 admin_only = ? WHERE topic_id = ?",
            ),
            select_topic_version: b(&format!(
                "SELECT {TOPIC_VERSION_COLUMNS} FROM folio_topic_version \
                 WHERE topic_version_id = ?"
            )),
            select_topic_version_next: b(
                "SELECT topic_version_id FROM folio_topic_version \
                 WHERE previous_topic_version_id = ?",
            ),
            select_topic_versions_asc: b(&format!(
                "SELECT {TOPIC_VERSION_COLUMNS} FROM folio_topic_version WHERE topic_id = ? \
                 ORDER BY topic_version_id"
            )),
            select_topic_versions_desc: b(&format!(
                "SELECT {TOPIC_VERSION_COLUMNS} FROM folio_topic_version WHERE topic_id = ? \
                 ORDER BY topic_version_id DESC"
            )),
            insert_topic_version: b(&format!(
                "INSERT INTO folio_topic_version ({TOPIC_VERSION_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            )),
            update_topic_version: b(
                "UPDATE folio_topic_version SET previous_topic_version_id = ? \
                 WHERE topic_version_id = ?",
            ),
            delete_topic_version: b(
                "DELETE FROM folio_topic_version WHERE topic_version_id = ?",
            ),
            select_categories: b(
                "SELECT virtual_wiki_id, child_topic_id, category_name, sort_key \
                 FROM folio_category WHERE virtual_wiki_id = ? ORDER BY category_name",
            ),
            select_topic_categories: b(
                "SELECT virtual_wiki_id, child_topic_id, category_name, sort_key \
                 FROM folio_category WHERE child_topic_id = ?",
            ),
            delete_topic_categories: b(
                "DELETE FROM folio_category WHERE child_topic_id = ?",
            ),
            insert_category: b(
                "INSERT INTO folio_category (virtual_wiki_id, child_topic_id, category_name, \
                 sort_key) VALUES (?, ?, ?, ?)",
            ),
            select_topic_links: b(
                "SELECT topic_id, target_namespace_id, target_page_name FROM folio_topic_link \
                 WHERE topic_id = ?",
            ),
            delete_topic_links: b("DELETE FROM folio_topic_link WHERE topic_id = ?"),
            insert_topic_link: b(
                "INSERT INTO folio_topic_link (topic_id, target_namespace_id, \
                 target_page_name) VALUES (?, ?, ?)",
            ),
            insert_log_item: b(&format!(
                "INSERT INTO folio_log_item ({LOG_ITEM_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
            )),
            insert_recent_change: b(&format!(
                "INSERT INTO folio_recent_change ({RECENT_CHANGE_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            )),
            delete_recent_changes: b("DELETE FROM folio_recent_change WHERE topic_id = ?"),
            delete_log_items_by_version: b(
                "DELETE FROM folio_log_item WHERE topic_version_id = ?",
            ),
            delete_recent_changes_by_version: b(
                "DELETE FROM folio_recent_change WHERE topic_version_id = ?",
            ),
            update_recent_changes_previous: b(
                "UPDATE folio_recent_change SET previous_topic_version_id = ? \
                 WHERE previous_topic_version_id = ?",
            ),
            select_recent_changes: b(&format!(
                "SELECT {RECENT_CHANGE_COLUMNS} FROM folio_recent_change \
                 WHERE virtual_wiki_id = ? ORDER BY change_date DESC"
            )),
            select_log_items: b(&format!(
                "SELECT {LOG_ITEM_COLUMNS} FROM folio_log_item WHERE virtual_wiki_id = ? \
                 ORDER BY log_date DESC"
            )),
            select_log_items_by_type: b(&format!(
                "SELECT {LOG_ITEM_COLUMNS} FROM folio_log_item WHERE virtual_wiki_id = ? \
                 AND log_type = ? ORDER BY log_date DESC"
            )),
            update_sequence_table: b(
                "UPDATE folio_sequence SET next_value = next_value + 1 \
                 WHERE sequence_name = ?",
            ),
            select_sequence_table: b(
                "SELECT next_value FROM folio_sequence WHERE sequence_name = ?",
            ),
            existence_probe: dialect
                .apply_limit("SELECT virtual_wiki_id FROM folio_virtual_wiki", 1),
            dialect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindify_numbers_placeholders() {
        let pg = Dialect::postgres();
        assert_eq!(
            pg.bindify("SELECT a FROM t WHERE b = ? AND c = ?"),
            "SELECT a FROM t WHERE b = $1 AND c = $2"
        );
        let ansi = Dialect::ansi();
        assert_eq!(
            ansi.bindify("SELECT a FROM t WHERE b = ?"),
            "SELECT a FROM t WHERE b = ?"
        );
    }

    #[test]
    fn test_limit_styles() {
        assert_eq!(
            Dialect::postgres().apply_limit("SELECT 1", 5),
            "SELECT 1 LIMIT 5"
        );
        assert_eq!(
            Dialect::ansi().apply_limit("SELECT 1", 5),
            "SELECT 1 FETCH FIRST 5 ROWS ONLY"
        );
        assert_eq!(
            Dialect::oracle().apply_limit("SELECT 1", 5),
            "SELECT * FROM (SELECT 1) WHERE ROWNUM <= 5"
        );
    }

    #[test]
    fn test_catalog_renders_dialect_placeholders() {
        let catalog = QueryCatalog::new(Dialect::postgres());
        assert!(catalog.select_topic.contains("$3"));
        assert!(!catalog.select_topic.contains('?'));
        let ansi = QueryCatalog::new(Dialect::ansi());
        assert!(ansi.select_topic.contains('?'));
    }

    #[test]
    fn test_sequence_statements() {
        let pg = Dialect::postgres();
        assert!(pg
            .next_sequence_value(Sequence::Topic)
            .contains("nextval('folio_topic_seq')"));
        let oracle = Dialect::oracle();
        assert!(oracle
            .next_sequence_value(Sequence::Topic)
            .contains("folio_topic_seq.NEXTVAL"));
    }
}
