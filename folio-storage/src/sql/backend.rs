//! Backing store implementation over the [`SqlExecutor`] seam.

use folio_core::{
    Category, EditType, FolioResult, LogItem, LogType, Namespace, NamespaceId, RecentChange,
    Sequence, StorageError, Topic, TopicId, TopicLink, TopicType, TopicVersion, TopicVersionId,
    VirtualWiki, VirtualWikiId,
};
use tracing::warn;

use super::dialect::{IdAllocation, QueryCatalog};
use super::executor::{SqlExecutor, SqlRow, SqlValue};
use crate::{BackingStore, StoreReader, StoreTransaction};

/// Relational backing store: renders statements from the dialect catalog
/// and executes them through the attached driver.
pub struct SqlBackingStore<E: SqlExecutor> {
    executor: E,
    catalog: QueryCatalog,
}

impl<E: SqlExecutor> SqlBackingStore<E> {
    pub fn new(executor: E, catalog: QueryCatalog) -> Self {
        SqlBackingStore { executor, catalog }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    fn query_one(&self, sql: &str, params: &[SqlValue]) -> FolioResult<Option<SqlRow>> {
        Ok(self.executor.query(sql, params)?.into_iter().next())
    }

    // === Shared read logic, used by both the store and its transactions.
    // The executor routes statements over the same connection, so reads
    // issued while a transaction is open observe its uncommitted writes. ===

    fn read_virtual_wiki(&self, name: &str) -> FolioResult<Option<VirtualWiki>> {
        self.query_one(
            &self.catalog.select_virtual_wiki,
            &[SqlValue::Text(name.to_string())],
        )?
        .map(|row| virtual_wiki_from_row(&row))
        .transpose()
    }

    fn read_virtual_wikis(&self) -> FolioResult<Vec<VirtualWiki>> {
        self.executor
            .query(&self.catalog.select_virtual_wikis, &[])?
            .iter()
            .map(virtual_wiki_from_row)
            .collect()
    }

    fn read_namespaces(&self) -> FolioResult<Vec<Namespace>> {
        let mut namespaces: Vec<Namespace> = self
            .executor
            .query(&self.catalog.select_namespaces, &[])?
            .iter()
            .map(namespace_from_row)
            .collect::<FolioResult<_>>()?;
        for row in self
            .executor
            .query(&self.catalog.select_namespace_translations, &[])?
        {
            let id = row.i32("namespace_translation", "namespace_id")?;
            let virtual_wiki = row.text("namespace_translation", "virtual_wiki_name")?;
            let label = row.text("namespace_translation", "label")?;
            if let Some(ns) = namespaces.iter_mut().find(|ns| ns.id == id) {
                ns.translations.push((virtual_wiki, label));
            }
        }
        Ok(namespaces)
    }

    fn read_topic(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: NamespaceId,
        page_name: &str,
    ) -> FolioResult<Option<Topic>> {
        self.query_one(
            &self.catalog.select_topic,
            &[
                SqlValue::I32(virtual_wiki_id),
                SqlValue::I32(namespace_id),
                SqlValue::Text(page_name.to_string()),
            ],
        )?
        .map(|row| topic_from_row(&row))
        .transpose()
    }

    fn read_topic_by_id(&self, topic_id: TopicId) -> FolioResult<Option<Topic>> {
        self.query_one(&self.catalog.select_topic_by_id, &[SqlValue::I32(topic_id)])?
            .map(|row| topic_from_row(&row))
            .transpose()
    }

    fn read_topic_count(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: Option<NamespaceId>,
    ) -> FolioResult<i64> {
        let row = match namespace_id {
            Some(ns) => self.query_one(
                &self.catalog.select_topic_count_namespace,
                &[SqlValue::I32(virtual_wiki_id), SqlValue::I32(ns)],
            )?,
            None => self.query_one(
                &self.catalog.select_topic_count,
                &[SqlValue::I32(virtual_wiki_id)],
            )?,
        };
        match row {
            Some(row) => row.i64("topic", "topic_count"),
            None => Ok(0),
        }
    }

    fn read_topic_names(
        &self,
        virtual_wiki_id: VirtualWikiId,
        include_deleted: bool,
    ) -> FolioResult<Vec<(TopicId, NamespaceId, String)>> {
        self.executor
            .query(
                &self.catalog.select_topic_names,
                &[
                    SqlValue::I32(virtual_wiki_id),
                    SqlValue::I32(if include_deleted { 1 } else { 0 }),
                ],
            )?
            .iter()
            .map(|row| {
                Ok((
                    row.i32("topic", "topic_id")?,
                    row.i32("topic", "namespace_id")?,
                    row.text("topic", "page_name")?,
                ))
            })
            .collect()
    }

    fn read_topic_version(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersion>> {
        self.query_one(
            &self.catalog.select_topic_version,
            &[SqlValue::I32(topic_version_id)],
        )?
        .map(|row| topic_version_from_row(&row))
        .transpose()
    }

    fn read_next_topic_version_id(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersionId>> {
        self.query_one(
            &self.catalog.select_topic_version_next,
            &[SqlValue::I32(topic_version_id)],
        )?
        .map(|row| row.i32("topic_version", "topic_version_id"))
        .transpose()
    }

    fn read_all_topic_versions(
        &self,
        topic_id: TopicId,
        descending: bool,
    ) -> FolioResult<Vec<TopicVersion>> {
        let sql = if descending {
            &self.catalog.select_topic_versions_desc
        } else {
            &self.catalog.select_topic_versions_asc
        };
        self.executor
            .query(sql, &[SqlValue::I32(topic_id)])?
            .iter()
            .map(topic_version_from_row)
            .collect()
    }

    fn read_categories(&self, virtual_wiki_id: VirtualWikiId) -> FolioResult<Vec<Category>> {
        self.executor
            .query(&self.catalog.select_categories, &[SqlValue::I32(virtual_wiki_id)])?
            .iter()
            .map(category_from_row)
            .collect()
    }

    fn read_topic_categories(&self, topic_id: TopicId) -> FolioResult<Vec<Category>> {
        self.executor
            .query(&self.catalog.select_topic_categories, &[SqlValue::I32(topic_id)])?
            .iter()
            .map(category_from_row)
            .collect()
    }

    fn read_topic_links(&self, topic_id: TopicId) -> FolioResult<Vec<TopicLink>> {
        self.executor
            .query(&self.catalog.select_topic_links, &[SqlValue::I32(topic_id)])?
            .iter()
            .map(|row| {
                Ok(TopicLink {
                    topic_id: row.i32("topic_link", "topic_id")?,
                    target_namespace_id: row.i32("topic_link", "target_namespace_id")?,
                    target_page_name: row.text("topic_link", "target_page_name")?,
                })
            })
            .collect()
    }

    fn read_recent_changes(
        &self,
        virtual_wiki_id: VirtualWikiId,
        limit: usize,
    ) -> FolioResult<Vec<RecentChange>> {
        let sql = self
            .catalog
            .dialect
            .apply_limit(&self.catalog.select_recent_changes, limit);
        self.executor
            .query(&sql, &[SqlValue::I32(virtual_wiki_id)])?
            .iter()
            .map(recent_change_from_row)
            .collect()
    }

    fn read_log_items(
        &self,
        virtual_wiki_id: VirtualWikiId,
        log_type: Option<LogType>,
        limit: usize,
    ) -> FolioResult<Vec<LogItem>> {
        let rows = match log_type {
            Some(lt) => {
                let sql = self
                    .catalog
                    .dialect
                    .apply_limit(&self.catalog.select_log_items_by_type, limit);
                self.executor.query(
                    &sql,
                    &[SqlValue::I32(virtual_wiki_id), SqlValue::I32(lt.as_i32())],
                )?
            }
            None => {
                let sql = self
                    .catalog
                    .dialect
                    .apply_limit(&self.catalog.select_log_items, limit);
                self.executor.query(&sql, &[SqlValue::I32(virtual_wiki_id)])?
            }
        };
        rows.iter().map(log_item_from_row).collect()
    }
}

macro_rules! impl_store_reader {
    ($type:ty) => {
        impl<E: SqlExecutor> StoreReader for $type {
            fn lookup_virtual_wiki(&self, name: &str) -> FolioResult<Option<VirtualWiki>> {
                self.backend().read_virtual_wiki(name)
            }

            fn virtual_wikis(&self) -> FolioResult<Vec<VirtualWiki>> {
                self.backend().read_virtual_wikis()
            }

            fn namespaces(&self) -> FolioResult<Vec<Namespace>> {
                self.backend().read_namespaces()
            }

            fn lookup_topic(
                &self,
                virtual_wiki_id: VirtualWikiId,
                namespace_id: NamespaceId,
                page_name: &str,
            ) -> FolioResult<Option<Topic>> {
                self.backend().read_topic(virtual_wiki_id, namespace_id, page_name)
            }

            fn lookup_topic_by_id(&self, topic_id: TopicId) -> FolioResult<Option<Topic>> {
                self.backend().read_topic_by_id(topic_id)
            }

            fn topic_count(
                &self,
                virtual_wiki_id: VirtualWikiId,
                namespace_id: Option<NamespaceId>,
            ) -> FolioResult<i64> {
                self.backend().read_topic_count(virtual_wiki_id, namespace_id)
            }

            fn topic_names(
                &self,
                virtual_wiki_id: VirtualWikiId,
                include_deleted: bool,
            ) -> FolioResult<Vec<(TopicId, NamespaceId, String)>> {
                self.backend().read_topic_names(virtual_wiki_id, include_deleted)
            }

            fn lookup_topic_version(
                &self,
                topic_version_id: TopicVersionId,
            ) -> FolioResult<Option<TopicVersion>> {
                self.backend().read_topic_version(topic_version_id)
            }

            fn next_topic_version_id(
                &self,
                topic_version_id: TopicVersionId,
            ) -> FolioResult<Option<TopicVersionId>> {
                self.backend().read_next_topic_version_id(topic_version_id)
            }

            fn all_topic_versions(
                &self,
                topic_id: TopicId,
                descending: bool,
            ) -> FolioResult<Vec<TopicVersion>> {
                self.backend().read_all_topic_versions(topic_id, descending)
            }

            fn categories(&self, virtual_wiki_id: VirtualWikiId) -> FolioResult<Vec<Category>> {
                self.backend().read_categories(virtual_wiki_id)
            }

            fn topic_categories(&self, topic_id: TopicId) -> FolioResult<Vec<Category>> {
                self.backend().read_topic_categories(topic_id)
            }

            fn topic_links(&self, topic_id: TopicId) -> FolioResult<Vec<TopicLink>> {
                self.backend().read_topic_links(topic_id)
            }

            fn recent_changes(
                &self,
                virtual_wiki_id: VirtualWikiId,
                limit: usize,
            ) -> FolioResult<Vec<RecentChange>> {
                self.backend().read_recent_changes(virtual_wiki_id, limit)
            }

            fn log_items(
                &self,
                virtual_wiki_id: VirtualWikiId,
                log_type: Option<LogType>,
                limit: usize,
            ) -> FolioResult<Vec<LogItem>> {
                self.backend().read_log_items(virtual_wiki_id, log_type, limit)
            }
        }
    };
}

impl<E: SqlExecutor> SqlBackingStore<E> {
    fn backend(&self) -> &SqlBackingStore<E> {
        self
    }
}

impl_store_reader!(SqlBackingStore<E>);

impl<E: SqlExecutor> BackingStore for SqlBackingStore<E> {
    fn transaction(&self) -> FolioResult<Box<dyn StoreTransaction + '_>> {
        self.executor.begin()?;
        Ok(Box::new(SqlTransaction {
            store: self,
            finished: false,
        }))
    }

    fn schema_initialized(&self) -> FolioResult<bool> {
        // The probe fails with an "unknown table" error on an empty schema.
        match self.executor.query(&self.catalog.existence_probe, &[]) {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// Open SQL transaction. Dropping without commit rolls back.
pub struct SqlTransaction<'a, E: SqlExecutor> {
    store: &'a SqlBackingStore<E>,
    finished: bool,
}

impl<E: SqlExecutor> SqlTransaction<'_, E> {
    fn backend(&self) -> &SqlBackingStore<E> {
        self.store
    }

    fn executor(&self) -> &E {
        &self.store.executor
    }

    fn catalog(&self) -> &QueryCatalog {
        &self.store.catalog
    }
}

impl_store_reader!(SqlTransaction<'_, E>);

impl<E: SqlExecutor> StoreTransaction for SqlTransaction<'_, E> {
    fn next_id(&mut self, sequence: Sequence) -> FolioResult<i32> {
        match self.catalog().dialect.id_allocation {
            IdAllocation::Sequence => {
                let sql = self.catalog().dialect.next_sequence_value(sequence);
                let row = self
                    .executor()
                    .query(&sql, &[])?
                    .into_iter()
                    .next()
                    .ok_or_else(|| StorageError::Unavailable {
                        reason: format!("sequence {} returned no row", sequence.sql_name()),
                    })?;
                row.i32("sequence", "next_value")
            }
            IdAllocation::SequenceTable => {
                let name = SqlValue::Text(sequence.sql_name().to_string());
                self.executor()
                    .execute(&self.catalog().update_sequence_table, &[name.clone()])?;
                let row = self
                    .executor()
                    .query(&self.catalog().select_sequence_table, &[name])?
                    .into_iter()
                    .next()
                    .ok_or_else(|| StorageError::Unavailable {
                        reason: format!("sequence row {} missing", sequence.sql_name()),
                    })?;
                row.i32("sequence", "next_value")
            }
        }
    }

    fn insert_virtual_wiki(&mut self, virtual_wiki: &VirtualWiki) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().insert_virtual_wiki,
            &[
                SqlValue::opt_i32(virtual_wiki.virtual_wiki_id),
                SqlValue::Text(virtual_wiki.name.clone()),
                SqlValue::Text(virtual_wiki.root_topic_name.clone()),
                SqlValue::Text(virtual_wiki.site_name.clone()),
                SqlValue::opt_text(virtual_wiki.logo_image_url.as_deref()),
                SqlValue::opt_text(virtual_wiki.meta_description.as_deref()),
            ],
        )?;
        Ok(())
    }

    fn update_virtual_wiki(&mut self, virtual_wiki: &VirtualWiki) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().update_virtual_wiki,
            &[
                SqlValue::Text(virtual_wiki.root_topic_name.clone()),
                SqlValue::Text(virtual_wiki.site_name.clone()),
                SqlValue::opt_text(virtual_wiki.logo_image_url.as_deref()),
                SqlValue::opt_text(virtual_wiki.meta_description.as_deref()),
                SqlValue::opt_i32(virtual_wiki.virtual_wiki_id),
            ],
        )?;
        Ok(())
    }

    fn save_namespace(&mut self, namespace: &Namespace) -> FolioResult<()> {
        let updated = self.executor().execute(
            &self.catalog().update_namespace,
            &[
                SqlValue::Text(namespace.default_label.clone()),
                SqlValue::opt_i32(namespace.main_namespace_id),
                SqlValue::Bool(namespace.case_sensitive),
                SqlValue::I32(namespace.id),
            ],
        )?;
        if updated == 0 {
            self.executor().execute(
                &self.catalog().insert_namespace,
                &[
                    SqlValue::I32(namespace.id),
                    SqlValue::Text(namespace.default_label.clone()),
                    SqlValue::opt_i32(namespace.main_namespace_id),
                    SqlValue::Bool(namespace.case_sensitive),
                ],
            )?;
        }
        self.executor().execute(
            &self.catalog().delete_namespace_translations,
            &[SqlValue::I32(namespace.id)],
        )?;
        for (virtual_wiki, label) in &namespace.translations {
            self.executor().execute(
                &self.catalog().insert_namespace_translation,
                &[
                    SqlValue::I32(namespace.id),
                    SqlValue::Text(virtual_wiki.clone()),
                    SqlValue::Text(label.clone()),
                ],
            )?;
        }
        Ok(())
    }

    fn insert_topic(&mut self, topic: &Topic) -> FolioResult<()> {
        self.executor()
            .execute(&self.catalog().insert_topic, &topic_insert_params(topic))?;
        Ok(())
    }

    fn update_topic(&mut self, topic: &Topic) -> FolioResult<()> {
        self.executor()
            .execute(&self.catalog().update_topic, &topic_update_params(topic))?;
        Ok(())
    }

    fn insert_topic_version(&mut self, version: &TopicVersion) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().insert_topic_version,
            &topic_version_insert_params(version),
        )?;
        Ok(())
    }

    fn update_topic_version(&mut self, version: &TopicVersion) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().update_topic_version,
            &[
                SqlValue::opt_i32(version.previous_topic_version_id),
                SqlValue::opt_i32(version.topic_version_id),
            ],
        )?;
        Ok(())
    }

    fn delete_topic_version(&mut self, topic_version_id: TopicVersionId) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().delete_topic_version,
            &[SqlValue::I32(topic_version_id)],
        )?;
        Ok(())
    }

    fn delete_topic_categories(&mut self, topic_id: TopicId) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().delete_topic_categories,
            &[SqlValue::I32(topic_id)],
        )?;
        Ok(())
    }

    fn insert_categories(&mut self, categories: &[Category]) -> FolioResult<()> {
        for category in categories {
            self.executor().execute(
                &self.catalog().insert_category,
                &[
                    SqlValue::I32(category.virtual_wiki_id),
                    SqlValue::I32(category.child_topic_id),
                    SqlValue::Text(category.name.clone()),
                    SqlValue::opt_text(category.sort_key.as_deref()),
                ],
            )?;
        }
        Ok(())
    }

    fn delete_topic_links(&mut self, topic_id: TopicId) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().delete_topic_links,
            &[SqlValue::I32(topic_id)],
        )?;
        Ok(())
    }

    fn insert_topic_links(&mut self, links: &[TopicLink]) -> FolioResult<()> {
        for link in links {
            self.executor().execute(
                &self.catalog().insert_topic_link,
                &[
                    SqlValue::I32(link.topic_id),
                    SqlValue::I32(link.target_namespace_id),
                    SqlValue::Text(link.target_page_name.clone()),
                ],
            )?;
        }
        Ok(())
    }

    fn insert_log_item(&mut self, log_item: &LogItem) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().insert_log_item,
            &[
                SqlValue::I32(log_item.log_type.as_i32()),
                SqlValue::I32(log_item.virtual_wiki_id),
                SqlValue::opt_i32(log_item.user_id),
                SqlValue::Text(log_item.user_display.clone()),
                SqlValue::Timestamp(log_item.log_date),
                SqlValue::opt_text(log_item.log_comment.as_deref()),
                SqlValue::opt_text(log_item.log_params.as_deref()),
                SqlValue::opt_i32(log_item.topic_id),
                SqlValue::opt_i32(log_item.topic_version_id),
            ],
        )?;
        Ok(())
    }

    fn insert_recent_change(&mut self, change: &RecentChange) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().insert_recent_change,
            &[
                SqlValue::I32(change.virtual_wiki_id),
                SqlValue::Text(change.virtual_wiki.clone()),
                SqlValue::opt_i32(change.topic_id),
                SqlValue::opt_text(change.topic_name.as_deref()),
                SqlValue::opt_i32(change.topic_version_id),
                SqlValue::opt_i32(change.previous_topic_version_id),
                SqlValue::opt_i32(change.edit_type.map(|e| e.as_i32())),
                SqlValue::opt_i32(change.log_type.map(|l| l.as_i32())),
                SqlValue::opt_i32(change.author_id),
                SqlValue::Text(change.author_display.clone()),
                SqlValue::Timestamp(change.change_date),
                SqlValue::opt_text(change.change_comment.as_deref()),
                SqlValue::I32(change.characters_changed),
            ],
        )?;
        Ok(())
    }

    fn delete_recent_changes(&mut self, topic_id: TopicId) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().delete_recent_changes,
            &[SqlValue::I32(topic_id)],
        )?;
        Ok(())
    }

    fn delete_log_items_by_version(
        &mut self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().delete_log_items_by_version,
            &[SqlValue::I32(topic_version_id)],
        )?;
        Ok(())
    }

    fn delete_recent_changes_by_version(
        &mut self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().delete_recent_changes_by_version,
            &[SqlValue::I32(topic_version_id)],
        )?;
        Ok(())
    }

    fn update_recent_changes_previous(
        &mut self,
        from: TopicVersionId,
        to: Option<TopicVersionId>,
    ) -> FolioResult<()> {
        self.executor().execute(
            &self.catalog().update_recent_changes_previous,
            &[SqlValue::opt_i32(to), SqlValue::I32(from)],
        )?;
        Ok(())
    }

    fn reader(&self) -> &dyn StoreReader {
        self
    }

    fn commit(mut self: Box<Self>) -> FolioResult<()> {
        self.finished = true;
        self.store.executor.commit()
    }
}

impl<E: SqlExecutor> Drop for SqlTransaction<'_, E> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.store.executor.rollback() {
                warn!(error = %e, "rollback failed while dropping transaction");
            }
        }
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn virtual_wiki_from_row(row: &SqlRow) -> FolioResult<VirtualWiki> {
    Ok(VirtualWiki {
        virtual_wiki_id: Some(row.i32("virtual_wiki", "virtual_wiki_id")?),
        name: row.text("virtual_wiki", "name")?,
        root_topic_name: row.text("virtual_wiki", "root_topic_name")?,
        site_name: row.text("virtual_wiki", "site_name")?,
        logo_image_url: row.opt_text("virtual_wiki", "logo_image_url")?,
        meta_description: row.opt_text("virtual_wiki", "meta_description")?,
    })
}

fn namespace_from_row(row: &SqlRow) -> FolioResult<Namespace> {
    Ok(Namespace {
        id: row.i32("namespace", "namespace_id")?,
        default_label: row.text("namespace", "default_label")?,
        main_namespace_id: row.opt_i32("namespace", "main_namespace_id")?,
        case_sensitive: row.bool("namespace", "case_sensitive")?,
        translations: Vec::new(),
    })
}

fn topic_from_row(row: &SqlRow) -> FolioResult<Topic> {
    let raw_type = row.i32("topic", "topic_type")?;
    let topic_type = TopicType::from_i32(raw_type).ok_or_else(|| StorageError::MalformedRow {
        entity: "topic",
        reason: format!("unknown topic_type {}", raw_type),
    })?;
    Ok(Topic {
        topic_id: Some(row.i32("topic", "topic_id")?),
        virtual_wiki_id: row.i32("topic", "virtual_wiki_id")?,
        virtual_wiki: row.text("topic", "virtual_wiki_name")?,
        namespace_id: row.i32("topic", "namespace_id")?,
        page_name: row.text("topic", "page_name")?,
        topic_type,
        current_version_id: row.opt_i32("topic", "current_version_id")?,
        topic_content: row.text("topic", "topic_content")?,
        redirect_to: row.opt_text("topic", "redirect_to")?,
        delete_date: row.opt_timestamp("topic", "delete_date")?,
        read_only: row.bool("topic", "read_only")?,
        admin_only: row.bool("topic", "admin_only")?,
    })
}

fn topic_insert_params(topic: &Topic) -> Vec<SqlValue> {
    vec![
        SqlValue::opt_i32(topic.topic_id),
        SqlValue::I32(topic.virtual_wiki_id),
        SqlValue::Text(topic.virtual_wiki.clone()),
        SqlValue::I32(topic.namespace_id),
        SqlValue::Text(topic.page_name.clone()),
        SqlValue::I32(topic.topic_type.as_i32()),
        SqlValue::opt_i32(topic.current_version_id),
        SqlValue::Text(topic.topic_content.clone()),
        SqlValue::opt_text(topic.redirect_to.as_deref()),
        SqlValue::opt_timestamp(topic.delete_date),
        SqlValue::Bool(topic.read_only),
        SqlValue::Bool(topic.admin_only),
    ]
}

fn topic_update_params(topic: &Topic) -> Vec<SqlValue> {
    vec![
        SqlValue::I32(topic.virtual_wiki_id),
        SqlValue::Text(topic.virtual_wiki.clone()),
        SqlValue::I32(topic.namespace_id),
        SqlValue::Text(topic.page_name.clone()),
        SqlValue::I32(topic.topic_type.as_i32()),
        SqlValue::opt_i32(topic.current_version_id),
        SqlValue::Text(topic.topic_content.clone()),
        SqlValue::opt_text(topic.redirect_to.as_deref()),
        SqlValue::opt_timestamp(topic.delete_date),
        SqlValue::Bool(topic.read_only),
        SqlValue::Bool(topic.admin_only),
        SqlValue::opt_i32(topic.topic_id),
    ]
}

fn topic_version_from_row(row: &SqlRow) -> FolioResult<TopicVersion> {
    let raw_type = row.i32("topic_version", "edit_type")?;
    let edit_type = EditType::from_i32(raw_type).ok_or_else(|| StorageError::MalformedRow {
        entity: "topic_version",
        reason: format!("unknown edit_type {}", raw_type),
    })?;
    Ok(TopicVersion {
        topic_version_id: Some(row.i32("topic_version", "topic_version_id")?),
        topic_id: Some(row.i32("topic_version", "topic_id")?),
        edit_type,
        version_content: row.text("topic_version", "version_content")?,
        author_id: row.opt_i32("topic_version", "author_id")?,
        author_display: row.text("topic_version", "author_display")?,
        edit_date: row.timestamp("topic_version", "edit_date")?,
        edit_comment: row.opt_text("topic_version", "edit_comment")?,
        characters_changed: row.i32("topic_version", "characters_changed")?,
        previous_topic_version_id: row.opt_i32("topic_version", "previous_topic_version_id")?,
        version_params: row.opt_text("topic_version", "version_params")?,
        recent_change_allowed: row.bool("topic_version", "recent_change_allowed")?,
    })
}

fn topic_version_insert_params(version: &TopicVersion) -> Vec<SqlValue> {
    vec![
        SqlValue::opt_i32(version.topic_version_id),
        SqlValue::opt_i32(version.topic_id),
        SqlValue::I32(version.edit_type.as_i32()),
        SqlValue::Text(version.version_content.clone()),
        SqlValue::opt_i32(version.author_id),
        SqlValue::Text(version.author_display.clone()),
        SqlValue::Timestamp(version.edit_date),
        SqlValue::opt_text(version.edit_comment.as_deref()),
        SqlValue::I32(version.characters_changed),
        SqlValue::opt_i32(version.previous_topic_version_id),
        SqlValue::opt_text(version.version_params.as_deref()),
        SqlValue::Bool(version.recent_change_allowed),
    ]
}

fn category_from_row(row: &SqlRow) -> FolioResult<Category> {
    Ok(Category {
        virtual_wiki_id: row.i32("category", "virtual_wiki_id")?,
        child_topic_id: row.i32("category", "child_topic_id")?,
        name: row.text("category", "category_name")?,
        sort_key: row.opt_text("category", "sort_key")?,
    })
}

fn log_item_from_row(row: &SqlRow) -> FolioResult<LogItem> {
    let raw_type = row.i32("log_item", "log_type")?;
    let log_type = LogType::from_i32(raw_type).ok_or_else(|| StorageError::MalformedRow {
        entity: "log_item",
        reason: format!("unknown log_type {}", raw_type),
    })?;
    Ok(LogItem {
        log_type,
        virtual_wiki_id: row.i32("log_item", "virtual_wiki_id")?,
        user_id: row.opt_i32("log_item", "user_id")?,
        user_display: row.text("log_item", "user_display")?,
        log_date: row.timestamp("log_item", "log_date")?,
        log_comment: row.opt_text("log_item", "log_comment")?,
        log_params: row.opt_text("log_item", "log_params")?,
        topic_id: row.opt_i32("log_item", "topic_id")?,
        topic_version_id: row.opt_i32("log_item", "topic_version_id")?,
    })
}

fn recent_change_from_row(row: &SqlRow) -> FolioResult<RecentChange> {
    let edit_type = match row.opt_i32("recent_change", "edit_type")? {
        Some(raw) => Some(EditType::from_i32(raw).ok_or_else(|| StorageError::MalformedRow {
            entity: "recent_change",
            reason: format!("unknown edit_type {}", raw),
        })?),
        None => None,
    };
    let log_type = match row.opt_i32("recent_change", "log_type")? {
        Some(raw) => Some(LogType::from_i32(raw).ok_or_else(|| StorageError::MalformedRow {
            entity: "recent_change",
            reason: format!("unknown log_type {}", raw),
        })?),
        None => None,
    };
    Ok(RecentChange {
        virtual_wiki_id: row.i32("recent_change", "virtual_wiki_id")?,
        virtual_wiki: row.text("recent_change", "virtual_wiki_name")?,
        topic_id: row.opt_i32("recent_change", "topic_id")?,
        topic_name: row.opt_text("recent_change", "topic_name")?,
        topic_version_id: row.opt_i32("recent_change", "topic_version_id")?,
        previous_topic_version_id: row.opt_i32("recent_change", "previous_topic_version_id")?,
        edit_type,
        log_type,
        author_id: row.opt_i32("recent_change", "author_id")?,
        author_display: row.text("recent_change", "author_display")?,
        change_date: row.timestamp("recent_change", "change_date")?,
        change_comment: row.opt_text("recent_change", "change_comment")?,
        characters_changed: row.i32("recent_change", "characters_changed")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;
    use std::sync::Mutex;

    /// Records issued statements and replays canned rows.
    struct FakeExecutor {
        statements: Mutex<Vec<(String, Vec<SqlValue>)>>,
        canned: Mutex<Vec<Vec<SqlRow>>>,
        affected: u64,
    }

    impl FakeExecutor {
        fn new() -> Self {
            FakeExecutor {
                statements: Mutex::new(Vec::new()),
                canned: Mutex::new(Vec::new()),
                affected: 1,
            }
        }

        fn push_rows(&self, rows: Vec<SqlRow>) {
            self.canned.lock().unwrap().push(rows);
        }

        fn issued(&self) -> Vec<String> {
            self.statements
                .lock()
                .unwrap()
                .iter()
                .map(|(sql, _)| sql.clone())
                .collect()
        }
    }

    impl SqlExecutor for FakeExecutor {
        fn query(&self, sql: &str, params: &[SqlValue]) -> FolioResult<Vec<SqlRow>> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            let mut canned = self.canned.lock().unwrap();
            if canned.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(canned.remove(0))
            }
        }

        fn execute(&self, sql: &str, params: &[SqlValue]) -> FolioResult<u64> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(self.affected)
        }

        fn begin(&self) -> FolioResult<()> {
            self.statements
                .lock()
                .unwrap()
                .push(("BEGIN".to_string(), Vec::new()));
            Ok(())
        }

        fn commit(&self) -> FolioResult<()> {
            self.statements
                .lock()
                .unwrap()
                .push(("COMMIT".to_string(), Vec::new()));
            Ok(())
        }

        fn rollback(&self) -> FolioResult<()> {
            self.statements
                .lock()
                .unwrap()
                .push(("ROLLBACK".to_string(), Vec::new()));
            Ok(())
        }
    }

    fn topic_row() -> SqlRow {
        SqlRow::new()
            .with("topic_id", SqlValue::I32(3))
            .with("virtual_wiki_id", SqlValue::I32(1))
            .with("virtual_wiki_name", SqlValue::Text("en".to_string()))
            .with("namespace_id", SqlValue::I32(0))
            .with("page_name", SqlValue::Text("Test".to_string()))
            .with("topic_type", SqlValue::I32(1))
            .with("current_version_id", SqlValue::I32(9))
            .with("topic_content", SqlValue::Text("hello".to_string()))
            .with("redirect_to", SqlValue::Null)
            .with("delete_date", SqlValue::Null)
            .with("read_only", SqlValue::Bool(false))
            .with("admin_only", SqlValue::Bool(false))
    }

    #[test]
    fn test_lookup_topic_maps_row() {
        let executor = FakeExecutor::new();
        executor.push_rows(vec![topic_row()]);
        let store = SqlBackingStore::new(executor, QueryCatalog::new(Dialect::postgres()));
        let topic = store.lookup_topic(1, 0, "Test").unwrap().unwrap();
        assert_eq!(topic.topic_id, Some(3));
        assert_eq!(topic.current_version_id, Some(9));
        assert_eq!(topic.topic_content, "hello");
        assert!(!topic.is_deleted());
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let store = SqlBackingStore::new(FakeExecutor::new(), QueryCatalog::new(Dialect::ansi()));
        {
            let _txn = store.transaction().unwrap();
        }
        let issued = store.executor.issued();
        assert_eq!(issued, vec!["BEGIN".to_string(), "ROLLBACK".to_string()]);
    }

    #[test]
    fn test_committed_transaction_does_not_roll_back() {
        let store = SqlBackingStore::new(FakeExecutor::new(), QueryCatalog::new(Dialect::ansi()));
        let txn = store.transaction().unwrap();
        txn.commit().unwrap();
        let issued = store.executor.issued();
        assert_eq!(issued, vec!["BEGIN".to_string(), "COMMIT".to_string()]);
    }

    #[test]
    fn test_sequence_table_allocation_issues_update_then_select() {
        let executor = FakeExecutor::new();
        executor.push_rows(vec![
            SqlRow::new().with("next_value", SqlValue::I32(41)),
        ]);
        let store = SqlBackingStore::new(executor, QueryCatalog::new(Dialect::ansi()));
        let mut txn = store.transaction().unwrap();
        let id = txn.next_id(Sequence::Topic).unwrap();
        assert_eq!(id, 41);
        txn.commit().unwrap();
        let issued = store.executor.issued();
        assert!(issued.iter().any(|s| s.contains("UPDATE folio_sequence")));
        assert!(issued.iter().any(|s| s.contains("SELECT next_value")));
    }

    #[test]
    fn test_schema_probe_limits_rows() {
        let store =
            SqlBackingStore::new(FakeExecutor::new(), QueryCatalog::new(Dialect::postgres()));
        assert!(store.schema_initialized().unwrap());
        let issued = store.executor.issued();
        assert!(issued[0].ends_with("LIMIT 1"));
    }
}
