//! In-memory (single process) implementation of the table store for local
//! development and tests.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use cloudping_store::{Item, MAX_BATCH_ITEMS, Page, Query, TableStore};
use serde_json::Value;
use tokio::sync::Mutex;

const DEFAULT_PAGE_SIZE: usize = 100;

/// Primary key attributes of a table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeySchema {
    /// Hash key attribute.
    pub hash: String,

    /// Optional range key attribute.
    pub range: Option<String>,
}

impl KeySchema {
    /// A schema with only a hash key.
    pub fn hash(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    /// A schema with a hash and range key.
    pub fn composite(hash: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            range: Some(range.into()),
        }
    }

    fn attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash.as_str()).chain(self.range.as_deref())
    }

    fn key_of(&self, item: &Item) -> Result<String, Error> {
        self.attributes()
            .map(|attribute| {
                item.get(attribute)
                    .map(render)
                    .ok_or_else(|| Error::MissingKey(attribute.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join("\u{1f}"))
    }

    fn projection(&self, item: &Item, extra: &str) -> Item {
        let mut key: Item = self
            .attributes()
            .filter_map(|attribute| {
                item.get(attribute)
                    .map(|value| (attribute.to_string(), value.clone()))
            })
            .collect();
        if let Some(value) = item.get(extra) {
            key.insert(extra.to_string(), value.clone());
        }
        key
    }
}

#[derive(Debug)]
struct Table {
    schema: KeySchema,
    rows: BTreeMap<String, Item>,
}

/// In-memory table store.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, Table>>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a new `MemoryStore` with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many items a query or scan page holds.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Declares `table` with the given primary key. Redeclaring keeps existing rows.
    pub async fn create_table(&self, table: impl Into<String>, schema: KeySchema) {
        self.tables
            .lock()
            .await
            .entry(table.into())
            .or_insert_with(|| Table {
                schema,
                rows: BTreeMap::new(),
            });
    }

    /// Every item currently in `table`, in primary key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table was never declared.
    pub async fn items(&self, table: &str) -> Result<Vec<Item>, Error> {
        let tables = self.tables.lock().await;
        let table = tables
            .get(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;

        Ok(table.rows.values().cloned().collect())
    }

    fn paginate(
        &self,
        matched: Vec<(String, Item)>,
        start: Option<&str>,
        limit: Option<usize>,
    ) -> (Vec<(String, Item)>, bool) {
        let skip = start
            .and_then(|start| matched.iter().position(|(key, _)| key == start))
            .map_or(0, |position| position + 1);
        let size = limit.unwrap_or(self.page_size).min(self.page_size);

        let remaining = matched.len().saturating_sub(skip);
        let page = matched.into_iter().skip(skip).take(size).collect::<Vec<_>>();
        let more = remaining > page.len();

        (page, more)
    }
}

/// Renders a key attribute as a comparable string.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    type Error = Error;

    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<Vec<Item>, Self::Error> {
        if items.len() > MAX_BATCH_ITEMS {
            return Err(Error::BatchTooLarge(items.len()));
        }

        let mut tables = self.tables.lock().await;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;

        // Validate every key before mutating so a bad batch writes nothing.
        let keyed = items
            .into_iter()
            .map(|item| table.schema.key_of(&item).map(|key| (key, item)))
            .collect::<Result<Vec<_>, _>>()?;

        for (key, item) in keyed {
            table.rows.insert(key, item);
        }

        Ok(Vec::new())
    }

    async fn query(&self, table: &str, query: &Query) -> Result<Page, Self::Error> {
        let tables = self.tables.lock().await;
        let table = tables
            .get(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;

        let mut matched = table
            .rows
            .iter()
            .filter(|(_, item)| {
                item.get(&query.hash.attribute).map(render).as_deref()
                    == Some(query.hash.value.as_str())
            })
            .filter_map(|(key, item)| {
                let sort = item.get(&query.sort_attribute).map(render)?;
                query
                    .sort
                    .as_ref()
                    .is_none_or(|condition| condition.matches(&sort))
                    .then(|| (sort, key.clone(), item.clone()))
            })
            .collect::<Vec<_>>();

        matched.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        if !query.ascending {
            matched.reverse();
        }

        let start = query
            .exclusive_start_key
            .as_ref()
            .map(|key| table.schema.key_of(key))
            .transpose()?;
        let matched = matched
            .into_iter()
            .map(|(_, key, item)| (key, item))
            .collect();

        let (page, more) = self.paginate(matched, start.as_deref(), query.limit);
        let last_evaluated_key = more
            .then(|| page.last())
            .flatten()
            .map(|(_, item)| table.schema.projection(item, &query.sort_attribute));

        Ok(Page {
            items: page.into_iter().map(|(_, item)| item).collect(),
            last_evaluated_key,
        })
    }

    async fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> Result<Page, Self::Error> {
        let tables = self.tables.lock().await;
        let table = tables
            .get(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;

        let start = exclusive_start_key
            .as_ref()
            .map(|key| table.schema.key_of(key))
            .transpose()?;
        let rows = table
            .rows
            .iter()
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect();

        let (page, more) = self.paginate(rows, start.as_deref(), None);
        let last_evaluated_key = more
            .then(|| page.last())
            .flatten()
            .map(|(_, item)| table.schema.projection(item, &table.schema.hash));

        Ok(Page {
            items: page.into_iter().map(|(_, item)| item).collect(),
            last_evaluated_key,
        })
    }
}
