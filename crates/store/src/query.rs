use crate::Item;

/// Equality condition on a hash key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyCondition {
    /// Attribute name.
    pub attribute: String,

    /// Required string value.
    pub value: String,
}

/// Condition on a string sort key, compared lexicographically.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SortCondition {
    /// Sort key `>=` the bound.
    AtLeast(String),

    /// Sort key within the inclusive bounds.
    Between(String, String),
}

impl SortCondition {
    /// Whether `value` satisfies the condition.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::AtLeast(low) => value >= low.as_str(),
            Self::Between(low, high) => value >= low.as_str() && value <= high.as_str(),
        }
    }
}

/// A key-condition query, optionally against a secondary index.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// Secondary index to query, or the base table when `None`.
    pub index: Option<String>,

    /// Hash key equality condition.
    pub hash: KeyCondition,

    /// Sort key attribute of the table or index.
    pub sort_attribute: String,

    /// Optional sort key condition.
    pub sort: Option<SortCondition>,

    /// Return items in ascending sort key order.
    pub ascending: bool,

    /// Maximum number of items to evaluate.
    pub limit: Option<usize>,

    /// Cursor from a previous page.
    pub exclusive_start_key: Option<Item>,
}

impl Query {
    /// Starts an ascending query on `index` where `attribute == value`, ordered by
    /// `sort_attribute`.
    pub fn on_index(
        index: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
        sort_attribute: impl Into<String>,
    ) -> Self {
        Self {
            index: Some(index.into()),
            hash: KeyCondition {
                attribute: attribute.into(),
                value: value.into(),
            },
            sort_attribute: sort_attribute.into(),
            sort: None,
            ascending: true,
            limit: None,
            exclusive_start_key: None,
        }
    }

    /// Restricts the sort key.
    #[must_use]
    pub fn with_sort(mut self, condition: SortCondition) -> Self {
        self.sort = Some(condition);
        self
    }

    /// Reverses the order to descending.
    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }

    /// Limits the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
