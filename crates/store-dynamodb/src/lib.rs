//! Implementation of the table store using Amazon DynamoDB, reachable from
//! either partition.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::result_large_err)]

mod attribute;
mod error;

pub use error::Error;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use cloudping_partition::{Partition, WriteCredentials, endpoint_url};
use cloudping_store::{Item, Page, Query, SortCondition, TableStore};
use tracing::debug;

use attribute::{from_attributes, to_attributes};

/// Options for connecting a `DynamoStore`.
pub struct DynamoStoreOptions {
    /// Region hosting the tables.
    pub region: String,

    /// Partition hosting the tables.
    pub partition: Partition,

    /// Credentials chosen for `partition` by the partition resolver.
    pub credentials: WriteCredentials,
}

/// Table store using DynamoDB.
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoStore {
    /// Creates a new `DynamoStore`.
    ///
    /// Ambient credentials use the default provider chain. Static credentials
    /// also pin the endpoint to the target partition, since the process's own
    /// partition would otherwise pick the wrong DNS suffix.
    pub async fn connect(
        DynamoStoreOptions {
            region,
            partition,
            credentials,
        }: DynamoStoreOptions,
    ) -> Self {
        let loader = aws_config::from_env().region(Region::new(region.clone()));

        let config = match credentials {
            WriteCredentials::Ambient => loader.load().await,
            WriteCredentials::Static(keys) => {
                debug!(%region, %partition, "using static cross-partition credentials");
                loader
                    .credentials_provider(Credentials::new(
                        keys.access_key_id,
                        keys.secret_access_key,
                        None,
                        None,
                        "cloudping-cross-partition",
                    ))
                    .endpoint_url(endpoint_url("dynamodb", &region, Some(partition)))
                    .load()
                    .await
            }
        };

        Self {
            client: aws_sdk_dynamodb::Client::new(&config),
        }
    }
}

fn page(
    items: Option<Vec<attribute::AttributeMap>>,
    last_evaluated_key: Option<attribute::AttributeMap>,
) -> Result<Page, Error> {
    Ok(Page {
        items: items
            .unwrap_or_default()
            .into_iter()
            .map(from_attributes)
            .collect::<Result<_, _>>()?,
        last_evaluated_key: last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(from_attributes)
            .transpose()?,
    })
}

#[async_trait]
impl TableStore for DynamoStore {
    type Error = Error;

    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<Vec<Item>, Self::Error> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let requests = items
            .into_iter()
            .map(|item| {
                PutRequest::builder()
                    .set_item(Some(to_attributes(item)))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| Error::DynamoDb(e.into()))?;

        output
            .unprocessed_items
            .unwrap_or_default()
            .remove(table)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|request| request.put_request)
            .map(|put| from_attributes(put.item))
            .collect()
    }

    async fn query(&self, table: &str, query: &Query) -> Result<Page, Self::Error> {
        let mut key_condition = "#h = :h".to_string();
        let mut request = self
            .client
            .query()
            .table_name(table)
            .set_index_name(query.index.clone())
            .expression_attribute_names("#h", &query.hash.attribute)
            .expression_attribute_values(":h", AttributeValue::S(query.hash.value.clone()))
            .scan_index_forward(query.ascending)
            .set_limit(query.limit.and_then(|limit| i32::try_from(limit).ok()))
            .set_exclusive_start_key(query.exclusive_start_key.clone().map(to_attributes));

        if let Some(sort) = &query.sort {
            request = request.expression_attribute_names("#s", &query.sort_attribute);
            request = match sort {
                SortCondition::AtLeast(low) => {
                    key_condition.push_str(" AND #s >= :lo");
                    request.expression_attribute_values(":lo", AttributeValue::S(low.clone()))
                }
                SortCondition::Between(low, high) => {
                    key_condition.push_str(" AND #s BETWEEN :lo AND :hi");
                    request
                        .expression_attribute_values(":lo", AttributeValue::S(low.clone()))
                        .expression_attribute_values(":hi", AttributeValue::S(high.clone()))
                }
            };
        }

        let output = request
            .key_condition_expression(key_condition)
            .send()
            .await
            .map_err(|e| Error::DynamoDb(e.into()))?;

        page(output.items, output.last_evaluated_key)
    }

    async fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> Result<Page, Self::Error> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(exclusive_start_key.map(to_attributes))
            .send()
            .await
            .map_err(|e| Error::DynamoDb(e.into()))?;

        page(output.items, output.last_evaluated_key)
    }
}
