use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::models::Record;
use crate::store::RecordStore;

const ID_ATTRIBUTE: &str = "id";
const NAME_ATTRIBUTE: &str = "name";

const TABLE_READY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const TABLE_READY_MAX_POLLS: u32 = 120;

/// Shareable DynamoDB-backed record store
#[derive(Clone)]
pub struct DynamoRecordStore {
    client: Client,
    table_name: String,
}

impl DynamoRecordStore {
    /// Create a DynamoDB client from configuration
    ///
    /// Credentials and region come from the standard AWS provider chain.
    /// `DYNAMODB_ENDPOINT_URL` redirects the client, typically at DynamoDB
    /// Local. When table bootstrap is enabled the table is created if it does
    /// not exist yet.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        match &config.dynamodb_endpoint_url {
            Some(endpoint) => {
                tracing::info!("Connecting to DynamoDB at: {}", endpoint);
                builder = builder.endpoint_url(endpoint);
            }
            None => tracing::info!("Connecting to DynamoDB (default endpoint)"),
        }

        let store = Self::new(Client::from_conf(builder.build()), &config.table_name);

        if config.bootstrap_table {
            store.ensure_table_exists().await?;
        }

        Ok(store)
    }

    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Create the table with an `id` string hash key if it is missing,
    /// then wait for it to become ACTIVE.
    async fn ensure_table_exists(&self) -> Result<()> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!("Table {} already exists", self.table_name);
                return Ok(());
            }
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if !not_found {
                    return Err(err).context(format!(
                        "Failed to check whether table {} exists",
                        self.table_name
                    ));
                }
            }
        }

        tracing::info!("Creating table: {}", self.table_name);

        let id_definition = AttributeDefinition::builder()
            .attribute_name(ID_ATTRIBUTE)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .context("Failed to build attribute definition")?;
        let id_key = KeySchemaElement::builder()
            .attribute_name(ID_ATTRIBUTE)
            .key_type(KeyType::Hash)
            .build()
            .context("Failed to build key schema")?;

        let created = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .attribute_definitions(id_definition)
            .key_schema(id_key)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        if let Err(err) = created {
            // Another cold start may have won the race.
            let in_use = err
                .as_service_error()
                .map(|e| e.is_resource_in_use_exception())
                .unwrap_or(false);
            if !in_use {
                return Err(err).context(format!("Failed to create table {}", self.table_name));
            }
        }

        self.wait_until_active().await?;
        tracing::info!("Table {} is active", self.table_name);
        Ok(())
    }

    async fn wait_until_active(&self) -> Result<()> {
        for _ in 0..TABLE_READY_MAX_POLLS {
            let output = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .context("Failed to describe table while waiting for it")?;

            let status = output.table().and_then(|table| table.table_status());
            if status == Some(&TableStatus::Active) {
                return Ok(());
            }

            tracing::debug!("Table {} status: {:?}", self.table_name, status);
            tokio::time::sleep(TABLE_READY_POLL_INTERVAL).await;
        }

        bail!("Table {} did not become active in time", self.table_name)
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn put(&self, record: &Record) -> Result<()> {
        tracing::info!("Putting record {} into table: {}", record.id, self.table_name);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_to_item(record)))
            .send()
            .await
            .context("Failed to put record into DynamoDB")?;

        tracing::debug!("Put record with id: {}", record.id);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Record>> {
        tracing::info!("Fetching records from table: {}", self.table_name);

        let records = collect_pages(|start_key| async move {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .context("Failed to scan DynamoDB table")?;
            Ok::<_, anyhow::Error>((output.items.unwrap_or_default(), output.last_evaluated_key))
        })
        .await?;

        tracing::info!("Retrieved {} records", records.len());
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<Record>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ID_ATTRIBUTE, AttributeValue::S(id.to_string()))
            .send()
            .await
            .context("Failed to get record from DynamoDB")?;

        match output.item() {
            Some(item) => {
                tracing::debug!("Read record with id: {}", id);
                Ok(Some(record_from_item(item)?))
            }
            None => {
                tracing::debug!("Record not found with id: {}", id);
                Ok(None)
            }
        }
    }

    async fn health_check(&self) -> Result<()> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .context("Failed to describe DynamoDB table")?;

        tracing::debug!("Health check succeeded");
        Ok(())
    }
}

type Item = HashMap<String, AttributeValue>;

/// Fetch scan pages until `LastEvaluatedKey` comes back absent or empty.
///
/// `fetch_page` receives the exclusive start key (none for the first page)
/// and returns the page items with the page's last evaluated key.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Record>>
where
    F: FnMut(Option<Item>) -> Fut,
    Fut: Future<Output = Result<(Vec<Item>, Option<Item>)>>,
{
    let mut records = Vec::new();
    let mut start_key = None;
    loop {
        let (items, last_evaluated_key) = fetch_page(start_key.take()).await?;
        for item in &items {
            records.push(record_from_item(item)?);
        }

        match last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }
    Ok(records)
}

fn record_to_item(record: &Record) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (ID_ATTRIBUTE.to_string(), AttributeValue::S(record.id.clone())),
        (NAME_ATTRIBUTE.to_string(), AttributeValue::S(record.name.clone())),
    ])
}

fn record_from_item(item: &HashMap<String, AttributeValue>) -> Result<Record> {
    let id = string_attribute(item, ID_ATTRIBUTE)?;
    let name = string_attribute(item, NAME_ATTRIBUTE)
        .with_context(|| format!("Malformed record {}", id))?;
    Ok(Record { id, name })
}

fn string_attribute(item: &HashMap<String, AttributeValue>, attribute: &str) -> Result<String> {
    let value = item
        .get(attribute)
        .ok_or_else(|| anyhow!("item is missing attribute '{}'", attribute))?;
    value
        .as_s()
        .cloned()
        .map_err(|_| anyhow!("attribute '{}' is not a string", attribute))
}
