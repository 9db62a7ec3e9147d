use super::{Book, BookFormat, Catalog, CatalogConfig, Result};
use aws_sdk_dynamodb::{
    client::Client,
    operation::{describe_table::DescribeTableError, query::builders::QueryFluentBuilder},
    types::{
        AttributeDefinition, AttributeValue, BillingMode, ConsumedCapacity, GlobalSecondaryIndex,
        KeySchemaElement, KeyType, Projection, ProjectionType, ScalarAttributeType, TableStatus,
    },
};
use simple_error::SimpleError;
use std::collections::{BTreeMap, HashMap};
use tokio::time::{sleep, Instant};
use tracing::Span;

const HASH_KEY: &str = "Author";
const SORT_KEY: &str = "Title";
const CATEGORY_KEY: &str = "Category";
const FORMATS_KEY: &str = "Formats";
const CATEGORY_INDEX: &str = "CategoryIndex";

#[derive(Clone)]
pub struct Backend {
    pub client: Client,
    pub config: CatalogConfig,
}

fn primary_key(author: &str, title: &str) -> HashMap<String, AttributeValue> {
    let mut key = HashMap::new();
    key.insert(HASH_KEY.to_string(), AttributeValue::S(author.to_string()));
    key.insert(SORT_KEY.to_string(), AttributeValue::S(title.to_string()));
    key
}

fn book_item(book: &Book) -> HashMap<String, AttributeValue> {
    let formats = book
        .formats
        .iter()
        .map(|(kind, id)| (kind.as_str().to_string(), AttributeValue::S(id.clone())))
        .collect();
    let mut item = primary_key(&book.author, &book.title);
    item.insert(CATEGORY_KEY.to_string(), AttributeValue::S(book.category.clone()));
    item.insert(FORMATS_KEY.to_string(), AttributeValue::M(formats));
    item
}

fn take_string(item: &mut HashMap<String, AttributeValue>, name: &str) -> Result<String> {
    match item.remove(name) {
        Some(AttributeValue::S(s)) => Ok(s),
        _ => Err(SimpleError::new(format!("item is missing string attribute {}", name)).into()),
    }
}

fn book_from_item(mut item: HashMap<String, AttributeValue>) -> Result<Book> {
    let author = take_string(&mut item, HASH_KEY)?;
    let title = take_string(&mut item, SORT_KEY)?;
    let category = take_string(&mut item, CATEGORY_KEY)?;
    let mut formats = BTreeMap::new();
    if let Some(AttributeValue::M(m)) = item.remove(FORMATS_KEY) {
        for (name, v) in m {
            let kind = BookFormat::from_name(&name)
                .ok_or_else(|| SimpleError::new(format!("unrecognized book format {}", name)))?;
            match v {
                AttributeValue::S(id) => formats.insert(kind, id),
                _ => return Err(SimpleError::new(format!("format id for {} is not a string", name)).into()),
            };
        }
    }
    Ok(Book {
        author,
        title,
        category,
        formats,
    })
}

/// Declares and creates the catalog table (composite primary key on Author
/// and Title, category index projecting all attributes, on-demand billing),
/// then waits until the table reports ACTIVE. Creation failure propagates to
/// the caller; no retry is attempted here.
pub async fn create_catalog(client: &Client, config: &CatalogConfig) -> Result<()> {
    client
        .create_table()
        .table_name(&config.table_name)
        .set_attribute_definitions(Some(vec![
            AttributeDefinition::builder()
                .attribute_name(HASH_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
            AttributeDefinition::builder()
                .attribute_name(SORT_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
            AttributeDefinition::builder()
                .attribute_name(CATEGORY_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        ]))
        .set_key_schema(Some(vec![
            KeySchemaElement::builder().attribute_name(HASH_KEY).key_type(KeyType::Hash).build()?,
            KeySchemaElement::builder().attribute_name(SORT_KEY).key_type(KeyType::Range).build()?,
        ]))
        .global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(CATEGORY_INDEX)
                .key_schema(
                    KeySchemaElement::builder()
                        .attribute_name(CATEGORY_KEY)
                        .key_type(KeyType::Hash)
                        .build()?,
                )
                .projection(Projection::builder().projection_type(ProjectionType::All).build())
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await?;

    wait_until_active(client, config).await
}

/// Requests table deletion and waits until the table is gone. Failure is
/// returned to the caller, which owns the cleanup policy.
pub async fn delete_catalog(client: &Client, config: &CatalogConfig) -> Result<()> {
    client.delete_table().table_name(&config.table_name).send().await?;
    wait_until_deleted(client, config).await
}

async fn wait_until_active(client: &Client, config: &CatalogConfig) -> Result<()> {
    let deadline = Instant::now() + config.ready_timeout;
    loop {
        let table = client
            .describe_table()
            .table_name(&config.table_name)
            .send()
            .await?
            .table;
        if table.and_then(|t| t.table_status) == Some(TableStatus::Active) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(SimpleError::new(format!(
                "table {} did not become active within {:?}",
                config.table_name, config.ready_timeout
            ))
            .into());
        }
        sleep(config.poll_interval).await;
    }
}

async fn wait_until_deleted(client: &Client, config: &CatalogConfig) -> Result<()> {
    let deadline = Instant::now() + config.ready_timeout;
    loop {
        match client
            .describe_table()
            .table_name(&config.table_name)
            .send()
            .await
            .map_err(|e| e.into_service_error())
        {
            Err(DescribeTableError::ResourceNotFoundException(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }
        if Instant::now() >= deadline {
            return Err(SimpleError::new(format!(
                "table {} was not deleted within {:?}",
                config.table_name, config.ready_timeout
            ))
            .into());
        }
        sleep(config.poll_interval).await;
    }
}

async fn collect_books(mut query: QueryFluentBuilder) -> Result<Vec<Book>> {
    let mut books = vec![];
    loop {
        let result = query.clone().send().await?;
        for item in result.items.unwrap_or_default() {
            books.push(book_from_item(item)?);
        }
        match result.last_evaluated_key {
            Some(key) => query = query.set_exclusive_start_key(Some(key)),
            None => break,
        }
    }
    Ok(books)
}

#[async_trait]
impl Catalog for Backend {
    #[tracing::instrument(skip_all, fields(author = %book.author, title = %book.title, consumed_wcu, otel.span_kind = "client"))]
    async fn add_book(&self, book: &Book) -> Result<()> {
        let result = self
            .client
            .put_item()
            .table_name(&self.config.table_name)
            .set_item(Some(book_item(book)))
            .send()
            .await?;

        record_wcu(&result.consumed_capacity, &Span::current());

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(author = %author, title = %title, format = %kind, consumed_wcu, otel.span_kind = "client"))]
    async fn add_book_format(
        &self,
        author: &str,
        title: &str,
        kind: BookFormat,
        format_id: &str,
    ) -> Result<()> {
        let result = self
            .client
            .update_item()
            .table_name(&self.config.table_name)
            .set_key(Some(primary_key(author, title)))
            .update_expression("SET #formats.#kind = :id")
            .expression_attribute_names("#formats", FORMATS_KEY)
            .expression_attribute_names("#kind", kind.as_str())
            .expression_attribute_values(":id", AttributeValue::S(format_id.to_string()))
            .send()
            .await?;

        record_wcu(&result.consumed_capacity, &Span::current());

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(author = %author, title = %title, consumed_rcu, otel.span_kind = "client"))]
    async fn get_book(&self, author: &str, title: &str) -> Result<Option<Book>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.config.table_name)
            .consistent_read(true)
            .set_key(Some(primary_key(author, title)))
            .send()
            .await?;

        record_rcu(&result.consumed_capacity, &Span::current());

        result.item.map(book_from_item).transpose()
    }

    #[tracing::instrument(skip_all, fields(author = %author, otel.span_kind = "client"))]
    async fn books_by_author(&self, author: &str) -> Result<Vec<Book>> {
        let query = self
            .client
            .query()
            .table_name(&self.config.table_name)
            .consistent_read(true)
            .key_condition_expression(format!("{} = :author", HASH_KEY))
            .expression_attribute_values(":author", AttributeValue::S(author.to_string()));

        collect_books(query).await
    }

    // consistent reads aren't available on a global secondary index, so this
    // reflects only writes that have propagated to the index at query time
    #[tracing::instrument(skip_all, fields(category = %category, otel.span_kind = "client"))]
    async fn books_by_category(&self, category: &str) -> Result<Vec<Book>> {
        let query = self
            .client
            .query()
            .table_name(&self.config.table_name)
            .index_name(CATEGORY_INDEX)
            .key_condition_expression(format!("{} = :category", CATEGORY_KEY))
            .expression_attribute_values(":category", AttributeValue::S(category.to_string()));

        collect_books(query).await
    }
}

/// Records wcu used by a write operation to the given span.
fn record_wcu(capacity: &Option<ConsumedCapacity>, span: &Span) {
    if let Some(wcu) = capacity.as_ref().and_then(|c| c.capacity_units) {
        span.record("consumed_wcu", wcu);
    }
}

/// Records rcu used by a read operation to the given span.
fn record_rcu(capacity: &Option<ConsumedCapacity>, span: &Span) {
    if let Some(rcu) = capacity.as_ref().and_then(|c| c.capacity_units) {
        span.record("consumed_rcu", rcu);
    }
}

#[cfg(test)]
mod test {
    mod catalog {
        use crate::{dynamodbstore, test_catalog, CatalogConfig};
        use aws_sdk_dynamodb::{
            config::{Credentials, Region},
            operation::describe_table::DescribeTableError,
            Client,
        };
        use tokio::time;

        test_catalog!(|| async {
            // expects DynamoDB local to be running: docker run -p 8000:8000 --rm -it amazon/dynamodb-local
            let endpoint = std::env::var("DYNAMODB_ENDPOINT").unwrap_or("http://localhost:8000".to_string());
            let creds = Credentials::new("ACCESSKEYID", "SECRET", None, None, "dummy");
            let config = aws_sdk_dynamodb::Config::builder()
                .behavior_version_latest()
                .credentials_provider(creds)
                .endpoint_url(endpoint)
                .region(Region::from_static("test"))
                .build();
            let client = Client::from_conf(config);

            let catalog_config = CatalogConfig::with_table_name("CatalogTest");

            if let Ok(_) = client.delete_table().table_name(&catalog_config.table_name).send().await {
                for _ in 0..10u32 {
                    match client
                        .describe_table()
                        .table_name(&catalog_config.table_name)
                        .send()
                        .await
                        .map_err(|e| e.into_service_error())
                    {
                        Err(DescribeTableError::ResourceNotFoundException(_)) => break,
                        _ => time::sleep(time::Duration::from_millis(200)).await,
                    }
                }
            }

            dynamodbstore::create_catalog(&client, &catalog_config)
                .await
                .expect("failed to create table");

            dynamodbstore::Backend {
                client,
                config: catalog_config,
            }
        });
    }
}
