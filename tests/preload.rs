//! Batched, N+1-avoiding relationship preloads (spec.md §8 scenarios 3 and
//! 4), hand-written in the shape `#[derive(Table)]` would generate for a
//! `hasMany` field and for a nested `belongsTo.belongsTo` path, exercised
//! against the in-memory [`MockExecutor`].

mod common;

use std::collections::HashMap;

use async_trait::async_trait;
use common::{MemTable, MockExecutor};
use pebble_core::convert::FromSqlValue;
use pebble_core::driver::Executor;
use pebble_core::error::Result;
use pebble_core::preload::{
    batched_select_by_any, preload_paths, sql_value_key, HasRelations, RelationLoader,
};
use pebble_core::scanner::{ColumnSource, FromRow};
use pebble_core::schema::{RelationshipMetadata, RelationshipType};
use pebble_core::value::SqlValue;

fn leaf_metadata(source_field: &str, kind: RelationshipType, target_table: &str) -> RelationshipMetadata {
    RelationshipMetadata {
        source_field: source_field.to_string(),
        kind,
        target_type: String::new(),
        target_table: target_table.to_string(),
        foreign_key: String::new(),
        references: String::new(),
        join_table: None,
    }
}

#[derive(Debug, Clone, Default)]
struct Post {
    id: i64,
    author_id: i64,
    title: String,
}

impl FromRow for Post {
    fn from_row(src: &dyn ColumnSource) -> Result<Self> {
        Ok(Self {
            id: i64::from_sql_value(src.value(src.index_of("id").unwrap())?)?,
            author_id: i64::from_sql_value(src.value(src.index_of("author_id").unwrap())?)?,
            title: String::from_sql_value(src.value(src.index_of("title").unwrap())?)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Author {
    id: i64,
    name: String,
    posts: Vec<Post>,
}

impl FromRow for Author {
    fn from_row(src: &dyn ColumnSource) -> Result<Self> {
        Ok(Self {
            id: i64::from_sql_value(src.value(src.index_of("id").unwrap())?)?,
            name: String::from_sql_value(src.value(src.index_of("name").unwrap())?)?,
            posts: Vec::new(),
        })
    }
}

struct AuthorPostsLoader;

#[async_trait]
impl RelationLoader<Author> for AuthorPostsLoader {
    fn metadata(&self) -> &RelationshipMetadata {
        use std::sync::OnceLock;
        static META: OnceLock<RelationshipMetadata> = OnceLock::new();
        META.get_or_init(|| leaf_metadata("posts", RelationshipType::HasMany, "posts"))
    }

    async fn load(&self, bases: &mut [Author], rest: &[String], executor: &dyn Executor) -> Result<()> {
        let keys: Vec<SqlValue> = bases.iter().map(|b| SqlValue::BigInt(b.id)).collect();
        let stmt = batched_select_by_any("posts", "author_id", keys);
        let rendered = stmt.render();
        let rows = executor.query(&rendered.sql, &rendered.args).await?;

        let mut children = Vec::with_capacity(rows.len());
        for row in &rows {
            children.push(Post::from_row(row.as_ref())?);
        }
        debug_assert!(rest.is_empty(), "posts is a leaf relation in this fixture");

        let mut by_key: HashMap<String, Vec<Post>> = HashMap::new();
        for child in children {
            by_key.entry(sql_value_key(&SqlValue::BigInt(child.author_id))).or_default().push(child);
        }
        for base in bases.iter_mut() {
            base.posts = by_key.remove(&sql_value_key(&SqlValue::BigInt(base.id))).unwrap_or_default();
        }
        Ok(())
    }
}

impl HasRelations for Author {
    fn relation_loader(name: &str) -> Option<Box<dyn RelationLoader<Self>>> {
        match name {
            "posts" => Some(Box::new(AuthorPostsLoader)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Route {
    id: i64,
    name: String,
}

impl FromRow for Route {
    fn from_row(src: &dyn ColumnSource) -> Result<Self> {
        Ok(Self {
            id: i64::from_sql_value(src.value(src.index_of("id").unwrap())?)?,
            name: String::from_sql_value(src.value(src.index_of("name").unwrap())?)?,
        })
    }
}

impl HasRelations for Route {
    fn relation_loader(_name: &str) -> Option<Box<dyn RelationLoader<Self>>> {
        None
    }
}

#[derive(Debug, Clone, Default)]
struct Client {
    id: i64,
    route_id: i64,
    route: Option<Route>,
}

impl FromRow for Client {
    fn from_row(src: &dyn ColumnSource) -> Result<Self> {
        Ok(Self {
            id: i64::from_sql_value(src.value(src.index_of("id").unwrap())?)?,
            route_id: i64::from_sql_value(src.value(src.index_of("route_id").unwrap())?)?,
            route: None,
        })
    }
}

struct ClientRouteLoader;

#[async_trait]
impl RelationLoader<Client> for ClientRouteLoader {
    fn metadata(&self) -> &RelationshipMetadata {
        use std::sync::OnceLock;
        static META: OnceLock<RelationshipMetadata> = OnceLock::new();
        META.get_or_init(|| leaf_metadata("route", RelationshipType::BelongsTo, "routes"))
    }

    async fn load(&self, bases: &mut [Client], rest: &[String], executor: &dyn Executor) -> Result<()> {
        let keys: Vec<SqlValue> = bases.iter().map(|b| SqlValue::BigInt(b.route_id)).collect();
        let stmt = batched_select_by_any("routes", "id", keys);
        let rendered = stmt.render();
        let rows = executor.query(&rendered.sql, &rendered.args).await?;

        let mut children = Vec::with_capacity(rows.len());
        for row in &rows {
            children.push(Route::from_row(row.as_ref())?);
        }
        if !rest.is_empty() {
            let rest_refs: Vec<&str> = rest.iter().map(|s| s.as_str()).collect();
            preload_paths(&mut children, &rest_refs, executor).await?;
        }

        let mut by_key: HashMap<String, Route> = HashMap::new();
        for child in children {
            by_key.entry(sql_value_key(&SqlValue::BigInt(child.id))).or_insert(child);
        }
        for base in bases.iter_mut() {
            base.route = by_key.get(&sql_value_key(&SqlValue::BigInt(base.route_id))).cloned();
        }
        Ok(())
    }
}

impl HasRelations for Client {
    fn relation_loader(name: &str) -> Option<Box<dyn RelationLoader<Self>>> {
        match name {
            "route" => Some(Box::new(ClientRouteLoader)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Order {
    id: i64,
    client_id: i64,
    client: Option<Client>,
}

impl FromRow for Order {
    fn from_row(src: &dyn ColumnSource) -> Result<Self> {
        Ok(Self {
            id: i64::from_sql_value(src.value(src.index_of("id").unwrap())?)?,
            client_id: i64::from_sql_value(src.value(src.index_of("client_id").unwrap())?)?,
            client: None,
        })
    }
}

struct OrderClientLoader;

#[async_trait]
impl RelationLoader<Order> for OrderClientLoader {
    fn metadata(&self) -> &RelationshipMetadata {
        use std::sync::OnceLock;
        static META: OnceLock<RelationshipMetadata> = OnceLock::new();
        META.get_or_init(|| leaf_metadata("client", RelationshipType::BelongsTo, "clients"))
    }

    async fn load(&self, bases: &mut [Order], rest: &[String], executor: &dyn Executor) -> Result<()> {
        let keys: Vec<SqlValue> = bases.iter().map(|b| SqlValue::BigInt(b.client_id)).collect();
        let stmt = batched_select_by_any("clients", "id", keys);
        let rendered = stmt.render();
        let rows = executor.query(&rendered.sql, &rendered.args).await?;

        let mut children = Vec::with_capacity(rows.len());
        for row in &rows {
            children.push(Client::from_row(row.as_ref())?);
        }
        if !rest.is_empty() {
            let rest_refs: Vec<&str> = rest.iter().map(|s| s.as_str()).collect();
            preload_paths(&mut children, &rest_refs, executor).await?;
        }

        let mut by_key: HashMap<String, Client> = HashMap::new();
        for child in children {
            by_key.entry(sql_value_key(&SqlValue::BigInt(child.id))).or_insert(child);
        }
        for base in bases.iter_mut() {
            base.client = by_key.get(&sql_value_key(&SqlValue::BigInt(base.client_id))).cloned();
        }
        Ok(())
    }
}

impl HasRelations for Order {
    fn relation_loader(name: &str) -> Option<Box<dyn RelationLoader<Self>>> {
        match name {
            "client" => Some(Box::new(OrderClientLoader)),
            _ => None,
        }
    }
}

#[tokio::test]
async fn has_many_preload_issues_exactly_two_queries() {
    let executor = MockExecutor::new()
        .with_table(
            "authors",
            MemTable {
                columns: vec!["id", "name"],
                rows: vec![vec![SqlValue::BigInt(1), SqlValue::Text("Ada".into())]],
            },
        )
        .with_table(
            "posts",
            MemTable {
                columns: vec!["id", "author_id", "title"],
                rows: vec![
                    vec![SqlValue::BigInt(10), SqlValue::BigInt(1), SqlValue::Text("First".into())],
                    vec![SqlValue::BigInt(11), SqlValue::BigInt(1), SqlValue::Text("Second".into())],
                ],
            },
        );

    let rendered = pebble_core::statement::SelectStatement::new("authors").render();
    let rows = executor.query(&rendered.sql, &rendered.args).await.unwrap();
    let mut authors: Vec<Author> = rows.iter().map(|r| Author::from_row(r.as_ref()).unwrap()).collect();

    preload_paths(&mut authors, &["posts"], &executor).await.unwrap();

    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].posts.len(), 2);
    assert_eq!(executor.query_count.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn nested_preload_path_issues_exactly_three_queries() {
    let executor = MockExecutor::new()
        .with_table(
            "orders",
            MemTable {
                columns: vec!["id", "client_id"],
                rows: vec![vec![SqlValue::BigInt(100), SqlValue::BigInt(5)]],
            },
        )
        .with_table(
            "clients",
            MemTable {
                columns: vec!["id", "route_id"],
                rows: vec![vec![SqlValue::BigInt(5), SqlValue::BigInt(9)]],
            },
        )
        .with_table(
            "routes",
            MemTable {
                columns: vec!["id", "name"],
                rows: vec![vec![SqlValue::BigInt(9), SqlValue::Text("Downtown".into())]],
            },
        );

    let rendered = pebble_core::statement::SelectStatement::new("orders").render();
    let rows = executor.query(&rendered.sql, &rendered.args).await.unwrap();
    let mut orders: Vec<Order> = rows.iter().map(|r| Order::from_row(r.as_ref()).unwrap()).collect();

    preload_paths(&mut orders, &["client.route"], &executor).await.unwrap();

    assert_eq!(orders.len(), 1);
    let client = orders[0].client.as_ref().expect("client preloaded");
    let route = client.route.as_ref().expect("route preloaded");
    assert_eq!(route.name, "Downtown");
    assert_eq!(executor.query_count.load(std::sync::atomic::Ordering::SeqCst), 3);
}
