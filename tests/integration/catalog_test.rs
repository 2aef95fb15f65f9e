//! Integration tests for catalog browsing and the catalog tree.

use std::time::Duration;

use athena_glance::catalog::{CatalogBrowser, CatalogTree, NodeAddress, NodeKind};
use athena_glance::service::{
    ColumnMetadata, DataCatalogSummary, DatabaseSummary, MockCall, MockQueryService, Page,
    TableMetadata,
};
use futures::future::try_join_all;
use pretty_assertions::assert_eq;

fn database(name: &str) -> DatabaseSummary {
    DatabaseSummary {
        name: Some(name.to_string()),
        description: None,
    }
}

fn column(name: &str, data_type: &str) -> ColumnMetadata {
    ColumnMetadata {
        name: Some(name.to_string()),
        data_type: Some(data_type.to_string()),
        comment: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_page_database_listing() {
    let service = MockQueryService::new().with_database_pages(
        "AwsDataCatalog",
        vec![
            Page::new(vec![database("d1"), database("d2")], Some("c1")),
            Page::new(vec![database("d3"), database("d4")], Some("c2")),
            Page::last(vec![database("d5"), database("d6")]),
        ],
    );

    let databases = CatalogBrowser::new(&service)
        .list_databases("AwsDataCatalog")
        .await
        .unwrap();

    let names: Vec<&str> = databases.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["d1", "d2", "d3", "d4", "d5", "d6"]);

    let timed = service.timed_calls();
    let tokens: Vec<Option<String>> = timed
        .iter()
        .map(|(call, _)| match call {
            MockCall::ListDatabases { next_token, .. } => next_token.clone(),
            other => panic!("unexpected call: {other:?}"),
        })
        .collect();
    assert_eq!(tokens, vec![None, Some("c1".to_string()), Some("c2".to_string())]);

    let start = timed[0].1;
    let offsets: Vec<Duration> = timed.iter().map(|(_, at)| *at - start).collect();
    assert_eq!(
        offsets,
        vec![
            Duration::ZERO,
            Duration::from_millis(200),
            Duration::from_millis(400)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_absent_page_items_contribute_nothing() {
    let service = MockQueryService::new().with_database_pages(
        "AwsDataCatalog",
        vec![
            Page::new(vec![database("a")], Some("c1")),
            Page::absent(Some("c2")),
            Page::last(vec![database("b")]),
        ],
    );

    let databases = CatalogBrowser::new(&service)
        .list_databases("AwsDataCatalog")
        .await
        .unwrap();

    let names: Vec<&str> = databases.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn test_nameless_entries_are_dropped() {
    let service = MockQueryService::new().with_catalog_pages(vec![Page::last(vec![
        DataCatalogSummary {
            catalog_name: Some("AwsDataCatalog".to_string()),
            catalog_type: Some("GLUE".to_string()),
        },
        DataCatalogSummary {
            catalog_name: None,
            catalog_type: Some("LAMBDA".to_string()),
        },
    ])]);

    let catalogs = CatalogBrowser::new(&service).list_catalogs().await.unwrap();

    assert_eq!(catalogs.len(), 1);
    assert_eq!(catalogs[0].name, "AwsDataCatalog");
}

#[tokio::test]
async fn test_columns_come_from_one_call() {
    let table = TableMetadata {
        name: Some("events".to_string()),
        table_type: Some("EXTERNAL_TABLE".to_string()),
        columns: Some(vec![column("id", "bigint"), column("payload", "string")]),
        partition_keys: Some(vec![column("dt", "string")]),
    };
    let service = MockQueryService::new().with_table("AwsDataCatalog", "logs", table);

    let columns = CatalogBrowser::new(&service)
        .list_columns("AwsDataCatalog", "logs", "events")
        .await
        .unwrap();

    let names: Vec<(&str, bool)> = columns
        .iter()
        .map(|c| (c.name.as_str(), c.partition_key))
        .collect();
    assert_eq!(names, vec![("id", false), ("payload", false), ("dt", true)]);
    assert_eq!(service.call_count("GetTableMetadata"), 1);
}

#[tokio::test]
async fn test_listing_error_is_propagated() {
    let service = MockQueryService::with_sample_data()
        .failing_on("ListTableMetadata", "AccessDeniedException: not authorized");

    let err = CatalogBrowser::new(&service)
        .list_tables("AwsDataCatalog", "sampledb")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("AccessDeniedException"));
    assert_eq!(service.call_count("ListTableMetadata"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tree_walk_to_column() {
    let service = MockQueryService::with_sample_data();
    let browser = CatalogBrowser::new(&service);
    let mut tree = CatalogTree::new();

    tree.load_catalogs(&browser).await.unwrap();
    let catalog = tree.find(None, "AwsDataCatalog").unwrap();

    tree.expand(catalog, &browser).await.unwrap();
    let database = tree.find(Some(catalog), "sampledb").unwrap();

    tree.expand(database, &browser).await.unwrap();
    let table = tree.find(Some(database), "flights").unwrap();

    let columns = tree.expand(table, &browser).await.unwrap();
    assert_eq!(columns.len(), 3);

    let delay = tree.find(Some(table), "delay").unwrap();
    let node = tree.node(delay).unwrap();
    assert_eq!(node.kind, NodeKind::Column);
    assert!(node.is_leaf());
    assert!(tree.listing_for(delay).is_none());

    assert_eq!(
        tree.address(delay).unwrap(),
        NodeAddress {
            catalog: "AwsDataCatalog".to_string(),
            database: Some("sampledb".to_string()),
            table: Some("flights".to_string()),
            column: Some("delay".to_string()),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_expand_fetches_once_until_refresh() {
    let service = MockQueryService::with_sample_data();
    let browser = CatalogBrowser::new(&service);
    let mut tree = CatalogTree::new();

    tree.load_catalogs(&browser).await.unwrap();
    let catalog = tree.roots()[0];

    let first = tree.expand(catalog, &browser).await.unwrap();
    tree.expand(catalog, &browser).await.unwrap();
    assert_eq!(service.call_count("ListDatabases"), 1);

    tree.refresh(catalog);
    assert!(tree.children(catalog).is_none());
    assert!(first.iter().all(|id| tree.node(*id).is_none()));
    assert_eq!(tree.len(), 1);

    let children = tree.expand(catalog, &browser).await.unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(tree.len(), 3);
    assert_eq!(service.call_count("ListDatabases"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_listings_attach_independently() {
    let service = MockQueryService::with_sample_data()
        .with_table_pages(
            "AwsDataCatalog",
            "default",
            vec![Page::last(vec![TableMetadata {
                name: Some("scratch".to_string()),
                ..Default::default()
            }])],
        );
    let browser = CatalogBrowser::new(&service);
    let mut tree = CatalogTree::new();

    tree.load_catalogs(&browser).await.unwrap();
    let catalog = tree.roots()[0];
    let databases = tree.expand(catalog, &browser).await.unwrap();

    let requests: Vec<_> = databases
        .iter()
        .filter_map(|id| tree.listing_for(*id).map(|listing| (*id, listing)))
        .collect();
    let fetched = try_join_all(requests.iter().map(|(id, listing)| {
        let browser = &browser;
        async move { browser.fetch_listing(listing).await.map(|children| (*id, children)) }
    }))
    .await
    .unwrap();

    for (id, children) in fetched {
        tree.attach(id, children).unwrap();
    }

    let default_db = tree.find(Some(catalog), "default").unwrap();
    let sampledb = tree.find(Some(catalog), "sampledb").unwrap();
    assert_eq!(tree.children(default_db).unwrap().len(), 1);
    assert_eq!(tree.children(sampledb).unwrap().len(), 2);
    assert_eq!(service.call_count("ListTableMetadata"), 2);
}
