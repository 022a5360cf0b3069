//! Integration tests for array, composite, JSON and UUID fields
//!
//! Run against PostgreSQL through `DATABASE_URL`; every test returns early
//! when it is not set. Each test owns its tables and types, so they can run
//! concurrently.

use chrono::{TimeZone, Utc};
use pgfields::prelude::*;
use serde_json::json;
use std::sync::Arc;

async fn setup() -> anyhow::Result<Option<PgFields>> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(None);
    };
    let pool = sqlx::PgPool::connect(&database_url).await?;
    let config = FieldsConfig {
        auto_setup: true,
        recreate_tables: true,
    };
    Ok(Some(PgFields::from_pool(pool, config).await?))
}

async fn cleanup_table(pg: &PgFields, table: &str) {
    let _ = sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\" CASCADE", table))
        .execute(pg.pool())
        .await;
}

fn monarch_type() -> Arc<CompositeType> {
    CompositeType::builder("ItMonarchField")
        .field("title", ScalarField::text())
        .field("name", ScalarField::text())
        .field("suffix", ScalarField::integer().with_default(0))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_composite_create_and_query() -> anyhow::Result<()> {
    let Some(mut pg) = setup().await? else {
        return Ok(());
    };
    let monarch = monarch_type();
    assert_eq!(monarch.db_type(), "itmonarch");

    let model = Model::builder("it_kingdom")
        .field("monarch", CompositeField::new(Arc::clone(&monarch)))
        .build()?;
    let store = pg.register_model(model).await?;

    // by instance
    let elessar = monarch.instance(
        Vec::new(),
        vec![
            ("title".to_string(), "King".into()),
            ("name".to_string(), "Elessar".into()),
            ("suffix".to_string(), PgValue::Integer(2)),
        ],
    )?;
    let mut gondor = store.model().record([("monarch", elessar.clone())])?;
    store.create(&mut gondor).await?;
    assert_eq!(gondor.get("monarch"), Some(&PgValue::Composite(elessar.clone())));

    // by tuple
    let mut rohan = store.model().record([(
        "monarch",
        vec![PgValue::from("King"), "Théoden".into(), PgValue::Integer(2)],
    )])?;
    store.create(&mut rohan).await?;
    let theoden = rohan.get("monarch").and_then(PgValue::as_composite).unwrap();
    assert_eq!(theoden.get("name").and_then(PgValue::as_str), Some("Théoden"));
    assert_eq!(theoden.get("suffix"), Some(&PgValue::Integer(2)));

    // query by a freshly constructed equal instance
    let fresh = monarch.from_values(vec!["King".into(), "Elessar".into(), PgValue::Integer(2)])?;
    let by_instance = store.filter(&[Filter::exact("monarch", fresh)]).await?;
    assert_eq!(by_instance, vec![gondor.clone()]);

    // query by mapping
    let by_mapping = PgValue::Record(vec![
        ("name".to_string(), "Elessar".into()),
        ("suffix".to_string(), PgValue::Integer(2)),
        ("title".to_string(), "King".into()),
    ]);
    let by_mapping = store.filter(&[Filter::exact("monarch", by_mapping)]).await?;
    assert_eq!(by_mapping, by_instance);

    assert!(matches!(
        store.filter(&[Filter::new("monarch", "gt", "x")]).await,
        Err(PgFieldsError::Codec(CodecError::UnsupportedLookup { .. }))
    ));

    cleanup_table(&pg, "it_kingdom").await;
    Ok(())
}

#[tokio::test]
async fn test_array_lookups() -> anyhow::Result<()> {
    let Some(mut pg) = setup().await? else {
        return Ok(());
    };
    let model = Model::builder("it_village")
        .field("residents", ArrayField::new(ScalarField::text()))
        .build()?;
    let store = pg.register_model(model).await?;

    let hobbits = ["Frodo", "Sam", "Merry", "Pippin", "Bilbo"];
    for size in [1usize, 2, 5, 3, 0] {
        let residents: Vec<&str> = hobbits[..size].to_vec();
        let mut record = store.model().record([("residents", residents)])?;
        store.create(&mut record).await?;
    }

    assert_eq!(store.count(&[]).await?, 5);
    assert_eq!(store.count(&[Filter::new("residents", "contains", "Sam")]).await?, 3);
    assert_eq!(
        store
            .count(&[Filter::new("residents", "contains", vec!["Frodo", "Merry"])])
            .await?,
        2
    );
    assert_eq!(store.count(&[Filter::new("residents", "len", 5)]).await?, 1);
    assert_eq!(store.count(&[Filter::new("residents", "len", 0)]).await?, 1);

    let empty = store.get(&[Filter::parse("residents__len", 0)]).await?;
    assert_eq!(empty.get("residents"), Some(&PgValue::Array(vec![])));

    assert!(matches!(
        store.count(&[Filter::new("residents", "len", "foo")]).await,
        Err(PgFieldsError::Codec(CodecError::TypeMismatch(_)))
    ));
    assert!(matches!(
        store.count(&[Filter::new("residents", "gt", 1)]).await,
        Err(PgFieldsError::Codec(CodecError::UnsupportedLookup { .. }))
    ));

    cleanup_table(&pg, "it_village").await;
    Ok(())
}

#[tokio::test]
async fn test_array_of_composites_round_trip() -> anyhow::Result<()> {
    let Some(mut pg) = setup().await? else {
        return Ok(());
    };
    let book = CompositeType::builder("ItBook")
        .field("title", ScalarField::text())
        .field("pages", ScalarField::integer())
        .build()?;
    let model = Model::builder("it_library")
        .field("books", ArrayField::new(CompositeField::new(Arc::clone(&book))))
        .build()?;
    let store = pg.register_model(model).await?;

    let shelf = vec![
        PgValue::from(book.from_values(vec!["The Hobbit, or There and Back Again".into(), PgValue::Integer(310)])?),
        PgValue::from(book.from_values(vec![r"C:\Silmarillion".into(), PgValue::Integer(365)])?),
    ];
    let mut record = store.model().record([("books", shelf.clone())])?;
    store.create(&mut record).await?;

    let fetched = store.get(&[]).await?;
    assert_eq!(fetched.get("books"), Some(&PgValue::Array(shelf)));

    cleanup_table(&pg, "it_library").await;
    Ok(())
}

#[tokio::test]
async fn test_json_round_trip() -> anyhow::Result<()> {
    let Some(mut pg) = setup().await? else {
        return Ok(());
    };
    let model = Model::builder("it_lore")
        .field("data", JsonField::new())
        .field("tags", JsonField::new().of_kind(JsonKind::Array))
        .build()?;
    let store = pg.register_model(model).await?;

    let data = json!({"realm": "Arnor", "kings": [1, 2, 3], "fallen": true});
    let mut record = store
        .model()
        .record([("data", PgValue::Json(data.clone())), ("tags", PgValue::Null)])?;
    store.create(&mut record).await?;

    let fetched = store.get(&[]).await?;
    assert_eq!(fetched.get("data"), Some(&PgValue::Json(data)));
    assert_eq!(fetched.get("tags"), Some(&PgValue::Json(json!([]))));

    assert!(matches!(
        store.filter(&[Filter::exact("data", "{}")]).await,
        Err(PgFieldsError::Codec(CodecError::UnsupportedLookup { .. }))
    ));

    cleanup_table(&pg, "it_lore").await;
    Ok(())
}

#[tokio::test]
async fn test_uuid_auto_add_and_lookup() -> anyhow::Result<()> {
    let Some(mut pg) = setup().await? else {
        return Ok(());
    };
    let model = Model::builder("it_ring")
        .field("token", UuidField::new().auto_add(true))
        .field("forged", DateTimeField::new().null(true))
        .build()?;
    let store = pg.register_model(model).await?;

    let forged = Utc.with_ymd_and_hms(2024, 3, 25, 12, 0, 0).unwrap();
    let mut record = store.model().record([("forged", forged)])?;
    store.create(&mut record).await?;

    let Some(PgValue::Uuid(token)) = record.get("token").cloned() else {
        panic!("token was not generated: {:?}", record.get("token"));
    };
    assert_eq!(token.get_version_num(), 4);

    let fetched = store.get(&[Filter::exact("token", token.to_string())]).await?;
    assert_eq!(fetched, record);
    assert_eq!(fetched.get("forged"), Some(&PgValue::Timestamp(forged)));

    let explicit = Uuid::new_v4();
    let mut record = store.model().record([("token", explicit)])?;
    store.create(&mut record).await?;
    assert_eq!(record.get("token"), Some(&PgValue::Uuid(explicit)));
    assert_eq!(store.count(&[]).await?, 2);

    cleanup_table(&pg, "it_ring").await;
    Ok(())
}

#[tokio::test]
async fn test_registry_bookkeeping() -> anyhow::Result<()> {
    let Some(mut pg) = setup().await? else {
        return Ok(());
    };
    pg.health_check().await?;

    let model = Model::builder("it_shire")
        .field("name", ScalarField::varchar(64))
        .build()?;
    pg.register_model(Arc::clone(&model)).await?;
    assert!(matches!(
        pg.register_model(model).await,
        Err(PgFieldsError::ModelAlreadyRegistered(_))
    ));
    assert!(pg.store("it_shire").is_ok());
    pg.unregister_model("it_shire")?;
    assert!(matches!(pg.store("it_shire"), Err(PgFieldsError::ModelNotFound(_))));

    cleanup_table(&pg, "it_shire").await;
    Ok(())
}
