//! Live integration tests for vistet-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/vistet-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use serde_json::json;
use vistet_core::{ClothingType, ScrapedProduct};
use vistet_db::{
    bulk_normalize_and_upsert, clothe_stats, create_clothe, create_comment, create_outfit,
    create_store, create_user, delete_outfit, get_clothe_by_name, get_comment,
    get_or_create_store, get_outfit, normalize_and_upsert, update_outfit, upsert_scraped_clothe,
    ClotheWrite, CommentWrite, DbError, IngestError, OutfitWrite, ScrapedStore, StoreWrite,
    UserWrite,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scraped(id: i64, title: &str, product_type: &str, price: i64) -> ScrapedProduct {
    ScrapedProduct::from_value(&json!({
        "id": id,
        "gid": format!("gid://shopify/Product/{id}"),
        "vendor": "REHAB CLO.",
        "type": product_type,
        "title": title,
        "variants": [
            {"id": id * 10, "price": price, "name": format!("{title} - S"), "public_title": "S", "sku": null},
            {"id": id * 10 + 1, "price": price, "name": format!("{title} - M"), "public_title": "M", "sku": null}
        ],
        "image_url": format!("https://rehabclo.cl/cdn/shop/files/{id}.jpg")
    }))
    .unwrap_or_else(|e| panic!("fixture product {id} invalid: {e}"))
}

async fn insert_user(pool: &sqlx::PgPool, email: &str) -> i64 {
    create_user(
        pool,
        &UserWrite {
            email: email.to_string(),
            name: format!("User {email}"),
            description: None,
            contact_number: Some("+56 9 1234 5678".to_string()),
            is_active: true,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("create_user failed for '{email}': {e}"))
    .id
}

fn user_clothe(name: &str, user_id: i64) -> ClotheWrite {
    ClotheWrite {
        name: name.to_string(),
        clothing_type: ClothingType::Shirt,
        image: "https://example.com/shirt.jpg".to_string(),
        shopify_id: None,
        gid: None,
        vendor: None,
        base_price: None,
        variants: json!([]),
        user_id: Some(user_id),
        store_id: None,
    }
}

async fn count_clothes_named(pool: &sqlx::PgPool, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clothes WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("count clothes")
}

// ---------------------------------------------------------------------------
// Section 1: Scraped-source store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn get_or_create_store_is_idempotent(pool: sqlx::PgPool) {
    let defaults = StoreWrite {
        name: "Rehabclo".to_string(),
        description: "Rehabclo".to_string(),
        contact_number: "+56900000000".to_string(),
        site_url: Some("https://rehabclo.cl".to_string()),
    };
    let first = get_or_create_store(&pool, &defaults).await.expect("first");
    let second = get_or_create_store(&pool, &defaults).await.expect("second");
    assert_eq!(first.id, second.id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores WHERE name = 'Rehabclo'")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_or_create_store_keeps_existing_columns(pool: sqlx::PgPool) {
    let existing = create_store(
        &pool,
        &StoreWrite {
            name: "Rehabclo".to_string(),
            description: "Hand-edited description".to_string(),
            contact_number: "+56 9 8765 4321".to_string(),
            site_url: None,
        },
    )
    .await
    .expect("create_store");

    let resolved = get_or_create_store(&pool, &StoreWrite {
        name: "Rehabclo".to_string(),
        description: "Rehabclo".to_string(),
        contact_number: "+56900000000".to_string(),
        site_url: Some("https://rehabclo.cl".to_string()),
    })
    .await
    .expect("get_or_create_store");

    assert_eq!(resolved.id, existing.id);
    assert_eq!(resolved.description, "Hand-edited description");
    assert!(resolved.site_url.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_first_use_collapses_to_one_store(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    let products: Vec<ScrapedProduct> = (1..=8)
        .map(|i| scraped(i, &format!("Polera Concurrente {i}"), "Polera", 1_990_000))
        .collect();

    let results = futures::future::join_all(
        products
            .iter()
            .map(|p| normalize_and_upsert(&pool, &store, p)),
    )
    .await;

    for result in &results {
        assert!(result.is_ok(), "upsert failed: {result:?}");
    }

    let store_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(store_count, 1);

    let store_ids: Vec<Option<i64>> =
        sqlx::query_scalar("SELECT DISTINCT store_id FROM clothes")
            .fetch_all(&pool)
            .await
            .expect("store ids");
    assert_eq!(store_ids.len(), 1);
}

// ---------------------------------------------------------------------------
// Section 2: normalize_and_upsert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn normalize_and_upsert_twice_creates_then_updates(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    let product = scraped(7_731_842_056_254, "Jorts Ultra Baggy Black", "Shorts", 3_799_000);

    let (first, created_first) = normalize_and_upsert(&pool, &store, &product)
        .await
        .expect("first upsert");
    let (second, created_second) = normalize_and_upsert(&pool, &store, &product)
        .await
        .expect("second upsert");

    assert!(created_first);
    assert!(!created_second);
    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(first.clothing_type, second.clothing_type);
    assert_eq!(first.base_price, second.base_price);
    assert_eq!(first.variants, second.variants);
    assert_eq!(count_clothes_named(&pool, "Jorts Ultra Baggy Black").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn normalize_and_upsert_maps_fields(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    let product = scraped(7_731_842_056_254, "Jorts Ultra Baggy Black", "Shorts", 3_799_000);

    let (row, _) = normalize_and_upsert(&pool, &store, &product)
        .await
        .expect("upsert");

    assert_eq!(row.clothing_type, "SHORTS");
    assert_eq!(row.base_price.expect("base price").to_string(), "37990.00");
    assert_eq!(row.shopify_id, Some(7_731_842_056_254));
    assert_eq!(row.vendor.as_deref(), Some("REHAB CLO."));
    assert_eq!(
        row.image,
        "https://rehabclo.cl/cdn/shop/files/7731842056254.jpg"
    );
    assert!(row.user_id.is_none());
    assert!(row.store_id.is_some());
    assert_eq!(row.variants.as_array().map(Vec::len), Some(2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn normalize_and_upsert_unknown_type_is_other(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    let product = scraped(99, "Gift Card", "Zzz", 1_000_000);
    let (row, _) = normalize_and_upsert(&pool, &store, &product)
        .await
        .expect("upsert");
    assert_eq!(row.clothing_type, "OTHER");
}

#[sqlx::test(migrations = "../../migrations")]
async fn normalize_and_upsert_update_overwrites_changed_fields(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    let original = scraped(5, "Hoodie Gris", "Polera", 2_990_000);
    normalize_and_upsert(&pool, &store, &original)
        .await
        .expect("create");

    let mut changed = scraped(5, "Hoodie Gris", "Accesorio", 2_490_000);
    changed.image_url = String::new();
    let (row, created) = normalize_and_upsert(&pool, &store, &changed)
        .await
        .expect("update");

    assert!(!created);
    assert_eq!(row.clothing_type, "ACCESSORIES");
    assert_eq!(row.base_price.expect("price").to_string(), "24900.00");
    assert_eq!(row.image, "");
    assert!(row.updated_at >= row.created_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn normalize_and_upsert_without_variants_leaves_price_unset(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    let mut product = scraped(11, "Gorro Negro", "Accesorio", 0);
    product.variants.clear();
    let (row, _) = normalize_and_upsert(&pool, &store, &product)
        .await
        .expect("upsert");
    assert!(row.base_price.is_none());
    assert_eq!(row.variants, json!([]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn normalize_and_upsert_takes_over_user_owned_clothe_by_name(pool: sqlx::PgPool) {
    let user_id = insert_user(&pool, "ana@vistet.cl").await;
    create_clothe(&pool, &user_clothe("Polera Blanca", user_id))
        .await
        .expect("create user clothe");

    let store = ScrapedStore::default();
    let (row, created) = normalize_and_upsert(&pool, &store, &scraped(3, "Polera Blanca", "Polera", 1_500_000))
        .await
        .expect("upsert");

    assert!(!created);
    assert!(row.user_id.is_none());
    assert!(row.store_id.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn shopify_id_reused_under_new_name_is_rejected(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    normalize_and_upsert(&pool, &store, &scraped(77, "Camisa Azul", "Polera", 1_000_000))
        .await
        .expect("first");

    let err = normalize_and_upsert(&pool, &store, &scraped(77, "Camisa Azul Marino", "Polera", 1_000_000))
        .await
        .expect_err("duplicate shopify id must be rejected");

    match err {
        IngestError::Db(db) => assert_eq!(db.sqlstate().as_deref(), Some("23505")),
        IngestError::Validation(v) => panic!("unexpected validation error: {v}"),
    }
}

// ---------------------------------------------------------------------------
// Section 3: bulk_normalize_and_upsert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn bulk_skips_failing_record_and_keeps_going(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    let mut broken = scraped(2, "Broken", "Shorts", 1_000_000);
    broken.title = "   ".to_string();
    let batch = vec![
        scraped(1, "Short Uno", "Shorts", 1_000_000),
        broken,
        scraped(3, "Short Tres", "Shorts", 1_200_000),
    ];

    let summary = bulk_normalize_and_upsert(&pool, &store, &batch)
        .await
        .expect("bulk");

    assert_eq!(summary.created() + summary.updated(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].index, 1);
    assert!(summary
        .created_items
        .iter()
        .chain(summary.updated_items.iter())
        .all(|row| row.shopify_id != Some(2)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn bulk_rerun_reports_updates_only(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    let batch = vec![
        scraped(1, "Pantalón Uno", "Pantalón", 3_000_000),
        scraped(2, "Pantalón Dos", "Pantalón", 3_500_000),
    ];

    let first = bulk_normalize_and_upsert(&pool, &store, &batch)
        .await
        .expect("first");
    let second = bulk_normalize_and_upsert(&pool, &store, &batch)
        .await
        .expect("second");

    assert_eq!(first.created(), 2);
    assert_eq!(first.updated(), 0);
    assert_eq!(second.created(), 0);
    assert_eq!(second.updated(), 2);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clothes")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(total, 2);
}

// ---------------------------------------------------------------------------
// Section 4: Storage-layer invariants
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn clothe_with_both_owners_is_rejected(pool: sqlx::PgPool) {
    let user_id = insert_user(&pool, "both@vistet.cl").await;
    let store = get_or_create_store(&pool, &StoreWrite {
        name: "Tienda".to_string(),
        description: String::new(),
        contact_number: "+56912345678".to_string(),
        site_url: None,
    })
    .await
    .expect("store");

    let mut write = user_clothe("Doble Dueño", user_id);
    write.store_id = Some(store.id);
    let err = create_clothe(&pool, &write).await.expect_err("must fail");
    assert_eq!(err.sqlstate().as_deref(), Some("23514"));
    assert_eq!(err.constraint(), Some("clothe_belongs_to_user_or_store"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn clothe_without_owner_is_rejected(pool: sqlx::PgPool) {
    let mut write = user_clothe("Sin Dueño", 0);
    write.user_id = None;
    let err = upsert_scraped_clothe(&pool, &write)
        .await
        .expect_err("must fail");
    assert_eq!(err.sqlstate().as_deref(), Some("23514"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_clothe_name_conflicts_on_plain_insert(pool: sqlx::PgPool) {
    let user_id = insert_user(&pool, "dup@vistet.cl").await;
    create_clothe(&pool, &user_clothe("Única", user_id))
        .await
        .expect("first");
    let err = create_clothe(&pool, &user_clothe("Única", user_id))
        .await
        .expect_err("second must fail");
    assert_eq!(err.sqlstate().as_deref(), Some("23505"));
    assert!(get_clothe_by_name(&pool, "Única").await.expect("get").is_some());
}

// ---------------------------------------------------------------------------
// Section 5: Outfits, comments, stats
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn outfit_components_round_trip(pool: sqlx::PgPool) {
    let user_id = insert_user(&pool, "outfit@vistet.cl").await;
    let a = create_clothe(&pool, &user_clothe("Polera A", user_id)).await.expect("a");
    let b = create_clothe(&pool, &user_clothe("Polera B", user_id)).await.expect("b");

    let outfit = create_outfit(&pool, &OutfitWrite {
        user_id,
        name: "Domingo".to_string(),
        rating: 4,
        components: vec![b.id, a.id],
    })
    .await
    .expect("create_outfit");

    let mut expected = vec![a.id, b.id];
    expected.sort_unstable();
    assert_eq!(outfit.components, expected);
    assert_eq!(outfit.components_count(), 2);
    assert_eq!(outfit.user_name, "User outfit@vistet.cl");

    let updated = update_outfit(&pool, outfit.id, &OutfitWrite {
        user_id,
        name: "Lunes".to_string(),
        rating: 5,
        components: vec![a.id],
    })
    .await
    .expect("update_outfit");
    assert_eq!(updated.components, vec![a.id]);
    assert_eq!(updated.name, "Lunes");

    delete_outfit(&pool, outfit.id).await.expect("delete");
    assert!(get_outfit(&pool, outfit.id).await.expect("get").is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn outfit_rating_out_of_range_is_rejected(pool: sqlx::PgPool) {
    let user_id = insert_user(&pool, "rating@vistet.cl").await;
    let err = create_outfit(&pool, &OutfitWrite {
        user_id,
        name: "Demasiado".to_string(),
        rating: 6,
        components: vec![],
    })
    .await
    .expect_err("rating 6 must fail");
    assert_eq!(err.sqlstate().as_deref(), Some("23514"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_missing_outfit_is_not_found(pool: sqlx::PgPool) {
    let user_id = insert_user(&pool, "ghost@vistet.cl").await;
    let err = update_outfit(&pool, 999_999, &OutfitWrite {
        user_id,
        name: "Fantasma".to_string(),
        rating: 3,
        components: vec![],
    })
    .await
    .expect_err("missing outfit");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn comment_includes_user_and_outfit_names(pool: sqlx::PgPool) {
    let user_id = insert_user(&pool, "comment@vistet.cl").await;
    let outfit = create_outfit(&pool, &OutfitWrite {
        user_id,
        name: "Playa".to_string(),
        rating: 3,
        components: vec![],
    })
    .await
    .expect("outfit");

    let comment = create_comment(&pool, &CommentWrite {
        user_id,
        outfit_id: outfit.id,
        title: "Buenísimo".to_string(),
        message: "Me gusta la combinación".to_string(),
    })
    .await
    .expect("comment");

    assert_eq!(comment.user_name, "User comment@vistet.cl");
    assert_eq!(comment.outfit_name, "Playa");
    let fetched = get_comment(&pool, comment.id).await.expect("get").expect("exists");
    assert_eq!(fetched.title, "Buenísimo");
}

#[sqlx::test(migrations = "../../migrations")]
async fn stats_counts_types_vendors_and_scraped(pool: sqlx::PgPool) {
    let store = ScrapedStore::default();
    bulk_normalize_and_upsert(
        &pool,
        &store,
        &[
            scraped(1, "Short A", "Shorts", 1_000_000),
            scraped(2, "Short B", "Shorts", 1_000_000),
            scraped(3, "Polera A", "Polera", 1_000_000),
        ],
    )
    .await
    .expect("bulk");
    let user_id = insert_user(&pool, "stats@vistet.cl").await;
    create_clothe(&pool, &user_clothe("Camisa Propia", user_id))
        .await
        .expect("manual clothe");

    let stats = clothe_stats(&pool).await.expect("stats");
    assert_eq!(stats.total_clothes, 4);
    assert_eq!(stats.scraped_from_shopify, 3);
    assert_eq!(stats.by_type[0].key, "SHORTS");
    assert_eq!(stats.by_type[0].count, 2);
    assert_eq!(stats.by_vendor.len(), 1);
    assert_eq!(stats.by_vendor[0].key, "REHAB CLO.");
    assert_eq!(stats.by_vendor[0].count, 3);
}
