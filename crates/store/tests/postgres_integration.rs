//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and run serially.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::{collections::BTreeMap, sync::Arc};

use chrono::{Duration, Utc};
use common::{Money, OrderId, ProductId, UserId, VariantId};
use domain::{
    CartItem, CaviarDetails, CustomerInfoInput, DeliveryInfoInput, NewOrder, NewProduct,
    NewVariant, Order, OrderStatus, Product, ProductUpdate, ShelfLife, User, VariantUpdate,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    CatalogStore, OrderFilter, OrderStore, Pagination, PostgresStore, ProductFilter, ProductSort,
    SortOrder, StoreError, UserStore,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            for migration in [
                include_str!("../../../migrations/001_create_catalog_tables.sql"),
                include_str!("../../../migrations/002_create_orders_tables.sql"),
                include_str!("../../../migrations/003_create_users_table.sql"),
            ] {
                sqlx::raw_sql(migration).execute(&temp_pool).await.unwrap();
            }
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// A store with its own pool and emptied tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;
    let store = PostgresStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, product_variants, products, users CASCADE")
        .execute(store.pool())
        .await
        .unwrap();

    store
}

fn product(slug: &str, stock: i32) -> Product {
    let details = CaviarDetails {
        fish_age: "12 years".into(),
        grain_size: "3.2 mm".into(),
        color: "dark grey".into(),
        taste: "buttery".into(),
        texture: "firm".into(),
        shelf_life: ShelfLife {
            duration: "6 months".into(),
            ..Default::default()
        },
    };
    Product::create(
        NewProduct {
            slug: slug.into(),
            name: format!("{slug} caviar"),
            subtitle: "Wild".into(),
            description: "Classic malossol".into(),
            variants: vec![
                NewVariant {
                    mass: 50,
                    stock,
                    prices: BTreeMap::from([("ua".into(), Money::new(2_500, "UAH"))]),
                },
                NewVariant {
                    mass: 100,
                    stock,
                    prices: BTreeMap::from([("ua".into(), Money::new(4_800, "UAH"))]),
                },
            ],
            details,
        },
        Utc::now(),
    )
    .unwrap()
}

fn order_for(product: &Product, country: &str, phone: &str) -> Order {
    Order::from_cart(NewOrder {
        customer_info: CustomerInfoInput {
            first_name: "Olena".into(),
            last_name: "Koval".into(),
            phone: phone.into(),
            ..Default::default()
        },
        delivery_info: DeliveryInfoInput {
            delivery_type: "post_office".into(),
            country: country.into(),
            city: "Kyiv".into(),
            post_office: "12".into(),
            ..Default::default()
        },
        items: product
            .variants
            .iter()
            .map(|v| CartItem::new(product.id, v.id, 2, v.prices["ua"].clone()))
            .collect(),
        notes: "call first".into(),
    })
    .unwrap()
}

mod catalog {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn create_and_load_with_variants() {
        let store = get_test_store().await;
        let beluga = product("beluga", 10);
        store.create_product(&beluga).await.unwrap();

        let loaded = store.get_product(beluga.id).await.unwrap();
        assert_eq!(loaded.slug, "beluga");
        assert_eq!(loaded.details, beluga.details);
        assert_eq!(loaded.variants.len(), 2);
        assert_eq!(loaded.variants[0].mass, 50);
        assert_eq!(loaded.variants[1].prices["ua"], Money::new(4_800, "UAH"));

        let by_slug = store.get_product_by_slug("beluga").await.unwrap();
        assert_eq!(by_slug.id, beluga.id);
    }

    #[tokio::test]
    #[serial]
    async fn duplicate_slug_is_rejected() {
        let store = get_test_store().await;
        store.create_product(&product("osetra", 1)).await.unwrap();

        let err = store.create_product(&product("osetra", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "slug", .. }));
    }

    #[tokio::test]
    #[serial]
    async fn missing_product_and_variant_are_not_found() {
        let store = get_test_store().await;
        let beluga = product("beluga", 1);
        store.create_product(&beluga).await.unwrap();

        assert!(store.get_product(ProductId::new()).await.unwrap_err().is_not_found());
        assert!(
            store
                .get_variant(beluga.id, VariantId::new())
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            store
                .get_variant(ProductId::new(), beluga.variants[0].id)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    #[serial]
    async fn stock_updates_are_relative() {
        let store = get_test_store().await;
        let beluga = product("beluga", 10);
        let variant = beluga.variants[0].id;
        store.create_product(&beluga).await.unwrap();

        store.update_variant_stock(variant, -4).await.unwrap();
        store.update_variant_stock(variant, 1).await.unwrap();

        let loaded = store.get_variant(beluga.id, variant).await.unwrap();
        assert_eq!(loaded.stock, 7);

        let err = store
            .update_variant_stock(VariantId::new(), 1)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    #[serial]
    async fn update_upserts_variants_and_keeps_others() {
        let store = get_test_store().await;
        let mut beluga = product("beluga", 10);
        store.create_product(&beluga).await.unwrap();
        let kept = beluga.variants[1].id;

        beluga
            .apply_update(
                ProductUpdate {
                    name: Some("Imperial beluga".into()),
                    is_active: Some(true),
                    variants: Some(vec![
                        VariantUpdate {
                            id: Some(beluga.variants[0].id),
                            mass: 50,
                            stock: 3,
                            prices: BTreeMap::from([("ua".into(), Money::new(2_700, "UAH"))]),
                        },
                        VariantUpdate {
                            id: None,
                            mass: 250,
                            stock: 2,
                            prices: BTreeMap::from([("ua".into(), Money::new(11_000, "UAH"))]),
                        },
                    ]),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        store.update_product(&beluga).await.unwrap();

        let loaded = store.get_product(beluga.id).await.unwrap();
        assert_eq!(loaded.name, "Imperial beluga");
        assert!(loaded.is_active);
        assert_eq!(loaded.variants.len(), 3);
        assert_eq!(loaded.variant(beluga.variants[0].id).unwrap().stock, 3);
        assert_eq!(loaded.variant(kept).unwrap().stock, 10);
        assert!(loaded.variants.iter().any(|v| v.mass == 250));
    }

    #[tokio::test]
    #[serial]
    async fn delete_cascades_to_variants() {
        let store = get_test_store().await;
        let beluga = product("beluga", 1);
        store.create_product(&beluga).await.unwrap();

        store.delete_product(beluga.id).await.unwrap();

        assert!(store.get_product(beluga.id).await.unwrap_err().is_not_found());
        assert!(
            store
                .get_variant(beluga.id, beluga.variants[0].id)
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(store.delete_product(beluga.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[serial]
    async fn listing_hides_inactive_and_sorts() {
        let store = get_test_store().await;
        let mut active = product("sevruga", 1);
        active.is_active = true;
        let mut second = product("beluga", 1);
        second.is_active = true;
        let hidden = product("kaluga", 1);
        for p in [&active, &second, &hidden] {
            store.create_product(p).await.unwrap();
        }

        let visible = store
            .list_products(&ProductFilter::new().sorted(ProductSort::Name, SortOrder::Asc))
            .await
            .unwrap();
        let slugs: Vec<_> = visible.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["beluga", "sevruga"]);
        assert_eq!(visible[0].variants.len(), 2);

        let all = store
            .list_products(&ProductFilter::new().show_all(true))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let searched = store
            .list_products(&ProductFilter::new().show_all(true).search("KALU"))
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].id, hidden.id);

        let windowed = store
            .list_products(&ProductFilter::new().show_all(true).limit(1).offset(1))
            .await
            .unwrap();
        assert_eq!(windowed.len(), 1);
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn create_and_load_keeps_item_order() {
        let store = get_test_store().await;
        let beluga = product("beluga", 10);
        store.create_product(&beluga).await.unwrap();
        let order = order_for(&beluga, "UA", "+380501112233");

        store.create(&order).await.unwrap();

        let loaded = store.get_by_id(order.id()).await.unwrap();
        assert_eq!(loaded.order_number(), order.order_number());
        assert_eq!(loaded.customer_info(), order.customer_info());
        assert_eq!(loaded.delivery_info(), order.delivery_info());
        assert_eq!(loaded.total_amount(), &Money::new(14_600, "UAH"));
        assert_eq!(loaded.status(), OrderStatus::Pending);
        assert_eq!(loaded.notes(), "call first");

        let variants: Vec<_> = loaded.items().iter().map(|i| i.variant_id).collect();
        let expected: Vec<_> = order.items().iter().map(|i| i.variant_id).collect();
        assert_eq!(variants, expected);

        let by_number = store.get_by_order_number(order.order_number()).await.unwrap();
        assert_eq!(by_number.id(), order.id());
    }

    #[tokio::test]
    #[serial]
    async fn duplicate_order_number_is_a_conflict() {
        let store = get_test_store().await;
        let beluga = product("beluga", 10);
        let order = order_for(&beluga, "UA", "1");
        store.create(&order).await.unwrap();

        let mut parts = order_for(&beluga, "UA", "2").into_parts();
        parts.order_number = order.order_number().to_string();
        let clash = Order::restore(parts);

        let err = store.create(&clash).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { entity: "order", .. }));
        assert!(store.get_by_id(clash.id()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[serial]
    async fn status_update_and_delete() {
        let store = get_test_store().await;
        let beluga = product("beluga", 10);
        let order = order_for(&beluga, "UA", "1");
        store.create(&order).await.unwrap();

        store
            .update_status(order.id(), OrderStatus::Confirmed)
            .await
            .unwrap();
        let loaded = store.get_by_id(order.id()).await.unwrap();
        assert_eq!(loaded.status(), OrderStatus::Confirmed);
        assert!(loaded.updated_at() >= loaded.created_at());

        store.delete(order.id()).await.unwrap();
        assert!(store.get_by_id(order.id()).await.unwrap_err().is_not_found());
        assert!(store.delete(order.id()).await.unwrap_err().is_not_found());
        assert!(
            store
                .update_status(OrderId::new(), OrderStatus::Shipped)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    #[serial]
    async fn list_filters_and_pages() {
        let store = get_test_store().await;
        let beluga = product("beluga", 10);
        let mut created = Vec::new();
        for (country, phone) in [
            ("UA", "+380501112233"),
            ("UA", "+380671234567"),
            ("PL", "+48501112233"),
        ] {
            let order = order_for(&beluga, country, phone);
            store.create(&order).await.unwrap();
            created.push(order);
        }

        let (all, total) = store.list(&OrderFilter::new()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at() >= w[1].created_at()));
        assert_eq!(all[0].items().len(), 2);

        let (ua, total) = store.list(&OrderFilter::new().country("UA")).await.unwrap();
        assert_eq!(total, 2);
        assert!(ua.iter().all(|o| o.delivery_info().country == "UA"));

        let (by_phone, _) = store
            .list(&OrderFilter::new().customer_phone("067"))
            .await
            .unwrap();
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].id(), created[1].id());

        let (page, total) = store
            .list(&OrderFilter::new().paginate(Pagination::new(Some(2), Some(2))))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);

        let (future, total) = store
            .list(&OrderFilter::new().created_from(Utc::now() + Duration::hours(1)))
            .await
            .unwrap();
        assert!(future.is_empty());
        assert_eq!(total, 0);

        store
            .update_status(created[2].id(), OrderStatus::Cancelled)
            .await
            .unwrap();
        let (cancelled, _) = store
            .list(&OrderFilter::new().status(OrderStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn statistics_group_by_status_and_country() {
        let store = get_test_store().await;
        let beluga = product("beluga", 10);
        let first = order_for(&beluga, "UA", "1");
        store.create(&first).await.unwrap();
        store.create(&order_for(&beluga, "UA", "2")).await.unwrap();
        store.create(&order_for(&beluga, "PL", "3")).await.unwrap();
        store
            .update_status(first.id(), OrderStatus::Shipped)
            .await
            .unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.status_counts[&OrderStatus::Pending], 2);
        assert_eq!(stats.status_counts[&OrderStatus::Shipped], 1);
        assert_eq!(stats.country_counts["UA"], 2);
        assert_eq!(stats.country_counts["PL"], 1);
    }
}

mod users {
    use super::*;

    fn user(email: &str, telegram_id: Option<i64>) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            email: email.into(),
            telegram_id,
            first_name: "Admin".into(),
            last_name: String::new(),
            username: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    #[serial]
    async fn only_users_with_positive_chat_ids_are_listed() {
        let store = get_test_store().await;
        let linked = user("a@shop.test", Some(4242));
        store.upsert_user(&linked).await.unwrap();
        store.upsert_user(&user("b@shop.test", None)).await.unwrap();
        store.upsert_user(&user("c@shop.test", Some(-7))).await.unwrap();

        let users = store.users_with_chat_id().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, linked.id);

        let loaded = store.get_user(linked.id).await.unwrap();
        assert_eq!(loaded.chat_id(), Some(4242));
        assert!(store.get_user(UserId::new()).await.unwrap_err().is_not_found());
    }
}
