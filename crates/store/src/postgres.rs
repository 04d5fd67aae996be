use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use common::{Money, OrderId, OrderItemId, ProductId, UserId, VariantId};
use domain::{
    CaviarDetails, CustomerInfo, DeliveryInfo, Order, OrderItem, OrderParts, OrderStatus, Product,
    User, Variant,
};
use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgArguments, PgPoolOptions, PgRow},
    query::Query,
    types::Json,
};
use uuid::Uuid;

use crate::{
    CatalogStore, OrderFilter, OrderStatistics, OrderStore, ProductFilter, Result, StoreError,
    UserStore,
};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

const PRODUCT_COLUMNS: &str =
    "id, slug, name, subtitle, description, details, is_active, created_at, updated_at";
const VARIANT_COLUMNS: &str = "id, product_id, mass, stock, prices, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, order_number, customer_info, delivery_info, total_amount, status, notes, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, variant_id, quantity, unit_price, total_price, created_at";
const USER_COLUMNS: &str =
    "id, email, telegram_id, first_name, last_name, username, is_active, created_at, updated_at";

/// PostgreSQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(StoreError::database("connect to database"))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts or replaces a user. Users are provisioned outside the shop API.
    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, telegram_id, first_name, last_name, username, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                telegram_id = EXCLUDED.telegram_id,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(user.telegram_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database("save user"))?;
        Ok(())
    }

    fn row_to_product(row: &PgRow) -> std::result::Result<Product, sqlx::Error> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get("id")?),
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            subtitle: row.try_get("subtitle")?,
            description: row.try_get("description")?,
            variants: Vec::new(),
            details: row.try_get::<Json<CaviarDetails>, _>("details")?.0,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_variant(row: &PgRow) -> std::result::Result<Variant, sqlx::Error> {
        Ok(Variant {
            id: VariantId::from_uuid(row.try_get("id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            mass: row.try_get("mass")?,
            stock: row.try_get("stock")?,
            prices: row.try_get::<Json<BTreeMap<String, Money>>, _>("prices")?.0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order_parts(row: &PgRow) -> std::result::Result<OrderParts, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(OrderParts {
            id: OrderId::from_uuid(row.try_get("id")?),
            order_number: row.try_get("order_number")?,
            customer_info: row.try_get::<Json<CustomerInfo>, _>("customer_info")?.0,
            delivery_info: row.try_get::<Json<DeliveryInfo>, _>("delivery_info")?.0,
            items: Vec::new(),
            total_amount: row.try_get::<Json<Money>, _>("total_amount")?.0,
            status,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order_item(row: &PgRow) -> std::result::Result<OrderItem, sqlx::Error> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get("id")?),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            variant_id: VariantId::from_uuid(row.try_get("variant_id")?),
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get::<Json<Money>, _>("unit_price")?.0,
            total_price: row.try_get::<Json<Money>, _>("total_price")?.0,
            product: None,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_user(row: &PgRow) -> std::result::Result<User, sqlx::Error> {
        Ok(User {
            id: UserId::from_uuid(row.try_get("id")?),
            email: row.try_get("email")?,
            telegram_id: row.try_get("telegram_id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            username: row.try_get("username")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Loads the variants of the given products, grouped by product.
    async fn load_variants(&self, product_ids: &[Uuid]) -> Result<HashMap<ProductId, Vec<Variant>>> {
        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = ANY($1) ORDER BY created_at ASC, mass ASC, id ASC"
        ))
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database("load variants"))?;

        let mut grouped: HashMap<ProductId, Vec<Variant>> = HashMap::new();
        for row in &rows {
            let variant = Self::row_to_variant(row).map_err(StoreError::database("decode variant"))?;
            grouped.entry(variant.product_id).or_default().push(variant);
        }
        Ok(grouped)
    }

    async fn with_variants(&self, mut products: Vec<Product>) -> Result<Vec<Product>> {
        if products.is_empty() {
            return Ok(products);
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id.as_uuid()).collect();
        let mut variants = self.load_variants(&ids).await?;
        for product in &mut products {
            product.variants = variants.remove(&product.id).unwrap_or_default();
        }
        Ok(products)
    }

    /// Loads the items of the given orders, grouped by order, in cart order.
    async fn load_items(&self, order_ids: &[Uuid]) -> Result<HashMap<OrderId, Vec<OrderItem>>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position ASC"
        ))
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database("load order items"))?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let item =
                Self::row_to_order_item(row).map_err(StoreError::database("decode order item"))?;
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn assemble_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let parts = rows
            .iter()
            .map(Self::row_to_order_parts)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::database("decode order"))?;
        if parts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = parts.iter().map(|p| p.id.as_uuid()).collect();
        let mut items = self.load_items(&ids).await?;
        Ok(parts
            .into_iter()
            .map(|mut parts| {
                parts.items = items.remove(&parts.id).unwrap_or_default();
                Order::restore(parts)
            })
            .collect())
    }

    async fn fetch_one_order(&self, query: PgQuery<'_>, key: &str) -> Result<Order> {
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::database("load order"))?
            .ok_or_else(|| StoreError::not_found("order", key))?;
        let mut orders = self.assemble_orders(vec![row]).await?;
        orders.pop().ok_or_else(|| StoreError::not_found("order", key))
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err
        && db_err.constraint() == Some(constraint)
    {
        return true;
    }
    false
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn order_filter_sql(filter: &OrderFilter) -> (String, usize) {
    let mut sql = String::from(" WHERE 1=1");
    let mut param_count = 0;

    if filter.status.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND status = ${param_count}"));
    }
    if filter.customer_phone.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND customer_info ->> 'phone' ILIKE ${param_count}"));
    }
    if filter.country.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND delivery_info ->> 'country' = ${param_count}"));
    }
    if filter.created_from.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND created_at >= ${param_count}"));
    }
    if filter.created_to.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND created_at <= ${param_count}"));
    }
    (sql, param_count)
}

fn bind_order_filter<'q>(mut query: PgQuery<'q>, filter: &'q OrderFilter) -> PgQuery<'q> {
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    if let Some(ref phone) = filter.customer_phone {
        query = query.bind(like_pattern(phone));
    }
    if let Some(ref country) = filter.country {
        query = query.bind(country.as_str());
    }
    if let Some(from) = filter.created_from {
        query = query.bind(from);
    }
    if let Some(to) = filter.created_to {
        query = query.bind(to);
    }
    query
}

fn product_filter_sql(filter: &ProductFilter) -> (String, usize) {
    let mut sql = String::from(" WHERE 1=1");
    let mut param_count = 0;

    if !filter.show_all {
        sql.push_str(" AND is_active = TRUE");
    }
    if filter.slug.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND slug = ${param_count}"));
    }
    for (value, column) in [
        (&filter.name, "name"),
        (&filter.subtitle, "subtitle"),
        (&filter.description, "description"),
    ] {
        if value.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND {column} ILIKE ${param_count}"));
        }
    }
    if filter.search.is_some() {
        param_count += 1;
        let p = param_count;
        sql.push_str(&format!(
            " AND (slug ILIKE ${p} OR name ILIKE ${p} OR subtitle ILIKE ${p} OR description ILIKE ${p})"
        ));
    }
    for (value, clause) in [
        (filter.created_after, "created_at >="),
        (filter.created_before, "created_at <="),
        (filter.updated_after, "updated_at >="),
        (filter.updated_before, "updated_at <="),
    ] {
        if value.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND {clause} ${param_count}"));
        }
    }
    (sql, param_count)
}

fn bind_product_filter<'q>(mut query: PgQuery<'q>, filter: &'q ProductFilter) -> PgQuery<'q> {
    if let Some(ref slug) = filter.slug {
        query = query.bind(slug.as_str());
    }
    for term in [&filter.name, &filter.subtitle, &filter.description, &filter.search]
        .into_iter()
        .flatten()
    {
        query = query.bind(like_pattern(term));
    }
    for instant in [
        filter.created_after,
        filter.created_before,
        filter.updated_after,
        filter.updated_before,
    ]
    .into_iter()
    .flatten()
    {
        query = query.bind(instant);
    }
    query
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[tracing::instrument(level = "debug", skip(self, product), fields(product_id = %product.id))]
    async fn create_product(&self, product: &Product) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StoreError::database("begin transaction"))?;

        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(product.id.as_uuid())
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.subtitle)
        .bind(&product.description)
        .bind(Json(&product.details))
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "products_slug_unique") {
                return StoreError::Duplicate {
                    entity: "product",
                    field: "slug",
                    value: product.slug.clone(),
                };
            }
            StoreError::database("create product")(e)
        })?;

        for variant in &product.variants {
            sqlx::query(&format!(
                "INSERT INTO product_variants ({VARIANT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ))
            .bind(variant.id.as_uuid())
            .bind(product.id.as_uuid())
            .bind(variant.mass)
            .bind(variant.stock)
            .bind(Json(&variant.prices))
            .bind(variant.created_at)
            .bind(variant.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database("create product variant"))?;
        }

        tx.commit()
            .await
            .map_err(StoreError::database("commit product"))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::database("load product"))?
            .ok_or_else(|| StoreError::not_found("product", id))?;

        let product = Self::row_to_product(&row).map_err(StoreError::database("decode product"))?;
        let mut products = self.with_variants(vec![product]).await?;
        products.pop().ok_or_else(|| StoreError::not_found("product", id))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_product_by_slug(&self, slug: &str) -> Result<Product> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database("load product by slug"))?
        .ok_or_else(|| StoreError::not_found("product", format!("with slug {slug:?}")))?;

        let product = Self::row_to_product(&row).map_err(StoreError::database("decode product"))?;
        let mut products = self.with_variants(vec![product]).await?;
        products
            .pop()
            .ok_or_else(|| StoreError::not_found("product", slug))
    }

    #[tracing::instrument(level = "debug", skip(self, filter))]
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let (where_sql, param_count) = product_filter_sql(filter);
        let order = filter.sort_order.keyword();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products{where_sql} ORDER BY {column} {order}, id {order} LIMIT ${limit} OFFSET ${offset}",
            column = filter.sort_by.column(),
            limit = param_count + 1,
            offset = param_count + 2,
        );

        let rows = bind_product_filter(sqlx::query(&sql), filter)
            .bind(i64::from(filter.effective_limit()))
            .bind(i64::from(filter.effective_offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::database("list products"))?;

        let products = rows
            .iter()
            .map(Self::row_to_product)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::database("decode product"))?;
        self.with_variants(products).await
    }

    #[tracing::instrument(level = "debug", skip(self, product), fields(product_id = %product.id))]
    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StoreError::database("begin transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET slug = $2, name = $3, subtitle = $4, description = $5, details = $6,
                is_active = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.subtitle)
        .bind(&product.description)
        .bind(Json(&product.details))
        .bind(product.is_active)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "products_slug_unique") {
                return StoreError::Duplicate {
                    entity: "product",
                    field: "slug",
                    value: product.slug.clone(),
                };
            }
            StoreError::database("update product")(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", product.id));
        }

        for variant in &product.variants {
            sqlx::query(&format!(
                r#"
                INSERT INTO product_variants ({VARIANT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO UPDATE SET
                    mass = EXCLUDED.mass,
                    stock = EXCLUDED.stock,
                    prices = EXCLUDED.prices,
                    updated_at = EXCLUDED.updated_at
                WHERE product_variants.product_id = EXCLUDED.product_id
                "#
            ))
            .bind(variant.id.as_uuid())
            .bind(product.id.as_uuid())
            .bind(variant.mass)
            .bind(variant.stock)
            .bind(Json(&variant.prices))
            .bind(variant.created_at)
            .bind(variant.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database("save product variant"))?;
        }

        tx.commit()
            .await
            .map_err(StoreError::database("commit product"))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::database("delete product"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_variant(&self, product_id: ProductId, variant_id: VariantId) -> Result<Variant> {
        let row = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = $1 AND product_id = $2"
        ))
        .bind(variant_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database("load variant"))?
        .ok_or_else(|| StoreError::not_found("variant", variant_id))?;

        Self::row_to_variant(&row).map_err(StoreError::database("decode variant"))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn update_variant_stock(&self, variant_id: VariantId, delta: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE product_variants SET stock = stock + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(delta)
        .bind(variant_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(StoreError::database("update variant stock"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("variant", variant_id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[tracing::instrument(level = "debug", skip(self, order), fields(order_id = %order.id()))]
    async fn create(&self, order: &Order) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StoreError::database("begin transaction"))?;

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(order.id().as_uuid())
        .bind(order.order_number())
        .bind(Json(order.customer_info()))
        .bind(Json(order.delivery_info()))
        .bind(Json(order.total_amount()))
        .bind(order.status().as_str())
        .bind(order.notes())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "orders_order_number_unique") {
                return StoreError::Conflict {
                    entity: "order",
                    key: order.order_number().to_string(),
                };
            }
            StoreError::database("create order")(e)
        })?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, variant_id, quantity, unit_price, total_price, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_uuid())
            .bind(item.variant_id.as_uuid())
            .bind(item.quantity)
            .bind(Json(&item.unit_price))
            .bind(Json(&item.total_price))
            .bind(item.created_at)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database("create order item"))?;
        }

        tx.commit()
            .await
            .map_err(StoreError::database("commit order"))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_by_id(&self, id: OrderId) -> Result<Order> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let query = sqlx::query(&sql).bind(id.as_uuid());
        self.fetch_one_order(query, &id.to_string()).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_by_order_number(&self, order_number: &str) -> Result<Order> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
        let query = sqlx::query(&sql).bind(order_number);
        self.fetch_one_order(query, order_number).await
    }

    #[tracing::instrument(level = "debug", skip(self, filter))]
    async fn list(&self, filter: &OrderFilter) -> Result<(Vec<Order>, u64)> {
        let (where_sql, mut param_count) = order_filter_sql(filter);

        let count_sql = format!("SELECT COUNT(*) AS total FROM orders{where_sql}");
        let total: i64 = bind_order_filter(sqlx::query(&count_sql), filter)
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(StoreError::database("count orders"))?;

        let mut sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders{where_sql} ORDER BY created_at DESC, id DESC");
        if filter.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if filter.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut query = bind_order_filter(sqlx::query(&sql), filter);
        if let Some(limit) = filter.limit {
            query = query.bind(i64::from(limit));
        }
        if let Some(offset) = filter.offset {
            query = query.bind(i64::from(offset));
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::database("list orders"))?;

        let orders = self.assemble_orders(rows).await?;
        Ok((orders, total.max(0) as u64))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::database("update order status"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete(&self, id: OrderId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::database("delete order"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn statistics(&self) -> Result<OrderStatistics> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::database("count orders"))?;

        let status_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::database("count orders by status"))?;

        let country_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT delivery_info ->> 'country', COUNT(*) FROM orders GROUP BY 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database("count orders by country"))?;

        let mut stats = OrderStatistics {
            total_orders: total.max(0) as u64,
            ..Default::default()
        };
        for (status, count) in status_rows {
            let status = status.parse::<OrderStatus>().map_err(|e| {
                StoreError::database("decode order status")(sqlx::Error::Decode(Box::new(e)))
            })?;
            stats.status_counts.insert(status, count.max(0) as u64);
        }
        for (country, count) in country_rows {
            stats.country_counts.insert(country, count.max(0) as u64);
        }
        Ok(stats)
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn users_with_chat_id(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE telegram_id IS NOT NULL AND telegram_id > 0 ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database("load users with chat id"))?;

        rows.iter()
            .map(Self::row_to_user)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::database("decode user"))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_user(&self, id: UserId) -> Result<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::database("load user"))?
            .ok_or_else(|| StoreError::not_found("user", id))?;

        Self::row_to_user(&row).map_err(StoreError::database("decode user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("067"), "%067%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn order_filter_numbers_parameters_in_bind_order() {
        let filter = OrderFilter::new()
            .status(OrderStatus::Pending)
            .country("UA")
            .created_to(chrono::Utc::now());
        let (sql, count) = order_filter_sql(&filter);
        assert_eq!(count, 3);
        assert_eq!(
            sql,
            " WHERE 1=1 AND status = $1 AND delivery_info ->> 'country' = $2 AND created_at <= $3"
        );
    }

    #[test]
    fn product_filter_hides_inactive_by_default() {
        let (sql, count) = product_filter_sql(&ProductFilter::new().search("sturgeon"));
        assert_eq!(count, 1);
        assert!(sql.contains("is_active = TRUE"));
        assert!(sql.contains("slug ILIKE $1 OR name ILIKE $1"));

        let (sql, _) = product_filter_sql(&ProductFilter::new().show_all(true));
        assert!(!sql.contains("is_active"));
    }
}
