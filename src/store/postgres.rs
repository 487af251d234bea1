use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::instrument;
use uuid::Uuid;

use crate::geo::BoundingBox;
use crate::models::actor::Actor;
use crate::models::delivery::{Delivery, DeliveryStatus, DeliveryTypeId};
use crate::models::geo::{Geo, GeoPoint};
use crate::store::{ActorDirectory, OrderStore, Page, StoreError};

const DELIVERY_COLUMNS: &str = r#"
    d.id, d.client_id, d.courier_id, d.type_id, d.status_id, d.has_loader, d.price, d.created_at,
    g.id AS geo_id, g.from_latitude, g.from_longitude, g.from_address,
    g.to_latitude, g.to_longitude, g.to_address, g.distance
"#;

const ACTOR_COLUMNS: &str = r#"
    u.id, u.name, u.created_at, m.is_admin, m.is_courier, m.is_banned
"#;

#[derive(Debug, sqlx::FromRow)]
struct DeliveryRecord {
    id: Uuid,
    client_id: Uuid,
    courier_id: Option<Uuid>,
    type_id: i16,
    status_id: i16,
    has_loader: bool,
    price: Decimal,
    created_at: DateTime<Utc>,
    geo_id: Uuid,
    from_latitude: f64,
    from_longitude: f64,
    from_address: String,
    to_latitude: f64,
    to_longitude: f64,
    to_address: String,
    distance: f64,
}

impl TryFrom<DeliveryRecord> for Delivery {
    type Error = StoreError;

    fn try_from(record: DeliveryRecord) -> Result<Self, Self::Error> {
        let type_id = DeliveryTypeId::try_from(i32::from(record.type_id))
            .map_err(|err| StoreError::Corrupt(format!("delivery {}: {err}", record.id)))?;
        let status = DeliveryStatus::from_id(i32::from(record.status_id)).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "delivery {}: unknown status id {}",
                record.id, record.status_id
            ))
        })?;

        Ok(Delivery {
            id: record.id,
            client_id: record.client_id,
            courier_id: record.courier_id,
            type_id,
            status,
            has_load_assist: record.has_loader,
            price: record.price,
            geo: Geo {
                id: record.geo_id,
                origin: GeoPoint::new(record.from_latitude, record.from_longitude),
                origin_address: record.from_address,
                destination: GeoPoint::new(record.to_latitude, record.to_longitude),
                destination_address: record.to_address,
                distance_meters: record.distance,
            },
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActorRecord {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    is_admin: bool,
    is_courier: bool,
    is_banned: bool,
}

impl From<ActorRecord> for Actor {
    fn from(record: ActorRecord) -> Self {
        Actor {
            id: record.id,
            name: record.name,
            is_admin: record.is_admin,
            is_courier: record.is_courier,
            is_banned: record.is_banned,
            created_at: record.created_at,
        }
    }
}

fn expect_one(rows: u64) -> Result<(), StoreError> {
    if rows != 1 {
        return Err(StoreError::RowCount {
            expected: 1,
            actual: rows,
        });
    }
    Ok(())
}

/// Postgres-backed store. Layout is in `sql/schema.sql`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }
}

fn page_query(filter: &str) -> String {
    format!(
        "SELECT {DELIVERY_COLUMNS} FROM deliveries d JOIN geo g ON g.id = d.geo_id \
         WHERE {filter} ORDER BY d.created_at DESC, d.id ASC LIMIT $1 OFFSET $2"
    )
}

#[async_trait]
impl OrderStore for PgStore {
    #[instrument(skip_all, name = "SQL:CreateOrder", fields(order_id = %delivery.id), err)]
    async fn create_order(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let geo = &delivery.geo;

        let geo_rows = sqlx::query(
            "INSERT INTO geo (id, from_latitude, from_longitude, from_address, \
             to_latitude, to_longitude, to_address, distance) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(geo.id)
        .bind(geo.origin.lat)
        .bind(geo.origin.lon)
        .bind(&geo.origin_address)
        .bind(geo.destination.lat)
        .bind(geo.destination.lon)
        .bind(&geo.destination_address)
        .bind(geo.distance_meters)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        // dropping `tx` without commit rolls back
        expect_one(geo_rows)?;

        let delivery_rows = sqlx::query(
            "INSERT INTO deliveries (id, client_id, courier_id, type_id, status_id, \
             has_loader, price, geo_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(delivery.id)
        .bind(delivery.client_id)
        .bind(delivery.courier_id)
        .bind(i16::from(delivery.type_id.get()))
        .bind(delivery.status.id())
        .bind(delivery.has_load_assist)
        .bind(delivery.price)
        .bind(geo.id)
        .bind(delivery.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        expect_one(delivery_rows)?;

        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        let sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d JOIN geo g ON g.id = d.geo_id WHERE d.id = $1"
        );

        sqlx::query_as::<_, DeliveryRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Delivery::try_from)
            .transpose()
    }

    #[instrument(skip_all, name = "SQL:UpdateStatus", fields(order_id = %id), err)]
    async fn update_status(
        &self,
        id: Uuid,
        new_status: DeliveryStatus,
        expected_prior: DeliveryStatus,
    ) -> Result<u64, StoreError> {
        let result =
            sqlx::query("UPDATE deliveries SET status_id = $2 WHERE id = $1 AND status_id = $3")
                .bind(id)
                .bind(new_status.id())
                .bind(expected_prior.id())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip_all, name = "SQL:AcceptOrder", fields(order_id = %id), err)]
    async fn accept(&self, id: Uuid, courier_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE deliveries SET courier_id = $2, status_id = $3 WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(courier_id)
        .bind(DeliveryStatus::Accepted.id())
        .bind(DeliveryStatus::Proposed.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn search_by_bounding_box(
        &self,
        bbox: BoundingBox,
        page: Page,
    ) -> Result<Vec<Delivery>, StoreError> {
        let sql = page_query(
            "d.status_id = $3 \
             AND g.from_latitude BETWEEN $4 AND $5 \
             AND g.from_longitude BETWEEN $6 AND $7",
        );

        let records = sqlx::query_as::<_, DeliveryRecord>(&sql)
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .bind(DeliveryStatus::Proposed.id())
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .fetch_all(&self.pool)
            .await?;

        records.into_iter().map(Delivery::try_from).collect()
    }

    async fn list_for_client(
        &self,
        client_id: Uuid,
        page: Page,
    ) -> Result<Vec<Delivery>, StoreError> {
        let sql = page_query("d.client_id = $3");

        let records = sqlx::query_as::<_, DeliveryRecord>(&sql)
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        records.into_iter().map(Delivery::try_from).collect()
    }

    async fn is_owner(&self, actor_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM deliveries WHERE id = $1 AND client_id = $2)",
        )
        .bind(id)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(owned)
    }

    async fn is_performer(&self, actor_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let performing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM deliveries WHERE id = $1 AND courier_id = $2)",
        )
        .bind(id)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(performing)
    }

    async fn active_accepted_count(&self, courier_id: Uuid) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM deliveries WHERE courier_id = $1 AND status_id = $2",
        )
        .bind(courier_id)
        .bind(DeliveryStatus::Accepted.id())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl ActorDirectory for PgStore {
    async fn find_actor(&self, id: Uuid) -> Result<Option<Actor>, StoreError> {
        let sql = format!(
            "SELECT {ACTOR_COLUMNS} FROM users u JOIN meta m ON m.user_id = u.id WHERE u.id = $1"
        );

        let record = sqlx::query_as::<_, ActorRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Actor::from))
    }

    #[instrument(skip_all, name = "SQL:RegisterUser", fields(user_id = %actor.id), err)]
    async fn register(&self, actor: &Actor) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let user_rows = sqlx::query("INSERT INTO users (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(actor.id)
            .bind(&actor.name)
            .bind(actor.created_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        expect_one(user_rows)?;

        let meta_rows = sqlx::query(
            "INSERT INTO meta (user_id, is_admin, is_courier, is_banned) VALUES ($1, $2, $3, $4)",
        )
        .bind(actor.id)
        .bind(actor.is_admin)
        .bind(actor.is_courier)
        .bind(actor.is_banned)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        expect_one(meta_rows)?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE meta SET is_banned = $2 WHERE user_id = $1")
            .bind(id)
            .bind(banned)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
