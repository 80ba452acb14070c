use async_trait::async_trait;
use sqlx::Row;

use quotedesk_core::domain::client::{Client, ClientId, PersonType};
use quotedesk_core::errors::ApplicationError;
use quotedesk_core::ports::ClientDirectory;

use super::{decode_timestamp, encode_timestamp, RepositoryError};
use crate::DbPool;

const CLIENT_COLUMNS: &str =
    "id, name, tax_id, person_type, address, phone, email, created_at, updated_at";

pub struct SqlClientDirectory {
    pool: DbPool,
}

impl SqlClientDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, client: &Client) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO client (id, name, tax_id, person_type, address, phone, email,
                                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 tax_id = excluded.tax_id,
                 person_type = excluded.person_type,
                 address = excluded.address,
                 phone = excluded.phone,
                 email = excluded.email,
                 updated_at = excluded.updated_at",
        )
        .bind(&client.id.0)
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(client.person_type.as_str())
        .bind(&client.address)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(encode_timestamp(&client.created_at))
        .bind(encode_timestamp(&client.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM client")
            .fetch_one(&self.pool)
            .await?
            .try_get("count")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        Ok(count.max(0) as u64)
    }
}

fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<Client, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let tax_id: String =
        row.try_get("tax_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let person_type: String =
        row.try_get("person_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let address: Option<String> =
        row.try_get("address").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone: Option<String> =
        row.try_get("phone").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: Option<String> =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Client {
        id: ClientId(id),
        name,
        tax_id,
        person_type: PersonType::parse_lossy(&person_type),
        address,
        phone,
        email,
        created_at: decode_timestamp("created_at", &created_at)?,
        updated_at: decode_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait]
impl ClientDirectory for SqlClientDirectory {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, ApplicationError> {
        let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM client WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(ref r) => Ok(Some(row_to_client(r)?)),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> Result<Vec<Client>, ApplicationError> {
        let rows = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM client ORDER BY name"))
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(row_to_client).collect::<Result<Vec<_>, _>>()?)
    }
}
