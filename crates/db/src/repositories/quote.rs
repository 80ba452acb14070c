use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite};

use quotedesk_core::dashboard::QuoteStatistics;
use quotedesk_core::diff::{FieldUpdate, QuoteChanges};
use quotedesk_core::domain::client::{ClientId, ClientSnapshot, PersonType};
use quotedesk_core::domain::quote::{
    ContactOverrides, DiscountInfo, InstallmentPlan, PaymentCondition, Quote, QuoteId, QuoteItem,
    QuoteStatus, QuoteTotals,
};
use quotedesk_core::errors::{ApplicationError, DomainError};
use quotedesk_core::ports::QuoteStore;

use super::{decode_money_lossy, decode_timestamp, decode_u32, encode_timestamp, RepositoryError};
use crate::DbPool;

const QUOTE_COLUMNS: &[&str] = &[
    "id",
    "sequence_number",
    "version",
    "status",
    "client_id",
    "client_name",
    "client_tax_id",
    "client_person_type",
    "client_address",
    "client_phone",
    "client_email",
    "issue_date",
    "expiry_date",
    "accepted_date",
    "service_id",
    "service_description",
    "items_json",
    "limitation_ids_json",
    "execution_deadline_days",
    "inspection_deadline_days",
    "payment_condition",
    "installment_text",
    "installment_plan_json",
    "discount_json",
    "show_detailed_values",
    "labor_total",
    "material_total",
    "total",
    "notes",
    "consultant",
    "contact",
    "email",
    "phone",
    "service_address",
    "created_at",
    "updated_at",
];

pub struct SqlQuoteStore {
    pool: DbPool,
}

impl SqlQuoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts or fully replaces a quote row. Used by fixtures; the service goes
    /// through [`QuoteStore::create`] and the diff-driven [`QuoteStore::update`].
    pub async fn save(&self, quote: &Quote) -> Result<(), RepositoryError> {
        self.write_row(quote, true).await
    }

    async fn write_row(&self, quote: &Quote, upsert: bool) -> Result<(), RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("INSERT INTO quote (");
        builder.push(QUOTE_COLUMNS.join(", ")).push(") VALUES (");

        let mut values = builder.separated(", ");
        values.push_bind(quote.id.0.clone());
        values.push_bind(to_i64("sequence_number", quote.sequence_number)?);
        values.push_bind(i64::from(quote.version));
        values.push_bind(quote.status.as_str());
        values.push_bind(quote.client_id.0.clone());
        values.push_bind(quote.client.name.clone());
        values.push_bind(quote.client.tax_id.clone());
        values.push_bind(quote.client.person_type.as_str());
        values.push_bind(quote.client.address.clone());
        values.push_bind(quote.client.phone.clone());
        values.push_bind(quote.client.email.clone());
        values.push_bind(encode_timestamp(&quote.issue_date));
        values.push_bind(encode_timestamp(&quote.expiry_date));
        values.push_bind(quote.accepted_date.as_ref().map(encode_timestamp));
        values.push_bind(quote.service_id.clone());
        values.push_bind(quote.service_description.clone());
        values.push_bind(encode_json(&quote.items)?);
        values.push_bind(encode_json(&quote.limitation_ids)?);
        values.push_bind(quote.execution_deadline_days.map(i64::from));
        values.push_bind(quote.inspection_deadline_days.map(i64::from));
        values.push_bind(quote.payment_condition.as_str());
        values.push_bind(quote.installment_text.clone());
        values.push_bind(quote.installment_plan.as_ref().map(encode_json).transpose()?);
        values.push_bind(quote.discount.as_ref().map(encode_json).transpose()?);
        values.push_bind(quote.show_detailed_values);
        values.push_bind(quote.totals.labor.to_string());
        values.push_bind(quote.totals.material.to_string());
        values.push_bind(quote.totals.total.to_string());
        values.push_bind(quote.notes.clone());
        values.push_bind(quote.contacts.consultant.clone());
        values.push_bind(quote.contacts.contact.clone());
        values.push_bind(quote.contacts.email.clone());
        values.push_bind(quote.contacts.phone.clone());
        values.push_bind(quote.contacts.service_address.clone());
        values.push_bind(encode_timestamp(&quote.created_at));
        values.push_bind(encode_timestamp(&quote.updated_at));
        builder.push(")");

        if upsert {
            builder.push(" ON CONFLICT(id) DO UPDATE SET ");
            let assignments: Vec<String> = QUOTE_COLUMNS
                .iter()
                .filter(|column| **column != "id")
                .map(|column| format!("{column} = excluded.{column}"))
                .collect();
            builder.push(assignments.join(", "));
        }

        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn find(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM quote WHERE id = ?", QUOTE_COLUMNS.join(", ")))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_quote).transpose()
    }

    /// Bumps the persisted counter, seeding it from the highest stored sequence number.
    pub async fn allocate_sequence(&self) -> Result<u64, RepositoryError> {
        let value: i64 = sqlx::query(
            "INSERT INTO quote_sequence (id, value)
             VALUES (1, (SELECT COALESCE(MAX(sequence_number), 0) FROM quote) + 1)
             ON CONFLICT(id) DO UPDATE SET value = value + 1
             RETURNING value",
        )
        .fetch_one(&self.pool)
        .await?
        .try_get("value")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        u64::try_from(value).map_err(|_| RepositoryError::Decode(format!("quote_sequence: {value}")))
    }

    async fn fetch_where(
        &self,
        filter: &str,
        binds: &[String],
    ) -> Result<Vec<Quote>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM quote {filter} ORDER BY sequence_number DESC",
            QUOTE_COLUMNS.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = query.bind(bind);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(row_to_quote).collect()
    }

    async fn require(&self, id: &QuoteId) -> Result<Quote, ApplicationError> {
        self.find(id)
            .await?
            .ok_or_else(|| DomainError::not_found("quote", id.0.clone()).into())
    }
}

fn to_i64(column: &str, value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|_| RepositoryError::Decode(format!("{column}: {value} out of range")))
}

fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RepositoryError> {
    Ok(serde_json::to_string(value)?)
}

fn decode_json<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_quote(row: &sqlx::sqlite::SqliteRow) -> Result<Quote, RepositoryError> {
    fn get<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
    where
        T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
    {
        row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    let status: String = get(row, "status")?;
    let status = status
        .parse::<QuoteStatus>()
        .map_err(|e| RepositoryError::Decode(format!("status: {e}")))?;
    let payment_condition: String = get(row, "payment_condition")?;
    let payment_condition = payment_condition
        .parse::<PaymentCondition>()
        .map_err(|e| RepositoryError::Decode(format!("payment_condition: {e}")))?;

    let sequence_number: i64 = get(row, "sequence_number")?;
    let version: i64 = get(row, "version")?;
    let person_type: String = get(row, "client_person_type")?;
    let issue_date: String = get(row, "issue_date")?;
    let expiry_date: String = get(row, "expiry_date")?;
    let accepted_date: Option<String> = get(row, "accepted_date")?;
    let items_json: String = get(row, "items_json")?;
    let limitation_ids_json: String = get(row, "limitation_ids_json")?;
    let execution_deadline_days: Option<i64> = get(row, "execution_deadline_days")?;
    let inspection_deadline_days: Option<i64> = get(row, "inspection_deadline_days")?;
    let installment_plan_json: Option<String> = get(row, "installment_plan_json")?;
    let discount_json: Option<String> = get(row, "discount_json")?;
    let labor_total: Option<String> = get(row, "labor_total")?;
    let material_total: Option<String> = get(row, "material_total")?;
    let total: Option<String> = get(row, "total")?;
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    Ok(Quote {
        id: QuoteId(get(row, "id")?),
        sequence_number: u64::try_from(sequence_number)
            .map_err(|_| RepositoryError::Decode(format!("sequence_number: {sequence_number}")))?,
        version: decode_u32("version", version)?,
        status,
        client_id: ClientId(get(row, "client_id")?),
        client: ClientSnapshot {
            name: get(row, "client_name")?,
            tax_id: get(row, "client_tax_id")?,
            person_type: PersonType::parse_lossy(&person_type),
            address: get(row, "client_address")?,
            phone: get(row, "client_phone")?,
            email: get(row, "client_email")?,
        },
        issue_date: decode_timestamp("issue_date", &issue_date)?,
        expiry_date: decode_timestamp("expiry_date", &expiry_date)?,
        accepted_date: accepted_date
            .map(|value| decode_timestamp("accepted_date", &value))
            .transpose()?,
        service_id: get(row, "service_id")?,
        service_description: get(row, "service_description")?,
        items: decode_json::<Vec<QuoteItem>>("items_json", &items_json)?,
        limitation_ids: decode_json::<Vec<String>>("limitation_ids_json", &limitation_ids_json)?,
        execution_deadline_days: execution_deadline_days
            .map(|days| decode_u32("execution_deadline_days", days))
            .transpose()?,
        inspection_deadline_days: inspection_deadline_days
            .map(|days| decode_u32("inspection_deadline_days", days))
            .transpose()?,
        payment_condition,
        installment_text: get(row, "installment_text")?,
        installment_plan: installment_plan_json
            .map(|raw| decode_json::<InstallmentPlan>("installment_plan_json", &raw))
            .transpose()?,
        discount: discount_json
            .map(|raw| decode_json::<DiscountInfo>("discount_json", &raw))
            .transpose()?,
        show_detailed_values: get(row, "show_detailed_values")?,
        totals: QuoteTotals {
            labor: decode_money_lossy(labor_total.as_deref()),
            material: decode_money_lossy(material_total.as_deref()),
            total: decode_money_lossy(total.as_deref()),
        },
        notes: get(row, "notes")?,
        contacts: ContactOverrides {
            consultant: get(row, "consultant")?,
            contact: get(row, "contact")?,
            email: get(row, "email")?,
            phone: get(row, "phone")?,
            service_address: get(row, "service_address")?,
        },
        created_at: decode_timestamp("created_at", &created_at)?,
        updated_at: decode_timestamp("updated_at", &updated_at)?,
    })
}

fn set_text(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, value: Option<String>) {
    builder.push(", ").push(column).push(" = ").push_bind(value);
}

fn set_integer(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, value: Option<i64>) {
    builder.push(", ").push(column).push(" = ").push_bind(value);
}

fn set_text_update(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    update: &FieldUpdate<String>,
) {
    match update {
        FieldUpdate::Keep => {}
        FieldUpdate::Set(value) => set_text(builder, column, Some(value.clone())),
        FieldUpdate::Clear => set_text(builder, column, None),
    }
}

fn set_json_update<T: Serialize>(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    update: &FieldUpdate<T>,
) -> Result<(), RepositoryError> {
    match update {
        FieldUpdate::Keep => {}
        FieldUpdate::Set(value) => set_text(builder, column, Some(encode_json(value)?)),
        FieldUpdate::Clear => set_text(builder, column, None),
    }
    Ok(())
}

fn set_days_update(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, update: &FieldUpdate<u32>) {
    match update {
        FieldUpdate::Keep => {}
        FieldUpdate::Set(days) => set_integer(builder, column, Some(i64::from(*days))),
        FieldUpdate::Clear => set_integer(builder, column, None),
    }
}

/// Builds `UPDATE quote SET ...` covering only the columns present in `changes`.
fn build_update<'a>(
    id: &QuoteId,
    changes: &QuoteChanges,
    now: DateTime<Utc>,
) -> Result<QueryBuilder<'a, Sqlite>, RepositoryError> {
    let mut builder: QueryBuilder<'a, Sqlite> = QueryBuilder::new("UPDATE quote SET updated_at = ");
    builder.push_bind(encode_timestamp(&now));

    if let Some(issue_date) = &changes.issue_date {
        set_text(&mut builder, "issue_date", Some(encode_timestamp(issue_date)));
    }
    if let Some(expiry_date) = &changes.expiry_date {
        set_text(&mut builder, "expiry_date", Some(encode_timestamp(expiry_date)));
    }
    if let Some(service_id) = &changes.service_id {
        set_text(&mut builder, "service_id", Some(service_id.clone()));
    }
    if let Some(service_description) = &changes.service_description {
        set_text(&mut builder, "service_description", Some(service_description.clone()));
    }
    if let Some(change) = &changes.items {
        set_text(&mut builder, "items_json", Some(encode_json(&change.items)?));
        set_text(&mut builder, "labor_total", Some(change.totals.labor.to_string()));
        set_text(&mut builder, "material_total", Some(change.totals.material.to_string()));
        set_text(&mut builder, "total", Some(change.totals.total.to_string()));
    }
    if let Some(limitation_ids) = &changes.limitation_ids {
        set_text(&mut builder, "limitation_ids_json", Some(encode_json(limitation_ids)?));
    }
    set_days_update(&mut builder, "execution_deadline_days", &changes.execution_deadline_days);
    set_days_update(&mut builder, "inspection_deadline_days", &changes.inspection_deadline_days);
    if let Some(condition) = changes.payment_condition {
        set_text(&mut builder, "payment_condition", Some(condition.as_str().to_string()));
    }
    set_text_update(&mut builder, "installment_text", &changes.installment_text);
    set_json_update(&mut builder, "installment_plan_json", &changes.installment_plan)?;
    set_json_update(&mut builder, "discount_json", &changes.discount)?;
    if let Some(show) = changes.show_detailed_values {
        set_integer(&mut builder, "show_detailed_values", Some(i64::from(show)));
    }
    set_text_update(&mut builder, "notes", &changes.notes);
    set_text_update(&mut builder, "consultant", &changes.consultant);
    set_text_update(&mut builder, "contact", &changes.contact);
    set_text_update(&mut builder, "email", &changes.email);
    set_text_update(&mut builder, "phone", &changes.phone);
    set_text_update(&mut builder, "service_address", &changes.service_address);
    if let Some(version) = changes.version {
        set_integer(&mut builder, "version", Some(i64::from(version)));
    }

    builder.push(" WHERE id = ").push_bind(id.0.clone());
    Ok(builder)
}

#[async_trait]
impl QuoteStore for SqlQuoteStore {
    async fn find_all(&self) -> Result<Vec<Quote>, ApplicationError> {
        Ok(self.fetch_where("", &[]).await?)
    }

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, ApplicationError> {
        Ok(self.find(id).await?)
    }

    async fn find_by_client(&self, client_id: &ClientId) -> Result<Vec<Quote>, ApplicationError> {
        Ok(self.fetch_where("WHERE client_id = ?", &[client_id.0.clone()]).await?)
    }

    async fn find_by_status(&self, status: QuoteStatus) -> Result<Vec<Quote>, ApplicationError> {
        Ok(self.fetch_where("WHERE status = ?", &[status.as_str().to_string()]).await?)
    }

    async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>, ApplicationError> {
        // Day-level prefilter so bare-date rows match, then the exact bounds.
        let candidates = self
            .fetch_where(
                "WHERE substr(issue_date, 1, 10) BETWEEN ? AND ?",
                &[start.date_naive().to_string(), end.date_naive().to_string()],
            )
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|quote| quote.issue_date >= start && quote.issue_date <= end)
            .collect())
    }

    async fn create(&self, quote: Quote) -> Result<Quote, ApplicationError> {
        self.write_row(&quote, false).await?;
        self.require(&quote.id).await
    }

    async fn update(
        &self,
        id: &QuoteId,
        changes: &QuoteChanges,
    ) -> Result<Quote, ApplicationError> {
        let mut builder = build_update(id, changes, Utc::now())?;
        let result = builder.build().execute(&self.pool).await.map_err(RepositoryError::from)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("quote", id.0.clone()).into());
        }

        self.require(id).await
    }

    async fn update_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
        accepted_date: Option<DateTime<Utc>>,
    ) -> Result<Quote, ApplicationError> {
        let result = sqlx::query(
            "UPDATE quote
             SET status = ?, accepted_date = COALESCE(?, accepted_date), updated_at = ?
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(accepted_date.as_ref().map(encode_timestamp))
        .bind(encode_timestamp(&Utc::now()))
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("quote", id.0.clone()).into());
        }

        self.require(id).await
    }

    async fn delete(&self, id: &QuoteId) -> Result<(), ApplicationError> {
        let result = sqlx::query("DELETE FROM quote WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("quote", id.0.clone()).into());
        }
        Ok(())
    }

    async fn next_sequence_number(&self) -> Result<u64, ApplicationError> {
        Ok(self.allocate_sequence().await?)
    }

    async fn aggregate_stats(&self) -> Result<QuoteStatistics, ApplicationError> {
        let rows = sqlx::query("SELECT status, total FROM quote")
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let mut stats = QuoteStatistics::default();
        for row in &rows {
            let status: String =
                row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let total: Option<String> =
                row.try_get("total").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let status = status
                .parse::<QuoteStatus>()
                .map_err(|e| RepositoryError::Decode(format!("status: {e}")))?;
            stats.record(status, decode_money_lossy(total.as_deref()));
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::build_update;
    use quotedesk_core::diff::{FieldUpdate, QuoteChanges};
    use quotedesk_core::domain::quote::QuoteId;

    #[test]
    fn update_statement_touches_only_changed_columns() {
        let changes = QuoteChanges {
            notes: FieldUpdate::Clear,
            phone: FieldUpdate::Set("555-0199".to_string()),
            version: Some(3),
            ..QuoteChanges::default()
        };

        let builder = build_update(&QuoteId("Q-1".to_string()), &changes, Utc::now())
            .expect("build update");
        let sql = builder.sql();

        assert!(sql.starts_with("UPDATE quote SET updated_at = ?"));
        assert!(sql.contains(", notes = ?"));
        assert!(sql.contains(", phone = ?"));
        assert!(sql.contains(", version = ?"));
        assert!(!sql.contains("items_json"));
        assert!(!sql.contains("email"));
        assert!(sql.ends_with(" WHERE id = ?"));
    }
}
