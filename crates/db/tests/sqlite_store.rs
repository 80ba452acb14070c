use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use quotedesk_core::diff::{FieldUpdate, QuotePatch};
use quotedesk_core::domain::client::{Client, ClientId, PersonType};
use quotedesk_core::domain::quote::{PaymentCondition, QuoteItemDraft, QuoteStatus};
use quotedesk_core::domain::settings::GeneralSettings;
use quotedesk_core::notifications::InMemoryNotificationBus;
use quotedesk_core::ports::{QuoteStore, SettingsProvider};
use quotedesk_core::pricing::{plan_installments, InstallmentConfig};
use quotedesk_core::service::{CreateQuote, QuoteService};
use quotedesk_db::migrations::run_pending;
use quotedesk_db::{
    connect_with_settings, DbPool, SqlClientDirectory, SqlQuoteStore, SqlSettingsProvider,
};

async fn pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    run_pending(&pool).await.expect("migrate");
    pool
}

async fn seed_client(pool: &DbPool) -> ClientId {
    let now = Utc::now();
    let client = Client {
        id: ClientId("client-sql-1".to_string()),
        name: "Horizonte Condominium".to_string(),
        tax_id: "12.345.678/0001-90".to_string(),
        person_type: PersonType::Company,
        address: None,
        phone: Some("555-0142".to_string()),
        email: None,
        created_at: now,
        updated_at: now,
    };
    SqlClientDirectory::new(pool.clone()).save(&client).await.expect("save client");
    client.id
}

fn service(pool: &DbPool) -> QuoteService {
    QuoteService::new(
        Arc::new(SqlQuoteStore::new(pool.clone())),
        Arc::new(SqlClientDirectory::new(pool.clone())),
        Arc::new(SqlSettingsProvider::new(pool.clone(), GeneralSettings::default())),
        Arc::new(InMemoryNotificationBus::default()),
    )
}

fn request(client_id: &ClientId) -> CreateQuote {
    CreateQuote {
        client_id: client_id.clone(),
        service_id: "svc-roofing".to_string(),
        service_description: "Roof repair".to_string(),
        items: vec![QuoteItemDraft {
            category_id: "cat-roof".to_string(),
            category_name: "Roofing".to_string(),
            description: "Metal sheet replacement".to_string(),
            unit: "m2".to_string(),
            quantity: Decimal::new(125, 1),
            unit_labor_price: Decimal::from(90),
            unit_material_price: Decimal::from(150),
        }],
        limitation_ids: vec!["lim-weather".to_string()],
        execution_deadline_days: Some(20),
        ..CreateQuote::default()
    }
}

#[tokio::test]
async fn created_quote_reads_back_identically() {
    let pool = pool().await;
    let client_id = seed_client(&pool).await;
    let settings = GeneralSettings::default();
    let total = Decimal::from(3000);
    let plan = plan_installments(total, Decimal::from(20), &InstallmentConfig::from(&settings), &[2])
        .expect("plan");

    let created = service(&pool)
        .create(CreateQuote {
            payment_condition: PaymentCondition::Installment,
            installment_plan: Some(plan.clone()),
            installment_text: Some("Entry plus two".to_string()),
            ..request(&client_id)
        })
        .await
        .expect("create");

    let store = SqlQuoteStore::new(pool.clone());
    let loaded = store.find_by_id(&created.id).await.expect("load").expect("present");

    assert_eq!(loaded.items, created.items);
    assert_eq!(loaded.totals.total, Decimal::from(3000));
    assert_eq!(loaded.installment_plan, Some(plan));
    assert_eq!(loaded.limitation_ids, vec!["lim-weather".to_string()]);
    assert_eq!(loaded.client.person_type, PersonType::Company);
    assert_eq!(loaded.issue_date.timestamp_micros(), created.issue_date.timestamp_micros());
    assert_eq!(loaded.sequence_number, 1);
}

#[tokio::test]
async fn partial_update_changes_only_named_columns() {
    let pool = pool().await;
    let client_id = seed_client(&pool).await;
    let service = service(&pool);
    let created = service
        .create(CreateQuote { notes: Some("gate code 1234".to_string()), ..request(&client_id) })
        .await
        .expect("create");

    let updated = service
        .update(
            &created.id,
            QuotePatch {
                notes: FieldUpdate::Clear,
                execution_deadline_days: FieldUpdate::Set(30),
                ..QuotePatch::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.version, 1);
    assert_eq!(updated.notes, None);
    assert_eq!(updated.execution_deadline_days, Some(30));
    assert_eq!(updated.items, created.items);
    assert_eq!(updated.service_description, created.service_description);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn sequence_numbers_increase_and_survive_deletes() {
    let pool = pool().await;
    let client_id = seed_client(&pool).await;
    let service = service(&pool);

    let first = service.create(request(&client_id)).await.expect("first");
    let second = service.create(request(&client_id)).await.expect("second");
    service.delete(&second.id).await.expect("delete");
    let third = service.create(request(&client_id)).await.expect("third");

    assert_eq!(first.sequence_number, 1);
    assert_eq!(second.sequence_number, 2);
    assert_eq!(third.sequence_number, 3);
}

#[tokio::test]
async fn status_updates_and_aggregate_stats() {
    let pool = pool().await;
    let client_id = seed_client(&pool).await;
    let service = service(&pool);

    let accepted = service.create(request(&client_id)).await.expect("create");
    service.create(request(&client_id)).await.expect("create");
    let stored = service.transition_status(&accepted.id, QuoteStatus::Accepted).await.expect("accept");
    assert!(stored.accepted_date.is_some());

    let stats = SqlQuoteStore::new(pool.clone()).aggregate_stats().await.expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.by_status.accepted.count, 1);
    assert_eq!(stats.by_status.open.count, 1);
    assert_eq!(stats.accepted_value, Decimal::from(3000));
    assert_eq!(stats.total_value, Decimal::from(6000));

    let open = service.find_by_status(QuoteStatus::Open).await.expect("open");
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn legacy_rows_with_bare_dates_and_bad_totals_still_load() {
    let pool = pool().await;
    let client_id = seed_client(&pool).await;
    let created = service(&pool).create(request(&client_id)).await.expect("create");

    sqlx::query("UPDATE quote SET issue_date = '2026-01-15', total = 'n/a' WHERE id = ?")
        .bind(&created.id.0)
        .execute(&pool)
        .await
        .expect("corrupt row");

    let store = SqlQuoteStore::new(pool.clone());
    let loaded = store.find_by_id(&created.id).await.expect("load").expect("present");
    assert_eq!(loaded.issue_date.date_naive().to_string(), "2026-01-15");
    assert_eq!(loaded.totals.total, Decimal::ZERO);

    let day = loaded.issue_date;
    let in_range = store
        .find_by_date_range(day - Duration::days(1), day + Duration::hours(1))
        .await
        .expect("range");
    assert_eq!(in_range.len(), 1);
}

#[tokio::test]
async fn settings_fall_back_until_saved() {
    let pool = pool().await;
    let fallback = GeneralSettings { validity_days: 21, ..GeneralSettings::default() };
    let provider = SqlSettingsProvider::new(pool.clone(), fallback.clone());

    assert_eq!(provider.get().await.expect("fallback"), fallback);

    let saved = GeneralSettings {
        validity_days: 10,
        interest_rate_per_installment: Decimal::new(175, 2),
        ..GeneralSettings::default()
    };
    provider.save(&saved).await.expect("save");
    assert_eq!(provider.get().await.expect("stored"), saved);
}

#[tokio::test]
async fn deleting_unknown_quote_is_not_found() {
    let pool = pool().await;
    let store = SqlQuoteStore::new(pool);
    let error = store
        .delete(&quotedesk_core::domain::quote::QuoteId("missing".to_string()))
        .await
        .expect_err("missing");
    assert!(error.is_not_found());
}
