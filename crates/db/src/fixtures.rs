use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use tracing::info;

use quotedesk_core::domain::client::{Client, ClientId, PersonType};
use quotedesk_core::domain::quote::{
    ContactOverrides, PaymentCondition, Quote, QuoteId, QuoteItemDraft, QuoteStatus,
};
use quotedesk_core::domain::settings::GeneralSettings;
use quotedesk_core::lifecycle::expiry_for;
use quotedesk_core::pricing::{apply_discount, plan_installments, price_quote, InstallmentConfig};

use crate::connection::DbPool;
use crate::repositories::{RepositoryError, SqlClientDirectory, SqlQuoteStore};

struct DemoClient {
    id: &'static str,
    name: &'static str,
    tax_id: &'static str,
    person_type: PersonType,
    phone: &'static str,
    email: &'static str,
}

struct DemoQuote {
    id: &'static str,
    client_id: &'static str,
    status: QuoteStatus,
    service_id: &'static str,
    service_description: &'static str,
    payment_condition: PaymentCondition,
    /// Days before today the quote was issued.
    issued_days_ago: i64,
    items: &'static [(&'static str, &'static str, i64, i64, i64)],
}

const DEMO_CLIENTS: &[DemoClient] = &[
    DemoClient {
        id: "client-demo-001",
        name: "Marina Costa",
        tax_id: "123.456.789-00",
        person_type: PersonType::Individual,
        phone: "+55 11 90000-0001",
        email: "marina@example.com",
    },
    DemoClient {
        id: "client-demo-002",
        name: "Horizonte Condominium",
        tax_id: "12.345.678/0001-90",
        person_type: PersonType::Company,
        phone: "+55 11 3000-0002",
        email: "admin@horizonte.example.com",
    },
    DemoClient {
        id: "client-demo-003",
        name: "Atlas Logistics",
        tax_id: "98.765.432/0001-10",
        person_type: PersonType::Company,
        phone: "+55 11 3000-0003",
        email: "facilities@atlas.example.com",
    },
];

/// Items are `(category, description, quantity, unit labor, unit material)`.
const DEMO_QUOTES: &[DemoQuote] = &[
    DemoQuote {
        id: "quote-demo-001",
        client_id: "client-demo-001",
        status: QuoteStatus::Open,
        service_id: "svc-waterproofing",
        service_description: "Terrace waterproofing",
        payment_condition: PaymentCondition::Installment,
        issued_days_ago: 2,
        items: &[
            ("waterproofing", "Acrylic membrane application", 40, 45, 80),
            ("finishing", "Ceramic tile reinstallation", 40, 60, 95),
        ],
    },
    DemoQuote {
        id: "quote-demo-002",
        client_id: "client-demo-002",
        status: QuoteStatus::Accepted,
        service_id: "svc-painting",
        service_description: "Facade painting",
        payment_condition: PaymentCondition::Cash,
        issued_days_ago: 35,
        items: &[
            ("painting", "Facade wash and primer", 300, 12, 8),
            ("painting", "Two coats of elastomeric paint", 300, 18, 22),
        ],
    },
    DemoQuote {
        id: "quote-demo-003",
        client_id: "client-demo-003",
        status: QuoteStatus::Declined,
        service_id: "svc-roofing",
        service_description: "Warehouse roof repair",
        payment_condition: PaymentCondition::Negotiate,
        issued_days_ago: 70,
        items: &[("roofing", "Metal sheet replacement", 25, 90, 150)],
    },
];

/// Demo clients and quotes for local exploration of the CLI.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Upserts the demo clients and inserts any demo quote that is not present yet.
    /// Existing demo quotes are left untouched so repeated runs are harmless.
    pub async fn load(
        pool: &DbPool,
        settings: &GeneralSettings,
    ) -> Result<SeedResult, RepositoryError> {
        let clients = SqlClientDirectory::new(pool.clone());
        let quotes = SqlQuoteStore::new(pool.clone());
        let now = Utc::now();

        let mut result = SeedResult::default();
        for demo in DEMO_CLIENTS {
            clients.save(&demo_client(demo, now)).await?;
            result.clients_seeded += 1;
        }

        for demo in DEMO_QUOTES {
            let id = QuoteId(demo.id.to_string());
            if quotes.find(&id).await?.is_some() {
                result.quotes_skipped.push(demo.id);
                continue;
            }

            let sequence_number = quotes.allocate_sequence().await?;
            let quote = demo_quote(demo, sequence_number, settings)?;
            quotes.save(&quote).await?;
            result.quotes_seeded.push(demo.id);
        }

        info!(
            event_name = "fixtures.demo.seeded",
            clients = result.clients_seeded as u64,
            quotes_seeded = result.quotes_seeded.len() as u64,
            quotes_skipped = result.quotes_skipped.len() as u64,
            "demo dataset loaded"
        );
        Ok(result)
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for demo in DEMO_CLIENTS {
            let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM client WHERE id = ?")
                .bind(demo.id)
                .fetch_one(pool)
                .await?
                .try_get("count")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            checks.push((demo.id, count == 1));
        }

        for demo in DEMO_QUOTES {
            let row = sqlx::query("SELECT items_json, total FROM quote WHERE id = ?")
                .bind(demo.id)
                .fetch_optional(pool)
                .await?;
            let present = match row {
                Some(row) => {
                    let items: String =
                        row.try_get("items_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                    let items: Vec<serde_json::Value> = serde_json::from_str(&items)?;
                    items.len() == demo.items.len()
                }
                None => false,
            };
            checks.push((demo.id, present));
        }

        Ok(VerificationResult { all_present: checks.iter().all(|(_, ok)| *ok), checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for demo in DEMO_QUOTES {
            sqlx::query("DELETE FROM quote WHERE id = ?").bind(demo.id).execute(&mut *tx).await?;
        }
        for demo in DEMO_CLIENTS {
            sqlx::query("DELETE FROM client WHERE id = ?").bind(demo.id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn demo_client(demo: &DemoClient, now: chrono::DateTime<Utc>) -> Client {
    Client {
        id: ClientId(demo.id.to_string()),
        name: demo.name.to_string(),
        tax_id: demo.tax_id.to_string(),
        person_type: demo.person_type,
        address: None,
        phone: Some(demo.phone.to_string()),
        email: Some(demo.email.to_string()),
        created_at: now,
        updated_at: now,
    }
}

fn demo_quote(
    demo: &DemoQuote,
    sequence_number: u64,
    settings: &GeneralSettings,
) -> Result<Quote, RepositoryError> {
    let client = DEMO_CLIENTS
        .iter()
        .find(|client| client.id == demo.client_id)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown demo client {}", demo.client_id)))?;

    let drafts: Vec<QuoteItemDraft> = demo
        .items
        .iter()
        .map(|(category, description, quantity, labor, material)| QuoteItemDraft {
            category_id: format!("cat-{category}"),
            category_name: category.to_string(),
            description: description.to_string(),
            unit: "m2".to_string(),
            quantity: Decimal::from(*quantity),
            unit_labor_price: Decimal::from(*labor),
            unit_material_price: Decimal::from(*material),
        })
        .collect();
    let (items, totals) = price_quote(&drafts);

    let now = Utc::now();
    let issue_date = now - Duration::days(demo.issued_days_ago);
    let installment_plan = match demo.payment_condition {
        PaymentCondition::Installment => Some(
            plan_installments(totals.total, Decimal::from(20), &InstallmentConfig::from(settings), &[1, 3])
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        _ => None,
    };
    let discount = match demo.payment_condition {
        PaymentCondition::Cash => apply_discount(totals.total, Decimal::from(5)),
        _ => None,
    };

    let snapshot = demo_client(client, now).snapshot();
    Ok(Quote {
        id: QuoteId(demo.id.to_string()),
        sequence_number,
        version: 0,
        status: demo.status,
        client_id: ClientId(client.id.to_string()),
        client: snapshot,
        issue_date,
        expiry_date: expiry_for(issue_date, settings),
        accepted_date: (demo.status == QuoteStatus::Accepted).then_some(issue_date + Duration::days(3)),
        service_id: demo.service_id.to_string(),
        service_description: demo.service_description.to_string(),
        items,
        limitation_ids: vec![],
        execution_deadline_days: Some(20),
        inspection_deadline_days: None,
        payment_condition: demo.payment_condition,
        installment_text: None,
        installment_plan,
        discount,
        show_detailed_values: true,
        totals,
        notes: None,
        contacts: ContactOverrides::default(),
        created_at: issue_date,
        updated_at: issue_date,
    })
}

#[derive(Debug, Default)]
pub struct SeedResult {
    pub clients_seeded: usize,
    pub quotes_seeded: Vec<&'static str>,
    pub quotes_skipped: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use quotedesk_core::domain::settings::GeneralSettings;

    use super::{DemoSeedDataset, DEMO_QUOTES};
    use crate::{connect_with_settings, migrations::run_pending};

    #[tokio::test]
    async fn seed_is_idempotent_and_verifiable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let settings = GeneralSettings::default();

        let first = DemoSeedDataset::load(&pool, &settings).await.expect("first seed");
        assert_eq!(first.quotes_seeded.len(), DEMO_QUOTES.len());

        let second = DemoSeedDataset::load(&pool, &settings).await.expect("second seed");
        assert!(second.quotes_seeded.is_empty());
        assert_eq!(second.quotes_skipped.len(), DEMO_QUOTES.len());

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "checks: {:?}", verification.checks);

        DemoSeedDataset::clean(&pool).await.expect("clean");
        let after_clean = DemoSeedDataset::verify(&pool).await.expect("verify after clean");
        assert!(!after_clean.all_present);
    }
}
