use crate::commands::{open_database, run_async, CommandResult, Failure};
use quotedesk_db::{DemoSeedDataset, SeedResult};

pub fn run() -> CommandResult {
    run_async("seed", |config| async move {
        let pool = open_database(&config).await?;
        let settings = config.quotes.general_settings();

        let seeded = DemoSeedDataset::load(&pool, &settings)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        pool.close().await;

        if !verification.all_present {
            let failed: Vec<&str> = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect();
            return Err((
                "seed_verification",
                verification_message(&failed),
                6,
            ));
        }

        Ok::<_, Failure>(CommandResult::success("seed", summary(&seeded)))
    })
}

fn verification_message(failed: &[&str]) -> String {
    if failed.is_empty() {
        "some demo records failed to load".to_string()
    } else {
        format!("demo records missing after seed: {}", failed.join(", "))
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo dataset ready: {} clients, {} quotes inserted, {} already present",
        seeded.clients_seeded,
        seeded.quotes_seeded.len(),
        seeded.quotes_skipped.len()
    )
}
