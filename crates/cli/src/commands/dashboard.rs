use crate::commands::{
    open_database, quote_service, run_async, service_failure, CommandResult, Failure,
};

pub fn run() -> CommandResult {
    run_async("dashboard", |config| async move {
        let pool = open_database(&config).await?;
        let stats = quote_service(&pool, &config).dashboard_stats().await.map_err(service_failure)?;
        pool.close().await;

        let message = format!(
            "{} quotes worth {} ({} accepted) across {} clients",
            stats.statistics.total,
            stats.statistics.total_value,
            stats.statistics.accepted_value,
            stats.client_count
        );
        Ok::<_, Failure>(CommandResult::success_with_data("dashboard", message, &stats))
    })
}
