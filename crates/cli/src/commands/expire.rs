use crate::commands::{
    open_database, quote_service, run_async, service_failure, CommandResult, Failure,
};

pub fn run() -> CommandResult {
    run_async("expire", |config| async move {
        let pool = open_database(&config).await?;
        let sweep = quote_service(&pool, &config).verify_expired().await.map_err(service_failure)?;
        pool.close().await;

        let message =
            format!("expired {} quotes, {} failures", sweep.transitioned(), sweep.failures.len());
        if sweep.failures.is_empty() {
            Ok::<_, Failure>(CommandResult::success_with_data("expire", message, &sweep))
        } else {
            Ok::<_, Failure>(CommandResult::failure("expire", "partial_failure", message, 8))
        }
    })
}
