use crate::commands::{open_database, run_async, CommandResult, Failure};

pub fn run() -> CommandResult {
    run_async("migrate", |config| async move {
        let pool = open_database(&config).await?;
        pool.close().await;
        Ok::<_, Failure>(CommandResult::success("migrate", "applied pending migrations"))
    })
}
