//! Ask command - answers one question and exits

use crate::cli::{init_console_logging, load_config};

pub async fn run(query: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    init_console_logging(&config);

    let runtime = crate::create_runtime(&config).await?;

    match runtime.assistant.answer(query, None).await {
        Ok(answer) => println!("{}", answer.answer),
        Err(e) => {
            tracing::error!(error = %e, "Query failed");
            println!("{}", e.user_message());
        }
    }

    runtime.save_cache().await;
    Ok(())
}
