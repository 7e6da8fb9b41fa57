use std::sync::Arc;

use anyhow::Result;
use veil_config::Config;

use super::build_pipeline;

pub async fn handle(config: &Config) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    veil_intercept::run_stdio(Arc::new(pipeline)).await
}
