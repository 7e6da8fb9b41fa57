use anyhow::Result;
use veil_config::Config;
use veil_intercept::ScanResponse;

use super::build_pipeline;

pub async fn handle(config: &Config, text: &str) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let response = ScanResponse::from(pipeline.execute(text).await?);

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
