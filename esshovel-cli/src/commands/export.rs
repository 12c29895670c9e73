//! Export command implementation.

use anyhow::Result;
use esshovel::EsClient;
use tokio::io::BufWriter;

/// Run the export command: spill format to stdout, progress to stderr.
pub async fn run_export(host: &str, index: &str, search: Option<&str>) -> Result<()> {
    let client = EsClient::new(host, 1)?;
    let mut writer = BufWriter::new(tokio::io::stdout());

    let exported = esshovel::export(&client, index, search, &mut writer).await?;
    tracing::info!("exported {} documents", exported);

    Ok(())
}
