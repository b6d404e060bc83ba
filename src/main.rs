#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kpi_dashboard_lib::run().await?;
    Ok(())
}
