#[tokio::main]
async fn main() -> anyhow::Result<()> {
    driftwatch::cli::app::run().await
}
