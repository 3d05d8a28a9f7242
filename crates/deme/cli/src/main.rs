#[tokio::main]
async fn main() -> anyhow::Result<()> {
    deme_cli::run().await
}
