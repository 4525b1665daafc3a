use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    recettes::cli::run().await
}
