#[tokio::main]
async fn main() -> anyhow::Result<()> {
    repogate::run().await
}
