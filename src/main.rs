#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shadowtrace_lib::run().await
}
