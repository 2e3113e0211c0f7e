//! Binary entry point for the spate gateway.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spate_app::run_app().await
}
