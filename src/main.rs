#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = provia_rust::run().await {
        eprintln!("provia-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
