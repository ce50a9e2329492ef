#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = provia_rust::run_worker().await {
        eprintln!("provia-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
