#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizroom::run().await {
        eprintln!("quizroom fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
