// One cycle at a time; the dashboard gets its own blocking worker.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    machine_monitor::cli::run().await
}
