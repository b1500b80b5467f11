use std::time::Duration;

use anyhow::Result;
use genesisonline::Client;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure credentials via env vars or a `.genesisrc` file.
    let client = Client::from_env()?.with_poll_interval(Duration::from_secs(10));

    // 51000-0013 is large enough that the server defers it to a batch job;
    // with wait_for_result = true the call blocks until the job completes.
    let table = client.data().table("51000-0013", true, &[("area", "all")])?;

    println!("status: {:?} - {}", table.status.code, table.status.content);
    if let Some(value) = table.content.as_json() {
        println!("{value}");
    }
    Ok(())
}
