use anyhow::Result;
use datadao::DaoClient;

use crate::style::*;

pub async fn run(client: &DaoClient) -> Result<()> {
    let health = client.health().await?;
    let stats = client.stats().await?;

    print_header("DataDAO");
    print_key_value("Server", client.base_url());
    print_key_value_colored("Status", &health.status, colors::GREEN);
    print_key_value("Version", &health.version);

    print_section("Marketplace");
    print_key_value("Members", &stats.member_count.to_string());
    print_key_value("Tasks", &stats.task_count.to_string());
    print_key_value("Datasets", &stats.dataset_count.to_string());
    print_key_value("Proposals", &stats.proposal_count.to_string());

    let faucet = client.faucet_status(None).await?;
    print_section("Faucet");
    print_key_value(
        "Enabled",
        if faucet.enabled { "yes" } else { "no" },
    );
    print_key_value(
        "Per request",
        &format!("{} ({}x per window)", faucet.amount_per_request, faucet.max_requests_per_day),
    );
    print_key_value("Distributed", &faucet.total_distributed.to_string());
    println!();
    Ok(())
}
