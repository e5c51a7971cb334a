//! Balances, faucet and membership.

use anyhow::Result;
use datadao::util::clock::format_duration;
use datadao::{Address, DaoClient};

use super::{format_time, label};
use crate::style::*;

pub async fn balance(client: &DaoClient, address: &Address) -> Result<()> {
    let balance = client.balance(address).await?;
    print_header("Balance");
    print_key_value("Address", balance.address.as_str());
    print_key_value("Balance", &balance.balance.to_string());
    print_key_value("Staked", &balance.staked.to_string());

    if let Ok(actor) = client.get_user(address).await {
        print_key_value_colored("Tier", &label(&actor.tier), colors::CYAN);
        print_key_value("Reputation", &actor.reputation.to_string());
    } else {
        print_info("Not a member yet");
    }
    println!();
    Ok(())
}

pub async fn faucet(client: &DaoClient, address: &Address) -> Result<()> {
    let claim = client.request_faucet(address).await?;
    print_success(&format!("Received {} tokens", claim.amount));
    print_key_value("Balance", &claim.balance.to_string());
    print_key_value("Requests left", &claim.requests_remaining.to_string());
    if let Some(next) = claim.next_available_at {
        let wait = next - chrono::Utc::now().timestamp();
        print_key_value(
            "Next request",
            &format!("{} (in {})", format_time(next), format_duration(wait.max(0))),
        );
    }
    Ok(())
}

pub async fn join(client: &DaoClient, stake: u64, name: Option<&str>) -> Result<()> {
    let actor = client.join(stake, name).await?;
    print_success(&format!("Joined as {}", actor.address));
    print_key_value("Staked", &actor.staked_amount.to_string());
    print_key_value_colored("Tier", &label(&actor.tier), colors::CYAN);
    Ok(())
}

pub async fn stake(client: &DaoClient, amount: u64) -> Result<()> {
    let actor = client.stake(amount).await?;
    print_success(&format!("Staked {} more tokens", amount));
    print_key_value("Total staked", &actor.staked_amount.to_string());
    print_key_value_colored("Tier", &label(&actor.tier), colors::CYAN);
    Ok(())
}
