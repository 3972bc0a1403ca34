//! Command implementations

use std::path::Path;
use std::sync::Arc;

use pennyvault_core::{compute_roundups, AppContext};
use pennyvault_llm::{CategorizationClient, CategorizationService, LLMRouter};
use pennyvault_types::{sample_transactions, short_address, AppConfig, TransactionRecord};

use crate::display;

/// Records from a JSON file, or the built-in sample data
pub fn load_records(file: Option<&Path>) -> anyhow::Result<Vec<TransactionRecord>> {
    let Some(path) = file else {
        return Ok(sample_transactions());
    };
    let json = std::fs::read_to_string(path)?;
    let records = TransactionRecord::parse_list(&json);
    if records.is_empty() && !json.trim().is_empty() {
        tracing::warn!(path = %path.display(), "No transactions parsed from file");
    }
    Ok(records)
}

pub fn roundups(records: &[TransactionRecord]) {
    display::section("Round-ups");
    let result = compute_roundups(records);
    for item in &result.per_item {
        display::roundup_row(&item.record.description, &item.record.amount.to_string(), item.roundup);
    }
    println!();
    display::kv("Total round-up", &result.total.to_string());
}

pub async fn connect(ctx: &Arc<AppContext>) -> anyhow::Result<()> {
    display::section("Wallet");
    let session = ctx.connect_wallet().await?;
    display::success("Wallet connected");
    display::kv("Address", &session.address.to_string());
    display::kv("Network", &ctx.network_label());
    display::kv("Chain ID", &session.chain_id.to_string());
    display::kv("Vault balance", &format!("{} {}", ctx.balance(), ctx.chain().native_currency.symbol));
    Ok(())
}

pub async fn balance(ctx: &Arc<AppContext>) -> anyhow::Result<()> {
    let session = ctx.connect_wallet().await?;
    display::section("Vault balance");
    display::kv("Address", &short_address(&session.address));
    display::kv("Balance", &format!("{} {}", ctx.balance(), ctx.chain().native_currency.symbol));
    Ok(())
}

pub async fn save(ctx: &Arc<AppContext>, records: &[TransactionRecord]) -> anyhow::Result<()> {
    ctx.connect_wallet().await?;
    display::section("Save round-ups");
    display::info(&format!("{} transactions on {}", records.len(), ctx.network_label()));

    let outcome = ctx.save_roundups(records).await?;
    let Some(receipt) = &outcome.receipt else {
        display::warning(&outcome.message);
        return Ok(());
    };

    display::success(&outcome.message);
    display::kv(
        "Deposited",
        &format!("{} {}", receipt.amount_native, ctx.chain().native_currency.symbol),
    );
    display::kv("Transaction", &receipt.tx_hash);
    display::kv("Block", &receipt.block_number.to_string());
    display::kv("Explorer", &ctx.explorer_url(&receipt.tx_hash));
    match &outcome.balance {
        Some(balance) => display::kv("Vault balance", &balance.amount),
        None => display::warning("Vault balance could not be refreshed"),
    }
    Ok(())
}

pub async fn categorize(
    config: &AppConfig,
    records: &[TransactionRecord],
    json: bool,
) -> anyhow::Result<()> {
    let client = CategorizationClient::new(LLMRouter::from_config(&config.llm));
    let result = client.categorize(records).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    display::section(&format!("Categorized ({})", client.provider_kind()));
    for item in &result.categorized {
        println!("  {:<28} {:>10}  {}", item.desc, item.amount.to_string(), item.category);
        if let Some(anomaly) = &item.anomaly {
            display::warning(anomaly);
        }
    }

    display::section("Insights");
    display::kv("Total spent", &result.insights.total_spent.to_string());
    for (category, amount) in &result.insights.category_breakdown {
        display::kv(category, &amount.to_string());
    }
    for trend in &result.insights.spending_trends {
        display::info(trend);
    }
    for alert in result.alerts.iter().chain(&result.insights.bill_anomalies) {
        display::warning(alert);
    }

    display::section("Tips");
    for tip in &result.tips {
        display::info(tip);
    }
    display::kv(
        "Potential monthly savings",
        &format!(
            "{} ({})",
            result.potential_savings.monthly, result.potential_savings.description
        ),
    );
    Ok(())
}
