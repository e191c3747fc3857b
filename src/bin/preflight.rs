use anyhow::{anyhow, Context};
use realstack::infra::config::Config;
use realstack::infra::solana::{SolanaLedger, TokenLedger};

/// Payers below this balance (0.01 SOL) are likely to fail on account rent.
const LOW_BALANCE_LAMPORTS: u64 = 10_000_000;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight\n\
         \n\
         Checks that the configured Solana cluster, program and payer are usable.\n\
         Requires env vars:\n\
           SOLANA_RPC_URL, SOLANA_PROGRAM_ID, SOLANA_ASSET_MINT\n\
         Optional:\n\
           SOLANA_PAYER_KEYPAIR (default ~/.config/solana/id.json)\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    // Only the Solana half of the configuration matters here.
    dotenv::dotenv().ok();
    let config = Config::from_lookup(|key| match key {
        "STORE_BACKEND" => Some("memory".to_string()),
        "LEDGER_MODE" => Some("solana".to_string()),
        _ => std::env::var(key).ok(),
    })?;
    let solana = config
        .solana
        .as_ref()
        .ok_or_else(|| anyhow!("Solana settings are missing"))?;

    println!("> Preflight:");
    println!("  SOLANA_RPC_URL={}", solana.rpc_url);
    println!("  SOLANA_PROGRAM_ID={}", solana.program_id);
    println!("  SOLANA_ASSET_MINT={}", solana.asset_mint);
    println!("  Payer keypair: {}", solana.payer_keypair_path);

    let ledger = SolanaLedger::new(solana)?;

    ledger.ping().await.context("RPC endpoint is not reachable")?;
    println!("  RPC reachable.");

    let balance = ledger.payer_balance().await?;
    let sol = balance as f64 / 1_000_000_000_f64;
    println!("  Payer: {}", ledger.payer_pubkey());
    println!("  Payer balance: {} lamports (~{:.6} SOL)", balance, sol);
    if balance < LOW_BALANCE_LAMPORTS {
        eprintln!("  Warning: payer balance looks low; tokenization transactions may fail.");
    }

    if ledger.program_deployed().await? {
        println!("  Program account is deployed + executable.");
    } else {
        return Err(anyhow!(
            "program {} exists but is not marked executable",
            ledger.program_id()
        ));
    }

    println!("> Preflight OK.");
    Ok(())
}
