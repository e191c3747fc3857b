// Responsible for all communication with the Solana blockchain.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signer::{
        keypair::{read_keypair_file, Keypair},
        Signer,
    },
    transaction::Transaction,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::infra::config::SolanaConfig;
use crate::infra::solana::{instructions, observe, AssetTokenRequest, LedgerError, LedgerReceipt, TokenLedger};

/// SPL Token program, owner of the asset mint.
const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

pub struct SolanaLedger {
    client: RpcClient,
    payer: Arc<Keypair>,
    program_id: Pubkey,
    asset_mint: Pubkey,
    token_program: Pubkey,
    cluster_hint: String,
}

fn rpc_error(operation: &'static str) -> impl Fn(solana_client::client_error::ClientError) -> LedgerError {
    move |e| LedgerError::Rpc {
        operation,
        message: e.to_string(),
    }
}

impl SolanaLedger {
    pub fn new(config: &SolanaConfig) -> Result<Self, LedgerError> {
        let payer = read_keypair_file(&config.payer_keypair_path).map_err(|e| {
            LedgerError::Config(format!(
                "failed to read keypair file {}: {}",
                config.payer_keypair_path, e
            ))
        })?;
        let parse = |label: &str, value: &str| {
            Pubkey::from_str(value)
                .map_err(|e| LedgerError::Config(format!("invalid {} '{}': {}", label, value, e)))
        };

        Ok(Self {
            client: RpcClient::new_with_commitment(config.rpc_url.clone(), CommitmentConfig::confirmed()),
            payer: Arc::new(payer),
            program_id: parse("SOLANA_PROGRAM_ID", &config.program_id)?,
            asset_mint: parse("SOLANA_ASSET_MINT", &config.asset_mint)?,
            token_program: parse("token program id", SPL_TOKEN_PROGRAM_ID)?,
            cluster_hint: cluster_hint(&config.rpc_url),
        })
    }

    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Checks that the configured program is deployed and executable.
    pub async fn program_deployed(&self) -> Result<bool, LedgerError> {
        match self.client.get_account(&self.program_id).await {
            Ok(account) => Ok(account.executable),
            Err(e) => Err(rpc_error("get_program_account")(e)),
        }
    }

    pub async fn payer_balance(&self) -> Result<u64, LedgerError> {
        self.client
            .get_balance(&self.payer.pubkey())
            .await
            .map_err(rpc_error("get_balance"))
    }

    fn parse_account(&self, token_account: &str) -> Result<Pubkey, LedgerError> {
        Pubkey::from_str(token_account).map_err(|_| LedgerError::UnknownAccount(token_account.to_string()))
    }

    /// Instructions that only touch an existing asset token account under the payer's authority.
    fn authority_instruction(&self, asset_token: Pubkey, data: Vec<u8>) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.payer.pubkey(), true),
                AccountMeta::new(asset_token, false),
            ],
            data,
        }
    }

    async fn submit(
        &self,
        operation: &'static str,
        instruction: Instruction,
        extra_signer: Option<&Keypair>,
    ) -> Result<String, LedgerError> {
        let mut signers: Vec<&Keypair> = vec![self.payer.as_ref()];
        if let Some(extra) = extra_signer {
            signers.push(extra);
        }

        let mut transaction = Transaction::new_with_payer(&[instruction], Some(&self.payer.pubkey()));
        let recent_blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(rpc_error(operation))?;
        transaction
            .try_sign(&signers[..], recent_blockhash)
            .map_err(|e| LedgerError::Rpc {
                operation,
                message: format!("signing failed: {}", e),
            })?;
        let signature = self
            .client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(rpc_error(operation))?;

        info!(
            operation,
            signature = %signature,
            explorer = %format!("https://explorer.solana.com/tx/{}{}", signature, self.cluster_hint),
            "transaction confirmed"
        );
        Ok(signature.to_string())
    }
}

fn cluster_hint(rpc_url: &str) -> String {
    if rpc_url.contains("devnet") {
        "?cluster=devnet".to_string()
    } else if rpc_url.contains("testnet") {
        "?cluster=testnet".to_string()
    } else if rpc_url.contains("mainnet") {
        String::new()
    } else {
        format!("?cluster=custom&customUrl={}", rpc_url)
    }
}

#[async_trait]
impl TokenLedger for SolanaLedger {
    fn name(&self) -> &'static str {
        "solana"
    }

    async fn create_asset_token(&self, request: &AssetTokenRequest) -> Result<LedgerReceipt, LedgerError> {
        observe("create_asset_token", async {
            // Fresh account for the asset token; it co-signs its own creation.
            let asset_token = Keypair::new();
            let instruction = Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(self.payer.pubkey(), true),
                    AccountMeta::new(asset_token.pubkey(), true),
                    AccountMeta::new_readonly(self.asset_mint, false),
                    AccountMeta::new_readonly(solana_program::system_program::ID, false),
                    AccountMeta::new_readonly(self.token_program, false),
                    AccountMeta::new_readonly(solana_program::sysvar::rent::ID, false),
                ],
                data: instructions::create_asset_token(request),
            };
            let signature = self
                .submit("create_asset_token", instruction, Some(&asset_token))
                .await?;
            Ok(LedgerReceipt {
                token_account: asset_token.pubkey().to_string(),
                signature,
            })
        })
        .await
    }

    async fn verify_asset(&self, token_account: &str) -> Result<String, LedgerError> {
        observe("verify_asset", async {
            let asset_token = self.parse_account(token_account)?;
            let instruction = Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(self.payer.pubkey(), true),
                    AccountMeta::new(asset_token, false),
                ],
                data: instructions::verify_asset(),
            };
            self.submit("verify_asset", instruction, None).await
        })
        .await
    }

    async fn update_asset_valuation(
        &self,
        token_account: &str,
        valuation: u64,
        share_price: u64,
    ) -> Result<String, LedgerError> {
        observe("update_asset_valuation", async {
            let asset_token = self.parse_account(token_account)?;
            let ix = self.authority_instruction(
                asset_token,
                instructions::update_asset_valuation(valuation, share_price),
            );
            self.submit("update_asset_valuation", ix, None).await
        })
        .await
    }

    async fn toggle_tradability(&self, token_account: &str, is_tradable: bool) -> Result<String, LedgerError> {
        observe("toggle_tradability", async {
            let asset_token = self.parse_account(token_account)?;
            let ix = self.authority_instruction(asset_token, instructions::toggle_tradability(is_tradable));
            self.submit("toggle_tradability", ix, None).await
        })
        .await
    }

    async fn burn_asset_token(&self, token_account: &str) -> Result<String, LedgerError> {
        observe("burn_asset_token", async {
            let asset_token = self.parse_account(token_account)?;
            let ix = self.authority_instruction(asset_token, instructions::burn_asset_token());
            self.submit("burn_asset_token", ix, None).await
        })
        .await
    }

    async fn distribute_income(&self, token_account: &str, amount: u64) -> Result<String, LedgerError> {
        observe("distribute_income", async {
            let asset_token = self.parse_account(token_account)?;
            let ix = self.authority_instruction(asset_token, instructions::distribute_income(amount));
            self.submit("distribute_income", ix, None).await
        })
        .await
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        observe("get_health", async {
            self.client.get_health().await.map_err(rpc_error("get_health"))
        })
        .await
    }
}
