// Asset token accounts for tokenized real-world assets.
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token};

declare_id!("HY3yRbhaZvibSqZkh8YNp9R3NdnnBf8NwL6PVUKsaxYd");

const MAX_NAME: usize = 100;
const MAX_SYMBOL: usize = 10;
const MAX_CATEGORY: usize = 32;
const MAX_DESCRIPTION: usize = 500;
const MAX_URI: usize = 200;
const MAX_TOTAL_SHARES: u64 = 1_000_000_000;

#[program]
pub mod realstack_program {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    pub fn create_asset_token(
        ctx: Context<CreateAssetToken>,
        name: String,
        symbol: String,
        category: String,
        description: String,
        uri: String,
        valuation: u64,
        total_shares: u64,
        share_price: u64,
    ) -> Result<()> {
        require!(
            name.len() <= MAX_NAME
                && symbol.len() <= MAX_SYMBOL
                && category.len() <= MAX_CATEGORY
                && description.len() <= MAX_DESCRIPTION
                && uri.len() <= MAX_URI,
            RealStackError::InvalidParameters
        );
        require!(valuation > 0 && share_price > 0, RealStackError::InvalidParameters);
        require!(
            total_shares > 0 && total_shares <= MAX_TOTAL_SHARES,
            RealStackError::InvalidParameters
        );

        let now = Clock::get()?.unix_timestamp;
        let asset = &mut ctx.accounts.asset_token;
        asset.authority = ctx.accounts.authority.key();
        asset.mint = ctx.accounts.mint.key();
        asset.name = name;
        asset.symbol = symbol;
        asset.category = category;
        asset.description = description;
        asset.uri = uri;
        asset.valuation = valuation;
        asset.total_shares = total_shares;
        asset.initial_share_price = share_price;
        asset.current_share_price = share_price;
        asset.is_verified = false;
        asset.verifier = None;
        asset.verified_at = 0;
        asset.is_tradable = false;
        asset.is_burned = false;
        asset.last_income_distribution = 0;
        asset.total_income_distributed = 0;
        asset.created_at = now;
        asset.updated_at = now;
        Ok(())
    }

    pub fn verify_asset(ctx: Context<VerifyAsset>) -> Result<()> {
        let asset = &mut ctx.accounts.asset_token;
        require!(!asset.is_burned, RealStackError::AssetBurned);
        let now = Clock::get()?.unix_timestamp;
        asset.is_verified = true;
        asset.verifier = Some(ctx.accounts.verifier.key());
        asset.verified_at = now;
        asset.updated_at = now;
        Ok(())
    }

    pub fn update_asset_valuation(
        ctx: Context<UpdateAssetToken>,
        valuation: u64,
        share_price: u64,
    ) -> Result<()> {
        require!(valuation > 0 && share_price > 0, RealStackError::InvalidParameters);
        let asset = &mut ctx.accounts.asset_token;
        require!(!asset.is_burned, RealStackError::AssetBurned);
        asset.valuation = valuation;
        asset.current_share_price = share_price;
        asset.updated_at = Clock::get()?.unix_timestamp;
        Ok(())
    }

    pub fn toggle_tradability(ctx: Context<UpdateAssetToken>, is_tradable: bool) -> Result<()> {
        let asset = &mut ctx.accounts.asset_token;
        require!(!asset.is_burned, RealStackError::AssetBurned);
        require!(asset.is_verified, RealStackError::AssetNotVerified);
        asset.is_tradable = is_tradable;
        asset.updated_at = Clock::get()?.unix_timestamp;
        Ok(())
    }

    pub fn burn_asset_token(ctx: Context<UpdateAssetToken>) -> Result<()> {
        let asset = &mut ctx.accounts.asset_token;
        require!(!asset.is_burned, RealStackError::AssetBurned);
        asset.is_burned = true;
        asset.is_tradable = false;
        asset.updated_at = Clock::get()?.unix_timestamp;
        Ok(())
    }

    pub fn distribute_income(ctx: Context<UpdateAssetToken>, amount: u64) -> Result<()> {
        require!(amount > 0, RealStackError::InvalidParameters);
        let asset = &mut ctx.accounts.asset_token;
        require!(!asset.is_burned, RealStackError::AssetBurned);
        let now = Clock::get()?.unix_timestamp;
        asset.total_income_distributed = asset
            .total_income_distributed
            .checked_add(amount)
            .ok_or(RealStackError::MathOverflow)?;
        asset.last_income_distribution = now;
        asset.updated_at = now;
        msg!(
            "Income distributed: {} (total {})",
            amount,
            asset.total_income_distributed
        );
        Ok(())
    }
}

#[derive(Accounts)]
pub struct CreateAssetToken<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,
    #[account(init, payer = authority, space = AssetToken::LEN)]
    pub asset_token: Account<'info, AssetToken>,
    pub mint: Account<'info, Mint>,
    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct VerifyAsset<'info> {
    #[account(mut)]
    pub verifier: Signer<'info>,
    #[account(mut)]
    pub asset_token: Account<'info, AssetToken>,
}

#[derive(Accounts)]
pub struct UpdateAssetToken<'info> {
    #[account(constraint = asset_token.authority == authority.key() @ RealStackError::Unauthorized)]
    pub authority: Signer<'info>,
    #[account(mut)]
    pub asset_token: Account<'info, AssetToken>,
}

#[account]
pub struct AssetToken {
    pub authority: Pubkey,
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub category: String,
    pub description: String,
    pub uri: String,
    pub valuation: u64,
    pub total_shares: u64,
    pub initial_share_price: u64,
    pub current_share_price: u64,
    pub is_verified: bool,
    pub verifier: Option<Pubkey>,
    pub verified_at: i64,
    pub is_tradable: bool,
    pub is_burned: bool,
    pub last_income_distribution: i64,
    pub total_income_distributed: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AssetToken {
    // Strings carry a 4-byte length prefix.
    pub const LEN: usize = 8
        + 32
        + 32
        + (4 + MAX_NAME)
        + (4 + MAX_SYMBOL)
        + (4 + MAX_CATEGORY)
        + (4 + MAX_DESCRIPTION)
        + (4 + MAX_URI)
        + 8 * 4
        + 1
        + (1 + 32)
        + 8
        + 1
        + 1
        + 8 * 2
        + 8 * 2;
}

#[error_code]
pub enum RealStackError {
    #[msg("Invalid parameters")]
    InvalidParameters,
    #[msg("Caller is not the asset authority")]
    Unauthorized,
    #[msg("Asset is not verified")]
    AssetNotVerified,
    #[msg("Asset token is burned")]
    AssetBurned,
    #[msg("Math overflow")]
    MathOverflow,
}
