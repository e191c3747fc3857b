// Anchor instruction data for the realstack program.
//
// Layout: 8-byte discriminator followed by Borsh-encoded arguments
// (strings are u32 LE length + UTF-8 bytes, integers are little-endian, bools are one byte).

use crate::crypto::hashing::anchor_discriminator;
use crate::infra::solana::AssetTokenRequest;

struct InstructionData(Vec<u8>);

impl InstructionData {
    fn new(name: &str) -> Self {
        Self(anchor_discriminator(name).to_vec())
    }

    fn string(mut self, value: &str) -> Self {
        self.0.extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.0.extend_from_slice(value.as_bytes());
        self
    }

    fn u64(mut self, value: u64) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn bool(mut self, value: bool) -> Self {
        self.0.push(value as u8);
        self
    }

    fn finish(self) -> Vec<u8> {
        self.0
    }
}

pub fn create_asset_token(request: &AssetTokenRequest) -> Vec<u8> {
    InstructionData::new("create_asset_token")
        .string(&request.name)
        .string(&request.symbol)
        .string(request.category.as_str())
        .string(&request.description)
        .string(&request.uri)
        .u64(request.valuation)
        .u64(request.total_shares)
        .u64(request.share_price)
        .finish()
}

pub fn verify_asset() -> Vec<u8> {
    InstructionData::new("verify_asset").finish()
}

pub fn update_asset_valuation(valuation: u64, share_price: u64) -> Vec<u8> {
    InstructionData::new("update_asset_valuation")
        .u64(valuation)
        .u64(share_price)
        .finish()
}

pub fn toggle_tradability(is_tradable: bool) -> Vec<u8> {
    InstructionData::new("toggle_tradability")
        .bool(is_tradable)
        .finish()
}

pub fn burn_asset_token() -> Vec<u8> {
    InstructionData::new("burn_asset_token").finish()
}

pub fn distribute_income(amount: u64) -> Vec<u8> {
    InstructionData::new("distribute_income").u64(amount).finish()
}
