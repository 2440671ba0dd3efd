//! Protocol constants. All monetary values in grains (1 SDK = 10^7 grains).

pub const COIN: u64 = 10_000_000;

/// Base reward minted by each block's coinbase, before fees.
pub const DEFAULT_MINING_REWARD: u64 = 15 * COIN;
/// How many mempool transactions a candidate block may carry.
pub const DEFAULT_TXS_PER_BLOCK: usize = 10;
/// Starting puzzle difficulty; bumped by one per accepted block.
pub const DEFAULT_DIFFICULTY: u64 = 1;

/// Sentinel `prev_tx_hash` of a block's reward-minting input.
pub const COINBASE_MARKER: &str = "COINBASE";

/// Raw ECDSA signature length (r ‖ s, 32 bytes each).
pub const SIGNATURE_LEN: usize = 64;
/// SEC1 uncompressed public key length (0x04 ‖ X ‖ Y).
pub const PUBKEY_ENCODED_LEN: usize = 65;

/// Version bytes prepended to the address payload before Base58 encoding.
pub const ADDRESS_VERSION: [u8; 2] = [0x02, 0xe4];
/// Byte prefixed to the RIPEMD digest in the checksum preimage. Not one of
/// the version bytes; changing it invalidates every existing address.
pub const ADDRESS_CHECKSUM_SALT: u8 = 0x69;
/// Checksum bytes appended to the address payload.
pub const ADDRESS_CHECKSUM_LEN: usize = 4;

pub const DEFAULT_HTTP_PORT: u16 = 18733;
