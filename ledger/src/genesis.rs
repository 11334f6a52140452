//! Development genesis: a deterministic key and the open block that mints
//! the entire supply to it.

use lattice_types::{Account, Block, BlockHash, KeyPair, ProtocolParams, Signature};

/// Fixed seed for the development genesis key. Never use outside tests and
/// local networks.
pub const DEV_GENESIS_SEED: [u8; 32] = [0xde; 32];

pub fn dev_genesis_key() -> KeyPair {
    KeyPair::from_seed(DEV_GENESIS_SEED)
}

/// Build the development genesis block for the given parameters. The block
/// self-references as representative and carries the full supply.
pub fn dev_genesis_block(params: &ProtocolParams) -> Block {
    let pair = dev_genesis_key();
    let account = Account::from(pair.public);
    let mut block = Block {
        account,
        previous: BlockHash::ZERO,
        representative: account,
        balance: params.genesis_supply,
        link: BlockHash::ZERO,
        work: 0,
        signature: Signature::ZERO,
    };
    block.work = lattice_types::generate_work(&block.root(), params.work_threshold);
    block.sign(&pair);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::work_valid;

    #[test]
    fn genesis_is_self_signed_open() {
        let params = ProtocolParams::dev_defaults();
        let block = dev_genesis_block(&params);
        assert!(block.is_open());
        assert_eq!(block.balance, params.genesis_supply);
        assert_eq!(block.representative, block.account);
        assert!(block.verify_signature(&block.account));
        assert!(work_valid(&block.root(), block.work, params.work_threshold));
    }

    #[test]
    fn genesis_is_deterministic() {
        let params = ProtocolParams::dev_defaults();
        assert_eq!(
            dev_genesis_block(&params).hash(),
            dev_genesis_block(&params).hash()
        );
    }
}
