//! Coordinate chain parameter definitions.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Network {
    Mainnet,
    Testnet4,
    Regtest,
}

#[derive(Clone, Debug)]
pub struct ChainParams {
    pub network: Network,
    pub magic: u32,
    pub pubkey_hash_prefix: u8,
    pub script_hash_prefix: u8,
    pub bech32_hrp: &'static str,
}

static MAINNET: ChainParams = ChainParams {
    network: Network::Mainnet,
    magic: 0xd8b8_bff8,
    pubkey_hash_prefix: 0,
    script_hash_prefix: 5,
    bech32_hrp: "cc",
};

static TESTNET4: ChainParams = ChainParams {
    network: Network::Testnet4,
    magic: 0x283f_161f,
    pubkey_hash_prefix: 111,
    script_hash_prefix: 196,
    bech32_hrp: "tc",
};

static REGTEST: ChainParams = ChainParams {
    network: Network::Regtest,
    magic: 0xdab5_bffa,
    pubkey_hash_prefix: 111,
    script_hash_prefix: 196,
    bech32_hrp: "ccrt",
};

pub fn chain_params(network: Network) -> &'static ChainParams {
    match network {
        Network::Mainnet => &MAINNET,
        Network::Testnet4 => &TESTNET4,
        Network::Regtest => &REGTEST,
    }
}
