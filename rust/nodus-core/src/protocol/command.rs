// Command - Discriminants des messages du protocole
use crate::wire::FormatError;
use std::fmt;
use std::str::FromStr;

/// Width of the command field in the message envelope
pub const COMMAND_LENGTH: usize = 12;

/// Protocol command carried in every message envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Addr,
    Block,
    Consensus,
    FilterAdd,
    FilterClear,
    FilterLoad,
    GetAddr,
    GetBlocks,
    GetData,
    GetHeaders,
    Headers,
    Inv,
    Mempool,
    Transaction,
    Verack,
    Version,
    Alert,
    MerkleBlock,
    NotFound,
    Ping,
    Pong,
    Reject,
}

impl Command {
    pub const ALL: [Command; 22] = [
        Command::Addr,
        Command::Block,
        Command::Consensus,
        Command::FilterAdd,
        Command::FilterClear,
        Command::FilterLoad,
        Command::GetAddr,
        Command::GetBlocks,
        Command::GetData,
        Command::GetHeaders,
        Command::Headers,
        Command::Inv,
        Command::Mempool,
        Command::Transaction,
        Command::Verack,
        Command::Version,
        Command::Alert,
        Command::MerkleBlock,
        Command::NotFound,
        Command::Ping,
        Command::Pong,
        Command::Reject,
    ];

    /// Wire string of the command
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Addr => "addr",
            Command::Block => "block",
            Command::Consensus => "consensus",
            Command::FilterAdd => "filteradd",
            Command::FilterClear => "filterclear",
            Command::FilterLoad => "filterload",
            Command::GetAddr => "getaddr",
            Command::GetBlocks => "getblocks",
            Command::GetData => "getdata",
            Command::GetHeaders => "getheaders",
            Command::Headers => "headers",
            Command::Inv => "inv",
            Command::Mempool => "mempool",
            Command::Transaction => "tx",
            Command::Verack => "verack",
            Command::Version => "version",
            Command::Alert => "alert",
            Command::MerkleBlock => "merkleblock",
            Command::NotFound => "notfound",
            Command::Ping => "ping",
            Command::Pong => "pong",
            Command::Reject => "reject",
        }
    }

    /// Zero-padded envelope field
    pub fn to_fixed_bytes(self) -> [u8; COMMAND_LENGTH] {
        let mut bytes = [0u8; COMMAND_LENGTH];
        let name = self.as_str().as_bytes();
        bytes[..name.len()].copy_from_slice(name);
        bytes
    }
}

/// Valide une chaîne de commande reçue
pub fn assert_command(value: &str) -> Result<Command, FormatError> {
    Command::ALL
        .iter()
        .copied()
        .find(|command| command.as_str() == value)
        .ok_or_else(|| FormatError::InvalidCommand(value.to_string()))
}

impl FromStr for Command {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        assert_command(s)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
