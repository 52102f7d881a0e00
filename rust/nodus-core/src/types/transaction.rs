// Transaction - Transactions signées avec frais système et réseau
use super::primitives::{hash256, FeeTotal, Gas, UInt160, UInt256};
use super::witness::Witness;
use crate::wire::{
    sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, Memo, SerializableWire,
};

/// Maximum number of signers (and witnesses) per transaction
pub const MAX_TRANSACTION_SIGNERS: usize = 16;

/// Maximum script length
pub const MAX_SCRIPT_SIZE: usize = 65_535;

/// Scope in which a signer's witness is valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WitnessScope {
    None,
    CalledByEntry,
    CustomContracts,
    CustomGroups,
    Global,
}

impl WitnessScope {
    pub fn as_byte(self) -> u8 {
        match self {
            WitnessScope::None => 0x00,
            WitnessScope::CalledByEntry => 0x01,
            WitnessScope::CustomContracts => 0x10,
            WitnessScope::CustomGroups => 0x20,
            WitnessScope::Global => 0x80,
        }
    }
}

impl TryFrom<u8> for WitnessScope {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(WitnessScope::None),
            0x01 => Ok(WitnessScope::CalledByEntry),
            0x10 => Ok(WitnessScope::CustomContracts),
            0x20 => Ok(WitnessScope::CustomGroups),
            0x80 => Ok(WitnessScope::Global),
            other => Err(FormatError::InvalidValue(format!("witness scope {:#04x}", other))),
        }
    }
}

/// Account authorizing a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signer {
    pub account: UInt160,
    pub scopes: WitnessScope,
}

impl Signer {
    pub fn new(account: UInt160, scopes: WitnessScope) -> Self {
        Self { account, scopes }
    }

    /// Signer valid for the entry script only
    pub fn called_by_entry(account: UInt160) -> Self {
        Self::new(account, WitnessScope::CalledByEntry)
    }

    const SIZE: usize = sizes::SIZE_OF_UINT160 + sizes::SIZE_OF_U8;
}

/// Transaction
///
/// Immutable once built: hash and size are derived lazily from the fields and cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    version: u8,
    nonce: u32,
    system_fee: Gas,
    network_fee: Gas,
    valid_until_block: u32,
    signers: Vec<Signer>,
    script: Vec<u8>,
    witnesses: Vec<Witness>,
    hash: Memo<UInt256>,
    size: Memo<usize>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nonce: u32,
        system_fee: Gas,
        network_fee: Gas,
        valid_until_block: u32,
        signers: Vec<Signer>,
        script: Vec<u8>,
        witnesses: Vec<Witness>,
    ) -> Self {
        Self {
            version: 0,
            nonce,
            system_fee,
            network_fee,
            valid_until_block,
            signers,
            script,
            witnesses,
            hash: Memo::new(),
            size: Memo::new(),
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn system_fee(&self) -> Gas {
        self.system_fee
    }

    pub fn network_fee(&self) -> Gas {
        self.network_fee
    }

    /// System fee plus network fee, exact for any pair of decoded fees
    pub fn total_fee(&self) -> FeeTotal {
        FeeTotal::from(self.system_fee) + FeeTotal::from(self.network_fee)
    }

    pub fn valid_until_block(&self) -> u32 {
        self.valid_until_block
    }

    pub fn signers(&self) -> &[Signer] {
        &self.signers
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    /// Émetteur: the first signer pays the fees
    pub fn sender(&self) -> Option<UInt160> {
        self.signers.first().map(|signer| signer.account)
    }

    /// Hash of the unsigned part (double SHA-256)
    pub fn hash(&self) -> UInt256 {
        *self.hash.get_or_init(|| {
            let mut writer = BinaryWriter::with_capacity(self.unsigned_size());
            self.serialize_unsigned(&mut writer);
            hash256(&writer.into_bytes())
        })
    }

    fn serialize_unsigned(&self, writer: &mut BinaryWriter) {
        writer
            .write_u8(self.version)
            .write_u32_le(self.nonce)
            .write_i64_le(self.system_fee)
            .write_i64_le(self.network_fee)
            .write_u32_le(self.valid_until_block)
            .write_array(&self.signers, |w, signer| {
                w.write_uint160(&signer.account).write_u8(signer.scopes.as_byte());
            })
            .write_var_bytes(&self.script);
    }

    fn unsigned_size(&self) -> usize {
        sizes::SIZE_OF_U8
            + sizes::SIZE_OF_U32
            + sizes::SIZE_OF_I64
            + sizes::SIZE_OF_I64
            + sizes::SIZE_OF_U32
            + sizes::array(self.signers.len(), self.signers.len() * Signer::SIZE)
            + sizes::var_bytes(self.script.len())
    }
}

impl SerializableWire for Transaction {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        self.serialize_unsigned(writer);
        writer.write_array(&self.witnesses, |w, witness| witness.serialize_wire_base(w));
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let version = reader.read_u8()?;
        if version > 0 {
            return Err(FormatError::InvalidValue(format!("transaction version {}", version)));
        }
        let nonce = reader.read_u32_le()?;
        let system_fee = reader.read_i64_le()?;
        if system_fee < 0 {
            return Err(FormatError::InvalidValue(format!("negative system fee {}", system_fee)));
        }
        let network_fee = reader.read_i64_le()?;
        if network_fee < 0 {
            return Err(FormatError::InvalidValue(format!("negative network fee {}", network_fee)));
        }
        let valid_until_block = reader.read_u32_le()?;
        let signers = reader.read_array(MAX_TRANSACTION_SIGNERS, |r| {
            let account = r.read_uint160()?;
            let scopes = WitnessScope::try_from(r.read_u8()?)?;
            Ok(Signer { account, scopes })
        })?;
        let script = reader.read_var_bytes(MAX_SCRIPT_SIZE)?.to_vec();
        if script.is_empty() {
            return Err(FormatError::InvalidValue("empty transaction script".to_string()));
        }
        let witnesses =
            reader.read_array(MAX_TRANSACTION_SIGNERS, |r| Witness::deserialize_wire_base(r, context))?;

        Ok(Self {
            version,
            nonce,
            system_fee,
            network_fee,
            valid_until_block,
            signers,
            script,
            witnesses,
            hash: Memo::new(),
            size: Memo::new(),
        })
    }

    fn size(&self) -> usize {
        *self.size.get_or_init(|| {
            self.unsigned_size()
                + sizes::array(
                    self.witnesses.len(),
                    self.witnesses.iter().map(Witness::size).sum(),
                )
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Transaction from `sender` paying the given fees
    pub(crate) fn transaction_from(sender: UInt160, nonce: u32, system_fee: Gas, network_fee: Gas) -> Transaction {
        Transaction::new(
            nonce,
            system_fee,
            network_fee,
            100,
            vec![Signer::called_by_entry(sender)],
            vec![0x11, 0x40],
            vec![Witness::new(vec![0x0c; 64], vec![0x41; 35])],
        )
    }

    fn ctx() -> DeserializeWireContext {
        DeserializeWireContext::new(0x4e454f)
    }

    #[test]
    fn test_transaction_wire_roundtrip() {
        let tx = transaction_from(UInt160::from_bytes([7; 20]), 42, 30, 10);
        let bytes = tx.serialize_wire();
        assert_eq!(bytes.len(), tx.size());

        let decoded = Transaction::deserialize_wire(&bytes, &ctx()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash(), tx.hash());
    }

    #[test]
    fn test_hash_ignores_witnesses() {
        let sender = UInt160::from_bytes([1; 20]);
        let a = transaction_from(sender, 1, 5, 5);
        let b = Transaction::new(1, 5, 5, 100, vec![Signer::called_by_entry(sender)], vec![0x11, 0x40], vec![]);
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.size(), b.size());
    }

    #[test]
    fn test_sender_is_first_signer() {
        let first = UInt160::from_bytes([1; 20]);
        let second = UInt160::from_bytes([2; 20]);
        let tx = Transaction::new(
            0,
            0,
            0,
            0,
            vec![Signer::called_by_entry(first), Signer::new(second, WitnessScope::Global)],
            vec![0x40],
            vec![],
        );
        assert_eq!(tx.sender(), Some(first));

        let unsigned = Transaction::new(0, 0, 0, 0, vec![], vec![0x40], vec![]);
        assert_eq!(unsigned.sender(), None);
    }

    #[test]
    fn test_negative_fee_rejected() {
        let tx = transaction_from(UInt160::ZERO, 0, 0, 0);
        let mut bytes = tx.serialize_wire();
        // system_fee starts after version (1) + nonce (4)
        bytes[5..13].copy_from_slice(&(-1i64).to_le_bytes());
        assert!(matches!(
            Transaction::deserialize_wire(&bytes, &ctx()),
            Err(FormatError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_unknown_witness_scope_rejected() {
        let tx = transaction_from(UInt160::ZERO, 0, 0, 0);
        let mut bytes = tx.serialize_wire();
        // scopes byte follows: header (25) + signer count (1) + account (20)
        bytes[46] = 0x03;
        assert!(Transaction::deserialize_wire(&bytes, &ctx()).is_err());
    }

    fn signer_strategy() -> impl Strategy<Value = Signer> {
        (any::<[u8; 20]>(), prop_oneof![Just(WitnessScope::None), Just(WitnessScope::CalledByEntry)])
            .prop_map(|(account, scopes)| Signer::new(UInt160::from_bytes(account), scopes))
    }

    proptest! {
        #[test]
        fn prop_transaction_wire_round_trip(
            nonce in any::<u32>(),
            system_fee in 0..i64::MAX,
            network_fee in 0..i64::MAX,
            valid_until_block in any::<u32>(),
            signers in prop::collection::vec(signer_strategy(), 0..=MAX_TRANSACTION_SIGNERS),
            script in prop::collection::vec(any::<u8>(), 1..300),
        ) {
            let tx = Transaction::new(nonce, system_fee, network_fee, valid_until_block, signers, script, vec![]);
            let bytes = tx.serialize_wire();
            prop_assert_eq!(bytes.len(), tx.size());

            let decoded = Transaction::deserialize_wire(&bytes, &ctx()).unwrap();
            prop_assert_eq!(decoded.hash(), tx.hash());
            prop_assert_eq!(decoded, tx);
        }
    }
}
