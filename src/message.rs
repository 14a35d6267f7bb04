//! Vault transaction message format
//!
//! `vault_transaction_create` does not take a regular Solana message: the
//! program expects its own compact layout with `u8`/`u16` length prefixes.
//! [`TransactionMessage::try_compile`] builds it from plain instructions with
//! the vault as payer.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, CompileError},
    pubkey::Pubkey,
};

macro_rules! small_vec {
    ($name:ident, $len:ty) => {
        /// Vec with a compact length prefix for Borsh serialization
        #[derive(Clone, Debug, PartialEq, Eq, Default)]
        pub struct $name<T>(Vec<T>);

        impl<T> $name<T> {
            pub fn as_slice(&self) -> &[T] {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn into_inner(self) -> Vec<T> {
                self.0
            }
        }

        impl<T> From<Vec<T>> for $name<T> {
            fn from(vec: Vec<T>) -> Self {
                $name(vec)
            }
        }

        impl<T: BorshSerialize> BorshSerialize for $name<T> {
            fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
                let len = <$len>::try_from(self.0.len()).map_err(|_| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "too many elements")
                })?;
                len.serialize(writer)?;
                for item in &self.0 {
                    item.serialize(writer)?;
                }
                Ok(())
            }
        }

        impl<T: BorshDeserialize> BorshDeserialize for $name<T> {
            fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
                let len = <$len>::deserialize_reader(reader)? as usize;
                let mut vec = Vec::with_capacity(len);
                for _ in 0..len {
                    vec.push(T::deserialize_reader(reader)?);
                }
                Ok($name(vec))
            }
        }
    };
}

small_vec!(SmallVecU8, u8);
small_vec!(SmallVecU16, u16);

/// Transaction message format used by Squads v4
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionMessage {
    /// The number of signer pubkeys in the account_keys vec
    pub num_signers: u8,
    /// The number of writable signer pubkeys in the account_keys vec
    pub num_writable_signers: u8,
    /// The number of writable non-signer pubkeys in the account_keys vec
    pub num_writable_non_signers: u8,
    /// Unique account keys, program ids included
    pub account_keys: SmallVecU8<Pubkey>,
    pub instructions: SmallVecU8<CompiledInstruction>,
    pub address_table_lookups: SmallVecU8<MessageAddressTableLookup>,
}

/// Compiled instruction format for Squads messages
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indexes: SmallVecU8<u8>,
    /// u16 length prefix, instruction data may exceed 255 bytes
    pub data: SmallVecU16<u8>,
}

/// Address table lookup (for versioned transactions with lookup tables)
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MessageAddressTableLookup {
    pub account_key: Pubkey,
    pub writable_indexes: SmallVecU8<u8>,
    pub readonly_indexes: SmallVecU8<u8>,
}

impl TransactionMessage {
    /// Compile instructions into a message the vault will sign for
    ///
    /// Goes through Solana's v0 compiler (the blockhash is irrelevant, the
    /// program substitutes its own) and converts the result.
    pub fn try_compile(
        vault_key: &Pubkey,
        instructions: &[Instruction],
    ) -> Result<Self, CompileError> {
        let v0_message = v0::Message::try_compile(vault_key, instructions, &[], Hash::default())?;

        let header = v0_message.header;
        let num_static_keys: u8 = v0_message
            .account_keys
            .len()
            .try_into()
            .map_err(|_| CompileError::AccountIndexOverflow)?;

        Ok(TransactionMessage {
            num_signers: header.num_required_signatures,
            num_writable_signers: header
                .num_required_signatures
                .saturating_sub(header.num_readonly_signed_accounts),
            num_writable_non_signers: num_static_keys
                .saturating_sub(header.num_required_signatures)
                .saturating_sub(header.num_readonly_unsigned_accounts),
            account_keys: v0_message.account_keys.into(),
            instructions: v0_message
                .instructions
                .into_iter()
                .map(|ix| CompiledInstruction {
                    program_id_index: ix.program_id_index,
                    account_indexes: ix.accounts.into(),
                    data: ix.data.into(),
                })
                .collect::<Vec<_>>()
                .into(),
            address_table_lookups: Vec::new().into(),
        })
    }

    /// Serialized form passed as `transaction_message` to the program
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::AccountMeta;

    #[test]
    fn test_transfer_compilation() {
        let vault = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let transfer_ix = solana_system_interface::instruction::transfer(&vault, &destination, 1000);

        let message = TransactionMessage::try_compile(&vault, &[transfer_ix]).unwrap();

        assert_eq!(message.num_signers, 1);
        assert_eq!(message.num_writable_signers, 1);
        // destination is writable, the system program is not
        assert_eq!(message.num_writable_non_signers, 1);
        assert_eq!(message.account_keys.as_slice()[0], vault);
        assert_eq!(message.instructions.len(), 1);
        assert!(message.address_table_lookups.is_empty());
    }

    #[test]
    fn test_serialized_prefixes() {
        let vault = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let ix = Instruction {
            program_id: program,
            accounts: vec![AccountMeta::new_readonly(vault, true)],
            data: vec![7; 300],
        };

        let message = TransactionMessage::try_compile(&vault, &[ix]).unwrap();
        let bytes = message.to_bytes().unwrap();

        // 3 header bytes, then a one-byte key count
        assert_eq!(bytes[3], 2);
        let decoded = TransactionMessage::try_from_slice(&bytes).unwrap();
        assert_eq!(decoded.instructions.as_slice()[0].data.len(), 300);
    }
}
