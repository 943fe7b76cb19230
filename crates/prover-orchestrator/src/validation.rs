//! Structural checks on txs before they are admitted into a block.

use rollup_primitives::{params::*, tx::ProcessedTx};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TxValidationError {
    #[error("too many {kind} ({count} > {max})")]
    TooMany {
        kind: &'static str,
        count: usize,
        max: usize,
    },

    #[error("{kind} at position {index} is zero")]
    ZeroLeaf { kind: &'static str, index: usize },

    #[error("non-empty tx has no nullifiers")]
    MissingNullifier,

    #[error("empty tx carries side effects")]
    EmptyWithSideEffects,

    #[error("public kernel request {0} is for another tx")]
    ForeignKernelRequest(usize),

    #[error("padding tx submitted as a block tx")]
    PaddingTx,
}

/// Decides whether a tx may be admitted into a block.
pub trait TxValidator: Sync + Send + 'static {
    fn validate_tx(&self, tx: &ProcessedTx) -> Result<(), TxValidationError>;
}

/// Checks counts against the per-tx maxima and the shape of the side effects.
#[derive(Clone, Debug, Default)]
pub struct StructuralTxValidator;

impl TxValidator for StructuralTxValidator {
    fn validate_tx(&self, tx: &ProcessedTx) -> Result<(), TxValidationError> {
        check_count("note hashes", tx.note_hashes.len(), MAX_NOTE_HASHES_PER_TX)?;
        check_count("nullifiers", tx.nullifiers.len(), MAX_NULLIFIERS_PER_TX)?;
        check_count(
            "public data writes",
            tx.public_data_writes.len(),
            MAX_PUBLIC_DATA_WRITES_PER_TX,
        )?;
        check_count(
            "public kernel requests",
            tx.public_kernel_requests.len(),
            MAX_PUBLIC_KERNEL_REQUESTS_PER_TX,
        )?;

        if tx.is_empty {
            let has_effects = !tx.to_tx_effect().is_empty() || !tx.public_kernel_requests.is_empty();
            if has_effects {
                return Err(TxValidationError::EmptyWithSideEffects);
            }
            return Ok(());
        }

        // Every real tx spends at least its own tx nullifier.
        if tx.nullifiers.is_empty() {
            return Err(TxValidationError::MissingNullifier);
        }

        if let Some(index) = tx.note_hashes.iter().position(|h| h.is_zero()) {
            return Err(TxValidationError::ZeroLeaf {
                kind: "note hash",
                index,
            });
        }

        if let Some(index) = tx.nullifiers.iter().position(|n| n.is_zero()) {
            return Err(TxValidationError::ZeroLeaf {
                kind: "nullifier",
                index,
            });
        }

        if let Some(index) = tx
            .public_kernel_requests
            .iter()
            .position(|r| r.tx_hash != tx.hash)
        {
            return Err(TxValidationError::ForeignKernelRequest(index));
        }

        Ok(())
    }
}

fn check_count(kind: &'static str, count: usize, max: usize) -> Result<(), TxValidationError> {
    if count > max {
        return Err(TxValidationError::TooMany { kind, count, max });
    }
    Ok(())
}
