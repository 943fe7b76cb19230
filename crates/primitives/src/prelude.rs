pub use crate::{
    block::{Body, GlobalVariables, Header, L2Block},
    buf::Buf32,
    circuits::Proof,
    tree::{AppendOnlyTreeSnapshot, MerkleTreeId, PartialStateReference, StateReference},
    tx::{ProcessedTx, TxEffect},
};
