use anyhow::ensure;
use borsh::BorshSerialize;
use rollup_primitives::circuits::Proof;

/// Produces the native proof of a circuit's public outputs.
pub fn make_proof<T: BorshSerialize>(output: &T) -> anyhow::Result<Proof> {
    Ok(Proof::new(borsh::to_vec(output)?))
}

/// Checks that a native proof commits to the given public outputs.
pub fn verify_proof<T: BorshSerialize>(proof: &Proof, output: &T) -> anyhow::Result<()> {
    let expected = borsh::to_vec(output)?;
    ensure!(
        proof.as_bytes() == expected.as_slice(),
        "proof does not commit to the claimed public outputs"
    );
    Ok(())
}
