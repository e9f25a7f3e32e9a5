use rand::{rngs::SmallRng, SeedableRng};

/// Stream reserved for drawing resampled arm sets.
pub const ARM_SET_STREAM: u64 = 0;

/// Stream of the trial RNG of the policy called `name`.
///
/// Depends on the name alone: adding, removing or renaming other policies
/// leaves the draws of this one unchanged.
pub fn policy_stream(name: &str) -> u64 {
    let stream = name
        .bytes()
        .fold(mix(name.len() as u64), |stream, byte| mix(stream ^ u64::from(byte)));
    if stream == ARM_SET_STREAM {
        ARM_SET_STREAM + 1
    } else {
        stream
    }
}

// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of one (stream, cycle) pair, independent of the order work units run in.
pub fn derive_seed(base: u64, stream: u64, cycle: u64) -> u64 {
    mix(mix(base ^ mix(stream)) ^ cycle)
}

pub fn cycle_rng(base: u64, stream: u64, cycle: u64) -> SmallRng {
    SmallRng::seed_from_u64(derive_seed(base, stream, cycle))
}

/// Uses the configured seed, or draws one from the OS so the run can be replayed.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}
