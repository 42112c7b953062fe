use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Creates a random number generator for a specific entity. The hash parameter
/// should uniquely identify the entity, so that runs are reproducible for a
/// given base seed regardless of how many other generators were created before.
pub fn get_rnd<H: Hash>(base_seed: u64, hash: H) -> SmallRng {
    let mut hasher = DefaultHasher::new();
    hash.hash(&mut hasher);
    base_seed.hash(&mut hasher);
    SmallRng::seed_from_u64(hasher.finish())
}
