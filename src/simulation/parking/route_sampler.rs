use nohash_hasher::IntMap;
use rand::Rng;
use rand::rngs::SmallRng;
use thiserror::Error;

use crate::simulation::config::SamplingWeights;
use crate::simulation::id::Id;
use crate::simulation::network::Link;
use crate::simulation::random;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("link {link} has no outgoing links to sample a next hop from")]
    NoOutgoingLinks { link: String },
}

/// Picks the next link for a cruising vehicle by weighted random sampling.
/// Candidates with free parking supply are strongly preferred, recently visited
/// dead ends are discouraged but never excluded.
#[derive(Debug)]
pub struct RouteSampler {
    rng: SmallRng,
    weights: SamplingWeights,
}

impl RouteSampler {
    pub fn new(seed: u64, weights: SamplingWeights) -> Self {
        RouteSampler {
            rng: random::get_rnd(seed, "route-sampler"),
            weights,
        }
    }

    pub fn sample(
        &mut self,
        from: &Id<Link>,
        candidates: &[Id<Link>],
        supply: &IntMap<Id<Link>, u32>,
        visited: &[Id<Link>],
    ) -> Result<Id<Link>, RoutingError> {
        if candidates.is_empty() {
            return Err(RoutingError::NoOutgoingLinks {
                link: from.external().to_string(),
            });
        }

        let mut cumulative = Vec::with_capacity(candidates.len());
        let mut total = 0u32;
        for candidate in candidates {
            let weight = if supply.get(candidate).copied().unwrap_or_default() > 0 {
                self.weights.available
            } else if visited.contains(candidate) {
                self.weights.visited
            } else {
                self.weights.unvisited
            };
            total += weight;
            cumulative.push(total);
        }

        let draw = self.rng.random_range(1..=total);
        Ok(candidates[select(&cumulative, draw)].clone())
    }
}

/// Inverse-CDF selection: the first candidate whose cumulative weight reaches
/// the draw. The upper edge is inclusive, so a draw equal to a candidate's
/// cumulative sum selects that candidate.
fn select(cumulative: &[u32], draw: u32) -> usize {
    cumulative.partition_point(|&sum| sum < draw)
}
