//! Entity pools: the bounded sets of services, hosts, and environments every
//! generator draws from. Keeping cardinality fixed per run is what makes the
//! output look like one deployment rather than random noise.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::config::GenerationConfig;

#[derive(Debug, Clone)]
pub struct EntityPools {
    pub services: Vec<String>,
    pub hosts: Vec<String>,
    pub environments: Vec<String>,
}

impl EntityPools {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            services: config.services.clone(),
            hosts: config.hosts.clone(),
            environments: config.environments.clone(),
        }
    }

    pub fn service(&self, rng: &mut StdRng) -> &str {
        pick(&self.services, rng)
    }

    pub fn host(&self, rng: &mut StdRng) -> &str {
        pick(&self.hosts, rng)
    }

    pub fn environment(&self, rng: &mut StdRng) -> &str {
        pick(&self.environments, rng)
    }

    /// Synthesized semver-ish version tag, e.g. `v2.7.1`.
    pub fn version_tag(rng: &mut StdRng) -> String {
        format!(
            "v{}.{}.{}",
            rng.random_range(1..=3),
            rng.random_range(0..=9),
            rng.random_range(0..=9)
        )
    }
}

fn pick<'a>(pool: &'a [String], rng: &mut StdRng) -> &'a str {
    // Pools are validated non-empty at config time.
    pool.choose(rng).map(String::as_str).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_pools_draw_from_config() {
        let config = GenerationConfig::default();
        let pools = EntityPools::from_config(&config);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..50 {
            assert!(config.services.iter().any(|s| s == pools.service(&mut rng)));
            assert!(config.hosts.iter().any(|h| h == pools.host(&mut rng)));
            assert!(
                config
                    .environments
                    .iter()
                    .any(|e| e == pools.environment(&mut rng))
            );
        }
    }

    #[test]
    fn test_version_tag_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let tag = EntityPools::version_tag(&mut rng);
        assert!(tag.starts_with('v'));
        assert_eq!(tag.matches('.').count(), 2);
    }
}
