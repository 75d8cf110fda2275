//! Sample payload generation for the demo.
//!
//! Payloads look like what the codec is meant for: short JSON-ish records
//! with IDs, names, ages and booleans, plus the occasional odd byte so the
//! single-byte fallback gets exercised too.
//!
//! Generation is seeded with ChaCha8, so the same seed always produces the
//! same payloads.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const NAMES: &[&str] = &["sensor", "relay", "pump", "gate", "node", "probe"];

/// Generate `count` sample payloads.
pub fn generate_payloads(seed: u64, count: usize) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| generate_payload(&mut rng)).collect()
}

fn generate_payload(rng: &mut ChaCha8Rng) -> String {
    let kind: u8 = rng.gen_range(0..10);

    match kind {
        // 60% full records
        0..=5 => {
            let name = NAMES[rng.gen_range(0..NAMES.len())];
            format!(
                "{{\"id\":{},\"name\":\"{}-{}\",\"age\":{},\"on\":{}}}",
                rng.gen_range(1..10_000),
                name,
                rng.gen_range(0..100),
                rng.gen_range(0..120),
                rng.gen_bool(0.5),
            )
        }

        // 30% flag lists
        6..=8 => {
            let flags: Vec<&str> = (0..rng.gen_range(1..6))
                .map(|_| if rng.gen_bool(0.5) { "true" } else { "false" })
                .collect();
            flags.join(",\\n")
        }

        // 10% free text with non-ASCII
        _ => {
            let len = rng.gen_range(1..24);
            (0..len)
                .map(|_| {
                    if rng.gen_bool(0.1) {
                        'µ'
                    } else {
                        rng.gen_range(b' '..=b'~') as char
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count() {
        assert_eq!(generate_payloads(42, 0).len(), 0);
        assert_eq!(generate_payloads(42, 50).len(), 50);
    }

    #[test]
    fn test_determinism() {
        assert_eq!(generate_payloads(12345, 20), generate_payloads(12345, 20));
    }

    #[test]
    fn test_different_seeds() {
        assert_ne!(generate_payloads(1, 20), generate_payloads(2, 20));
    }

    #[test]
    fn test_payloads_not_empty() {
        assert!(generate_payloads(7, 100).iter().all(|p| !p.is_empty()));
    }
}
