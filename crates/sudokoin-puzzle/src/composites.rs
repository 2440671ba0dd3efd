//! Composite number sequence used to size puzzle boards.
//!
//! Board sizes are drawn from the composites (4, 6, 8, 9, 10, 12, …) because
//! a prime n admits only the degenerate 1×n box shape. The sieve is computed
//! once and shared.

use once_cell::sync::Lazy;

/// Upper bound of the sieve. Large enough for any difficulty a network will
/// realistically reach.
const SIEVE_LIMIT: usize = 100_000;

static COMPOSITES: Lazy<Vec<usize>> = Lazy::new(|| {
    let mut is_prime = vec![true; SIEVE_LIMIT];
    let mut i = 2;
    while i * i < SIEVE_LIMIT {
        if is_prime[i] {
            let mut j = i * i;
            while j < SIEVE_LIMIT {
                is_prime[j] = false;
                j += i;
            }
        }
        i += 1;
    }
    (4..SIEVE_LIMIT).filter(|&v| !is_prime[v]).collect()
});

/// The n-th composite number, 1-indexed: `nth_composite(1) == 4`.
///
/// # Panics
///
/// Panics if `n` is zero or beyond the sieve. Callers clamp to `n >= 1`, and
/// the sieve covers far more board sizes than any chain will reach.
pub fn nth_composite(n: usize) -> usize {
    COMPOSITES[n - 1]
}

/// Number of composites available below the sieve limit.
pub fn composite_count() -> usize {
    COMPOSITES.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_composites() {
        let expected = [4, 6, 8, 9, 10, 12, 14, 15, 16, 18];
        for (i, &want) in expected.iter().enumerate() {
            assert_eq!(nth_composite(i + 1), want);
        }
    }

    #[test]
    fn sequence_is_strictly_increasing() {
        for n in 1..composite_count() {
            assert!(nth_composite(n) < nth_composite(n + 1));
        }
    }

    #[test]
    fn no_primes_in_sequence() {
        fn is_prime(v: usize) -> bool {
            (2..v).take_while(|d| d * d <= v).all(|d| v % d != 0)
        }
        for n in 1..100 {
            assert!(!is_prime(nth_composite(n)), "{} is prime", nth_composite(n));
        }
    }
}
