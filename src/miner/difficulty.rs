// src/miner/difficulty.rs
//! Difficulty ↔ target conversion
//!
//! A seal is valid when its result, read as a big-endian 256-bit integer, is
//! at most `2^256 / difficulty`.

use crate::types::{H256, U256};
use crate::utils::error::FrkhashError;

/// Computes `floor(2^256 / difficulty)`
///
/// Difficulty 1 saturates to `2^256 - 1`, which every result satisfies.
///
/// # Returns
/// * `Err(FrkhashError::InvalidDifficulty)` - if `difficulty` is zero
pub fn difficulty_to_target(difficulty: &U256) -> Result<U256, FrkhashError> {
    if difficulty.is_zero() {
        return Err(FrkhashError::InvalidDifficulty);
    }
    if *difficulty == U256::one() {
        return Ok(U256::MAX);
    }
    // 2^256 = MAX + 1, so the quotient gains one exactly when the
    // remainder of MAX wraps around to a full divisor
    let quotient = U256::MAX / *difficulty;
    let remainder = U256::MAX % *difficulty;
    if remainder == *difficulty - U256::one() {
        Ok(quotient + U256::one())
    } else {
        Ok(quotient)
    }
}

/// Checks a puzzle result against a target
pub fn result_meets_target(result: &H256, target: &U256) -> bool {
    U256::from_big_endian(result) <= *target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::hexutil::u256_be_bytes;

    #[test]
    fn zero_difficulty_is_rejected() {
        assert_eq!(
            difficulty_to_target(&U256::zero()).unwrap_err(),
            FrkhashError::InvalidDifficulty
        );
    }

    #[test]
    fn powers_of_two_divide_exactly() {
        assert_eq!(difficulty_to_target(&U256::from(2u64)).unwrap(), U256::one() << 255u64);
        assert_eq!(difficulty_to_target(&U256::from(256u64)).unwrap(), U256::one() << 248u64);
    }

    #[test]
    fn non_powers_round_down() {
        // 2^256 / 3 = 0x5555...5555
        let target = difficulty_to_target(&U256::from(3u64)).unwrap();
        assert_eq!(u256_be_bytes(&target), [0x55u8; 32]);
        let target = difficulty_to_target(&U256::from(100u64)).unwrap();
        assert_eq!(target, U256::MAX / U256::from(100u64));
    }

    #[test]
    fn target_is_inclusive() {
        let target = difficulty_to_target(&U256::from(2u64)).unwrap();
        let at = u256_be_bytes(&target);
        let above = u256_be_bytes(&(target + U256::one()));
        assert!(result_meets_target(&at, &target));
        assert!(!result_meets_target(&above, &target));
        assert!(result_meets_target(&[0xff; 32], &difficulty_to_target(&U256::one()).unwrap()));
    }
}
