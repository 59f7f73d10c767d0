use crate::error::NormalizeError;

/// Lowest score that still lets a player declare riichi.
const RIICHI_STAKE: i64 = 1000;
const UNIT: i64 = 100;
// Real records settle within a few hundred rounds; some totals just above 4000 cycle forever.
const MAX_ROUNDS: usize = 10_000;

/// Re-express one score snapshot against the canonical baseline.
///
/// Every score is lowered by `baseline_delta`, then points are moved from players at or above
/// 1000 to the ones below it until nobody is short of a riichi stake. The total after the
/// shift, non-negativity and 100-point granularity are all preserved.
pub fn normalize(scores: &mut [i64; 4], baseline_delta: i64) -> Result<(), NormalizeError> {
    if let Some(&value) = scores.iter().find(|s| *s % UNIT != 0) {
        return Err(NormalizeError::NotMultipleOf100 { value });
    }

    let mut shifted = *scores;
    for s in shifted.iter_mut() {
        *s = s
            .checked_sub(baseline_delta)
            .ok_or(NormalizeError::OutOfRange { value: *s })?;
    }
    *scores = shifted;

    let total = checked_total(scores)?;
    if total < RIICHI_STAKE * 4 {
        return Err(NormalizeError::InsufficientTotal { total });
    }

    let mut rounds = 0usize;
    loop {
        let short = scores.iter().filter(|s| **s < RIICHI_STAKE).count();
        let (take, give) = match short {
            0 => break,
            1 => (100, 300),
            2 => (100, 100),
            3 => (300, 100),
            // unreachable while the total is at least 4000
            _ => return Err(NormalizeError::InsufficientTotal { total }),
        };
        if rounds == MAX_ROUNDS {
            return Err(NormalizeError::DidNotSettle {
                rounds,
                scores: *scores,
            });
        }
        for s in scores.iter_mut() {
            if *s < RIICHI_STAKE {
                *s += give;
            } else {
                *s -= take;
            }
        }
        rounds += 1;
    }

    check_postconditions(scores, total)
}

fn checked_total(scores: &[i64; 4]) -> Result<i64, NormalizeError> {
    scores.iter().try_fold(0i64, |acc, s| {
        acc.checked_add(*s)
            .ok_or(NormalizeError::OutOfRange { value: *s })
    })
}

fn check_postconditions(scores: &[i64; 4], total: i64) -> Result<(), NormalizeError> {
    let after = checked_total(scores)?;
    if after != total {
        return Err(NormalizeError::Postcondition(format!(
            "total changed from {total} to {after}"
        )));
    }
    if let Some(s) = scores.iter().find(|s| **s < 0) {
        return Err(NormalizeError::Postcondition(format!("negative score {s}")));
    }
    if let Some(s) = scores.iter().find(|s| **s % UNIT != 0) {
        return Err(NormalizeError::Postcondition(format!(
            "score {s} is not a multiple of 100"
        )));
    }
    Ok(())
}
