use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Baseline;
use crate::error::ItemError;
use crate::normalizer;

/// Top-level key holding the hands of a converted log.
pub const HANDS_KEY: &str = "log";
/// Position of the score snapshot inside each hand entry.
const SCORES_INDEX: usize = 1;

pub type ScoreArray = [i64; 4];

/// A converted log. Only the hands and their score snapshots are typed; every other field,
/// including key order, is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredRecord {
    fields: Map<String, Value>,
}

impl StructuredRecord {
    pub fn parse(text: &str) -> Result<Self, ItemError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn hands(&self) -> Result<&Vec<Value>, ItemError> {
        match self.fields.get(HANDS_KEY) {
            Some(Value::Array(hands)) => Ok(hands),
            Some(_) => Err(ItemError::MalformedRecord(format!("'{HANDS_KEY}' is not an array"))),
            None => Err(ItemError::MalformedRecord(format!("missing '{HANDS_KEY}'"))),
        }
    }

    fn hands_mut(&mut self) -> Result<&mut Vec<Value>, ItemError> {
        match self.fields.get_mut(HANDS_KEY) {
            Some(Value::Array(hands)) => Ok(hands),
            Some(_) => Err(ItemError::MalformedRecord(format!("'{HANDS_KEY}' is not an array"))),
            None => Err(ItemError::MalformedRecord(format!("missing '{HANDS_KEY}'"))),
        }
    }

    /// Score snapshot of every hand, in order.
    pub fn scores(&self) -> Result<Vec<ScoreArray>, ItemError> {
        self.hands()?
            .iter()
            .enumerate()
            .map(|(i, hand)| read_scores(i, hand))
            .collect()
    }

    /// Rewrite every hand's scores against the canonical baseline. Returns the number of hands.
    ///
    /// Hands are checked before any of them is touched, but a normalization failure part way
    /// through leaves earlier hands rewritten.
    pub fn normalize_scores(&mut self, baseline: Baseline) -> Result<usize, ItemError> {
        let delta = baseline.delta();
        let snapshots = self.scores()?;
        let hands = self.hands_mut()?;

        for (i, (hand, mut scores)) in hands.iter_mut().zip(snapshots).enumerate() {
            let before = scores;
            normalizer::normalize(&mut scores, delta)
                .map_err(|source| ItemError::Normalize { hand: i, source })?;
            debug!(hand = i, ?before, after = ?scores, "normalized scores");
            hand[SCORES_INDEX] = Value::from(scores.to_vec());
        }
        Ok(hands.len())
    }

    /// Compact JSON, keys in their original order.
    pub fn to_compact_string(&self) -> Result<String, ItemError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn read_scores(hand_index: usize, hand: &Value) -> Result<ScoreArray, ItemError> {
    let scores = hand
        .as_array()
        .and_then(|entry| entry.get(SCORES_INDEX))
        .ok_or_else(|| {
            ItemError::MalformedRecord(format!("hand {hand_index} has no score snapshot"))
        })?;
    ScoreArray::deserialize(scores).map_err(|e| {
        ItemError::MalformedRecord(format!("hand {hand_index} scores {scores}: {e}"))
    })
}

/// Load a converted record, normalize every hand and overwrite the file in compact form.
pub fn normalize_file(path: &Path, baseline: Baseline) -> Result<usize, ItemError> {
    let text = fs::read_to_string(path)?;
    let mut record = StructuredRecord::parse(&text)?;
    let hands = record.normalize_scores(baseline)?;
    fs::write(path, record.to_compact_string()?)?;
    info!(path = %path.display(), hands, "normalized record written");
    Ok(hands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{"title":["",""],"name":["A","B","C","D"],"rule":{"disp":"般南喰赤","aka":1},"log":[[[0,0,0],[30000,30000,30000,30000],[12],[],[11,12]],[[1,0,0],[500,30500,29500,29500],[23],[],[]]],"sx":["M","F","M","C"]}"#;

    #[test]
    fn reads_scores_of_every_hand() {
        let record = StructuredRecord::parse(SAMPLE).unwrap();
        assert_eq!(
            record.scores().unwrap(),
            vec![[30000, 30000, 30000, 30000], [500, 30500, 29500, 29500]]
        );
    }

    #[test]
    fn normalizes_and_keeps_everything_else() {
        let mut record = StructuredRecord::parse(SAMPLE).unwrap();
        assert_eq!(record.normalize_scores(Baseline::default()).unwrap(), 2);
        assert_eq!(
            record.scores().unwrap(),
            vec![[25000, 25000, 25000, 25000], [1200, 23600, 22600, 22600]]
        );

        let out = record.to_compact_string().unwrap();
        let expected = SAMPLE
            .replace("[30000,30000,30000,30000]", "[25000,25000,25000,25000]")
            .replace("[500,30500,29500,29500]", "[1200,23600,22600,22600]");
        assert_eq!(out, expected);
    }

    #[test]
    fn missing_hands_is_malformed() {
        let mut record = StructuredRecord::parse(r#"{"title":"x"}"#).unwrap();
        assert!(matches!(
            record.normalize_scores(Baseline::default()),
            Err(ItemError::MalformedRecord(_))
        ));
    }

    #[test]
    fn short_score_array_is_malformed_and_nothing_changes() {
        let text = r#"{"log":[[[0,0,0],[30000,30000,30000,30000]],[[1,0,0],[30000,30000]]]}"#;
        let mut record = StructuredRecord::parse(text).unwrap();
        assert!(matches!(
            record.normalize_scores(Baseline::default()),
            Err(ItemError::MalformedRecord(_))
        ));
        assert_eq!(record.to_compact_string().unwrap(), text);
    }

    #[test]
    fn normalize_file_rewrites_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rec.json");
        fs::write(&path, SAMPLE).unwrap();

        let hands = normalize_file(&path, Baseline::default()).unwrap();
        assert_eq!(hands, 2);
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(r#"{"title":["",""],"name":"#));
        assert!(written.contains("[1200,23600,22600,22600]"));
        assert!(!written.contains('\n'));
    }
}
