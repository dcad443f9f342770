use serde::{Deserialize, Serialize};

/// An audio input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Owned copy of one published spectrum.
///
/// `sequence` increases by one for every processed device buffer, so a
/// consumer can tell how many frames it skipped between two reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSnapshot {
    pub sequence: u64,
    pub bars: Vec<f32>,
}

impl SpectrumSnapshot {
    /// Index and value of the loudest bar, if any.
    pub fn peak(&self) -> Option<(usize, f32)> {
        self.bars
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((i, v)),
            })
    }
}

/// Counters for debugging a capture session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpectrumDiagnostics {
    pub buffers_received: u64,
    pub short_buffers: u64,
    pub frames_published: u64,
    pub delegate_panics: u64,
    pub stream_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_picks_first_maximum() {
        let snapshot = SpectrumSnapshot {
            sequence: 3,
            bars: vec![0.1, 0.9, 0.4, 0.9],
        };
        assert_eq!(snapshot.peak(), Some((1, 0.9)));
    }

    #[test]
    fn peak_of_empty_is_none() {
        let snapshot = SpectrumSnapshot {
            sequence: 0,
            bars: Vec::new(),
        };
        assert_eq!(snapshot.peak(), None);
    }
}
