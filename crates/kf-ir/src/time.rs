//! Time units shared by every stage of the pipeline.

/// Smallest MIDI time unit, scaled by pulses-per-quarter-note.
pub type Pulses = u64;

/// Wall-clock time in microseconds.
///
/// Signed: note windows opened around an early note can start before zero.
pub type Microseconds = i64;

/// Tempo expressed as microseconds per quarter note.
pub type UsPerQuarter = u32;

/// 120 BPM, in effect until the first tempo change.
pub const DEFAULT_TEMPO: UsPerQuarter = 500_000;

/// Zero-based channel reserved for percussion (channel 10 on the wire).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Convert a tempo to beats per minute.
pub fn tempo_to_bpm(tempo: UsPerQuarter) -> f64 {
    if tempo == 0 {
        return 0.0;
    }
    60_000_000.0 / tempo as f64
}

/// Duration of `pulses` at a constant `tempo`, scaled by 1/ppqn.
///
/// Returned in microsecond·PPQN units so callers can sum segments exactly
/// and divide once.
pub const fn pulses_to_scaled_us(pulses: Pulses, tempo: UsPerQuarter) -> u128 {
    pulses as u128 * tempo as u128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tempo_is_120_bpm() {
        assert_eq!(tempo_to_bpm(DEFAULT_TEMPO), 120.0);
    }

    #[test]
    fn zero_tempo_reports_zero_bpm() {
        assert_eq!(tempo_to_bpm(0), 0.0);
    }

    #[test]
    fn scaled_duration_of_one_quarter() {
        // 480 pulses at ppqn 480 is one quarter note
        assert_eq!(pulses_to_scaled_us(480, DEFAULT_TEMPO) / 480, 500_000);
    }
}
