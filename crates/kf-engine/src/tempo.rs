//! Tempo handling: tempo-track synthesis and pulse/time conversion.
//!
//! Tempo changes may appear in any track. At load they are pulled out of
//! their source tracks into one synthetic tempo track; everything else in
//! the engine reads tempo from that track only.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use kf_ir::{
    pulses_to_scaled_us, EventKind, MetaEvent, Microseconds, Pulses, RawEvent, Track,
    UsPerQuarter, DEFAULT_TEMPO,
};

/// Tracks with tempo events removed, plus the extracted tempo events.
#[derive(Clone, Debug, Default)]
pub struct TempoExtraction {
    /// Source tracks without tempo events; in-track timing is unchanged
    pub tracks: Vec<Vec<RawEvent>>,
    /// Tempo-only track, one event per distinct pulse, as deltas
    pub tempo_track: Vec<RawEvent>,
    /// Tempo events dropped because an earlier one shared their pulse
    pub duplicates: usize,
}

/// Split every tempo change out of `tracks`.
///
/// A removed event's delta is carried onto the next kept event of the same
/// track so the remaining events keep their absolute pulses. When two tempo
/// changes land on the same absolute pulse, the first one seen (in track
/// order, then event order) wins.
pub fn extract_tempo(tracks: Vec<Vec<RawEvent>>) -> TempoExtraction {
    let mut by_pulse: BTreeMap<Pulses, UsPerQuarter> = BTreeMap::new();
    let mut duplicates = 0;
    let mut stripped = Vec::with_capacity(tracks.len());

    for events in tracks {
        let mut kept = Vec::with_capacity(events.len());
        let mut absolute: Pulses = 0;
        let mut carried: u32 = 0;

        for event in events {
            absolute += event.delta as Pulses;
            if let Some(tempo) = event.tempo() {
                carried = carried.saturating_add(event.delta);
                if by_pulse.contains_key(&absolute) {
                    duplicates += 1;
                } else {
                    by_pulse.insert(absolute, tempo);
                }
                continue;
            }
            kept.push(RawEvent::new(event.delta.saturating_add(carried), event.kind));
            carried = 0;
        }
        stripped.push(kept);
    }

    let mut tempo_track = Vec::with_capacity(by_pulse.len());
    let mut previous: Pulses = 0;
    for (pulse, tempo) in by_pulse {
        let delta = u32::try_from(pulse - previous).unwrap_or(u32::MAX);
        tempo_track.push(RawEvent::new(delta, EventKind::Meta(MetaEvent::Tempo(tempo))));
        previous = pulse;
    }

    TempoExtraction { tracks: stripped, tempo_track, duplicates }
}

/// Elapsed time up to `pulse`, in microsecond·PPQN units.
///
/// Walks the tempo track from its start and stops once `pulse` falls inside
/// the current segment.
fn scaled_time_at(tempo_track: &Track, pulse: Pulses) -> u128 {
    let mut scaled: u128 = 0;
    let mut segment_start: Pulses = 0;
    let mut tempo = DEFAULT_TEMPO;

    for (&change, event) in tempo_track.pulses().iter().zip(tempo_track.events()) {
        if change >= pulse {
            break;
        }
        scaled += pulses_to_scaled_us(change - segment_start, tempo);
        segment_start = change;
        if let Some(t) = event.tempo() {
            tempo = t;
        }
    }

    scaled + pulses_to_scaled_us(pulse - segment_start, tempo)
}

/// Saturates at `Microseconds::MAX` past about 292 000 years of song.
fn to_microseconds(us: u128) -> Microseconds {
    Microseconds::try_from(us).unwrap_or(Microseconds::MAX)
}

/// Microseconds from song start to `pulse` (rounded down).
pub fn pulse_to_us(tempo_track: &Track, ppqn: u16, pulse: Pulses) -> Microseconds {
    to_microseconds(scaled_time_at(tempo_track, pulse) / ppqn.max(1) as u128)
}

/// Microseconds from song start to `pulse` (rounded up).
///
/// Used for lengths: a clock advanced this far is guaranteed to have
/// reached `pulse`.
pub fn pulse_to_us_ceil(tempo_track: &Track, ppqn: u16, pulse: Pulses) -> Microseconds {
    let scaled = scaled_time_at(tempo_track, pulse);
    to_microseconds(scaled.div_ceil(ppqn.max(1) as u128))
}

/// Forward-only pulse counter driven by wall-clock time.
///
/// Integer arithmetic throughout: the fraction of a pulse not yet reached is
/// kept as a remainder in microsecond·PPQN units, so any split of the same
/// total time lands on the same pulse. Tempo changes take effect exactly at
/// their pulse.
#[derive(Clone, Debug)]
pub struct PulseClock {
    ppqn: u16,
    tempo: UsPerQuarter,
    pulse: Pulses,
    /// Elapsed time past `pulse`, always below one pulse at `tempo`
    remainder: u128,
    /// Next tempo-track event not yet applied
    next_change: usize,
}

impl PulseClock {
    pub fn new(ppqn: u16) -> Self {
        Self {
            ppqn: ppqn.max(1),
            tempo: DEFAULT_TEMPO,
            pulse: 0,
            remainder: 0,
            next_change: 0,
        }
    }

    /// Back to pulse 0 at the default tempo.
    pub fn reset(&mut self) {
        self.tempo = DEFAULT_TEMPO;
        self.pulse = 0;
        self.remainder = 0;
        self.next_change = 0;
    }

    pub fn pulse(&self) -> Pulses {
        self.pulse
    }

    /// Tempo currently in effect.
    pub fn tempo(&self) -> UsPerQuarter {
        self.tempo
    }

    /// Advance by `delta_us` and return the number of whole pulses crossed.
    pub fn advance(&mut self, tempo_track: &Track, delta_us: u64) -> Pulses {
        let start = self.pulse;
        let mut budget = self.remainder + delta_us as u128 * self.ppqn as u128;

        loop {
            self.apply_due_changes(tempo_track);
            let per_pulse = self.tempo.max(1) as u128;

            if let Some((change, _)) = tempo_track.event_at(self.next_change) {
                let needed = (change - self.pulse) as u128 * per_pulse;
                if budget >= needed {
                    budget -= needed;
                    self.pulse = change;
                    continue;
                }
            }

            let whole = budget / per_pulse;
            self.pulse += whole as Pulses;
            budget -= whole * per_pulse;
            break;
        }

        self.remainder = budget;
        self.pulse - start
    }

    fn apply_due_changes(&mut self, tempo_track: &Track) {
        while let Some((change, event)) = tempo_track.event_at(self.next_change) {
            if change > self.pulse {
                break;
            }
            if let Some(t) = event.tempo() {
                self.tempo = t;
            }
            self.next_change += 1;
        }
    }
}
