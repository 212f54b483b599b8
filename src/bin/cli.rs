//! keyfall CLI: load a MIDI file, print a summary and play it in real time.
//!
//! Usage:
//!   kf-cli path/to/song.mid
//!   kf-cli path/to/song.mid --play 1 --lead-in-ms 2000
//!   kf-cli path/to/song.mid --config keyfall.json --speed 75

use anyhow::{Context, Result};
use clap::Parser;
use kf_ir::{tempo_to_bpm, DEFAULT_TEMPO};
use kf_master::{summarize, Config, Controller, LogSink};
use log::{debug, info};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "kf-cli", version, about = "Play a Standard MIDI File and score live input")]
struct Args {
    /// MIDI file (.mid or RIFF .rmi)
    file: PathBuf,

    /// JSON settings file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    lead_in_ms: Option<i64>,

    #[arg(long)]
    lead_out_ms: Option<i64>,

    /// Playback speed in percent
    #[arg(long)]
    speed: Option<u32>,

    /// Track id the user plays (repeatable)
    #[arg(long = "play", value_name = "TRACK")]
    play: Vec<usize>,

    /// Print the summary and exit
    #[arg(long)]
    summary_only: bool,

    /// MIDI output port index
    #[cfg(feature = "midir")]
    #[arg(long)]
    output_port: Option<usize>,

    /// MIDI input port index
    #[cfg(feature = "midir")]
    #[arg(long)]
    input_port: Option<usize>,
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(ms) = args.lead_in_ms {
        config.lead_in_us = ms * 1_000;
    }
    if let Some(ms) = args.lead_out_ms {
        config.lead_out_us = ms * 1_000;
    }
    if let Some(speed) = args.speed {
        config.speed_percent = speed;
    }
    config.user_tracks.extend(&args.play);
    debug!("resolved config: {:?}", config);
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = build_config(&args)?;

    let mut ctrl = Controller::new(config);
    ctrl.load_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    print_summary(&ctrl);
    if args.summary_only {
        return Ok(());
    }

    ctrl.set_sink(Box::new(LogSink));
    #[cfg(feature = "midir")]
    let _input = connect_devices(&mut ctrl, &args)?;
    ctrl.reset()?;

    play(&mut ctrl)
}

fn print_summary(ctrl: &Controller) {
    let Some(doc) = ctrl.document() else { return };
    let initial_tempo = doc
        .tempo_track()
        .event_at(0)
        .filter(|&(pulse, _)| pulse == 0)
        .and_then(|(_, event)| event.tempo())
        .unwrap_or(DEFAULT_TEMPO);
    println!("PPQN:     {}", doc.ppqn());
    println!("Tempo:    {:.1} BPM", tempo_to_bpm(initial_tempo));
    println!("Length:   {:.1} s", doc.song_length_us() as f64 / 1e6);
    print!("{}", summarize(doc.tracks()));
    println!();

    let tempo_id = doc.tempo_track_id();
    for (id, track) in doc.tracks().iter().enumerate() {
        if id == tempo_id || !track.has_notes() {
            continue;
        }
        let mode = ctrl.track_mode(id).unwrap_or_default();
        println!(
            "  {:2}: {:<24} {:<28} {:5} notes  {:?}",
            id,
            track.name.as_str(),
            track.instrument().name(),
            track.notes().len(),
            mode
        );
    }
    println!();
}

#[cfg(feature = "midir")]
fn connect_devices(ctrl: &mut Controller, args: &Args) -> Result<Option<kf_master::MidirInput>> {
    use kf_master::{live_input_queue, MidirInput, MidirOutput};

    if let Some(port) = args.output_port {
        let out = MidirOutput::connect(port).context("Failed to open MIDI output")?;
        info!("sending to MIDI output port {}", port);
        ctrl.set_sink(Box::new(out));
    }
    let Some(port) = args.input_port else { return Ok(None) };
    let (producer, consumer) = live_input_queue(ctrl.config().input_queue_capacity);
    let input = MidirInput::connect(port, producer).context("Failed to open MIDI input")?;
    info!("listening on MIDI input port {}", port);
    ctrl.set_input(Box::new(consumer));
    Ok(Some(input))
}

fn play(ctrl: &mut Controller) -> Result<()> {
    println!("Playing...");
    let frame = Duration::from_millis(10);
    let mut last = Instant::now();

    while !ctrl.is_song_over() {
        std::thread::sleep(frame);
        let now = Instant::now();
        let delta = now.duration_since(last).as_micros() as i64;
        last = now;
        ctrl.step(delta)?;

        let stats = ctrl.statistics();
        print!(
            "\r{:5.1}% | Score: {:8.0} | Combo: {:3}",
            ctrl.percent_complete() * 100.0,
            stats.score,
            ctrl.combo()
        );
        let _ = std::io::stdout().flush();
    }

    let stats = ctrl.statistics();
    info!("song over at {} us", ctrl.position_us());
    println!("\rDone.                                  ");
    if stats.playable_notes > 0 {
        println!("Hit:      {} / {}", stats.notes_hit, stats.playable_notes);
        println!("Missed:   {}", stats.notes_missed);
        println!("Stray:    {}", stats.stray_presses);
        println!("Combo:    {} longest", stats.longest_combo);
        println!("Score:    {:.0}", stats.score);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from(["kf-cli", "song.mid", "--lead-in-ms", "250", "--speed", "80", "--play", "1", "--play", "3"])
            .unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.lead_in_us, 250_000);
        assert_eq!(config.lead_out_us, Config::default().lead_out_us);
        assert_eq!(config.speed_percent, 80);
        assert_eq!(config.user_tracks, vec![1, 3]);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let args = Args::try_parse_from(["kf-cli", "song.mid", "--config", "/nonexistent/keyfall.json"]).unwrap();
        let err = build_config(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
