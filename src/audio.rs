//! Audio capability handed to the session at construction.
//!
//! The session only ever announces events; playback is fire-and-forget and
//! never reports back. With the `sound` feature a small procedural engine
//! built on rodio is available; otherwise [`SoundEngine`] is silent.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    RoundStart,
    Correct,
    Incorrect,
    TimeExpired,
    NewHighscore,
    MusicStartInRound,
    MusicGameEnd,
    /// Stop every playing track and effect
    MusicStop,
}

pub trait AudioSink {
    fn notify(&self, event: AudioEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl AudioSink for Silence {
    fn notify(&self, _event: AudioEvent) {}
}

/// Keeps every event in order; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    events: Rc<RefCell<Vec<AudioEvent>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl AudioSink for RecordingAudio {
    fn notify(&self, event: AudioEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[cfg(feature = "sound")]
mod engine {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::warn;

    use super::{AudioEvent, AudioSink};

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_round_start: Arc<Vec<u8>>,
        sfx_correct: Arc<Vec<u8>>,
        sfx_incorrect: Arc<Vec<u8>>,
        sfx_time_expired: Arc<Vec<u8>>,
        sfx_highscore: Arc<Vec<u8>>,
        music_in_round: Arc<Vec<u8>>,
        music_game_end: Arc<Vec<u8>>,
        effects: RefCell<Vec<Sink>>,
        music: RefCell<Option<Sink>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_round_start: Arc::new(make_wav(&gen_notes(&[523.0, 784.0], 0.08))),
                sfx_correct: Arc::new(make_wav(&gen_notes(&[784.0, 1047.0, 1319.0], 0.07))),
                sfx_incorrect: Arc::new(make_wav(&gen_buzz())),
                sfx_time_expired: Arc::new(make_wav(&gen_notes(&[440.0, 370.0, 311.0, 261.0], 0.12))),
                sfx_highscore: Arc::new(make_wav(&gen_notes(
                    &[523.0, 659.0, 784.0, 1047.0, 1319.0],
                    0.09,
                ))),
                music_in_round: Arc::new(make_wav(&gen_loop(&[262.0, 330.0, 392.0, 330.0], 0.18))),
                music_game_end: Arc::new(make_wav(&gen_loop(&[220.0, 196.0, 175.0, 165.0], 0.4))),
                effects: RefCell::new(Vec::new()),
                music: RefCell::new(None),
            })
        }

        fn play_effect(&self, buf: &Arc<Vec<u8>>) {
            let mut effects = self.effects.borrow_mut();
            effects.retain(|sink| !sink.empty());
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    effects.push(sink);
                }
            }
        }

        fn play_music(&self, buf: &Arc<Vec<u8>>) {
            let Ok(sink) = Sink::try_new(&self.handle) else {
                warn!("no audio sink available for music");
                return;
            };
            let cursor = Cursor::new(buf.as_ref().clone());
            match rodio::Decoder::new(cursor) {
                Ok(src) => {
                    sink.set_volume(0.5);
                    sink.append(src.repeat_infinite());
                    if let Some(old) = self.music.borrow_mut().replace(sink) {
                        old.stop();
                    }
                }
                Err(e) => warn!("failed to decode music: {}", e),
            }
        }

        fn stop_all(&self) {
            if let Some(music) = self.music.borrow_mut().take() {
                music.stop();
            }
            for sink in self.effects.borrow_mut().drain(..) {
                sink.stop();
            }
        }
    }

    impl AudioSink for SoundEngine {
        fn notify(&self, event: AudioEvent) {
            match event {
                AudioEvent::RoundStart => self.play_effect(&self.sfx_round_start),
                AudioEvent::Correct => self.play_effect(&self.sfx_correct),
                AudioEvent::Incorrect => self.play_effect(&self.sfx_incorrect),
                AudioEvent::TimeExpired => self.play_effect(&self.sfx_time_expired),
                AudioEvent::NewHighscore => self.play_effect(&self.sfx_highscore),
                AudioEvent::MusicStartInRound => self.play_music(&self.music_in_round),
                AudioEvent::MusicGameEnd => self.play_music(&self.music_game_end),
                AudioEvent::MusicStop => self.stop_all(),
            }
        }
    }

    /// Short square-ish notes played back to back
    fn gen_notes(notes: &[f32], note_dur: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.3);
            }
        }
        samples
    }

    /// Low detuned buzz for a wrong code
    fn gen_buzz() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.35) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - i as f32 / n as f32;
                let wave = (t * 110.0 * TAU).sin().signum() * 0.5 + (t * 116.0 * TAU).sin() * 0.5;
                wave * env * 0.25
            })
            .collect()
    }

    /// Soft sustained notes meant to be repeated
    fn gen_loop(notes: &[f32], note_dur: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                samples.push((t * freq * TAU).sin() * env * 0.2);
            }
        }
        samples
    }

    /// 16-bit mono PCM WAV
    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

#[cfg(feature = "sound")]
pub use engine::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }
}

#[cfg(not(feature = "sound"))]
impl AudioSink for SoundEngine {
    fn notify(&self, _event: AudioEvent) {}
}
