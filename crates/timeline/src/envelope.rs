use crate::{Frame, Overlay};

/// Per-frame gain of a sound or video overlay: base volume shaped by linear
/// fade-in and fade-out ramps. Fade lengths are in seconds and converted to
/// frames at `reference_fps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioEnvelope {
    pub base_volume: f64,
    pub fade_in_seconds: f64,
    pub fade_out_seconds: f64,
    pub reference_fps: f64,
    pub total_frames: Frame,
}

impl AudioEnvelope {
    /// `None` for overlays that carry no audio.
    pub fn for_overlay(overlay: &Overlay, reference_fps: f64) -> Option<Self> {
        let audio = overlay.audio_style()?;
        Some(Self {
            base_volume: audio.volume as f64,
            fade_in_seconds: audio.fade_in_seconds,
            fade_out_seconds: audio.fade_out_seconds,
            reference_fps,
            total_frames: overlay.duration_in_frames,
        })
    }

    fn fade_in_frames(&self) -> f64 {
        (self.fade_in_seconds * self.reference_fps).max(0.0)
    }

    fn fade_out_frames(&self) -> f64 {
        (self.fade_out_seconds * self.reference_fps).max(0.0)
    }

    /// Gain at `frame`, counted from the overlay's first frame.
    pub fn gain_at(&self, frame: Frame) -> f64 {
        let frame = frame as f64;
        let total = self.total_frames as f64;
        let fade_in = self.fade_in_frames();
        let fade_out = self.fade_out_frames();

        let mut gain = self.base_volume.clamp(0.0, 1.0);
        if fade_in > 0.0 && frame < fade_in {
            gain *= (frame / fade_in).clamp(0.0, 1.0);
        }
        if fade_out > 0.0 && frame > total - fade_out {
            gain *= ((total - frame) / fade_out).clamp(0.0, 1.0);
        }
        gain
    }

    /// Gain for every frame of the overlay.
    pub fn curve(&self) -> Vec<f64> {
        (0..self.total_frames.max(0)).map(|f| self.gain_at(f)).collect()
    }
}
