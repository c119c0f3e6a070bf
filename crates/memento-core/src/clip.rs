//! PCM16 WAV clip encoding for recorded audio.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::device::RecordingPreset;
use crate::{Error, Result};

/// Sample layout of a recorded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipFormat {
    pub sample_rate_hz: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl From<RecordingPreset> for ClipFormat {
    fn from(preset: RecordingPreset) -> Self {
        Self {
            sample_rate_hz: preset.sample_rate_hz(),
            channels: preset.channels(),
        }
    }
}

impl ClipFormat {
    fn validate(self) -> Result<Self> {
        if self.sample_rate_hz == 0 {
            return Err(Error::InvalidInput(
                "Clip sample rate must be greater than zero".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(Error::InvalidInput(
                "Clip channel count must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    const fn wav_spec(self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Playback length of `sample_count` interleaved samples.
    pub fn duration_ms(self, sample_count: u64) -> u64 {
        let frames = u128::from(sample_count) / u128::from(self.channels.max(1));
        let millis = frames.saturating_mul(1_000) / u128::from(self.sample_rate_hz.max(1));
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

fn wav_error(context: &str, error: hound::Error) -> Error {
    match error {
        hound::Error::IoError(io) => Error::Io(io),
        other => Error::DeviceOperationFailed(format!("{context}: {other}")),
    }
}

/// Incremental clip writer used while the microphone is live.
pub struct ClipWriter {
    writer: hound::WavWriter<BufWriter<File>>,
    format: ClipFormat,
    samples: u64,
}

impl ClipWriter {
    pub fn create(path: &Path, format: ClipFormat) -> Result<Self> {
        let format = format.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = hound::WavWriter::create(path, format.wav_spec())
            .map_err(|error| wav_error("Failed to create clip", error))?;
        Ok(Self {
            writer,
            format,
            samples: 0,
        })
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        for &sample in samples {
            self.writer
                .write_sample(sample)
                .map_err(|error| wav_error("Failed to write clip", error))?;
        }
        self.samples += samples.len() as u64;
        Ok(())
    }

    pub fn duration_ms(&self) -> u64 {
        self.format.duration_ms(self.samples)
    }

    /// Flush the header and return the clip length.
    pub fn finish(self) -> Result<u64> {
        let duration = self.duration_ms();
        self.writer
            .finalize()
            .map_err(|error| wav_error("Failed to finalize clip", error))?;
        Ok(duration)
    }
}

/// Read a WAV file's length without decoding its samples.
pub fn wav_duration_ms(path: &Path) -> Result<u64> {
    let reader =
        hound::WavReader::open(path).map_err(|error| wav_error("Failed to open clip", error))?;
    let spec = reader.spec();
    let format = ClipFormat {
        sample_rate_hz: spec.sample_rate,
        channels: spec.channels,
    };
    Ok(format.duration_ms(u64::from(reader.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn streamed_samples_read_back_unchanged() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("hq.wav");
        let samples = [0_i16, 1200, -1200, 300, -300, 7];

        let mut writer =
            ClipWriter::create(&path, ClipFormat::from(RecordingPreset::HighQuality)).unwrap();
        writer.write_samples(&samples).unwrap();
        writer.finish().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader
            .samples::<i16>()
            .map(std::result::Result::unwrap)
            .collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn duration_counts_frames_not_samples() {
        let mono = ClipFormat {
            sample_rate_hz: 16_000,
            channels: 1,
        };
        let stereo = ClipFormat {
            sample_rate_hz: 16_000,
            channels: 2,
        };
        assert_eq!(mono.duration_ms(16_000), 1_000);
        assert_eq!(stereo.duration_ms(32_000), 1_000);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let tmp = tempdir().unwrap();
        let result = ClipWriter::create(
            &tmp.path().join("silent.wav"),
            ClipFormat {
                sample_rate_hz: 0,
                channels: 1,
            },
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn streamed_clip_reports_its_length() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("clips").join("take.wav");
        let format = ClipFormat {
            sample_rate_hz: 8_000,
            channels: 1,
        };

        let mut writer = ClipWriter::create(&path, format).unwrap();
        writer.write_samples(&[0; 4_000]).unwrap();
        writer.write_samples(&[1; 4_000]).unwrap();
        assert_eq!(writer.finish().unwrap(), 1_000);

        assert_eq!(wav_duration_ms(&path).unwrap(), 1_000);
    }
}
