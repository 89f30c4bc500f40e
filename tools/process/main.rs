//! Offline RIAA playback and restoration of a stereo WAV file.
//!
//! Usage: phono_process input.wav output.wav [gain_db] [subsonic 0|1|2]
//!        [riaa 0|1] [declick 0|1] [spike_threshold_db] [spike_width_ms]

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use phonostage::dsp::SubsonicMode;
use phonostage::pipeline::{PipelineConfig, StereoPipeline};
use std::path::{Path, PathBuf};

const BLOCK_FRAMES: usize = 8192;

fn parse_arg<T: std::str::FromStr>(arg: Option<String>, name: &str, default: T) -> Result<T> {
    match arg {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid value '{}' for {}", s, name)),
    }
}

fn read_stereo(path: &Path) -> Result<(u32, Vec<f32>, Vec<f32>)> {
    let reader =
        WavReader::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 2 {
        bail!("'{}' has {} channels, expected stereo", path.display(), spec.channels);
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ (16 | 24 | 32)) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
        (format, bits) => bail!("unsupported sample format {:?} at {} bits", format, bits),
    };

    let (left, right) = interleaved
        .chunks_exact(2)
        .map(|frame| (frame[0], frame[1]))
        .unzip();
    Ok((spec.sample_rate, left, right))
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        bail!(
            "usage: phono_process input.wav output.wav [gain_db] [subsonic 0|1|2] [riaa 0|1] \
             [declick 0|1] [spike_threshold_db] [spike_width_ms]"
        );
    };
    let input = PathBuf::from(input);
    let output = PathBuf::from(output);

    let defaults = PipelineConfig::default();
    let config = PipelineConfig {
        gain_db: parse_arg(args.next(), "gain_db", defaults.gain_db)?,
        subsonic: SubsonicMode::from_index(parse_arg(args.next(), "subsonic", 0u32)?),
        riaa_enable: parse_arg(args.next(), "riaa", 1u32)? != 0,
        declick_enable: parse_arg(args.next(), "declick", 0u32)? != 0,
        spike_threshold_db: parse_arg(args.next(), "spike_threshold_db", defaults.spike_threshold_db)?,
        spike_width_ms: parse_arg(args.next(), "spike_width_ms", defaults.spike_width_ms)?,
        ..defaults
    }
    .clamped();

    let (sample_rate, mut left, mut right) = read_stereo(&input)?;
    let frames = left.len();
    let mut pipeline = StereoPipeline::new(sample_rate as f32)
        .with_context(|| format!("cannot process '{}'", input.display()))?;

    // Flush the declick delay with silence, then drop it from the head
    let latency = pipeline.latency_samples() as usize;
    left.resize(frames + latency, 0.0);
    right.resize(frames + latency, 0.0);

    for (l, r) in left
        .chunks_mut(BLOCK_FRAMES)
        .zip(right.chunks_mut(BLOCK_FRAMES))
    {
        pipeline.process_block(l, r, &config);
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&output, spec)
        .with_context(|| format!("failed to create '{}'", output.display()))?;
    for (&l, &r) in left[latency..].iter().zip(right[latency..].iter()) {
        writer.write_sample(l)?;
        writer.write_sample(r)?;
    }
    writer.finalize()?;

    let stats = pipeline.stats();
    println!("Processed '{}' -> '{}'", input.display(), output.display());
    println!("  sample rate      : {} Hz", sample_rate);
    println!("  frames           : {}", frames);
    println!("  clipped samples  : {}", stats.clipped_samples);
    println!("  detected clicks  : {}", stats.detected_clicks);
    println!("  avg spike length : {:.2} samples", stats.avg_spike_length);
    println!("  avg spike ratio  : {:.2} dB", stats.avg_spike_ratio_db);
    Ok(())
}
