//! Click survey of a WAV file with the MAD detector.
//!
//! Usage: click_scan file.wav [--threshold v] [--hpf-freq f] [--hpf-order 2|4]
//!        [--channel 0|1] [--lpc-order n]
//!
//! With `--lpc-order`, each click also reports how far the sample departs
//! from a linear prediction fitted on the audio just before it.

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use phonostage::dsp::{ClickDetector, ClickDetectorConfig, ClickEvent, LpcPredictor};
use std::path::{Path, PathBuf};

const LPC_FIT_WINDOW: usize = 1024;

struct Options {
    path: PathBuf,
    threshold: Option<f32>,
    hpf_freq: Option<f32>,
    hpf_order: Option<u32>,
    channel: Option<usize>,
    lpc_order: Option<usize>,
}

fn parse_options() -> Result<Options> {
    let mut args = std::env::args().skip(1);
    let mut path = None;
    let mut opts = Options {
        path: PathBuf::new(),
        threshold: None,
        hpf_freq: None,
        hpf_order: None,
        channel: None,
        lpc_order: None,
    };

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .with_context(|| format!("{} needs a value", name))
        };
        match arg.as_str() {
            "--threshold" => opts.threshold = Some(value("--threshold")?.parse()?),
            "--hpf-freq" => opts.hpf_freq = Some(value("--hpf-freq")?.parse()?),
            "--hpf-order" => opts.hpf_order = Some(value("--hpf-order")?.parse()?),
            "--channel" => opts.channel = Some(value("--channel")?.parse()?),
            "--lpc-order" => opts.lpc_order = Some(value("--lpc-order")?.parse()?),
            flag if flag.starts_with("--") => bail!("unknown option {}", flag),
            file => path = Some(PathBuf::from(file)),
        }
    }

    let Some(path) = path else {
        bail!(
            "usage: click_scan file.wav [--threshold v] [--hpf-freq f] [--hpf-order 2|4] \
             [--channel 0|1] [--lpc-order n]"
        );
    };
    opts.path = path;
    Ok(opts)
}

fn read_channels(path: &Path) -> Result<(u32, Vec<Vec<f32>>)> {
    let reader =
        WavReader::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mut out = vec![Vec::with_capacity(interleaved.len() / channels.max(1)); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &x) in out.iter_mut().zip(frame) {
            ch.push(x);
        }
    }
    Ok((spec.sample_rate, out))
}

/// Residual at the click relative to the mean residual of the fit window.
fn lpc_excess(order: usize, samples: &[f32], click: &ClickEvent) -> Option<f32> {
    let pos = click.start as usize;
    if pos < LPC_FIT_WINDOW + order {
        return None;
    }
    let fit = &samples[pos - LPC_FIT_WINDOW..pos];
    let mut lpc = LpcPredictor::new(order).ok()?;
    lpc.analyze(fit).ok()?;

    for &x in &fit[..order] {
        lpc.update(x);
    }
    let mut baseline = 0.0f32;
    for &x in &fit[order..] {
        baseline += lpc.predict_error(x).0.abs();
    }
    baseline /= (fit.len() - order) as f32;

    let (err, _) = lpc.predict_error(samples[pos]);
    Some(err.abs() / baseline.max(1e-9))
}

fn main() -> Result<()> {
    let opts = parse_options()?;
    let (sample_rate, channels) = read_channels(&opts.path)?;
    if let Some(ch) = opts.channel {
        if ch >= channels.len() {
            bail!("channel {} out of range ({} channels)", ch, channels.len());
        }
    }

    let mut config = ClickDetectorConfig::for_sample_rate(sample_rate as f32);
    if let Some(t) = opts.threshold {
        config.threshold = t;
    }
    if let Some(f) = opts.hpf_freq {
        config.hpf_freq = f;
    }
    if let Some(o) = opts.hpf_order {
        config.hpf_order = o;
    }

    println!(
        "Scanning '{}' ({} Hz, window {}, threshold {:.1})",
        opts.path.display(),
        sample_rate,
        config.window_size,
        config.threshold
    );

    let mut grand_total = 0usize;
    for (index, samples) in channels.iter().enumerate() {
        if opts.channel.is_some_and(|c| c != index) {
            continue;
        }

        let mut detector = ClickDetector::new(config, sample_rate as f32)?;
        let mut clicks = Vec::new();
        // Trailing zeros flush the centre of the window past the last sample
        let flush = std::iter::repeat(0.0).take(detector.latency() + 1);
        for x in samples.iter().copied().chain(flush) {
            if detector.process(x) {
                if let Some(click) = detector.last_click() {
                    clicks.push(click);
                }
            }
        }

        for click in &clicks {
            let seconds = click.start as f64 / sample_rate as f64;
            print!(
                "  ch{} {:>10.4}s  len {:>3}  energy {:.4}",
                index, seconds, click.length, click.energy
            );
            match opts.lpc_order.and_then(|o| lpc_excess(o, samples, click)) {
                Some(excess) => println!("  lpc x{:.1}", excess),
                None => println!(),
            }
        }
        println!("  ch{} total: {} clicks", index, clicks.len());
        grand_total += clicks.len();
    }
    println!("Total: {} clicks", grand_total);
    Ok(())
}
