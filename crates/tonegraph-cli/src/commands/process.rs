//! File-based chain processing command.

use crate::chain_dsl::{build_chain, parse_chain};
use crate::wav::{Stereo, WavSpec, read_wav_stereo, write_wav_stereo};
use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tonegraph_config::{
    find_chain, load_chain_state, load_default_tuning, load_tuning, save_chain_state,
};
use tonegraph_core::{ChainConfig, ProcessorChain, block_peak};
use tonegraph_registry::ProcessorRegistry;

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Series chain (e.g. "diode_clipper:drive=0.8|cry_baby:control_freq=0.3")
    #[arg(short, long, conflicts_with = "state")]
    chain: Option<String>,

    /// Saved chain state: a JSON path or a name in the user chains directory
    #[arg(short, long)]
    state: Option<String>,

    /// Model tuning file (TOML). Defaults to the user tuning file if present
    #[arg(short, long)]
    tuning: Option<PathBuf>,

    /// Write the chain that was used as JSON
    #[arg(long, value_name = "PATH")]
    save_state: Option<PathBuf>,

    /// Processing block size
    #[arg(long, default_value = "512", value_parser = clap::value_parser!(u32).range(1..=65536))]
    block_size: u32,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32", value_parser = ["16", "24", "32"])]
    bit_depth: String,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let tuning = match &args.tuning {
        Some(path) => load_tuning(path)?,
        None => load_default_tuning()?,
    };
    let registry = ProcessorRegistry::with_tuning(tuning);

    println!("Reading {}...", args.input.display());
    let (mut samples, spec) = read_wav_stereo(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    if samples.is_empty() {
        anyhow::bail!("{} contains no audio", args.input.display());
    }
    let sample_rate = spec.sample_rate as f32;
    println!(
        "  {} frames, {} ch, {} Hz, {:.2}s",
        samples.len(),
        spec.channels,
        spec.sample_rate,
        samples.len() as f32 / sample_rate
    );

    let block_size = args.block_size as usize;
    let (mut chain, mut renderer) = ProcessorChain::new(ChainConfig {
        sample_rate,
        block_size,
        ..ChainConfig::default()
    });

    if let Some(name) = &args.state {
        let path = find_chain(name).with_context(|| format!("chain state '{name}' not found"))?;
        let state = load_chain_state(&path)?;
        let report = chain.load_state(&state, &registry)?;
        println!(
            "Loaded {}: {} processor(s), {} connection(s)",
            path.display(),
            report.nodes_loaded,
            report.connections_loaded
        );
        for d in &report.diagnostics {
            eprintln!("  warning: {d}");
        }
    } else if let Some(text) = &args.chain {
        let spec = parse_chain(text)?;
        build_chain(&spec, &mut chain, &registry)?;
    } else {
        anyhow::bail!("No chain specified. Use --chain or --state");
    }

    if chain.is_empty() {
        anyhow::bail!("No processors to run");
    }
    let names: Vec<&str> = chain
        .processing_order()
        .iter()
        .filter_map(|&id| chain.node(id))
        .filter(|n| !n.is_boundary())
        .map(|n| n.processor_type())
        .collect();
    println!("Processing with {}...", names.join(" → "));

    let input_stats = Stats::of(&samples);

    let pb = ProgressBar::new(samples.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    let Stereo { left, right } = &mut samples;
    for (l, r) in left.chunks_mut(block_size).zip(right.chunks_mut(block_size)) {
        renderer.process(l, r);
        pb.inc(l.len() as u64);
    }
    pb.finish_with_message("done");

    let fallbacks = renderer.total_solver_fallbacks();
    if fallbacks > 0 {
        tracing::warn!(fallbacks, "solver held its last valid output");
    }

    let output_stats = Stats::of(&samples);
    println!("\nStats:");
    println!("  Input:  {input_stats}");
    println!("  Output: {output_stats}");

    let bits_per_sample: u16 = args.bit_depth.parse()?;
    let out_spec = WavSpec {
        channels: spec.channels.min(2),
        sample_rate: spec.sample_rate,
        bits_per_sample,
    };
    println!("\nWriting {}...", args.output.display());
    write_wav_stereo(&args.output, &samples, out_spec)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if let Some(path) = &args.save_state {
        save_chain_state(&chain.to_state(), path)?;
        println!("Saved chain to {}", path.display());
    }

    println!("Done!");
    Ok(())
}

struct Stats {
    rms: f32,
    peak: f32,
}

impl Stats {
    fn of(samples: &Stereo) -> Self {
        let all = || samples.left.iter().chain(&samples.right);
        let count = (samples.len() * 2).max(1) as f32;
        let rms = (all().map(|s| s * s).sum::<f32>() / count).sqrt();
        let peak = block_peak(&samples.left).max(block_peak(&samples.right));
        Self { rms, peak }
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RMS {:.1} dB, Peak {:.1} dB",
            linear_to_db(self.rms),
            linear_to_db(self.peak)
        )
    }
}

fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}
