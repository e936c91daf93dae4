//! Processor listing and information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use tonegraph_core::{ParamDescriptor, ParamKind};
use tonegraph_registry::ProcessorRegistry;

#[derive(Args)]
pub struct ProcessorsArgs {
    /// Show parameters for one processor
    #[arg(value_name = "TYPE")]
    processor: Option<String>,
}

pub fn run(args: ProcessorsArgs) -> anyhow::Result<()> {
    let registry = ProcessorRegistry::new();

    let Some(type_id) = &args.processor else {
        println!("Available processors:\n");
        println!("  {:16}  {:14}  {:8}  {}", "Type", "Name", "Category", "Description");
        println!("  {:16}  {:14}  {:8}  {}", "----", "----", "--------", "-----------");
        for d in registry.all() {
            println!(
                "  {:16}  {:14}  {:8}  {}",
                d.id,
                d.name,
                d.category.label(),
                d.description
            );
        }
        println!("\nRun `tonegraph processors <TYPE>` for parameters.");
        return Ok(());
    };

    let descriptor = registry
        .get(type_id)
        .ok_or_else(|| anyhow::anyhow!("Unknown processor: {type_id}"))?;
    let params = registry.param_descriptors(descriptor.id).unwrap_or_default();

    println!("{}", descriptor.name);
    println!("{}", "=".repeat(descriptor.name.len()));
    println!();
    println!("{}", descriptor.description);
    println!();
    println!("Parameters:");
    println!();
    println!("  {:14}  {:12}  {:10}  {}", "Id", "Name", "Default", "Range");
    println!("  {:14}  {:12}  {:10}  {}", "--", "----", "-------", "-----");
    for p in &params {
        println!(
            "  {:14}  {:12}  {:10}  {}",
            p.id,
            p.name,
            p.format_value(p.default),
            describe_range(p)
        );
    }

    let example: Vec<String> = params
        .iter()
        .skip(1)
        .take(2)
        .map(|p| format!("{}={}", p.id, example_value(p)))
        .collect();
    println!();
    println!("Example usage:");
    println!();
    if example.is_empty() {
        println!("  tonegraph process input.wav output.wav --chain {}", descriptor.id);
    } else {
        println!(
            "  tonegraph process input.wav output.wav --chain \"{}:{}\"",
            descriptor.id,
            example.join(",")
        );
    }
    Ok(())
}

fn describe_range(p: &ParamDescriptor) -> String {
    match p.kind {
        ParamKind::Choice(labels) => labels.join(", "),
        ParamKind::Toggle => "on, off".to_string(),
        ParamKind::Float => format!("{}–{}{}", p.min, p.max, unit_suffix(p.unit)),
    }
}

fn example_value(p: &ParamDescriptor) -> String {
    match p.kind {
        ParamKind::Choice(_) | ParamKind::Toggle => p.format_value(p.default),
        ParamKind::Float => p.default.to_string(),
    }
}

fn unit_suffix(unit: &str) -> String {
    match unit {
        "" | "%" => String::new(),
        u => format!(" {u}"),
    }
}
