//! CLI entry point: load an ELF image, run it to completion, report.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use emu_rv32::{Image, Machine, MachineConfig};

/// Functional RV32 simulator. Loads a statically-linked ELF image into a
/// flat memory and executes it until the PC leaves physical memory.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Executable image to run.
    image: PathBuf,

    /// Enable Sv32 translation through the bootstrap page table.
    #[arg(long)]
    mmu: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let image = format_elf::load_file(&args.image)?;

    let mut machine = Machine::new(&MachineConfig {
        enable_mmu: args.mmu,
        ..MachineConfig::default()
    });
    let segments: Vec<(u64, &[u8])> = image
        .segments
        .iter()
        .map(|s| (s.vaddr, s.data.as_slice()))
        .collect();
    machine.load_image(&Image {
        entry: image.entry,
        segments: &segments,
    })?;

    let start = Instant::now();
    machine.run()?;
    let seconds = start.elapsed().as_secs_f64();

    let hart = machine.hart();
    if let Some(reason) = hart.halt_reason() {
        println!("Halted by {reason}");
    }
    println!("Total time: {seconds:.6} s");
    println!("Instructions retired: {}", hart.retired());
    println!(
        "Average performance: {:.3} MIPS",
        hart.retired() as f64 / (seconds * 1e6)
    );
    println!("{}", hart.dump_registers());
    println!("{}", hart.mmu().dump_tlb());

    let stats = hart.mmu().stats();
    println!("MMU statistics:");
    println!("  TLB hits: {}", stats.hits);
    println!("  TLB misses: {}", stats.misses);
    println!("  Page faults: {}", stats.page_faults);
    println!("  TLB hit rate: {:.2}%", stats.hit_rate() * 100.0);
    Ok(())
}
