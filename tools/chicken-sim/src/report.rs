use std::collections::BTreeSet;

use chicken_bits::{
    sim::{Access, RecordingConsole, SimRegs},
    Outcome, PatchTable,
};

pub fn print_table(table: &PatchTable) {
    println!("family {}", table.family);
    println!(
        "  every core: {} (e-core) / {} (p-core) |= {:#x}",
        table.role_patch.efficiency, table.role_patch.performance, table.role_patch.bits
    );
    for variant in table.variants {
        println!("  {} [{}]", variant.label, variant.key);
        for op in variant.sequence {
            println!("    {}", op);
        }
    }
    println!("  common (known variants):");
    for op in table.common {
        println!("    {}", op);
    }
    println!("  final tuning (every core):");
    for op in table.final_tuning {
        println!("    {}", op);
    }
}

pub fn print_run(regs: &SimRegs, console: &RecordingConsole, outcome: &Outcome<'_>) {
    let mut step = 0;
    for access in regs.log() {
        match access {
            Access::Write(reg, value) => {
                step += 1;
                println!("{:3}  {:<15} <- {:#018x}", step, reg.name(), value);
            }
            Access::Isb => {
                step += 1;
                println!("{:3}  isb", step);
            }
            Access::Read(..) => {}
        }
    }

    for line in &console.lines {
        println!("console: {}", line);
    }

    println!();
    println!("{} ({}, {})", outcome.label(), outcome.role, outcome.key);

    let written: BTreeSet<_> = regs.written_regs().into_iter().collect();
    for (reg, value) in regs.values().filter(|(reg, _)| written.contains(reg)) {
        println!("  {:<15} = {:#018x}", reg.name(), value);
    }
}
