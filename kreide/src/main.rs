use clap::Parser;
use log::info;

use kreide::{
    BytecodeBuilder, BytecodeDecoder, Heap, Value, instruction_pointer,
    stack_values, step,
};

/// Assemble a small demo method, activate it, and step it to completion.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Print the instruction stream before executing it.
    #[arg(long)]
    disassemble: bool,

    /// Stop after this many steps even if the method has not finished.
    #[arg(long, default_value_t = 64)]
    max_steps: usize,
}

fn demo_bytecode() -> Vec<u8> {
    let mut b = BytecodeBuilder::new();
    b.push_literal(0);
    b.push_self();
    b.pop();
    b.push_literal(1);
    b.into_bytes()
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let bytecode = demo_bytecode();
    if args.disassemble {
        let mut decoder = BytecodeDecoder::new(&bytecode);
        let mut offset = decoder.offset();
        while let Some(result) = decoder.next() {
            match result {
                Ok(instruction) => println!("{offset:4}  {instruction}"),
                Err(err) => println!("{offset:4}  <{err}>"),
            }
            offset = decoder.offset();
        }
    }

    let mut heap = Heap::new();
    let literals = [Value::from_i64(42), Value::true_value()];
    let method = heap.alloc_method_with(&bytecode, &literals, 0, 0, 0);
    let context = heap.alloc_context(method, Value::from_i64(7));

    let mut steps = 0;
    for _ in 0..args.max_steps {
        match step(&mut heap, context) {
            Ok(()) => steps += 1,
            Err(err) if err.is_exhausted() => break,
            Err(err) => {
                eprintln!("step failed: {err}");
                std::process::exit(1);
            }
        }
    }
    info!("executed {steps} steps over {} heap objects", heap.len());

    let ip = instruction_pointer(&heap, context).unwrap_or(0);
    let stack = stack_values(&heap, context).unwrap_or_default();
    println!("instruction pointer: {ip}");
    println!("stack ({} values): {stack:?}", stack.len());
}
