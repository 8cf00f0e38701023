use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use reil::cpu::arm::ArmPolicy;
use reil::{OperandSize, ReilAddress, ReilInstruction, ReilOpcode, ReilOperand};
use reil_interpreter::{InterpreterConfig, RegisterStatus, ReilInterpreter, ReilProgram};
use reil_translators::arm::ArmTranslator;
use reil_translators::{
    NativeInstruction, OperandNode, OperandTree, TranslationContext, Translator,
};

fn sized(node: OperandNode) -> OperandTree {
    OperandTree::new(OperandNode::size_prefix("b4", node))
}

fn reg(name: &str) -> OperandTree {
    sized(OperandNode::register(name))
}

fn imm(value: &str) -> OperandTree {
    sized(OperandNode::immediate(value))
}

fn post_indexed(base: &str, offset: &str) -> OperandTree {
    sized(OperandNode::operator(
        ",",
        vec![
            OperandNode::memory_dereference(OperandNode::register(base)),
            OperandNode::immediate(offset),
        ],
    ))
}

/// Word-array sum over 64 elements.
fn array_sum() -> Vec<NativeInstruction> {
    vec![
        NativeInstruction::new(0x1000, "MOV", vec![reg("R0"), imm("#0")]),
        NativeInstruction::new(0x1004, "LDR", vec![reg("R3"), post_indexed("R1", "4")]),
        NativeInstruction::new(0x1008, "ADD", vec![reg("R0"), reg("R0"), reg("R3")]),
        NativeInstruction::new(0x100c, "SUBS", vec![reg("R2"), reg("R2"), imm("1")]),
        NativeInstruction::new(0x1010, "BNE", vec![imm("0x1004")]),
    ]
}

fn translate(instructions: &[NativeInstruction]) -> Vec<ReilInstruction> {
    let translator = ArmTranslator::new();
    let mut context = TranslationContext::new();
    let mut output = Vec::new();
    for instruction in instructions {
        translator
            .translate(&mut context, instruction, &mut output)
            .expect("failed to translate instruction");
    }
    output
}

fn setup_array_sum() -> ReilInterpreter<ArmPolicy> {
    let mut interpreter = ReilInterpreter::new(ArmPolicy, InterpreterConfig::default());
    for (name, value) in [("R1", 0x8000), ("R2", 64)] {
        interpreter
            .set_register(name, value, OperandSize::Dword, RegisterStatus::Defined)
            .expect("failed to initialize register");
    }
    for flag in ["N", "Z", "C", "V"] {
        interpreter
            .set_register(flag, 0, OperandSize::Byte, RegisterStatus::Defined)
            .expect("failed to initialize flag");
    }
    for index in 0..64 {
        interpreter
            .set_memory(0x8000 + 4 * index, index, 4)
            .expect("failed to initialize memory");
    }
    interpreter
}

fn add_instruction() -> reil::Result<ReilInstruction> {
    ReilInstruction::new(
        ReilAddress::new(0x1000, 0),
        ReilOpcode::Add,
        ReilOperand::register("R1", OperandSize::Dword)?,
        ReilOperand::literal(1, OperandSize::Dword)?,
        ReilOperand::register("t0", OperandSize::Qword)?,
    )
}

fn store_instruction() -> reil::Result<ReilInstruction> {
    ReilInstruction::new(
        ReilAddress::new(0x1000, 0),
        ReilOpcode::Stm,
        ReilOperand::register("R1", OperandSize::Dword)?,
        ReilOperand::Empty,
        ReilOperand::literal(0x8000, OperandSize::Dword)?,
    )
}

fn setup_single(
    instruction: fn() -> reil::Result<ReilInstruction>,
) -> (ReilInterpreter<ArmPolicy>, ReilInstruction) {
    let mut interpreter = ReilInterpreter::new(ArmPolicy, InterpreterConfig::default());
    interpreter
        .set_register("R1", 0xffff_ffff, OperandSize::Dword, RegisterStatus::Defined)
        .expect("failed to initialize register");

    let instruction = instruction().expect("failed to build instruction");
    (interpreter, instruction)
}

fn engine(c: &mut Criterion) {
    let ldrsb = vec![NativeInstruction::new(
        0x100,
        "LDRSB",
        vec![reg("R2"), post_indexed("R1", "8")],
    )];
    c.bench_function("translate_ldrsb", |b| b.iter(|| translate(&ldrsb)));

    let program = array_sum();
    c.bench_function("translate_array_sum", |b| b.iter(|| translate(&program)));

    c.bench_function("execute_add", |b| {
        b.iter_batched(
            || setup_single(add_instruction),
            |(mut interpreter, instruction)| {
                interpreter
                    .execute(&instruction)
                    .expect("failed to execute instruction")
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("execute_store", |b| {
        b.iter_batched(
            || setup_single(store_instruction),
            |(mut interpreter, instruction)| {
                interpreter
                    .execute(&instruction)
                    .expect("failed to execute instruction")
            },
            BatchSize::SmallInput,
        )
    });

    let program = ReilProgram::new(translate(&array_sum())).expect("failed to build program");
    c.bench_function("interpret_array_sum", |b| {
        b.iter_batched(
            setup_array_sum,
            |mut interpreter| {
                interpreter
                    .interpret(&program, 0x1000, None)
                    .expect("failed to interpret program")
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, engine);
criterion_main!(benches);
