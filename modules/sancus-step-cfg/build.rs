use std::env;
use std::fs;
use std::path::PathBuf;

// name of the env var, default value
const LATENCIES: [(&str, u16); 3] = [
    ("SANCUS_STEP_INIT_LATENCY", 42),
    ("SANCUS_STEP_HW_IRQ_LATENCY", 34),
    ("SANCUS_STEP_RESUME_LATENCY", 0x41),
];
const STACK_SIZE_VAR: &str = "SANCUS_STEP_ISR_STACK_SIZE";
const STACK_SIZE_DEFAULT: usize = 512;

fn parse_u16(text: &str) -> Option<u16> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let mut generated = String::new();
    let mut values = [0u16; 3];
    for (slot, (var, default)) in values.iter_mut().zip(LATENCIES) {
        println!("cargo:rerun-if-env-changed={}", var);
        let value = match env::var(var) {
            Ok(text) => parse_u16(text.trim())
                .unwrap_or_else(|| panic!("{} must be a 16-bit cycle count, got {:?}", var, text)),
            Err(_) => default,
        };
        if value == 0 {
            panic!("{} must not be zero", var);
        }
        *slot = value;
        let name = var.trim_start_matches("SANCUS_STEP_");
        generated.push_str(&format!("pub(crate) const MEASURED_{}: u16 = {:#x};\n", name, value));
    }
    let [_, hw_irq_latency, resume_latency] = values;
    // the resume path includes at least one stepped instruction
    if resume_latency < hw_irq_latency {
        panic!(
            "SANCUS_STEP_RESUME_LATENCY ({}) must not be below SANCUS_STEP_HW_IRQ_LATENCY ({})",
            resume_latency, hw_irq_latency
        );
    }

    println!("cargo:rerun-if-env-changed={}", STACK_SIZE_VAR);
    let stack_words: usize = env::var(STACK_SIZE_VAR)
        .ok()
        .map(|text| {
            text.trim()
                .parse()
                .unwrap_or_else(|_| {
                    panic!("{} must be a word count, got {:?}", STACK_SIZE_VAR, text)
                })
        })
        .unwrap_or(STACK_SIZE_DEFAULT);
    // two words of resume frame plus the callback's return address
    if stack_words < 4 {
        panic!("{} must leave room for the resume frame", STACK_SIZE_VAR);
    }
    generated.push_str(&format!(
        "pub(crate) const MEASURED_ISR_STACK_SIZE: usize = {};\n",
        stack_words
    ));

    let out = PathBuf::from(env::var_os("OUT_DIR").expect("cargo sets OUT_DIR"));
    fs::write(out.join("calibration.rs"), generated).expect("failed to write calibration.rs");
}
