//! Code generation for Mare.
//!
//! The emitter lowers the AST to LLVM IR through inkwell and hands the
//! finished module to the native back end:
//!
//! ```text
//! AST -> CodegenContext -> LLVM IR -> optimisation pipeline -> object file
//! ```
//!
//! The IR produced by [`CodegenContext`] must be correct on its own; the
//! optimisation pipeline is run for performance only.

pub mod context;
pub mod runtime;

pub use context::CodegenContext;

use std::path::Path;

use inkwell::module::Module;
use inkwell::passes::PassManager;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};
use inkwell::OptimizationLevel;

use crate::diagnostics::CompileError;

/// Build a target machine for the host, with its CPU and feature set.
pub fn host_target_machine() -> Result<TargetMachine, CompileError> {
    Target::initialize_native(&InitializationConfig::default())
        .map_err(|e| CompileError::Backend(format!("failed to initialize native target: {e}")))?;

    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple)
        .map_err(|e| CompileError::Backend(format!("failed to look up target: {e}")))?;

    let cpu = TargetMachine::get_host_cpu_name();
    let features = TargetMachine::get_host_cpu_features();

    target
        .create_target_machine(
            &triple,
            cpu.to_str().unwrap_or("generic"),
            features.to_str().unwrap_or(""),
            OptimizationLevel::Aggressive,
            RelocMode::PIC,
            CodeModel::Default,
        )
        .ok_or_else(|| CompileError::Backend("failed to create target machine".to_string()))
}

/// Run the module optimisation pipeline: mem2reg first so allocation slots
/// become SSA values, then inlining, instruction combining, reassociation,
/// GVN, and CFG simplification.
fn optimize_module(module: &Module) {
    let mpm: PassManager<Module> = PassManager::create(());
    mpm.add_promote_memory_to_register_pass();
    mpm.add_function_inlining_pass();
    mpm.add_instruction_combining_pass();
    mpm.add_reassociate_pass();
    mpm.add_gvn_pass();
    mpm.add_cfg_simplification_pass();
    mpm.run_on(module);
}

/// Configure the module for the host target, verify it, optimise it, and
/// serialize it to a native object file.
pub fn emit_object(module: &Module, output: &Path) -> Result<(), CompileError> {
    let target_machine = host_target_machine()?;

    let target_data = target_machine.get_target_data();
    module.set_data_layout(&target_data.get_data_layout());
    module.set_triple(&target_machine.get_triple());

    if let Err(err) = module.verify() {
        return Err(CompileError::Backend(format!(
            "module verification failed: {}",
            err.to_string()
        )));
    }

    optimize_module(module);

    target_machine
        .write_to_file(module, FileType::Object, output)
        .map_err(|e| {
            CompileError::Backend(format!("failed to write object file: {}", e.to_string()))
        })
}
