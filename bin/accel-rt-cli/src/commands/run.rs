// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-rt run` command: load a model and run inference.
//!
//! Walks the engine lifecycle:
//! ```text
//! InferenceEngine<Idle> → initialize → <Ready> → load_model → run → release → <Idle>
//! ```

use super::{banner, build_engine};
use runtime::{
    BatchOutput, InferenceEngine, InferenceOutput, ModelFormat, Ready, RuntimeConfig,
    RuntimeError,
};
use std::path::{Path, PathBuf};

/// Size of the stand-in model used when the model file is missing.
const SYNTHETIC_MODEL_BYTES: usize = 4 << 20;

pub async fn execute(
    config: RuntimeConfig,
    model: PathBuf,
    format: Option<String>,
    input_len: usize,
    batch: usize,
) -> anyhow::Result<()> {
    banner("Inference Runner");

    let format = format.map(|f| f.parse::<ModelFormat>()).transpose()?;
    anyhow::ensure!(input_len > 0, "--input-len must be at least 1");

    println!("  Config:");
    println!("   Model:        {}", model.display());
    println!("   Accelerator:  {}", config.accelerator);
    println!("   Profile:      {}", config.power_profile);
    println!("   Threads:      {}", config.resolve_threads());
    println!(
        "   Memory limit: {}",
        config.memory_limit.as_deref().unwrap_or("none")
    );
    println!(
        "   Hardware:     {}",
        if config.enable_hardware_acceleration {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("   Input:        {batch} × {input_len} f32");
    println!();

    // Step 1: Idle → Ready (create and initialize the accelerator).
    println!("  [1/3] Initializing accelerator...");
    let (mut engine, errors) = build_engine(&config)?;
    let desc = engine.accelerator_descriptor();
    println!("        {}", desc.summary());
    if !engine.accelerator().is_available() {
        println!("        Hardware not present; calls will use the CPU fallback path.");
    }
    println!();

    // Step 2: load the model.
    println!("  [2/3] Loading model...");
    load_or_synthesize(&mut engine, &config, &model, format)?;
    println!("        {}", engine.model_info());
    println!();

    // Step 3: run.
    println!("  [3/3] Running inference...");
    let inputs: Vec<Vec<f32>> = (0..batch.max(1))
        .map(|b| (0..input_len).map(|i| ((i + b) % 255) as f32 / 255.0).collect())
        .collect();

    if inputs.len() == 1 {
        let output = engine.run_inference(&inputs[0])?;
        print_single(&output);
    } else {
        let output = engine.run_batch_inference(&inputs)?;
        print_batch(&output);
    }

    println!("  Health:");
    println!("   {}", errors.system_status());
    let reported = errors.error_history().len();
    if reported > 0 {
        println!("   {reported} error(s) reported during the run (see -v output)");
    }
    println!();

    engine.release_resources();
    Ok(())
}

/// Loads `path`, or a synthetic buffer when the file does not exist.
fn load_or_synthesize(
    engine: &mut InferenceEngine<Ready>,
    config: &RuntimeConfig,
    path: &Path,
    format: Option<ModelFormat>,
) -> anyhow::Result<()> {
    match engine.load_model(path, format, config.model_config()) {
        Ok(()) => Ok(()),
        Err(RuntimeError::ModelLoad { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            tracing::warn!("model file not found: {}", path.display());
            println!("        Model file not found. Running synthetic demo...");
            let format = match format {
                Some(f) => f,
                None => ModelFormat::from_path(path).unwrap_or(ModelFormat::TfLite),
            };
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "synthetic".to_string());
            engine.load_model_from_bytes(
                &name,
                vec![0; SYNTHETIC_MODEL_BYTES],
                format,
                config.model_config(),
            )?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_single(output: &InferenceOutput) {
    println!();
    println!("  Results:");
    println!("   Output values: {}", output.values.len());
    println!("   Head: {}", preview(&output.values));
    println!();
    if let Some(m) = &output.metrics {
        println!("  Metrics:");
        println!("   {}", m.summary());
        println!();
    }
}

fn print_batch(output: &BatchOutput) {
    println!();
    println!("  Results:");
    println!(
        "   {}/{} items succeeded",
        output.succeeded(),
        output.outputs.len()
    );
    for f in &output.failures {
        println!("   item {}: {}", f.index, f.error);
    }
    if let Some(first) = output.outputs.iter().flatten().next() {
        println!("   First output head: {}", preview(first));
    }
    println!();
    if let Some(m) = &output.metrics {
        println!("  Metrics (batch):");
        println!("   {}", m.summary());
        println!();
    }
}

/// Formats up to the first five values.
fn preview(values: &[f32]) -> String {
    let head: Vec<String> = values.iter().take(5).map(|v| format!("{v:.3}")).collect();
    format!(
        "[{}{}]",
        head.join(", "),
        if values.len() > 5 { ", ..." } else { "" }
    )
}
