//! Command-line construction for the external scoring tool.

use std::path::Path;

use crate::model::RunConfig;

fn push_value(args: &mut Vec<String>, display: &mut Vec<String>, value: String) {
    display.push(value.clone());
    args.push(value);
}

fn push_path(args: &mut Vec<String>, display: &mut Vec<String>, path: &Path) {
    args.push(path.to_string_lossy().into_owned());
    display.push(format!("\"{}\"", path.display()));
}

/// Build the argv tail for the scoring tool (everything after the runner).
///
/// Returns `(args, display)`: `args` is what the child is spawned with,
/// `display` mirrors it with file paths quoted for human-readable diagnostics.
/// Pure function; performs no I/O. Flag order is fixed and `--port` is always
/// last.
pub fn build_arguments(cfg: &RunConfig) -> (Vec<String>, Vec<String>) {
    let mut args = Vec::new();
    let mut display = Vec::new();

    push_path(&mut args, &mut display, &cfg.tool);
    push_path(&mut args, &mut display, &cfg.source);
    push_path(&mut args, &mut display, &cfg.encoded);
    push_path(&mut args, &mut display, &cfg.scores_output);

    if let Some(method) = cfg.method {
        push_value(&mut args, &mut display, "--method".into());
        push_value(&mut args, &mut display, method.as_arg_str().into());
    }
    if let Some(importer) = cfg.importer {
        push_value(&mut args, &mut display, "--importer".into());
        push_value(&mut args, &mut display, importer.as_arg_str().into());
    }
    if let Some(importer) = cfg.source_importer {
        push_value(&mut args, &mut display, "--source-importer".into());
        push_value(&mut args, &mut display, importer.as_arg_str().into());
    }
    if let Some(importer) = cfg.encoded_importer {
        push_value(&mut args, &mut display, "--encoded-importer".into());
        push_value(&mut args, &mut display, importer.as_arg_str().into());
    }
    if let Some(threads) = cfg.threads {
        push_value(&mut args, &mut display, "--threads".into());
        push_value(&mut args, &mut display, threads.to_string());
    }
    if let Some((width, height)) = cfg.dimensions {
        push_value(&mut args, &mut display, "--width".into());
        push_value(&mut args, &mut display, width.to_string());
        push_value(&mut args, &mut display, "--height".into());
        push_value(&mut args, &mut display, height.to_string());
    }
    if let Some(every) = cfg.every {
        push_value(&mut args, &mut display, "--every".into());
        push_value(&mut args, &mut display, every.to_string());
    }
    if cfg.progress {
        push_value(&mut args, &mut display, "--progress".into());
    }
    push_value(&mut args, &mut display, "--port".into());
    push_value(&mut args, &mut display, cfg.port.to_string());

    (args, display)
}
