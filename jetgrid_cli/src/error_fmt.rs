//! Human-readable error descriptions, exit codes and structured JSON errors.

use jetgrid_core::{BuildError, GenError};
use jetgrid_hardware::error::HwError;

fn chain_text(err: &eyre::Report) -> String {
    err.chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Parser errors carry line and column, show them verbatim
    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML.\nDetails: {te}\nHow to fix: Correct the syntax at the reported position, then rerun."
        );
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingFieldA => {
                "What happened: No primary noise field was configured.\nLikely causes: The [field_a] table is missing.\nHow to fix: Add [field_a] with feature_size, t_step and seed.".to_string()
            }
            BuildError::MissingThreshold => {
                "What happened: No threshold policy was set.\nLikely causes: [threshold] has neither bw_threshold nor target_transparency.\nHow to fix: Set exactly one of them.".to_string()
            }
            BuildError::ConflictingThreshold => {
                "What happened: Both threshold policies were set.\nLikely causes: [threshold] has bw_threshold and target_transparency.\nHow to fix: Remove one of them.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ge) = err.downcast_ref::<GenError>() {
        return match ge {
            GenError::Config(_) => format!(
                "What happened: Invalid configuration.\nDetails: {}\nHow to fix: Edit the config file or arguments, then rerun.",
                chain_text(err)
            ),
            GenError::Timeout => {
                "What happened: The controller did not answer in time.\nLikely causes: Wrong serial port, controller busy or unpowered, or a reply timeout that is too short.\nHow to fix: Check the cable and --port, power-cycle the controller, or raise --reply-timeout.".to_string()
            }
            GenError::Device(msg) => format!(
                "What happened: The controller rejected the upload ({msg}).\nLikely causes: Program too long for the device, or a corrupted frame.\nHow to fix: Regenerate the protocol, check it with `jetgrid inspect`, then retry."
            ),
            GenError::Transport(msg) => format!(
                "What happened: Serial link failure ({msg}).\nLikely causes: Device unplugged or port opened by another program.\nHow to fix: Reconnect the controller and retry."
            ),
            GenError::Aborted => {
                "What happened: Upload interrupted.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Rerun the upload; the device keeps no partial program.".to_string()
            }
            GenError::Decode(msg) => format!(
                "What happened: The protocol file is malformed ({msg}).\nLikely causes: Truncated or hand-edited .bin file.\nHow to fix: Regenerate it with `jetgrid generate`."
            ),
            GenError::RunTooShort { valve, run, min } => format!(
                "What happened: Valve {valve} switches after only {run} frames (minimum {min}).\nLikely causes: Protocol generated with a lower min_valve_duration.\nHow to fix: Regenerate with protocol.min_valve_duration >= {min}."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: Could not talk to the controller ({hw}).\nLikely causes: Wrong --port or missing permission on the device node.\nHow to fix: Check the device path and that your user may open it (e.g. the dialout group)."
        );
    }

    if let Some(io) = err.downcast_ref::<std::io::Error>() {
        if io.kind() == std::io::ErrorKind::NotFound {
            return format!(
                "What happened: File not found.\nDetails: {}\nHow to fix: Check the path, or pass --config for a config elsewhere.",
                chain_text(err)
            );
        }
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {err}"
    )
}

/// Stable process exit codes by error kind.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<toml::de::Error>().is_some()
        || err.downcast_ref::<BuildError>().is_some()
    {
        return 2;
    }
    if let Some(ge) = err.downcast_ref::<GenError>() {
        return match ge {
            GenError::Config(_) => 2,
            GenError::Invariant(_) | GenError::Decode(_) => 3,
            GenError::Device(_) | GenError::Transport(_) | GenError::Timeout => 4,
            GenError::Aborted => 5,
            GenError::RunTooShort { .. } => 6,
            GenError::Io(_) => 1,
        };
    }
    if err.downcast_ref::<HwError>().is_some() {
        return 4;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<toml::de::Error>().is_some() {
        return "ConfigSyntax";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    if let Some(ge) = err.downcast_ref::<GenError>() {
        return match ge {
            GenError::Config(_) => "InvalidConfig",
            GenError::Invariant(_) => "Invariant",
            GenError::Decode(_) => "MalformedProtocol",
            GenError::Transport(_) => "Transport",
            GenError::Device(_) => "DeviceRejected",
            GenError::Timeout => "Timeout",
            GenError::Aborted => "Aborted",
            GenError::RunTooShort { .. } => "RunTooShort",
            GenError::Io(_) => "Io",
        };
    }
    if err.downcast_ref::<HwError>().is_some() {
        return "Transport";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "message": humanize(err),
        "exit_code": exit_code_for_error(err),
    });
    if let Some(GenError::RunTooShort { valve, run, min }) = err.downcast_ref::<GenError>() {
        obj["details"] = json!({ "valve": valve, "run": run, "min": min });
    }
    obj.to_string()
}
