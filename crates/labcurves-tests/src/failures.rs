//! Failing tool runs: every one must surface as an error and leave the
//! host exactly as clean as a successful run does.

use std::path::PathBuf;

use labcurves_core::{Offset, Raster};
use labcurves_plugin::{apply_lab_curves, PluginConfig, PluginError, SourceMode, ToolConfig};

use crate::fixture::{all_pixels, Fixture, RED};

fn run(fx: &mut Fixture, mode: SourceMode, config: &PluginConfig) -> PluginError {
    apply_lab_curves(&mut fx.host, fx.image, fx.background, mode, config)
        .expect_err("run should fail")
}

/// Nothing of the run is left behind and the image is untouched.
fn assert_clean(fx: &Fixture, layers: usize) {
    assert!(fx.scratch_files().is_empty(), "temp file left behind");
    assert!(fx.host.buffer_names().is_empty(), "named buffers left behind");
    assert_eq!(fx.host.image_ids(), vec![fx.image], "carrier image left behind");
    assert_eq!(fx.host.detached_count(), 0);
    assert!(!fx.host.has_floating(fx.image).unwrap());

    let stats = fx.host.stats();
    assert_eq!(stats.undo_groups_opened, 1);
    assert_eq!(stats.undo_groups_closed, 1);
    assert_eq!(stats.display_flushes, 0);
    assert_eq!(fx.host.open_undo_groups(fx.image).unwrap(), 0);

    assert_eq!(fx.host.layer_count(fx.image).unwrap(), layers);
    assert!(all_pixels(fx.host.layer_pixels(fx.background).unwrap(), RED));
}

#[test]
fn nonzero_exit_is_tool_failed() {
    let mut fx = Fixture::new();
    let config = fx.tool("echo 'cannot parse curve' >&2\nexit 2\n");

    let err = run(&mut fx, SourceMode::CurrentLayer, &config);

    match err {
        PluginError::ToolFailed { status, stderr } => {
            assert_eq!(status.code(), Some(2));
            assert!(stderr.contains("cannot parse curve"));
        }
        other => panic!("expected ToolFailed, got {other}"),
    }
    assert_clean(&fx, 1);
}

#[test]
fn failure_in_visible_mode_is_undone_in_one_step() {
    let mut fx = Fixture::new();
    fx.add_overlay();
    let layers_before = fx.host.layer_ids(fx.image).unwrap();
    let config = fx.tool("exit 1\n");

    let err = run(&mut fx, SourceMode::NewFromVisible, &config);
    assert!(matches!(err, PluginError::ToolFailed { .. }));

    // The composited layer was added before the tool ran.
    assert_clean(&fx, 3);
    assert!(fx.host.undo(fx.image).unwrap());
    assert_eq!(fx.host.layer_ids(fx.image).unwrap(), layers_before);
}

#[test]
fn untouched_file_is_rejected_by_default() {
    let mut fx = Fixture::new();
    let config = fx.tool("exit 0\n");
    assert!(config.tool.require_rewrite);

    let err = run(&mut fx, SourceMode::CurrentLayer, &config);

    let PluginError::ToolDidNotRewrite(path) = &err else {
        panic!("expected ToolDidNotRewrite, got {err}");
    };
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("tif"));
    assert!(path.starts_with(&fx.scratch));
    assert_clean(&fx, 1);
}

#[test]
fn deleted_file_is_output_missing() {
    let mut fx = Fixture::new();
    let config = fx.tool("rm \"$1\"\n");

    let err = run(&mut fx, SourceMode::CurrentLayer, &config);

    assert!(matches!(err, PluginError::OutputMissing(_)), "got {err}");
    assert_clean(&fx, 1);
}

#[test]
fn unreadable_output_is_reload_error() {
    let mut fx = Fixture::new();
    let config = fx.tool("printf 'not a tiff' > \"$1\"\n");

    let err = run(&mut fx, SourceMode::CurrentLayer, &config);

    match &err {
        PluginError::Reload { path, .. } => assert!(path.starts_with(&fx.scratch)),
        other => panic!("expected Reload, got {other}"),
    }
    assert!(err.to_string().contains("reload"), "message: {err}");
    assert_clean(&fx, 1);
}

#[test]
fn missing_binary_is_spawn_error() {
    let mut fx = Fixture::new();
    let config = PluginConfig {
        tool: ToolConfig {
            binary: Some(PathBuf::from("/nonexistent/LabCurves/LabCurves")),
            ..ToolConfig::default()
        },
        ..PluginConfig::default()
    };

    let err = run(&mut fx, SourceMode::NewFromVisible, &config);

    assert!(matches!(err, PluginError::ToolSpawn { .. }), "got {err}");
    assert!(err.to_string().contains("/nonexistent/LabCurves/LabCurves"));
    assert_clean(&fx, 2);
}

#[test]
fn empty_layer_cannot_become_a_carrier() {
    let mut fx = Fixture::new();
    let empty = fx
        .host
        .insert_layer(fx.image, "Empty", Raster::new(0, 0), Offset::ZERO)
        .expect("insert empty layer");
    let config = fx.tool("exit 0\n");

    let err = apply_lab_curves(&mut fx.host, fx.image, empty, SourceMode::CurrentLayer, &config)
        .expect_err("run should fail");

    assert!(matches!(err, PluginError::CarrierCreation(_)), "got {err}");
    assert!(err.to_string().contains("carrier"));
    assert_clean(&fx, 2);
}
