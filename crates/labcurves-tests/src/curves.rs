//! Successful runs of the curves procedure.

use labcurves_host::{Host, MemoryHost};
use labcurves_plugin::registry::LAB_CURVES_PROCEDURE;
use labcurves_plugin::{apply_lab_curves, ProcedureRegistry, SourceMode};

use crate::fixture::{all_pixels, Fixture, GREEN, RED};

// ── Current layer ──────────────────────────────────────────────

#[test]
fn current_layer_adds_exactly_one_layer() {
    let mut fx = Fixture::new();
    let config = fx.replacing_tool(GREEN);

    let outcome = apply_lab_curves(
        &mut fx.host,
        fx.image,
        fx.background,
        SourceMode::CurrentLayer,
        &config,
    )
    .expect("curves run");

    assert_eq!(outcome.source, fx.background);
    assert!(outcome.composited.is_none());
    assert!(outcome.tool_status.success());
    assert_eq!(
        fx.host.layer_ids(fx.image).unwrap(),
        vec![outcome.result, fx.background]
    );
    assert_eq!(fx.host.layer_name(outcome.result).unwrap(), "Lab curves result");
    assert_eq!(fx.host.active_drawable(fx.image).unwrap(), outcome.result);
}

#[test]
fn current_layer_leaves_original_pixels_alone() {
    let mut fx = Fixture::new();
    let config = fx.replacing_tool(GREEN);
    let before = fx.host.layer_pixels(fx.background).unwrap().clone();

    let outcome = apply_lab_curves(
        &mut fx.host,
        fx.image,
        fx.background,
        SourceMode::CurrentLayer,
        &config,
    )
    .expect("curves run");

    assert_eq!(fx.host.layer_pixels(fx.background).unwrap(), &before);
    assert!(all_pixels(fx.host.layer_pixels(outcome.result).unwrap(), GREEN));
    assert!(all_pixels(&fx.host.flatten(fx.image).unwrap(), GREEN));
}

#[test]
fn result_layer_sits_directly_above_source() {
    let mut fx = Fixture::new();
    let overlay = fx.add_overlay();
    fx.host.set_active(fx.image, fx.background).unwrap();
    let config = fx.replacing_tool(GREEN);

    let outcome = apply_lab_curves(
        &mut fx.host,
        fx.image,
        fx.background,
        SourceMode::CurrentLayer,
        &config,
    )
    .expect("curves run");

    assert_eq!(
        fx.host.layer_ids(fx.image).unwrap(),
        vec![overlay, outcome.result, fx.background]
    );
}

// ── New from visible ───────────────────────────────────────────

#[test]
fn visible_adds_composited_layer_and_result_layer() {
    let mut fx = Fixture::new();
    let overlay = fx.add_overlay();
    let composite_before = fx.host.flatten(fx.image).unwrap();
    let config = fx.replacing_tool(GREEN);

    let outcome = apply_lab_curves(
        &mut fx.host,
        fx.image,
        overlay,
        SourceMode::NewFromVisible,
        &config,
    )
    .expect("curves run");

    let composited = outcome.composited.expect("composited layer");
    assert_eq!(outcome.source, composited);
    assert_eq!(
        fx.host.layer_ids(fx.image).unwrap(),
        vec![outcome.result, composited, overlay, fx.background]
    );
    assert_eq!(fx.host.layer_name(composited).unwrap(), "Lab curves");
    assert_eq!(fx.host.layer_pixels(composited).unwrap(), &composite_before);
    assert!(all_pixels(fx.host.layer_pixels(outcome.result).unwrap(), GREEN));
    assert!(all_pixels(fx.host.layer_pixels(fx.background).unwrap(), RED));
}

// ── Cleanup and bookkeeping ────────────────────────────────────

#[test]
fn success_leaves_no_temporary_artifacts() {
    for mode in [SourceMode::CurrentLayer, SourceMode::NewFromVisible] {
        let mut fx = Fixture::new();
        let config = fx.replacing_tool(GREEN);

        apply_lab_curves(&mut fx.host, fx.image, fx.background, mode, &config)
            .expect("curves run");

        assert!(fx.scratch_files().is_empty(), "{mode:?}: temp file left");
        assert!(fx.host.buffer_names().is_empty(), "{mode:?}: buffers left");
        assert_eq!(fx.host.image_ids(), vec![fx.image], "{mode:?}: carrier left");
        assert_eq!(fx.host.detached_count(), 0, "{mode:?}: detached layers left");
        assert!(!fx.host.has_floating(fx.image).unwrap());
    }
}

#[test]
fn success_opens_and_closes_one_undo_group() {
    let mut fx = Fixture::new();
    let config = fx.replacing_tool(GREEN);

    apply_lab_curves(
        &mut fx.host,
        fx.image,
        fx.background,
        SourceMode::NewFromVisible,
        &config,
    )
    .expect("curves run");

    let stats = fx.host.stats();
    assert_eq!(stats.undo_groups_opened, 1);
    assert_eq!(stats.undo_groups_closed, 1);
    assert_eq!(fx.host.open_undo_groups(fx.image).unwrap(), 0);
    assert_eq!(fx.host.undo_steps(fx.image).unwrap(), 1);
}

#[test]
fn single_undo_reverts_the_whole_run() {
    let mut fx = Fixture::new();
    fx.add_overlay();
    let layers_before = fx.host.layer_ids(fx.image).unwrap();
    let composite_before = fx.host.flatten(fx.image).unwrap();
    let config = fx.replacing_tool(GREEN);

    apply_lab_curves(
        &mut fx.host,
        fx.image,
        fx.background,
        SourceMode::NewFromVisible,
        &config,
    )
    .expect("curves run");

    assert!(fx.host.undo(fx.image).unwrap());
    assert_eq!(fx.host.layer_ids(fx.image).unwrap(), layers_before);
    assert_eq!(fx.host.flatten(fx.image).unwrap(), composite_before);
    assert!(!fx.host.undo(fx.image).unwrap());
}

#[test]
fn success_marks_dirty_reports_progress_and_flushes() {
    let mut fx = Fixture::new();
    let config = fx.replacing_tool(GREEN);
    assert!(!fx.host.is_dirty(fx.image).unwrap());

    apply_lab_curves(
        &mut fx.host,
        fx.image,
        fx.background,
        SourceMode::CurrentLayer,
        &config,
    )
    .expect("curves run");

    assert!(fx.host.is_dirty(fx.image).unwrap());
    let stats = fx.host.stats();
    assert_eq!(
        stats.progress_messages,
        vec!["Saving a copy".to_string(), "Running LabCurves...".to_string()]
    );
    assert_eq!(stats.progress_pulses, 1);
    assert_eq!(stats.display_flushes, 1);
}

#[test]
fn tool_receives_exactly_one_existing_tiff() {
    let mut fx = Fixture::with_scratch_name("scratch with spaces");
    let processed = fx.tools.join("processed.tif");
    labcurves_host::codec::write_tiff(
        &labcurves_core::Raster::filled(4, 4, GREEN),
        &processed,
    )
    .unwrap();
    let config = fx.tool(&format!(
        "[ \"$#\" -eq 1 ] || exit 11\ncase \"$1\" in *.tif) ;; *) exit 12 ;; esac\n[ -s \"$1\" ] || exit 13\ncp '{}' \"$1\"\n",
        processed.display()
    ));

    apply_lab_curves(
        &mut fx.host,
        fx.image,
        fx.background,
        SourceMode::CurrentLayer,
        &config,
    )
    .expect("curves run");
    assert!(fx.scratch_files().is_empty());
}

#[test]
fn unchanged_file_is_accepted_when_rewrite_not_required() {
    let mut fx = Fixture::new();
    let mut config = fx.tool("exit 0\n");
    config.tool.require_rewrite = false;

    let outcome = apply_lab_curves(
        &mut fx.host,
        fx.image,
        fx.background,
        SourceMode::CurrentLayer,
        &config,
    )
    .expect("curves run");

    assert!(all_pixels(fx.host.layer_pixels(outcome.result).unwrap(), RED));
    assert_eq!(fx.host.layer_count(fx.image).unwrap(), 2);
}

// ── Through the registry ───────────────────────────────────────

#[test]
fn registry_runs_with_default_argument() {
    let mut fx = Fixture::new();
    let config = fx.replacing_tool(GREEN);
    let registry = ProcedureRegistry::with_builtin();

    registry
        .run(
            LAB_CURVES_PROCEDURE,
            &mut fx.host,
            fx.image,
            fx.background,
            &[],
            &config,
        )
        .expect("registry run");

    // Default is "new from visible": composited layer plus result layer.
    assert_eq!(fx.host.layer_count(fx.image).unwrap(), 3);
}

#[test]
fn registry_runs_current_layer_argument() {
    let mut fx = Fixture::new();
    let config = fx.replacing_tool(GREEN);
    let registry = ProcedureRegistry::with_builtin();
    let host: &mut MemoryHost = &mut fx.host;

    registry
        .run(
            LAB_CURVES_PROCEDURE,
            host,
            fx.image,
            fx.background,
            &[SourceMode::CurrentLayer.as_param()],
            &config,
        )
        .expect("registry run");

    assert_eq!(fx.host.layer_count(fx.image).unwrap(), 2);
}

// ── Configuration ──────────────────────────────────────────────

#[test]
fn non_tiff_temp_extension_still_reloads() {
    for extension in ["tmp", "dat", ""] {
        let mut fx = Fixture::new();
        let mut config = fx.replacing_tool(GREEN);
        config.temp_extension = extension.to_string();

        let outcome = apply_lab_curves(
            &mut fx.host,
            fx.image,
            fx.background,
            SourceMode::CurrentLayer,
            &config,
        )
        .unwrap_or_else(|e| panic!("extension {extension:?}: {e}"));

        assert!(all_pixels(fx.host.layer_pixels(outcome.result).unwrap(), GREEN));
        assert!(fx.scratch_files().is_empty(), "extension {extension:?}: temp file left");
    }
}
