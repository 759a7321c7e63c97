//! Shared scene and stub-tool helpers.

use std::fs;
use std::path::{Path, PathBuf};

use labcurves_core::{DrawableId, ImageId, Offset, Pixel, Raster};
use labcurves_host::codec;
use labcurves_host::MemoryHost;
use labcurves_plugin::{PluginConfig, ToolConfig};
use tempfile::TempDir;

pub const RED: Pixel = [u16::MAX, 0, 0, u16::MAX];
pub const GREEN: Pixel = [0, u16::MAX, 0, u16::MAX];
pub const HALF_BLUE: Pixel = [0, 0, u16::MAX, 32768];

pub const SIZE: u32 = 4;

/// A 4x4 image with one opaque red layer, plus directories for stub
/// tools and for the host's temporary files.
pub struct Fixture {
    _root: TempDir,
    pub tools: PathBuf,
    pub scratch: PathBuf,
    pub host: MemoryHost,
    pub image: ImageId,
    pub background: DrawableId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_scratch_name("scratch")
    }

    /// Same scene, with the temporary directory named `name`.
    pub fn with_scratch_name(name: &str) -> Self {
        let root = tempfile::tempdir().expect("failed to create tempdir");
        let tools = root.path().join("tools");
        let scratch = root.path().join(name);
        fs::create_dir_all(&tools).expect("create tools dir");
        fs::create_dir_all(&scratch).expect("create scratch dir");

        let mut host = MemoryHost::new(&scratch);
        let image = host.create_image(SIZE, SIZE);
        let background = host
            .insert_layer(image, "Background", Raster::filled(SIZE, SIZE, RED), Offset::ZERO)
            .expect("insert background");

        Self {
            _root: root,
            tools,
            scratch,
            host,
            image,
            background,
        }
    }

    /// Add a half-transparent blue 2x2 layer at (2, 2) on top.
    pub fn add_overlay(&mut self) -> DrawableId {
        self.host
            .insert_layer(
                self.image,
                "Overlay",
                Raster::filled(2, 2, HALF_BLUE),
                Offset::new(2, 2),
            )
            .expect("insert overlay")
    }

    /// Configuration running `script` through `/bin/sh`.
    pub fn tool(&self, script: &str) -> PluginConfig {
        let path = self.tools.join("LabCurves.sh");
        fs::write(&path, script).expect("write stub tool");
        PluginConfig {
            tool: ToolConfig {
                binary: Some(PathBuf::from("/bin/sh")),
                args: vec![path.to_string_lossy().into_owned()],
                ..ToolConfig::default()
            },
            ..PluginConfig::default()
        }
    }

    /// A stub that overwrites its argument with a `SIZE`x`SIZE` TIFF of `pixel`.
    pub fn replacing_tool(&self, pixel: Pixel) -> PluginConfig {
        let processed = self.tools.join("processed.tif");
        codec::write_tiff(&Raster::filled(SIZE, SIZE, pixel), &processed)
            .expect("write processed tiff");
        self.tool(&format!("cp '{}' \"$1\"\n", processed.display()))
    }

    /// Files left in the host's temporary directory.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        list(&self.scratch)
    }
}

fn list(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .expect("read scratch dir")
        .map(|entry| entry.expect("dir entry").path())
        .collect()
}

/// True when every pixel of `raster` equals `pixel`.
pub fn all_pixels(raster: &Raster, pixel: Pixel) -> bool {
    raster
        .as_raw()
        .chunks_exact(Raster::CHANNELS)
        .all(|px| px == pixel)
}
