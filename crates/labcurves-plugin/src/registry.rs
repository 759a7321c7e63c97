//! Procedure registration.
//!
//! Descriptors mirror what a host's procedure database records for a
//! plug-in: identity, documentation, menu placement and parameters. The
//! registry validates arguments against the descriptor before running.

use labcurves_core::{DrawableId, ImageId};
use labcurves_host::Host;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PluginConfig;
use crate::error::{PluginError, PluginResult};
use crate::procedure::{apply_lab_curves, SourceMode};

/// Identifier the curves procedure is registered under.
pub const LAB_CURVES_PROCEDURE: &str = "plug-in-lab-curves-extern";

/// One choice of a radio parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioOption {
    pub label: String,
    pub value: i32,
}

/// Parameter widget kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Radio { options: Vec<RadioOption> },
}

/// Descriptor for a single procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub label: String,
    pub kind: ParamKind,
    pub default: i32,
}

impl ParamDescriptor {
    /// Check that `value` is acceptable for this parameter.
    pub fn validate(&self, value: i32) -> PluginResult<()> {
        match &self.kind {
            ParamKind::Radio { options } => {
                if options.iter().any(|o| o.value == value) {
                    Ok(())
                } else {
                    Err(PluginError::InvalidArgument(format!(
                        "{} = {value} is not one of {:?}",
                        self.name,
                        options.iter().map(|o| o.value).collect::<Vec<_>>()
                    )))
                }
            }
        }
    }
}

/// Everything the host needs to list and invoke a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDescriptor {
    pub identifier: String,
    pub blurb: String,
    pub help: String,
    pub author: String,
    pub copyright: String,
    pub date: String,
    /// Full menu path; `_` marks the mnemonic character.
    pub menu_path: String,
    /// Image types the procedure accepts; `*` for all.
    pub image_types: String,
    pub params: Vec<ParamDescriptor>,
    pub return_values: Vec<ParamDescriptor>,
}

impl ProcedureDescriptor {
    /// Menu item text without the mnemonic marker.
    pub fn menu_label(&self) -> String {
        self.menu_item().replacen('_', "", 1)
    }

    /// Accelerator character, if the menu item marks one.
    pub fn mnemonic(&self) -> Option<char> {
        let item = self.menu_item();
        let at = item.find('_')?;
        item[at + 1..].chars().next()
    }

    /// Menu path without the final item.
    pub fn menu_branch(&self) -> &str {
        self.menu_path
            .rsplit_once('/')
            .map(|(branch, _)| branch)
            .unwrap_or("")
    }

    fn menu_item(&self) -> &str {
        self.menu_path
            .rsplit_once('/')
            .map(|(_, item)| item)
            .unwrap_or(&self.menu_path)
    }

    /// Fill in defaults for missing trailing arguments and validate all of them.
    pub fn resolve_args(&self, args: &[i32]) -> PluginResult<Vec<i32>> {
        if args.len() > self.params.len() {
            return Err(PluginError::InvalidArgument(format!(
                "{} takes {} argument(s), got {}",
                self.identifier,
                self.params.len(),
                args.len()
            )));
        }
        self.params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let value = args.get(i).copied().unwrap_or(param.default);
                param.validate(value).map(|()| value)
            })
            .collect()
    }
}

/// Descriptor of the Lab curves procedure.
pub fn lab_curves_descriptor() -> ProcedureDescriptor {
    ProcedureDescriptor {
        identifier: LAB_CURVES_PROCEDURE.to_string(),
        blurb: "L*a*b* curves.".to_string(),
        help: "Apply 16 bit L*a*b* curves with an external binary.".to_string(),
        author: "Michael Munzert (mail mm-log com)".to_string(),
        copyright: "Copyright 2010 Michael Munzert".to_string(),
        date: "2010".to_string(),
        menu_path: "<Image>/Filters/MM-Filters/_Lab curves...".to_string(),
        image_types: "*".to_string(),
        params: vec![ParamDescriptor {
            name: "visible".to_string(),
            label: "Layer:".to_string(),
            kind: ParamKind::Radio {
                options: vec![
                    RadioOption {
                        label: "new from visible".to_string(),
                        value: SourceMode::NewFromVisible.as_param(),
                    },
                    RadioOption {
                        label: "current layer".to_string(),
                        value: SourceMode::CurrentLayer.as_param(),
                    },
                ],
            },
            default: SourceMode::default().as_param(),
        }],
        return_values: Vec::new(),
    }
}

/// Signature every registered procedure runs with.
pub type RunFn =
    fn(&mut dyn Host, ImageId, DrawableId, &[i32], &PluginConfig) -> PluginResult<()>;

fn run_lab_curves(
    host: &mut dyn Host,
    image: ImageId,
    drawable: DrawableId,
    args: &[i32],
    config: &PluginConfig,
) -> PluginResult<()> {
    let mode = SourceMode::from_param(args.first().copied().unwrap_or_default())?;
    apply_lab_curves(host, image, drawable, mode, config).map(|_| ())
}

struct Entry {
    descriptor: ProcedureDescriptor,
    run: RunFn,
}

/// Registered procedures, in registration order.
pub struct ProcedureRegistry {
    entries: Vec<Entry>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry holding the procedures this crate provides.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        // A fresh registry cannot hold a duplicate.
        let _ = registry.register(lab_curves_descriptor(), run_lab_curves);
        registry
    }

    pub fn register(&mut self, descriptor: ProcedureDescriptor, run: RunFn) -> PluginResult<()> {
        if self.get(&descriptor.identifier).is_some() {
            return Err(PluginError::Duplicate(descriptor.identifier));
        }
        info!(
            procedure = %descriptor.identifier,
            menu = %descriptor.menu_path,
            "Registered procedure"
        );
        self.entries.push(Entry { descriptor, run });
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&ProcedureDescriptor> {
        self.entries
            .iter()
            .map(|e| &e.descriptor)
            .find(|d| d.identifier == identifier)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ProcedureDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate `args` against the descriptor and run the procedure.
    pub fn run(
        &self,
        identifier: &str,
        host: &mut dyn Host,
        image: ImageId,
        drawable: DrawableId,
        args: &[i32],
        config: &PluginConfig,
    ) -> PluginResult<()> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.identifier == identifier)
            .ok_or_else(|| PluginError::NotFound(identifier.to_string()))?;
        let args = entry.descriptor.resolve_args(args)?;
        (entry.run)(host, image, drawable, &args, config)
    }

    /// All descriptors as pretty-printed JSON.
    pub fn describe_json(&self) -> PluginResult<String> {
        let descriptors: Vec<&ProcedureDescriptor> = self.descriptors().collect();
        serde_json::to_string_pretty(&descriptors).map_err(|e| PluginError::Config(e.to_string()))
    }
}

impl Default for ProcedureRegistry {
    fn default() -> Self {
        Self::new()
    }
}
