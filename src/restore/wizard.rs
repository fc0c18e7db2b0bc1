//! Interactive restore wizard
//!
//! The wizard is a state machine over the restore decisions:
//! file, version, optional preview/diff, destination, confirmation. Input
//! comes from a [`Prompter`]; the wizard only resolves and never copies, so
//! a finished run yields a [`RestorePlan`] for the caller to execute.

use std::path::{Path, PathBuf};

use super::diff::{FileDiff, Preview};
use super::resolver::{default_destination, map_path, RestorePlan, RestoreResolver};
use crate::error::AeonResult;
use crate::models::SnapshotId;

/// What to do after a version has been picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    /// Show the first lines of the chosen version
    Preview,
    /// Diff the chosen version against another snapshot
    DiffWith(SnapshotId),
    /// Diff the chosen version against the file on disk
    DiffLocal,
    /// Go back to version selection
    Back,
    /// Move on to the destination
    Continue,
}

/// Source of the wizard's decisions
///
/// Every `select_*` returning `None` cancels the wizard.
pub trait Prompter {
    /// Local path of the file or directory to restore
    fn select_file(&mut self) -> AeonResult<Option<PathBuf>>;

    /// Pick one of the snapshots holding the file, oldest first
    fn select_version(&mut self, file: &Path, versions: &[SnapshotId]) -> AeonResult<Option<SnapshotId>>;

    /// Decide whether to look at the chosen version first
    fn inspect(&mut self, file: &Path, version: &SnapshotId) -> AeonResult<Inspection>;

    fn show_preview(&mut self, preview: &Preview);

    fn show_diff(&mut self, diff: &FileDiff);

    /// Where to write the restored copy
    fn select_destination(&mut self, default: &Path) -> AeonResult<Option<PathBuf>>;

    /// Last chance to back out
    fn confirm(&mut self, plan: &RestorePlan) -> AeonResult<bool>;

    /// Informational message, such as a failed lookup
    fn notify(&mut self, message: &str);
}

/// Wizard state
#[derive(Debug, Clone, PartialEq)]
pub enum WizardState {
    SelectFile,
    SelectVersion {
        local: PathBuf,
        file: PathBuf,
        versions: Vec<SnapshotId>,
    },
    Inspect {
        local: PathBuf,
        file: PathBuf,
        versions: Vec<SnapshotId>,
        version: SnapshotId,
    },
    SelectDestination {
        local: PathBuf,
        file: PathBuf,
        version: SnapshotId,
    },
    Confirm(RestorePlan),
    Done(RestorePlan),
    Cancelled,
}

impl WizardState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Cancelled)
    }
}

/// Drives a [`Prompter`] through the restore decisions
pub struct RestoreWizard<'a> {
    resolver: &'a RestoreResolver<'a>,
    sources: &'a [PathBuf],
    output_dir: Option<&'a Path>,
}

impl<'a> RestoreWizard<'a> {
    pub fn new(
        resolver: &'a RestoreResolver<'a>,
        sources: &'a [PathBuf],
        output_dir: Option<&'a Path>,
    ) -> Self {
        Self {
            resolver,
            sources,
            output_dir,
        }
    }

    /// Run to completion; `None` when the user cancelled
    pub fn run(&self, prompter: &mut dyn Prompter) -> AeonResult<Option<RestorePlan>> {
        let mut state = WizardState::SelectFile;
        while !state.is_terminal() {
            state = self.step(state, prompter)?;
        }
        Ok(match state {
            WizardState::Done(plan) => Some(plan),
            _ => None,
        })
    }

    /// Advance one decision
    ///
    /// Lookups that fail for the user's input (a path outside the sources,
    /// a file with no versions) return to the previous decision instead of
    /// ending the wizard.
    pub fn step(&self, state: WizardState, prompter: &mut dyn Prompter) -> AeonResult<WizardState> {
        Ok(match state {
            WizardState::SelectFile => {
                let Some(local) = prompter.select_file()? else {
                    return Ok(WizardState::Cancelled);
                };
                let file = match map_path(self.sources, &local) {
                    Ok(file) => file,
                    Err(e) => {
                        prompter.notify(&e.to_string());
                        return Ok(WizardState::SelectFile);
                    }
                };
                let versions = self.resolver.list_versions(&file)?;
                if versions.is_empty() {
                    prompter.notify(&format!("No snapshot contains {}", file.display()));
                    return Ok(WizardState::SelectFile);
                }
                WizardState::SelectVersion {
                    local,
                    file,
                    versions,
                }
            }

            WizardState::SelectVersion {
                local,
                file,
                versions,
            } => match prompter.select_version(&file, &versions)? {
                Some(version) if versions.contains(&version) => WizardState::Inspect {
                    local,
                    file,
                    versions,
                    version,
                },
                Some(version) => {
                    prompter.notify(&format!("{} does not contain {}", version, file.display()));
                    WizardState::SelectVersion {
                        local,
                        file,
                        versions,
                    }
                }
                None => WizardState::Cancelled,
            },

            WizardState::Inspect {
                local,
                file,
                versions,
                version,
            } => {
                match prompter.inspect(&file, &version)? {
                    Inspection::Preview => {
                        let preview = self.resolver.preview(&file, &version)?;
                        prompter.show_preview(&preview);
                    }
                    Inspection::DiffWith(other) => match self.resolver.diff(&file, &other, &version) {
                        Ok(diff) => prompter.show_diff(&diff),
                        Err(e) => prompter.notify(&e.to_string()),
                    },
                    Inspection::DiffLocal => match self.resolver.diff_local(&file, &version, &local) {
                        Ok(diff) => prompter.show_diff(&diff),
                        Err(e) => prompter.notify(&e.to_string()),
                    },
                    Inspection::Back => {
                        return Ok(WizardState::SelectVersion {
                            local,
                            file,
                            versions,
                        })
                    }
                    Inspection::Continue => {
                        return Ok(WizardState::SelectDestination {
                            local,
                            file,
                            version,
                        })
                    }
                }
                WizardState::Inspect {
                    local,
                    file,
                    versions,
                    version,
                }
            }

            WizardState::SelectDestination {
                local,
                file,
                version,
            } => {
                let default = default_destination(&local, self.output_dir);
                match prompter.select_destination(&default)? {
                    Some(destination) => {
                        WizardState::Confirm(self.resolver.plan(&file, version, destination)?)
                    }
                    None => WizardState::Cancelled,
                }
            }

            WizardState::Confirm(plan) => {
                if prompter.confirm(&plan)? {
                    WizardState::Done(plan)
                } else {
                    WizardState::Cancelled
                }
            }

            terminal @ (WizardState::Done(_) | WizardState::Cancelled) => terminal,
        })
    }
}
