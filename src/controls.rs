/// Inputs that decide which cut controls accept input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlags {
    pub file_loaded: bool,
    pub cut_mode_active: bool,
}

/// Enablement of each cut-related control, derived from [`ControlFlags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlEnablement {
    pub threshold_editors: bool,
    pub loop_editors: bool,
    pub reset_buttons: bool,
    pub auto_cut_buttons: bool,
}

impl ControlEnablement {
    pub fn from_flags(flags: ControlFlags) -> Self {
        let cut_controls = flags.file_loaded && flags.cut_mode_active;
        Self {
            threshold_editors: cut_controls,
            loop_editors: cut_controls,
            reset_buttons: cut_controls,
            // Auto-cut can be armed before a file is loaded.
            auto_cut_buttons: flags.cut_mode_active,
        }
    }
}

impl From<ControlFlags> for ControlEnablement {
    fn from(flags: ControlFlags) -> Self {
        Self::from_flags(flags)
    }
}
