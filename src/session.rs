//! Cut-mode state for one loaded file: loop presenter, thresholds, control
//! enablement and the status line.

use crate::controls::{ControlEnablement, ControlFlags};
use crate::i18n::{t, t_with};
use crate::loop_region::Boundary;
use crate::presenter::{EditorInput, LoopEditor, LoopPresenter};
use crate::threshold::{SilenceThreshold, ThresholdEditor};
use crate::worker::{AnalysisKind, AnalysisRequest, AnalysisResult};

/// Older status lines are dropped past this many; the log keeps them all.
const STATUS_HISTORY: usize = 32;

pub struct CutSession<E, T> {
    presenter: LoopPresenter<E>,
    thresholds: SilenceThreshold,
    threshold_editor: T,
    flags: ControlFlags,
    status: Vec<String>,
}

impl<E: LoopEditor, T: ThresholdEditor> CutSession<E, T> {
    pub fn new(loop_editor: E, threshold_editor: T, thresholds: SilenceThreshold) -> Self {
        let mut session = Self {
            presenter: LoopPresenter::new(loop_editor),
            thresholds,
            threshold_editor,
            flags: ControlFlags::default(),
            status: Vec::new(),
        };
        session.refresh_controls();
        session
    }

    pub fn presenter(&self) -> &LoopPresenter<E> {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut LoopPresenter<E> {
        &mut self.presenter
    }

    pub fn thresholds(&self) -> SilenceThreshold {
        self.thresholds
    }

    pub fn threshold_editor(&self) -> &T {
        &self.threshold_editor
    }

    pub fn flags(&self) -> ControlFlags {
        self.flags
    }

    pub fn enablement(&self) -> ControlEnablement {
        self.flags.into()
    }

    pub fn status(&self) -> &[String] {
        &self.status
    }

    pub fn last_status(&self) -> Option<&str> {
        self.status.last().map(String::as_str)
    }

    fn report(&mut self, message: String) {
        log::info!("{}", message);
        if self.status.len() == STATUS_HISTORY {
            self.status.remove(0);
        }
        self.status.push(message);
    }

    /// Resets the region for a new file.
    ///
    /// Returns the detection to run when auto-cut is armed, preferring loop-in.
    pub fn on_file_loaded(&mut self, total_frames: u64, sample_rate: u32) -> Option<AnalysisKind> {
        self.presenter.on_file_loaded(total_frames, sample_rate);
        self.flags.file_loaded = true;
        self.refresh_controls();
        self.rerun_for(Boundary::In)
            .or_else(|| self.rerun_for(Boundary::Out))
    }

    pub fn set_cut_mode(&mut self, active: bool) {
        self.flags.cut_mode_active = active;
        self.refresh_controls();
    }

    fn refresh_controls(&mut self) {
        let enablement = self.enablement();
        self.threshold_editor
            .set_enabled(enablement.threshold_editors);
        for boundary in [Boundary::In, Boundary::Out] {
            self.threshold_editor
                .show_percent(boundary, self.thresholds.percent(boundary));
        }
    }

    /// Stores a threshold typed as a percentage.
    ///
    /// Returns the analysis to run again when that side is under auto-cut.
    pub fn apply_threshold_text(&mut self, boundary: Boundary, text: &str) -> Option<AnalysisKind> {
        match self.thresholds.apply_percentage_text(boundary, text) {
            Ok(value) => {
                log::debug!("{:?} threshold set to {}", boundary, value);
                self.threshold_editor
                    .show_percent(boundary, self.thresholds.percent(boundary));
                self.rerun_for(boundary)
            }
            Err(err) => {
                log::warn!("{:?} threshold rejected: {}", boundary, err);
                self.threshold_editor
                    .show_percent(boundary, self.thresholds.percent(boundary));
                self.report(t("invalid_threshold"));
                None
            }
        }
    }

    /// Arms or disarms auto-cut for one side. Arming asks for a detection pass.
    pub fn set_auto_cut(&mut self, boundary: Boundary, active: bool) -> Option<AnalysisKind> {
        self.presenter.set_auto_cut(boundary, active);
        if active {
            self.rerun_for(boundary)
        } else {
            None
        }
    }

    fn rerun_for(&self, boundary: Boundary) -> Option<AnalysisKind> {
        if !self.flags.cut_mode_active || !self.presenter.auto_cut().get(boundary) {
            return None;
        }
        Some(match boundary {
            Boundary::In => AnalysisKind::DetectIn,
            Boundary::Out => AnalysisKind::DetectOut,
        })
    }

    pub fn request(&self, kind: AnalysisKind) -> AnalysisRequest {
        AnalysisRequest::new(kind, self.thresholds).seek_to_start(self.flags.cut_mode_active)
    }

    pub fn apply_loop_edit(&mut self, boundary: Boundary, input: impl Into<EditorInput>) -> bool {
        let accepted = match boundary {
            Boundary::In => self.presenter.apply_loop_in_from_editor(input),
            Boundary::Out => self.presenter.apply_loop_out_from_editor(input),
        };
        if !accepted {
            self.report(t("invalid_position"));
        }
        accepted
    }

    /// Applies the result of a detection pass. Failures only touch the status.
    pub fn apply_analysis(&mut self, result: &AnalysisResult) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("silence detection failed: {}", err);
                self.report(t(err.status_key()));
                return;
            }
        };

        if let (AnalysisKind::FullFile, Some(start), Some(end)) =
            (outcome.kind, outcome.start, outcome.end)
        {
            self.presenter.set_region_from_samples(start, end);
            self.report(t_with("loop_in_set", start));
            self.report(t_with("loop_out_set", end));
            return;
        }

        if matches!(outcome.kind, AnalysisKind::DetectIn | AnalysisKind::FullFile) {
            self.apply_boundary(Boundary::In, outcome.start);
        }
        if matches!(outcome.kind, AnalysisKind::DetectOut | AnalysisKind::FullFile) {
            self.apply_boundary(Boundary::Out, outcome.end);
        }
    }

    fn apply_boundary(&mut self, boundary: Boundary, frame: Option<u64>) {
        let Some(frame) = frame else {
            self.report(t(match boundary {
                Boundary::In => "no_sound_in",
                Boundary::Out => "no_sound_out",
            }));
            return;
        };

        // Mark before storing so a reorder carries the flag with the value.
        self.presenter.set_auto_cut(boundary, true);
        match boundary {
            Boundary::In => {
                self.presenter.set_loop_in_from_sample(frame);
                self.report(t_with("loop_in_set", frame));
            }
            Boundary::Out => {
                self.presenter.set_loop_out_from_sample(frame);
                self.report(t_with("loop_out_set", frame));
            }
        }
    }
}
