use thiserror::Error;

use crate::loop_region::{Boundary, LoopRegion};
use crate::timecode::{format_time, frames_to_seconds, parse_time, seconds_to_frames};

/// Display side of the loop controls. Implemented by whatever UI hosts them.
pub trait LoopEditor {
    fn show_position(&mut self, boundary: Boundary, text: &str);

    fn show_loop_length(&mut self, text: &str);

    /// Editors with keyboard focus keep what the user is typing.
    fn has_focus(&self, _boundary: Boundary) -> bool {
        false
    }

    fn mark_invalid(&mut self, _boundary: Boundary) {}
}

/// A value the user committed in a loop editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorInput {
    /// `HH:MM:SS:mmm`
    Text(String),
    Frames(u64),
}

impl From<&str> for EditorInput {
    fn from(text: &str) -> Self {
        EditorInput::Text(text.to_string())
    }
}

impl From<String> for EditorInput {
    fn from(text: String) -> Self {
        EditorInput::Text(text)
    }
}

impl From<u64> for EditorInput {
    fn from(frames: u64) -> Self {
        EditorInput::Frames(frames)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidLoopEdit {
    #[error("no audio is loaded")]
    NoAudioLoaded,
    #[error("'{0}' is not a HH:MM:SS:mmm time")]
    Malformed(String),
    #[error("position {position} is past the end of the audio ({total} frames)")]
    OutOfRange { position: u64, total: u64 },
}

/// Whether each boundary is currently driven by silence detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoCut {
    pub in_active: bool,
    pub out_active: bool,
}

impl AutoCut {
    pub fn get(&self, boundary: Boundary) -> bool {
        match boundary {
            Boundary::In => self.in_active,
            Boundary::Out => self.out_active,
        }
    }

    pub fn set(&mut self, boundary: Boundary, active: bool) {
        match boundary {
            Boundary::In => self.in_active = active,
            Boundary::Out => self.out_active = active,
        }
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.in_active, &mut self.out_active);
    }
}

const UNSET_TEXT: &str = "--:--:--:---";

/// Owns the loop region and keeps the editor display in step with it.
pub struct LoopPresenter<E> {
    editor: E,
    region: LoopRegion,
    sample_rate: u32,
    total_frames: Option<u64>,
    auto_cut: AutoCut,
}

impl<E: LoopEditor> LoopPresenter<E> {
    pub fn new(editor: E) -> Self {
        Self {
            editor,
            region: LoopRegion::new(),
            sample_rate: 0,
            total_frames: None,
            auto_cut: AutoCut::default(),
        }
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn region(&self) -> LoopRegion {
        self.region
    }

    pub fn auto_cut(&self) -> AutoCut {
        self.auto_cut
    }

    pub fn set_auto_cut(&mut self, boundary: Boundary, active: bool) {
        self.auto_cut.set(boundary, active);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// A new file clears both boundaries.
    pub fn on_file_loaded(&mut self, total_frames: u64, sample_rate: u32) {
        self.region.clear();
        self.total_frames = Some(total_frames);
        self.sample_rate = sample_rate;
        self.update_loop_labels();
    }

    pub fn set_loop_in_position(&mut self, position: u64) {
        self.set_position(Boundary::In, position);
    }

    pub fn set_loop_out_position(&mut self, position: u64) {
        self.set_position(Boundary::Out, position);
    }

    fn clamp(&self, position: u64) -> u64 {
        match self.total_frames {
            Some(total) => position.min(total),
            None => position,
        }
    }

    fn set_position(&mut self, boundary: Boundary, position: u64) {
        let position = self.clamp(position);
        if self.region.set(boundary, position) {
            // The auto-cut marker follows the value it was attached to.
            self.auto_cut.swap();
            log::debug!(
                "loop {:?} edit crossed the other boundary, reordered to {:?}",
                boundary,
                self.region
            );
        }
    }

    pub fn set_loop_in_from_sample(&mut self, frame: u64) {
        self.set_loop_in_position(frame);
        self.update_loop_labels();
    }

    pub fn set_loop_out_from_sample(&mut self, frame: u64) {
        self.set_loop_out_position(frame);
        self.update_loop_labels();
    }

    /// Replaces both boundaries at once with detected values.
    ///
    /// Both sides become auto-cut and the labels refresh once.
    pub fn set_region_from_samples(&mut self, start: u64, end: u64) {
        let (region, swapped) =
            LoopRegion::normalized(Some(self.clamp(start)), Some(self.clamp(end)));
        if swapped {
            log::debug!("detected boundaries {} and {} arrived reversed", start, end);
        }
        self.region = region;
        self.auto_cut = AutoCut {
            in_active: true,
            out_active: true,
        };
        self.update_loop_labels();
    }

    pub fn reset_loop_in(&mut self) {
        self.set_loop_in_from_sample(0);
    }

    pub fn reset_loop_out(&mut self) {
        if let Some(total) = self.total_frames {
            self.set_loop_out_from_sample(total);
        }
    }

    pub fn apply_loop_in_from_editor(&mut self, input: impl Into<EditorInput>) -> bool {
        self.apply_from_editor(Boundary::In, input.into())
    }

    pub fn apply_loop_out_from_editor(&mut self, input: impl Into<EditorInput>) -> bool {
        self.apply_from_editor(Boundary::Out, input.into())
    }

    fn apply_from_editor(&mut self, boundary: Boundary, input: EditorInput) -> bool {
        match self.parse_position(&input) {
            Ok(position) => {
                self.set_position(boundary, position);
                self.auto_cut.set(boundary, false);
                self.update_loop_labels();
                true
            }
            Err(err) => {
                log::warn!("loop {:?} edit rejected: {}", boundary, err);
                self.sync_editor_to_position(boundary);
                self.editor.mark_invalid(boundary);
                false
            }
        }
    }

    fn parse_position(&self, input: &EditorInput) -> Result<u64, InvalidLoopEdit> {
        let total = match self.total_frames {
            Some(total) if total > 0 => total,
            _ => return Err(InvalidLoopEdit::NoAudioLoaded),
        };
        let position = match input {
            EditorInput::Text(text) => {
                let seconds =
                    parse_time(text).ok_or_else(|| InvalidLoopEdit::Malformed(text.clone()))?;
                seconds_to_frames(seconds, self.sample_rate)
            }
            EditorInput::Frames(frames) => *frames,
        };

        if position > total {
            return Err(InvalidLoopEdit::OutOfRange { position, total });
        }
        Ok(position)
    }

    /// Pushes both positions (unless being edited) and the loop length.
    pub fn update_loop_labels(&mut self) {
        for boundary in [Boundary::In, Boundary::Out] {
            if !self.editor.has_focus(boundary) {
                self.sync_editor_to_position(boundary);
            }
        }
        let length = match self.region.length() {
            Some(frames) => format_time(frames_to_seconds(frames, self.sample_rate)),
            None => UNSET_TEXT.to_string(),
        };
        self.editor.show_loop_length(&length);
    }

    pub fn sync_editor_to_position(&mut self, boundary: Boundary) {
        let text = self.position_text(boundary);
        self.editor.show_position(boundary, &text);
    }

    pub fn position_text(&self, boundary: Boundary) -> String {
        match self.region.get(boundary) {
            Some(frame) => format_time(frames_to_seconds(frame, self.sample_rate)),
            None => UNSET_TEXT.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    #[derive(Debug, Default)]
    pub struct RecordingEditor {
        pub in_text: String,
        pub out_text: String,
        pub length_text: String,
        pub label_updates: usize,
        pub focused: Option<Boundary>,
        pub invalid: Vec<Boundary>,
    }

    impl LoopEditor for RecordingEditor {
        fn show_position(&mut self, boundary: Boundary, text: &str) {
            match boundary {
                Boundary::In => self.in_text = text.to_string(),
                Boundary::Out => self.out_text = text.to_string(),
            }
        }

        fn show_loop_length(&mut self, text: &str) {
            self.label_updates += 1;
            self.length_text = text.to_string();
        }

        fn has_focus(&self, boundary: Boundary) -> bool {
            self.focused == Some(boundary)
        }

        fn mark_invalid(&mut self, boundary: Boundary) {
            self.invalid.push(boundary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingEditor;
    use super::*;

    fn loaded(total: u64) -> LoopPresenter<RecordingEditor> {
        let mut p = LoopPresenter::new(RecordingEditor::default());
        p.on_file_loaded(total, 1000);
        p
    }

    #[test]
    fn crossing_editor_edit_is_reordered_and_labels_refresh_once() {
        let mut p = loaded(10_000);
        p.set_loop_out_position(500);
        let before = p.editor().label_updates;

        assert!(p.apply_loop_in_from_editor(800u64));

        let r = p.region();
        assert_eq!((r.loop_in(), r.loop_out()), (Some(500), Some(800)));
        assert_eq!(p.editor().label_updates, before + 1);
        assert_eq!(p.editor().in_text, "00:00:00:500");
        assert_eq!(p.editor().out_text, "00:00:00:800");
        assert_eq!(p.editor().length_text, "00:00:00:300");
    }

    #[test]
    fn out_edit_below_in_is_reordered() {
        let mut p = loaded(10_000);
        assert!(p.apply_loop_in_from_editor("00:00:02:000"));
        assert!(p.apply_loop_out_from_editor("00:00:01:000"));
        let r = p.region();
        assert_eq!((r.loop_in(), r.loop_out()), (Some(1000), Some(2000)));
    }

    #[test]
    fn malformed_text_is_rejected_and_editor_restored() {
        let mut p = loaded(10_000);
        p.set_loop_in_from_sample(250);
        let before = p.editor().label_updates;

        assert!(!p.apply_loop_in_from_editor("not a time"));

        assert_eq!(p.region().loop_in(), Some(250));
        assert_eq!(p.editor().in_text, "00:00:00:250");
        assert_eq!(p.editor().invalid, vec![Boundary::In]);
        assert_eq!(p.editor().label_updates, before);
    }

    #[test]
    fn positions_past_the_end_are_rejected_from_editor() {
        let mut p = loaded(1000);
        assert!(!p.apply_loop_out_from_editor(1001u64));
        assert_eq!(p.region().loop_out(), None);
        assert_eq!(p.editor().out_text, UNSET_TEXT);
    }

    #[test]
    fn programmatic_positions_are_clamped_to_length() {
        let mut p = loaded(1000);
        p.set_loop_out_position(5000);
        assert_eq!(p.region().loop_out(), Some(1000));
    }

    #[test]
    fn focused_editor_is_not_overwritten() {
        let mut p = loaded(10_000);
        p.editor_mut().in_text = "00:00:0".into();
        p.editor_mut().focused = Some(Boundary::In);
        p.set_loop_out_from_sample(900);
        assert_eq!(p.editor().in_text, "00:00:0");
        assert_eq!(p.editor().out_text, "00:00:00:900");
    }

    #[test]
    fn manual_edit_disables_auto_cut_and_swap_moves_flags() {
        let mut p = loaded(10_000);
        p.set_auto_cut(Boundary::In, true);
        p.set_loop_in_from_sample(100);
        p.set_loop_out_from_sample(50);
        // The auto value is now the out point.
        assert_eq!(p.region().loop_out(), Some(100));
        assert!(p.auto_cut().out_active);
        assert!(!p.auto_cut().in_active);

        assert!(p.apply_loop_out_from_editor(200u64));
        assert!(!p.auto_cut().out_active);
    }

    #[test]
    fn file_load_clears_region() {
        let mut p = loaded(10_000);
        p.set_loop_in_from_sample(10);
        p.set_loop_out_from_sample(20);
        p.on_file_loaded(500, 48_000);
        assert_eq!(p.region(), LoopRegion::new());
        assert_eq!(p.editor().length_text, UNSET_TEXT);
    }

    #[test]
    fn editor_input_is_rejected_before_a_file_is_loaded() {
        let mut p = LoopPresenter::new(RecordingEditor::default());
        assert!(!p.apply_loop_in_from_editor("00:00:05:000"));
        assert!(!p.apply_loop_out_from_editor(0u64));
        assert_eq!(p.region(), LoopRegion::new());
        assert_eq!(p.editor().invalid, vec![Boundary::In, Boundary::Out]);
    }

    #[test]
    fn editor_input_is_rejected_for_empty_file() {
        let mut p = loaded(0);
        assert!(!p.apply_loop_in_from_editor(0u64));
        assert_eq!(p.region().loop_in(), None);
    }

    #[test]
    fn detected_region_replaces_both_boundaries_in_one_step() {
        let mut p = loaded(10_000);
        p.set_loop_out_from_sample(100);
        let before = p.editor().label_updates;

        p.set_region_from_samples(500, 900);

        let r = p.region();
        assert_eq!((r.loop_in(), r.loop_out()), (Some(500), Some(900)));
        assert_eq!(
            p.auto_cut(),
            AutoCut {
                in_active: true,
                out_active: true
            }
        );
        assert_eq!(p.editor().label_updates, before + 1);
        assert_eq!(p.editor().length_text, "00:00:00:400");
    }

    #[test]
    fn detected_region_is_ordered_and_clamped() {
        let mut p = loaded(1000);
        p.set_region_from_samples(1200, 300);
        let r = p.region();
        assert_eq!((r.loop_in(), r.loop_out()), (Some(300), Some(1000)));
    }

    #[test]
    fn resets_go_to_file_edges() {
        let mut p = loaded(4000);
        p.set_loop_in_from_sample(1000);
        p.set_loop_out_from_sample(2000);
        p.reset_loop_in();
        p.reset_loop_out();
        let r = p.region();
        assert_eq!((r.loop_in(), r.loop_out()), (Some(0), Some(4000)));
    }
}
