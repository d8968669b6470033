/// Which end of the loop an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    BothUnset,
    InOnly,
    OutOnly,
    BothSet,
}

/// Loop-in / loop-out frame positions.
///
/// Whenever both are set, `loop_in <= loop_out`. The only way to change the
/// pair is through setters that normalize before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopRegion {
    loop_in: Option<u64>,
    loop_out: Option<u64>,
}

impl LoopRegion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repairs a tentative pair so it satisfies the ordering invariant.
    ///
    /// Returns the ordered pair and whether the two values had to be swapped.
    pub fn normalized(loop_in: Option<u64>, loop_out: Option<u64>) -> (Self, bool) {
        match (loop_in, loop_out) {
            (Some(a), Some(b)) if a > b => (
                Self {
                    loop_in: Some(b),
                    loop_out: Some(a),
                },
                true,
            ),
            _ => (Self { loop_in, loop_out }, false),
        }
    }

    pub fn loop_in(&self) -> Option<u64> {
        self.loop_in
    }

    pub fn loop_out(&self) -> Option<u64> {
        self.loop_out
    }

    pub fn get(&self, boundary: Boundary) -> Option<u64> {
        match boundary {
            Boundary::In => self.loop_in,
            Boundary::Out => self.loop_out,
        }
    }

    /// Stores `position` for `boundary` and reorders the pair if needed.
    /// Returns true when the values were swapped.
    pub fn set(&mut self, boundary: Boundary, position: u64) -> bool {
        match boundary {
            Boundary::In => self.loop_in = Some(position),
            Boundary::Out => self.loop_out = Some(position),
        }
        self.ensure_loop_order()
    }

    fn ensure_loop_order(&mut self) -> bool {
        let (region, swapped) = Self::normalized(self.loop_in, self.loop_out);
        *self = region;
        swapped
    }

    pub fn set_loop_in(&mut self, position: u64) -> bool {
        self.set(Boundary::In, position)
    }

    pub fn set_loop_out(&mut self, position: u64) -> bool {
        self.set(Boundary::Out, position)
    }

    pub fn unset(&mut self, boundary: Boundary) {
        match boundary {
            Boundary::In => self.loop_in = None,
            Boundary::Out => self.loop_out = None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> LoopState {
        match (self.loop_in, self.loop_out) {
            (None, None) => LoopState::BothUnset,
            (Some(_), None) => LoopState::InOnly,
            (None, Some(_)) => LoopState::OutOnly,
            (Some(_), Some(_)) => LoopState::BothSet,
        }
    }

    /// Frames between the two boundaries, when both are set.
    pub fn length(&self) -> Option<u64> {
        match (self.loop_in, self.loop_out) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        }
    }

    pub fn is_ordered(&self) -> bool {
        match (self.loop_in, self.loop_out) {
            (Some(a), Some(b)) => a <= b,
            _ => true,
        }
    }
}
