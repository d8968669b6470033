use std::sync::Arc;
use std::time::Duration;

/// The playback engine as seen from the analysis path.
pub trait Transport {
    fn is_playing(&self) -> bool;
    fn pause(&self);
    fn resume(&self);
    fn current_position(&self) -> Duration;

    /// Moves the play head. Engines that cannot seek ignore this.
    fn seek(&self, _position: Duration) {}
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }

    fn pause(&self) {
        (**self).pause()
    }

    fn resume(&self) {
        (**self).resume()
    }

    fn current_position(&self) -> Duration {
        (**self).current_position()
    }

    fn seek(&self, position: Duration) {
        (**self).seek(position)
    }
}

/// Pauses the transport for as long as it is alive.
///
/// Dropping the coordinator resumes playback exactly once, and only if the
/// transport was playing when the coordinator was created, so an early `?`
/// return cannot leave playback stopped.
pub struct PlaybackCoordinator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    was_playing: bool,
    resumed: bool,
}

impl<'a, T: Transport + ?Sized> PlaybackCoordinator<'a, T> {
    pub fn pause_if_playing(transport: &'a T) -> Self {
        let was_playing = transport.is_playing();
        if was_playing {
            log::debug!(
                "pausing playback at {:?} for analysis",
                transport.current_position()
            );
            transport.pause();
        }
        Self {
            transport,
            was_playing,
            resumed: false,
        }
    }

    pub fn was_playing(&self) -> bool {
        self.was_playing
    }

    pub fn transport(&self) -> &T {
        self.transport
    }

    pub fn resume_if_was_playing(mut self) {
        self.resume_once();
    }

    fn resume_once(&mut self) {
        if self.was_playing && !self.resumed {
            self.resumed = true;
            log::debug!("resuming playback after analysis");
            self.transport.resume();
        }
    }
}

impl<T: Transport + ?Sized> Drop for PlaybackCoordinator<'_, T> {
    fn drop(&mut self) {
        self.resume_once();
    }
}
