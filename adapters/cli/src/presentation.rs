use gemfall_core::Event;

/// Stand-in for an animated view: stays busy for a fixed number of frames per animated event.
#[derive(Debug)]
pub(crate) struct HeadlessPresentation {
    frames_per_animation: u32,
    remaining_frames: u64,
    animations: u64,
}

impl HeadlessPresentation {
    pub(crate) fn new(frames_per_animation: u32) -> Self {
        Self {
            frames_per_animation,
            remaining_frames: 0,
            animations: 0,
        }
    }

    /// Queues an animation for every event a view would play back.
    pub(crate) fn observe(&mut self, events: &[Event]) {
        for event in events {
            let animated = matches!(
                event,
                Event::CellsSwapped { .. }
                    | Event::CellsDestroyed { .. }
                    | Event::CellsMoved { .. }
                    | Event::CellsCreated { .. }
            );
            if animated {
                self.animations += 1;
                self.remaining_frames += u64::from(self.frames_per_animation);
            }
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.remaining_frames > 0
    }

    pub(crate) fn advance_frame(&mut self) {
        self.remaining_frames = self.remaining_frames.saturating_sub(1);
    }

    /// Number of animations played so far.
    pub(crate) fn animations(&self) -> u64 {
        self.animations
    }
}
