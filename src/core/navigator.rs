use std::io::{Read, Seek};

use super::format::FrameGeometry;
use super::frame_source::{FrameIndex, FrameSource};
use crate::utils::logger;

/// Receives frames and status text for display.
pub trait Presenter {
    /// Shows one frame. `frame` is only valid for the duration of the call.
    fn present(&mut self, frame: &[u8], geometry: &FrameGeometry);

    fn set_caption(&mut self, caption: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Show the first frame. Issued internally before any user input.
    Start,
    Next,
    Previous,
    Rewind,
    Quit,
}

/// What an intent did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Presented(FrameIndex),
    Unchanged,
    Stopped,
}

/// Frame cursor and intent dispatch.
///
/// Only a successful read moves the cursor or reaches the presenter; a failed
/// one (usually end of stream) leaves everything as it was.
pub struct NavigationController {
    file_name: String,
    width: u32,
    height: u32,
    current: Option<FrameIndex>,
    running: bool,
}

impl NavigationController {
    pub fn new(file_name: impl Into<String>, geometry: &FrameGeometry) -> Self {
        Self {
            file_name: file_name.into(),
            width: geometry.width(),
            height: geometry.height(),
            current: None,
            running: true,
        }
    }

    pub fn current(&self) -> Option<FrameIndex> {
        self.current
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn caption(&self) -> String {
        format!(
            "{} - frame {}, size {}x{}",
            self.file_name,
            self.current.map_or(0, FrameIndex::get),
            self.width,
            self.height
        )
    }

    pub fn handle<R, P>(
        &mut self,
        intent: Intent,
        source: &mut FrameSource<R>,
        presenter: &mut P,
    ) -> Transition
    where
        R: Read + Seek,
        P: Presenter + ?Sized,
    {
        if !self.running {
            return Transition::Stopped;
        }

        let target = match intent {
            Intent::Start => match self.current {
                None => Some(FrameIndex::FIRST),
                Some(_) => None,
            },
            Intent::Next => Some(self.current.map_or(FrameIndex::FIRST, FrameIndex::next)),
            Intent::Previous => self.current.and_then(FrameIndex::prev),
            Intent::Rewind => self
                .current
                .filter(|index| *index > FrameIndex::FIRST)
                .map(|_| FrameIndex::FIRST),
            Intent::Quit => {
                self.running = false;
                None
            }
        };

        let transition = match target {
            Some(index) => self.show(index, source, presenter),
            None if !self.running => Transition::Stopped,
            None => Transition::Unchanged,
        };
        logger::debug(&format!("{:?} -> {:?}", intent, transition));

        presenter.set_caption(&self.caption());
        transition
    }

    fn show<R, P>(
        &mut self,
        index: FrameIndex,
        source: &mut FrameSource<R>,
        presenter: &mut P,
    ) -> Transition
    where
        R: Read + Seek,
        P: Presenter + ?Sized,
    {
        let geometry = *source.geometry();
        match source.read_at(index) {
            Ok(frame) => {
                presenter.present(frame, &geometry);
                self.current = Some(index);
                Transition::Presented(index)
            }
            Err(e) => {
                logger::debug(&format!("staying on frame {:?}: {}", self.current, e));
                Transition::Unchanged
            }
        }
    }

    /// Shows the first frame, then handles intents until `Quit` or until
    /// `intents` runs dry.
    pub fn run<R, P, I>(&mut self, source: &mut FrameSource<R>, presenter: &mut P, intents: I)
    where
        R: Read + Seek,
        P: Presenter + ?Sized,
        I: IntoIterator<Item = Intent>,
    {
        self.handle(Intent::Start, source, presenter);

        for intent in intents {
            if self.handle(intent, source, presenter) == Transition::Stopped {
                break;
            }
        }
        self.running = false;
    }
}
