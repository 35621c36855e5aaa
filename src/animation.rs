use std::time::Duration;

/// One composited canvas snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<I> {
    pub image: I,
    /// Only set for animations whose frame carried a Graphic Control Extension.
    pub delay: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation<I> {
    pub width: u16,
    pub height: u16,
    /// `Some(0)` loops forever.
    pub loop_count: Option<u16>,
    pub comments: Vec<String>,
    pub frames: Vec<Frame<I>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Still<I> {
    pub width: u16,
    pub height: u16,
    pub image: I,
    pub comments: Vec<String>,
}

/// Outcome of a decode. A file is an animation only if it carries a
/// Netscape looping extension, regardless of how many images it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<I> {
    Animation(Animation<I>),
    Still(Still<I>),
}

impl<I> Decoded<I> {
    pub fn is_animation(&self) -> bool {
        matches!(self, Self::Animation(_))
    }

    pub fn width(&self) -> u16 {
        match self {
            Self::Animation(animation) => animation.width,
            Self::Still(still) => still.width,
        }
    }

    pub fn height(&self) -> u16 {
        match self {
            Self::Animation(animation) => animation.height,
            Self::Still(still) => still.height,
        }
    }

    pub fn comments(&self) -> &[String] {
        match self {
            Self::Animation(animation) => &animation.comments,
            Self::Still(still) => &still.comments,
        }
    }

    pub fn loop_count(&self) -> Option<u16> {
        match self {
            Self::Animation(animation) => animation.loop_count,
            Self::Still(_) => None,
        }
    }

    /// Converts into a frame list; a still becomes one frame without delay.
    pub fn into_frames(self) -> Vec<Frame<I>> {
        match self {
            Self::Animation(animation) => animation.frames,
            Self::Still(still) => vec![Frame {
                image: still.image,
                delay: None,
            }],
        }
    }
}
