use std::env;
use std::error::Error as StdError;
use std::num::ParseIntError;
use std::process::exit;
use std::time::{Duration, Instant};

use gifplay::{decode_file, DecodeError, DecodeOptions, Decoded, RgbaImage, SoftwareSurface};
use log::{error, info};
use pixels::{Pixels, SurfaceTexture};
use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

const DEFAULT_DELAY: Duration = Duration::from_millis(100);
const USAGE: &str = "usage: gifplay [--ignore-comments] [--max-frames N] <file.gif>";

#[derive(Debug, Error)]
enum AppError {
    #[error("{}", USAGE)]
    Usage,
    #[error("invalid --max-frames value")]
    MaxFrames(#[from] ParseIntError),
    #[error("decode failed")]
    Decode(#[from] DecodeError),
    #[error("nothing to display")]
    Empty,
    #[error("failed to create window")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create pixel buffer")]
    Pixels(#[from] pixels::Error),
}

#[derive(Debug)]
struct Setting {
    path: String,
    options: DecodeOptions,
}

fn main() {
    env_logger::init();

    if let Err(err) = app() {
        let mut message = err.to_string();
        let mut cause = err.source();
        while let Some(inner) = cause {
            message.push_str(&format!("\n\tcaused by: {}", inner));
            cause = inner.source();
        }
        eprintln!("Error: {}", message);
        exit(1);
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Setting, AppError> {
    let mut options = DecodeOptions::default();
    let mut path = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ignore-comments" => options.ignore_comments = true,
            "--max-frames" => {
                let value = args.next().ok_or(AppError::Usage)?;
                options.max_frames = Some(value.parse()?);
            }
            _ if path.is_none() && !arg.starts_with("--") => path = Some(arg),
            _ => return Err(AppError::Usage),
        }
    }
    Ok(Setting {
        path: path.ok_or(AppError::Usage)?,
        options,
    })
}

fn app() -> Result<(), AppError> {
    let setting = parse_args(env::args().skip(1))?;
    let decoded = decode_file(&setting.path, &setting.options, &mut SoftwareSurface)?;
    info!(
        "{}: {}x{}, animation: {}, loop count: {:?}",
        setting.path,
        decoded.width(),
        decoded.height(),
        decoded.is_animation(),
        decoded.loop_count()
    );
    for comment in decoded.comments() {
        info!("comment: {}", comment);
    }
    let (width, height) = (u32::from(decoded.width()), u32::from(decoded.height()));
    let mut player = Player::new(decoded, Instant::now()).ok_or(AppError::Empty)?;

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(format!("gifplay - {}", setting.path))
        .with_inner_size(LogicalSize::new(f64::from(width), f64::from(height)))
        .with_resizable(false)
        .build(&event_loop)?;
    let mut pixels = {
        let size = window.inner_size();
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        Pixels::new(width, height, surface_texture)?
    };

    let mut exiting = false;
    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } => {
            exiting = true;
            *control_flow = ControlFlow::Exit;
        }
        Event::RedrawRequested(_) => {
            player.frame().write_rgba8(pixels.get_frame_mut());
            if let Err(err) = pixels.render() {
                error!("render failed: {}", err);
                exiting = true;
                *control_flow = ControlFlow::Exit;
            }
        }
        Event::MainEventsCleared if !exiting => {
            if player.advance(Instant::now()) {
                window.request_redraw();
            }
            *control_flow = match player.deadline() {
                Some(deadline) => ControlFlow::WaitUntil(deadline),
                None => ControlFlow::Wait,
            };
        }
        _ => {}
    });
}

/// Frame timing for the viewer window.
struct Player {
    frames: Vec<(RgbaImage, Duration)>,
    current: usize,
    /// Remaining repeats; `None` repeats forever.
    repeats: Option<u16>,
    finished: bool,
    shown_at: Instant,
}

impl Player {
    fn new(decoded: Decoded<RgbaImage>, now: Instant) -> Option<Self> {
        let repeats = match decoded.loop_count() {
            Some(0) | None => None,
            Some(count) => Some(count),
        };
        let frames: Vec<_> = decoded
            .into_frames()
            .into_iter()
            .map(|frame| {
                let delay = frame
                    .delay
                    .filter(|delay| !delay.is_zero())
                    .unwrap_or(DEFAULT_DELAY);
                (frame.image, delay)
            })
            .collect();
        if frames.is_empty() {
            return None;
        }
        Some(Self {
            frames,
            current: 0,
            repeats,
            finished: false,
            shown_at: now,
        })
    }

    fn frame(&self) -> &RgbaImage {
        &self.frames[self.current].0
    }

    fn deadline(&self) -> Option<Instant> {
        if self.finished || self.frames.len() < 2 {
            return None;
        }
        Some(self.shown_at + self.frames[self.current].1)
    }

    /// Moves to the next frame once its deadline passed. Returns whether the
    /// shown frame changed.
    fn advance(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {}
            _ => return false,
        }
        if self.current + 1 < self.frames.len() {
            self.current += 1;
        } else {
            match self.repeats.as_mut() {
                Some(0) => {
                    self.finished = true;
                    return false;
                }
                Some(left) => *left -= 1,
                None => {}
            }
            self.current = 0;
        }
        self.shown_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gifplay::{Animation, Frame, RenderSurface};

    fn animation(loop_count: u16, delays: &[Option<Duration>]) -> Decoded<RgbaImage> {
        let mut surface = SoftwareSurface;
        let frames = delays
            .iter()
            .map(|&delay| Frame {
                image: surface.new_canvas(1, 1, true),
                delay,
            })
            .collect();
        Decoded::Animation(Animation {
            width: 1,
            height: 1,
            loop_count: Some(loop_count),
            comments: vec![],
            frames,
        })
    }

    #[test]
    fn parse_arguments() {
        let args = ["--max-frames", "3", "--ignore-comments", "a.gif"].map(String::from);
        let setting = parse_args(args).unwrap();
        assert_eq!(setting.path, "a.gif");
        assert_eq!(setting.options.max_frames, Some(3));
        assert!(setting.options.ignore_comments);

        assert!(matches!(parse_args(Vec::new()), Err(AppError::Usage)));
        assert!(matches!(
            parse_args(["--max-frames", "x", "a.gif"].map(String::from)),
            Err(AppError::MaxFrames(_))
        ));
        assert!(matches!(
            parse_args(["a.gif", "b.gif"].map(String::from)),
            Err(AppError::Usage)
        ));
    }

    #[test]
    fn player_uses_default_delay() {
        let start = Instant::now();
        let mut player = Player::new(animation(0, &[None, Some(Duration::ZERO)]), start).unwrap();
        assert_eq!(player.deadline(), Some(start + DEFAULT_DELAY));
        assert!(!player.advance(start));
        assert!(player.advance(start + DEFAULT_DELAY));
        assert_eq!(player.current, 1);
    }

    #[test]
    fn player_stops_after_repeats() {
        let start = Instant::now();
        let delay = Duration::from_millis(10);
        let mut player = Player::new(animation(1, &[Some(delay), Some(delay)]), start).unwrap();
        let mut now = start;
        let mut changes = 0;
        for _ in 0..10 {
            now += delay;
            if player.advance(now) {
                changes += 1;
            }
        }
        // two frames played twice
        assert_eq!(changes, 3);
        assert_eq!(player.deadline(), None);
        assert_eq!(player.current, 1);
    }

    #[test]
    fn player_rejects_empty_animation() {
        assert!(Player::new(animation(0, &[]), Instant::now()).is_none());
    }
}
