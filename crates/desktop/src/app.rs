use std::time::Duration;

use crossbeam_channel::Receiver;
use iced::animation::Easing;
use iced::time::Instant;
use iced::widget::{column, container, image, text};
use iced::{Alignment, Animation, Color, Element, Font, Length, Subscription, Task, Theme};

use facecam_core::pipeline::capture_session::{CaptureSession, SessionEvent};
use facecam_core::pipeline::session_factory::SessionFactory;
use facecam_core::shared::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, TICK_INTERVAL};
use facecam_core::shared::display_frame::DisplayFrame;

use crate::settings::Settings;
use crate::theme;
use crate::widgets::control_button::control_button;

const HOVER_DURATION: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub enum Message {
    Start,
    Stop,
    Tick,
    StartHovered(bool),
    StopHovered(bool),
    Animate(Instant),
}

pub struct App {
    session: CaptureSession,
    events: Receiver<SessionEvent>,
    frame: image::Handle,
    settings: Settings,
    /// Cleared once a tick reports the session has halted.
    ticking: bool,
    start_hover: Animation<bool>,
    stop_hover: Animation<bool>,
    now: Instant,
    /// Last camera open failure, cleared by the next successful start.
    start_error: Option<String>,
}

impl App {
    pub fn new(factory: &SessionFactory) -> (Self, Task<Message>) {
        let (session, events) = factory.build();
        (Self::with_session(session, events, Settings::load()), Task::none())
    }

    pub fn with_session(
        session: CaptureSession,
        events: Receiver<SessionEvent>,
        settings: Settings,
    ) -> Self {
        let frame = to_handle(session.placeholder());
        Self {
            session,
            events,
            frame,
            settings,
            ticking: false,
            start_hover: hover_animation(),
            stop_hover: hover_animation(),
            now: Instant::now(),
            start_error: None,
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Start => {
                self.session.start();
                self.ticking = self.session.is_active();
            }
            Message::Stop => {
                self.session.stop();
                self.ticking = false;
            }
            Message::Tick => self.ticking = self.session.tick().reschedule(),
            Message::StartHovered(hovered) => {
                self.now = Instant::now();
                self.start_hover.go_mut(hovered, self.now);
            }
            Message::StopHovered(hovered) => {
                self.now = Instant::now();
                self.stop_hover.go_mut(hovered, self.now);
            }
            Message::Animate(now) => self.now = now,
        }
        self.drain_events();
        Task::none()
    }

    fn drain_events(&mut self) {
        for event in self.events.try_iter() {
            match event {
                SessionEvent::Started => self.start_error = None,
                SessionEvent::StartFailed(message) => self.start_error = Some(message),
                SessionEvent::FrameReady(frame) | SessionEvent::Stopped(frame) => {
                    self.frame = to_handle(frame);
                }
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;
        let active = self.session.is_active();

        let header = column![
            text("AI Face Detection System")
                .size(scaled(24.0, fs))
                .font(Font {
                    weight: iced::font::Weight::Bold,
                    ..Font::DEFAULT
                })
                .color(theme::ACCENT),
            text("Real-time Computer Vision")
                .size(scaled(10.0, fs))
                .color(self.muted(theme::SUBTITLE)),
        ]
        .spacing(4)
        .align_x(Alignment::Center);

        let video = container(
            image(self.frame.clone())
                .width(Length::Fixed(DISPLAY_WIDTH as f32))
                .height(Length::Fixed(DISPLAY_HEIGHT as f32)),
        )
        .padding(2)
        .style(|_theme: &Theme| container::Style {
            background: Some(theme::VIDEO_BACKGROUND.into()),
            ..container::Style::default()
        });

        let controls = iced::widget::row![
            control_button(
                "INITIATE CAMERA",
                (!active).then_some(Message::Start),
                theme::START_BUTTON,
                self.start_hover.interpolate(0.0, 1.0, self.now),
                Message::StartHovered,
                scaled(12.0, fs),
            ),
            control_button(
                "TERMINATE",
                active.then_some(Message::Stop),
                theme::STOP_BUTTON,
                self.stop_hover.interpolate(0.0, 1.0, self.now),
                Message::StopHovered,
                scaled(12.0, fs),
            ),
        ]
        .spacing(30);

        let mut body = column![header, video, controls]
            .spacing(20)
            .padding(20)
            .align_x(Alignment::Center)
            .width(Length::Fill)
            .height(Length::Fill);

        if let Some(error) = &self.start_error {
            body = body.push(
                text(format!("Could not open camera: {error}"))
                    .size(scaled(11.0, fs))
                    .color(theme::STOP_BUTTON.base),
            );
        }

        let status_bar = container(
            text(self.session.status().message())
                .size(scaled(11.0, fs))
                .color(self.muted(theme::STATUS_TEXT)),
        )
        .width(Length::Fill)
        .padding([4, 8])
        .style(|_theme: &Theme| container::Style {
            background: Some(theme::STATUS_BACKGROUND.into()),
            ..container::Style::default()
        });

        column![body, status_bar].into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let ticks = if self.ticking {
            iced::time::every(TICK_INTERVAL).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };
        let frames = if self.is_animating() {
            iced::window::frames().map(Message::Animate)
        } else {
            Subscription::none()
        };
        Subscription::batch([ticks, frames])
    }

    fn is_animating(&self) -> bool {
        self.start_hover.is_animating(self.now) || self.stop_hover.is_animating(self.now)
    }

    fn muted(&self, color: Color) -> Color {
        if self.settings.high_contrast {
            Color::WHITE
        } else {
            color
        }
    }
}

fn hover_animation() -> Animation<bool> {
    Animation::new(false)
        .easing(Easing::EaseOut)
        .duration(HOVER_DURATION)
}

fn to_handle(frame: DisplayFrame) -> image::Handle {
    let (width, height) = (frame.width(), frame.height());
    image::Handle::from_rgba(width, height, frame.into_pixels())
}

pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}
