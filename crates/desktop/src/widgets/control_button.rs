use iced::border::Border;
use iced::widget::{button, container, mouse_area, text};
use iced::{Alignment, Color, Element, Font, Length, Padding, Shadow, Theme, Vector};

use crate::theme::{ButtonColors, DISABLED};

const HOVER_DARKEN: f32 = 0.05;
const FLOAT_HEIGHT: f32 = 1.0;
const CORNER_RADIUS: f32 = 6.0;
const SHADOW_BLUR_BASE: f32 = 10.0;
const SHADOW_BLUR_HOVER: f32 = 15.0;
const SHADOW_OFFSET_Y: f32 = 3.0;
const SHADOW_ALPHA_BASE: f32 = 0.25;
const SHADOW_ALPHA_HOVER: f32 = 0.35;
const WIDTH: f32 = 200.0;

/// A bold, fixed-width action button that lifts slightly while hovered.
///
/// `hover_amount` is the eased hover progress in `0.0..=1.0`. `on_press` of
/// `None` disables the button and greys it out.
pub fn control_button<'a, Message: Clone + 'a>(
    label: &'a str,
    on_press: Option<Message>,
    colors: ButtonColors,
    hover_amount: f32,
    on_hover: impl Fn(bool) -> Message + 'a,
    text_size: f32,
) -> Element<'a, Message> {
    let lift = if on_press.is_some() {
        hover_amount.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let content = text(label)
        .size(text_size)
        .font(Font {
            weight: iced::font::Weight::Bold,
            ..Font::DEFAULT
        })
        .width(Length::Fill)
        .align_x(Alignment::Center);

    let btn = button(content)
        .on_press_maybe(on_press)
        .padding([12, 16])
        .width(Length::Fixed(WIDTH))
        .style(move |_theme: &Theme, status: button::Status| {
            style_for(colors, status, lift)
        });

    let rise = lift * FLOAT_HEIGHT;
    let lifted_btn = container(btn).padding(Padding {
        top: FLOAT_HEIGHT - rise,
        bottom: rise,
        ..Padding::ZERO
    });

    mouse_area(lifted_btn)
        .on_enter(on_hover(true))
        .on_exit(on_hover(false))
        .into()
}

fn style_for(colors: ButtonColors, status: button::Status, lift: f32) -> button::Style {
    match status {
        button::Status::Disabled => disabled(),
        button::Status::Pressed => styled(colors.pressed, 1.0),
        button::Status::Active | button::Status::Hovered => styled(colors.base, lift),
    }
}

fn styled(base: Color, hover_amount: f32) -> button::Style {
    let t = hover_amount;
    button::Style {
        background: Some(darken(base, t).into()),
        text_color: Color::WHITE,
        border: Border {
            radius: CORNER_RADIUS.into(),
            ..Border::default()
        },
        shadow: Shadow {
            color: Color::from_rgba(
                base.r,
                base.g,
                base.b,
                lerp(SHADOW_ALPHA_BASE, SHADOW_ALPHA_HOVER, t),
            ),
            offset: Vector::new(0.0, SHADOW_OFFSET_Y),
            blur_radius: lerp(SHADOW_BLUR_BASE, SHADOW_BLUR_HOVER, t),
        },
        ..button::Style::default()
    }
}

fn disabled() -> button::Style {
    button::Style {
        background: Some(DISABLED.into()),
        text_color: Color::WHITE,
        border: Border {
            radius: CORNER_RADIUS.into(),
            ..Border::default()
        },
        ..button::Style::default()
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn darken(color: Color, amount: f32) -> Color {
    let shift = HOVER_DARKEN * amount;
    Color {
        r: (color.r - shift).max(0.0),
        g: (color.g - shift).max(0.0),
        b: (color.b - shift).max(0.0),
        a: 1.0,
    }
}
