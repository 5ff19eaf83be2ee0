use iced::color;
use iced::theme::Palette;
use iced::{Color, Theme};

/// Header title and primary accent.
pub const ACCENT: Color = color!(0x00, 0xd2, 0xff);
pub const SUBTITLE: Color = color!(0x88, 0x88, 0x88);
pub const VIDEO_BACKGROUND: Color = color!(0x00, 0x00, 0x00);
pub const STATUS_BACKGROUND: Color = color!(0x2d, 0x2d, 0x2d);
pub const STATUS_TEXT: Color = color!(0xaa, 0xaa, 0xaa);
pub const DISABLED: Color = color!(0x44, 0x44, 0x44);

/// Fill colours of a control button at rest and while pressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonColors {
    pub base: Color,
    pub pressed: Color,
}

pub const START_BUTTON: ButtonColors = ButtonColors {
    base: color!(0x00, 0xc8, 0x53),
    pressed: color!(0x00, 0x96, 0x24),
};

pub const STOP_BUTTON: ButtonColors = ButtonColors {
    base: color!(0xd5, 0x00, 0x00),
    pressed: color!(0x9b, 0x00, 0x00),
};

/// Resolve the iced Theme from the high_contrast setting.
pub fn resolve_theme(high_contrast: bool) -> Theme {
    let palette = if high_contrast {
        high_contrast_palette()
    } else {
        dark_palette()
    };
    Theme::custom("Face Detection Pro", palette)
}

fn dark_palette() -> Palette {
    Palette {
        background: color!(0x1e, 0x1e, 0x1e),
        text: color!(0xcc, 0xcc, 0xcc),
        primary: ACCENT,
        success: START_BUTTON.base,
        warning: color!(0xff, 0xcc, 0x00),
        danger: STOP_BUTTON.base,
    }
}

fn high_contrast_palette() -> Palette {
    Palette {
        background: color!(0x00, 0x00, 0x00),
        text: color!(0xff, 0xff, 0xff),
        primary: color!(0x6c, 0xe4, 0xff),
        success: color!(0x30, 0xd1, 0x58),
        warning: color!(0xff, 0xd6, 0x0a),
        danger: color!(0xff, 0x45, 0x3a),
    }
}
