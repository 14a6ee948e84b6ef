//! Screen-space draw list for whatever renders the board.

use crate::model::card::{Card, CardContent, CardId, CardKind};
use crate::model::geometry::{Rect, Vec2};
use crate::model::project::Project;

/// One card as the renderer should draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub id: CardId,
    /// Screen-space rectangle.
    pub rect: Rect,
    pub kind: CardKind,
    /// Numbering label, empty when the card is unnumbered.
    pub label: String,
    pub text: String,
    pub selected: bool,
    pub open: bool,
    /// Completion ratio for cards that can complete.
    pub completion: Option<f32>,
}

fn display_text(card: &Card) -> String {
    match &card.content {
        CardContent::Checkbox { text, .. }
        | CardContent::Numbered { text, .. }
        | CardContent::Note { text } => text.clone(),
        CardContent::Image { path } | CardContent::Sound { path, .. } => path.clone(),
        CardContent::Timer(timer) => format!("{} {:02}:{:02}", timer.name, timer.minutes, timer.seconds),
        CardContent::Map(map) => format!("{}x{}", map.cols(), map.rows()),
    }
}

/// Cards of the active board that intersect a `viewport`-sized screen, in
/// board order.
pub fn draw_list(project: &Project, viewport: Vec2) -> Vec<DrawItem> {
    let camera = &project.camera;
    let top_left = camera.screen_to_world(Vec2::ZERO, viewport);
    let bottom_right = camera.screen_to_world(viewport, viewport);
    let visible = Rect::from_corners(top_left, bottom_right);

    project
        .current_board()
        .cards()
        .filter(|card| card.rect.intersects(&visible))
        .map(|card| {
            let corner = camera.world_to_screen(card.position(), viewport);
            DrawItem {
                id: card.id,
                rect: Rect::new(
                    corner.x,
                    corner.y,
                    card.rect.w * camera.zoom,
                    card.rect.h * camera.zoom,
                ),
                kind: card.kind(),
                label: card.label().to_string(),
                text: display_text(card),
                selected: card.is_selected(),
                open: card.is_open(),
                completion: card.completable().then(|| card.completion().ratio()),
            }
        })
        .collect()
}
