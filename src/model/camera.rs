use super::geometry::Vec2;

/// Zoom factors addressable by the zoom level index.
pub const ZOOM_LEVELS: [f32; 5] = [0.5, 1.0, 2.0, 3.0, 4.0];

/// Default zoom level index (1.0x).
pub const DEFAULT_ZOOM_LEVEL: usize = 1;

/// Fraction of the remaining distance covered per tick while easing.
const EASE: f32 = 0.2;

/// Pan/zoom state of the board view.
///
/// `pan` is the committed target; `offset` and `zoom` ease toward it on every
/// tick so the renderer sees smooth motion. The world point at the centre of
/// the screen is `-offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub pan: Vec2,
    pub offset: Vec2,
    zoom_level: usize,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            pan: Vec2::ZERO,
            offset: Vec2::ZERO,
            zoom_level: DEFAULT_ZOOM_LEVEL,
            zoom: ZOOM_LEVELS[DEFAULT_ZOOM_LEVEL],
        }
    }
}

impl Camera {
    pub fn zoom_level(&self) -> usize {
        self.zoom_level
    }

    /// Set the zoom level index, clamping into the valid range.
    pub fn set_zoom_level(&mut self, level: i64) {
        self.zoom_level = level.clamp(0, ZOOM_LEVELS.len() as i64 - 1) as usize;
    }

    pub fn zoom_by(&mut self, steps: i64) {
        self.set_zoom_level(self.zoom_level as i64 + steps);
    }

    pub fn target_zoom(&self) -> f32 {
        ZOOM_LEVELS[self.zoom_level]
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan = self.pan.add(delta);
    }

    pub fn reset_pan(&mut self) {
        self.pan = Vec2::ZERO;
    }

    /// World point the camera is heading toward (centre of the screen once settled).
    pub fn focus(&self) -> Vec2 {
        self.pan.scale(-1.0)
    }

    /// Pan so that `point` ends up in the centre of the screen.
    pub fn focus_on(&mut self, point: Vec2) {
        self.pan = point.scale(-1.0);
    }

    /// Jump straight to the target without easing.
    pub fn settle(&mut self) {
        self.offset = self.pan;
        self.zoom = self.target_zoom();
    }

    /// Advance the easing animation by one update tick.
    pub fn tick(&mut self) {
        let target = self.target_zoom();
        self.zoom += (target - self.zoom) * EASE;
        if (target - self.zoom).abs() < 0.001 {
            self.zoom = target;
        }

        self.offset.x += (self.pan.x - self.offset.x) * EASE;
        self.offset.y += (self.pan.y - self.offset.y) * EASE;
    }

    pub fn world_to_screen(&self, world: Vec2, viewport: Vec2) -> Vec2 {
        Vec2::new(
            (world.x + self.offset.x) * self.zoom + viewport.x / 2.0,
            (world.y + self.offset.y) * self.zoom + viewport.y / 2.0,
        )
    }

    pub fn screen_to_world(&self, screen: Vec2, viewport: Vec2) -> Vec2 {
        Vec2::new(
            (screen.x - viewport.x / 2.0) / self.zoom - self.offset.x,
            (screen.y - viewport.y / 2.0) / self.zoom - self.offset.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_level_is_clamped() {
        let mut cam = Camera::default();
        cam.zoom_by(10);
        assert_eq!(cam.zoom_level(), ZOOM_LEVELS.len() - 1);
        cam.set_zoom_level(-99);
        assert_eq!(cam.zoom_level(), 0);
    }

    #[test]
    fn reset_pan_recentres_on_origin() {
        let mut cam = Camera::default();
        cam.focus_on(Vec2::new(40.0, -8.0));
        assert_eq!(cam.focus(), Vec2::new(40.0, -8.0));
        cam.reset_pan();
        assert_eq!(cam.focus(), Vec2::ZERO);
    }

    #[test]
    fn tick_eases_toward_target() {
        let mut cam = Camera::default();
        cam.pan = Vec2::new(100.0, 0.0);
        cam.tick();
        assert!((cam.offset.x - 20.0).abs() < 1e-4);
        for _ in 0..200 {
            cam.tick();
        }
        assert!((cam.offset.x - 100.0).abs() < 0.01);
    }

    #[test]
    fn zoom_snaps_when_close() {
        let mut cam = Camera::default();
        cam.set_zoom_level(2);
        for _ in 0..100 {
            cam.tick();
        }
        assert_eq!(cam.zoom, 2.0);
    }

    #[test]
    fn screen_world_round_trip() {
        let mut cam = Camera::default();
        cam.focus_on(Vec2::new(40.0, -8.0));
        cam.set_zoom_level(2);
        cam.settle();
        let viewport = Vec2::new(800.0, 600.0);
        let centre = cam.screen_to_world(Vec2::new(400.0, 300.0), viewport);
        assert_eq!(centre, Vec2::new(40.0, -8.0));
        let world = Vec2::new(10.0, 20.0);
        let back = cam.screen_to_world(cam.world_to_screen(world, viewport), viewport);
        assert!((back.x - world.x).abs() < 1e-3 && (back.y - world.y).abs() < 1e-3);
    }
}
