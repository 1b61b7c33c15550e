use std::collections::HashSet;

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::CameraMovement;

/// Pixels per scroll "line" when a touchpad reports pixel deltas.
const PIXELS_PER_LINE: f32 = 120.0;

/// Keyboard and scroll state collected from window events.
///
/// `pressed` and `released` sets and the scroll accumulator cover the current
/// frame only and are cleared by [`Input::begin_frame`].
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
    scroll: f32,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.scroll = 0.0;
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => self.release(key),
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.scroll_by(lines);
            }
            WindowEvent::Focused(false) => self.keys_down.clear(),
            _ => {}
        }
    }

    pub fn press(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: KeyCode) {
        if self.keys_down.remove(&key) {
            self.keys_released.insert(key);
        }
    }

    pub fn scroll_by(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// True only on the frame the key went down.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Vertical scroll this frame, in lines. Positive is away from the user.
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Camera moves requested by held arrow keys.
    pub fn camera_movements(&self) -> impl Iterator<Item = CameraMovement> + '_ {
        [
            (KeyCode::ArrowLeft, CameraMovement::Left),
            (KeyCode::ArrowRight, CameraMovement::Right),
            (KeyCode::ArrowUp, CameraMovement::Up),
            (KeyCode::ArrowDown, CameraMovement::Down),
        ]
        .into_iter()
        .filter(|(key, _)| self.key_down(*key))
        .map(|(_, movement)| movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_only_on_the_first_frame() {
        let mut input = Input::new();
        input.press(KeyCode::KeyW);
        assert!(input.key_pressed(KeyCode::KeyW));

        input.begin_frame();
        input.press(KeyCode::KeyW);
        assert!(input.key_down(KeyCode::KeyW));
        assert!(!input.key_pressed(KeyCode::KeyW));

        input.release(KeyCode::KeyW);
        assert!(input.key_released(KeyCode::KeyW));
        assert!(!input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn scroll_resets_each_frame() {
        let mut input = Input::new();
        input.scroll_by(1.0);
        input.scroll_by(0.5);
        assert_eq!(input.scroll(), 1.5);
        input.begin_frame();
        assert_eq!(input.scroll(), 0.0);
    }

    #[test]
    fn arrow_keys_map_to_camera_moves() {
        let mut input = Input::new();
        input.press(KeyCode::ArrowLeft);
        input.press(KeyCode::ArrowUp);
        input.press(KeyCode::KeyQ);

        let moves: Vec<_> = input.camera_movements().collect();
        assert_eq!(moves, vec![CameraMovement::Left, CameraMovement::Up]);
    }
}
