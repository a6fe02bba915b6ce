/// winit adapter: queues window events and tracks held keys
use orrery_core::{Key, Platform, PlatformEvent};
use std::collections::HashSet;
use winit::event::WindowEvent;
use winit::keyboard::{KeyCode, PhysicalKey};

/// Physical key bound to each camera control.
pub fn binding(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyW => Key::Forward,
        KeyCode::KeyS => Key::Back,
        KeyCode::KeyA => Key::StrafeLeft,
        KeyCode::KeyD => Key::StrafeRight,
        KeyCode::Space => Key::Up,
        KeyCode::ShiftLeft => Key::Down,
        KeyCode::ArrowLeft => Key::YawLeft,
        KeyCode::ArrowRight => Key::YawRight,
        KeyCode::ArrowUp => Key::PitchUp,
        KeyCode::ArrowDown => Key::PitchDown,
        _ => return None,
    };
    Some(key)
}

#[derive(Debug, Default)]
pub struct InputState {
    pending: Vec<PlatformEvent>,
    held: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.pending.push(PlatformEvent::CloseRequested),
            WindowEvent::Resized(size) => self.pending.push(PlatformEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.key(code, event.state.is_pressed());
                }
            }
            // keys released while unfocused never report a release
            WindowEvent::Focused(false) => self.held.clear(),
            _ => {}
        }
    }

    pub fn key(&mut self, code: KeyCode, pressed: bool) {
        if code == KeyCode::Escape {
            if pressed {
                self.pending.push(PlatformEvent::CloseRequested);
            }
            return;
        }
        let Some(key) = binding(code) else {
            return;
        };
        if pressed {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }
}

impl Platform for InputState {
    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        std::mem::take(&mut self.pending)
    }

    fn is_key_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }
}
