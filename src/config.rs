//! Startup configuration for the window, projection and camera.

use cgmath::{Deg, Point3};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_colour: wgpu::Color,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub camera_position: Point3<f32>,
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    /// Hide the cursor and use it for mouse look.
    pub capture_cursor: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "instanced-fly".to_string(),
            width: 1280,
            height: 720,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 100.0,
            camera_position: Point3::new(0.0, 0.0, 5.0),
            camera_speed: 10.0,
            mouse_sensitivity: 0.0005,
            capture_cursor: true,
        }
    }
}

impl EngineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_clear_colour(mut self, r: f64, g: f64, b: f64) -> Self {
        self.clear_colour = wgpu::Color { r, g, b, a: 1.0 };
        self
    }

    pub fn with_projection(mut self, fovy: Deg<f32>, znear: f32, zfar: f32) -> Self {
        self.fovy = fovy;
        self.znear = znear;
        self.zfar = zfar;
        self
    }

    pub fn with_camera(mut self, position: Point3<f32>, speed: f32) -> Self {
        self.camera_position = position;
        self.camera_speed = speed;
        self
    }

    pub fn with_mouse_sensitivity(mut self, radians_per_pixel: f32) -> Self {
        self.mouse_sensitivity = radians_per_pixel;
        self
    }

    pub fn with_capture_cursor(mut self, capture: bool) -> Self {
        self.capture_cursor = capture;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_setup() {
        let config = EngineConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.camera_speed, 10.0);
        assert_eq!(config.zfar, 100.0);
        assert!(config.capture_cursor);
    }

    #[test]
    fn setters_chain() {
        let config = EngineConfig::default()
            .with_title("test")
            .with_size(640, 480)
            .with_camera(Point3::new(1.0, 2.0, 3.0), 4.0)
            .with_capture_cursor(false);
        assert_eq!(config.title, "test");
        assert_eq!(config.width, 640);
        assert_eq!(config.camera_position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(config.camera_speed, 4.0);
        assert!(!config.capture_cursor);
    }
}
