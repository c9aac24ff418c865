//! Scroll-driven distortion demo
//!
//! Builds a subdivided plane with a custom shader material whose wave
//! strength follows a simulated page scroll, then renders a fixed number of
//! frames through the headless device and logs what each frame cost.

use prism_engine::config::Config;
use prism_engine::prelude::*;
use prism_engine::render::material::MaterialKind;

const FRAME_COUNT: u32 = 180;
const FRAME_TIME: f64 = 1.0 / 60.0;
const CONFIG_PATH: &str = "distortion_demo.toml";

const VERTEX_SHADER: &str = "\
#include <common>
uniform float uTime;
uniform float uScroll;
uniform float uStrength;
out vec2 vUv;
void main() {
  vUv = uv;
  vec3 displaced = position;
  float wave = sin(position.x * 6.0 + uTime * 2.0) * cos(position.y * 4.0 + uScroll * 8.0);
  displaced.z += wave * uStrength;
  gl_Position = projectionMatrix * modelViewMatrix * vec4(displaced, 1.0);
}
";

const FRAGMENT_SHADER: &str = "\
uniform vec3 uTint;
uniform float uScroll;
in vec2 vUv;
void main() {
  float band = smoothstep(0.0, 1.0, fract(vUv.y * 4.0 - uScroll));
  gl_FragColor = vec4(mix(uTint, vec3(1.0), band * 0.35), 1.0);
}
";

/// Eased scroll position in `[0, 1]` at time `t` seconds
fn simulated_scroll(t: f64) -> f64 {
    let raw = (t * 0.35).sin().mul_add(0.5, 0.5);
    raw * raw * 2.0f64.mul_add(-raw, 3.0)
}

pub struct DistortionApp {
    renderer: Renderer<HeadlessDevice>,
    scene: Scene,
    assets: Assets,
    camera: NodeId,
    plane: NodeId,
    material: MaterialHandle,
    elapsed: f64,
    last_scroll: f64,
}

impl DistortionApp {
    pub fn new(config: RendererConfig) -> Result<Self, Box<dyn std::error::Error>> {
        log::info!("Creating distortion demo ({}x{})", config.width, config.height);
        let aspect = f64::from(config.width) / f64::from(config.height.max(1));
        let renderer = Renderer::new(HeadlessDevice::new(), config)?;

        let mut assets = Assets::new();
        let mut scene = Scene::new();
        scene.background = Some(prism_engine::scene::Background::Color(Color::new(0.02, 0.02, 0.05)));

        let geometry = assets.add_geometry(plane_geometry(4.0, 3.0, 48, 36));
        let mut params = ShaderParams::new(VERTEX_SHADER, FRAGMENT_SHADER);
        params.uniforms.insert("uTime".to_string(), UniformValue::Float(0.0));
        params.uniforms.insert("uScroll".to_string(), UniformValue::Float(0.0));
        params.uniforms.insert("uStrength".to_string(), UniformValue::Float(0.0));
        params
            .uniforms
            .insert("uTint".to_string(), UniformValue::Color(Color::new(0.2, 0.45, 0.9)));
        let material = assets.add_material(
            Material::shader(params)
                .with_name("distortion")
                .with_side(Side::Double),
        );

        let plane = scene.add(Node::mesh(Mesh::new(geometry, material)).with_name("plane"))?;
        let camera = scene.add(
            Node::camera(Camera::perspective(45.0, aspect, 0.1, 50.0))
                .with_name("camera")
                .with_position(Vector3::new(0.0, 0.0, 6.0)),
        )?;

        Ok(Self {
            renderer,
            scene,
            assets,
            camera,
            plane,
            material,
            elapsed: 0.0,
            last_scroll: 0.0,
        })
    }

    /// Advance the simulation by one frame and render it
    pub fn frame(&mut self, index: u32) -> Result<(), Box<dyn std::error::Error>> {
        self.elapsed += FRAME_TIME;
        let scroll = simulated_scroll(self.elapsed);
        let velocity = (scroll - self.last_scroll) / FRAME_TIME;
        self.last_scroll = scroll;

        if let Some(MaterialKind::Shader(params)) = self.assets.material_mut(self.material).map(|m| &mut m.kind) {
            params.uniforms.insert("uTime".to_string(), UniformValue::Float(self.elapsed));
            params.uniforms.insert("uScroll".to_string(), UniformValue::Float(scroll));
            params
                .uniforms
                .insert("uStrength".to_string(), UniformValue::Float((velocity.abs() * 0.4).min(0.6)));
        }
        if let Some(node) = self.scene.node_mut(self.plane) {
            node.set_position(Vector3::new(0.0, scroll.mul_add(-2.0, 1.0), 0.0));
            node.set_rotation(prism_engine::foundation::math::Euler::new(
                velocity * 0.15,
                0.0,
                0.0,
                prism_engine::foundation::math::EulerOrder::Xyz,
            ));
        }

        // Simulated window resize halfway through
        if index == FRAME_COUNT / 2 {
            self.resize(1024, 576);
        }

        self.renderer.render(&mut self.scene, &mut self.assets, self.camera)?;

        let info = self.renderer.info();
        if index % 30 == 0 {
            log::info!(
                "Frame {index}: scroll {scroll:.3}, {} calls, {} triangles, {} programs, {} geometries",
                info.calls,
                info.triangles,
                info.programs,
                info.geometries
            );
        } else {
            log::debug!("Frame {index}: scroll {scroll:.3}, velocity {velocity:.3}");
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::info!("Resizing to {width}x{height}");
        self.renderer.set_size(width, height);
        if let Some(camera) = self.scene.node_mut(self.camera).and_then(Node::as_camera_mut) {
            camera.set_aspect(f64::from(width) / f64::from(height));
        }
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        for index in 0..FRAME_COUNT {
            self.frame(index)?;
        }
        let device = self.renderer.device();
        log::info!(
            "Rendered {} frames: {} draws recorded, {} buffers, {} programs alive",
            self.renderer.info().frame,
            device.draw_calls().len(),
            device.buffer_count(),
            device.program_count()
        );
        self.renderer.dispose();
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = EngineConfig::load_or_default(&path)?;
    config.validate()?;

    env_logger::Builder::from_default_env()
        .filter_level(config.level_filter()?)
        .init();

    log::info!("Starting distortion demo");
    let mut app = DistortionApp::new(config.renderer)?;
    app.run()?;
    log::info!("Distortion demo finished");
    Ok(())
}
