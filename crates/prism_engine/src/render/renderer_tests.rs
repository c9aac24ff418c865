//! Frame-level tests against the headless device

use crate::assets::{Assets, MaterialHandle};
use crate::core::config::{RendererConfig, ShaderErrorPolicy};
use crate::foundation::math::{Color, Vector3};
use crate::geometry::{box_geometry, BufferAttribute, ComponentType, Geometry};
use crate::render::backend::{DeviceCommand, StateChange};
use crate::render::material::{Blending, Material, MaterialPatch, PhysicalParams, ShaderParams};
use crate::render::uniforms::UniformValue;
use crate::render::{HeadlessDevice, RenderError, Renderer, ShaderError};
use crate::scene::{Camera, Light, LightTarget, Mesh, Node, NodeId, Scene};

const VERTEX: &str = "void main() {\n  gl_Position = projectionMatrix * modelViewMatrix * vec4(position, 1.0);\n}\n";

struct Fixture {
    renderer: Renderer<HeadlessDevice>,
    scene: Scene,
    assets: Assets,
    camera: NodeId,
}

impl Fixture {
    fn new(config: RendererConfig) -> Self {
        let renderer = Renderer::new(HeadlessDevice::new(), config).unwrap();
        let mut scene = Scene::new();
        let camera = scene
            .add(Node::camera(Camera::perspective(50.0, 1.0, 0.1, 100.0)).with_name("camera"))
            .unwrap();
        Self {
            renderer,
            scene,
            assets: Assets::new(),
            camera,
        }
    }

    fn basic() -> Self {
        Self::new(RendererConfig::new(64, 64))
    }

    fn add_mesh(&mut self, geometry: Geometry, material: MaterialHandle, position: Vector3) -> NodeId {
        let geometry = self.assets.add_geometry(geometry);
        self.scene
            .add(Node::mesh(Mesh::new(geometry, material)).with_position(position))
            .unwrap()
    }

    fn add_box(&mut self, material: MaterialHandle, position: Vector3) -> NodeId {
        self.add_mesh(box_geometry(1.0, 1.0, 1.0, 1, 1, 1), material, position)
    }

    fn render(&mut self) -> Result<(), RenderError> {
        self.renderer.render(&mut self.scene, &mut self.assets, self.camera)
    }

    fn device(&mut self) -> &mut HeadlessDevice {
        self.renderer.device_mut()
    }
}

fn shader_material(fragment: &str) -> Material {
    Material::shader(ShaderParams::new(VERTEX, fragment))
}

#[test]
fn test_identical_materials_share_one_program() {
    let mut fx = Fixture::basic();
    let a = fx.assets.add_material(Material::lambert(Color::WHITE));
    let b = fx.assets.add_material(Material::lambert(Color::new(1.0, 0.0, 0.0)));
    fx.add_box(a, Vector3::new(-1.0, 0.0, -5.0));
    fx.add_box(b, Vector3::new(1.0, 0.0, -5.0));
    fx.render().unwrap();

    let programs = fx.renderer.programs();
    assert_eq!(programs.len(), 1);
    assert_eq!(programs.iter().next().map(|p| p.used_times), Some(2));
    assert_eq!(fx.renderer.info().calls, 2);
    assert_eq!(fx.renderer.info().programs, 1);
}

#[test]
fn test_disposing_materials_releases_program() {
    let mut fx = Fixture::basic();
    let a = fx.assets.add_material(Material::basic(Color::WHITE));
    let b = fx.assets.add_material(Material::basic(Color::WHITE));
    fx.add_box(a, Vector3::new(0.0, 0.0, -5.0));
    fx.add_box(b, Vector3::new(0.0, 1.0, -5.0));
    fx.render().unwrap();
    assert_eq!(fx.device().program_count(), 1);

    fx.assets.dispose_material(a).unwrap();
    fx.renderer.process_disposals(&mut fx.assets);
    assert_eq!(fx.renderer.programs().iter().next().map(|p| p.used_times), Some(1));

    fx.assets.dispose_material(b).unwrap();
    assert_eq!(fx.renderer.process_disposals(&mut fx.assets), 1);
    assert!(fx.renderer.programs().is_empty());
    assert_eq!(fx.device().program_count(), 0);
}

#[test]
fn test_flag_change_builds_distinct_program() {
    let mut fx = Fixture::basic();
    let a = fx.assets.add_material(Material::lambert(Color::WHITE));
    let b = fx.assets.add_material(Material::lambert(Color::WHITE));
    fx.add_box(a, Vector3::new(0.0, 0.0, -5.0));
    fx.add_box(b, Vector3::new(0.0, 1.0, -5.0));
    fx.render().unwrap();
    assert_eq!(fx.renderer.programs().len(), 1);

    let changed = fx.assets.material_mut(b).unwrap().apply(MaterialPatch {
        vertex_colors: Some(true),
        ..MaterialPatch::new()
    });
    assert!(changed);
    fx.render().unwrap();

    let programs = fx.renderer.programs();
    assert_eq!(programs.len(), 2);
    assert!(programs.iter().all(|p| p.used_times == 1));
}

#[test]
fn test_direct_field_edit_needs_update() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::lambert(Color::WHITE));
    fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    fx.render().unwrap();
    let before: Vec<String> = fx.renderer.programs().iter().map(|p| p.key.clone()).collect();

    fx.assets.material_mut(material).unwrap().flat_shading = true;
    fx.render().unwrap();
    let unchanged: Vec<String> = fx.renderer.programs().iter().map(|p| p.key.clone()).collect();
    assert_eq!(before, unchanged);

    fx.assets.material_mut(material).unwrap().needs_update();
    fx.render().unwrap();
    let after: Vec<String> = fx.renderer.programs().iter().map(|p| p.key.clone()).collect();
    assert_eq!(after.len(), 1);
    assert_ne!(before, after);
}

#[test]
fn test_opaque_near_to_far_transparent_far_to_near() {
    let mut fx = Fixture::basic();
    let opaque = fx.assets.add_material(Material::basic(Color::WHITE));
    let glass = fx
        .assets
        .add_material(Material::basic(Color::WHITE).with_transparency(0.5));
    fx.add_box(opaque, Vector3::new(0.0, 0.0, -20.0));
    fx.add_box(opaque, Vector3::new(0.0, 0.0, -4.0));
    fx.add_box(glass, Vector3::new(0.0, 0.0, -3.0));
    fx.add_box(glass, Vector3::new(0.0, 0.0, -10.0));
    fx.render().unwrap();

    let depths: Vec<f64> = fx
        .device()
        .commands()
        .iter()
        .filter_map(|command| match command {
            DeviceCommand::Uniform {
                name,
                value: UniformValue::Mat4(matrix),
                ..
            } if name == "modelMatrix" => Some(Vector3::from_matrix_position(matrix).z),
            _ => None,
        })
        .collect();
    assert_eq!(depths, vec![-4.0, -20.0, -10.0, -3.0]);
}

#[test]
fn test_render_order_overrides_depth() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    let far = fx.add_box(material, Vector3::new(0.0, 0.0, -30.0));
    fx.add_box(material, Vector3::new(0.0, 0.0, -3.0));
    fx.scene.node_mut(far).unwrap().render_order = -1;
    fx.render().unwrap();

    let first = fx.device().commands().iter().find_map(|command| match command {
        DeviceCommand::Uniform {
            name,
            value: UniformValue::Mat4(matrix),
            ..
        } if name == "modelMatrix" => Some(Vector3::from_matrix_position(matrix).z),
        _ => None,
    });
    assert_eq!(first, Some(-30.0));
}

#[test]
fn test_static_scene_uploads_once() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    let mesh = fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    fx.render().unwrap();
    let buffers = fx.device().buffer_count();
    assert!(buffers > 0);

    fx.device().clear_commands();
    fx.render().unwrap();
    let uploads = fx.device().count(|c| {
        matches!(c, DeviceCommand::CreateBuffer { .. } | DeviceCommand::UpdateBuffer { .. })
    });
    assert_eq!(uploads, 0);

    let handle = fx.scene.node(mesh).and_then(Node::as_mesh).unwrap().geometry;
    let position = fx
        .assets
        .geometry_mut(handle)
        .and_then(|g| g.attribute_mut("position"))
        .unwrap();
    position.set_x(0, 0.75).unwrap();
    position.needs_update();
    fx.device().clear_commands();
    fx.render().unwrap();

    assert_eq!(fx.device().count(|c| matches!(c, DeviceCommand::UpdateBuffer { .. })), 1);
    assert_eq!(fx.device().count(|c| matches!(c, DeviceCommand::CreateBuffer { .. })), 0);
    assert_eq!(fx.device().buffer_count(), buffers);
}

#[test]
fn test_repeated_frame_issues_no_state_changes() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    fx.render().unwrap();
    assert!(!fx.device().state_changes().is_empty());

    fx.device().clear_commands();
    fx.render().unwrap();
    assert!(fx.device().state_changes().is_empty());
    assert_eq!(fx.device().draw_calls().len(), 1);
}

#[test]
fn test_transparent_material_enables_blending() {
    let mut fx = Fixture::basic();
    let opaque = fx.assets.add_material(Material::basic(Color::WHITE));
    let glass = fx
        .assets
        .add_material(Material::basic(Color::WHITE).with_transparency(0.3));
    fx.add_box(opaque, Vector3::new(0.0, 0.0, -8.0));
    fx.add_box(glass, Vector3::new(0.0, 0.0, -4.0));
    fx.render().unwrap();

    let blends: Vec<bool> = fx
        .device()
        .state_changes()
        .into_iter()
        .filter_map(|change| match change {
            StateChange::Blend(function) => Some(function.is_some()),
            _ => None,
        })
        .collect();
    assert_eq!(blends, vec![false, true]);

    let none = fx
        .assets
        .add_material(Material::basic(Color::WHITE).with_blending(Blending::None));
    assert!(fx.assets.material(none).is_some_and(|m| m.blending.function(false).is_none()));
}

#[test]
fn test_context_loss_suspends_until_restored() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    fx.render().unwrap();

    fx.device().simulate_context_loss();
    fx.device().clear_commands();
    fx.render().unwrap();
    assert!(fx.renderer.is_context_lost());
    assert!(fx.device().draw_calls().is_empty());

    fx.device().restore_context();
    fx.renderer.restore_context();
    fx.render().unwrap();
    assert!(!fx.renderer.is_context_lost());
    assert_eq!(fx.device().draw_calls().len(), 1);
    assert!(fx.device().buffer_count() > 0);
    assert_eq!(fx.device().program_count(), 1);
}

#[test]
fn test_unresolved_chunk_halts_frame_once() {
    let mut config = RendererConfig::new(64, 64);
    config.shader_error_policy = ShaderErrorPolicy::HaltFrame;
    let mut fx = Fixture::new(config);
    let broken = fx.assets.add_material(shader_material(
        "#include <not_a_chunk>\nvoid main() {\n  gl_FragColor = vec4(1.0);\n}\n",
    ));
    fx.add_box(broken, Vector3::new(0.0, 0.0, -5.0));

    match fx.render() {
        Err(RenderError::Shader(ShaderError::UnresolvedChunk(name))) => assert_eq!(name, "not_a_chunk"),
        other => panic!("expected unresolved chunk, got {other:?}"),
    }
    let message = ShaderError::UnresolvedChunk("not_a_chunk".to_string()).to_string();
    assert!(message.contains("not_a_chunk"));

    fx.render().unwrap();
    assert!(fx.device().draw_calls().is_empty());
}

#[test]
fn test_skip_draw_policy_keeps_other_draws() {
    let mut config = RendererConfig::new(64, 64);
    config.shader_error_policy = ShaderErrorPolicy::SkipDraw;
    let mut fx = Fixture::new(config);
    let broken = fx.assets.add_material(shader_material(
        "void main() {\n#error deliberately broken\n  gl_FragColor = vec4(1.0);\n}\n",
    ));
    let fine = fx.assets.add_material(Material::basic(Color::WHITE));
    fx.add_box(broken, Vector3::new(0.0, 0.0, -5.0));
    fx.add_box(fine, Vector3::new(0.0, 1.0, -5.0));

    fx.render().unwrap();
    assert_eq!(fx.device().draw_calls().len(), 1);
    let failed = fx.renderer.programs().iter().find(|p| !p.is_runnable()).unwrap();
    assert!(matches!(failed.diagnostics.error(), Some(ShaderError::Compile { .. })));
}

#[test]
fn test_shader_material_uniforms_forwarded() {
    let mut fx = Fixture::basic();
    let mut material = shader_material("uniform float time;\nvoid main() {\n  gl_FragColor = vec4(time);\n}\n");
    if let crate::render::material::MaterialKind::Shader(params) = &mut material.kind {
        params.uniforms.insert("time".to_string(), UniformValue::Float(0.25));
        params.uniforms.insert("unused".to_string(), UniformValue::Float(1.0));
    }
    let handle = fx.assets.add_material(material);
    fx.add_box(handle, Vector3::new(0.0, 0.0, -5.0));
    fx.render().unwrap();

    let names: Vec<&str> = fx
        .renderer
        .device()
        .commands()
        .iter()
        .filter_map(|command| match command {
            DeviceCommand::Uniform { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert!(names.contains(&"time"));
    assert!(!names.contains(&"unused"));
}

#[test]
fn test_index_width_follows_vertex_count() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));

    let wide = Geometry::new()
        .with_attribute("position", BufferAttribute::zeroed(70_000, 3))
        .with_index(&[0, 1, 69_999]);
    let wide_node = fx.add_mesh(wide, material, Vector3::new(0.0, 0.0, -6.0));
    fx.scene.node_mut(wide_node).unwrap().frustum_culled = false;
    fx.render().unwrap();

    let mut widths: Vec<Option<ComponentType>> =
        fx.device().draw_calls().iter().map(|call| call.index_type).collect();
    widths.sort_by_key(|width| matches!(width, Some(ComponentType::U32)));
    assert_eq!(widths, vec![Some(ComponentType::U16), Some(ComponentType::U32)]);
}

#[test]
fn test_frustum_culling_and_visibility() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    let behind = fx.add_box(material, Vector3::new(0.0, 0.0, 50.0));
    let hidden = fx.add_box(material, Vector3::new(0.0, 0.5, -5.0));
    fx.scene.node_mut(hidden).unwrap().visible = false;
    fx.render().unwrap();
    assert_eq!(fx.renderer.info().calls, 1);

    fx.scene.node_mut(behind).unwrap().frustum_culled = false;
    fx.render().unwrap();
    assert_eq!(fx.renderer.info().calls, 2);
}

#[test]
fn test_empty_draw_range_skipped() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    let mut geometry = box_geometry(1.0, 1.0, 1.0, 1, 1, 1);
    geometry.set_draw_range(0, Some(0));
    fx.add_mesh(geometry, material, Vector3::new(0.0, 0.0, -5.0));
    fx.render().unwrap();
    assert!(fx.device().draw_calls().is_empty());
}

#[test]
fn test_draw_range_past_element_count_skipped() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    let mut geometry = box_geometry(1.0, 1.0, 1.0, 1, 1, 1);
    geometry.set_draw_range(100, None);
    fx.add_mesh(geometry, material, Vector3::new(0.0, 0.0, -5.0));

    let mut grouped = box_geometry(1.0, 1.0, 1.0, 1, 1, 1);
    grouped.clear_groups().add_group(60, 6, 0);
    let grouped = fx.assets.add_geometry(grouped);
    fx.scene
        .add(Node::mesh(Mesh::multi(grouped, vec![material])).with_position(Vector3::new(0.0, 0.0, -6.0)))
        .unwrap();

    fx.render().unwrap();
    assert!(fx.device().draw_calls().is_empty());
    assert_eq!(fx.renderer.info().calls, 0);
}

#[test]
fn test_multi_material_groups_draw_separately() {
    let mut fx = Fixture::basic();
    let red = fx.assets.add_material(Material::basic(Color::new(1.0, 0.0, 0.0)));
    let blue = fx.assets.add_material(Material::basic(Color::new(0.0, 0.0, 1.0)));
    let mut geometry = box_geometry(1.0, 1.0, 1.0, 1, 1, 1);
    geometry.clear_groups().add_group(0, 18, 0).add_group(18, 18, 1);
    let geometry = fx.assets.add_geometry(geometry);
    fx.scene
        .add(Node::mesh(Mesh::multi(geometry, vec![red, blue])).with_position(Vector3::new(0.0, 0.0, -5.0)))
        .unwrap();
    fx.render().unwrap();

    let mut spans: Vec<(usize, usize)> = fx
        .device()
        .draw_calls()
        .iter()
        .map(|call| (call.start, call.count))
        .collect();
    spans.sort_unstable();
    assert_eq!(spans, vec![(0, 18), (18, 18)]);
}

#[test]
fn test_shadow_pass_renders_casters() {
    let mut config = RendererConfig::new(64, 64);
    config.shadows.enabled = true;
    let mut fx = Fixture::new(config);
    let material = fx.assets.add_material(Material::lambert(Color::WHITE));
    let caster = fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    fx.scene.node_mut(caster).unwrap().cast_shadow = true;
    let light = Light::directional(Color::WHITE, 1.0)
        .with_target(LightTarget::Point(Vector3::new(0.0, 0.0, -5.0)))
        .with_shadow();
    let mut sun = Node::light(light)
        .with_position(Vector3::new(0.0, 10.0, 0.0));
    sun.cast_shadow = true;
    fx.scene.add(sun).unwrap();
    fx.render().unwrap();

    assert_eq!(fx.device().framebuffer_count(), 1);
    assert_eq!(fx.renderer.info().calls, 2);
    let programs = fx.renderer.programs().len();
    assert_eq!(programs, 2);
}

#[test]
fn test_transmissive_items_get_offscreen_copy() {
    let mut fx = Fixture::basic();
    let solid = fx.assets.add_material(Material::basic(Color::WHITE));
    let glass = fx.assets.add_material(Material::physical(PhysicalParams {
        transmission: 1.0,
        ..PhysicalParams::default()
    }));
    fx.add_box(solid, Vector3::new(0.0, 0.0, -10.0));
    fx.add_box(glass, Vector3::new(0.0, 0.0, -4.0));
    fx.render().unwrap();

    assert_eq!(fx.device().framebuffer_count(), 1);
    // the opaque box draws offscreen and on screen, the glass once
    assert_eq!(fx.renderer.info().calls, 3);
}

#[test]
fn test_render_target_output() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    let target = fx
        .assets
        .add_render_target(crate::assets::RenderTarget::new(32, 16));
    fx.renderer.set_render_target(Some(target));
    fx.render().unwrap();

    assert_eq!(fx.device().framebuffer_count(), 1);
    let viewports: Vec<(u32, u32)> = fx
        .device()
        .state_changes()
        .into_iter()
        .filter_map(|change| match change {
            StateChange::Viewport(viewport) => Some((viewport.width, viewport.height)),
            _ => None,
        })
        .collect();
    assert_eq!(viewports, vec![(32, 16)]);

    fx.assets.dispose_render_target(target).unwrap();
    fx.render().unwrap();
    assert_eq!(fx.renderer.render_target(), None);
    assert_eq!(fx.device().framebuffer_count(), 0);
}

#[test]
fn test_missing_camera_is_reported() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::basic(Color::WHITE));
    let mesh = fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    let result = fx.renderer.render(&mut fx.scene, &mut fx.assets, mesh);
    assert!(matches!(result, Err(RenderError::UnsupportedOperation(_))));
}

#[test]
fn test_pixel_ratio_scales_viewport() {
    let mut fx = Fixture::basic();
    fx.renderer.set_pixel_ratio(2.0);
    assert_eq!(fx.renderer.drawing_buffer_size(), (128, 128));
    fx.renderer.set_viewport(8, 8, 16, 16);
    let viewport = fx.renderer.viewport();
    assert_eq!((viewport.x, viewport.y, viewport.width, viewport.height), (16, 16, 32, 32));
    fx.renderer.set_pixel_ratio(-1.0);
    assert_eq!(fx.renderer.pixel_ratio(), 2.0);
}

#[test]
fn test_dispose_releases_device_objects() {
    let mut fx = Fixture::basic();
    let material = fx.assets.add_material(Material::lambert(Color::WHITE));
    fx.add_box(material, Vector3::new(0.0, 0.0, -5.0));
    fx.render().unwrap();
    assert!(fx.device().buffer_count() > 0);

    fx.renderer.dispose();
    assert_eq!(fx.device().buffer_count(), 0);
    assert_eq!(fx.device().program_count(), 0);
    assert_eq!(fx.renderer.info().programs, 0);

    fx.device().clear_commands();
    fx.render().unwrap();
    assert_eq!(fx.device().draw_calls().len(), 1);
    assert_eq!(fx.device().program_count(), 1);
}
