//! # Renderer
//!
//! Retained-mode frame loop over a [`GraphicsDevice`].
//!
//! A frame runs in fixed order: pending disposals are released, world
//! matrices refreshed, the scene classified into render lists, lights set
//! up, shadow maps rendered, and finally the opaque, transmissive and
//! transparent lists are drawn. Every device object is created lazily
//! through a version-keyed cache, so a static scene costs no uploads after
//! its first frame.

use std::collections::HashSet;

use crate::assets::{Assets, RenderTargetHandle, ResourceKey};
use crate::core::config::{RendererConfig, ShaderErrorPolicy};
use crate::foundation::math::{ColorSpace, CoordinateSystem, Frustum, Matrix4, Plane, Sphere, Vector2, Vector3};
use crate::geometry::{DrawRange, Geometry, GeometryGroup};
use crate::scene::{Background, DrawMode, Fog, Instancing, Layers, Light, Mesh, Node, NodeId, NodeKind, Scene, SceneGraph};

use super::backend::{
    BufferTarget, CullFace, DrawCall, FramebufferId, GraphicsDevice, Primitive, ProgramId, StateChange,
    TextureDescriptor, TextureId, VertexBinding, Viewport,
};
use super::caches::{BufferCache, MaterialCache, MaterialSignature, TextureCache};
use super::clipping::ClippingState;
use super::info::RenderInfo;
use super::lights::{CollectedLight, LightState};
use super::material::{Blending, CompareFunction, Material, Side};
use super::render_list::{RenderBucket, RenderItem, RenderLists};
use super::shader::{FogMode, ObjectTraits, Program, ProgramCache, ProgramParameters, ProgramSettings, ShaderError, ShaderLibrary};
use super::shadow_map::{shadow_uniforms, ShadowMaps, ShadowView};
use super::state::StateTracker;
use super::uniforms::{base_name, camera_uniforms, fog_uniforms, material_uniforms, object_uniforms, UniformValue, Uniforms};
use super::{RenderError, RenderResult};

/// Offscreen color buffer the opaque pass is copied into for transmission
#[derive(Debug, Clone, Copy)]
struct InternalTarget {
    texture: TextureId,
    framebuffer: FramebufferId,
    size: (u32, u32),
}

/// Where the main passes land
#[derive(Debug, Clone, Copy)]
struct Output {
    framebuffer: Option<FramebufferId>,
    viewport: Viewport,
    to_target: bool,
}

/// Camera matrices for one frame
#[derive(Debug, Clone, Copy)]
struct CameraView {
    projection: Matrix4,
    view: Matrix4,
    world: Matrix4,
}

/// Per-pass draw inputs
#[derive(Debug, Clone)]
struct Pass {
    view: Matrix4,
    camera: Uniforms,
    settings: ProgramSettings,
    depth_only: bool,
    transmission: Option<(TextureId, (u32, u32))>,
}

/// Scene-wide uniforms shared by every draw of a frame
#[derive(Debug, Default)]
struct FrameData {
    fog: Option<Fog>,
    shadows: Uniforms,
    shadow_samplers: Vec<(String, NodeId)>,
}

/// Everything a draw needs that can be computed from immutable scene state
#[derive(Debug)]
struct DrawSetup {
    key: String,
    uniforms: Uniforms,
    states: Vec<StateChange>,
    lit: bool,
    fogged: bool,
    primitive: Primitive,
    morph_slots: Vec<usize>,
    span: (usize, usize),
    instances: Option<usize>,
}

/// Hands out texture units for one draw
struct TextureUnits {
    next: u32,
    max: u32,
}

impl TextureUnits {
    const fn new(max: u32) -> Self {
        Self { next: 0, max }
    }

    fn bind<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, program: ProgramId, name: &str, texture: TextureId) {
        if self.next >= self.max {
            log::warn!("Texture unit limit {} reached; sampler '{name}' left unbound", self.max);
            return;
        }
        device.bind_texture(self.next, texture);
        device.set_uniform(program, name, &UniformValue::Sampler(self.next));
        self.next += 1;
    }
}

/// Retained-mode renderer
///
/// Owns the device and every object created on it. Scenes and assets stay
/// with the caller and are borrowed per call.
pub struct Renderer<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    programs: ProgramCache,
    materials: MaterialCache,
    buffers: BufferCache,
    textures: TextureCache,
    shadows: ShadowMaps,
    depth_programs: HashSet<String>,
    state: StateTracker,
    lists: RenderLists,
    casters: Vec<RenderItem>,
    lights: LightState,
    collected: Vec<CollectedLight>,
    clipping: ClippingState,
    info: RenderInfo,
    viewport: Viewport,
    scissor: Viewport,
    scissor_test: bool,
    render_target: Option<RenderTargetHandle>,
    transmission_target: Option<InternalTarget>,
    context_lost: bool,
    reported: HashSet<String>,
}

impl<D: GraphicsDevice> Renderer<D> {
    /// Create a renderer with the built-in shader library
    pub fn new(device: D, config: RendererConfig) -> RenderResult<Self> {
        Self::with_library(device, config, ShaderLibrary::new())
    }

    /// Create a renderer whose programs resolve chunks from `library`
    pub fn with_library(device: D, config: RendererConfig, library: ShaderLibrary) -> RenderResult<Self> {
        config.validate()?;
        let mut clipping = ClippingState::new();
        clipping.set_local_enabled(config.local_clipping_enabled);
        let (width, height) = scaled_size(config.width, config.height, config.pixel_ratio);
        let viewport = Viewport::new(0, 0, width, height);
        log::info!(
            "Renderer initialized on '{}' ({}x{} @ {}x, {})",
            device.name(),
            config.width,
            config.height,
            config.pixel_ratio,
            config.coordinate_system
        );
        Ok(Self {
            device,
            programs: ProgramCache::with_library(library),
            materials: MaterialCache::new(),
            buffers: BufferCache::new(),
            textures: TextureCache::new(),
            shadows: ShadowMaps::new(),
            depth_programs: HashSet::new(),
            state: StateTracker::new(),
            lists: RenderLists::new(),
            casters: Vec::new(),
            lights: LightState::new(),
            collected: Vec::new(),
            clipping,
            info: RenderInfo::default(),
            viewport,
            scissor: viewport,
            scissor_test: false,
            render_target: None,
            transmission_target: None,
            context_lost: false,
            reported: HashSet::new(),
            config,
        })
    }

    /// Parse a coordinate system name from configuration or user input
    pub fn parse_coordinate_system(name: &str) -> RenderResult<CoordinateSystem> {
        name.parse()
            .map_err(|_| RenderError::InvalidCoordinateSystem(name.to_string()))
    }

    /// Render `scene` from the camera node `camera`
    ///
    /// A lost context turns the call into a no-op. With
    /// [`ShaderErrorPolicy::HaltFrame`] the first failing program aborts the
    /// frame with its error; later frames skip that program silently.
    pub fn render(&mut self, scene: &mut Scene, assets: &mut Assets, camera: NodeId) -> RenderResult<()> {
        if !self.context_lost && self.device.is_context_lost() {
            self.notify_context_lost();
        }
        if self.context_lost {
            log::trace!("Context lost; frame skipped");
            return Ok(());
        }
        match self.render_frame(scene, assets, camera) {
            Err(RenderError::Backend(message)) if self.device.is_context_lost() => {
                log::warn!("Context lost mid-frame: {message}");
                self.context_lost = true;
                Ok(())
            }
            result => result,
        }
    }

    /// Build every program `scene` needs without drawing; returns the number
    /// of live programs
    pub fn compile(&mut self, scene: &mut Scene, assets: &mut Assets, camera: NodeId) -> RenderResult<usize> {
        if self.context_lost {
            return Ok(0);
        }
        let camera_view = self.prepare_frame(scene, assets, camera)?;
        let output = self.resolve_output(assets)?;
        let pass = self.main_pass(&camera_view, output.to_target);
        let frame = FrameData {
            fog: scene.fog,
            ..FrameData::default()
        };
        let lists = std::mem::take(&mut self.lists);
        let result = lists
            .opaque
            .iter()
            .chain(&lists.transmissive)
            .chain(&lists.transparent)
            .try_for_each(|item| self.prepare_draw(scene.graph(), assets, item, &pass, &frame).map(drop));
        self.lists = lists;
        result?;
        self.refresh_info();
        Ok(self.programs.len())
    }

    /// Release device objects of assets disposed since the last call
    pub fn process_disposals(&mut self, assets: &mut Assets) -> usize {
        let disposed = assets.take_disposed();
        for key in &disposed {
            match *key {
                ResourceKey::Geometry(handle) => {
                    let released = self.buffers.release_geometry(&mut self.device, handle);
                    log::debug!("Released {released} buffers of geometry {handle:?}");
                }
                ResourceKey::Material(handle) => {
                    let released = self.materials.release(&mut self.device, &mut self.programs, handle);
                    log::debug!("Released {released} program references of material {handle:?}");
                }
                ResourceKey::Texture(handle) => {
                    self.textures.release(&mut self.device, handle);
                }
                ResourceKey::RenderTarget(handle) => {
                    self.textures.release_target(&mut self.device, handle);
                    if self.render_target == Some(handle) {
                        self.render_target = None;
                    }
                }
            }
        }
        if !disposed.is_empty() {
            self.refresh_info();
        }
        disposed.len()
    }

    /// Stop rendering until [`restore_context`](Self::restore_context)
    pub fn notify_context_lost(&mut self) {
        if !self.context_lost {
            log::warn!("Device '{}' lost its context; rendering suspended", self.device.name());
        }
        self.context_lost = true;
    }

    /// Drop every cached device object and resume rendering
    ///
    /// Objects are recreated from the retained assets on the next frame.
    pub fn restore_context(&mut self) {
        self.programs.forget_all();
        self.materials.forget_all();
        self.buffers.forget_all();
        self.textures.forget_all();
        self.shadows.forget_all();
        self.depth_programs.clear();
        self.transmission_target = None;
        self.reported.clear();
        self.state.reset();
        self.context_lost = false;
        self.refresh_info();
        log::info!("Renderer context restored on '{}'", self.device.name());
    }

    /// True while rendering is suspended by context loss
    pub const fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// Resize the output; resets the viewport to cover it
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.reset_viewport();
    }

    /// Output size in logical pixels
    pub const fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Change the device pixel ratio
    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        if !(ratio.is_finite() && ratio > 0.0) {
            log::warn!("Ignoring invalid pixel ratio {ratio}");
            return;
        }
        self.config.pixel_ratio = ratio;
        self.reset_viewport();
    }

    /// Current pixel ratio
    pub const fn pixel_ratio(&self) -> f64 {
        self.config.pixel_ratio
    }

    /// Output size in device pixels
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        scaled_size(self.config.width, self.config.height, self.config.pixel_ratio)
    }

    /// Set the viewport in logical pixels
    pub fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = self.scaled_rect(x, y, width, height);
    }

    /// Current viewport in device pixels
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Set the scissor box in logical pixels
    pub fn set_scissor(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.scissor = self.scaled_rect(x, y, width, height);
    }

    /// Enable or disable the scissor test
    pub fn set_scissor_test(&mut self, enabled: bool) {
        self.scissor_test = enabled;
    }

    /// Color used by auto-clear when the scene has no background color
    pub fn set_clear_color(&mut self, color: crate::foundation::math::Color, alpha: f64) {
        self.config.clear_color = color;
        self.config.clear_alpha = alpha.clamp(0.0, 1.0);
    }

    /// Clear the currently bound output
    pub fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
        if self.context_lost {
            return;
        }
        let rgba = self.clear_rgba(None);
        self.clear_buffers(color.then_some(rgba), depth, stencil);
    }

    /// Draw into `target` instead of the default framebuffer
    pub fn set_render_target(&mut self, target: Option<RenderTargetHandle>) {
        self.render_target = target;
    }

    /// Current render target
    pub const fn render_target(&self) -> Option<RenderTargetHandle> {
        self.render_target
    }

    /// Replace the global clipping planes (world space)
    pub fn set_clipping_planes(&mut self, planes: Vec<Plane>) {
        self.clipping.set_global_planes(planes);
    }

    /// Frame and resource statistics
    pub const fn info(&self) -> &RenderInfo {
        &self.info
    }

    /// Active configuration
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Underlying device
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Underlying device, mutably
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Program cache
    pub const fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    /// Shader chunk library used for new programs
    pub fn shader_library_mut(&mut self) -> &mut ShaderLibrary {
        self.programs.library_mut()
    }

    /// Vertex and index buffer cache
    pub const fn buffers(&self) -> &BufferCache {
        &self.buffers
    }

    /// Texture and render target cache
    pub const fn textures(&self) -> &TextureCache {
        &self.textures
    }

    /// Pipeline-state tracker
    pub const fn state(&self) -> &StateTracker {
        &self.state
    }

    /// Delete every device object the renderer owns
    pub fn dispose(&mut self) {
        self.materials.forget_all();
        self.programs.clear(&mut self.device);
        self.depth_programs.clear();
        self.buffers.clear(&mut self.device);
        self.textures.clear(&mut self.device);
        self.shadows.clear(&mut self.device);
        self.release_transmission_target();
        self.reported.clear();
        self.state.reset();
        self.refresh_info();
        log::info!("Renderer disposed");
    }

    fn render_frame(&mut self, scene: &mut Scene, assets: &mut Assets, camera: NodeId) -> RenderResult<()> {
        self.process_disposals(assets);
        self.info.reset_frame();
        self.info.frame += 1;

        let camera_view = self.prepare_frame(scene, assets, camera)?;
        let lists = std::mem::take(&mut self.lists);
        let casters = std::mem::take(&mut self.casters);
        let mut collected = std::mem::take(&mut self.collected);
        let result = self.render_passes(scene, assets, &camera_view, &lists, &casters, &mut collected);
        self.lists = lists;
        self.casters = casters;
        self.collected = collected;
        self.refresh_info();
        result
    }

    /// Update matrices, classify the scene and set up lights
    fn prepare_frame(&mut self, scene: &mut Scene, assets: &mut Assets, camera: NodeId) -> RenderResult<CameraView> {
        if scene.matrix_world_auto_update {
            scene.update_matrix_world(false)?;
        }
        if !scene.is_attached(camera) {
            scene.graph_mut().update_world_matrix(camera, true, false)?;
        }
        prepare_objects(scene.graph_mut(), assets);

        let graph = scene.graph();
        let node = graph
            .get(camera)
            .ok_or_else(|| RenderError::MissingResource(format!("camera node {camera:?}")))?;
        let cam = node
            .as_camera()
            .ok_or_else(|| RenderError::UnsupportedOperation(format!("node '{}' is not a camera", node.name)))?;
        let camera_view = CameraView {
            projection: *cam.projection_matrix(),
            view: *cam.matrix_world_inverse(),
            world: *node.matrix_world(),
        };
        let frustum = Frustum::from_projection_matrix(
            &camera_view.projection.multiply(&camera_view.view),
            cam.coordinate_system,
        );

        self.lists.init();
        self.casters.clear();
        self.collected.clear();
        let mut classifier = Classifier {
            graph,
            assets,
            frustum: &frustum,
            layers: node.layers,
            view: &camera_view.view,
            override_material: scene.override_material,
            lists: &mut self.lists,
            lights: &mut self.collected,
            casters: &mut self.casters,
        };
        classifier.visit(scene.root(), 0);

        if self.config.sort_objects {
            self.lists.sort();
        }
        self.lights
            .setup(&mut self.collected, &camera_view.view, self.config.shadows.enabled);
        log::trace!(
            "Classified {} items, {} shadow casters, {} lights",
            self.lists.len(),
            self.casters.len(),
            self.collected.len()
        );
        Ok(camera_view)
    }

    fn render_passes(
        &mut self,
        scene: &mut Scene,
        assets: &mut Assets,
        camera_view: &CameraView,
        lists: &RenderLists,
        casters: &[RenderItem],
        collected: &mut [CollectedLight],
    ) -> RenderResult<()> {
        let fog = scene.fog;
        let background = scene.background;
        let graph = scene.graph_mut();

        let shadowing = self.config.shadows.enabled && collected.iter().any(CollectedLight::shadowed);
        if shadowing {
            self.render_shadows(graph, assets, casters, collected)?;
        }
        let (shadows, shadow_samplers) = if shadowing {
            shadow_uniforms(collected)
        } else {
            (Uniforms::new(), Vec::new())
        };
        let frame = FrameData {
            fog,
            shadows,
            shadow_samplers,
        };

        let output = self.resolve_output(assets)?;
        let mut pass = self.main_pass(camera_view, output.to_target);

        if !lists.transmissive.is_empty() {
            let transmission = self.render_transmission(graph, assets, &lists.opaque, &pass, &frame, background)?;
            pass.transmission = Some(transmission);
        }

        self.bind_output(output);
        if self.config.auto_clear {
            let rgba = self.clear_rgba(background);
            self.clear_buffers(Some(rgba), true, true);
        }
        for item in lists.opaque.iter().chain(&lists.transmissive).chain(&lists.transparent) {
            self.draw_item(graph, assets, item, &pass, &frame)?;
        }
        Ok(())
    }

    fn main_pass(&self, camera_view: &CameraView, to_target: bool) -> Pass {
        let mut camera = camera_uniforms(&camera_view.projection, &camera_view.view, &camera_view.world);
        camera.insert(
            "toneMappingExposure".to_string(),
            UniformValue::Float(self.config.tone_mapping_exposure),
        );
        Pass {
            view: camera_view.view,
            camera,
            settings: ProgramSettings::from_config(&self.config, to_target),
            depth_only: false,
            transmission: None,
        }
    }

    fn resolve_output(&mut self, assets: &Assets) -> RenderResult<Output> {
        let Some(handle) = self.render_target else {
            return Ok(Output {
                framebuffer: None,
                viewport: self.viewport,
                to_target: false,
            });
        };
        let target = assets
            .render_target(handle)
            .ok_or_else(|| RenderError::MissingResource(format!("render target {handle:?}")))?;
        let framebuffer = self.textures.ensure_target(&mut self.device, handle, target)?;
        Ok(Output {
            framebuffer: Some(framebuffer),
            viewport: Viewport::new(0, 0, target.width(), target.height()),
            to_target: true,
        })
    }

    fn bind_output(&mut self, output: Output) {
        self.device.bind_framebuffer(output.framebuffer);
        self.state.apply(&mut self.device, StateChange::Viewport(output.viewport));
        let scissor = (self.scissor_test && !output.to_target).then_some(self.scissor);
        self.state.apply(&mut self.device, StateChange::Scissor(scissor));
    }

    fn clear_rgba(&self, background: Option<Background>) -> [f32; 4] {
        let (color, alpha) = match background {
            Some(Background::Color(color)) => (color, 1.0),
            _ => (self.config.clear_color, self.config.clear_alpha),
        };
        [color.r as f32, color.g as f32, color.b as f32, alpha as f32]
    }

    fn clear_buffers(&mut self, color: Option<[f32; 4]>, depth: bool, stencil: bool) {
        if color.is_some() {
            self.state.apply(&mut self.device, StateChange::ColorMask(true));
        }
        if depth {
            self.state.apply(&mut self.device, StateChange::DepthWrite(true));
        }
        self.device.clear(color, depth, stencil);
    }

    fn render_shadows(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut Assets,
        casters: &[RenderItem],
        collected: &mut [CollectedLight],
    ) -> RenderResult<()> {
        let mut live = HashSet::new();
        for light in collected.iter_mut().filter(|light| light.shadowed()) {
            live.insert(light.node);
            let due = light.light.shadow.as_ref().is_some_and(|shadow| {
                shadow.needs_update || (self.config.shadows.auto_update && shadow.auto_update)
            });
            if !due && self.shadows.texture(light.node).is_some() {
                continue;
            }
            let views = self.shadows.prepare(&mut self.device, light, self.config.coordinate_system)?;
            if let Some(shadow) = light.light.shadow.as_mut() {
                shadow.needs_update = false;
            }
            if let Some(node_light) = graph.get_mut(light.node).and_then(Node::as_light_mut) {
                node_light.shadow.clone_from(&light.light.shadow);
            }
            for view in &views {
                self.render_shadow_view(graph, assets, casters, view)?;
            }
        }
        self.shadows.retain(&mut self.device, &live);
        Ok(())
    }

    fn render_shadow_view(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut Assets,
        casters: &[RenderItem],
        view: &ShadowView,
    ) -> RenderResult<()> {
        self.device.bind_framebuffer(Some(view.framebuffer));
        self.state.apply(&mut self.device, StateChange::Viewport(view.viewport));
        self.state.apply(&mut self.device, StateChange::Scissor(None));
        if view.clear {
            self.clear_buffers(Some([1.0; 4]), true, false);
        }

        let frustum = Frustum::from_projection_matrix(
            &view.projection.multiply(&view.view),
            self.config.coordinate_system,
        );
        let pass = Pass {
            view: view.view,
            camera: camera_uniforms(&view.projection, &view.view, &view.camera_world),
            settings: ProgramSettings::from_config(&self.config, true),
            depth_only: true,
            transmission: None,
        };
        let frame = FrameData::default();
        for item in casters {
            let visible = match (graph.get(item.node), assets.geometry(item.geometry)) {
                (Some(node), Some(geometry)) => node.as_mesh().is_some_and(|mesh| {
                    !node.frustum_culled
                        || world_sphere(mesh, geometry, node.matrix_world())
                            .map_or(true, |sphere| frustum.intersects_sphere(&sphere))
                }),
                _ => false,
            };
            if visible {
                self.draw_item(graph, assets, item, &pass, &frame)?;
            }
        }
        Ok(())
    }

    /// Draw the opaque list into an offscreen color buffer transmissive
    /// materials can sample
    fn render_transmission(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut Assets,
        opaque: &[RenderItem],
        pass: &Pass,
        frame: &FrameData,
        background: Option<Background>,
    ) -> RenderResult<(TextureId, (u32, u32))> {
        let target = self.ensure_transmission_target(self.drawing_buffer_size())?;
        self.bind_output(Output {
            framebuffer: Some(target.framebuffer),
            viewport: Viewport::new(0, 0, target.size.0, target.size.1),
            to_target: true,
        });
        let rgba = self.clear_rgba(background);
        self.clear_buffers(Some(rgba), true, true);

        let offscreen = Pass {
            settings: ProgramSettings::from_config(&self.config, true),
            ..pass.clone()
        };
        for item in opaque {
            self.draw_item(graph, assets, item, &offscreen, frame)?;
        }
        Ok((target.texture, target.size))
    }

    fn ensure_transmission_target(&mut self, size: (u32, u32)) -> RenderResult<InternalTarget> {
        if let Some(target) = self.transmission_target {
            if target.size == size {
                return Ok(target);
            }
            self.release_transmission_target();
        }
        let descriptor = TextureDescriptor {
            width: size.0,
            height: size.1,
            depth: false,
            color_space: ColorSpace::LinearSrgb,
            generate_mipmaps: true,
            repeat: false,
            linear_filter: true,
        };
        let texture = self.device.create_texture(&descriptor, None)?;
        let framebuffer = self.device.create_framebuffer(texture, true, false)?;
        let target = InternalTarget {
            texture,
            framebuffer,
            size,
        };
        log::debug!("Allocated {}x{} transmission target", size.0, size.1);
        self.transmission_target = Some(target);
        Ok(target)
    }

    fn release_transmission_target(&mut self) {
        if let Some(target) = self.transmission_target.take() {
            self.device.delete_framebuffer(target.framebuffer);
            self.device.delete_texture(target.texture);
        }
    }

    /// Submit one render item
    fn draw_item(
        &mut self,
        graph: &mut SceneGraph,
        assets: &mut Assets,
        item: &RenderItem,
        pass: &Pass,
        frame: &FrameData,
    ) -> RenderResult<()> {
        let Some(setup) = self.prepare_draw(graph, assets, item, pass, frame)? else {
            return Ok(());
        };
        let Some(program) = self.programs.get(&setup.key) else {
            return Ok(());
        };
        let Some(handle) = program.handle else {
            return Ok(());
        };

        self.state.apply(&mut self.device, StateChange::Program(handle));
        for change in setup.states {
            self.state.apply(&mut self.device, change);
        }

        let Some(geometry) = assets.geometry_mut(item.geometry) else {
            return Ok(());
        };
        let mut mesh = graph.get_mut(item.node).and_then(Node::as_mesh_mut);
        for (location, name) in program.attributes.iter().enumerate() {
            let Ok(location) = u32::try_from(location) else {
                break;
            };
            let attribute = match name.as_str() {
                "instanceMatrix" => mesh
                    .as_deref_mut()
                    .and_then(|mesh| mesh.instancing.as_mut())
                    .map(Instancing::matrices_mut),
                "instanceColor" => mesh
                    .as_deref_mut()
                    .and_then(|mesh| mesh.instancing.as_mut())
                    .and_then(Instancing::colors_mut),
                other => match other.strip_prefix("morphTarget").and_then(|slot| slot.parse::<usize>().ok()) {
                    Some(slot) => match setup.morph_slots.get(slot) {
                        Some(&target) => geometry
                            .morph_attribute_mut("position")
                            .and_then(|targets| targets.get_mut(target)),
                        None => None,
                    },
                    None => geometry.attribute_mut(other),
                },
            };
            let Some(attribute) = attribute else {
                log::trace!("Attribute '{name}' not supplied; location {location} left unbound");
                continue;
            };
            let id = attribute.id();
            let buffer = self.buffers.upload(&mut self.device, attribute, BufferTarget::Vertex)?;
            self.buffers.track(item.geometry, id);
            self.device.bind_vertex_buffer(VertexBinding {
                location,
                buffer,
                item_size: attribute.item_size(),
                component_type: attribute.component_type(),
                normalized: attribute.normalized,
                divisor: attribute.divisor,
            });
        }

        let index_type = match geometry.index_mut() {
            Some(index) => {
                let id = index.id();
                let buffer = self.buffers.upload(&mut self.device, index, BufferTarget::Index)?;
                self.buffers.track(item.geometry, id);
                self.device.bind_index_buffer(buffer);
                Some(index.component_type())
            }
            None => None,
        };

        let mut units = TextureUnits::new(self.config.max_texture_units);
        for (name, value) in &setup.uniforms {
            if !program.has_uniform(base_name(name)) {
                continue;
            }
            match value {
                UniformValue::Texture(Some(texture)) => {
                    if let Some(id) = self.textures.resolve(&mut self.device, assets, *texture)? {
                        units.bind(&mut self.device, handle, name, id);
                    }
                }
                UniformValue::Texture(None) => {}
                other => self.device.set_uniform(handle, name, other),
            }
        }
        set_uniforms(&mut self.device, program, handle, &pass.camera);
        if setup.lit {
            set_uniforms(&mut self.device, program, handle, self.lights.uniforms());
            set_uniforms(&mut self.device, program, handle, &frame.shadows);
            for (name, light) in &frame.shadow_samplers {
                if program.has_uniform(base_name(name)) {
                    if let Some(texture) = self.shadows.texture(*light) {
                        units.bind(&mut self.device, handle, name, texture);
                    }
                }
            }
        }
        if let (true, Some(fog)) = (setup.fogged, frame.fog.as_ref()) {
            set_uniforms(&mut self.device, program, handle, &fog_uniforms(fog));
        }
        if let Some((texture, (width, height))) = pass.transmission {
            if program.has_uniform("transmissionSamplerMap") {
                units.bind(&mut self.device, handle, "transmissionSamplerMap", texture);
                let size = Vector2::new(f64::from(width), f64::from(height));
                self.device
                    .set_uniform(handle, "transmissionSamplerSize", &UniformValue::Vec2(size));
            }
        }

        let (start, count) = setup.span;
        let instances = setup.instances.unwrap_or(1);
        self.device.draw(&DrawCall {
            primitive: setup.primitive,
            start,
            count,
            index_type,
            instances,
        });
        self.info.record_draw(setup.primitive, count, instances);
        Ok(())
    }

    /// Resolve the program and collect uniforms and pipeline state
    ///
    /// Returns `None` when the item draws nothing this frame.
    fn prepare_draw(
        &mut self,
        graph: &SceneGraph,
        assets: &Assets,
        item: &RenderItem,
        pass: &Pass,
        frame: &FrameData,
    ) -> RenderResult<Option<DrawSetup>> {
        let Some(node) = graph.get(item.node) else {
            return Ok(None);
        };
        let Some(mesh) = node.as_mesh() else {
            return Ok(None);
        };
        let (Some(material), Some(geometry)) = (assets.material(item.material), assets.geometry(item.geometry)) else {
            log::trace!("Node '{}' references a missing material or geometry", node.name);
            return Ok(None);
        };
        let Some(span) = draw_span(geometry.element_count(), geometry.draw_range(), item.group) else {
            log::trace!("Node '{}' has an empty draw range", node.name);
            return Ok(None);
        };
        let instances = mesh.instancing.as_ref().map(Instancing::count);
        if instances == Some(0) {
            log::trace!("Node '{}' has no instances", node.name);
            return Ok(None);
        }

        let max_morph = usize::try_from(self.config.max_morph_targets).unwrap_or(usize::MAX);
        let object = ObjectTraits::from_mesh(mesh, geometry, node.receive_shadow && !pass.depth_only, max_morph);
        let clipping = if pass.depth_only && !material.clip_shadows {
            (0, 0)
        } else {
            self.clipping.counts(material)
        };

        let key = if pass.depth_only {
            let params = ProgramParameters::depth(object, clipping, self.config.precision);
            let key = params.cache_key();
            if !self.depth_programs.contains(&key) {
                let tag = format!("depth:{key}");
                if self.reported.contains(&tag) {
                    return Ok(None);
                }
                if let Err(error) = self.programs.acquire(&mut self.device, &params) {
                    return self.shader_failure(tag, error).map(|()| None);
                }
                self.depth_programs.insert(key.clone());
            }
            key
        } else {
            let tag = format!("{:?}@{}", item.material, material.version());
            if self.reported.contains(&tag) {
                return Ok(None);
            }
            let lights = self.lights.counts();
            let fog = frame.fog.as_ref().map(FogMode::of);
            let settings = pass.settings;
            let signature = MaterialSignature {
                version: material.version(),
                object,
                lights,
                clipping,
                fog,
                settings,
            };
            let gather = || ProgramParameters::gather(material, object, &lights, clipping, &settings, fog, assets);
            match self
                .materials
                .program_key(&mut self.device, &mut self.programs, item.material, signature, gather)
            {
                Ok(key) => key,
                Err(error) => return self.shader_failure(tag, error).map(|()| None),
            }
        };

        if self.reported.contains(&key) {
            return Ok(None);
        }
        let failure = match self.programs.get(&key) {
            Some(program) if program.is_runnable() => None,
            Some(program) => Some(program.diagnostics.error().unwrap_or_else(|| ShaderError::Link {
                log: format!("program '{}' is not runnable", program.name),
            })),
            None => Some(ShaderError::Link {
                log: format!("program '{key}' missing from cache"),
            }),
        };
        if let Some(error) = failure {
            return self.shader_failure(key, error).map(|()| None);
        }

        let mut uniforms = object_uniforms(node.matrix_world(), &pass.view);
        let clockwise = node.matrix_world().determinant() < 0.0;
        let (states, lit, fogged) = if pass.depth_only {
            let side = material.shadow_side.unwrap_or_else(|| material.side.flipped());
            (depth_states(material, side, clockwise), false, false)
        } else {
            uniforms.extend(material_uniforms(material));
            if let Some(map) = material
                .kind
                .textures()
                .first()
                .and_then(|(_, handle)| assets.texture(*handle))
            {
                uniforms.insert("mapTransform".to_string(), UniformValue::Mat3(map.uv_matrix()));
            }
            let fogged = material.fog && frame.fog.is_some();
            (material_states(material, clockwise), material.kind.is_lit(), fogged)
        };
        if clipping.0 > 0 {
            if let Some(planes) = self.clipping.uniform(material, &pass.view) {
                uniforms.insert("clippingPlanes".to_string(), planes);
            }
        }

        let mut morph_slots = Vec::new();
        if object.morph_targets {
            let active = mesh.active_morph_influences(object.morph_count);
            let total: f64 = active.iter().map(|(_, weight)| weight).sum();
            morph_slots.extend(active.iter().map(|(target, _)| *target));
            let available = geometry.morph_attribute("position").map_or(0, <[_]>::len);
            let idle: Vec<usize> = (0..available).filter(|target| !morph_slots.contains(target)).collect();
            morph_slots.extend(idle);
            morph_slots.truncate(object.morph_count);

            #[allow(clippy::cast_possible_truncation)]
            let influences: Vec<f32> = (0..object.morph_count)
                .map(|slot| active.get(slot).map_or(0.0, |(_, weight)| *weight as f32))
                .collect();
            let base = if geometry.morph_targets_relative { 1.0 } else { 1.0 - total };
            uniforms.insert("morphTargetBaseInfluence".to_string(), UniformValue::Float(base));
            uniforms.insert("morphTargetInfluences".to_string(), UniformValue::FloatArray(influences));
        }
        if let Some(skin) = mesh.skin.as_ref() {
            uniforms.insert("boneMatrices".to_string(), UniformValue::Mat4Array(skin.bone_matrices().to_vec()));
            uniforms.insert("bindMatrix".to_string(), UniformValue::Mat4(*skin.bind_matrix()));
            uniforms.insert("bindMatrixInverse".to_string(), UniformValue::Mat4(*skin.bind_matrix_inverse()));
        }

        Ok(Some(DrawSetup {
            key,
            uniforms,
            states,
            lit,
            fogged,
            primitive: primitive(mesh.draw_mode, material.wireframe && !pass.depth_only),
            morph_slots,
            span,
            instances,
        }))
    }

    /// Apply the shader error policy to a failed program
    fn shader_failure(&mut self, tag: String, error: ShaderError) -> RenderResult<()> {
        if !self.reported.insert(tag) {
            return Ok(());
        }
        match self.config.shader_error_policy {
            ShaderErrorPolicy::HaltFrame => {
                log::error!("Frame halted by shader failure: {error}");
                Err(RenderError::Shader(error))
            }
            ShaderErrorPolicy::SkipDraw => {
                log::error!("Skipping draws of failed program: {error}");
                Ok(())
            }
        }
    }

    fn refresh_info(&mut self) {
        self.info.geometries = self.buffers.geometry_count();
        self.info.textures = self.textures.count();
        self.info.programs = self.programs.len();
    }

    fn reset_viewport(&mut self) {
        let (width, height) = self.drawing_buffer_size();
        self.viewport = Viewport::new(0, 0, width, height);
        self.scissor = self.viewport;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn scaled_rect(&self, x: i32, y: i32, width: u32, height: u32) -> Viewport {
        let ratio = self.config.pixel_ratio;
        let (width, height) = scaled_size(width, height, ratio);
        Viewport::new(
            (f64::from(x) * ratio).floor() as i32,
            (f64::from(y) * ratio).floor() as i32,
            width,
            height,
        )
    }
}

/// Walks the scene graph into render lists, light and caster sets
struct Classifier<'a> {
    graph: &'a SceneGraph,
    assets: &'a Assets,
    frustum: &'a Frustum,
    layers: Layers,
    view: &'a Matrix4,
    override_material: Option<crate::assets::MaterialHandle>,
    lists: &'a mut RenderLists,
    lights: &'a mut Vec<CollectedLight>,
    casters: &'a mut Vec<RenderItem>,
}

impl Classifier<'_> {
    fn visit(&mut self, id: NodeId, group_order: i32) {
        let graph = self.graph;
        let Some(node) = graph.get(id) else {
            return;
        };
        if !node.visible {
            return;
        }
        let mut group_order = group_order;
        if self.layers.test(&node.layers) {
            match &node.kind {
                NodeKind::Group => group_order = node.render_order,
                NodeKind::Light(light) => self.collect_light(id, node, light),
                NodeKind::Mesh(mesh) => self.collect_mesh(id, node, mesh, group_order),
                NodeKind::Camera(_) => {}
            }
        }
        for &child in graph.children(id) {
            self.visit(child, group_order);
        }
    }

    fn collect_light(&mut self, id: NodeId, node: &Node, light: &Light) {
        let target = match light.kind.target() {
            Some(crate::scene::LightTarget::Point(point)) => point,
            Some(crate::scene::LightTarget::Node(target)) => self
                .graph
                .get(target)
                .map_or(Vector3::ZERO, |target| Vector3::from_matrix_position(target.matrix_world())),
            None => Vector3::ZERO,
        };
        self.lights.push(CollectedLight {
            node: id,
            light: light.clone(),
            matrix_world: *node.matrix_world(),
            target,
            cast_shadow: node.cast_shadow,
        });
    }

    fn collect_mesh(&mut self, id: NodeId, node: &Node, mesh: &Mesh, group_order: i32) {
        let Some(geometry) = self.assets.geometry(mesh.geometry) else {
            log::trace!("Node '{}' references a missing geometry", node.name);
            return;
        };
        let in_view = !node.frustum_culled
            || world_sphere(mesh, geometry, node.matrix_world())
                .map_or(true, |sphere| self.frustum.intersects_sphere(&sphere));
        if !in_view && !node.cast_shadow {
            return;
        }
        let depth = Vector3::from_matrix_position(node.matrix_world())
            .apply_matrix4(self.view)
            .length_squared();

        let multi = matches!(mesh.material, crate::scene::MaterialSlot::Multi(_));
        let groups: Vec<Option<GeometryGroup>> = if multi && !geometry.groups().is_empty() {
            geometry.groups().iter().copied().map(Some).collect()
        } else {
            vec![None]
        };
        for group in groups {
            let handle = self
                .override_material
                .or_else(|| mesh.material.for_group(group.map(|group| group.material_index)));
            let Some(handle) = handle else {
                continue;
            };
            let Some(material) = self.assets.material(handle) else {
                continue;
            };
            if !material.visible {
                continue;
            }
            let item = RenderItem {
                id: self.lists.next_id(),
                node: id,
                geometry: mesh.geometry,
                material: handle,
                material_id: material.id(),
                group,
                depth,
                render_order: node.render_order,
                group_order,
            };
            if node.cast_shadow {
                self.casters.push(item);
            }
            if in_view {
                let bucket = if material.is_transmissive() {
                    RenderBucket::Transmissive
                } else if material.transparent {
                    RenderBucket::Transparent
                } else {
                    RenderBucket::Opaque
                };
                self.lists.push(bucket, item);
            }
        }
    }
}

/// Refresh bounding spheres and skins before classification
fn prepare_objects(graph: &mut SceneGraph, assets: &mut Assets) {
    let meshes: Vec<NodeId> = graph
        .iter()
        .filter(|(_, node)| node.as_mesh().is_some())
        .map(|(id, _)| id)
        .collect();
    for id in meshes {
        let Some(mesh) = graph.get(id).and_then(Node::as_mesh) else {
            continue;
        };
        let bone_worlds: Option<Vec<Option<Matrix4>>> = mesh.skin.as_ref().map(|skin| {
            skin.bones
                .iter()
                .map(|bone| graph.get(*bone).map(|bone| *bone.matrix_world()))
                .collect()
        });
        let Some(geometry) = assets.geometry_mut(mesh.geometry) else {
            continue;
        };
        let sphere = geometry.ensure_bounding_sphere();

        let Some(mesh) = graph.get_mut(id).and_then(Node::as_mesh_mut) else {
            continue;
        };
        if let Some(instancing) = mesh.instancing.as_mut() {
            if instancing.bounding_sphere().is_none() {
                if let Err(error) = instancing.compute_bounding_sphere(&sphere) {
                    log::warn!("Instance bounds unavailable: {error}");
                }
            }
        }
        if let (Some(skin), Some(worlds)) = (mesh.skin.as_mut(), bone_worlds) {
            skin.update(&worlds);
        }
    }
}

/// World-space bounds of a mesh, `None` when unknown or empty
fn world_sphere(mesh: &Mesh, geometry: &Geometry, matrix_world: &Matrix4) -> Option<Sphere> {
    let local = match &mesh.instancing {
        Some(instancing) => instancing.bounding_sphere().copied(),
        None => geometry.bounding_sphere().copied(),
    }?;
    (!local.is_empty()).then(|| local.apply_matrix4(matrix_world))
}

/// Intersect the draw range, the group and the element count
fn draw_span(total: usize, range: DrawRange, group: Option<GeometryGroup>) -> Option<(usize, usize)> {
    let range_end = range.count.map_or(usize::MAX, |count| range.start.saturating_add(count));
    let (group_start, group_end) = group.map_or((0, usize::MAX), |group| {
        (group.start, group.start.saturating_add(group.count))
    });
    let start = range.start.max(group_start);
    let end = range_end.min(group_end).min(total);
    (end > start).then(|| (start, end - start))
}

const fn primitive(mode: DrawMode, wireframe: bool) -> Primitive {
    match mode {
        DrawMode::Triangles if wireframe => Primitive::Lines,
        DrawMode::Triangles => Primitive::Triangles,
        DrawMode::Lines => Primitive::Lines,
        DrawMode::LineStrip => Primitive::LineStrip,
        DrawMode::LineLoop => Primitive::LineLoop,
        DrawMode::Points => Primitive::Points,
    }
}

const fn cull_face(side: Side) -> Option<CullFace> {
    match side {
        Side::Front => Some(CullFace::Back),
        Side::Back => Some(CullFace::Front),
        Side::Double => None,
    }
}

fn material_states(material: &Material, clockwise: bool) -> Vec<StateChange> {
    let blend = if material.blending == Blending::Normal && !material.transparent {
        None
    } else {
        material.blending.function(material.premultiplied_alpha)
    };
    vec![
        StateChange::Blend(blend),
        StateChange::DepthTest(material.depth_test),
        StateChange::DepthWrite(material.depth_write),
        StateChange::DepthFunc(material.depth_func),
        StateChange::Cull(cull_face(material.side)),
        StateChange::FrontFaceClockwise(clockwise),
        StateChange::ColorMask(material.color_write),
        StateChange::PolygonOffset(material.polygon_offset),
        StateChange::Stencil(material.stencil),
    ]
}

fn depth_states(material: &Material, side: Side, clockwise: bool) -> Vec<StateChange> {
    vec![
        StateChange::Blend(None),
        StateChange::DepthTest(true),
        StateChange::DepthWrite(true),
        StateChange::DepthFunc(CompareFunction::LessEqual),
        StateChange::Cull(cull_face(side)),
        StateChange::FrontFaceClockwise(clockwise),
        StateChange::ColorMask(true),
        StateChange::PolygonOffset(material.polygon_offset),
        StateChange::Stencil(None),
    ]
}

/// Forward the non-texture uniforms `program` declares
fn set_uniforms<D: GraphicsDevice + ?Sized>(device: &mut D, program: &Program, handle: ProgramId, uniforms: &Uniforms) {
    for (name, value) in uniforms {
        if !matches!(value, UniformValue::Texture(_)) && program.has_uniform(base_name(name)) {
            device.set_uniform(handle, name, value);
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_size(width: u32, height: u32, ratio: f64) -> (u32, u32) {
    (
        (f64::from(width) * ratio).floor() as u32,
        (f64::from(height) * ratio).floor() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_span_intersections() {
        let all = DrawRange { start: 0, count: None };
        assert_eq!(draw_span(36, all, None), Some((0, 36)));
        let ranged = DrawRange { start: 6, count: Some(12) };
        assert_eq!(draw_span(36, ranged, None), Some((6, 12)));
        let group = GeometryGroup {
            start: 12,
            count: 30,
            material_index: 1,
        };
        assert_eq!(draw_span(36, ranged, Some(group)), Some((12, 6)));
        assert_eq!(draw_span(36, DrawRange { start: 40, count: None }, None), None);
        assert_eq!(draw_span(0, all, None), None);
        let past_end = GeometryGroup {
            start: 40,
            count: 6,
            material_index: 0,
        };
        assert_eq!(draw_span(36, all, Some(past_end)), None);
        assert_eq!(draw_span(36, DrawRange { start: 30, count: Some(2) }, Some(group)), None);
    }

    #[test]
    fn test_wireframe_only_affects_triangles() {
        assert_eq!(primitive(DrawMode::Triangles, true), Primitive::Lines);
        assert_eq!(primitive(DrawMode::Points, true), Primitive::Points);
        assert_eq!(primitive(DrawMode::LineStrip, false), Primitive::LineStrip);
    }

    #[test]
    fn test_scaled_size_floors() {
        assert_eq!(scaled_size(101, 51, 1.5), (151, 76));
        assert_eq!(scaled_size(800, 600, 1.0), (800, 600));
    }

    #[test]
    fn test_parse_coordinate_system_error() {
        let result = Renderer::<crate::render::HeadlessDevice>::parse_coordinate_system("left-handed-z");
        assert!(matches!(result, Err(RenderError::InvalidCoordinateSystem(name)) if name == "left-handed-z"));
    }
}
