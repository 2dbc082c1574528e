//! One guest library instance per GL context, and the per-frame driver that
//! draws its layers through the shared render target.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::compositor::Compositor;
use crate::config::{Antialiasing, DeckOptions};
use crate::error::Result;
use crate::frame::FrameState;
use crate::gl::Gl;
use crate::guest::{DeckProps, DrawOptions, GlParameters, GuestDeck, LayerDescriptor, LayerType, MapView};
use crate::host::{device_size, HostEvent, HostMap};
use crate::state::StateArbiter;
use crate::viewport::{view_state, viewport};

/// Reason passed to [`GuestDeck::draw_layers`] for host-driven repaints.
pub const REPAINT_REASON: &str = "2gis-repaint";

/// Shared handle to a [`DeckContext`]. Layers of one map hold clones of it.
pub type DeckHandle<D> = Rc<RefCell<DeckContext<D>>>;

/// Contexts by GL context identity.
///
/// The registry only holds weak references: a context lives as long as a
/// layer or the integrator holds its handle.
pub struct DeckRegistry<D: GuestDeck> {
    contexts: HashMap<*const D::Gl, Weak<RefCell<DeckContext<D>>>>,
}

impl<D: GuestDeck> Default for DeckRegistry<D> {
    fn default() -> Self {
        Self {
            contexts: HashMap::new(),
        }
    }
}

impl<D: GuestDeck> fmt::Debug for DeckRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckRegistry")
            .field("contexts", &self.contexts.len())
            .finish()
    }
}

impl<D: GuestDeck> DeckRegistry<D> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The live context bound to `gl`.
    #[must_use]
    pub fn get(&self, gl: &Rc<D::Gl>) -> Option<DeckHandle<D>> {
        self.contexts.get(&Rc::as_ptr(gl))?.upgrade()
    }

    /// Number of live contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts
            .values()
            .filter(|context| context.strong_count() > 0)
            .count()
    }

    /// Whether no context is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, gl: &Rc<D::Gl>, context: &DeckHandle<D>) {
        self.contexts.retain(|_, context| context.strong_count() > 0);
        self.contexts.insert(Rc::as_ptr(gl), Rc::downgrade(context));
    }

    fn remove(&mut self, gl: &Rc<D::Gl>) {
        self.contexts.remove(&Rc::as_ptr(gl));
    }
}

struct RegisteredLayer<L> {
    descriptor: LayerDescriptor,
    layer_type: LayerType<L>,
}

/// A guest library instance bound to one host map, with the GPU resources
/// its layers share.
pub struct DeckContext<D: GuestDeck> {
    deck: D,
    compositor: Compositor<D::Gl>,
    arbiter: StateArbiter,
    frame: FrameState,
    layers: IndexMap<String, RegisteredLayer<D::Layer>>,
    options: DeckOptions,
}

impl<D: GuestDeck> DeckContext<D> {
    /// Bind `deck` to `map`, or return the context already bound to the
    /// map's GL context (in which case `deck` is dropped).
    ///
    /// A new context pushes its initial props to the guest: device pixels,
    /// default GL parameters, a single map view, the current camera and the
    /// shared context.
    pub fn init<M>(
        map: &M,
        mut deck: D,
        options: DeckOptions,
        registry: &mut DeckRegistry<D>,
    ) -> DeckHandle<D>
    where
        M: HostMap<Gl = D::Gl>,
    {
        if let Some(existing) = registry.get(map.gl()) {
            tracing::debug!("reusing the guest instance bound to this context");
            return existing;
        }

        deck.set_props(DeckProps {
            use_device_pixels: Some(true),
            parameters: Some(GlParameters::default()),
            views: Some(vec![MapView::default()]),
            view_state: Some(view_state(map)),
            gl: Some(Rc::clone(map.gl())),
            ..DeckProps::default()
        });

        let size = device_size(map.size(), map.device_pixel_ratio());
        let context = Rc::new(RefCell::new(Self {
            deck,
            compositor: Compositor::new(Rc::clone(map.gl()), size, &options),
            arbiter: StateArbiter::new(),
            frame: FrameState::new(),
            layers: IndexMap::new(),
            options,
        }));
        registry.insert(map.gl(), &context);
        context
    }

    /// The guest instance.
    pub fn deck(&self) -> &D {
        &self.deck
    }

    /// The guest instance, mutably.
    pub fn deck_mut(&mut self) -> &mut D {
        &mut self.deck
    }

    /// The shared render target and composite pass.
    pub fn compositor(&self) -> &Compositor<D::Gl> {
        &self.compositor
    }

    /// Frame bookkeeping.
    pub fn frame(&self) -> &FrameState {
        &self.frame
    }

    /// Host/guest state stacks.
    pub fn arbiter(&self) -> &StateArbiter {
        &self.arbiter
    }

    /// Options the context was created with.
    pub fn options(&self) -> &DeckOptions {
        &self.options
    }

    /// Ids of the registered layers, in insertion order.
    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Choose the antialiasing mode before the first composite. Returns
    /// whether it was applied.
    pub fn configure_antialiasing(&mut self, antialiasing: Antialiasing) -> bool {
        self.compositor.configure_antialiasing(antialiasing)
    }

    /// React to a host event.
    ///
    /// # Safety
    ///
    /// The map's GL context must be current.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`](crate::Error::Allocation) if the render target
    /// cannot be reallocated on resize.
    pub unsafe fn handle_event<M>(&mut self, map: &M, event: HostEvent) -> Result<()>
    where
        M: HostMap<Gl = D::Gl>,
    {
        match event {
            HostEvent::FrameStart => self.frame.start_frame(),
            HostEvent::Resize => unsafe { self.resize(map) }?,
            HostEvent::Move => {
                self.deck.set_props(DeckProps {
                    view_state: Some(view_state(map)),
                    ..DeckProps::default()
                });
                // The host repaints right after moving; drop the redraw the
                // new view state requested.
                self.deck.needs_redraw(true);
            }
        }
        Ok(())
    }

    unsafe fn resize<M>(&mut self, map: &M) -> Result<()>
    where
        M: HostMap<Gl = D::Gl>,
    {
        let [width, height] = map.size();
        unsafe {
            self.compositor
                .resize(device_size([width, height], map.device_pixel_ratio()))
        }?;
        self.deck.set_props(DeckProps {
            width: Some(width),
            height: Some(height),
            ..DeckProps::default()
        });
        Ok(())
    }

    /// Register a layer and rebuild the guest layer list. A layer with the
    /// same id is replaced in place.
    pub fn add_layer(&mut self, descriptor: LayerDescriptor, layer_type: LayerType<D::Layer>) {
        self.layers.insert(
            descriptor.id.clone(),
            RegisteredLayer {
                descriptor,
                layer_type,
            },
        );
        self.update_layers();
    }

    /// Unregister a layer and rebuild the guest layer list. Returns whether
    /// the layer was registered.
    pub fn remove_layer(&mut self, id: &str) -> bool {
        let removed = self.layers.shift_remove(id).is_some();
        if removed {
            self.update_layers();
        }
        removed
    }

    /// Replace a registered layer's descriptor and rebuild the guest layer
    /// list. Unknown layers are ignored.
    pub fn update_layer(&mut self, descriptor: LayerDescriptor, layer_type: LayerType<D::Layer>) {
        let Some(layer) = self.layers.get_mut(&descriptor.id) else {
            tracing::trace!(id = %descriptor.id, "update of unregistered layer ignored");
            return;
        };
        *layer = RegisteredLayer {
            descriptor,
            layer_type,
        };
        self.update_layers();
    }

    /// Rebuild the guest layer list from the registered layers. Skipped when
    /// the integrator owns the guest instance.
    pub fn update_layers(&mut self) {
        if self.options.external {
            return;
        }
        let layers = self
            .layers
            .values()
            .enumerate()
            .map(|(offset, layer)| layer.layer_type.build(&layer.descriptor, offset))
            .collect();
        self.deck.set_props(DeckProps {
            layers: Some(layers),
            ..DeckProps::default()
        });
    }

    /// Draw the guest layer `id` and composite it onto the host framebuffer.
    ///
    /// Returns `Ok(false)` without touching GL when the guest has no such
    /// layer. The first draw of a host frame resizes the target if the map
    /// size changed and clears color and depth; later draws clear color only.
    /// The draw is finished even when it fails, so the next frame starts
    /// cleanly.
    ///
    /// # Safety
    ///
    /// The map's GL context must be current.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`](crate::Error::Allocation) or the first failure
    /// to build the composite program.
    pub unsafe fn render_layer<M>(&mut self, map: &M, id: &str) -> Result<bool>
    where
        M: HostMap<Gl = D::Gl>,
    {
        if !self.deck.has_layer(id) {
            tracing::trace!(id, "layer is not active in the guest, skipping render");
            return Ok(false);
        }

        let first = self.frame.begin_draw();
        let drawn = unsafe { self.draw_layer(map, id, first) };
        self.frame.finish_draw();
        drawn.map(|()| true)
    }

    unsafe fn draw_layer<M>(&mut self, map: &M, id: &str, first: bool) -> Result<()>
    where
        M: HostMap<Gl = D::Gl>,
    {
        if first && device_size(map.size(), map.device_pixel_ratio()) != self.compositor.size() {
            unsafe { self.resize(map) }?;
        }

        let gl = Rc::clone(self.compositor.gl());
        let framebuffer = unsafe {
            let framebuffer = self.compositor.bind_draw_target()?;
            gl.clear_color(1.0, 1.0, 1.0, 0.0);
            gl.clear(if first {
                glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT
            } else {
                glow::COLOR_BUFFER_BIT
            });
            self.compositor.unbind();
            framebuffer
        };

        let (viewport, clear_stack) = self.frame.viewport_or_insert_with(|| viewport(map));
        let viewports = [viewport.clone()];

        let scope = unsafe { self.arbiter.enter_guest(&*gl) };
        if self.deck.is_initialized() {
            self.deck.draw_layers(
                REPAINT_REASON,
                DrawOptions {
                    viewports: &viewports,
                    layer_filter: &|layer: &str| layer == id,
                    clear_canvas: false,
                    clear_stack,
                    framebuffer: Some(framebuffer),
                },
            );
        }
        unsafe { self.compositor.resolve_msaa() };
        scope.leave();

        unsafe { self.compositor.composite() }
    }

    /// Release GPU resources, finalize the guest and unregister the context.
    /// The context stays usable; resources are allocated again on next
    /// render.
    ///
    /// # Safety
    ///
    /// The map's GL context must be current.
    pub unsafe fn finalize(&mut self, registry: &mut DeckRegistry<D>) {
        unsafe { self.compositor.remove() };
        self.deck.finalize();
        self.frame.reset();
        self.layers.clear();
        registry.remove(self.compositor.gl());
    }
}
